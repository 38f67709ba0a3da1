//! Property-based tests for identity cache invariants and channel encryption

use bitchat_security::{
    Fingerprint, IdentityCache, NoiseChannelEncryption, SocialIdentity, TrustLevel,
};
use proptest::prelude::*;

/// Small fingerprint space so operations collide on the same identities
fn arb_fingerprint() -> impl Strategy<Value = Fingerprint> {
    (0u8..6).prop_map(|b| Fingerprint::new([b; 32]))
}

fn arb_nickname() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alice", "bob", "carol", "Unknown"]).prop_map(str::to_string)
}

fn arb_trust_level() -> impl Strategy<Value = TrustLevel> {
    prop_oneof![
        Just(TrustLevel::Unknown),
        Just(TrustLevel::Casual),
        Just(TrustLevel::Verified),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Upsert(Fingerprint, String),
    Favorite(Fingerprint, bool),
    Block(Fingerprint, bool),
    Verify(Fingerprint, bool),
    Trust(Fingerprint, TrustLevel),
    Remove(Fingerprint),
}

fn arb_cache_op() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (arb_fingerprint(), arb_nickname()).prop_map(|(f, n)| CacheOp::Upsert(f, n)),
        (arb_fingerprint(), any::<bool>()).prop_map(|(f, v)| CacheOp::Favorite(f, v)),
        (arb_fingerprint(), any::<bool>()).prop_map(|(f, v)| CacheOp::Block(f, v)),
        (arb_fingerprint(), any::<bool>()).prop_map(|(f, v)| CacheOp::Verify(f, v)),
        (arb_fingerprint(), arb_trust_level()).prop_map(|(f, t)| CacheOp::Trust(f, t)),
        arb_fingerprint().prop_map(CacheOp::Remove),
    ]
}

fn apply(cache: &mut IdentityCache, op: CacheOp) {
    match op {
        CacheOp::Upsert(fingerprint, nickname) => {
            let mut social = cache
                .get_social_identity(&fingerprint)
                .cloned()
                .unwrap_or_else(|| SocialIdentity::new(fingerprint.clone()));
            social.claimed_nickname = nickname;
            cache.upsert_social_identity(social);
        }
        CacheOp::Favorite(fingerprint, on) => {
            cache.update_social_identity_with(&fingerprint, |s| s.set_favorite(on))
        }
        CacheOp::Block(fingerprint, on) => {
            cache.update_social_identity_with(&fingerprint, |s| s.set_blocked(on))
        }
        CacheOp::Verify(fingerprint, on) => cache.set_verified(&fingerprint, on),
        CacheOp::Trust(fingerprint, level) => cache.set_trust_level(&fingerprint, level),
        CacheOp::Remove(fingerprint) => {
            cache.remove_social_identity(&fingerprint);
        }
    }
}

proptest! {
    /// Property: favorite and blocked are never both set
    #[test]
    fn favorite_and_blocked_never_both(ops in prop::collection::vec(arb_cache_op(), 0..60)) {
        let mut cache = IdentityCache::new();
        for op in ops {
            apply(&mut cache, op);
            for social in cache.social_identities().values() {
                prop_assert!(!(social.is_favorite && social.is_blocked));
            }
        }
    }

    /// Property: the nickname index mirrors the social identities after every step
    #[test]
    fn nickname_index_stays_consistent(ops in prop::collection::vec(arb_cache_op(), 0..60)) {
        let mut cache = IdentityCache::new();
        for op in ops {
            apply(&mut cache, op);
            prop_assert!(cache.nickname_index_is_consistent());
        }

        for (nickname, bucket) in cache.nickname_index() {
            prop_assert!(!bucket.is_empty());
            for fingerprint in bucket {
                prop_assert_eq!(
                    &cache.get_social_identity(fingerprint).unwrap().claimed_nickname,
                    nickname
                );
            }
        }
    }

    /// Property: a persisted and reloaded cache is unchanged
    #[test]
    fn cache_survives_bincode(ops in prop::collection::vec(arb_cache_op(), 0..30)) {
        let mut cache = IdentityCache::new();
        for op in ops {
            apply(&mut cache, op);
        }
        let bytes = bincode::serialize(&cache).unwrap();
        let mut decoded: IdentityCache = bincode::deserialize(&bytes).unwrap();
        decoded.rebuild_nickname_index();
        prop_assert_eq!(decoded, cache);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: any UTF-8 message round-trips through a channel
    #[test]
    fn channel_round_trip(message in "\\PC{0,256}", channel in "#[a-z0-9]{1,12}") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let channels = NoiseChannelEncryption::new_for_testing();
            channels.set_channel_password("pw", &channel, None).await.unwrap();
            let sealed = channels.encrypt_channel_message(&message, &channel).await.unwrap();
            let opened = channels.decrypt_channel_message(&sealed, &channel).await.unwrap();
            assert_eq!(opened, message);
        });
    }
}
