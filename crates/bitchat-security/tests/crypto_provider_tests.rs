//! Known-answer and interoperability tests for the crypto backends

use bitchat_security::crypto::{CryptoProvider, RustCryptoProvider};
use bitchat_security::{default_crypto_provider, generate_fingerprint, BitchatError, CryptographicError};

fn hex32(s: &str) -> [u8; 32] {
    hex::decode(s).unwrap().try_into().unwrap()
}

fn backends() -> Vec<Box<dyn CryptoProvider>> {
    let mut backends: Vec<Box<dyn CryptoProvider>> = vec![Box::new(RustCryptoProvider::default())];
    #[cfg(feature = "native-crypto")]
    backends.push(Box::new(bitchat_security::RingCryptoProvider::default()));
    backends
}

// ----------------------------------------------------------------------------
// Known Answers
// ----------------------------------------------------------------------------

#[test]
fn test_sha256_vector() {
    for crypto in backends() {
        assert_eq!(
            hex::encode(crypto.sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
            "{}",
            crypto.name()
        );
    }
}

#[test]
fn test_hmac_sha256_vector() {
    for crypto in backends() {
        let mac = crypto
            .hmac_sha256(b"what do ya want for nothing?", b"Jefe")
            .unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843",
            "{}",
            crypto.name()
        );
    }
}

#[test]
fn test_pbkdf2_vectors() {
    for crypto in backends() {
        let one = crypto.pbkdf2_sha256(b"password", b"salt", 1, 32).unwrap();
        assert_eq!(
            hex::encode(one),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
        let two = crypto.pbkdf2_sha256(b"password", b"salt", 2, 32).unwrap();
        assert_eq!(
            hex::encode(two),
            "ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43"
        );
    }
}

#[test]
fn test_pbkdf2_rejects_zero_iterations() {
    for crypto in backends() {
        let err = crypto.pbkdf2_sha256(b"password", b"salt", 0, 32).unwrap_err();
        assert!(matches!(
            err,
            BitchatError::Crypto(CryptographicError::KeyDerivationFailed)
        ));
    }
}

#[test]
fn test_x25519_rfc7748_vector() {
    let alice_private = hex32("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a");
    let bob_private = hex32("5dab087e624a8a4b79e17f8b83800ee66f3bb1292618b6fd1c2f8b27ff88e0eb");

    for crypto in backends() {
        let alice_public = crypto.public_key(&alice_private);
        let bob_public = crypto.public_key(&bob_private);
        assert_eq!(
            hex::encode(alice_public),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
        assert_eq!(
            hex::encode(bob_public),
            "de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f"
        );

        let ab = crypto.shared_secret(&alice_private, &bob_public).unwrap();
        let ba = crypto.shared_secret(&bob_private, &alice_public).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(
            hex::encode(ab),
            "4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742"
        );
    }
}

// ----------------------------------------------------------------------------
// AEAD Behaviour
// ----------------------------------------------------------------------------

#[test]
fn test_chacha_poly_rejects_tampering() {
    let key = [7u8; 32];
    let nonce = [9u8; 12];
    for crypto in backends() {
        let mut sealed = crypto
            .chacha_poly_encrypt(b"mesh message", &key, &nonce, b"")
            .unwrap();
        assert_eq!(sealed.len(), b"mesh message".len() + 16);
        assert_eq!(
            crypto
                .chacha_poly_decrypt(&sealed, &key, &nonce, b"")
                .unwrap(),
            b"mesh message"
        );

        sealed[0] ^= 0x01;
        assert!(crypto.chacha_poly_decrypt(&sealed, &key, &nonce, b"").is_err());
        assert!(crypto
            .chacha_poly_decrypt(&sealed[..8], &key, &nonce, b"")
            .is_err());
    }
}

#[test]
fn test_invalid_key_and_nonce_lengths() {
    for crypto in backends() {
        let err = crypto
            .chacha_poly_encrypt(b"x", &[0u8; 16], &[0u8; 12], b"")
            .unwrap_err();
        assert!(matches!(
            err,
            BitchatError::Crypto(CryptographicError::InvalidKeyFormat {
                expected: 32,
                actual: 16
            })
        ));

        let err = crypto
            .chacha_poly_encrypt(b"x", &[0u8; 32], &[0u8; 8], b"")
            .unwrap_err();
        assert!(matches!(
            err,
            BitchatError::Crypto(CryptographicError::InvalidNonceLength { .. })
        ));
    }
}

#[test]
fn test_aes_gcm_combined_format() {
    let key = [3u8; 32];
    for crypto in backends() {
        let first = crypto.aes_gcm_encrypt(b"identity cache", &key).unwrap();
        let second = crypto.aes_gcm_encrypt(b"identity cache", &key).unwrap();
        assert_eq!(first.len(), 12 + b"identity cache".len() + 16);
        assert_ne!(first, second, "nonce must be fresh per call");

        assert_eq!(crypto.aes_gcm_decrypt(&first, &key).unwrap(), b"identity cache");
        assert!(crypto.aes_gcm_decrypt(&first, &[4u8; 32]).is_err());
        assert!(crypto.aes_gcm_decrypt(&first[..20], &key).is_err());
    }
}

// ----------------------------------------------------------------------------
// Backend Interop
// ----------------------------------------------------------------------------

#[cfg(feature = "native-crypto")]
#[test]
fn test_backends_interoperate() {
    use bitchat_security::RingCryptoProvider;

    let portable = RustCryptoProvider::default();
    let native = RingCryptoProvider::default();
    let key = [0x42u8; 32];
    let nonce = [0x24u8; 12];

    let sealed = native
        .chacha_poly_encrypt(b"cross-backend", &key, &nonce, b"aad")
        .unwrap();
    assert_eq!(
        sealed,
        portable
            .chacha_poly_encrypt(b"cross-backend", &key, &nonce, b"aad")
            .unwrap()
    );
    assert_eq!(
        portable
            .chacha_poly_decrypt(&sealed, &key, &nonce, b"aad")
            .unwrap(),
        b"cross-backend"
    );

    let boxed = portable.aes_gcm_encrypt(b"blob", &key).unwrap();
    assert_eq!(native.aes_gcm_decrypt(&boxed, &key).unwrap(), b"blob");
    let boxed = native.aes_gcm_encrypt(b"blob", &key).unwrap();
    assert_eq!(portable.aes_gcm_decrypt(&boxed, &key).unwrap(), b"blob");

    let private = native.generate_private_key().unwrap();
    assert_eq!(native.public_key(&private), portable.public_key(&private));
}

#[test]
fn test_random_and_fingerprint() {
    let crypto = default_crypto_provider();
    let a = crypto.random_bytes(32).unwrap();
    let b = crypto.random_bytes(32).unwrap();
    assert_eq!(a.len(), 32);
    assert_ne!(a, b);
    assert!(crypto.random_bytes(0).unwrap().is_empty());

    let fingerprint = generate_fingerprint(crypto.as_ref(), b"abc");
    assert_eq!(
        fingerprint.to_string(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
