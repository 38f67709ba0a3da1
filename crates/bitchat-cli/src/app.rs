//! Wiring of the identity manager and channel layer over one credential store

use std::sync::Arc;

use tracing::{debug, info};

use bitchat_security::{
    default_crypto_provider, storage::create_file_storage, FileSecureStorage,
    NoiseChannelEncryption, SecureIdentityStateManager, SystemTimeSource,
};

use crate::config::CliAppConfig;
use crate::error::Result;
use crate::replay::ReplayLedger;

/// Services shared by every command
#[derive(Debug)]
pub struct TrustApp {
    config: CliAppConfig,
    storage: Arc<FileSecureStorage>,
    identities: SecureIdentityStateManager,
    channels: NoiseChannelEncryption,
    replay_ledger: ReplayLedger,
}

impl TrustApp {
    /// Open the credential store and restore stored channel keys
    pub async fn open(config: CliAppConfig) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let storage = create_file_storage(&data_dir, &config.storage.service_id)?;
        let crypto = default_crypto_provider();
        info!(
            backend = crypto.name(),
            store = %storage.root().display(),
            "Opened credential store"
        );

        let identities = SecureIdentityStateManager::with_storage(
            storage.clone(),
            crypto.clone(),
            config.security.identity.clone(),
        );
        let channels = NoiseChannelEncryption::with_config(
            crypto,
            storage.clone(),
            config.security.channels.clone(),
            Arc::new(SystemTimeSource),
        );

        let replay_ledger = ReplayLedger::new(
            storage.clone(),
            config.security.channels.key_packet_max_age(),
        );

        let restored = channels.load_all_channel_passwords().await?;
        debug!(channels = restored, "Restored channel keys");

        Ok(Self {
            config,
            storage,
            identities,
            channels,
            replay_ledger,
        })
    }

    pub fn config(&self) -> &CliAppConfig {
        &self.config
    }

    pub fn storage(&self) -> &FileSecureStorage {
        &self.storage
    }

    pub fn identities(&self) -> &SecureIdentityStateManager {
        &self.identities
    }

    pub fn channels(&self) -> &NoiseChannelEncryption {
        &self.channels
    }

    /// Key-packet nonces accepted by earlier runs
    pub fn replay_ledger(&self) -> &ReplayLedger {
        &self.replay_ledger
    }

    /// Stop background work
    pub fn shutdown(&self) {
        self.channels.shutdown();
    }
}
