//! Service composition root
//!
//! Opens storage, spawns the single writer, and hands out the component
//! facades. Writes go through the actor; reads go straight to committed
//! storage.

use crate::{
    actor::{spawn_wallet_actor, WalletHandle},
    ledger::Ledger,
    metrics::Metrics,
    payment::PaymentProcessor,
    referral::ReferralEngine,
    settings::SettingsStore,
    storage::StorageStats,
    types::Settings,
    wallet::WalletStore,
    Config, Error, Result, Storage,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Wallet ledger service
pub struct WalletService {
    /// Writer handle
    handle: WalletHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Shared settings cache, refreshed on committed updates
    settings_cache: Arc<RwLock<Option<Settings>>>,
}

impl WalletService {
    /// Open the service with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to build metrics: {}", e)))?;

        let handle = spawn_wallet_actor(storage.clone(), metrics.clone(), config.mailbox_capacity);

        tracing::info!(service = %config.service_name, "Wallet service opened");

        Ok(Self {
            handle,
            storage,
            metrics,
            settings_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Wallet operations
    pub fn wallets(&self) -> WalletStore {
        WalletStore::new(self.handle.clone(), self.storage.clone())
    }

    /// Transaction history reads
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.storage.clone())
    }

    /// Policy settings access
    pub fn settings(&self) -> SettingsStore {
        SettingsStore::new(
            self.handle.clone(),
            self.storage.clone(),
            self.settings_cache.clone(),
        )
    }

    /// Referral operations
    pub fn referrals(&self) -> ReferralEngine {
        ReferralEngine::new(self.handle.clone(), self.storage.clone())
    }

    /// Payment operations
    pub fn payments(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.handle.clone())
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Shutdown the writer
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService").finish_non_exhaustive()
    }
}
