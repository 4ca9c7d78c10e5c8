//! Wallet policy settings singleton
//!
//! One logical record governs spend limits and reward amounts. It is
//! materialized with defaults on first read and mutated only through the
//! administrative update, which runs on the single writer so concurrent
//! edits cannot lose updates. Reads are served from a process-local cache
//! refreshed on every committed update.

use crate::{
    actor::WalletHandle,
    money::Paise,
    types::Settings,
    Error, Result, Storage,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;

/// Administrative partial update of the settings singleton
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    /// New spend cap percentage (0-100)
    pub max_spend_percentage: Option<u32>,

    /// New referral reward amount
    pub referral_reward_amount: Option<Paise>,

    /// Enable or disable the wallet feature
    pub is_wallet_enabled: Option<bool>,

    /// New minimum balance policy
    pub min_wallet_balance: Option<Paise>,

    /// New daily spend cap policy
    pub max_daily_spend: Option<Paise>,
}

/// Read-mostly access to the settings singleton
#[derive(Clone)]
pub struct SettingsStore {
    handle: WalletHandle,
    storage: Arc<Storage>,
    cache: Arc<RwLock<Option<Settings>>>,
}

impl SettingsStore {
    pub(crate) fn new(
        handle: WalletHandle,
        storage: Arc<Storage>,
        cache: Arc<RwLock<Option<Settings>>>,
    ) -> Self {
        Self {
            handle,
            storage,
            cache,
        }
    }

    /// Return the singleton, materializing defaults on first read
    pub async fn get(&self) -> Result<Settings> {
        if let Some(settings) = self.cache.read().clone() {
            return Ok(settings);
        }

        let settings = match self.storage.get_settings()? {
            Some(settings) => settings,
            // Creation goes through the writer so racing first reads
            // cannot materialize two different default records
            None => self.handle.ensure_settings().await?,
        };

        *self.cache.write() = Some(settings.clone());
        Ok(settings)
    }

    /// Apply an administrative update and refresh the cache
    pub async fn update(&self, update: SettingsUpdate) -> Result<Settings> {
        let settings = self.handle.update_settings(update).await?;
        *self.cache.write() = Some(settings.clone());
        Ok(settings)
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").finish_non_exhaustive()
    }
}

// Writer-side execution

pub(crate) fn ensure_settings(storage: &Storage) -> Result<Settings> {
    if let Some(settings) = storage.get_settings()? {
        return Ok(settings);
    }

    let settings = Settings::default();
    storage.put_settings(&settings)?;

    tracing::info!("Materialized default wallet settings");
    Ok(settings)
}

pub(crate) fn exec_update(storage: &Storage, update: SettingsUpdate) -> Result<Settings> {
    validate_update(&update)?;

    let mut settings = ensure_settings(storage)?;

    if let Some(pct) = update.max_spend_percentage {
        settings.max_spend_percentage = pct;
    }
    if let Some(amount) = update.referral_reward_amount {
        settings.referral_reward_amount = amount;
    }
    if let Some(enabled) = update.is_wallet_enabled {
        settings.is_wallet_enabled = enabled;
    }
    if let Some(amount) = update.min_wallet_balance {
        settings.min_wallet_balance = amount;
    }
    if let Some(amount) = update.max_daily_spend {
        settings.max_daily_spend = amount;
    }
    settings.updated_at = Utc::now();

    storage.put_settings(&settings)?;

    tracing::info!(
        max_spend_percentage = settings.max_spend_percentage,
        referral_reward = %settings.referral_reward_amount,
        "Wallet settings updated"
    );

    Ok(settings)
}

fn validate_update(update: &SettingsUpdate) -> Result<()> {
    if let Some(pct) = update.max_spend_percentage {
        if pct > 100 {
            return Err(Error::Validation(
                "Max spend percentage cannot exceed 100".to_string(),
            ));
        }
    }
    if let Some(amount) = update.referral_reward_amount {
        if amount.is_negative() {
            return Err(Error::Validation(
                "Referral reward amount cannot be negative".to_string(),
            ));
        }
    }
    if let Some(amount) = update.min_wallet_balance {
        if amount.is_negative() {
            return Err(Error::Validation(
                "Minimum wallet balance cannot be negative".to_string(),
            ));
        }
    }
    if let Some(amount) = update.max_daily_spend {
        if amount.is_negative() {
            return Err(Error::Validation(
                "Max daily spend cannot be negative".to_string(),
            ));
        }
    }
    Ok(())
}
