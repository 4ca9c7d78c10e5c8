//! Referral lifecycle: creation on signup, one-time completion with reward
//!
//! Completion is the only path that grants a reward. The Pending-only
//! guard runs on the single writer and commits together with the wallet
//! credit and ledger entry, so a referral can never be rewarded twice.

use crate::{
    actor::WalletHandle,
    money::Paise,
    settings,
    types::{Referral, ReferralStatus, Transaction, TransactionContext, TransactionKind,
            TransactionSource, Wallet},
    wallet, Error, Result, Storage,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Aggregate referral counters for one referrer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferralStats {
    /// Referrals created
    pub total: u64,

    /// Referrals completed
    pub completed: u64,

    /// Rewards earned across completed referrals
    pub total_earnings: Paise,
}

/// Public referral operations
#[derive(Clone)]
pub struct ReferralEngine {
    handle: WalletHandle,
    storage: Arc<Storage>,
}

impl ReferralEngine {
    pub(crate) fn new(handle: WalletHandle, storage: Arc<Storage>) -> Self {
        Self { handle, storage }
    }

    /// Create a pending referral for a newly registered referee.
    ///
    /// Invoked by the registration flow once the referee's user record
    /// exists. At most one referral per referee is ever created.
    pub async fn create(
        &self,
        referrer_id: Uuid,
        referee_id: Uuid,
        code: impl Into<String>,
    ) -> Result<Referral> {
        self.handle
            .create_referral(referrer_id, referee_id, code.into())
            .await
    }

    /// Complete a pending referral, crediting the reward to the referrer.
    ///
    /// The reward amount is the settings value in force at completion
    /// time. Only the referrer may complete their own referral.
    pub async fn complete(&self, referral_id: Uuid, actor_id: Uuid) -> Result<Transaction> {
        self.handle.complete_referral(referral_id, actor_id).await
    }

    /// Referrals created by a user, newest first, with aggregate stats
    pub fn list(&self, referrer_id: Uuid) -> Result<(Vec<Referral>, ReferralStats)> {
        let mut referrals = Vec::new();

        for referral_id in self.storage.referral_ids_for_referrer_desc(referrer_id)? {
            let referral = self.storage.get_referral(referral_id)?.ok_or_else(|| {
                Error::Storage(format!("Dangling index entry for {}", referral_id))
            })?;
            referrals.push(referral);
        }

        let mut stats = ReferralStats {
            total: referrals.len() as u64,
            ..Default::default()
        };
        for referral in &referrals {
            if referral.status == ReferralStatus::Completed {
                stats.completed += 1;
                stats.total_earnings = stats.total_earnings.saturating_add(referral.reward_amount);
            }
        }

        Ok((referrals, stats))
    }
}

impl std::fmt::Debug for ReferralEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferralEngine").finish_non_exhaustive()
    }
}

// Writer-side execution

pub(crate) fn exec_create(
    storage: &Storage,
    referrer_id: Uuid,
    referee_id: Uuid,
    code: &str,
) -> Result<Referral> {
    if code.is_empty() {
        return Err(Error::Validation("Referral code is required".to_string()));
    }
    if referrer_id == referee_id {
        return Err(Error::Validation(
            "Users cannot refer themselves".to_string(),
        ));
    }
    if storage.referral_id_for_referee(referee_id)?.is_some() {
        return Err(Error::Validation(
            "Referee already has a referral".to_string(),
        ));
    }

    // Snapshot of the current reward, for display; the authoritative
    // amount is re-read from settings at completion time
    let settings = settings::ensure_settings(storage)?;

    let referral = Referral::new(
        referrer_id,
        referee_id,
        code,
        settings.referral_reward_amount,
        Utc::now(),
    );

    storage.commit_referral_create(&referral)?;

    Ok(referral)
}

pub(crate) fn exec_complete(
    storage: &Storage,
    referral_id: Uuid,
    actor_id: Uuid,
) -> Result<Transaction> {
    let mut referral = storage
        .get_referral(referral_id)?
        .ok_or_else(|| Error::ReferralNotFound(referral_id.to_string()))?;

    if actor_id != referral.referrer_id {
        return Err(Error::Unauthorized(
            "You are not authorized to complete this referral".to_string(),
        ));
    }

    match referral.status {
        ReferralStatus::Pending => {}
        ReferralStatus::Completed => {
            return Err(Error::InvalidState("Referral already completed".to_string()));
        }
        ReferralStatus::Expired => {
            return Err(Error::InvalidState("Referral has expired".to_string()));
        }
    }

    let settings = settings::ensure_settings(storage)?;
    let reward = settings.referral_reward_amount;
    if !reward.is_positive() {
        return Err(Error::Validation(
            "Referral reward amount must be positive".to_string(),
        ));
    }

    let now = Utc::now();
    let mut wallet = match storage.get_wallet(referral.referrer_id)? {
        Some(wallet) => wallet,
        None => Wallet::new(referral.referrer_id, now),
    };
    wallet::apply_credit(&mut wallet, reward, now)?;

    let ctx = TransactionContext::new(
        TransactionSource::Referral,
        "Referral reward for inviting user",
    )
    .with_reference(referral.referee_id.to_string())
    .with_metadata("referralId", referral.referral_id.to_string())
    .with_metadata("refereeId", referral.referee_id.to_string());

    let txn = Transaction::completed(
        referral.referrer_id,
        wallet.wallet_id,
        TransactionKind::Credit,
        reward,
        ctx,
        wallet.balance,
        now,
    );

    referral.status = ReferralStatus::Completed;
    referral.is_rewarded = true;
    referral.completed_at = Some(now);
    referral.reward_amount = reward;
    referral.updated_at = now;

    // Credit, ledger entry, and status transition commit together
    storage.commit_referral_reward(&wallet, &txn, &referral)?;

    Ok(txn)
}
