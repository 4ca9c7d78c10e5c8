//! Core types for the wallet ledger
//!
//! All persisted types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (integer minor units for money)

use crate::money::Paise;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Longest accepted transaction description
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// Days until a pending referral is eligible for expiry
pub const REFERRAL_EXPIRY_DAYS: i64 = 30;

/// Per-user wallet with lifetime aggregates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet ID
    pub wallet_id: Uuid,

    /// Owning user (unique, one wallet per user)
    pub user_id: Uuid,

    /// Current balance, never negative
    pub balance: Paise,

    /// Lifetime credits, monotonic non-decreasing
    pub total_earned: Paise,

    /// Lifetime debits, monotonic non-decreasing
    pub total_spent: Paise,

    /// Whether the wallet is active
    pub is_active: bool,

    /// Timestamp of the most recent balance change
    pub last_transaction_at: DateTime<Utc>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// New empty wallet for a user
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            wallet_id: Uuid::now_v7(),
            user_id,
            balance: Paise::ZERO,
            total_earned: Paise::ZERO,
            total_spent: Paise::ZERO,
            is_active: true,
            last_transaction_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Direction of a balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Balance increase
    Credit = 1,
    /// Balance decrease
    Debit = 2,
}

/// Business origin of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionSource {
    /// Referral reward
    Referral = 1,
    /// Wallet-funded purchase
    Purchase = 2,
    /// Manual administrative credit
    AdminCredit = 3,
    /// Refund of a prior purchase
    Refund = 4,
    /// Promotional bonus
    Bonus = 5,
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Awaiting settlement (never produced by this core)
    Pending = 1,
    /// Committed
    Completed = 2,
    /// Failed (never produced by this core)
    Failed = 3,
}

/// Caller-supplied context for a credit or debit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    /// Business origin
    pub source: TransactionSource,

    /// Human-readable description
    pub description: String,

    /// External correlation id (order id, referee id, ...)
    pub reference_id: Option<String>,

    /// Opaque key/value bag
    pub metadata: HashMap<String, String>,
}

impl TransactionContext {
    /// New context with just a source and description
    pub fn new(source: TransactionSource, description: impl Into<String>) -> Self {
        Self {
            source,
            description: description.into(),
            reference_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach an external correlation id
    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Immutable record of one balance change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub txn_id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Wallet the change applied to
    pub wallet_id: Uuid,

    /// Credit or debit
    pub kind: TransactionKind,

    /// Amount moved, always positive
    pub amount: Paise,

    /// Business origin
    pub source: TransactionSource,

    /// Human-readable description
    pub description: String,

    /// External correlation id
    pub reference_id: Option<String>,

    /// Wallet balance immediately after this entry applied
    pub balance_after: Paise,

    /// Transaction status
    pub status: TransactionStatus,

    /// Opaque key/value bag
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a committed entry from a context and the post-change balance
    pub fn completed(
        user_id: Uuid,
        wallet_id: Uuid,
        kind: TransactionKind,
        amount: Paise,
        ctx: TransactionContext,
        balance_after: Paise,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            txn_id: Uuid::now_v7(),
            user_id,
            wallet_id,
            kind,
            amount,
            source: ctx.source,
            description: ctx.description,
            reference_id: ctx.reference_id,
            balance_after,
            status: TransactionStatus::Completed,
            metadata: ctx.metadata,
            created_at: now,
        }
    }
}

/// Referral status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReferralStatus {
    /// Created, reward not yet granted
    Pending = 1,
    /// Reward granted (terminal)
    Completed = 2,
    /// Lapsed without reward (terminal)
    Expired = 3,
}

/// Record linking a referrer to a referred user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    /// Unique referral ID (UUIDv7)
    pub referral_id: Uuid,

    /// User who referred
    pub referrer_id: Uuid,

    /// User who was referred (at most one referral per referee)
    pub referee_id: Uuid,

    /// Code the referee signed up with, stored upper-cased
    pub referral_code: String,

    /// Lifecycle status
    pub status: ReferralStatus,

    /// Reward amount; snapshot at creation, overwritten with the
    /// settings value in force at completion
    pub reward_amount: Paise,

    /// True iff the reward credit was committed
    pub is_rewarded: bool,

    /// When the referral completed
    pub completed_at: Option<DateTime<Utc>>,

    /// When the referral becomes eligible for expiry
    pub expires_at: DateTime<Utc>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    /// New pending referral
    pub fn new(
        referrer_id: Uuid,
        referee_id: Uuid,
        referral_code: impl Into<String>,
        reward_amount: Paise,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            referral_id: Uuid::now_v7(),
            referrer_id,
            referee_id,
            referral_code: referral_code.into().to_uppercase(),
            status: ReferralStatus::Pending,
            reward_amount,
            is_rewarded: false,
            completed_at: None,
            expires_at: now + Duration::days(REFERRAL_EXPIRY_DAYS),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Process-wide wallet policy settings (singleton record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Ceiling on wallet-funded payments, as a percentage of balance (0-100)
    pub max_spend_percentage: u32,

    /// Reward credited to the referrer on completion
    pub referral_reward_amount: Paise,

    /// Whether the wallet feature is enabled
    pub is_wallet_enabled: bool,

    /// Minimum balance policy (stored, not enforced here)
    pub min_wallet_balance: Paise,

    /// Daily spend cap policy (stored, not enforced here)
    pub max_daily_spend: Paise,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_spend_percentage: 80,
            referral_reward_amount: Paise::from_rupees(500),
            is_wallet_enabled: true,
            min_wallet_balance: Paise::ZERO,
            max_daily_spend: Paise::from_rupees(10_000),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wallet_is_empty() {
        let now = Utc::now();
        let wallet = Wallet::new(Uuid::new_v4(), now);
        assert_eq!(wallet.balance, Paise::ZERO);
        assert_eq!(wallet.total_earned, Paise::ZERO);
        assert_eq!(wallet.total_spent, Paise::ZERO);
        assert!(wallet.is_active);
        assert_eq!(wallet.created_at, now);
    }

    #[test]
    fn test_referral_defaults() {
        let now = Utc::now();
        let referral = Referral::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "abc123",
            Paise::from_rupees(500),
            now,
        );
        assert_eq!(referral.status, ReferralStatus::Pending);
        assert!(!referral.is_rewarded);
        assert_eq!(referral.referral_code, "ABC123");
        assert_eq!(referral.expires_at, now + Duration::days(30));
        assert!(referral.completed_at.is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_spend_percentage, 80);
        assert_eq!(settings.referral_reward_amount, Paise::from_rupees(500));
        assert!(settings.is_wallet_enabled);
        assert_eq!(settings.max_daily_spend, Paise::from_rupees(10_000));
    }

    #[test]
    fn test_money_serializes_as_raw_paise() {
        // Paise is transparent over i64, so API payloads carry plain
        // integers rather than nested objects
        let wallet = Wallet::new(Uuid::new_v4(), Utc::now());
        let json = serde_json::to_value(&wallet).unwrap();
        assert_eq!(json["balance"], 0);

        let settings = Settings::default();
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["referral_reward_amount"], 50_000);
        assert_eq!(json["max_spend_percentage"], 80);
    }

    #[test]
    fn test_transaction_context_builder() {
        let ctx = TransactionContext::new(TransactionSource::Purchase, "Payment for order A-1")
            .with_reference("A-1")
            .with_metadata("paymentMethod", "wallet");
        assert_eq!(ctx.reference_id.as_deref(), Some("A-1"));
        assert_eq!(ctx.metadata.get("paymentMethod").map(String::as_str), Some("wallet"));
    }
}
