//! Wallet / Referral Ledger Core
//!
//! Transactional core of a wallet and referral ledger: per-user balances,
//! an immutable history of balance-affecting events, and a reward workflow
//! for referrals, under strict consistency rules.
//!
//! # Architecture
//!
//! - **Single Writer**: one logical writer task serializes every mutation,
//!   so no interleaving can overdraw a wallet or reward a referral twice
//! - **Atomic Units**: each operation commits its wallet write, ledger
//!   append, and any referral transition in one RocksDB `WriteBatch`
//! - **Append-only Ledger**: entries are never modified or deleted
//! - **Integer Money**: amounts are paise (`i64` minor units); rounding
//!   exists only at formatting boundaries
//!
//! # Invariants
//!
//! - A balance is never negative
//! - Replaying a wallet's entries from zero reproduces its balance
//! - Each referral produces at most one reward credit
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{Config, WalletService};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let config = Config::default();
//!     let service = WalletService::open(config).await?;
//!
//!     let wallet = service.wallets().get_or_create(uuid::Uuid::new_v4()).await?;
//!     println!("balance: {}", wallet.balance);
//!
//!     service.shutdown().await
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod payment;
pub mod referral;
pub mod service;
pub mod settings;
pub mod storage;
pub mod types;
pub mod wallet;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{Ledger, TransactionFilter};
pub use metrics::Metrics;
pub use money::Paise;
pub use payment::{PaymentOutcome, PaymentProcessor};
pub use referral::{ReferralEngine, ReferralStats};
pub use service::WalletService;
pub use settings::{SettingsStore, SettingsUpdate};
pub use storage::Storage;
pub use types::{
    Referral, ReferralStatus, Settings, Transaction, TransactionContext, TransactionKind,
    TransactionSource, TransactionStatus, Wallet,
};
pub use wallet::WalletStore;
