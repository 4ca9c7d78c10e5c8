//! Error types for the wallet core

use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (non-positive amount, empty order id, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wallet not found
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Referral not found
    #[error("Referral not found: {0}")]
    ReferralNotFound(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Actor is not allowed to perform the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation is not valid for the record's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Debit amount exceeds wallet balance
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Amount exceeds a configured policy limit
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Storage error (RocksDB); the atomic unit was aborted whole
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
