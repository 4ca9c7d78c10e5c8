//! Wallet store: per-user balance and lifetime aggregates
//!
//! Mutations run inside the single writer; each credit/debit commits the
//! wallet write and its ledger entry in one `WriteBatch`.

use crate::{
    actor::WalletHandle,
    money::Paise,
    types::{Transaction, TransactionContext, TransactionKind, Wallet, MAX_DESCRIPTION_LEN},
    Error, Result, Storage,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Public wallet operations
#[derive(Clone)]
pub struct WalletStore {
    handle: WalletHandle,
    storage: Arc<Storage>,
}

impl WalletStore {
    pub(crate) fn new(handle: WalletHandle, storage: Arc<Storage>) -> Self {
        Self { handle, storage }
    }

    /// Return the user's wallet, creating an empty one if absent.
    ///
    /// Routed through the writer, so concurrent calls for the same user
    /// cannot create duplicates.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet> {
        self.handle.get_or_create_wallet(user_id).await
    }

    /// Increase the balance and `total_earned` by `amount`, appending one
    /// CREDIT ledger entry in the same atomic unit.
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: Paise,
        ctx: TransactionContext,
    ) -> Result<(Wallet, Transaction)> {
        self.handle.credit(user_id, amount, ctx).await
    }

    /// Decrease the balance and increase `total_spent` by `amount`,
    /// appending one DEBIT ledger entry in the same atomic unit.
    ///
    /// Fails with `InsufficientBalance` rather than ever letting the
    /// balance go negative.
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: Paise,
        ctx: TransactionContext,
    ) -> Result<(Wallet, Transaction)> {
        self.handle.debit(user_id, amount, ctx).await
    }

    /// Committed read of a wallet, if it exists
    pub fn get(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        self.storage.get_wallet(user_id)
    }
}

impl std::fmt::Debug for WalletStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletStore").finish_non_exhaustive()
    }
}

// Writer-side execution. These run inside the single-writer task; the
// load-validate-commit sequence is not interleaved with any other mutation.

pub(crate) fn exec_get_or_create(storage: &Storage, user_id: Uuid) -> Result<Wallet> {
    if let Some(wallet) = storage.get_wallet(user_id)? {
        return Ok(wallet);
    }

    let wallet = Wallet::new(user_id, Utc::now());
    storage.put_wallet(&wallet)?;
    Ok(wallet)
}

pub(crate) fn exec_credit(
    storage: &Storage,
    user_id: Uuid,
    amount: Paise,
    ctx: TransactionContext,
) -> Result<(Wallet, Transaction)> {
    if !amount.is_positive() {
        return Err(Error::Validation("Amount must be positive".to_string()));
    }
    validate_context(&ctx)?;

    let now = Utc::now();
    let mut wallet = match storage.get_wallet(user_id)? {
        Some(wallet) => wallet,
        None => Wallet::new(user_id, now),
    };

    apply_credit(&mut wallet, amount, now)?;

    let txn = Transaction::completed(
        user_id,
        wallet.wallet_id,
        TransactionKind::Credit,
        amount,
        ctx,
        wallet.balance,
        now,
    );

    storage.commit_wallet_txn(&wallet, &txn)?;

    Ok((wallet, txn))
}

pub(crate) fn exec_debit(
    storage: &Storage,
    user_id: Uuid,
    amount: Paise,
    ctx: TransactionContext,
) -> Result<(Wallet, Transaction)> {
    if !amount.is_positive() {
        return Err(Error::Validation("Amount must be positive".to_string()));
    }
    validate_context(&ctx)?;

    let now = Utc::now();
    let mut wallet = storage
        .get_wallet(user_id)?
        .ok_or_else(|| Error::WalletNotFound(user_id.to_string()))?;

    let remaining = wallet
        .balance
        .checked_sub(amount)
        .filter(|balance| !balance.is_negative())
        .ok_or_else(|| {
            Error::InsufficientBalance(format!(
                "requested {}, available {}",
                amount, wallet.balance
            ))
        })?;

    wallet.balance = remaining;
    wallet.total_spent = wallet
        .total_spent
        .checked_add(amount)
        .ok_or_else(|| Error::Validation("Amount overflows lifetime spend".to_string()))?;
    wallet.last_transaction_at = now;
    wallet.updated_at = now;

    let txn = Transaction::completed(
        user_id,
        wallet.wallet_id,
        TransactionKind::Debit,
        amount,
        ctx,
        wallet.balance,
        now,
    );

    storage.commit_wallet_txn(&wallet, &txn)?;

    Ok((wallet, txn))
}

/// Apply a credit to an in-memory wallet value.
///
/// Shared by the direct credit path and referral completion, which stages
/// the mutated wallet into a larger `WriteBatch`.
pub(crate) fn apply_credit(
    wallet: &mut Wallet,
    amount: Paise,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    wallet.balance = wallet
        .balance
        .checked_add(amount)
        .ok_or_else(|| Error::Validation("Amount overflows wallet balance".to_string()))?;
    wallet.total_earned = wallet
        .total_earned
        .checked_add(amount)
        .ok_or_else(|| Error::Validation("Amount overflows lifetime earnings".to_string()))?;
    wallet.last_transaction_at = now;
    wallet.updated_at = now;
    Ok(())
}

fn validate_context(ctx: &TransactionContext) -> Result<()> {
    if ctx.description.is_empty() {
        return Err(Error::Validation("Description is required".to_string()));
    }
    if ctx.description.len() > MAX_DESCRIPTION_LEN {
        return Err(Error::Validation(format!(
            "Description cannot exceed {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionSource;
    use crate::Config;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn bonus_ctx() -> TransactionContext {
        TransactionContext::new(TransactionSource::Bonus, "Promotional bonus")
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();

        let first = exec_get_or_create(&storage, user_id).unwrap();
        let second = exec_get_or_create(&storage, user_id).unwrap();

        assert_eq!(first.wallet_id, second.wallet_id);
        assert_eq!(first.balance, Paise::ZERO);
    }

    #[test]
    fn test_credit_rejects_non_positive_amount() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();

        let err = exec_credit(&storage, user_id, Paise::ZERO, bonus_ctx()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = exec_credit(&storage, user_id, Paise::new(-100), bonus_ctx()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Nothing was created
        assert!(storage.get_wallet(user_id).unwrap().is_none());
    }

    #[test]
    fn test_credit_creates_wallet_and_entry() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();

        let (wallet, txn) =
            exec_credit(&storage, user_id, Paise::from_rupees(250), bonus_ctx()).unwrap();

        assert_eq!(wallet.balance, Paise::from_rupees(250));
        assert_eq!(wallet.total_earned, Paise::from_rupees(250));
        assert_eq!(wallet.total_spent, Paise::ZERO);
        assert_eq!(txn.kind, TransactionKind::Credit);
        assert_eq!(txn.balance_after, Paise::from_rupees(250));

        let stored = storage.get_transaction(txn.txn_id).unwrap().unwrap();
        assert_eq!(stored, txn);
    }

    #[test]
    fn test_debit_requires_existing_wallet() {
        let (storage, _temp) = test_storage();

        let err =
            exec_debit(&storage, Uuid::new_v4(), Paise::from_rupees(10), bonus_ctx()).unwrap_err();
        assert!(matches!(err, Error::WalletNotFound(_)));
    }

    #[test]
    fn test_debit_never_overdraws() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();

        exec_credit(&storage, user_id, Paise::from_rupees(100), bonus_ctx()).unwrap();

        let err =
            exec_debit(&storage, user_id, Paise::from_rupees(101), bonus_ctx()).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance(_)));

        // Failed debit left no trace
        let wallet = storage.get_wallet(user_id).unwrap().unwrap();
        assert_eq!(wallet.balance, Paise::from_rupees(100));
        assert_eq!(wallet.total_spent, Paise::ZERO);
        assert_eq!(storage.user_transaction_ids_desc(user_id).unwrap().len(), 1);

        // Exact balance is spendable
        let (wallet, txn) =
            exec_debit(&storage, user_id, Paise::from_rupees(100), bonus_ctx()).unwrap();
        assert_eq!(wallet.balance, Paise::ZERO);
        assert_eq!(wallet.total_spent, Paise::from_rupees(100));
        assert_eq!(txn.balance_after, Paise::ZERO);
    }

    #[test]
    fn test_description_validation() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();

        let empty = TransactionContext::new(TransactionSource::Bonus, "");
        let err = exec_credit(&storage, user_id, Paise::from_rupees(1), empty).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let long = TransactionContext::new(TransactionSource::Bonus, "x".repeat(201));
        let err = exec_credit(&storage, user_id, Paise::from_rupees(1), long).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
