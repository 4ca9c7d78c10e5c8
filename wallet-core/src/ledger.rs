//! Transaction ledger reads
//!
//! Appends happen only inside the writer's atomic units; this module is
//! the read side: filtered history pages, per-user lookups, and the
//! replay check backing the balance-consistency invariant.

use crate::{
    money::Paise,
    types::{Transaction, TransactionKind, TransactionSource},
    Error, Result, Storage,
};
use std::sync::Arc;
use uuid::Uuid;

/// Largest accepted page size
pub const MAX_PAGE_LIMIT: usize = 100;

/// Optional filters for a history query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only entries of this kind
    pub kind: Option<TransactionKind>,

    /// Only entries from this source
    pub source: Option<TransactionSource>,
}

impl TransactionFilter {
    fn matches(&self, txn: &Transaction) -> bool {
        self.kind.map_or(true, |kind| txn.kind == kind)
            && self.source.map_or(true, |source| txn.source == source)
    }
}

/// Read-only ledger over committed state
#[derive(Clone)]
pub struct Ledger {
    storage: Arc<Storage>,
}

impl Ledger {
    pub(crate) fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Page through a user's history, newest first.
    ///
    /// `page` is 1-based. Returns the page of matching entries and the
    /// total number of entries matching the filter.
    pub fn query(
        &self,
        user_id: Uuid,
        filter: TransactionFilter,
        page: usize,
        limit: usize,
    ) -> Result<(Vec<Transaction>, u64)> {
        if page == 0 {
            return Err(Error::Validation("Page must be at least 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(Error::Validation(format!(
                "Limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }

        let skip = (page - 1) * limit;
        let mut matched = 0u64;
        let mut entries = Vec::new();

        for txn_id in self.storage.user_transaction_ids_desc(user_id)? {
            let txn = self.load(txn_id)?;
            if !filter.matches(&txn) {
                continue;
            }

            matched += 1;
            if matched as usize > skip && entries.len() < limit {
                entries.push(txn);
            }
        }

        Ok((entries, matched))
    }

    /// Look up a single transaction, scoped to its owning user
    pub fn get(&self, txn_id: Uuid, user_id: Uuid) -> Result<Transaction> {
        match self.storage.get_transaction(txn_id)? {
            Some(txn) if txn.user_id == user_id => Ok(txn),
            _ => Err(Error::TransactionNotFound(txn_id.to_string())),
        }
    }

    /// Replay a user's entries from zero: Σcredits − Σdebits.
    ///
    /// For a consistent ledger this equals the wallet's committed balance
    /// at all times.
    pub fn replayed_balance(&self, user_id: Uuid) -> Result<Paise> {
        let mut total: i128 = 0;

        for txn_id in self.storage.user_transaction_ids_desc(user_id)? {
            let txn = self.load(txn_id)?;
            match txn.kind {
                TransactionKind::Credit => total += txn.amount.as_paise() as i128,
                TransactionKind::Debit => total -= txn.amount.as_paise() as i128,
            }
        }

        let total = i64::try_from(total)
            .map_err(|_| Error::Storage("Replayed balance overflows".to_string()))?;
        Ok(Paise::new(total))
    }

    fn load(&self, txn_id: Uuid) -> Result<Transaction> {
        self.storage
            .get_transaction(txn_id)?
            .ok_or_else(|| Error::Storage(format!("Dangling index entry for {}", txn_id)))
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionContext;
    use crate::wallet::{exec_credit, exec_debit};
    use crate::Config;
    use tempfile::TempDir;

    fn test_storage() -> (Arc<Storage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Arc::new(Storage::open(&config).unwrap()), temp_dir)
    }

    fn seed_history(storage: &Storage, user_id: Uuid) {
        let bonus = || TransactionContext::new(TransactionSource::Bonus, "Bonus");
        let purchase = || TransactionContext::new(TransactionSource::Purchase, "Purchase");

        exec_credit(storage, user_id, Paise::from_rupees(100), bonus()).unwrap();
        exec_credit(storage, user_id, Paise::from_rupees(200), bonus()).unwrap();
        exec_debit(storage, user_id, Paise::from_rupees(50), purchase()).unwrap();
        exec_credit(storage, user_id, Paise::from_rupees(25), bonus()).unwrap();
        exec_debit(storage, user_id, Paise::from_rupees(75), purchase()).unwrap();
    }

    #[test]
    fn test_query_pages_newest_first() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();
        seed_history(&storage, user_id);

        let ledger = Ledger::new(storage);

        let (page1, total) = ledger
            .query(user_id, TransactionFilter::default(), 1, 2)
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        // Newest first: the ₹75 debit, then the ₹25 credit
        assert_eq!(page1[0].amount, Paise::from_rupees(75));
        assert_eq!(page1[1].amount, Paise::from_rupees(25));

        let (page3, total) = ledger
            .query(user_id, TransactionFilter::default(), 3, 2)
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].amount, Paise::from_rupees(100));
    }

    #[test]
    fn test_query_filters() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();
        seed_history(&storage, user_id);

        let ledger = Ledger::new(storage);

        let filter = TransactionFilter {
            kind: Some(TransactionKind::Debit),
            ..Default::default()
        };
        let (debits, total) = ledger.query(user_id, filter, 1, 10).unwrap();
        assert_eq!(total, 2);
        assert!(debits.iter().all(|t| t.kind == TransactionKind::Debit));

        let filter = TransactionFilter {
            source: Some(TransactionSource::Bonus),
            ..Default::default()
        };
        let (bonuses, total) = ledger.query(user_id, filter, 1, 10).unwrap();
        assert_eq!(total, 3);
        assert!(bonuses.iter().all(|t| t.source == TransactionSource::Bonus));
    }

    #[test]
    fn test_query_validates_pagination() {
        let (storage, _temp) = test_storage();
        let ledger = Ledger::new(storage);
        let user_id = Uuid::new_v4();

        assert!(matches!(
            ledger.query(user_id, TransactionFilter::default(), 0, 10),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ledger.query(user_id, TransactionFilter::default(), 1, 0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ledger.query(user_id, TransactionFilter::default(), 1, 101),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_get_is_scoped_to_owner() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();

        let (_, txn) = exec_credit(
            &storage,
            user_id,
            Paise::from_rupees(10),
            TransactionContext::new(TransactionSource::Bonus, "Bonus"),
        )
        .unwrap();

        let ledger = Ledger::new(storage);

        assert_eq!(ledger.get(txn.txn_id, user_id).unwrap(), txn);
        assert!(matches!(
            ledger.get(txn.txn_id, Uuid::new_v4()),
            Err(Error::TransactionNotFound(_))
        ));
        assert!(matches!(
            ledger.get(Uuid::now_v7(), user_id),
            Err(Error::TransactionNotFound(_))
        ));
    }

    #[test]
    fn test_replayed_balance_matches_wallet() {
        let (storage, _temp) = test_storage();
        let user_id = Uuid::new_v4();
        seed_history(&storage, user_id);

        let wallet = storage.get_wallet(user_id).unwrap().unwrap();
        let ledger = Ledger::new(storage);

        assert_eq!(ledger.replayed_balance(user_id).unwrap(), wallet.balance);
        assert_eq!(wallet.balance, Paise::from_rupees(200));
    }
}
