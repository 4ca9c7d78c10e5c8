//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet records (key: user_id)
//! - `transactions` - Append-only transaction log (key: txn_id, UUIDv7)
//! - `referrals` - Referral records (key: referral_id)
//! - `settings` - Singleton policy record (fixed key)
//! - `indices` - Secondary indices for fast lookups
//!
//! Every multi-record mutation goes through a single `WriteBatch`, so the
//! wallet write, the ledger append, and any referral transition commit or
//! abort together.

use crate::{
    error::{Error, Result},
    types::{Referral, Settings, Transaction, Wallet},
    Config,
};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode,
    Options, WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";
const CF_REFERRALS: &str = "referrals";
const CF_SETTINGS: &str = "settings";
const CF_INDICES: &str = "indices";

/// Fixed key for the settings singleton
const SETTINGS_KEY: &[u8] = b"singleton";

/// Index key tags
const IDX_USER_TXN: &[u8] = b"txn|";
const IDX_REFEREE: &[u8] = b"referee|";
const IDX_REFERRER: &[u8] = b"referrer|";
const IDX_CODE: &[u8] = b"code|";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for an append-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_REFERRALS, Self::cf_options_referrals()),
            ColumnFamilyDescriptor::new(CF_SETTINGS, Self::cf_options_settings()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB");

        Ok(Self { db })
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallets are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_referrals() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_settings() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Wallet operations

    /// Get wallet by user ID
    pub fn get_wallet(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;

        match self.db.get_cf(&cf, user_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Put wallet (used for creation; balance changes go through the
    /// atomic commit units below)
    pub fn put_wallet(&self, wallet: &Wallet) -> Result<()> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let value = bincode::serialize(wallet)?;

        self.db.put_cf(&cf, wallet.user_id.as_bytes(), &value)?;

        tracing::debug!(
            user_id = %wallet.user_id,
            wallet_id = %wallet.wallet_id,
            "Wallet created"
        );

        Ok(())
    }

    // Transaction operations

    /// Get transaction by ID
    pub fn get_transaction(&self, txn_id: Uuid) -> Result<Option<Transaction>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        match self.db.get_cf(&cf, txn_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Transaction IDs for a user, newest first
    ///
    /// Keys are UUIDv7, so a reverse scan of the user index yields
    /// created-at descending order.
    pub fn user_transaction_ids_desc(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_key_user_txn(&user_id, None);

        let mut upper = prefix.clone();
        upper.extend_from_slice(&[0xff; 16]);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&upper, Direction::Reverse));

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let tail = &key[prefix.len()..];
            if tail.len() == 16 {
                let bytes: [u8; 16] = tail.try_into().unwrap();
                ids.push(Uuid::from_bytes(bytes));
            }
        }

        Ok(ids)
    }

    // Referral operations

    /// Get referral by ID
    pub fn get_referral(&self, referral_id: Uuid) -> Result<Option<Referral>> {
        let cf = self.cf_handle(CF_REFERRALS)?;

        match self.db.get_cf(&cf, referral_id.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Referral ID for a referee, if one exists (uniqueness backstop)
    pub fn referral_id_for_referee(&self, referee_id: Uuid) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let key = Self::index_key_referee(&referee_id);

        match self.db.get_cf(&cf, &key)? {
            Some(value) if value.len() == 16 => {
                let bytes: [u8; 16] = value.as_slice().try_into().unwrap();
                Ok(Some(Uuid::from_bytes(bytes)))
            }
            Some(_) => Err(Error::Storage("Corrupt referee index entry".to_string())),
            None => Ok(None),
        }
    }

    /// Referral IDs for a referrer, newest first
    pub fn referral_ids_for_referrer_desc(&self, referrer_id: Uuid) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let prefix = Self::index_key_referrer(&referrer_id, None);

        let mut upper = prefix.clone();
        upper.extend_from_slice(&[0xff; 16]);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&upper, Direction::Reverse));

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }

            let tail = &key[prefix.len()..];
            if tail.len() == 16 {
                let bytes: [u8; 16] = tail.try_into().unwrap();
                ids.push(Uuid::from_bytes(bytes));
            }
        }

        Ok(ids)
    }

    // Settings operations

    /// Get the settings singleton
    pub fn get_settings(&self) -> Result<Option<Settings>> {
        let cf = self.cf_handle(CF_SETTINGS)?;

        match self.db.get_cf(&cf, SETTINGS_KEY)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Put the settings singleton
    pub fn put_settings(&self, settings: &Settings) -> Result<()> {
        let cf = self.cf_handle(CF_SETTINGS)?;
        let value = bincode::serialize(settings)?;

        self.db.put_cf(&cf, SETTINGS_KEY, &value)?;

        Ok(())
    }

    // Atomic commit units

    /// Commit a wallet mutation together with its ledger entry
    pub fn commit_wallet_txn(&self, wallet: &Wallet, txn: &Transaction) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_wallet_txn(&mut batch, wallet, txn)?;

        self.db.write(batch)?;

        tracing::debug!(
            user_id = %wallet.user_id,
            txn_id = %txn.txn_id,
            balance_after = %txn.balance_after,
            "Wallet transaction committed"
        );

        Ok(())
    }

    /// Commit a referral creation with its uniqueness and lookup indices
    pub fn commit_referral_create(&self, referral: &Referral) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_referrals = self.cf_handle(CF_REFERRALS)?;
        let value = bincode::serialize(referral)?;
        batch.put_cf(&cf_referrals, referral.referral_id.as_bytes(), &value);

        let cf_indices = self.cf_handle(CF_INDICES)?;

        // Index: referee -> referral_id (unique)
        let idx_referee = Self::index_key_referee(&referral.referee_id);
        batch.put_cf(&cf_indices, &idx_referee, referral.referral_id.as_bytes());

        // Index: referrer || referral_id -> empty
        let idx_referrer =
            Self::index_key_referrer(&referral.referrer_id, Some(referral.referral_id));
        batch.put_cf(&cf_indices, &idx_referrer, []);

        // Index: code || referral_id -> empty
        let idx_code = Self::index_key_code(&referral.referral_code, referral.referral_id);
        batch.put_cf(&cf_indices, &idx_code, []);

        self.db.write(batch)?;

        tracing::debug!(
            referral_id = %referral.referral_id,
            referrer_id = %referral.referrer_id,
            referee_id = %referral.referee_id,
            "Referral created"
        );

        Ok(())
    }

    /// Commit a referral reward: wallet credit, ledger entry, and status
    /// transition as one unit
    pub fn commit_referral_reward(
        &self,
        wallet: &Wallet,
        txn: &Transaction,
        referral: &Referral,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();
        self.batch_wallet_txn(&mut batch, wallet, txn)?;

        let cf_referrals = self.cf_handle(CF_REFERRALS)?;
        let value = bincode::serialize(referral)?;
        batch.put_cf(&cf_referrals, referral.referral_id.as_bytes(), &value);

        self.db.write(batch)?;

        tracing::debug!(
            referral_id = %referral.referral_id,
            referrer_id = %referral.referrer_id,
            reward = %txn.amount,
            "Referral reward committed"
        );

        Ok(())
    }

    /// Stage a wallet write, its transaction, and the user index entry
    fn batch_wallet_txn(
        &self,
        batch: &mut WriteBatch,
        wallet: &Wallet,
        txn: &Transaction,
    ) -> Result<()> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let wallet_value = bincode::serialize(wallet)?;
        batch.put_cf(&cf_wallets, wallet.user_id.as_bytes(), &wallet_value);

        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        let txn_value = bincode::serialize(txn)?;
        batch.put_cf(&cf_txns, txn.txn_id.as_bytes(), &txn_value);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        let idx_user_txn = Self::index_key_user_txn(&txn.user_id, Some(txn.txn_id));
        batch.put_cf(&cf_indices, &idx_user_txn, []);

        Ok(())
    }

    // Index key helpers

    fn index_key_user_txn(user_id: &Uuid, txn_id: Option<Uuid>) -> Vec<u8> {
        let mut key = IDX_USER_TXN.to_vec();
        key.extend_from_slice(user_id.as_bytes());
        if let Some(tid) = txn_id {
            key.extend_from_slice(tid.as_bytes());
        }
        key
    }

    fn index_key_referee(referee_id: &Uuid) -> Vec<u8> {
        let mut key = IDX_REFEREE.to_vec();
        key.extend_from_slice(referee_id.as_bytes());
        key
    }

    fn index_key_referrer(referrer_id: &Uuid, referral_id: Option<Uuid>) -> Vec<u8> {
        let mut key = IDX_REFERRER.to_vec();
        key.extend_from_slice(referrer_id.as_bytes());
        if let Some(rid) = referral_id {
            key.extend_from_slice(rid.as_bytes());
        }
        key
    }

    fn index_key_code(code: &str, referral_id: Uuid) -> Vec<u8> {
        let mut key = IDX_CODE.to_vec();
        key.extend_from_slice(code.as_bytes());
        key.push(b'|');
        key.extend_from_slice(referral_id.as_bytes());
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_referrals = self.cf_handle(CF_REFERRALS)?;

        Ok(StorageStats {
            total_wallets: self.approximate_count(&cf_wallets)?,
            total_transactions: self.approximate_count(&cf_txns)?,
            total_referrals: self.approximate_count(&cf_referrals)?,
        })
    }

    fn approximate_count(&self, cf: &Arc<BoundColumnFamily<'_>>) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate wallet count
    pub total_wallets: u64,
    /// Approximate transaction count
    pub total_transactions: u64,
    /// Approximate referral count
    pub total_referrals: u64,
}
