//! Single-writer concurrency for the wallet core
//!
//! Every mutating operation is a message processed start-to-finish by one
//! writer task: load, validate, build the `WriteBatch`, commit. This
//! serializes all balance reads/writes, so two concurrent debits can never
//! both observe the same sufficient balance, and only one caller can ever
//! see a referral in `Pending` and proceed to reward it.
//!
//! Reads (history queries, cached settings, wallet lookups) go straight to
//! committed storage and never enter the mailbox.

use crate::{
    metrics::Metrics,
    money::Paise,
    payment::{self, PaymentOutcome},
    referral,
    settings::{self, SettingsUpdate},
    types::{Referral, Settings, Transaction, TransactionContext, Wallet},
    wallet, Error, Result, Storage,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the wallet writer actor
pub enum WalletCommand {
    /// Get or atomically create a wallet
    GetOrCreateWallet {
        /// Owning user
        user_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<Wallet>>,
    },

    /// Credit a wallet and append the ledger entry
    Credit {
        /// Owning user
        user_id: Uuid,
        /// Amount to credit
        amount: Paise,
        /// Transaction context
        ctx: TransactionContext,
        /// Reply channel
        response: oneshot::Sender<Result<(Wallet, Transaction)>>,
    },

    /// Debit a wallet and append the ledger entry
    Debit {
        /// Owning user
        user_id: Uuid,
        /// Amount to debit
        amount: Paise,
        /// Transaction context
        ctx: TransactionContext,
        /// Reply channel
        response: oneshot::Sender<Result<(Wallet, Transaction)>>,
    },

    /// Create a pending referral
    CreateReferral {
        /// Referring user
        referrer_id: Uuid,
        /// Referred user
        referee_id: Uuid,
        /// Code the referee signed up with
        code: String,
        /// Reply channel
        response: oneshot::Sender<Result<Referral>>,
    },

    /// Complete a pending referral and credit the reward
    CompleteReferral {
        /// Referral to complete
        referral_id: Uuid,
        /// Caller claiming the reward
        actor_id: Uuid,
        /// Reply channel
        response: oneshot::Sender<Result<Transaction>>,
    },

    /// Execute a wallet-funded payment
    Pay {
        /// Paying user
        user_id: Uuid,
        /// Payment amount
        amount: Paise,
        /// Order correlation id
        order_id: String,
        /// Whether the wallet funds this payment
        use_wallet: bool,
        /// Reply channel
        response: oneshot::Sender<Result<PaymentOutcome>>,
    },

    /// Materialize the settings singleton if absent
    EnsureSettings {
        /// Reply channel
        response: oneshot::Sender<Result<Settings>>,
    },

    /// Apply an administrative settings update
    UpdateSettings {
        /// Partial update
        update: SettingsUpdate,
        /// Reply channel
        response: oneshot::Sender<Result<Settings>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes wallet commands
pub struct WalletActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Mailbox for incoming commands
    mailbox: mpsc::Receiver<WalletCommand>,
}

impl WalletActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        metrics: Metrics,
        mailbox: mpsc::Receiver<WalletCommand>,
    ) -> Self {
        Self {
            storage,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(cmd) = self.mailbox.recv().await {
            match cmd {
                WalletCommand::Shutdown => break,
                other => self.handle_command(other),
            }
        }

        tracing::info!("Wallet writer stopped");
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: WalletCommand) {
        match cmd {
            WalletCommand::GetOrCreateWallet { user_id, response } => {
                let result = wallet::exec_get_or_create(&self.storage, user_id);
                let _ = response.send(result);
            }

            WalletCommand::Credit {
                user_id,
                amount,
                ctx,
                response,
            } => {
                let start = Instant::now();
                let result = wallet::exec_credit(&self.storage, user_id, amount, ctx);
                if result.is_ok() {
                    self.metrics.record_credit();
                    self.metrics
                        .record_commit_duration(start.elapsed().as_secs_f64());
                }
                let _ = response.send(result);
            }

            WalletCommand::Debit {
                user_id,
                amount,
                ctx,
                response,
            } => {
                let start = Instant::now();
                let result = wallet::exec_debit(&self.storage, user_id, amount, ctx);
                if result.is_ok() {
                    self.metrics.record_debit();
                    self.metrics
                        .record_commit_duration(start.elapsed().as_secs_f64());
                }
                let _ = response.send(result);
            }

            WalletCommand::CreateReferral {
                referrer_id,
                referee_id,
                code,
                response,
            } => {
                let result = referral::exec_create(&self.storage, referrer_id, referee_id, &code);
                let _ = response.send(result);
            }

            WalletCommand::CompleteReferral {
                referral_id,
                actor_id,
                response,
            } => {
                let start = Instant::now();
                let result = referral::exec_complete(&self.storage, referral_id, actor_id);
                if result.is_ok() {
                    self.metrics.record_referral_completed();
                    self.metrics.record_credit();
                    self.metrics
                        .record_commit_duration(start.elapsed().as_secs_f64());
                }
                let _ = response.send(result);
            }

            WalletCommand::Pay {
                user_id,
                amount,
                order_id,
                use_wallet,
                response,
            } => {
                let start = Instant::now();
                let result =
                    payment::exec_pay(&self.storage, user_id, amount, &order_id, use_wallet);
                if let Ok(PaymentOutcome::Wallet { .. }) = &result {
                    self.metrics.record_payment();
                    self.metrics.record_debit();
                    self.metrics
                        .record_commit_duration(start.elapsed().as_secs_f64());
                }
                let _ = response.send(result);
            }

            WalletCommand::EnsureSettings { response } => {
                let result = settings::ensure_settings(&self.storage);
                let _ = response.send(result);
            }

            WalletCommand::UpdateSettings { update, response } => {
                let result = settings::exec_update(&self.storage, update);
                let _ = response.send(result);
            }

            WalletCommand::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending commands to the actor
#[derive(Clone)]
pub struct WalletHandle {
    sender: mpsc::Sender<WalletCommand>,
}

impl WalletHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WalletCommand>) -> Self {
        Self { sender }
    }

    async fn send(&self, cmd: WalletCommand) -> Result<()> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }

    /// Get or atomically create a wallet
    pub async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::GetOrCreateWallet {
            user_id,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Credit a wallet
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: Paise,
        ctx: TransactionContext,
    ) -> Result<(Wallet, Transaction)> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::Credit {
            user_id,
            amount,
            ctx,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Debit a wallet
    pub async fn debit(
        &self,
        user_id: Uuid,
        amount: Paise,
        ctx: TransactionContext,
    ) -> Result<(Wallet, Transaction)> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::Debit {
            user_id,
            amount,
            ctx,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Create a pending referral
    pub async fn create_referral(
        &self,
        referrer_id: Uuid,
        referee_id: Uuid,
        code: String,
    ) -> Result<Referral> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::CreateReferral {
            referrer_id,
            referee_id,
            code,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Complete a pending referral
    pub async fn complete_referral(
        &self,
        referral_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Transaction> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::CompleteReferral {
            referral_id,
            actor_id,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Execute a wallet-funded payment
    pub async fn pay(
        &self,
        user_id: Uuid,
        amount: Paise,
        order_id: String,
        use_wallet: bool,
    ) -> Result<PaymentOutcome> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::Pay {
            user_id,
            amount,
            order_id,
            use_wallet,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Materialize the settings singleton if absent
    pub async fn ensure_settings(&self) -> Result<Settings> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::EnsureSettings { response: tx })
            .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Apply an administrative settings update
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let (tx, rx) = oneshot::channel();
        self.send(WalletCommand::UpdateSettings {
            update,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(WalletCommand::Shutdown).await
    }
}

/// Spawn the wallet writer actor
pub fn spawn_wallet_actor(
    storage: Arc<Storage>,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> WalletHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = WalletActor::new(storage, metrics, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    WalletHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionSource;
    use crate::Config;

    fn test_storage() -> (Arc<Storage>, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Arc::new(Storage::open(&config).unwrap()), temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (storage, _temp) = test_storage();
        let handle = spawn_wallet_actor(storage, Metrics::new().unwrap(), 100);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_credit_round_trip() {
        let (storage, _temp) = test_storage();
        let metrics = Metrics::new().unwrap();
        let handle = spawn_wallet_actor(storage.clone(), metrics.clone(), 100);

        let user_id = Uuid::new_v4();
        let ctx = TransactionContext::new(TransactionSource::Bonus, "Signup bonus");
        let (wallet, txn) = handle
            .credit(user_id, Paise::from_rupees(100), ctx)
            .await
            .unwrap();

        assert_eq!(wallet.balance, Paise::from_rupees(100));
        assert_eq!(txn.balance_after, Paise::from_rupees(100));
        assert_eq!(metrics.credits_total.get(), 1);

        // Committed state is visible to direct reads
        let stored = storage.get_wallet(user_id).unwrap().unwrap();
        assert_eq!(stored.balance, Paise::from_rupees(100));

        handle.shutdown().await.unwrap();
    }
}
