//! Wallet-funded payments under policy limits
//!
//! A payment may spend at most `balance * max_spend_percentage / 100`.
//! The balance check runs before the cap check, so an amount over the
//! balance reports `InsufficientBalance` even when it also exceeds the
//! cap. The debit and its ledger entry commit as one unit.

use crate::{
    actor::WalletHandle,
    money::Paise,
    settings,
    types::{Transaction, TransactionContext, TransactionSource, Wallet},
    wallet, Error, Result, Storage,
};
use uuid::Uuid;

/// Result of a payment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment handled by an external means; the wallet was not touched
    External,

    /// Wallet-funded payment, committed
    Wallet {
        /// Wallet state after the debit
        wallet: Wallet,
        /// The DEBIT ledger entry
        transaction: Transaction,
    },
}

/// Public payment operations
#[derive(Clone)]
pub struct PaymentProcessor {
    handle: WalletHandle,
}

impl PaymentProcessor {
    pub(crate) fn new(handle: WalletHandle) -> Self {
        Self { handle }
    }

    /// Execute a payment for an order.
    ///
    /// With `use_wallet` false this is a no-op success; otherwise the
    /// amount is validated against the balance and the spend cap, then
    /// debited with one PURCHASE ledger entry.
    pub async fn pay(
        &self,
        user_id: Uuid,
        amount: Paise,
        order_id: impl Into<String>,
        use_wallet: bool,
    ) -> Result<PaymentOutcome> {
        self.handle
            .pay(user_id, amount, order_id.into(), use_wallet)
            .await
    }
}

impl std::fmt::Debug for PaymentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentProcessor").finish_non_exhaustive()
    }
}

// Writer-side execution

pub(crate) fn exec_pay(
    storage: &Storage,
    user_id: Uuid,
    amount: Paise,
    order_id: &str,
    use_wallet: bool,
) -> Result<PaymentOutcome> {
    if !use_wallet {
        return Ok(PaymentOutcome::External);
    }

    if !amount.is_positive() {
        return Err(Error::Validation("Amount must be positive".to_string()));
    }
    if order_id.is_empty() {
        return Err(Error::Validation("Order ID is required".to_string()));
    }

    let wallet = storage
        .get_wallet(user_id)?
        .ok_or_else(|| Error::WalletNotFound(user_id.to_string()))?;

    let settings = settings::ensure_settings(storage)?;
    let spendable = wallet.balance.percent(settings.max_spend_percentage);

    if amount > wallet.balance {
        return Err(Error::InsufficientBalance(format!(
            "requested {}, available {}",
            amount, wallet.balance
        )));
    }

    if amount > spendable {
        return Err(Error::LimitExceeded(format!(
            "Amount exceeds spendable limit of {} ({}% of balance)",
            spendable, settings.max_spend_percentage
        )));
    }

    let ctx = TransactionContext::new(
        TransactionSource::Purchase,
        format!("Payment for order {}", order_id),
    )
    .with_reference(order_id)
    .with_metadata("orderId", order_id)
    .with_metadata("paymentMethod", "wallet");

    let (wallet, transaction) = wallet::exec_debit(storage, user_id, amount, ctx)?;

    tracing::debug!(
        user_id = %user_id,
        order_id = %order_id,
        amount = %amount,
        balance_after = %wallet.balance,
        "Wallet payment committed"
    );

    Ok(PaymentOutcome::Wallet {
        wallet,
        transaction,
    })
}
