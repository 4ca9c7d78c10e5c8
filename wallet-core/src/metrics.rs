//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `wallet_credits_total` - Credit transactions committed
//! - `wallet_debits_total` - Debit transactions committed
//! - `wallet_referrals_completed_total` - Referrals completed with reward
//! - `wallet_payments_total` - Wallet-funded payments processed
//! - `wallet_commit_duration_seconds` - Histogram of atomic-commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total credit transactions committed
    pub credits_total: IntCounter,

    /// Total debit transactions committed
    pub debits_total: IntCounter,

    /// Total referrals completed
    pub referrals_completed_total: IntCounter,

    /// Total wallet-funded payments
    pub payments_total: IntCounter,

    /// Atomic commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let credits_total = IntCounter::new(
            "wallet_credits_total",
            "Credit transactions committed",
        )?;
        registry.register(Box::new(credits_total.clone()))?;

        let debits_total = IntCounter::new(
            "wallet_debits_total",
            "Debit transactions committed",
        )?;
        registry.register(Box::new(debits_total.clone()))?;

        let referrals_completed_total = IntCounter::new(
            "wallet_referrals_completed_total",
            "Referrals completed with reward",
        )?;
        registry.register(Box::new(referrals_completed_total.clone()))?;

        let payments_total = IntCounter::new(
            "wallet_payments_total",
            "Wallet-funded payments processed",
        )?;
        registry.register(Box::new(payments_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_commit_duration_seconds",
                "Histogram of atomic-commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            credits_total,
            debits_total,
            referrals_completed_total,
            payments_total,
            commit_duration,
            registry,
        })
    }

    /// Record a committed credit
    pub fn record_credit(&self) {
        self.credits_total.inc();
    }

    /// Record a committed debit
    pub fn record_debit(&self) {
        self.debits_total.inc();
    }

    /// Record a completed referral
    pub fn record_referral_completed(&self) {
        self.referrals_completed_total.inc();
    }

    /// Record a processed wallet payment
    pub fn record_payment(&self) {
        self.payments_total.inc();
    }

    /// Record an atomic-commit duration
    pub fn record_commit_duration(&self, duration_seconds: f64) {
        self.commit_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("credits_total", &self.credits_total.get())
            .field("debits_total", &self.debits_total.get())
            .finish_non_exhaustive()
    }
}
