//! Adapter-level execution counters, supplementing.1's RPC pool
//! metrics with the same counter shape for the trading layer. No exporter is
//! wired up here; a caller scrapes `snapshot()` into whatever backend it uses.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterMetricsSnapshot {
    pub buys_attempted: u64,
    pub buys_succeeded: u64,
    pub sells_attempted: u64,
    pub sells_succeeded: u64,
    pub discriminator_fallbacks: u64,
}

#[derive(Default)]
pub struct AdapterMetrics {
    buys_attempted: AtomicU64,
    buys_succeeded: AtomicU64,
    sells_attempted: AtomicU64,
    sells_succeeded: AtomicU64,
    discriminator_fallbacks: AtomicU64,
}

impl AdapterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_buy_attempt(&self) {
        self.buys_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_buy_success(&self) {
        self.buys_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sell_attempt(&self) {
        self.sells_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sell_success(&self) {
        self.sells_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discriminator_fallback(&self) {
        self.discriminator_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AdapterMetricsSnapshot {
        AdapterMetricsSnapshot {
            buys_attempted: self.buys_attempted.load(Ordering::Relaxed),
            buys_succeeded: self.buys_succeeded.load(Ordering::Relaxed),
            sells_attempted: self.sells_attempted.load(Ordering::Relaxed),
            sells_succeeded: self.sells_succeeded.load(Ordering::Relaxed),
            discriminator_fallbacks: self.discriminator_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_independently() {
        let metrics = AdapterMetrics::new();
        metrics.record_buy_attempt();
        metrics.record_buy_attempt();
        metrics.record_buy_success();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.buys_attempted, 2);
        assert_eq!(snapshot.buys_succeeded, 1);
        assert_eq!(snapshot.sells_attempted, 0);
    }
}
