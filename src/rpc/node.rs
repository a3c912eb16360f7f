//! A single RPC endpoint tracked by the pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use solana_client::nonblocking::rpc_client::RpcClient;

/// Health fields that must be observed together under a single lock (the
/// active flag is mutated together with its latency/health snapshot, never
/// alone). Counters that can be read
/// independently (`success_count`/`error_count`) live as atomics on the
/// owning `RpcNode` instead, so a health-log read never blocks a live call.
struct NodeHealth {
    active: bool,
    ewma_latency: Option<Duration>,
    last_error_time: Option<Instant>,
}

pub struct RpcNode {
    pub endpoint: String,
    pub client: RpcClient,
    health: RwLock<NodeHealth>,
    success_count: AtomicU64,
    error_count: AtomicU64,
}

/// Snapshot of one node's health for metrics reporting.
#[derive(Debug, Clone)]
pub struct NodeMetrics {
    pub endpoint: String,
    pub active: bool,
    pub success_count: u64,
    pub error_count: u64,
    pub ewma_latency: Option<Duration>,
}

impl RpcNode {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout(endpoint.clone(), timeout);
        Self {
            endpoint,
            client,
            health: RwLock::new(NodeHealth { active: true, ewma_latency: None, last_error_time: None }),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.health.read().active
    }

    pub fn set_active(&self, active: bool) {
        self.health.write().active = active;
    }

    /// Records a successful call: bumps the monotonic counter and folds the
    /// observed latency into the moving average `(old + sample) / 2`.
    pub fn record_success(&self, latency: Duration) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        let mut health = self.health.write();
        health.ewma_latency = Some(match health.ewma_latency {
            Some(prev) => (prev + latency) / 2,
            None => latency,
        });
    }

    /// Records a failed call and marks the node inactive; the pool's retry
    /// loop is responsible for deciding whether to escalate.
    pub fn record_failure(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        let mut health = self.health.write();
        health.active = false;
        health.last_error_time = Some(Instant::now());
    }

    pub fn metrics(&self) -> NodeMetrics {
        let health = self.health.read();
        NodeMetrics {
            endpoint: self.endpoint.clone(),
            active: health.active,
            success_count: self.success_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            ewma_latency: health.ewma_latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_latency_averages_samples() {
        let node = RpcNode::new("http://localhost:8899".into(), Duration::from_secs(1));
        node.record_success(Duration::from_millis(100));
        node.record_success(Duration::from_millis(300));
        let metrics = node.metrics();
        assert_eq!(metrics.ewma_latency, Some(Duration::from_millis(200)));
        assert_eq!(metrics.success_count, 2);
    }

    #[test]
    fn failure_marks_node_inactive() {
        let node = RpcNode::new("http://localhost:8899".into(), Duration::from_secs(1));
        assert!(node.is_active());
        node.record_failure();
        assert!(!node.is_active());
        assert_eq!(node.metrics().error_count, 1);
    }
}
