//! Round-robin failover pool over a fleet of equivalent RPC endpoints.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use solana_client::nonblocking::rpc_client::RpcClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::constants::trade::{MAX_RETRIES, RETRY_DELAY, RPC_HEALTH_LOG_INTERVAL};
use crate::error::{EngineError, EngineResult};

use super::node::{NodeMetrics, RpcNode};

/// A single node's call either succeeded, failed transiently (mark the node
/// unhealthy and retry on a sibling), or failed with a decoded protocol
/// error that the caller should see verbatim.
pub enum NodeCallError {
    Transport(anyhow::Error),
    Protocol(EngineError),
}

impl NodeCallError {
    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        Self::Transport(err.into())
    }
}

#[derive(Debug, Clone)]
pub struct RpcEndpointConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct RpcPoolConfig {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub health_log_interval: Duration,
}

impl Default for RpcPoolConfig {
    fn default() -> Self {
        Self {
            request_timeout: crate::constants::trade::DEFAULT_RPC_TIMEOUT,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            health_log_interval: RPC_HEALTH_LOG_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub active_nodes: usize,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub average_latency: Option<Duration>,
    pub last_successful_at: Option<Instant>,
}

pub struct RpcPool {
    nodes: Vec<RpcNode>,
    cursor: AtomicUsize,
    config: RpcPoolConfig,
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    last_successful_at: RwLock<Option<Instant>>,
}

impl RpcPool {
    pub fn new(endpoints: Vec<RpcEndpointConfig>, config: RpcPoolConfig) -> EngineResult<Self> {
        if endpoints.is_empty() {
            return Err(EngineError::invalid_account_data("RPC pool requires at least one endpoint"));
        }
        let nodes =
            endpoints.into_iter().map(|e| RpcNode::new(e.url, config.request_timeout)).collect();
        Ok(Self {
            nodes,
            cursor: AtomicUsize::new(0),
            config,
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            last_successful_at: RwLock::new(None),
        })
    }

    /// Strict round-robin over active nodes. A full lap without finding an
    /// active node means the pool is down; the caller fails fast rather than
    /// spinning.
    fn next_active_node(&self) -> Option<&RpcNode> {
        let len = self.nodes.len();
        for _ in 0..len {
            let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
            let node = &self.nodes[idx];
            if node.is_active() {
                return Some(node);
            }
        }
        None
    }

    /// Invokes `op` against the next active node, retrying on a sibling node
    /// on transport failure up to `max_retries` times with a fixed delay.
    /// Decoded protocol errors are surfaced immediately without retry or
    /// node-health mutation.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        op: F,
    ) -> EngineResult<T>
    where
        F: Fn(&RpcClient) -> Fut,
        Fut: Future<Output = Result<T, NodeCallError>>,
    {
        let mut last_err: Option<anyhow::Error> = None;
        let mut last_node_endpoint: Option<String> = None;

        for attempt in 0..=self.config.max_retries {
            if cancel.is_cancelled() {
                return Err(EngineError::cancelled());
            }

            let node = match self.next_active_node() {
                Some(node) => node,
                None => return Err(EngineError::no_active_clients()),
            };

            self.total_requests.fetch_add(1, Ordering::Relaxed);
            let start = Instant::now();

            match op(&node.client).await {
                Ok(value) => {
                    node.record_success(start.elapsed());
                    *self.last_successful_at.write() = Some(Instant::now());
                    return Ok(value);
                }
                Err(NodeCallError::Protocol(engine_err)) => {
                    // Not a pool-level failure: the node answered, the caller's
                    // request was rejected. Surface verbatim.
                    return Err(engine_err);
                }
                Err(NodeCallError::Transport(err)) => {
                    node.record_failure();
                    self.failed_requests.fetch_add(1, Ordering::Relaxed);
                    warn!(node = %node.endpoint, attempt, error = %err, "rpc call failed, marking node inactive");
                    last_node_endpoint = Some(node.endpoint.clone());
                    last_err = Some(err);

                    if attempt < self.config.max_retries {
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.retry_delay) => {}
                            _ = cancel.cancelled() => return Err(EngineError::cancelled()),
                        }
                    }
                }
            }
        }

        let mut err = EngineError::rpc_transport(
            "all retries exhausted",
            last_err.unwrap_or_else(|| anyhow::anyhow!("unknown transport failure")),
        );
        if let Some(endpoint) = last_node_endpoint {
            err = err.with_node(endpoint);
        }
        Err(err)
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        let active_nodes = self.nodes.iter().filter(|n| n.is_active()).count();
        let samples: Vec<Duration> =
            self.nodes.iter().filter_map(|n| n.metrics().ewma_latency).collect();
        let average_latency = if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<Duration>() / samples.len() as u32)
        };
        PoolMetrics {
            active_nodes,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_latency,
            last_successful_at: *self.last_successful_at.read(),
        }
    }

    pub fn node_metrics(&self) -> Vec<NodeMetrics> {
        self.nodes.iter().map(|n| n.metrics()).collect()
    }

    /// Spawns a background task that logs pool metrics every
    /// `health_log_interval` until `cancel` fires.
    pub fn spawn_health_logger(self: std::sync::Arc<Self>, cancel: CancellationToken) {
        let interval = self.config.health_log_interval;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let metrics = self.get_metrics();
                        info!(
                            active_nodes = metrics.active_nodes,
                            total_requests = metrics.total_requests,
                            failed_requests = metrics.failed_requests,
                            average_latency_ms = metrics.average_latency.map(|d| d.as_millis()),
                            "rpc pool health"
                        );
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> RpcPool {
        let endpoints = (0..n)
            .map(|i| RpcEndpointConfig { url: format!("http://node-{i}.example:8899") })
            .collect();
        RpcPool::new(endpoints, RpcPoolConfig { retry_delay: Duration::from_millis(1), ..Default::default() })
            .unwrap()
    }

    #[tokio::test]
    async fn fails_over_to_remaining_node() {
        let pool = pool(3);
        // Node 0 and 1 are unhealthy from the start.
        pool.nodes[0].set_active(false);
        pool.nodes[1].set_active(false);

        let cancel = CancellationToken::new();
        let result: EngineResult<u32> = pool
            .execute_with_retry(&cancel, |_client| async { Ok::<u32, NodeCallError>(7) })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(pool.get_metrics().active_nodes, 1);
    }

    #[tokio::test]
    async fn no_active_clients_fails_fast() {
        let pool = pool(2);
        pool.nodes[0].set_active(false);
        pool.nodes[1].set_active(false);
        let cancel = CancellationToken::new();

        let result: EngineResult<()> = pool
            .execute_with_retry(&cancel, |_client| async { Ok::<(), NodeCallError>(()) })
            .await;

        assert!(matches!(result, Err(e) if e.kind == crate::error::ErrorKind::NoActiveClients));
    }

    #[tokio::test]
    async fn protocol_error_does_not_mark_node_unhealthy() {
        let pool = pool(1);
        let cancel = CancellationToken::new();

        let result: EngineResult<()> = pool
            .execute_with_retry(&cancel, |_client| async {
                Err(NodeCallError::Protocol(EngineError::account_not_found(
                    &solana_sdk::pubkey::Pubkey::new_unique(),
                )))
            })
            .await;

        assert!(result.is_err());
        assert!(pool.nodes[0].is_active());
    }

    #[tokio::test]
    async fn transport_error_exhausts_retries_and_surfaces() {
        let pool = pool(1);
        let cancel = CancellationToken::new();

        let result: EngineResult<()> = pool
            .execute_with_retry(&cancel, |_client| async {
                Err(NodeCallError::transport(anyhow::anyhow!("connection refused")))
            })
            .await;

        assert!(result.is_err());
        assert!(!pool.nodes[0].is_active());
        assert_eq!(pool.get_metrics().failed_requests, (MAX_RETRIES + 1) as u64);
    }
}
