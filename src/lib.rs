//! Trade-execution and position-monitoring engine for a bonding-curve
//! launchpad and a constant-product AMM on a single chain.
//!
//! [`TradeEngine`] wires the RPC pool, DEX registry, task router, event bus,
//! and token metadata cache together via constructor injection, rather than
//! through hidden process globals. CLI parsing, task-file loading, wallet
//! key storage, and TUI/dashboard rendering are left to callers.

pub mod amm;
pub mod codec;
pub mod common;
pub mod config;
pub mod constants;
pub mod curve;
pub mod error;
pub mod events;
pub mod metadata;
pub mod metrics;
pub mod monitor;
pub mod registry;
pub mod router;
pub mod rpc;
pub mod trading;
pub mod wallet;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use events::{Event, EventBus, EventType};
pub use registry::{DexKind, DexRegistry};
pub use router::TaskRouter;
pub use trading::{DexAdapter, ExecutionOutcome, Operation, OperationTask};

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::metadata::TokenMetadataCache;
use crate::monitor::MonitoringSession;
use crate::rpc::RpcPool;

/// Top-level entry point. Construct one per process; every adapter, cache,
/// and background task it owns is reachable only through this struct, not
/// through statics.
pub struct TradeEngine {
    pub rpc_pool: Arc<RpcPool>,
    pub registry: Arc<DexRegistry>,
    pub router: Arc<TaskRouter>,
    pub events: Arc<EventBus>,
    pub metadata: Arc<TokenMetadataCache>,
}

impl TradeEngine {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let rpc_pool = Arc::new(RpcPool::new(config.rpc_endpoints(), config.rpc_pool_config())?);
        let registry = Arc::new(DexRegistry::new(rpc_pool.clone()));
        let events = Arc::new(EventBus::new());
        let router = Arc::new(TaskRouter::new(registry.clone(), rpc_pool.clone(), events.clone()));
        let metadata = Arc::new(TokenMetadataCache::seeded_with_mirrors(
            &config.known_token_configs(),
            config.metadata_api_mirrors(),
        ));

        Ok(Self { rpc_pool, registry, router, events, metadata })
    }

    /// Starts the RPC pool's health logger and the event bus's dispatch
    /// loop. Both stop when `cancel` fires.
    pub fn spawn_background_tasks(&self, cancel: CancellationToken) {
        self.rpc_pool.clone().spawn_health_logger(cancel.clone());
        self.events.clone().spawn_dispatcher(cancel);
    }

    /// Validates and dispatches a single task through the router.
    pub async fn dispatch(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        self.router.dispatch(task, cancel).await
    }

    /// Starts a monitoring session for a position just opened by `task`,
    /// spawning its tick loop immediately.
    pub async fn start_monitoring(
        &self,
        task: OperationTask,
        initial_price: f64,
        token_balance_raw: u64,
        dex_kind: DexKind,
    ) -> Arc<MonitoringSession> {
        let dex: Arc<dyn DexAdapter> = match dex_kind {
            DexKind::Curve | DexKind::Smart => self.registry.curve().clone(),
            DexKind::Amm => self.registry.amm().clone(),
        };
        let interval = task.monitor_interval;
        let session = Arc::new(MonitoringSession::new(
            task,
            initial_price,
            token_balance_raw,
            dex,
            interval,
            self.rpc_pool.clone(),
            self.events.clone(),
        ));
        session.start().await;
        session
    }
}
