//! Per-position monitoring session.
//!
//! A session owns a read-only handle to the adapter it was started with; it
//! never hands the adapter a reference back to itself, so the two never form
//! a cycle, failures) go out
//! over the shared event bus instead of a bespoke channel pair.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use solana_sdk::signer::Signer;
use tokio_util::sync::CancellationToken;

use crate::codec::pda::associated_token_address;
use crate::constants::trade::{BALANCE_FETCH_TIMEOUT, FALLBACK_TOKEN_DECIMALS, PRICE_FETCH_TIMEOUT, SHUTDOWN_GRACE};
use crate::error::{EngineError, EngineResult};
use crate::events::{Event, EventBus};
use crate::rpc::pool::NodeCallError;
use crate::rpc::RpcPool;
use crate::trading::{DexAdapter, ExecutionOutcome, Operation, OperationTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Starting = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl From<u8> for SessionState {
    fn from(value: u8) -> Self {
        match value {
            0 => SessionState::Starting,
            1 => SessionState::Running,
            2 => SessionState::Stopping,
            _ => SessionState::Stopped,
        }
    }
}

/// Snapshot returned by `get_current_state()`.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub current_price: f64,
    pub entry_price: f64,
    pub current_tokens: f64,
    pub task: OperationTask,
}

struct Inner {
    task: OperationTask,
    dex: Arc<dyn DexAdapter>,
    pool: Arc<RpcPool>,
    events: Arc<EventBus>,
    interval: Duration,
    state: AtomicU8,
    entry_price: RwLock<f64>,
    current_price: RwLock<f64>,
    current_tokens: RwLock<f64>,
}

pub struct MonitoringSession {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    worker: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MonitoringSession {
    pub fn new(
        task: OperationTask,
        initial_price: f64,
        token_balance_raw: u64,
        dex: Arc<dyn DexAdapter>,
        interval: Duration,
        pool: Arc<RpcPool>,
        events: Arc<EventBus>,
    ) -> Self {
        let initial_tokens = token_balance_raw as f64 / 10f64.powi(FALLBACK_TOKEN_DECIMALS as i32);
        let inner = Arc::new(Inner {
            task,
            dex,
            pool,
            events,
            interval,
            state: AtomicU8::new(SessionState::Starting as u8),
            entry_price: RwLock::new(initial_price),
            current_price: RwLock::new(initial_price),
            current_tokens: RwLock::new(initial_tokens),
        });
        Self { inner, cancel: CancellationToken::new(), worker: parking_lot::Mutex::new(None) }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.load(Ordering::SeqCst).into()
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state.store(state as u8, Ordering::SeqCst);
    }

    /// Refreshes balance and price once, recomputing the entry price from
    /// the actual starting token count, then spawns the tick loop.
    pub async fn start(&self) {
        let refreshed = tokio::time::timeout(BALANCE_FETCH_TIMEOUT, self.refresh_balance()).await;
        if let Ok(Ok((tokens, _raw))) = refreshed {
            if tokens > 0.0 {
                let amount_sol = self.inner.task.amount_sol.unwrap_or(0.0);
                let recomputed = amount_sol / tokens;
                *self.inner.entry_price.write() = recomputed;
                *self.inner.current_price.write() = recomputed;
                *self.inner.current_tokens.write() = tokens;
            }
        }

        self.set_state(SessionState::Running);
        self.inner.events.publish(Event::MonitoringStarted {
            task_name: self.inner.task.task_name.clone(),
            token_mint: self.inner.task.token_mint,
            initial_price: *self.inner.entry_price.read(),
        });

        let inner = self.inner.clone();
        let cancel = self.cancel.clone();
        let interval = self.inner.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tick(&inner, &cancel).await;
                    }
                }
            }
        });
        *self.worker.lock() = Some(handle);
    }

    async fn refresh_balance(&self) -> EngineResult<(f64, u64)> {
        let wallet = self.inner.task.wallet.pubkey();
        let ata = associated_token_address(&wallet, &self.inner.task.token_mint);
        let ui_amount = self
            .inner
            .pool
            .execute_with_retry(&self.cancel, move |client| {
                let ata = ata;
                async move {
                    client.get_token_account_balance(&ata).await.map_err(NodeCallError::transport)
                }
            })
            .await?;
        let raw: u64 = ui_amount.amount.parse().unwrap_or(0);
        let tokens = raw as f64 / 10f64.powi(ui_amount.decimals as i32);
        Ok((tokens, raw))
    }

    /// Returns `(current_price, entry_price, current_tokens, task)`.
    pub fn get_current_state(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_price: *self.inner.current_price.read(),
            entry_price: *self.inner.entry_price.read(),
            current_tokens: *self.inner.current_tokens.read(),
            task: self.inner.task.clone(),
        }
    }

    /// `(pnl_percent, pnl_sol)` where `pnl_sol = (current_price - entry_price) * current_tokens`.
    pub fn calculate_pnl(&self) -> (f64, f64) {
        let entry = *self.inner.entry_price.read();
        let current = *self.inner.current_price.read();
        let tokens = *self.inner.current_tokens.read();
        let pnl_percent = if entry > 0.0 { (current - entry) / entry * 100.0 } else { 0.0 };
        let pnl_sol = (current - entry) * tokens;
        (floor2(pnl_percent), pnl_sol)
    }

    /// Only a `Running` session accepts a sell command. Dispatches a `sell`
    /// task for the whole current balance through `router`, then
    /// unconditionally transitions to `Stopping`.
    pub async fn sell(
        &self,
        router: &crate::router::TaskRouter,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        if self.state() != SessionState::Running {
            return Err(EngineError::invalid_task("sell command requires a running session"));
        }
        let task = self.sell_task();
        let result = router.dispatch(&task, cancel).await;
        self.set_state(SessionState::Stopping);
        result
    }

    fn sell_task(&self) -> OperationTask {
        let mut task = self.inner.task.clone();
        task.operation = Operation::Sell;
        let raw_tokens =
            (*self.inner.current_tokens.read() * 10f64.powi(FALLBACK_TOKEN_DECIMALS as i32)).round() as u64;
        task.token_amount = Some(raw_tokens);
        task
    }

    /// Signals the tick loop to stop and joins it within the shutdown grace
    /// period. A grace overrun is logged but does not prevent returning.
    pub async fn shutdown(&self) {
        self.set_state(SessionState::Stopping);
        self.cancel.cancel();
        if let Some(handle) = self.worker.lock().take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                tracing::warn!(task = %self.inner.task.task_name, "monitoring session shutdown exceeded grace period");
            }
        }
        self.set_state(SessionState::Stopped);
        self.inner.events.publish(Event::MonitoringStopped {
            task_name: self.inner.task.task_name.clone(),
            token_mint: self.inner.task.token_mint,
        });
    }
}

async fn tick(inner: &Arc<Inner>, cancel: &CancellationToken) {
    let price = tokio::time::timeout(PRICE_FETCH_TIMEOUT, inner.dex.get_token_price(&inner.task.token_mint, cancel))
        .await;
    let price = match price {
        Ok(Ok(price)) => price,
        Ok(Err(err)) => {
            inner.events.publish(Event::operation_failed(&inner.task.task_name, &err));
            return;
        }
        Err(_) => {
            inner.events.publish(Event::operation_failed(
                &inner.task.task_name,
                &EngineError::new(crate::error::ErrorKind::Internal, "price fetch timed out"),
            ));
            return;
        }
    };

    let entry = *inner.entry_price.read();
    *inner.current_price.write() = price;
    let percent_change = if entry > 0.0 { floor2((price - entry) / entry * 100.0) } else { 0.0 };

    inner.events.publish(Event::PriceUpdated {
        task_name: inner.task.task_name.clone(),
        token_mint: inner.task.token_mint,
        current_price: price,
        percent_change,
    });

    let wallet = inner.task.wallet.pubkey();
    let ata = associated_token_address(&wallet, &inner.task.token_mint);
    let balance = inner
        .pool
        .execute_with_retry(cancel, move |client| {
            let ata = ata;
            async move { client.get_token_account_balance(&ata).await.map_err(NodeCallError::transport) }
        })
        .await;
    if let Ok(ui_amount) = balance {
        let raw: u64 = ui_amount.amount.parse().unwrap_or(0);
        let tokens = raw as f64 / 10f64.powi(ui_amount.decimals as i32);
        let previous = *inner.current_tokens.read();
        if (tokens - previous).abs() > 1e-6 {
            *inner.current_tokens.write() = tokens;
            inner.events.publish(Event::BalanceChanged {
                task_name: inner.task.task_name.clone(),
                token_mint: inner.task.token_mint,
                token_balance_raw: raw,
            });
        }
    }
}

fn floor2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor2_truncates_toward_negative_infinity() {
        assert_eq!(floor2(12.3456), 12.34);
        assert_eq!(floor2(-1.005), -1.01);
    }

    #[test]
    fn session_state_round_trips_through_u8() {
        assert_eq!(SessionState::from(SessionState::Running as u8), SessionState::Running);
        assert_eq!(SessionState::from(200), SessionState::Stopped);
    }
}
