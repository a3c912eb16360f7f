//! Task router: validates a task, resolves its venue, and dispatches to the
//! matching execution pipeline.

use std::sync::Arc;

use solana_sdk::signer::Signer;
use tokio_util::sync::CancellationToken;

use crate::codec::pda::associated_token_address;
use crate::constants::trade::FALLBACK_TOKEN_DECIMALS;
use crate::error::EngineResult;
use crate::events::{Event, EventBus};
use crate::registry::{DexKind, DexRegistry};
use crate::rpc::pool::NodeCallError;
use crate::rpc::RpcPool;
use crate::trading::{ExecutionOutcome, Operation, OperationTask};

pub struct TaskRouter {
    registry: Arc<DexRegistry>,
    pool: Arc<RpcPool>,
    events: Arc<EventBus>,
}

impl TaskRouter {
    pub fn new(registry: Arc<DexRegistry>, pool: Arc<RpcPool>, events: Arc<EventBus>) -> Self {
        Self { registry, pool, events }
    }

    /// Validates, resolves a venue, initializes the adapter for the task's
    /// mint if needed, and dispatches by operation. Emits `OperationStarted`
    /// before dispatch and `OperationCompleted`/`OperationFailed` after.
    pub async fn dispatch(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        task.validate()?;
        let kind = self.registry.resolve(&task.normalized_venue())?;
        self.registry.init_for_token(kind, task, cancel).await?;

        self.events.publish(Event::OperationStarted {
            task_name: task.task_name.clone(),
            venue_name: task.venue_name.clone(),
            token_mint: task.token_mint,
        });

        let result = match task.operation {
            Operation::Snipe => self.registry.buy(kind, task, cancel).await,
            Operation::Sell => self.dispatch_sell(kind, task, cancel).await,
            Operation::Swap => self.dispatch_swap(task, cancel).await,
        };

        match &result {
            Ok(outcome) => self.events.publish(Event::OperationCompleted {
                task_name: task.task_name.clone(),
                signature: outcome.signature,
                token_amount: outcome.token_amount,
                sol_amount_lamports: outcome.sol_amount_lamports,
            }),
            Err(err) => self.events.publish(Event::operation_failed(&task.task_name, err)),
        }

        result
    }

    /// Sells the wallet's whole current balance of the mint when nonzero;
    /// otherwise falls back to `amount_sol * 10^decimals`.
    async fn dispatch_sell(
        &self,
        kind: DexKind,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        let mut task = task.clone();
        let ata = associated_token_address(&task.wallet.pubkey(), &task.token_mint);

        let balance = self
            .pool
            .execute_with_retry(cancel, move |client| {
                let ata = ata;
                async move {
                    client
                        .get_token_account_balance_with_commitment(
                            &ata,
                            solana_sdk::commitment_config::CommitmentConfig::confirmed(),
                        )
                        .await
                        .map(|response| response.value)
                        .map_err(NodeCallError::transport)
                }
            })
            .await
            .ok();

        task.token_amount = match balance {
            Some(ui_amount) => {
                let raw: u64 = ui_amount.amount.parse().unwrap_or(0);
                if raw > 0 {
                    Some(raw)
                } else {
                    Some(fallback_token_amount(task.amount_sol, ui_amount.decimals))
                }
            }
            None => Some(fallback_token_amount(task.amount_sol, FALLBACK_TOKEN_DECIMALS)),
        };

        self.registry.sell(kind, &task, cancel).await
    }

    /// `swap` always targets the constant-product AMM directly, regardless
    /// of which venue the task named.
    async fn dispatch_swap(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        if task.token_amount.is_some() {
            self.registry.sell(DexKind::Amm, task, cancel).await
        } else {
            self.registry.buy(DexKind::Amm, task, cancel).await
        }
    }
}

fn fallback_token_amount(amount_sol: Option<f64>, decimals: u8) -> u64 {
    let amount_sol = amount_sol.unwrap_or(0.0);
    (amount_sol * 10f64.powi(decimals as i32)).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_amount_scales_by_decimals() {
        assert_eq!(fallback_token_amount(Some(1.5), 6), 1_500_000);
        assert_eq!(fallback_token_amount(None, 6), 0);
    }
}
