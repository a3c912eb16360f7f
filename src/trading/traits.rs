//! Common adapter interface shared by the Curve and AMM venues.3/§4.4.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::trading::params::OperationTask;

/// Outcome of a successful buy or sell against a venue.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub signature: solana_sdk::signature::Signature,
    pub token_amount: u64,
    pub sol_amount_lamports: u64,
}

/// A venue-specific adapter: given a validated task, derives accounts,
/// quotes, builds instructions, and submits. Both `CurveAdapter` and
/// `AmmAdapter` implement this so the router and registry stay venue-agnostic.
#[async_trait]
pub trait DexAdapter: Send + Sync {
    /// Prepares this adapter for `token_mint`, deriving and caching whatever
    /// accounts the venue needs. Idempotent per mint; a second call with the
    /// same mint is a cache hit.
    async fn init_for_token(
        &self,
        token_mint: &solana_sdk::pubkey::Pubkey,
        wallet: &solana_sdk::pubkey::Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<()>;

    async fn buy(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome>;

    async fn sell(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome>;

    /// Current spot price in SOL per token, used by the monitoring session's
    /// tick loop.
    async fn get_token_price(
        &self,
        mint: &solana_sdk::pubkey::Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<f64>;
}
