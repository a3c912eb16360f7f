//! DEX registry: maps a task's venue name to a concrete adapter.
//!
//! Dispatch is modeled as a closed tagged variant rather than open trait
//! inheritance: a `Smart` venue tries the bonding curve first and falls
//! over to the AMM once the curve reports it has graduated.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::amm::AmmAdapter;
use crate::curve::CurveAdapter;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::rpc::RpcPool;
use crate::trading::{DexAdapter, ExecutionOutcome, OperationTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DexKind {
    Curve,
    Amm,
    Smart,
}

fn classify(venue_name: &str) -> EngineResult<DexKind> {
    match venue_name.trim().to_ascii_lowercase().as_str() {
        "curve" | "bonding_curve" | "bondingcurve" | "pumpfun" => Ok(DexKind::Curve),
        "amm" | "swap" | "pumpswap" | "constant_product" => Ok(DexKind::Amm),
        "smart" | "auto" => Ok(DexKind::Smart),
        other => Err(EngineError::invalid_task(format!("unknown venue: {other}"))),
    }
}

/// Holds one process-wide instance of each adapter. Both are backed by the
/// same `RpcPool`, so resolving a venue never builds a new client.
pub struct DexRegistry {
    curve: Arc<CurveAdapter>,
    amm: Arc<AmmAdapter>,
}

impl DexRegistry {
    pub fn new(pool: Arc<RpcPool>) -> Self {
        Self { curve: Arc::new(CurveAdapter::new(pool.clone())), amm: Arc::new(AmmAdapter::new(pool)) }
    }

    pub fn curve(&self) -> &Arc<CurveAdapter> {
        &self.curve
    }

    pub fn amm(&self) -> &Arc<AmmAdapter> {
        &self.amm
    }

    pub fn resolve(&self, venue_name: &str) -> EngineResult<DexKind> {
        classify(venue_name)
    }

    /// Initializes whichever adapter(s) `kind` may dispatch to for
    /// `token_mint`.
    pub async fn init_for_token(
        &self,
        kind: DexKind,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        use solana_sdk::signer::Signer;
        let wallet = task.wallet.pubkey();
        match kind {
            DexKind::Curve => self.curve.init_for_token(&task.token_mint, &wallet, cancel).await,
            DexKind::Amm => self.amm.init_for_token(&task.token_mint, &wallet, cancel).await,
            DexKind::Smart => {
                // Curve is the default venue for a token still on the launchpad;
                // a failed setup there does not block an AMM attempt.
                let _ = self.curve.init_for_token(&task.token_mint, &wallet, cancel).await;
                self.amm.init_for_token(&task.token_mint, &wallet, cancel).await
            }
        }
    }

    pub async fn buy(
        &self,
        kind: DexKind,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        match kind {
            DexKind::Curve => self.curve.buy(task, cancel).await,
            DexKind::Amm => self.amm.buy(task, cancel).await,
            DexKind::Smart => match self.curve.buy(task, cancel).await {
                Err(err) if err.kind == ErrorKind::Graduated => self.amm.buy(task, cancel).await,
                other => other,
            },
        }
    }

    pub async fn sell(
        &self,
        kind: DexKind,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        match kind {
            DexKind::Curve => self.curve.sell(task, cancel).await,
            DexKind::Amm => self.amm.sell(task, cancel).await,
            DexKind::Smart => match self.curve.sell(task, cancel).await {
                Err(err) if err.kind == ErrorKind::Graduated => self.amm.sell(task, cancel).await,
                other => other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_venue_aliases() {
        assert_eq!(classify("Curve").unwrap(), DexKind::Curve);
        assert_eq!(classify("pumpswap").unwrap(), DexKind::Amm);
        assert_eq!(classify("smart").unwrap(), DexKind::Smart);
    }

    #[test]
    fn rejects_unknown_venue() {
        assert!(classify("unknown-dex").is_err());
    }
}
