//! Validated operation input.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Snipe,
    Sell,
    Swap,
}

/// A single validated trading instruction.
#[derive(Clone)]
pub struct OperationTask {
    pub task_name: String,
    pub operation: Operation,
    pub wallet: Arc<Keypair>,
    pub venue_name: String,
    pub token_mint: Pubkey,
    pub amount_sol: Option<f64>,
    pub token_amount: Option<u64>,
    pub slippage_percent: f64,
    pub priority_fee_sol: f64,
    pub compute_units: u32,
    pub monitor_interval: Duration,
}

impl OperationTask {
    /// Validates non-empty venue/task, positive amount, slippage in
    /// `[0, 100]`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.venue_name.trim().is_empty() {
            return Err(EngineError::invalid_task("venue_name must not be empty"));
        }
        if self.task_name.trim().is_empty() {
            return Err(EngineError::invalid_task("task_name must not be empty"));
        }
        let has_positive_amount = self.amount_sol.map(|v| v > 0.0).unwrap_or(false)
            || self.token_amount.map(|v| v > 0).unwrap_or(false);
        if !has_positive_amount {
            return Err(EngineError::invalid_task(
                "at least one of amount_sol or token_amount must be positive",
            ));
        }
        if !(0.0..=100.0).contains(&self.slippage_percent) {
            return Err(EngineError::invalid_task("slippage_percent must be within [0, 100]"));
        }
        Ok(())
    }

    pub fn normalized_venue(&self) -> String {
        self.venue_name.trim().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_task() -> OperationTask {
        OperationTask {
            task_name: "snipe-1".into(),
            operation: Operation::Snipe,
            wallet: Arc::new(Keypair::new()),
            venue_name: "Curve".into(),
            token_mint: Pubkey::new_unique(),
            amount_sol: Some(0.1),
            token_amount: None,
            slippage_percent: 1.0,
            priority_fee_sol: 0.0001,
            compute_units: 200_000,
            monitor_interval: Duration::from_secs(5),
        }
    }

    #[test]
    fn rejects_empty_venue() {
        let mut task = base_task();
        task.venue_name = "  ".into();
        assert!(task.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_slippage() {
        let mut task = base_task();
        task.slippage_percent = 150.0;
        assert!(task.validate().is_err());
    }

    #[test]
    fn rejects_zero_amount() {
        let mut task = base_task();
        task.amount_sol = None;
        task.token_amount = None;
        assert!(task.validate().is_err());
    }

    #[test]
    fn normalizes_venue_name() {
        let task = base_task();
        assert_eq!(task.normalized_venue(), "curve");
    }

    #[test]
    fn accepts_well_formed_task() {
        assert!(base_task().validate().is_ok());
    }
}
