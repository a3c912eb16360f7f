//! Event payloads published on the bus.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    OperationStarted,
    OperationCompleted,
    OperationFailed,
    PriceUpdated,
    BalanceChanged,
    MonitoringStarted,
    MonitoringStopped,
}

/// A single bus event. Every variant carries the minimum facts a
/// subscriber needs without re-querying the task or adapter.
#[derive(Debug, Clone)]
pub enum Event {
    OperationStarted { task_name: String, venue_name: String, token_mint: Pubkey },
    OperationCompleted { task_name: String, signature: Signature, token_amount: u64, sol_amount_lamports: u64 },
    OperationFailed { task_name: String, message: String },
    PriceUpdated { task_name: String, token_mint: Pubkey, current_price: f64, percent_change: f64 },
    BalanceChanged { task_name: String, token_mint: Pubkey, token_balance_raw: u64 },
    MonitoringStarted { task_name: String, token_mint: Pubkey, initial_price: f64 },
    MonitoringStopped { task_name: String, token_mint: Pubkey },
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::OperationStarted { .. } => EventType::OperationStarted,
            Event::OperationCompleted { .. } => EventType::OperationCompleted,
            Event::OperationFailed { .. } => EventType::OperationFailed,
            Event::PriceUpdated { .. } => EventType::PriceUpdated,
            Event::BalanceChanged { .. } => EventType::BalanceChanged,
            Event::MonitoringStarted { .. } => EventType::MonitoringStarted,
            Event::MonitoringStopped { .. } => EventType::MonitoringStopped,
        }
    }

    pub fn operation_failed(task_name: impl Into<String>, err: &EngineError) -> Self {
        Event::OperationFailed { task_name: task_name.into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_variant() {
        let event = Event::MonitoringStopped { task_name: "t".into(), token_mint: Pubkey::new_unique() };
        assert_eq!(event.event_type(), EventType::MonitoringStopped);
    }
}
