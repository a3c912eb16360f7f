//! Closed error taxonomy.
//!
//! The engine never returns bare `anyhow::Error` from a public call; callers
//! branch on `EngineError::kind()`. `anyhow` is still used internally to
//! collect `underlying` context from third-party crates (reqwest, RPC client).

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoActiveClients,
    RpcTransport,
    AccountNotFound,
    InvalidAccountData,
    Graduated,
    InstructionFallbackNotFound,
    AccountNotInitialized,
    InsufficientBalance,
    PriceImpactTooHigh,
    ConfirmationTimeout,
    Cancelled,
    InvalidTask,
    InvalidSeeds,
    Internal,
}

/// Structured error returned by every public call.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct EngineError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub underlying: Option<anyhow::Error>,
    pub node: Option<String>,
    pub signature: Option<Signature>,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), underlying: None, node: None, signature: None }
    }

    pub fn with_underlying(mut self, err: anyhow::Error) -> Self {
        self.underlying = Some(err);
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn no_active_clients() -> Self {
        Self::new(ErrorKind::NoActiveClients, "every RPC node is inactive")
    }

    pub fn rpc_transport(message: impl Into<String>, err: anyhow::Error) -> Self {
        Self::new(ErrorKind::RpcTransport, message).with_underlying(err)
    }

    pub fn account_not_found(account: &Pubkey) -> Self {
        Self::new(ErrorKind::AccountNotFound, format!("account not found: {account}"))
    }

    pub fn invalid_account_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidAccountData, message)
    }

    pub fn graduated() -> Self {
        Self::new(
            ErrorKind::Graduated,
            "bonding curve has graduated; retry against the AMM adapter",
        )
    }

    pub fn confirmation_timeout(signature: Signature) -> Self {
        Self::new(ErrorKind::ConfirmationTimeout, "confirmation deadline exceeded")
            .with_signature(signature)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled")
    }

    pub fn insufficient_balance(have: u64, need: u64) -> Self {
        Self::new(
            ErrorKind::InsufficientBalance,
            format!("balance {have} lamports below required {need} lamports"),
        )
    }

    pub fn price_impact_too_high(impact_bps: u64, max_bps: u64) -> Self {
        Self::new(
            ErrorKind::PriceImpactTooHigh,
            format!("price impact {impact_bps} bps exceeds cap {max_bps} bps"),
        )
    }

    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTask, message)
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RpcTransport
                | ErrorKind::InstructionFallbackNotFound
                | ErrorKind::AccountNotInitialized
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Decomposed view of a chain-originating RPC/simulation failure.
/// Lets every caller avoid re-parsing logs for the same facts.
#[derive(Debug, Clone, Default)]
pub struct ErrorAnalysis {
    pub rpc_error: Option<String>,
    pub simulation_failed: bool,
    pub logs: Vec<String>,
    pub instruction_error: Option<String>,
    pub anchor_error: Option<AnchorError>,
}

#[derive(Debug, Clone)]
pub struct AnchorError {
    pub code: u32,
    pub name: String,
    pub msg: String,
}

/// Decomposes a raw RPC/simulation error string plus optional simulation logs
/// into structured facts: the custom program error code, an Anchor-style
/// decoded error name/message when recognized, and whether simulation
/// itself failed outright.
pub fn analyze_error(raw_message: &str, logs: &[String]) -> ErrorAnalysis {
    let mut analysis = ErrorAnalysis {
        rpc_error: Some(raw_message.to_string()),
        simulation_failed: raw_message.contains("Simulation failed")
            || logs.iter().any(|l| l.contains("Program failed to complete")),
        logs: logs.to_vec(),
        instruction_error: None,
        anchor_error: None,
    };

    if let Some(idx) = raw_message.find("custom program error: 0x") {
        let hex_part: String = raw_message[idx + "custom program error: 0x".len()..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        if let Ok(code) = u32::from_str_radix(&hex_part, 16) {
            analysis.instruction_error = Some(format!("custom program error: 0x{hex_part}"));
            analysis.anchor_error = classify_anchor_code(code);
        }
    }

    analysis
}

fn classify_anchor_code(code: u32) -> Option<AnchorError> {
    use crate::constants::curve::{
        ERROR_CODE_ACCOUNT_NOT_INITIALIZED, ERROR_CODE_BONDING_CURVE_COMPLETE,
        ERROR_CODE_INSTRUCTION_FALLBACK_NOT_FOUND,
    };
    let (name, msg) = match code {
        c if c == ERROR_CODE_INSTRUCTION_FALLBACK_NOT_FOUND => {
            ("InstructionFallbackNotFound", "instruction discriminator not recognized")
        }
        c if c == ERROR_CODE_ACCOUNT_NOT_INITIALIZED => {
            ("AccountNotInitialized", "account not yet initialized on-chain")
        }
        c if c == ERROR_CODE_BONDING_CURVE_COMPLETE => {
            ("BondingCurveComplete", "bonding curve has completed and migrated")
        }
        _ => return None,
    };
    Some(AnchorError { code, name: name.to_string(), msg: msg.to_string() })
}

impl From<EngineError> for anyhow::Error {
    fn from(err: EngineError) -> Self {
        anyhow::anyhow!(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyzes_bonding_curve_complete_code() {
        let analysis = analyze_error(
            "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1775",
            &[],
        );
        let anchor = analysis.anchor_error.expect("anchor error decoded");
        assert_eq!(anchor.code, 0x1775);
        assert_eq!(anchor.name, "BondingCurveComplete");
    }

    #[test]
    fn recoverable_kinds_match_spec() {
        assert!(EngineError::new(ErrorKind::RpcTransport, "x").is_recoverable());
        assert!(!EngineError::new(ErrorKind::Graduated, "x").is_recoverable());
    }
}
