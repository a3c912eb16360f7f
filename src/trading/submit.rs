//! Shared blockhash-fetch/sign/send/confirm pipeline.

use std::time::{Duration, Instant};

use solana_sdk::commitment_config::CommitmentLevel;
use solana_sdk::instruction::Instruction;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use solana_client::rpc_config::RpcSendTransactionConfig;
use tokio_util::sync::CancellationToken;

use crate::constants::curve::{
    ERROR_CODE_ACCOUNT_NOT_INITIALIZED, ERROR_CODE_BONDING_CURVE_COMPLETE,
    ERROR_CODE_INSTRUCTION_FALLBACK_NOT_FOUND,
};
use crate::constants::trade::CONFIRMATION_TIMEOUT;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::rpc::RpcPool;
use crate::rpc::pool::NodeCallError;

/// Sends `instructions` signed by `wallet` through the pool, with
/// `skip_preflight=true` and preflight commitment "processed", then polls
/// for confirmation at "processed" commitment until `CONFIRMATION_TIMEOUT`
/// elapses.
pub async fn send_and_confirm(
    pool: &RpcPool,
    cancel: &CancellationToken,
    wallet: &Keypair,
    instructions: Vec<Instruction>,
) -> EngineResult<Signature> {
    let blockhash = pool
        .execute_with_retry(cancel, |client| async move {
            client.get_latest_blockhash().await.map_err(NodeCallError::transport)
        })
        .await?;

    let transaction = Transaction::new_signed_with_payer(
        &instructions,
        Some(&wallet.pubkey()),
        &[wallet],
        blockhash,
    );

    let send_config = RpcSendTransactionConfig {
        skip_preflight: true,
        preflight_commitment: Some(CommitmentLevel::Processed),
        ..Default::default()
    };

    let signature = pool
        .execute_with_retry(cancel, |client| {
            let transaction = transaction.clone();
            async move {
                client
                    .send_transaction_with_config(&transaction, send_config)
                    .await
                    .map_err(NodeCallError::transport)
            }
        })
        .await?;

    confirm_signature(pool, cancel, &signature).await?;
    Ok(signature)
}

/// Polls `getSignatureStatuses` until the signature lands or the deadline
/// passes. A landed-but-failed transaction is decoded via [`analyze_error`]
/// so a custom program error maps to the matching `ErrorKind` (e.g.
/// `InstructionFallbackNotFound`) rather than a generic failure.
async fn confirm_signature(
    pool: &RpcPool,
    cancel: &CancellationToken,
    signature: &Signature,
) -> EngineResult<()> {
    let deadline = Instant::now() + CONFIRMATION_TIMEOUT;

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::cancelled());
        }
        if Instant::now() >= deadline {
            return Err(EngineError::confirmation_timeout(*signature));
        }

        let status = pool
            .execute_with_retry(cancel, |client| {
                let signature = *signature;
                async move {
                    client
                        .get_signature_statuses(&[signature])
                        .await
                        .map(|res| res.value.into_iter().next().flatten())
                        .map_err(NodeCallError::transport)
                }
            })
            .await?;

        if let Some(status) = status {
            if let Some(err) = status.err {
                return Err(chain_error_to_engine_error(&err, *signature));
            }
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(250)) => {}
            _ = cancel.cancelled() => return Err(EngineError::cancelled()),
        }
    }
}

/// Maps a landed-but-failed transaction's error to a specific `ErrorKind`.
/// A custom program error surfaces as
/// `TransactionError::InstructionError(_, InstructionError::Custom(code))`
/// directly on this type; that's matched here rather than routed through
/// [`analyze_error`], which instead decodes the hex-formatted
/// "custom program error: 0x.." string `simulateTransaction` embeds in its
/// logs/message (a different representation of the same code).
fn chain_error_to_engine_error(
    err: &solana_sdk::transaction::TransactionError,
    signature: Signature,
) -> EngineError {
    use solana_sdk::instruction::InstructionError;
    use solana_sdk::transaction::TransactionError;

    let message = format!("{err:?}");
    let custom_code = match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    };
    let kind = match custom_code {
        Some(code) if code == ERROR_CODE_INSTRUCTION_FALLBACK_NOT_FOUND => {
            ErrorKind::InstructionFallbackNotFound
        }
        Some(code) if code == ERROR_CODE_ACCOUNT_NOT_INITIALIZED => ErrorKind::AccountNotInitialized,
        Some(code) if code == ERROR_CODE_BONDING_CURVE_COMPLETE => ErrorKind::Graduated,
        _ => ErrorKind::Internal,
    };
    EngineError::new(kind, message).with_signature(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::InstructionError;
    use solana_sdk::transaction::TransactionError;

    #[test]
    fn custom_error_6005_maps_to_graduated() {
        let err = TransactionError::InstructionError(
            0,
            InstructionError::Custom(ERROR_CODE_BONDING_CURVE_COMPLETE),
        );
        let engine_err = chain_error_to_engine_error(&err, Signature::default());
        assert_eq!(engine_err.kind, ErrorKind::Graduated);
    }

    #[test]
    fn custom_error_101_maps_to_fallback_not_found() {
        let err = TransactionError::InstructionError(
            0,
            InstructionError::Custom(ERROR_CODE_INSTRUCTION_FALLBACK_NOT_FOUND),
        );
        let engine_err = chain_error_to_engine_error(&err, Signature::default());
        assert_eq!(engine_err.kind, ErrorKind::InstructionFallbackNotFound);
    }

    #[test]
    fn unrelated_error_maps_to_internal() {
        let err = TransactionError::AccountInUse;
        let engine_err = chain_error_to_engine_error(&err, Signature::default());
        assert_eq!(engine_err.kind, ErrorKind::Internal);
    }
}
