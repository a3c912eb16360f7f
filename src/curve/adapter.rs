//! Curve protocol adapter: setup, TTL state cache, quoting, submission,
//! and venue-graduation detection.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use tokio_util::sync::CancellationToken;

use crate::codec::pda::{associated_token_address, find_pda};
use crate::constants::curve::{
    self, BUY_DISCRIMINATOR, BUY_METHOD_FALLBACKS, FALLBACK_FEE_RECIPIENT, PROGRAM_ID,
    SELL_DISCRIMINATOR, SELL_METHOD_FALLBACKS,
};
use crate::constants::trade::{CURVE_STATE_TTL, GLOBAL_ACCOUNT_FETCH_TIMEOUT, LAMPORTS_PER_SOL};
use crate::curve::instructions::{
    anchor_discriminator, build_buy_instructions, build_sell_instructions, CurveAccounts,
};
use crate::curve::quote::{apply_slippage_floor, buy_out_tokens, quote_sell};
use crate::curve::state::{CurveState, GlobalConfig};
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::rpc::pool::NodeCallError;
use crate::rpc::RpcPool;
use crate::trading::submit::send_and_confirm;
use crate::trading::traits::{DexAdapter, ExecutionOutcome};
use crate::trading::OperationTask;

/// Per-token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveStatus {
    Uninitialized,
    Ready,
    Holding,
    Closed,
    Graduated,
}

struct MintContext {
    accounts: RwLock<CurveAccounts>,
    status: RwLock<CurveStatus>,
    cached_state: RwLock<Option<(CurveState, Instant, usize)>>,
    buy_discriminator: RwLock<[u8; 8]>,
    sell_discriminator: RwLock<[u8; 8]>,
}

impl MintContext {
    fn new(accounts: CurveAccounts) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            status: RwLock::new(CurveStatus::Uninitialized),
            cached_state: RwLock::new(None),
            buy_discriminator: RwLock::new(BUY_DISCRIMINATOR),
            sell_discriminator: RwLock::new(SELL_DISCRIMINATOR),
        }
    }
}

/// Bonding-curve launchpad adapter. One process-wide instance handles every
/// mint; per-mint state lives in `contexts`, keyed by mint and built once via
/// a one-shot setup guard.
pub struct CurveAdapter {
    pool: Arc<RpcPool>,
    contexts: DashMap<Pubkey, Arc<MintContext>>,
    global_config: RwLock<Option<GlobalConfig>>,
}

impl CurveAdapter {
    pub fn new(pool: Arc<RpcPool>) -> Self {
        Self { pool, contexts: DashMap::new(), global_config: RwLock::new(None) }
    }

    /// Setup is idempotent and cached via a one-shot guard keyed by mint,
    ///. The creator-vault PDA depends on the curve account's
    /// `creator` field, so setup performs one state fetch to learn it before
    /// caching the derived accounts.
    async fn ensure_setup(
        &self,
        mint: &Pubkey,
        user_wallet: &Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<Arc<MintContext>> {
        if let Some(ctx) = self.contexts.get(mint) {
            return Ok(ctx.clone());
        }

        let (bonding_curve, _bump) = find_pda(
            &[curve::seeds::BONDING_CURVE_SEED, mint.as_ref()],
            &PROGRAM_ID,
        )?;
        let (global, _) = find_pda(&[curve::seeds::GLOBAL_SEED], &PROGRAM_ID)?;
        let (event_authority, _) =
            find_pda(&[curve::seeds::EVENT_AUTHORITY_SEED], &PROGRAM_ID)?;

        let associated_bonding_curve = associated_token_address(&bonding_curve, mint);
        let user_ata = associated_token_address(user_wallet, mint);

        let raw_state = self.fetch_curve_account_data(&bonding_curve, cancel).await?;
        let state = CurveState::decode(crate::codec::strip_anchor_discriminator(&raw_state)?)?;

        let (creator_vault, _) =
            find_pda(&[curve::seeds::CREATOR_VAULT_SEED, state.creator.as_ref()], &PROGRAM_ID)?;

        let fee_recipient = self.global_config.read().map(|c| c.fee_recipient).unwrap_or(FALLBACK_FEE_RECIPIENT);

        let accounts = CurveAccounts {
            global,
            fee_recipient,
            mint: *mint,
            bonding_curve,
            associated_bonding_curve,
            user_ata,
            user_wallet: *user_wallet,
            creator_vault,
            event_authority,
        };

        let ctx = Arc::new(MintContext::new(accounts));
        *ctx.cached_state.write() = Some((state, Instant::now(), raw_state.len()));
        *ctx.status.write() = CurveStatus::Ready;

        self.contexts.entry(*mint).or_insert_with(|| ctx.clone());
        Ok(self.contexts.get(mint).unwrap().clone())
    }

    async fn fetch_curve_account_data(
        &self,
        bonding_curve: &Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<u8>> {
        let bonding_curve = *bonding_curve;
        let accounts = self
            .pool
            .execute_with_retry(cancel, move |client| {
                let addresses = vec![bonding_curve];
                async move {
                    client.get_multiple_accounts(&addresses).await.map_err(NodeCallError::transport)
                }
            })
            .await?;

        let account = accounts
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| EngineError::account_not_found(&bonding_curve))?;
        Ok(account.data)
    }

    /// Read-lock fast path over a `400 ms` TTL; a miss refetches and
    /// re-decodes.
    async fn get_curve_state(
        &self,
        ctx: &MintContext,
        bonding_curve: &Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<(CurveState, usize)> {
        {
            let cached = ctx.cached_state.read();
            if let Some((state, fetched_at, len)) = *cached {
                if fetched_at.elapsed() < CURVE_STATE_TTL {
                    return Ok((state, len));
                }
            }
        }

        let raw = self.fetch_curve_account_data(bonding_curve, cancel).await?;
        let state = CurveState::decode(crate::codec::strip_anchor_discriminator(&raw)?)?;
        *ctx.cached_state.write() = Some((state, Instant::now(), raw.len()));
        Ok((state, raw.len()))
    }

    /// Reads the global singleton, verifying ownership equals the Curve
    /// program. The fee-recipient read here overrides any
    /// placeholder before the first transaction.
    async fn ensure_global_config(&self, cancel: &CancellationToken) -> EngineResult<GlobalConfig> {
        if let Some(config) = *self.global_config.read() {
            return Ok(config);
        }

        let (global_pda, _) = find_pda(&[curve::seeds::GLOBAL_SEED], &PROGRAM_ID)?;
        let account = tokio::time::timeout(
            GLOBAL_ACCOUNT_FETCH_TIMEOUT,
            self.pool.execute_with_retry(cancel, move |client| async move {
                client.get_account(&global_pda).await.map_err(NodeCallError::transport)
            }),
        )
        .await
        .map_err(|_| EngineError::new(ErrorKind::RpcTransport, "global config fetch timed out"))??;

        if account.owner != PROGRAM_ID {
            return Err(EngineError::new(
                ErrorKind::InvalidAccountData,
                "global config account owner mismatch",
            ));
        }

        let config = GlobalConfig::decode(crate::codec::strip_anchor_discriminator(&account.data)?)?;
        *self.global_config.write() = Some(config);
        Ok(config)
    }

    fn lamports_from_sol(amount_sol: f64) -> u64 {
        (amount_sol * LAMPORTS_PER_SOL as f64).round() as u64
    }
}

#[async_trait]
impl DexAdapter for CurveAdapter {
    async fn init_for_token(
        &self,
        token_mint: &Pubkey,
        wallet: &Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        self.ensure_setup(token_mint, wallet, cancel).await?;
        Ok(())
    }

    async fn get_token_price(&self, mint: &Pubkey, cancel: &CancellationToken) -> EngineResult<f64> {
        let (bonding_curve, _bump) =
            find_pda(&[curve::seeds::BONDING_CURVE_SEED, mint.as_ref()], &PROGRAM_ID)?;
        if let Some(ctx) = self.contexts.get(mint).map(|entry| entry.clone()) {
            let (state, _len) = self.get_curve_state(&ctx, &bonding_curve, cancel).await?;
            return crate::curve::quote::spot_price(&state);
        }
        let raw = self.fetch_curve_account_data(&bonding_curve, cancel).await?;
        let state = CurveState::decode(crate::codec::strip_anchor_discriminator(&raw)?)?;
        crate::curve::quote::spot_price(&state)
    }

    async fn buy(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        let wallet_pubkey = task.wallet.pubkey();
        let ctx = self.ensure_setup(&task.token_mint, &wallet_pubkey, cancel).await?;
        let global_config = self.ensure_global_config(cancel).await?;

        {
            let mut accounts = ctx.accounts.write();
            accounts.fee_recipient = global_config.fee_recipient;
        }

        let accounts = *ctx.accounts.read();
        let (state, account_len) =
            self.get_curve_state(&ctx, &accounts.bonding_curve, cancel).await?;
        if state.is_graduated() {
            *ctx.status.write() = CurveStatus::Graduated;
            return Err(EngineError::graduated());
        }

        let sol_in = Self::lamports_from_sol(task.amount_sol.unwrap_or(0.0));
        if sol_in == 0 {
            return Err(EngineError::invalid_task("amount_sol must be positive for a buy"));
        }
        let expected_tokens = buy_out_tokens(sol_in, &state)?;
        let max_sol_cost =
            (sol_in as f64 * (1.0 + task.slippage_percent / 100.0)).ceil() as u64;
        let priority_fee_micro_lamports =
            Self::lamports_from_sol(task.priority_fee_sol).saturating_mul(1_000_000) / 1_000_000;

        let buy_disc = *ctx.buy_discriminator.read();
        let instructions = build_buy_instructions(
            &accounts,
            expected_tokens,
            max_sol_cost,
            task.compute_units,
            priority_fee_micro_lamports,
            account_len,
            buy_disc,
        );

        let outcome =
            self.submit_with_discriminator_fallback(task, &ctx, instructions, true, cancel).await;

        if outcome.is_ok() {
            *ctx.status.write() = CurveStatus::Holding;
        }

        outcome.map(|signature| ExecutionOutcome {
            signature,
            token_amount: expected_tokens,
            sol_amount_lamports: sol_in,
        })
    }

    async fn sell(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        let wallet_pubkey = task.wallet.pubkey();
        let ctx = self.ensure_setup(&task.token_mint, &wallet_pubkey, cancel).await?;
        let global_config = self.ensure_global_config(cancel).await?;

        let accounts = *ctx.accounts.read();
        let (state, account_len) =
            self.get_curve_state(&ctx, &accounts.bonding_curve, cancel).await?;
        if state.is_graduated() {
            *ctx.status.write() = CurveStatus::Graduated;
            return Err(EngineError::graduated());
        }

        let token_amount = task
            .token_amount
            .ok_or_else(|| EngineError::invalid_task("token_amount is required for a sell"))?;

        let quote = quote_sell(
            token_amount,
            &state,
            global_config.fee_basis_points,
            global_config.creator_fee_basis_points.unwrap_or(0),
            task.slippage_percent,
        )?;
        let min_sol_output = apply_slippage_floor(quote.out_after_fees_lamports, task.slippage_percent);
        let priority_fee_micro_lamports =
            Self::lamports_from_sol(task.priority_fee_sol).saturating_mul(1_000_000) / 1_000_000;

        let sell_disc = *ctx.sell_discriminator.read();
        let instructions = build_sell_instructions(
            &accounts,
            token_amount,
            min_sol_output,
            task.compute_units,
            priority_fee_micro_lamports,
            account_len,
            sell_disc,
        );

        let outcome =
            self.submit_with_discriminator_fallback(task, &ctx, instructions, false, cancel).await;

        match &outcome {
            Ok(_) => *ctx.status.write() = CurveStatus::Closed,
            Err(e) if e.kind == ErrorKind::Graduated => *ctx.status.write() = CurveStatus::Graduated,
            Err(_) => {}
        }

        outcome.map(|signature| ExecutionOutcome {
            signature,
            token_amount,
            sol_amount_lamports: quote.min_sol_out_lamports,
        })
    }
}

impl CurveAdapter {
    /// Submits `instructions`; on `InstructionFallbackNotFound`, iterates
    /// candidate method names, rebuilding instructions with a freshly hashed
    /// discriminator. The first successful discriminator is
    /// cached as the active one.
    async fn submit_with_discriminator_fallback(
        &self,
        task: &OperationTask,
        ctx: &MintContext,
        instructions: Vec<solana_sdk::instruction::Instruction>,
        is_buy: bool,
        cancel: &CancellationToken,
    ) -> EngineResult<solana_sdk::signature::Signature> {
        let first_attempt = send_and_confirm(&self.pool, cancel, &task.wallet, instructions).await;

        let err = match first_attempt {
            Ok(signature) => return Ok(signature),
            Err(err) if err.kind == ErrorKind::InstructionFallbackNotFound => err,
            Err(err) => return Err(err),
        };

        let candidates = if is_buy { BUY_METHOD_FALLBACKS } else { SELL_METHOD_FALLBACKS };
        let accounts = *ctx.accounts.read();
        let (state, account_len) = match self.cached_state_snapshot(ctx) {
            Some(snapshot) => snapshot,
            None => return Err(err),
        };

        for candidate in candidates {
            let discriminator = anchor_discriminator(candidate);
            let rebuilt = if is_buy {
                let sol_in = Self::lamports_from_sol(task.amount_sol.unwrap_or(0.0));
                let expected_tokens = buy_out_tokens(sol_in, &state)?;
                let max_sol_cost =
                    (sol_in as f64 * (1.0 + task.slippage_percent / 100.0)).ceil() as u64;
                let priority_fee_micro_lamports =
                    Self::lamports_from_sol(task.priority_fee_sol).saturating_mul(1_000_000) / 1_000_000;
                build_buy_instructions(
                    &accounts,
                    expected_tokens,
                    max_sol_cost,
                    task.compute_units,
                    priority_fee_micro_lamports,
                    account_len,
                    discriminator,
                )
            } else {
                let token_amount = task.token_amount.unwrap_or(0);
                let priority_fee_micro_lamports =
                    Self::lamports_from_sol(task.priority_fee_sol).saturating_mul(1_000_000) / 1_000_000;
                build_sell_instructions(
                    &accounts,
                    token_amount,
                    0,
                    task.compute_units,
                    priority_fee_micro_lamports,
                    account_len,
                    discriminator,
                )
            };

            match send_and_confirm(&self.pool, cancel, &task.wallet, rebuilt).await {
                Ok(signature) => {
                    if is_buy {
                        *ctx.buy_discriminator.write() = discriminator;
                    } else {
                        *ctx.sell_discriminator.write() = discriminator;
                    }
                    return Ok(signature);
                }
                Err(e) if e.kind == ErrorKind::InstructionFallbackNotFound => continue,
                Err(e) => return Err(e),
            }
        }

        Err(err)
    }

    fn cached_state_snapshot(&self, ctx: &MintContext) -> Option<(CurveState, usize)> {
        ctx.cached_state.read().map(|(state, _, len)| (state, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_status_transitions_are_distinct_variants() {
        assert_ne!(CurveStatus::Ready, CurveStatus::Holding);
        assert_ne!(CurveStatus::Holding, CurveStatus::Closed);
        assert_ne!(CurveStatus::Holding, CurveStatus::Graduated);
    }
}
