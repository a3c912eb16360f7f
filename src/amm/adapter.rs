//! Constant-product AMM adapter.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use tokio_util::sync::CancellationToken;

use crate::amm::instructions::{build_buy_instructions, build_sell_instructions, AmmAccounts};
use crate::amm::quote::quote_swap;
use crate::amm::state::PoolState;
use crate::codec::pda::{associated_token_address, find_pda};
use crate::constants::amm::{self, PROGRAM_ID};
use crate::constants::trade::{DEFAULT_COMPUTE_UNITS, LAMPORTS_PER_SOL, NETWORK_FEE_LAMPORTS};
use crate::error::{EngineError, EngineResult};
use crate::rpc::pool::NodeCallError;
use crate::rpc::RpcPool;
use crate::trading::submit::send_and_confirm;
use crate::trading::traits::{DexAdapter, ExecutionOutcome};
use crate::trading::{OperationTask, TokenSetupGuard};

const DEFAULT_MAX_PRICE_IMPACT_BPS: u64 = 500;

/// Resolves a pool for a `(base_mint, quote_mint)` pair and caches its
/// derived address per process.
pub struct AmmAdapter {
    pool: Arc<RpcPool>,
    pool_addresses: DashMap<(Pubkey, Pubkey), Pubkey>,
    max_price_impact_bps: u64,
    setup_guard: TokenSetupGuard,
}

impl AmmAdapter {
    pub fn new(pool: Arc<RpcPool>) -> Self {
        Self {
            pool,
            pool_addresses: DashMap::new(),
            max_price_impact_bps: DEFAULT_MAX_PRICE_IMPACT_BPS,
            setup_guard: TokenSetupGuard::new(),
        }
    }

    fn resolve_pool_address(&self, base_mint: &Pubkey, quote_mint: &Pubkey) -> EngineResult<Pubkey> {
        let key = (*base_mint, *quote_mint);
        if let Some(address) = self.pool_addresses.get(&key) {
            return Ok(*address);
        }
        let (address, _bump) = find_pda(
            &[amm::seeds::POOL_AUTHORITY_SEED, base_mint.as_ref(), quote_mint.as_ref()],
            &PROGRAM_ID,
        )?;
        self.pool_addresses.insert(key, address);
        Ok(address)
    }

    async fn fetch_pool_state(
        &self,
        pool_address: &Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<PoolState> {
        let pool_address = *pool_address;
        let account = self
            .pool
            .execute_with_retry(cancel, move |client| async move {
                client.get_account(&pool_address).await.map_err(NodeCallError::transport)
            })
            .await?;
        PoolState::decode(&account.data)
    }

    async fn validate_balance(
        &self,
        wallet: &Pubkey,
        amount_in: u64,
        priority_fee_lamports: u64,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        let wallet = *wallet;
        let balance = self
            .pool
            .execute_with_retry(cancel, move |client| async move {
                client.get_balance(&wallet).await.map_err(NodeCallError::transport)
            })
            .await?;
        let required = amount_in + priority_fee_lamports + NETWORK_FEE_LAMPORTS;
        if balance < required {
            return Err(EngineError::insufficient_balance(balance, required));
        }
        Ok(())
    }

    fn lamports_from_sol(amount_sol: f64) -> u64 {
        (amount_sol * LAMPORTS_PER_SOL as f64).round() as u64
    }
}

#[async_trait]
impl DexAdapter for AmmAdapter {
    async fn init_for_token(
        &self,
        token_mint: &Pubkey,
        _wallet: &Pubkey,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        let base_mint = *token_mint;
        self.setup_guard
            .ensure(base_mint, || async move {
                let pool_address = self.resolve_pool_address(&base_mint, &crate::constants::WSOL_MINT)?;
                self.fetch_pool_state(&pool_address, cancel).await?;
                Ok(())
            })
            .await
    }

    async fn get_token_price(&self, mint: &Pubkey, cancel: &CancellationToken) -> EngineResult<f64> {
        let pool_address = self.resolve_pool_address(mint, &crate::constants::WSOL_MINT)?;
        let state = self.fetch_pool_state(&pool_address, cancel).await?;
        if state.base_reserve == 0 {
            return Err(EngineError::invalid_account_data("pool has zero base reserve"));
        }
        let price = state.quote_reserve as f64 / state.base_reserve as f64;
        let scale = 1_000_000_000.0;
        Ok((price * scale).floor() / scale)
    }

    async fn buy(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        let wallet_pubkey = task.wallet.pubkey();
        let quote_mint = crate::constants::WSOL_MINT;
        let base_mint = task.token_mint;

        let pool_address = self.resolve_pool_address(&base_mint, &quote_mint)?;
        let state = self.fetch_pool_state(&pool_address, cancel).await?;
        if !state.is_tradeable() {
            return Err(EngineError::graduated());
        }

        let amount_in = Self::lamports_from_sol(task.amount_sol.unwrap_or(0.0));
        if amount_in == 0 {
            return Err(EngineError::invalid_task("amount_sol must be positive for a buy"));
        }
        let priority_fee_lamports = Self::lamports_from_sol(task.priority_fee_sol);
        self.validate_balance(&wallet_pubkey, amount_in, priority_fee_lamports, cancel).await?;

        let slippage_bps = (task.slippage_percent * 100.0).round() as u64;
        let quote = quote_swap(
            amount_in,
            state.quote_reserve,
            state.base_reserve,
            slippage_bps,
            self.max_price_impact_bps,
        )?;

        let accounts = AmmAccounts {
            pool: pool_address,
            user_wallet: wallet_pubkey,
            base_mint,
            quote_mint,
            user_base_ata: associated_token_address(&wallet_pubkey, &base_mint),
            user_quote_ata: associated_token_address(&wallet_pubkey, &quote_mint),
            pool_base_vault: state.base_vault,
            pool_quote_vault: state.quote_vault,
        };

        let compute_units =
            if task.compute_units == 0 { DEFAULT_COMPUTE_UNITS } else { task.compute_units };
        let instructions = build_buy_instructions(
            &accounts,
            amount_in,
            quote.min_out,
            compute_units,
            priority_fee_lamports,
        );

        let signature = send_and_confirm(&self.pool, cancel, &task.wallet, instructions).await?;
        Ok(ExecutionOutcome {
            signature,
            token_amount: quote.raw_out,
            sol_amount_lamports: amount_in,
        })
    }

    async fn sell(
        &self,
        task: &OperationTask,
        cancel: &CancellationToken,
    ) -> EngineResult<ExecutionOutcome> {
        let wallet_pubkey = task.wallet.pubkey();
        let quote_mint = crate::constants::WSOL_MINT;
        let base_mint = task.token_mint;

        let pool_address = self.resolve_pool_address(&base_mint, &quote_mint)?;
        let state = self.fetch_pool_state(&pool_address, cancel).await?;
        if !state.is_tradeable() {
            return Err(EngineError::graduated());
        }

        let amount_in = task
            .token_amount
            .ok_or_else(|| EngineError::invalid_task("token_amount is required for a sell"))?;
        let priority_fee_lamports = Self::lamports_from_sol(task.priority_fee_sol);

        let slippage_bps = (task.slippage_percent * 100.0).round() as u64;
        let quote = quote_swap(
            amount_in,
            state.base_reserve,
            state.quote_reserve,
            slippage_bps,
            self.max_price_impact_bps,
        )?;

        let accounts = AmmAccounts {
            pool: pool_address,
            user_wallet: wallet_pubkey,
            base_mint,
            quote_mint,
            user_base_ata: associated_token_address(&wallet_pubkey, &base_mint),
            user_quote_ata: associated_token_address(&wallet_pubkey, &quote_mint),
            pool_base_vault: state.base_vault,
            pool_quote_vault: state.quote_vault,
        };

        let compute_units =
            if task.compute_units == 0 { DEFAULT_COMPUTE_UNITS } else { task.compute_units };
        let instructions = build_sell_instructions(
            &accounts,
            amount_in,
            quote.min_out,
            compute_units,
            priority_fee_lamports,
        );

        let signature = send_and_confirm(&self.pool, cancel, &task.wallet, instructions).await?;
        Ok(ExecutionOutcome {
            signature,
            token_amount: amount_in,
            sol_amount_lamports: quote.min_out,
        })
    }
}
