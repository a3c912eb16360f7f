//! Swap instruction construction for the AMM venue.

use smallvec::SmallVec;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::codec::ByteWriter;
use crate::constants::amm::{BUY_DISCRIMINATOR, EVENT_AUTHORITY, PROGRAM_ID, SELL_DISCRIMINATOR};
use crate::constants::{SYSTEM_PROGRAM, TOKEN_PROGRAM};

#[derive(Debug, Clone, Copy)]
pub struct AmmAccounts {
    pub pool: Pubkey,
    pub user_wallet: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub user_base_ata: Pubkey,
    pub user_quote_ata: Pubkey,
    pub pool_base_vault: Pubkey,
    pub pool_quote_vault: Pubkey,
}

fn compute_budget_instructions(
    compute_units: u32,
    priority_fee_micro_lamports: u64,
) -> SmallVec<[Instruction; 2]> {
    let mut instructions = SmallVec::new();
    instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(compute_units));
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(priority_fee_micro_lamports));
    instructions
}

fn swap_instruction(accounts: &AmmAccounts, discriminator: [u8; 8], amount_in: u64, min_out: u64) -> Instruction {
    let mut data = ByteWriter::with_capacity(24);
    data.write_bytes(&discriminator);
    data.write_u64(amount_in);
    data.write_u64(min_out);

    Instruction::new_with_bytes(
        PROGRAM_ID,
        &data.into_vec(),
        vec![
            AccountMeta::new_readonly(accounts.pool, false),
            AccountMeta::new(accounts.user_wallet, true),
            AccountMeta::new_readonly(accounts.base_mint, false),
            AccountMeta::new_readonly(accounts.quote_mint, false),
            AccountMeta::new(accounts.user_base_ata, false),
            AccountMeta::new(accounts.user_quote_ata, false),
            AccountMeta::new(accounts.pool_base_vault, false),
            AccountMeta::new(accounts.pool_quote_vault, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM, false),
            AccountMeta::new_readonly(EVENT_AUTHORITY, false),
            AccountMeta::new_readonly(PROGRAM_ID, false),
        ],
    )
}

/// Buy (quote-in, base-out) swap, prepended with compute budget and an
/// idempotent base-mint ATA create.
pub fn build_buy_instructions(
    accounts: &AmmAccounts,
    amount_in: u64,
    min_out: u64,
    compute_units: u32,
    priority_fee_micro_lamports: u64,
) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(4);
    instructions.extend(compute_budget_instructions(compute_units, priority_fee_micro_lamports));
    instructions.push(spl_associated_token_account::instruction::create_associated_token_account_idempotent(
        &accounts.user_wallet,
        &accounts.user_wallet,
        &accounts.base_mint,
        &TOKEN_PROGRAM,
    ));
    instructions.push(swap_instruction(accounts, BUY_DISCRIMINATOR, amount_in, min_out));
    instructions
}

/// Sell (base-in, quote-out) swap.
pub fn build_sell_instructions(
    accounts: &AmmAccounts,
    amount_in: u64,
    min_out: u64,
    compute_units: u32,
    priority_fee_micro_lamports: u64,
) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(3);
    instructions.extend(compute_budget_instructions(compute_units, priority_fee_micro_lamports));
    instructions.push(swap_instruction(accounts, SELL_DISCRIMINATOR, amount_in, min_out));
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> AmmAccounts {
        AmmAccounts {
            pool: Pubkey::new_unique(),
            user_wallet: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            user_base_ata: Pubkey::new_unique(),
            user_quote_ata: Pubkey::new_unique(),
            pool_base_vault: Pubkey::new_unique(),
            pool_quote_vault: Pubkey::new_unique(),
        }
    }

    #[test]
    fn buy_instructions_end_with_discriminated_swap() {
        let accounts = accounts();
        let ixs = build_buy_instructions(&accounts, 1_000_000, 900_000, 200_000, 5_000);
        let main = ixs.last().unwrap();
        assert_eq!(&main.data[0..8], &BUY_DISCRIMINATOR);
        assert_eq!(ixs.len(), 4);
    }

    #[test]
    fn sell_instructions_skip_ata_create() {
        let accounts = accounts();
        let ixs = build_sell_instructions(&accounts, 1_000_000, 900_000, 200_000, 5_000);
        assert_eq!(ixs.len(), 3);
        assert_eq!(&ixs.last().unwrap().data[0..8], &SELL_DISCRIMINATOR);
    }
}
