//! Program ids, well-known accounts, and numeric defaults shared across adapters.

use solana_sdk::{pubkey, pubkey::Pubkey};

pub mod amm;
pub mod curve;
pub mod trade;

pub const SYSTEM_PROGRAM: Pubkey = solana_sdk::system_program::ID;
pub const TOKEN_PROGRAM: Pubkey = spl_token::ID;
pub const TOKEN_PROGRAM_2022: Pubkey = spl_token_2022::ID;
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey = spl_associated_token_account::ID;
pub const RENT_SYSVAR: Pubkey = solana_sdk::sysvar::rent::ID;

pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

/// Lamports charged by the network for a base transaction, independent of priority fee.
pub const NETWORK_FEE_LAMPORTS: u64 = 5_000;
