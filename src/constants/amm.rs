//! Program id and well-known accounts for the constant-product AMM venue.

use solana_sdk::{pubkey, pubkey::Pubkey};

/// Program id for the AMM venue. Real pool addresses are per token-pair and
/// are not hard-coded here.
pub const PROGRAM_ID: Pubkey = pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

pub const EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");

/// Instruction discriminators for the AMM program's `buy`/`sell` entry
/// points. Unlike the Curve venue's (genuinely `sha256("global:<name>")`),
/// these are implementation-chosen bytes kept deliberately distinct from
/// the Curve discriminators rather than derived from a hash; update if the
/// deployed AMM program's IDL assigns different values.
pub const BUY_DISCRIMINATOR: [u8; 8] = [0x66, 0x06, 0x3d, 0x12, 0x01, 0xda, 0xeb, 0xeb];
pub const SELL_DISCRIMINATOR: [u8; 8] = [0x33, 0xe6, 0x85, 0xa4, 0x01, 0x7f, 0x83, 0xae];

pub mod seeds {
    pub const POOL_AUTHORITY_SEED: &[u8] = b"pool-authority";
}
