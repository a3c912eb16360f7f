//! Seeds, program id, and well-known accounts for the bonding-curve launchpad venue.

use solana_sdk::{pubkey, pubkey::Pubkey};

/// PDA seed prefixes for the curve's state and global-config accounts.
pub mod seeds {
    pub const GLOBAL_SEED: &[u8] = b"global";
    pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";
    pub const CREATOR_VAULT_SEED: &[u8] = b"creator-vault";
    pub const EVENT_AUTHORITY_SEED: &[u8] = b"__event_authority";
}

/// Program id for the bonding-curve launchpad. Configurable at the `EngineConfig`
/// level; this is the default used when no override is supplied.
pub const PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");

/// Fallback fee recipient used only until the global account has been read
/// once; the live value from that account then takes precedence.
pub const FALLBACK_FEE_RECIPIENT: Pubkey = pubkey!("62qc2CNXwrYqQScmEdiZFFAnJR262PxWEuNQtxfafNgV");

/// Instruction discriminators.
pub const BUY_DISCRIMINATOR: [u8; 8] = [0x66, 0x06, 0x3d, 0x12, 0x01, 0xda, 0xeb, 0xea];
pub const SELL_DISCRIMINATOR: [u8; 8] = [0x33, 0xe6, 0x85, 0xa4, 0x01, 0x7f, 0x83, 0xad];

/// Minimum byte length of a decoded curve-state account: 5 u64s + 1 bool + 1 pubkey.
pub const CURVE_STATE_MIN_LEN: usize = 5 * 8 + 1 + 32;

/// Below this on-chain account length the curve account must be extended
/// before the main instruction runs; empirically derived, see DESIGN.md.
pub const EXTEND_ACCOUNT_THRESHOLD: usize = 150;

/// Candidate method names hashed with the anchor discriminator scheme when the
/// active discriminator is rejected on-chain.
pub const BUY_METHOD_FALLBACKS: &[&str] =
    &["buy", "buy_tokens", "purchase", "swap", "snipe", "global:buy"];
pub const SELL_METHOD_FALLBACKS: &[&str] =
    &["sell", "sell_tokens", "global:sell"];

/// Chain-level program error codes surfaced as specific `EngineError` kinds.
pub const ERROR_CODE_INSTRUCTION_FALLBACK_NOT_FOUND: u32 = 101;
pub const ERROR_CODE_ACCOUNT_NOT_INITIALIZED: u32 = 3012;
pub const ERROR_CODE_BONDING_CURVE_COMPLETE: u32 = 6005;
