//! Decoded pool reserves for the constant-product AMM venue.

use solana_sdk::pubkey::Pubkey;

use crate::codec::ByteReader;
use crate::error::{EngineError, EngineResult};

/// Minimum byte length of a decoded pool account: two mints, two vaults,
/// two u64 reserves, one bool.
pub const POOL_STATE_MIN_LEN: usize = 32 * 4 + 8 * 2 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub active: bool,
}

impl PoolState {
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        if data.len() < POOL_STATE_MIN_LEN {
            return Err(EngineError::invalid_account_data(format!(
                "pool state payload too short: {} < {POOL_STATE_MIN_LEN}",
                data.len()
            )));
        }
        let reader = ByteReader::new(data);
        Ok(Self {
            base_mint: reader.read_pubkey(0)?,
            quote_mint: reader.read_pubkey(32)?,
            base_vault: reader.read_pubkey(64)?,
            quote_vault: reader.read_pubkey(96)?,
            base_reserve: reader.read_u64(128)?,
            quote_reserve: reader.read_u64(136)?,
            active: reader.read_bool(144)?,
        })
    }

    /// A pool is tradeable only while active with non-zero reserves on both sides.
    pub fn is_tradeable(&self) -> bool {
        self.active && self.base_reserve > 0 && self.quote_reserve > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes(active: bool, base_reserve: u64, quote_reserve: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(&base_reserve.to_le_bytes());
        buf.extend_from_slice(&quote_reserve.to_le_bytes());
        buf.push(active as u8);
        buf
    }

    #[test]
    fn decodes_pool_state() {
        let bytes = sample_bytes(true, 1_000_000, 2_000_000);
        let pool = PoolState::decode(&bytes).unwrap();
        assert_eq!(pool.base_reserve, 1_000_000);
        assert!(pool.is_tradeable());
    }

    #[test]
    fn inactive_pool_is_not_tradeable() {
        let bytes = sample_bytes(false, 1_000_000, 2_000_000);
        let pool = PoolState::decode(&bytes).unwrap();
        assert!(!pool.is_tradeable());
    }

    #[test]
    fn zero_reserves_are_not_tradeable() {
        let bytes = sample_bytes(true, 0, 2_000_000);
        let pool = PoolState::decode(&bytes).unwrap();
        assert!(!pool.is_tradeable());
    }

    #[test]
    fn short_payload_is_invalid() {
        let bytes = vec![0u8; POOL_STATE_MIN_LEN - 1];
        assert!(PoolState::decode(&bytes).is_err());
    }
}
