//! Decoded on-chain state for the bonding-curve venue.

use solana_sdk::pubkey::Pubkey;

use crate::codec::ByteReader;
use crate::constants::curve::CURVE_STATE_MIN_LEN;
use crate::error::{EngineError, EngineResult};

/// Decoded `("bonding-curve", mint)` account: five u64 LE reserves, one bool,
/// one pubkey. Anchor accounts carry an 8-byte discriminator before this
/// layout; callers pass the slice with that prefix already stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveState {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    pub complete: bool,
    pub creator: Pubkey,
}

impl CurveState {
    /// Decodes a raw account payload. `InvalidAccountData` if shorter than
    /// the minimum 73-byte layout.
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        if data.len() < CURVE_STATE_MIN_LEN {
            return Err(EngineError::invalid_account_data(format!(
                "curve state payload too short: {} < {CURVE_STATE_MIN_LEN}",
                data.len()
            )));
        }
        let reader = ByteReader::new(data);
        Ok(Self {
            virtual_token_reserves: reader.read_u64(0)?,
            virtual_sol_reserves: reader.read_u64(8)?,
            real_token_reserves: reader.read_u64(16)?,
            real_sol_reserves: reader.read_u64(24)?,
            token_total_supply: reader.read_u64(32)?,
            complete: reader.read_bool(40)?,
            creator: reader.read_pubkey(41)?,
        })
    }

    /// A curve with zero virtual reserves cannot be quoted and is treated as
    /// migrated off this venue.
    pub fn is_graduated(&self) -> bool {
        self.complete || self.virtual_token_reserves == 0 || self.virtual_sol_reserves == 0
    }
}

/// Decoded singleton global config. Tail fields are only
/// present when the account data is long enough; older deployments omit them.
#[derive(Debug, Clone, Copy)]
pub struct GlobalConfig {
    pub initialized: bool,
    pub authority: Pubkey,
    pub fee_recipient: Pubkey,
    pub fee_basis_points: u64,
    pub withdraw_authority: Option<Pubkey>,
    pub enable_migrate: Option<bool>,
    pub pool_migration_fee: Option<u64>,
    pub creator_fee_basis_points: Option<u64>,
}

/// Byte offsets after the 8-byte anchor discriminator that callers strip
/// before calling `decode`.
const INITIALIZED_OFFSET: usize = 0;
const AUTHORITY_OFFSET: usize = 1;
const FEE_RECIPIENT_OFFSET: usize = 33;
const FEE_BASIS_POINTS_OFFSET: usize = 65;
const CORE_LEN: usize = 73;

const WITHDRAW_AUTHORITY_OFFSET: usize = CORE_LEN;
const ENABLE_MIGRATE_OFFSET: usize = WITHDRAW_AUTHORITY_OFFSET + 32;
const POOL_MIGRATION_FEE_OFFSET: usize = ENABLE_MIGRATE_OFFSET + 1;
const CREATOR_FEE_BASIS_POINTS_OFFSET: usize = POOL_MIGRATION_FEE_OFFSET + 8;

impl GlobalConfig {
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        let reader = ByteReader::new(data);
        let initialized = reader.read_bool(INITIALIZED_OFFSET)?;
        let authority = reader.read_pubkey(AUTHORITY_OFFSET)?;
        let fee_recipient = reader.read_pubkey(FEE_RECIPIENT_OFFSET)?;
        let fee_basis_points = reader.read_u64(FEE_BASIS_POINTS_OFFSET)?;

        let has_tail = data.len() >= CREATOR_FEE_BASIS_POINTS_OFFSET + 8;
        let (withdraw_authority, enable_migrate, pool_migration_fee, creator_fee_basis_points) =
            if has_tail {
                (
                    Some(reader.read_pubkey(WITHDRAW_AUTHORITY_OFFSET)?),
                    Some(reader.read_bool(ENABLE_MIGRATE_OFFSET)?),
                    Some(reader.read_u64(POOL_MIGRATION_FEE_OFFSET)?),
                    Some(reader.read_u64(CREATOR_FEE_BASIS_POINTS_OFFSET)?),
                )
            } else {
                (None, None, None, None)
            };

        Ok(Self {
            initialized,
            authority,
            fee_recipient,
            fee_basis_points,
            withdraw_authority,
            enable_migrate,
            pool_migration_fee,
            creator_fee_basis_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_curve_bytes(complete: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1_073_000_000_000_000u64.to_le_bytes());
        buf.extend_from_slice(&30_000_000_000u64.to_le_bytes());
        buf.extend_from_slice(&793_100_000_000_000u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&1_000_000_000_000_000u64.to_le_bytes());
        buf.push(complete as u8);
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf
    }

    #[test]
    fn decodes_curve_state_happy_path() {
        let bytes = sample_curve_bytes(false);
        let state = CurveState::decode(&bytes).unwrap();
        assert_eq!(state.virtual_sol_reserves, 30_000_000_000);
        assert!(!state.is_graduated());
    }

    #[test]
    fn short_payload_is_invalid_account_data() {
        let bytes = vec![0u8; CURVE_STATE_MIN_LEN - 1];
        assert!(CurveState::decode(&bytes).is_err());
    }

    #[test]
    fn complete_curve_is_graduated() {
        let bytes = sample_curve_bytes(true);
        let state = CurveState::decode(&bytes).unwrap();
        assert!(state.is_graduated());
    }

    #[test]
    fn zero_reserves_are_graduated_even_if_not_marked_complete() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.push(0);
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        let state = CurveState::decode(&buf).unwrap();
        assert!(state.is_graduated());
    }

    #[test]
    fn decodes_global_config_without_tail_fields() {
        let mut buf = Vec::new();
        buf.push(1);
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(&100u64.to_le_bytes());
        let config = GlobalConfig::decode(&buf).unwrap();
        assert_eq!(config.fee_basis_points, 100);
        assert!(config.creator_fee_basis_points.is_none());
    }

    #[test]
    fn decodes_global_config_with_tail_fields() {
        let mut buf = Vec::new();
        buf.push(1);
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.extend_from_slice(&100u64.to_le_bytes());
        buf.extend_from_slice(Pubkey::new_unique().as_ref());
        buf.push(0);
        buf.extend_from_slice(&15_000_001u64.to_le_bytes());
        buf.extend_from_slice(&30u64.to_le_bytes());
        let config = GlobalConfig::decode(&buf).unwrap();
        assert_eq!(config.creator_fee_basis_points, Some(30));
    }
}
