//! Constant-product quote math against virtual reserves, §8.

use crate::curve::state::CurveState;
use crate::error::{EngineError, EngineResult};

/// Sell quote broken into raw output, fees, and the slippage-adjusted floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellQuote {
    pub raw_out_lamports: u64,
    pub protocol_fee_lamports: u64,
    pub creator_fee_lamports: u64,
    pub out_after_fees_lamports: u64,
    pub min_sol_out_lamports: u64,
}

/// `sell_out = (tokens_in * virtual_sol_reserves) / (virtual_token_reserves + tokens_in)`,
///. All intermediates use u128 to avoid overflow on 64-bit
/// reserve magnitudes.
pub fn sell_out_lamports(tokens_in: u64, state: &CurveState) -> EngineResult<u64> {
    if state.is_graduated() {
        return Err(EngineError::graduated());
    }
    let numerator = (tokens_in as u128) * (state.virtual_sol_reserves as u128);
    let denominator = (state.virtual_token_reserves as u128) + (tokens_in as u128);
    Ok((numerator / denominator) as u64)
}

/// Full sell quote: raw out, fee deduction, slippage floor.
pub fn quote_sell(
    tokens_in: u64,
    state: &CurveState,
    fee_basis_points: u64,
    creator_fee_basis_points: u64,
    slippage_percent: f64,
) -> EngineResult<SellQuote> {
    let raw_out = sell_out_lamports(tokens_in, state)?;
    let protocol_fee = (raw_out as u128 * fee_basis_points as u128 / 10_000) as u64;
    let creator_fee = (raw_out as u128 * creator_fee_basis_points as u128 / 10_000) as u64;
    let out_after_fees = raw_out.saturating_sub(protocol_fee).saturating_sub(creator_fee);
    let min_sol_out = apply_slippage_floor(out_after_fees, slippage_percent);
    Ok(SellQuote {
        raw_out_lamports: raw_out,
        protocol_fee_lamports: protocol_fee,
        creator_fee_lamports: creator_fee,
        out_after_fees_lamports: out_after_fees,
        min_sol_out_lamports: min_sol_out,
    })
}

/// `min_out(s) = raw_out * (1 - s/100)`.
pub fn apply_slippage_floor(raw_out: u64, slippage_percent: f64) -> u64 {
    let factor = (1.0 - slippage_percent / 100.0).clamp(0.0, 1.0);
    ((raw_out as f64) * factor).floor() as u64
}

/// `buy_amount = (sol_in * virtual_token_reserves) / (virtual_sol_reserves + sol_in)`,
/// same constant-product shape as the sell side, used for estimating the
/// exact-SOL buy instruction's expected token output.
pub fn buy_out_tokens(sol_in: u64, state: &CurveState) -> EngineResult<u64> {
    if state.is_graduated() {
        return Err(EngineError::graduated());
    }
    let numerator = (sol_in as u128) * (state.virtual_token_reserves as u128);
    let denominator = (state.virtual_sol_reserves as u128) + (sol_in as u128);
    Ok((numerator / denominator) as u64)
}

/// Spot price in SOL per token, floor-rounded to 9 fractional digits.
pub fn spot_price(state: &CurveState) -> EngineResult<f64> {
    if state.is_graduated() {
        return Err(EngineError::graduated());
    }
    let price = state.virtual_sol_reserves as f64 / state.virtual_token_reserves as f64;
    let scale = 1_000_000_000.0;
    Ok((price * scale).floor() / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn state(virtual_sol: u64, virtual_token: u64) -> CurveState {
        CurveState {
            virtual_token_reserves: virtual_token,
            virtual_sol_reserves: virtual_sol,
            real_token_reserves: virtual_token,
            real_sol_reserves: virtual_sol,
            token_total_supply: 1_000_000_000_000_000,
            complete: false,
            creator: Pubkey::new_unique(),
        }
    }

    #[test]
    fn sell_out_is_strictly_less_than_virtual_sol_reserves() {
        let s = state(30_000_000_000, 1_073_000_000_000);
        let out = sell_out_lamports(1_000_000_000, &s).unwrap();
        assert!(out < s.virtual_sol_reserves);
    }

    #[test]
    fn sell_out_is_monotonic_in_tokens_in() {
        let s = state(30_000_000_000, 1_073_000_000_000);
        let small = sell_out_lamports(1_000_000, &s).unwrap();
        let large = sell_out_lamports(10_000_000, &s).unwrap();
        assert!(large >= small);
    }

    #[test]
    fn slippage_zero_is_identity_and_hundred_is_zero() {
        assert_eq!(apply_slippage_floor(1_000, 0.0), 1_000);
        assert_eq!(apply_slippage_floor(1_000, 100.0), 0);
    }

    #[test]
    fn graduated_curve_rejects_quoting() {
        let mut s = state(30_000_000_000, 1_073_000_000_000);
        s.complete = true;
        assert!(sell_out_lamports(1_000, &s).is_err());
        assert!(spot_price(&s).is_err());
    }

    #[test]
    fn fees_are_deducted_from_raw_out() {
        let s = state(30_000_000_000, 1_073_000_000_000);
        let quote = quote_sell(100_000_000, &s, 100, 0, 1.0).unwrap();
        assert!(quote.out_after_fees_lamports < quote.raw_out_lamports);
        assert!(quote.min_sol_out_lamports <= quote.out_after_fees_lamports);
    }
}
