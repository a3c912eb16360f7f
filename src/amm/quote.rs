//! Constant-product quoting for the AMM venue.

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapQuote {
    pub raw_out: u64,
    pub min_out: u64,
    pub price_impact_bps: u64,
}

/// `min_out = out * (1 - slippage_bps/10000)`;
/// `price_impact = amount_in / (base_reserve + amount_in)`.
/// Rejects if price impact exceeds `max_price_impact_bps`.
pub fn quote_swap(
    amount_in: u64,
    base_reserve: u64,
    quote_reserve: u64,
    slippage_bps: u64,
    max_price_impact_bps: u64,
) -> EngineResult<SwapQuote> {
    let numerator = (amount_in as u128) * (quote_reserve as u128);
    let denominator = (base_reserve as u128) + (amount_in as u128);
    let raw_out = (numerator / denominator) as u64;

    let min_out = (raw_out as u128 * (10_000 - slippage_bps.min(10_000)) as u128 / 10_000) as u64;

    let price_impact_bps =
        ((amount_in as u128) * 10_000 / ((base_reserve as u128) + (amount_in as u128))) as u64;

    if price_impact_bps > max_price_impact_bps {
        return Err(EngineError::price_impact_too_high(price_impact_bps, max_price_impact_bps));
    }

    Ok(SwapQuote { raw_out, min_out, price_impact_bps })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_rejects_excessive_price_impact() {
        let result = quote_swap(900_000, 1_000_000, 1_000_000, 100, 500);
        assert!(result.is_err());
    }

    #[test]
    fn quote_accepts_small_trade_relative_to_reserves() {
        let result = quote_swap(1_000, 1_000_000, 1_000_000, 100, 500).unwrap();
        assert!(result.min_out <= result.raw_out);
        assert!(result.price_impact_bps < 500);
    }

    #[test]
    fn min_out_respects_slippage_bps() {
        let no_slip = quote_swap(1_000, 1_000_000, 1_000_000, 0, 10_000).unwrap();
        let with_slip = quote_swap(1_000, 1_000_000, 1_000_000, 500, 10_000).unwrap();
        assert_eq!(no_slip.min_out, no_slip.raw_out);
        assert!(with_slip.min_out < no_slip.raw_out);
    }
}
