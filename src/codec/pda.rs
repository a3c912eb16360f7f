//! Program-derived address and associated-token-account derivation.
//!
//! Wraps `Pubkey::try_find_program_address`, generalized to a single helper
//! keyed on a seed slice instead of one hand-written function per seed set.

use crate::error::{EngineError, EngineResult, ErrorKind};
use solana_sdk::pubkey::Pubkey;

/// Finds a PDA for `program_id` over `seeds`. Returns `InvalidSeeds` if no
/// bump produces a valid off-curve address.
pub fn find_pda(seeds: &[&[u8]], program_id: &Pubkey) -> EngineResult<(Pubkey, u8)> {
    Pubkey::try_find_program_address(seeds, program_id)
        .ok_or_else(|| EngineError::new(ErrorKind::InvalidSeeds, "no valid PDA bump found"))
}

/// Derives the associated-token-account address for `(owner, mint)` under
/// the classic SPL token program.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

/// Derives the associated-token-account address for `(owner, mint)` under an
/// explicit token program, needed by the AMM adapter which may hold either
/// classic SPL-Token or Token-2022 mints.
pub fn associated_token_address_for_program(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    spl_associated_token_account::get_associated_token_address_with_program_id(
        owner,
        mint,
        token_program,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pda_derivation_is_deterministic() {
        let program = Pubkey::new_unique();
        let seed = b"bonding-curve";
        let mint = Pubkey::new_unique();
        let (a, bump_a) = find_pda(&[seed, mint.as_ref()], &program).unwrap();
        let (b, bump_b) = find_pda(&[seed, mint.as_ref()], &program).unwrap();
        assert_eq!(a, b);
        assert_eq!(bump_a, bump_b);
    }

    #[test]
    fn different_seeds_yield_different_pdas() {
        let program = Pubkey::new_unique();
        let mint_a = Pubkey::new_unique();
        let mint_b = Pubkey::new_unique();
        let (a, _) = find_pda(&[b"bonding-curve", mint_a.as_ref()], &program).unwrap();
        let (b, _) = find_pda(&[b"bonding-curve", mint_b.as_ref()], &program).unwrap();
        assert_ne!(a, b);
    }
}
