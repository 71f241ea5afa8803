//! Deterministic program-derived address (PDA) derivation.
//!
//! Mirrors the seed scheme the on-chain program itself uses to find its
//! accounts (`Auction::find_program_address`, `Auction::derive_sale_vault_pda`,
//! `Auction::derive_payment_vault_pda`, `Committed::find_program_address` in
//! the deployed program) so addresses computed here always agree with the
//! ones the program validates against.

use solana_sdk::pubkey::Pubkey;

pub const AUCTION_SEED: &[u8] = b"auction";
pub const COMMITTED_SEED: &[u8] = b"committed";
pub const VAULT_SALE_SEED: &[u8] = b"vault_sale";
pub const VAULT_PAYMENT_SEED: &[u8] = b"vault_payment";

/// `("auction", sale_token_mint)`.
pub fn derive_auction_address(program_id: &Pubkey, sale_token_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[AUCTION_SEED, sale_token_mint.as_ref()], program_id)
}

/// `("committed", auction, user)`.
pub fn derive_committed_address(
    program_id: &Pubkey,
    auction: &Pubkey,
    user: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[COMMITTED_SEED, auction.as_ref(), user.as_ref()],
        program_id,
    )
}

/// Deprecated per-bin commitment derivation, retained only so the Query
/// Facade can still locate commitments written under the legacy scheme.
/// New instruction builders must never derive addresses with this function.
#[deprecated(note = "legacy per-bin Committed PDA; use derive_committed_address for new writes")]
pub fn derive_committed_address_legacy(
    program_id: &Pubkey,
    auction: &Pubkey,
    user: &Pubkey,
    bin_id: u8,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[COMMITTED_SEED, auction.as_ref(), user.as_ref(), &[bin_id]],
        program_id,
    )
}

/// `("vault_sale", auction)`.
pub fn derive_vault_sale_address(program_id: &Pubkey, auction: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SALE_SEED, auction.as_ref()], program_id)
}

/// `("vault_payment", auction)`.
pub fn derive_vault_payment_address(program_id: &Pubkey, auction: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_PAYMENT_SEED, auction.as_ref()], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_id() -> Pubkey {
        Pubkey::new_unique()
    }

    #[test]
    fn auction_derivation_is_deterministic() {
        let program_id = program_id();
        let mint = Pubkey::new_unique();
        let (a1, b1) = derive_auction_address(&program_id, &mint);
        let (a2, b2) = derive_auction_address(&program_id, &mint);
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn committed_derivation_is_deterministic() {
        let program_id = program_id();
        let auction = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let (a1, _) = derive_committed_address(&program_id, &auction, &user);
        let (a2, _) = derive_committed_address(&program_id, &auction, &user);
        assert_eq!(a1, a2);
    }

    #[test]
    fn different_seeds_yield_different_addresses() {
        let program_id = program_id();
        let mint = Pubkey::new_unique();
        let (auction, _) = derive_auction_address(&program_id, &mint);
        let (vault_sale, _) = derive_vault_sale_address(&program_id, &auction);
        let (vault_payment, _) = derive_vault_payment_address(&program_id, &auction);
        assert_ne!(auction, vault_sale);
        assert_ne!(vault_sale, vault_payment);
        assert_ne!(auction, vault_payment);
    }

    #[test]
    #[allow(deprecated)]
    fn legacy_committed_scheme_never_collides_with_current_scheme() {
        let program_id = program_id();
        let auction = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let (current, _) = derive_committed_address(&program_id, &auction, &user);
        for bin_id in 0..=10u8 {
            let (legacy, _) =
                derive_committed_address_legacy(&program_id, &auction, &user, bin_id);
            assert_ne!(current, legacy, "bin_id {bin_id} collided with current scheme");
        }
    }
}
