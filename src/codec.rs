//! Binary instruction/account codec.
//!
//! Every instruction payload is `discriminator(8 bytes) ++ borsh(fields in
//! declaration order)`; every program account body is
//! `discriminator(8 bytes) ++ borsh(entity fields)`. Borsh already encodes
//! integers little-endian, `Pubkey` as 32 raw bytes, `bool` as one byte,
//! `Option<T>` as a tag byte followed by `T` when present, and `Vec<T>` as a
//! `u32` length prefix followed by the elements, so this module's only real
//! job is computing and prepending the 8-byte discriminator and giving each
//! payload a typed struct to serialize from / deserialize into.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result, StateError};
use crate::state::{Auction, AuctionBinParams, AuctionExtensions, Committed, CommittedAccountClosedEvent};

/// First 8 bytes of `sha256("global:<snake_case_name>")`, the Anchor
/// convention the deployed program is assumed to follow.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// First 8 bytes of `sha256("account:<PascalCase name>")`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

/// First 8 bytes of `sha256("event:<PascalCase name>")` — the discriminator
/// Anchor's `emit!` prepends to an event's Borsh bytes before base64-encoding
/// them behind a `Program data: ` log line.
pub fn event_discriminator(name: &str) -> [u8; 8] {
    sighash("event", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{namespace}:{name}");
    let digest = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

macro_rules! discriminator_const {
    ($vis:vis $name:ident, global, $ix_name:literal) => {
        $vis fn $name() -> [u8; 8] {
            instruction_discriminator($ix_name)
        }
    };
    ($vis:vis $name:ident, account, $account_name:literal) => {
        $vis fn $name() -> [u8; 8] {
            account_discriminator($account_name)
        }
    };
}

discriminator_const!(pub init_auction_discriminator, global, "init_auction");
discriminator_const!(pub commit_discriminator, global, "commit");
discriminator_const!(pub decrease_commit_discriminator, global, "decrease_commit");
discriminator_const!(pub claim_discriminator, global, "claim");
discriminator_const!(pub withdraw_funds_discriminator, global, "withdraw_funds");
discriminator_const!(pub withdraw_fees_discriminator, global, "withdraw_fees");
discriminator_const!(pub set_price_discriminator, global, "set_price");
discriminator_const!(pub emergency_control_discriminator, global, "emergency_control");
discriminator_const!(pub get_launchpad_admin_discriminator, global, "get_launchpad_admin");

discriminator_const!(pub auction_account_discriminator, account, "Auction");
discriminator_const!(pub committed_account_discriminator, account, "Committed");

/// `CommittedAccountClosedEvent`'s event-log discriminator.
pub fn committed_account_closed_event_discriminator() -> [u8; 8] {
    event_discriminator("CommittedAccountClosedEvent")
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct InitAuctionArgs {
    pub commit_start_time: i64,
    pub commit_end_time: i64,
    pub claim_start_time: i64,
    pub bins: Vec<AuctionBinParams>,
    pub custody: Pubkey,
    pub extensions: Option<AuctionExtensions>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommitArgs {
    pub bin_id: u8,
    pub payment_token_committed: u64,
    pub expiry: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct DecreaseCommitArgs {
    pub bin_id: u8,
    pub payment_token_reverted: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClaimArgs {
    pub bin_id: u8,
    pub sale_token_to_claim: u64,
    pub payment_token_to_refund: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SetPriceArgs {
    pub bin_id: u8,
    pub new_price: u64,
}

/// Wire-level shape of `emergency_control`: five discrete booleans, composed
/// into / decomposed from [`crate::state::EmergencyState`]'s single bitmask
/// by this codec alone.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmergencyControlArgs {
    pub pause_auction_commit: bool,
    pub pause_auction_claim: bool,
    pub pause_auction_withdraw_fees: bool,
    pub pause_auction_withdraw_funds: bool,
    pub pause_auction_updation: bool,
}

impl From<crate::state::EmergencyState> for EmergencyControlArgs {
    fn from(state: crate::state::EmergencyState) -> Self {
        let (c, cl, wf, wfu, u) = state.to_flags();
        EmergencyControlArgs {
            pause_auction_commit: c,
            pause_auction_claim: cl,
            pause_auction_withdraw_fees: wf,
            pause_auction_withdraw_funds: wfu,
            pause_auction_updation: u,
        }
    }
}

impl From<EmergencyControlArgs> for crate::state::EmergencyState {
    fn from(args: EmergencyControlArgs) -> Self {
        crate::state::EmergencyState::from_flags(
            args.pause_auction_commit,
            args.pause_auction_claim,
            args.pause_auction_withdraw_fees,
            args.pause_auction_withdraw_funds,
            args.pause_auction_updation,
        )
    }
}

/// Encodes `discriminator ++ borsh(args)` for any instruction payload.
pub fn encode_instruction<T: BorshSerialize>(discriminator: [u8; 8], args: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(8 + 64);
    out.extend_from_slice(&discriminator);
    args.serialize(&mut out)
        .map_err(|e| Error::state("encode_instruction", StateError::InvalidAccountData(e.to_string())))?;
    Ok(out)
}

/// Decodes `discriminator ++ borsh(args)`, checking the discriminator
/// matches `expected` before attempting to deserialize the body.
pub fn decode_instruction<T: BorshDeserialize>(expected: [u8; 8], data: &[u8]) -> Result<T> {
    if data.len() < 8 {
        return Err(Error::state(
            "decode_instruction",
            StateError::InvalidAccountData("payload shorter than the 8-byte discriminator".into()),
        ));
    }
    let (disc, body) = data.split_at(8);
    if disc != expected {
        return Err(Error::state(
            "decode_instruction",
            StateError::InvalidAccountData(format!(
                "discriminator mismatch: expected {expected:?}, got {disc:?}"
            )),
        ));
    }
    T::try_from_slice(body)
        .map_err(|e| Error::state("decode_instruction", StateError::InvalidAccountData(e.to_string())))
}

/// Decodes a full `Auction` account body (8-byte account discriminator
/// followed by the Borsh-encoded fields).
pub fn decode_auction_account(data: &[u8]) -> Result<Auction> {
    decode_instruction(auction_account_discriminator(), data)
}

/// Decodes a full `Committed` account body.
pub fn decode_committed_account(data: &[u8]) -> Result<Committed> {
    decode_instruction(committed_account_discriminator(), data)
}

/// Encodes a full `Auction` account body, mainly useful for tests that
/// fabricate account bytes without a live validator.
pub fn encode_auction_account(auction: &Auction) -> Result<Vec<u8>> {
    encode_instruction(auction_account_discriminator(), auction)
}

/// Encodes a full `Committed` account body.
pub fn encode_committed_account(committed: &Committed) -> Result<Vec<u8>> {
    encode_instruction(committed_account_discriminator(), committed)
}

/// Decodes the Borsh bytes logged behind a `Program data: ` line for a
/// `CommittedAccountClosedEvent`, as emitted by the program's `emit!` call
/// when it closes a fully-claimed `Committed` account.
pub fn decode_committed_account_closed_event(data: &[u8]) -> Result<CommittedAccountClosedEvent> {
    decode_instruction(committed_account_closed_event_discriminator(), data)
}

/// Encodes a `CommittedAccountClosedEvent` the same way `emit!` would,
/// mainly useful for tests that fabricate program-data log lines.
pub fn encode_committed_account_closed_event(event: &CommittedAccountClosedEvent) -> Result<Vec<u8>> {
    encode_instruction(committed_account_closed_event_discriminator(), event)
}

/// Byte offset of the `user: Pubkey` field within an encoded `Committed`
/// account: 8 (discriminator) + 32 (auction) = 8..40 is where `user` starts
/// and ends at 40 — used by the query facade's `memcmp` filter.
pub const COMMITTED_USER_OFFSET: usize = 8 + 32;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AuctionBin, CommittedBin, EmergencyState};

    #[test]
    fn instruction_discriminators_are_stable() {
        // Regression pin: if this ever changes, every downstream transaction
        // silently stops matching the deployed program. Recompute by hand if
        // you intentionally change the sighash scheme.
        let d = init_auction_discriminator();
        assert_eq!(d, instruction_discriminator("init_auction"));
        assert_ne!(init_auction_discriminator(), commit_discriminator());
        assert_ne!(commit_discriminator(), claim_discriminator());
    }

    #[test]
    fn commit_args_round_trip() {
        let args = CommitArgs { bin_id: 3, payment_token_committed: 42, expiry: 123456 };
        let bytes = encode_instruction(commit_discriminator(), &args).unwrap();
        let decoded: CommitArgs = decode_instruction(commit_discriminator(), &bytes).unwrap();
        assert_eq!(args, decoded);
    }

    #[test]
    fn init_auction_args_round_trip_with_optional_extensions() {
        let args = InitAuctionArgs {
            commit_start_time: 10,
            commit_end_time: 20,
            claim_start_time: 30,
            bins: vec![AuctionBinParams { sale_token_price: 1, sale_token_cap: 100 }],
            custody: Pubkey::new_unique(),
            extensions: Some(AuctionExtensions {
                whitelist_authority: Some(Pubkey::new_unique()),
                commit_cap_per_user: None,
                claim_fee_rate_bps: Some(250),
            }),
        };
        let bytes = encode_instruction(init_auction_discriminator(), &args).unwrap();
        let decoded: InitAuctionArgs = decode_instruction(init_auction_discriminator(), &bytes).unwrap();
        assert_eq!(args, decoded);

        let args_none = InitAuctionArgs { extensions: None, ..args };
        let bytes = encode_instruction(init_auction_discriminator(), &args_none).unwrap();
        let decoded: InitAuctionArgs = decode_instruction(init_auction_discriminator(), &bytes).unwrap();
        assert_eq!(decoded.extensions, None);
    }

    #[test]
    fn emergency_control_args_compose_and_decompose_losslessly() {
        let args = EmergencyControlArgs {
            pause_auction_commit: true,
            pause_auction_claim: false,
            pause_auction_withdraw_fees: true,
            pause_auction_withdraw_funds: false,
            pause_auction_updation: false,
        };
        let state: EmergencyState = args.into();
        let round_tripped: EmergencyControlArgs = state.into();
        assert_eq!(args, round_tripped);
    }

    #[test]
    fn wrong_discriminator_is_rejected() {
        let args = ClaimArgs { bin_id: 0, sale_token_to_claim: 1, payment_token_to_refund: 0 };
        let bytes = encode_instruction(claim_discriminator(), &args).unwrap();
        let err = decode_instruction::<ClaimArgs>(commit_discriminator(), &bytes).unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[test]
    fn auction_account_round_trips() {
        let auction = Auction {
            authority: Pubkey::new_unique(),
            custody: Pubkey::new_unique(),
            sale_token_mint: Pubkey::new_unique(),
            payment_token_mint: Pubkey::new_unique(),
            commit_start_time: 1,
            commit_end_time: 2,
            claim_start_time: 3,
            bins: vec![AuctionBin {
                sale_token_price: 1,
                sale_token_cap: 2,
                payment_token_raised: 3,
                sale_token_claimed: 4,
            }],
            extensions: AuctionExtensions::default(),
            emergency_state: EmergencyState::default(),
            total_participants: 5,
            total_fees_collected: 6,
            total_fees_withdrawn: 7,
            unsold_and_effective_payment_withdrawn: false,
            vault_sale_bump: 1,
            vault_payment_bump: 2,
            bump: 3,
        };
        let bytes = encode_auction_account(&auction).unwrap();
        let decoded = decode_auction_account(&bytes).unwrap();
        assert_eq!(auction, decoded);
    }

    #[test]
    fn committed_account_closed_event_round_trips() {
        let snapshot = crate::state::CommittedAccountSnapshot {
            auction: Pubkey::new_unique(),
            user: Pubkey::new_unique(),
            bins: vec![CommittedBin { bin_id: 0, payment_token_committed: 10, sale_token_claimed: 10, payment_token_refunded: 0 }],
            bump: 255,
            total_payment_committed: 10,
            total_sale_tokens_claimed: 10,
        };
        let event = crate::state::CommittedAccountClosedEvent {
            user_key: snapshot.user,
            auction_key: snapshot.auction,
            committed_account_key: Pubkey::new_unique(),
            rent_returned: 1_234,
            committed_data: snapshot,
        };
        let bytes = encode_committed_account_closed_event(&event).unwrap();
        let decoded = decode_committed_account_closed_event(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn committed_account_user_offset_matches_layout() {
        let user = Pubkey::new_unique();
        let committed = Committed {
            auction: Pubkey::new_unique(),
            user,
            bins: vec![CommittedBin {
                bin_id: 0,
                payment_token_committed: 10,
                sale_token_claimed: 0,
                payment_token_refunded: 0,
            }],
            nonce: 1,
            bump: 255,
        };
        let bytes = encode_committed_account(&committed).unwrap();
        assert_eq!(&bytes[COMMITTED_USER_OFFSET..COMMITTED_USER_OFFSET + 32], user.as_ref());
    }
}
