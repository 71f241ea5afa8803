//! Mirrored on-chain account layouts.
//!
//! These types are encoded/decoded with the same little-endian, Borsh-style
//! rules the instruction codec uses: they are not meant to
//! be constructed ad hoc by callers, only produced by [`crate::codec`] when
//! decoding bytes read from the chain, or assembled by [`crate::builders`]
//! when preparing `init_auction` parameters.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

/// One price/cap tier inside an auction.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuctionBin {
    pub sale_token_price: u64,
    pub sale_token_cap: u64,
    pub payment_token_raised: u64,
    pub sale_token_claimed: u64,
}

/// Caller-supplied parameters for a new bin at `init_auction` time.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuctionBinParams {
    pub sale_token_price: u64,
    pub sale_token_cap: u64,
}

/// Optional auction-wide extensions, embedded directly in the `Auction`
/// account.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AuctionExtensions {
    pub whitelist_authority: Option<Pubkey>,
    pub commit_cap_per_user: Option<u64>,
    pub claim_fee_rate_bps: Option<u64>,
}

impl AuctionExtensions {
    pub fn is_whitelist_enabled(&self) -> bool {
        self.whitelist_authority.is_some()
    }
}

/// Emergency-pause bitmask, mirrored locally as a single `u64` even though
/// the wire-level instruction keeps five discrete booleans (see
/// `codec::EmergencyControlArgs`, which decomposes to/from this mask at the
/// instruction boundary).
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmergencyState {
    pub paused_operations: u64,
}

impl EmergencyState {
    pub const COMMIT: u64 = 1 << 0;
    pub const CLAIM: u64 = 1 << 1;
    pub const WITHDRAW_FEES: u64 = 1 << 2;
    pub const WITHDRAW_FUNDS: u64 = 1 << 3;
    pub const UPDATION: u64 = 1 << 4;

    pub fn is_paused(&self, flag: u64) -> bool {
        self.paused_operations & flag != 0
    }

    /// Composes the five wire-level booleans into the local bitmask.
    pub fn from_flags(
        pause_commit: bool,
        pause_claim: bool,
        pause_withdraw_fees: bool,
        pause_withdraw_funds: bool,
        pause_updation: bool,
    ) -> Self {
        let mut mask = 0u64;
        if pause_commit {
            mask |= Self::COMMIT;
        }
        if pause_claim {
            mask |= Self::CLAIM;
        }
        if pause_withdraw_fees {
            mask |= Self::WITHDRAW_FEES;
        }
        if pause_withdraw_funds {
            mask |= Self::WITHDRAW_FUNDS;
        }
        if pause_updation {
            mask |= Self::UPDATION;
        }
        EmergencyState { paused_operations: mask }
    }

    /// Decomposes the local bitmask back into the five wire-level booleans.
    pub fn to_flags(self) -> (bool, bool, bool, bool, bool) {
        (
            self.is_paused(Self::COMMIT),
            self.is_paused(Self::CLAIM),
            self.is_paused(Self::WITHDRAW_FEES),
            self.is_paused(Self::WITHDRAW_FUNDS),
            self.is_paused(Self::UPDATION),
        )
    }
}

/// The core per-mint auction account.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Auction {
    pub authority: Pubkey,
    pub custody: Pubkey,
    pub sale_token_mint: Pubkey,
    pub payment_token_mint: Pubkey,

    pub commit_start_time: i64,
    pub commit_end_time: i64,
    pub claim_start_time: i64,

    pub bins: Vec<AuctionBin>,
    pub extensions: AuctionExtensions,
    pub emergency_state: EmergencyState,

    pub total_participants: u64,
    pub total_fees_collected: u64,
    pub total_fees_withdrawn: u64,
    pub unsold_and_effective_payment_withdrawn: bool,

    pub vault_sale_bump: u8,
    pub vault_payment_bump: u8,
    pub bump: u8,
}

impl Auction {
    pub fn get_bin(&self, bin_id: u8) -> Option<&AuctionBin> {
        self.bins.get(bin_id as usize)
    }

    pub fn total_bins(&self) -> u8 {
        self.bins.len() as u8
    }

    /// `sale_token_cap * sale_token_price` for the given bin.
    pub fn bin_target(&self, bin_id: u8) -> crate::error::Result<u64> {
        let bin = self.get_bin(bin_id).ok_or_else(|| {
            crate::error::Error::validation(
                "Auction::bin_target",
                crate::error::ValidationError::InvalidBinId(bin_id),
            )
        })?;
        crate::allocation::bin_target(bin.sale_token_cap, bin.sale_token_price)
    }
}

/// A single bin's commitment record within a user's `Committed` account.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommittedBin {
    pub bin_id: u8,
    pub payment_token_committed: u64,
    pub sale_token_claimed: u64,
    pub payment_token_refunded: u64,
}

/// Per-(auction, user) commitment account.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Committed {
    pub auction: Pubkey,
    pub user: Pubkey,
    pub bins: Vec<CommittedBin>,
    pub nonce: u64,
    pub bump: u8,
}

impl Committed {
    pub fn find_bin(&self, bin_id: u8) -> Option<&CommittedBin> {
        self.bins.iter().find(|b| b.bin_id == bin_id)
    }

    pub fn total_payment_committed(&self) -> u64 {
        self.bins.iter().map(|b| b.payment_token_committed).sum()
    }
}

/// Snapshot embedded in a `CommittedAccountClosedEvent`, used to reconstruct
/// history once the program has closed the account after a full claim.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommittedAccountSnapshot {
    pub auction: Pubkey,
    pub user: Pubkey,
    pub bins: Vec<CommittedBin>,
    pub bump: u8,
    pub total_payment_committed: u64,
    pub total_sale_tokens_claimed: u64,
}

impl CommittedAccountSnapshot {
    pub fn from_committed(committed: &Committed) -> Self {
        let total_sale_tokens_claimed = committed.bins.iter().map(|b| b.sale_token_claimed).sum();
        CommittedAccountSnapshot {
            auction: committed.auction,
            user: committed.user,
            bins: committed.bins.clone(),
            bump: committed.bump,
            total_payment_committed: committed.total_payment_committed(),
            total_sale_tokens_claimed,
        }
    }
}

/// Emitted by the program when a fully-claimed `Committed` account is closed.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommittedAccountClosedEvent {
    pub user_key: Pubkey,
    pub auction_key: Pubkey,
    pub committed_account_key: Pubkey,
    pub rent_returned: u64,
    pub committed_data: CommittedAccountSnapshot,
}

/// `Auction`/`Committed` lifecycle status, derived from the three auction
/// timestamps and a caller-supplied current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionStatus {
    Upcoming,
    Active,
    Ended,
    Claiming,
}

impl Auction {
    pub fn status(&self, now: i64) -> AuctionStatus {
        if now < self.commit_start_time {
            AuctionStatus::Upcoming
        } else if now <= self.commit_end_time {
            AuctionStatus::Active
        } else if now < self.claim_start_time {
            AuctionStatus::Ended
        } else {
            AuctionStatus::Claiming
        }
    }

    pub fn can_withdraw_funds(&self, now: i64) -> bool {
        self.status(now) == AuctionStatus::Claiming && !self.unsold_and_effective_payment_withdrawn
    }

    pub fn total_payment_raised(&self) -> u64 {
        self.bins.iter().map(|b| b.payment_token_raised).sum()
    }

    /// `min(1.0, payment_token_raised / bin_target)`, `0.0` if the bin's
    /// target is itself zero (a bin can never have a zero target since price
    /// and cap are both required to be strictly positive, but the helper
    /// stays total rather than panicking on malformed mirrored data).
    pub fn bin_fill_rate(&self, bin_id: u8) -> Option<f64> {
        let bin = self.get_bin(bin_id)?;
        let target = (bin.sale_token_cap as u128) * (bin.sale_token_price as u128);
        if target == 0 {
            return Some(0.0);
        }
        let rate = (bin.payment_token_raised as f64) / (target as f64);
        Some(rate.min(1.0))
    }
}
