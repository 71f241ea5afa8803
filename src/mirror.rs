//! Local, refreshable snapshot of a single auction's on-chain state.
//!
//! `AuctionMirror` owns one `Auction` snapshot plus the committed account of
//! whichever user the caller is tracking, and refreshes both through an
//! [`RpcCollaborator`]. Consumers that need a guarantee the data isn't stale
//! call `snapshot()`, which fails closed with `StateError::StaleCache` once
//! `max_age` has elapsed since the last refresh rather than silently serving
//! old numbers.

use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

use crate::address;
use crate::codec;
use crate::error::{Error, Result, StateError};
use crate::rpc::RpcCollaborator;
use crate::state::{Auction, AuctionStatus, Committed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Stale,
    Empty,
}

pub struct AuctionMirror {
    program_id: Pubkey,
    auction_address: Pubkey,
    max_age: Duration,
    auction: Option<Auction>,
    last_refreshed_at: Option<i64>,
}

impl AuctionMirror {
    pub fn new(program_id: Pubkey, auction_address: Pubkey, max_age: Duration) -> Self {
        AuctionMirror { program_id, auction_address, max_age, auction: None, last_refreshed_at: None }
    }

    /// Convenience constructor that derives the auction address from its
    /// sale-token mint instead of requiring the caller to already know it.
    pub fn for_sale_token_mint(program_id: Pubkey, sale_token_mint: &Pubkey, max_age: Duration) -> Self {
        let (auction_address, _bump) = address::derive_auction_address(&program_id, sale_token_mint);
        AuctionMirror::new(program_id, auction_address, max_age)
    }

    pub fn auction_address(&self) -> Pubkey {
        self.auction_address
    }

    /// Fetches the latest `Auction` account and overwrites the cached
    /// snapshot. `now` is the caller-supplied current Unix timestamp, stamped
    /// onto the refreshed snapshot's freshness marker.
    pub async fn refresh(&mut self, rpc: &dyn RpcCollaborator, now: i64) -> Result<()> {
        log::debug!("refreshing auction mirror for {}", self.auction_address);
        let result = self.try_refresh(rpc, now).await;
        match &result {
            Ok(()) => log::debug!("auction mirror for {} refreshed at {now}", self.auction_address),
            Err(e) => log::warn!("auction mirror refresh for {} failed, mirror stays stale: {e}", self.auction_address),
        }
        result
    }

    async fn try_refresh(&mut self, rpc: &dyn RpcCollaborator, now: i64) -> Result<()> {
        let account = rpc
            .get_account(&self.auction_address)
            .await
            .map_err(|e| Error::transport("AuctionMirror::refresh", crate::error::TransportError::RpcError(e.to_string())))?
            .ok_or_else(|| Error::state("AuctionMirror::refresh", StateError::AccountNotFound(self.auction_address)))?;

        let auction = codec::decode_auction_account(&account.data)?;
        self.auction = Some(auction);
        self.last_refreshed_at = Some(now);
        Ok(())
    }

    pub fn cache_status(&self, now: i64) -> CacheStatus {
        match self.last_refreshed_at {
            None => CacheStatus::Empty,
            Some(refreshed_at) if now - refreshed_at > self.max_age.as_secs() as i64 => CacheStatus::Stale,
            Some(_) => CacheStatus::Fresh,
        }
    }

    /// Returns the cached snapshot, failing closed if it is stale or has
    /// never been populated.
    pub fn snapshot(&self, now: i64) -> Result<Auction> {
        match self.cache_status(now) {
            CacheStatus::Empty => Err(Error::state(
                "AuctionMirror::snapshot",
                StateError::AccountNotFound(self.auction_address),
            )),
            CacheStatus::Stale => Err(Error::state(
                "AuctionMirror::snapshot",
                StateError::StaleCache { last_refreshed_at: self.last_refreshed_at.unwrap_or_default() },
            )),
            CacheStatus::Fresh => Ok(self.auction.clone().expect("fresh cache status implies a populated snapshot")),
        }
    }

    pub fn status(&self, now: i64) -> Result<AuctionStatus> {
        Ok(self.snapshot(now)?.status(now))
    }

    pub fn total_payment_raised(&self, now: i64) -> Result<u64> {
        Ok(self.snapshot(now)?.total_payment_raised())
    }

    pub fn bin_fill_rate(&self, now: i64, bin_id: u8) -> Result<Option<f64>> {
        Ok(self.snapshot(now)?.bin_fill_rate(bin_id))
    }
}

/// Fetches and decodes a single user's `Committed` account for an auction,
/// without caching — the Query Facade is responsible for caching this, since
/// the mirror is scoped to one auction's aggregate state.
pub async fn fetch_committed(
    rpc: &dyn RpcCollaborator,
    program_id: &Pubkey,
    auction: &Pubkey,
    user: &Pubkey,
) -> Result<Option<Committed>> {
    let (committed_address, _bump) = address::derive_committed_address(program_id, auction, user);
    let account = rpc
        .get_account(&committed_address)
        .await
        .map_err(|e| Error::transport("fetch_committed", crate::error::TransportError::RpcError(e.to_string())))?;
    match account {
        Some(account) => Ok(Some(codec::decode_committed_account(&account.data)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::test_support::FakeRpcCollaborator;
    use crate::state::{AuctionBin, AuctionExtensions, EmergencyState};
    use solana_sdk::account::Account;

    fn sample_auction() -> Auction {
        Auction {
            authority: Pubkey::new_unique(),
            custody: Pubkey::new_unique(),
            sale_token_mint: Pubkey::new_unique(),
            payment_token_mint: Pubkey::new_unique(),
            commit_start_time: 0,
            commit_end_time: 100,
            claim_start_time: 200,
            bins: vec![AuctionBin { sale_token_price: 1, sale_token_cap: 10, payment_token_raised: 5, sale_token_claimed: 0 }],
            extensions: AuctionExtensions::default(),
            emergency_state: EmergencyState::default(),
            total_participants: 1,
            total_fees_collected: 0,
            total_fees_withdrawn: 0,
            unsold_and_effective_payment_withdrawn: false,
            vault_sale_bump: 255,
            vault_payment_bump: 255,
            bump: 255,
        }
    }

    #[tokio::test]
    async fn refresh_then_snapshot_returns_fresh_data() {
        let program_id = Pubkey::new_unique();
        let auction_address = Pubkey::new_unique();
        let auction = sample_auction();
        let encoded = codec::encode_auction_account(&auction).unwrap();

        let fake = FakeRpcCollaborator::default();
        fake.accounts.lock().unwrap().insert(
            auction_address,
            Account { lamports: 1, data: encoded, owner: program_id, executable: false, rent_epoch: 0 },
        );

        let mut mirror = AuctionMirror::new(program_id, auction_address, Duration::from_secs(30));
        assert_eq!(mirror.cache_status(0), CacheStatus::Empty);
        mirror.refresh(&fake, 1_000).await.unwrap();
        assert_eq!(mirror.cache_status(1_010), CacheStatus::Fresh);
        assert_eq!(mirror.snapshot(1_010).unwrap(), auction);
    }

    #[tokio::test]
    async fn snapshot_fails_closed_once_stale() {
        let program_id = Pubkey::new_unique();
        let auction_address = Pubkey::new_unique();
        let encoded = codec::encode_auction_account(&sample_auction()).unwrap();
        let fake = FakeRpcCollaborator::default();
        fake.accounts.lock().unwrap().insert(
            auction_address,
            Account { lamports: 1, data: encoded, owner: program_id, executable: false, rent_epoch: 0 },
        );

        let mut mirror = AuctionMirror::new(program_id, auction_address, Duration::from_secs(30));
        mirror.refresh(&fake, 1_000).await.unwrap();
        assert_eq!(mirror.cache_status(1_040), CacheStatus::Stale);
        let err = mirror.snapshot(1_040).unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[tokio::test]
    async fn refresh_on_missing_account_surfaces_not_found() {
        let program_id = Pubkey::new_unique();
        let auction_address = Pubkey::new_unique();
        let fake = FakeRpcCollaborator::default();
        let mut mirror = AuctionMirror::new(program_id, auction_address, Duration::from_secs(30));
        let err = mirror.refresh(&fake, 0).await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }
}
