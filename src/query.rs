//! Typed read access over the RPC collaborator.
//!
//! Every read goes through an optional short-TTL LRU cache keyed by
//! address, disabled by default and enabled via `SdkConfig::cache_enabled`.
//! When a `Committed` account can't be found (because the program already
//! closed it after a full claim), the facade falls back to scanning the
//! account's transaction history for a `CommittedAccountClosedEvent` and
//! returns the snapshot embedded in that event instead of failing outright.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use solana_sdk::pubkey::Pubkey;

use crate::address;
use crate::codec;
use crate::error::{Error, Result, StateError};
use crate::rpc::RpcCollaborator;
use crate::state::{Auction, CommittedAccountSnapshot};

struct CacheEntry<T> {
    value: T,
    cached_at: Instant,
}

struct TtlCache<T> {
    inner: LruCache<Pubkey, CacheEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).expect("max_entries coerced to at least 1");
        TtlCache { inner: LruCache::new(capacity), ttl }
    }

    fn get(&mut self, key: &Pubkey) -> Option<T> {
        let entry = self.inner.get(key)?;
        if entry.cached_at.elapsed() > self.ttl {
            self.inner.pop(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn put(&mut self, key: Pubkey, value: T) {
        self.inner.put(key, CacheEntry { value, cached_at: Instant::now() });
    }
}

pub struct QueryFacade {
    program_id: Pubkey,
    cache_enabled: bool,
    auction_cache: Option<TtlCache<Auction>>,
}

impl QueryFacade {
    pub fn new(program_id: Pubkey, cache_enabled: bool, cache_max_entries: usize, cache_ttl: Duration) -> Self {
        QueryFacade {
            program_id,
            cache_enabled,
            auction_cache: cache_enabled.then(|| TtlCache::new(cache_max_entries, cache_ttl)),
        }
    }

    pub async fn get_auction(&mut self, rpc: &dyn RpcCollaborator, address: &Pubkey) -> Result<Auction> {
        if self.cache_enabled {
            if let Some(cache) = self.auction_cache.as_mut() {
                if let Some(cached) = cache.get(address) {
                    return Ok(cached);
                }
            }
        }

        let account = rpc
            .get_account(address)
            .await
            .map_err(|e| Error::transport("QueryFacade::get_auction", crate::error::TransportError::RpcError(e.to_string())))?
            .ok_or_else(|| Error::state("QueryFacade::get_auction", StateError::AccountNotFound(*address)))?;
        let auction = codec::decode_auction_account(&account.data)?;

        if let Some(cache) = self.auction_cache.as_mut() {
            cache.put(*address, auction.clone());
        }
        Ok(auction)
    }

    pub async fn get_all_auctions(&self, rpc: &dyn RpcCollaborator) -> Result<Vec<(Pubkey, Auction)>> {
        let accounts = rpc
            .get_program_accounts_with_memcmp(&self.program_id, 0, codec::auction_account_discriminator().to_vec())
            .await
            .map_err(|e| Error::transport("QueryFacade::get_all_auctions", crate::error::TransportError::RpcError(e.to_string())))?;

        accounts
            .into_iter()
            .map(|(addr, account)| codec::decode_auction_account(&account.data).map(|auction| (addr, auction)))
            .collect()
    }

    /// Fetches a single user's commitment record for an auction, falling
    /// back to a closed-event lookup if the account no longer exists.
    pub async fn get_committed(
        &self,
        rpc: &dyn RpcCollaborator,
        auction: &Pubkey,
        user: &Pubkey,
    ) -> Result<CommittedAccountSnapshot> {
        let (committed_address, _bump) = address::derive_committed_address(&self.program_id, auction, user);

        if let Some(account) = rpc
            .get_account(&committed_address)
            .await
            .map_err(|e| Error::transport("QueryFacade::get_committed", crate::error::TransportError::RpcError(e.to_string())))?
        {
            let committed = codec::decode_committed_account(&account.data)?;
            return Ok(CommittedAccountSnapshot::from_committed(&committed));
        }

        self.find_closed_event_snapshot(rpc, &committed_address)
            .await?
            .ok_or_else(|| Error::state("QueryFacade::get_committed", StateError::AccountNotFound(committed_address)))
    }

    /// Scans the signature history of `committed_address` for a transaction
    /// carrying a `CommittedAccountClosedEvent` and returns the embedded
    /// snapshot from the most recent match.
    async fn find_closed_event_snapshot(
        &self,
        rpc: &dyn RpcCollaborator,
        committed_address: &Pubkey,
    ) -> Result<Option<CommittedAccountSnapshot>> {
        let signatures = rpc
            .get_signatures_for_address(committed_address, None, 50)
            .await
            .map_err(|e| Error::transport("QueryFacade::find_closed_event_snapshot", crate::error::TransportError::RpcError(e.to_string())))?;

        for sig_info in signatures {
            let signature = match sig_info.signature.parse() {
                Ok(sig) => sig,
                Err(_) => continue,
            };
            let transaction = match rpc.get_transaction(&signature).await {
                Ok(tx) => tx,
                Err(_) => continue,
            };
            if let Some(snapshot) = extract_closed_event_snapshot(&transaction) {
                return Ok(Some(snapshot));
            }
        }
        Ok(None)
    }

    /// Enumerates every `Committed` account whose `user` field (byte offset
    /// 8..40) matches `user`, via a `memcmp` filter passed to the RPC
    /// collaborator.
    pub async fn get_user_commitments(&self, rpc: &dyn RpcCollaborator, user: &Pubkey) -> Result<Vec<(Pubkey, CommittedAccountSnapshot)>> {
        let accounts = rpc
            .get_program_accounts_with_memcmp(&self.program_id, codec::COMMITTED_USER_OFFSET, user.as_ref().to_vec())
            .await
            .map_err(|e| Error::transport("QueryFacade::get_user_commitments", crate::error::TransportError::RpcError(e.to_string())))?;

        accounts
            .into_iter()
            .map(|(addr, account)| {
                codec::decode_committed_account(&account.data).map(|committed| (addr, CommittedAccountSnapshot::from_committed(&committed)))
            })
            .collect()
    }
}

/// Parses log messages for a `CommittedAccountClosedEvent`. The program
/// emits the Borsh-encoded event bytes, base64-encoded, behind a
/// `Program data: ` log prefix, the same convention Anchor programs use for
/// emitted events.
fn extract_closed_event_snapshot(
    tx: &solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta,
) -> Option<CommittedAccountSnapshot> {
    use base64::Engine;
    let meta = tx.transaction.meta.as_ref()?;
    let logs: &Vec<String> = match &meta.log_messages {
        solana_transaction_status::option_serializer::OptionSerializer::Some(logs) => logs,
        _ => return None,
    };

    for log in logs {
        if let Some(encoded) = log.strip_prefix("Program data: ") {
            if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(encoded) {
                if let Ok(event) = codec::decode_committed_account_closed_event(&bytes) {
                    return Some(event.committed_data);
                }
            }
        }
    }
    None
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
    async fn get_auction_populates_and_serves_from_cache() {
        let program_id = Pubkey::new_unique();
        let addr = Pubkey::new_unique();
        let encoded = codec::encode_auction_account(&sample_auction()).unwrap();
        let fake = FakeRpcCollaborator::default();
        fake.accounts.lock().unwrap().insert(addr, Account { lamports: 1, data: encoded, owner: program_id, executable: false, rent_epoch: 0 });

        let mut facade = QueryFacade::new(program_id, true, 16, Duration::from_secs(30));
        let first = facade.get_auction(&fake, &addr).await.unwrap();
        // Remove the backing account to prove the second read comes from cache.
        fake.accounts.lock().unwrap().remove(&addr);
        let second = facade.get_auction(&fake, &addr).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn get_auction_without_cache_always_hits_rpc() {
        let program_id = Pubkey::new_unique();
        let addr = Pubkey::new_unique();
        let encoded = codec::encode_auction_account(&sample_auction()).unwrap();
        let fake = FakeRpcCollaborator::default();
        fake.accounts.lock().unwrap().insert(addr, Account { lamports: 1, data: encoded, owner: program_id, executable: false, rent_epoch: 0 });

        let mut facade = QueryFacade::new(program_id, false, 16, Duration::from_secs(30));
        facade.get_auction(&fake, &addr).await.unwrap();
        fake.accounts.lock().unwrap().remove(&addr);
        let err = facade.get_auction(&fake, &addr).await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[tokio::test]
    async fn missing_committed_account_with_no_closed_event_is_not_found() {
        let program_id = Pubkey::new_unique();
        let fake = FakeRpcCollaborator::default();
        let facade = QueryFacade::new(program_id, false, 16, Duration::from_secs(30));
        let err = facade.get_committed(&fake, &Pubkey::new_unique(), &Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }
}
