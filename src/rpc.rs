//! Chain-read abstraction.
//!
//! The Auction Mirror and Query Facade never talk to `solana-client`
//! directly; they go through this trait so they can be unit-tested against
//! an in-memory fake instead of a live validator, the same separation the
//! indexer's `SolanaClient` trait draws between its RPC and BigTable
//! backends.

use std::time::Duration;

use async_trait::async_trait;
use solana_client::{
    client_error::ClientError,
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_config::{RpcProgramAccountsConfig, RpcTransactionConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};

/// Everything the SDK needs to read from the chain, abstracted behind a
/// trait so callers can substitute a mock in tests.
#[async_trait]
pub trait RpcCollaborator: Sync + Send {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ClientError>;

    async fn get_program_accounts_with_memcmp(
        &self,
        program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> Result<Vec<(Pubkey, Account)>, ClientError>;

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature>, ClientError>;

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<EncodedConfirmedTransactionWithStatusMeta, ClientError>;
}

/// Production implementation backed by `solana-client`'s nonblocking RPC
/// client. Every call is bounded by `timeout`, so a hung validator can never
/// block a caller indefinitely.
pub struct SolanaRpcCollaborator {
    client: RpcClient,
    commitment: CommitmentConfig,
    timeout: Duration,
}

impl SolanaRpcCollaborator {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig, timeout: Duration) -> Self {
        SolanaRpcCollaborator {
            client: RpcClient::new_with_commitment(rpc_url.into(), commitment),
            commitment,
            timeout,
        }
    }

    /// Builds a collaborator from a caller's `SdkConfig`, reusing its
    /// network, commitment, and timeout settings instead of unpacking them
    /// by hand at every call site.
    pub fn from_config(config: &crate::config::SdkConfig) -> Result<Self, crate::error::Error> {
        let commitment = config.commitment_config()?;
        Ok(SolanaRpcCollaborator::new(config.network.rpc_url(), commitment, config.rpc_timeout()))
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T, ClientError>>) -> Result<T, ClientError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::from(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("rpc call exceeded the configured {:?} timeout", self.timeout),
            ))),
        }
    }
}

#[async_trait]
impl RpcCollaborator for SolanaRpcCollaborator {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ClientError> {
        self.bounded(async {
            self.client
                .get_account_with_commitment(address, self.commitment)
                .await
                .map(|response| response.value)
        })
        .await
    }

    async fn get_program_accounts_with_memcmp(
        &self,
        program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> Result<Vec<(Pubkey, Account)>, ClientError> {
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(offset, bytes))]),
            account_config: solana_client::rpc_config::RpcAccountInfoConfig {
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };
        self.bounded(self.client.get_program_accounts_with_config(program_id, config)).await
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature>, ClientError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            until: None,
            limit: Some(limit),
            commitment: Some(self.commitment),
        };
        self.bounded(self.client.get_signatures_for_address_with_config(address, config)).await
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<EncodedConfirmedTransactionWithStatusMeta, ClientError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        self.bounded(self.client.get_transaction_with_config(signature, config)).await
    }
}

/// How a [`RetryingRpcCollaborator`] spaces out repeated attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Linear,
    Exponential,
}

/// Caller-supplied retry policy, applied only to RPC reads. Builder-local
/// failures (codec, validation, address derivation) are deterministic and
/// are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Backoff,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy { attempts: 1, backoff: Backoff::Linear, base_delay: Duration::ZERO }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay * attempt.max(1),
            Backoff::Exponential => self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1)),
        }
    }
}

/// Wraps another [`RpcCollaborator`] and retries each call per a
/// [`RetryPolicy`], sleeping between attempts. The wrapped collaborator is
/// retried verbatim — this type adds no new fallible behavior of its own.
pub struct RetryingRpcCollaborator<R: RpcCollaborator> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: RpcCollaborator> RetryingRpcCollaborator<R> {
    pub fn new(inner: R, policy: RetryPolicy) -> Self {
        RetryingRpcCollaborator { inner, policy }
    }

    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.policy.attempts => return Err(err),
                Err(_) => {
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl<R: RpcCollaborator> RpcCollaborator for RetryingRpcCollaborator<R> {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ClientError> {
        self.with_retry(|| self.inner.get_account(address)).await
    }

    async fn get_program_accounts_with_memcmp(
        &self,
        program_id: &Pubkey,
        offset: usize,
        bytes: Vec<u8>,
    ) -> Result<Vec<(Pubkey, Account)>, ClientError> {
        self.with_retry(|| self.inner.get_program_accounts_with_memcmp(program_id, offset, bytes.clone())).await
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<Signature>,
        limit: usize,
    ) -> Result<Vec<solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature>, ClientError> {
        self.with_retry(|| self.inner.get_signatures_for_address(address, before, limit)).await
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<EncodedConfirmedTransactionWithStatusMeta, ClientError> {
        self.with_retry(|| self.inner.get_transaction(signature)).await
    }
}
