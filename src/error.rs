//! Closed error taxonomy for the SDK (design note: no polymorphic "any" errors).

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Coarse-grained classification of an [`Error`], useful for callers that want
/// to branch on "what kind of thing went wrong" without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Validation,
    State,
    Timing,
    Whitelist,
    Arithmetic,
    Transport,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid network selector: {0}")]
    InvalidNetwork(String),
    #[error("invalid RPC URL: {0}")]
    InvalidRpcUrl(String),
    #[error("invalid program id: {0}")]
    InvalidProgramId(String),
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("unknown configuration key: {0}")]
    UnknownKey(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid auction timing: {0}")]
    InvalidTiming(String),
    #[error("invalid bin count: {0} (must be 1..=10)")]
    InvalidBinCount(usize),
    #[error("invalid bin parameter: {0}")]
    InvalidBinParam(String),
    #[error("invalid bin id: {0}")]
    InvalidBinId(u8),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("commit cap exceeded: attempted {attempted}, cap {cap}")]
    CommitCapExceeded { attempted: u64, cap: u64 },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cached auction snapshot is stale (last refreshed at {last_refreshed_at})")]
    StaleCache { last_refreshed_at: i64 },
    #[error("account not found: {0}")]
    AccountNotFound(Pubkey),
    #[error("invalid account data: {0}")]
    InvalidAccountData(String),
}

#[derive(Debug, Error)]
pub enum TimingError {
    #[error("auction has not started yet (commit_start = {commit_start}, now = {now})")]
    AuctionNotStarted { commit_start: i64, now: i64 },
    #[error("commit period has ended (commit_end = {commit_end}, now = {now})")]
    CommitPeriodEnded { commit_end: i64, now: i64 },
    #[error("claim period has not started yet (claim_start = {claim_start}, now = {now})")]
    ClaimPeriodNotStarted { claim_start: i64, now: i64 },
}

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("whitelist is not enabled for this auction")]
    WhitelistNotEnabled,
    #[error("auction has no whitelist authority configured")]
    MissingWhitelistAuthority,
    #[error("signature was produced by the wrong authority")]
    WrongWhitelistAuthority,
    #[error("signed payload does not match the requested commit parameters")]
    PayloadMismatch,
    #[error("authorization has expired (expiry = {expiry}, now = {now})")]
    SignatureExpired { expiry: u64, now: u64 },
    #[error("malformed Ed25519 verify instruction: {0}")]
    MalformedEd25519Ix(String),
    #[error("nonce would overflow u64")]
    NonceOverflow,
}

#[derive(Debug, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),
    #[error("division by zero computing {0}")]
    DivisionByZero(&'static str),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("RPC error: {0}")]
    RpcError(String),
    #[error("operation timed out after {0:?}")]
    TimeoutError(std::time::Duration),
}

/// The single closed error sum returned by every fallible SDK operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error in {context}: {source}")]
    Config {
        #[source]
        source: ConfigError,
        context: String,
    },
    #[error("validation error in {context}: {source}")]
    Validation {
        #[source]
        source: ValidationError,
        context: String,
    },
    #[error("state error in {context}: {source}")]
    State {
        #[source]
        source: StateError,
        context: String,
    },
    #[error("timing error in {context}: {source}")]
    Timing {
        #[source]
        source: TimingError,
        context: String,
    },
    #[error("whitelist error in {context}: {source}")]
    Whitelist {
        #[source]
        source: WhitelistError,
        context: String,
    },
    #[error("arithmetic error in {context}: {source}")]
    Arithmetic {
        #[source]
        source: ArithmeticError,
        context: String,
    },
    #[error("transport error in {context}: {source}")]
    Transport {
        #[source]
        source: TransportError,
        context: String,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. } => ErrorKind::Config,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::State { .. } => ErrorKind::State,
            Error::Timing { .. } => ErrorKind::Timing,
            Error::Whitelist { .. } => ErrorKind::Whitelist,
            Error::Arithmetic { .. } => ErrorKind::Arithmetic,
            Error::Transport { .. } => ErrorKind::Transport,
        }
    }

    pub fn config(context: impl Into<String>, source: ConfigError) -> Self {
        Error::Config { source, context: context.into() }
    }

    pub fn validation(context: impl Into<String>, source: ValidationError) -> Self {
        Error::Validation { source, context: context.into() }
    }

    pub fn state(context: impl Into<String>, source: StateError) -> Self {
        Error::State { source, context: context.into() }
    }

    pub fn timing(context: impl Into<String>, source: TimingError) -> Self {
        Error::Timing { source, context: context.into() }
    }

    pub fn whitelist(context: impl Into<String>, source: WhitelistError) -> Self {
        Error::Whitelist { source, context: context.into() }
    }

    pub fn arithmetic(context: impl Into<String>, source: ArithmeticError) -> Self {
        Error::Arithmetic { source, context: context.into() }
    }

    pub fn transport(context: impl Into<String>, source: TransportError) -> Self {
        Error::Transport { source, context: context.into() }
    }

    /// Whether a caller's retry policy should be allowed to retry this error.
    /// Only transport failures are retry-eligible; validation/codec/address
    /// errors are deterministic and retrying them wastes a round trip.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Produces a single-line, human-readable diagnostic for logs or CLI output.
pub fn format_diagnostic(err: &Error) -> String {
    format!("[{:?}] {}", err.kind(), err)
}
