//! SDK-wide configuration: network selection, RPC behavior, and caching.
//!
//! Layered the way the indexer's own `Configuration` loads: a base file
//! (one of the named presets below, or a caller-supplied one) overlaid with
//! `LAUNCHPAD_SDK__*`-prefixed environment variables via the `config` crate,
//! then deserialized into a single typed struct. Unknown environment keys
//! are rejected rather than silently ignored.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::error::{ConfigError, Error, Result};

const ENV_PREFIX: &str = "LAUNCHPAD_SDK";

/// Cluster selection. `Custom` lets a caller point at a local validator or a
/// private RPC provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Network {
    Mainnet,
    Devnet,
    Testnet,
    Custom { rpc_url: String, ws_url: Option<String> },
}

impl Network {
    pub fn rpc_url(&self) -> &str {
        match self {
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
            Network::Custom { rpc_url, .. } => rpc_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdkConfig {
    pub network: Network,
    pub program_id: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    #[serde(default = "default_batch_max_bytes")]
    pub batch_max_bytes: usize,
}

fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_rpc_timeout_ms() -> u64 {
    30_000
}
fn default_cache_ttl_ms() -> u64 {
    5_000
}
fn default_cache_max_entries() -> usize {
    256
}
fn default_batch_max_bytes() -> usize {
    1232
}

impl SdkConfig {
    pub fn program_id(&self) -> Result<Pubkey> {
        self.program_id
            .parse()
            .map_err(|_| Error::config("SdkConfig::program_id", ConfigError::InvalidProgramId(self.program_id.clone())))
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(Error::config(
                "SdkConfig::commitment_config",
                ConfigError::InvalidNetwork(format!("unknown commitment level: {other}")),
            )),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    fn validate(&self) -> Result<()> {
        if let Network::Custom { rpc_url, .. } = &self.network {
            if rpc_url.is_empty() {
                return Err(Error::config(
                    "SdkConfig::validate",
                    ConfigError::MissingRequiredField("network.rpc_url"),
                ));
            }
            if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
                return Err(Error::config("SdkConfig::validate", ConfigError::InvalidRpcUrl(rpc_url.clone())));
            }
        }
        self.program_id()?;
        self.commitment_config()?;
        Ok(())
    }
}

/// Named configuration presets, each a complete, valid `SdkConfig` on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Development,
    Testing,
    Production,
    Performance,
}

impl Preset {
    fn base(self, program_id: Pubkey) -> SdkConfig {
        let program_id = program_id.to_string();
        match self {
            Preset::Development => SdkConfig {
                network: Network::Custom { rpc_url: "http://127.0.0.1:8899".into(), ws_url: Some("ws://127.0.0.1:8900".into()) },
                program_id,
                commitment: "processed".into(),
                rpc_timeout_ms: 10_000,
                cache_enabled: false,
                cache_ttl_ms: default_cache_ttl_ms(),
                cache_max_entries: default_cache_max_entries(),
                batch_max_bytes: default_batch_max_bytes(),
            },
            Preset::Testing => SdkConfig {
                network: Network::Devnet,
                program_id,
                commitment: "confirmed".into(),
                rpc_timeout_ms: 20_000,
                cache_enabled: false,
                cache_ttl_ms: default_cache_ttl_ms(),
                cache_max_entries: default_cache_max_entries(),
                batch_max_bytes: default_batch_max_bytes(),
            },
            Preset::Production => SdkConfig {
                network: Network::Mainnet,
                program_id,
                commitment: "finalized".into(),
                rpc_timeout_ms: 30_000,
                cache_enabled: true,
                cache_ttl_ms: 5_000,
                cache_max_entries: 512,
                batch_max_bytes: default_batch_max_bytes(),
            },
            Preset::Performance => SdkConfig {
                network: Network::Mainnet,
                program_id,
                commitment: "confirmed".into(),
                rpc_timeout_ms: 15_000,
                cache_enabled: true,
                cache_ttl_ms: 2_000,
                cache_max_entries: 2_048,
                batch_max_bytes: default_batch_max_bytes(),
            },
        }
    }
}

/// Partial overrides layered on top of a [`Preset`] base.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverride {
    pub network: Option<Network>,
    pub commitment: Option<String>,
    pub rpc_timeout_ms: Option<u64>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_ms: Option<u64>,
    pub cache_max_entries: Option<usize>,
    pub batch_max_bytes: Option<usize>,
}

pub struct SdkConfigBuilder {
    config: SdkConfig,
}

impl SdkConfigBuilder {
    pub fn from_preset(preset: Preset, program_id: Pubkey) -> Self {
        SdkConfigBuilder { config: preset.base(program_id) }
    }

    pub fn override_with(mut self, over: ConfigOverride) -> Self {
        if let Some(network) = over.network {
            self.config.network = network;
        }
        if let Some(commitment) = over.commitment {
            self.config.commitment = commitment;
        }
        if let Some(timeout) = over.rpc_timeout_ms {
            self.config.rpc_timeout_ms = timeout;
        }
        if let Some(enabled) = over.cache_enabled {
            self.config.cache_enabled = enabled;
        }
        if let Some(ttl) = over.cache_ttl_ms {
            self.config.cache_ttl_ms = ttl;
        }
        if let Some(max_entries) = over.cache_max_entries {
            self.config.cache_max_entries = max_entries;
        }
        if let Some(max_bytes) = over.batch_max_bytes {
            self.config.batch_max_bytes = max_bytes;
        }
        self
    }

    pub fn build(self) -> Result<SdkConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

const ALLOWED_ENV_KEYS: &[&str] = &[
    "network",
    "program_id",
    "commitment",
    "rpc_timeout_ms",
    "cache_enabled",
    "cache_ttl_ms",
    "cache_max_entries",
    "batch_max_bytes",
];

/// Loads configuration from a file plus `LAUNCHPAD_SDK__*` environment
/// variables, rejecting any environment key outside the known field set.
pub fn load_from_file_and_env(filename: &str) -> Result<SdkConfig> {
    for (key, _) in std::env::vars() {
        if let Some(suffix) = key.strip_prefix(&format!("{ENV_PREFIX}__")) {
            let field = suffix.to_lowercase();
            if !ALLOWED_ENV_KEYS.contains(&field.as_str()) {
                return Err(Error::config("load_from_file_and_env", ConfigError::UnknownKey(key)));
            }
        }
    }

    let built = Config::builder()
        .add_source(File::with_name(filename))
        .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"))
        .build()
        .map_err(|e| Error::config("load_from_file_and_env", ConfigError::InvalidNetwork(e.to_string())))?;

    let config: SdkConfig = built
        .try_deserialize()
        .map_err(|e| Error::config("load_from_file_and_env", ConfigError::InvalidNetwork(e.to_string())))?;
    config.validate()?;
    Ok(config)
}
