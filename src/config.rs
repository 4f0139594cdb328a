//! Client configuration
//!
//! `RegistryConfig` is what the library consumes. `Args` is the CLI/env
//! surface of the `dehug` binary and converts into a `RegistryConfig`.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::abi::registry::CONTENT_UPLOADED_TOPIC;
use crate::error::{RegistryError, Result};
use crate::types::{Address, H256};

/// What the network guard does when the session cannot report its chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPolicy {
    /// Instruct the user to switch, then proceed optimistically
    #[default]
    Advisory,
    /// Refuse to proceed without a positive chain id match
    Strict,
}

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry contract address
    pub registry_address: String,

    /// Required network identifier
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Human-readable network name used in notifications
    #[serde(default = "default_chain_name")]
    pub chain_name: String,

    /// Read-only JSON-RPC endpoint of the target network
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Block explorer base URL
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,

    /// HTTP gateway that `ipfs://` pointers are rewritten to
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// topic0 of the registry's creation event
    #[serde(default = "default_creation_topic")]
    pub creation_event_topic: String,

    /// Interval between receipt polls while waiting for confirmation
    #[serde(default = "default_poll_ms")]
    pub confirmation_poll_ms: u64,

    /// HTTP timeout for RPC and gateway requests
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Offset added to `totalSupply()` when it is used as the newest id
    #[serde(default)]
    pub supply_id_offset: u64,

    #[serde(default)]
    pub network_policy: NetworkPolicy,
}

fn default_chain_id() -> u64 { 42101 }
fn default_chain_name() -> String { "Push Chain Donut Testnet".to_string() }
fn default_rpc_url() -> String { "https://evm.rpc-testnet-donut-node1.push.org".to_string() }
fn default_explorer_url() -> String { "https://donut.push.network".to_string() }
fn default_gateway_url() -> String { "https://ipfs.io/ipfs/".to_string() }
fn default_creation_topic() -> String { CONTENT_UPLOADED_TOPIC.to_string() }
fn default_poll_ms() -> u64 { 2000 }
fn default_timeout_secs() -> u64 { 30 }

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_address: String::new(),
            chain_id: default_chain_id(),
            chain_name: default_chain_name(),
            rpc_url: default_rpc_url(),
            explorer_url: default_explorer_url(),
            gateway_url: default_gateway_url(),
            creation_event_topic: default_creation_topic(),
            confirmation_poll_ms: default_poll_ms(),
            request_timeout_secs: default_timeout_secs(),
            supply_id_offset: 0,
            network_policy: NetworkPolicy::default(),
        }
    }
}

impl RegistryConfig {
    /// Config for the given registry with reference-deployment defaults
    pub fn for_registry(address: impl Into<String>) -> Self {
        Self {
            registry_address: address.into(),
            ..Default::default()
        }
    }

    /// Build from environment variables, falling back to defaults
    ///
    /// The registry address is read from `NEXT_PUBLIC_DEHUG_ADDRESS` first,
    /// then `DEHUG_ADDRESS`.
    pub fn from_env() -> Result<Self> {
        let registry_address = std::env::var("NEXT_PUBLIC_DEHUG_ADDRESS")
            .or_else(|_| std::env::var("DEHUG_ADDRESS"))
            .map_err(|_| {
                RegistryError::Config(
                    "registry address not configured; set DEHUG_ADDRESS".to_string(),
                )
            })?;

        let mut config = Self::for_registry(registry_address);
        if let Ok(v) = std::env::var("CHAIN_ID") {
            config.chain_id = v
                .parse()
                .map_err(|_| RegistryError::Config(format!("invalid CHAIN_ID '{}'", v)))?;
        }
        if let Ok(v) = std::env::var("RPC_URL") {
            config.rpc_url = v;
        }
        if let Ok(v) = std::env::var("IPFS_GATEWAY") {
            config.gateway_url = v;
        }
        if let Ok(v) = std::env::var("EXPLORER_URL") {
            config.explorer_url = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.registry_address.trim().is_empty() {
            return Err(RegistryError::Config(
                "registry address not configured; set DEHUG_ADDRESS".to_string(),
            ));
        }
        self.registry()?;
        self.creation_topic()?;

        if self.rpc_url.is_empty() {
            return Err(RegistryError::Config("rpc_url is required".to_string()));
        }
        if self.gateway_url.is_empty() {
            return Err(RegistryError::Config("gateway_url is required".to_string()));
        }
        if self.confirmation_poll_ms == 0 {
            return Err(RegistryError::Config(
                "confirmation_poll_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed registry address
    pub fn registry(&self) -> Result<Address> {
        self.registry_address.trim().parse().map_err(|_| {
            RegistryError::Config(format!("invalid registry address '{}'", self.registry_address))
        })
    }

    /// Parsed creation-event topic
    pub fn creation_topic(&self) -> Result<H256> {
        self.creation_event_topic.parse().map_err(|_| {
            RegistryError::Config(format!(
                "invalid creation event topic '{}'",
                self.creation_event_topic
            ))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }

    /// Explorer link for a transaction
    pub fn explorer_tx_url(&self, hash: &H256) -> String {
        explorer_tx_url(&self.explorer_url, hash)
    }
}

/// `{explorer}/tx/{hash}`
pub fn explorer_tx_url(explorer_url: &str, hash: &H256) -> String {
    format!("{}/tx/{}", explorer_url.trim_end_matches('/'), hash)
}

/// dehug - DeHug content registry client
#[derive(Parser, Debug, Clone)]
#[command(name = "dehug")]
#[command(about = "Discover and inspect DeHug registry content")]
pub struct Args {
    /// Registry contract address
    #[arg(long, env = "DEHUG_ADDRESS")]
    pub registry_address: String,

    /// Required network identifier
    #[arg(long, env = "CHAIN_ID", default_value_t = default_chain_id())]
    pub chain_id: u64,

    /// Read-only JSON-RPC endpoint
    #[arg(long, env = "RPC_URL", default_value_t = default_rpc_url())]
    pub rpc_url: String,

    /// Storage gateway base URL
    #[arg(long, env = "IPFS_GATEWAY", default_value_t = default_gateway_url())]
    pub gateway_url: String,

    /// Block explorer base URL
    #[arg(long, env = "EXPLORER_URL", default_value_t = default_explorer_url())]
    pub explorer_url: String,

    /// Override the creation-event topic
    #[arg(long, env = "CREATION_EVENT_TOPIC", default_value_t = default_creation_topic())]
    pub creation_event_topic: String,

    /// Offset added to totalSupply() when resolving ids
    #[arg(long, env = "SUPPLY_ID_OFFSET", default_value = "0")]
    pub supply_id_offset: u64,

    /// HTTP timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = default_timeout_secs())]
    pub request_timeout_secs: u64,

    /// What to do when a wallet cannot report its chain id
    #[arg(long, env = "NETWORK_POLICY", value_enum, default_value_t = NetworkPolicy::Advisory)]
    pub network_policy: NetworkPolicy,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// List recent records of one category
    Discover {
        /// data or model
        #[arg(long, default_value = "data")]
        category: crate::types::ContentCategory,
        /// Maximum results
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Maximum recent ids to scan
        #[arg(long, default_value = "50")]
        max_scan: u64,
        /// Pre-filter with the bulk accessor
        #[arg(long)]
        batch: bool,
        /// Print raw discovery results as JSON instead of cards
        #[arg(long)]
        json: bool,
    },
    /// Show one record and its metadata pointer
    Record { id: u64 },
    /// Resolve the record id created by a confirmed transaction
    ResolveId { tx_hash: String },
    /// Compare the RPC endpoint's chain id with the required one
    Network,
}

impl Args {
    /// Convert into library configuration and validate it
    pub fn to_config(&self) -> Result<RegistryConfig> {
        let config = RegistryConfig {
            registry_address: self.registry_address.clone(),
            chain_id: self.chain_id,
            rpc_url: self.rpc_url.clone(),
            gateway_url: self.gateway_url.clone(),
            explorer_url: self.explorer_url.clone(),
            creation_event_topic: self.creation_event_topic.clone(),
            supply_id_offset: self.supply_id_offset,
            request_timeout_secs: self.request_timeout_secs,
            network_policy: self.network_policy,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}
