//! DeHug registry client
//!
//! Client protocol for a content registry whose entries (datasets and
//! models) live as token records in an EVM contract, with payloads and
//! metadata in content-addressed storage.
//!
//! # Architecture
//!
//! - **Mutations**: `NetworkGuard` → `TransactionSubmitter` → `RecordIdResolver`,
//!   composed by `ContentMutationService`
//! - **Discovery**: `RegistryReader` + `MetadataEnricher`, composed by
//!   `ContentDiscoveryService`
//!
//! The wallet session is an explicit `WalletSession` handle passed into every
//! state-changing call. Reads go through a separate read-only `ChainReader`.
//!
//! # Example
//!
//! ```rust,ignore
//! use dehug_client::{ContentCategory, CreateRecordParams, RegistryClient, RegistryConfig};
//!
//! let client = RegistryClient::new(RegistryConfig::from_env()?)?;
//!
//! // Five most recent active models
//! let models = client
//!     .discovery(Default::default())?
//!     .discover(ContentCategory::Model, 5, 50)
//!     .await?;
//!
//! // Mint a new dataset record through the user's wallet
//! let outcome = client
//!     .mutations()?
//!     .create_record(&session, &params)
//!     .await?;
//! match outcome.resolved_record_id {
//!     Some(id) => println!("created {}", id),
//!     None => println!("created, see {:?}", outcome.explorer_url),
//! }
//! ```

// Contract call encoding and decoding
pub mod abi;

// Wiring from configuration
pub mod client;

// Configuration and CLI arguments
pub mod config;

// Filtered, enriched listing of recent records
pub mod discovery;

// Error types
pub mod error;

pub mod guard;
pub mod metadata;
pub mod mutation;
pub mod notify;
pub mod reader;
pub mod resolver;

// Read-only chain connection
pub mod rpc;

// Wallet session handle
pub mod session;

pub mod submitter;
pub mod types;

pub use client::RegistryClient;
pub use config::{NetworkPolicy, RegistryConfig};
pub use discovery::{ContentDiscoveryService, DiscoveryOptions};
pub use error::{RegistryError, Result, RevertReason};
pub use guard::{NetworkCheck, NetworkGuard};
pub use metadata::{GatewayMetadataFetcher, MetadataEnricher, MetadataSource};
pub use mutation::{ContentMutationService, CreateRecordParams, PendingMutations};
pub use notify::{NoticeLevel, Notifier, TracingNotifier};
pub use reader::{RegistryReader, RpcRegistryReader};
pub use resolver::{RecordIdResolver, Resolution, ResolutionStrategy};
pub use session::WalletSession;
pub use submitter::TransactionSubmitter;
pub use types::{
    Address, ContentCard, ContentCategory, DiscoveryResult, ExternalMetadata, Receipt, Record,
    TransactionOutcome, H256,
};
