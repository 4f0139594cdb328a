//! Core types shared across the client
//!
//! - `chain`: addresses, hashes, logs, receipts
//! - `content`: registry records, metadata, outcomes and display cards

mod chain;
mod content;

pub use chain::{from_hex, to_hex, Address, HexBytes, Log, Receipt, H256};
pub(crate) use chain::quantity;
pub use content::{
    ContentCard, ContentCategory, DiscoveryResult, ExternalMetadata, QualityTier, Record,
    RecordSummary, TransactionOutcome,
};
