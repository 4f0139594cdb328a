//! Registry content types and their display-ready views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::chain::{Address, H256};
use crate::error::RegistryError;

/// Kind of content a record represents
///
/// The on-chain encoding is `0` for datasets and `1` for models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Data = 0,
    Model = 1,
}

impl ContentCategory {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Model => "model",
        }
    }
}

impl TryFrom<u8> for ContentCategory {
    type Error = RegistryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Data),
            1 => Ok(Self::Model),
            other => Err(RegistryError::Decode(format!("unknown content type {}", other))),
        }
    }
}

impl FromStr for ContentCategory {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "data" | "dataset" | "datasets" => Ok(Self::Data),
            "model" | "models" => Ok(Self::Model),
            other => Err(RegistryError::Validation(format!("unknown category '{}'", other))),
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordinal quality rank assigned by registry-side logic
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct QualityTier(pub u8);

impl QualityTier {
    pub const SILVER: QualityTier = QualityTier(2);

    /// Datasets are verified at exactly silver; models at silver or above
    pub fn is_verified(&self, category: ContentCategory) -> bool {
        match category {
            ContentCategory::Data => *self == Self::SILVER,
            ContentCategory::Model => *self >= Self::SILVER,
        }
    }
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Registry-assigned identifier, never invented client-side
    pub id: u64,
    pub category: ContentCategory,
    pub owner: Address,
    pub storage_hash: String,
    /// Filled from `uri(id)` when the record is enriched
    pub metadata_pointer: Option<String>,
    pub title: String,
    pub quality_tier: QualityTier,
    pub download_count: u64,
    /// Total points earned
    pub points: u128,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Record fields returned by the bulk accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub id: u64,
    pub owner: Address,
    pub category: ContentCategory,
    pub storage_hash: String,
    pub title: String,
    pub quality_tier: QualityTier,
    pub download_count: u64,
    pub is_active: bool,
}

impl From<&Record> for RecordSummary {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            owner: record.owner,
            category: record.category,
            storage_hash: record.storage_hash.clone(),
            title: record.title.clone(),
            quality_tier: record.quality_tier,
            download_count: record.download_count,
            is_active: record.is_active,
        }
    }
}

/// Externally stored metadata, with category defaults applied for absent fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMetadata {
    pub description: String,
    pub tags: BTreeSet<String>,
    pub category: String,
    pub task: String,
    pub size: String,
    pub format: String,
    pub license: String,
    pub framework: String,
}

impl ExternalMetadata {
    /// Defaults used when the document or one of its fields is missing
    pub fn defaults_for(category: ContentCategory) -> Self {
        let (domain, task, format, framework) = match category {
            ContentCategory::Data => ("Data Processing", "Dataset", "CSV", ""),
            ContentCategory::Model => (
                "Natural Language Processing",
                "Text Generation",
                "PyTorch",
                "transformers",
            ),
        };

        Self {
            description: "No description available".to_string(),
            tags: BTreeSet::new(),
            category: domain.to_string(),
            task: task.to_string(),
            size: "Unknown".to_string(),
            format: format.to_string(),
            license: "MIT".to_string(),
            framework: framework.to_string(),
        }
    }
}

/// A record merged with its external metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub record: Record,
    pub metadata: ExternalMetadata,
    /// False when the metadata document could not be fetched and defaults were used
    pub metadata_resolved: bool,
}

/// Result of a create/update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub success: bool,
    pub transaction_hash: H256,
    pub resolved_record_id: Option<u64>,
    pub explorer_url: Option<String>,
}

impl TransactionOutcome {
    /// Successful transaction whose record id could not be determined
    pub fn is_degraded(&self) -> bool {
        self.success && self.resolved_record_id.is_none() && self.explorer_url.is_some()
    }
}

/// Display-ready card for a discovered record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub task: String,
    pub author: String,
    pub upload_date: String,
    pub downloads: u64,
    pub size: String,
    pub format: String,
    pub tags: Vec<String>,
    pub likes: u128,
    pub verified: bool,
    pub license: String,
    pub framework: String,
    pub nft_value: String,
    pub trending: bool,
}

impl From<&DiscoveryResult> for ContentCard {
    fn from(result: &DiscoveryResult) -> Self {
        let record = &result.record;
        let meta = &result.metadata;

        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            description: meta.description.clone(),
            category: meta.category.clone(),
            task: meta.task.clone(),
            author: record.owner.short(),
            upload_date: record.created_at.format("%Y-%m-%d").to_string(),
            downloads: record.download_count,
            size: meta.size.clone(),
            format: meta.format.clone(),
            tags: meta.tags.iter().cloned().collect(),
            likes: record.points / 10,
            verified: record.quality_tier.is_verified(record.category),
            license: meta.license.clone(),
            framework: meta.framework.clone(),
            nft_value: format!("{:.1} ETH", record.points as f64 / 1000.0),
            trending: record.download_count > 1000,
        }
    }
}
