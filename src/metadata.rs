//! External metadata resolution
//!
//! A record's metadata pointer names a JSON document in content-addressed
//! storage. `MetadataEnricher` fetches it through a `MetadataSource` and
//! merges it over the category defaults. Enrichment never fails: a missing
//! pointer, an unreachable gateway or an invalid document all yield the
//! defaults.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RegistryError, Result};
use crate::types::{DiscoveryResult, ExternalMetadata, Record};

const IPFS_SCHEME: &str = "ipfs://";

/// Metadata document as stored off-chain
///
/// Every field is optional. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataDocument {
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: MetadataProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetadataProperties {
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub task: Option<String>,
    /// Accepts `"2.3 GB"` as well as a bare number
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub license: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub framework: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MetadataDocument {
    /// Overlay this document on `defaults`
    pub fn merge_into(self, defaults: ExternalMetadata) -> ExternalMetadata {
        let props = self.properties;
        let tags = if props.tags.is_empty() {
            defaults.tags
        } else {
            props
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<BTreeSet<_>>()
        };

        ExternalMetadata {
            description: self.description.unwrap_or(defaults.description),
            tags,
            category: props.category.unwrap_or(defaults.category),
            task: props.task.unwrap_or(defaults.task),
            size: props.size.unwrap_or(defaults.size),
            format: props.format.unwrap_or(defaults.format),
            license: props.license.unwrap_or(defaults.license),
            framework: props.framework.unwrap_or(defaults.framework),
        }
    }
}

/// Source of metadata documents
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, pointer: &str) -> Result<MetadataDocument>;
}

/// Fetches documents over an HTTP storage gateway
pub struct GatewayMetadataFetcher {
    gateway_url: String,
    client: Client,
}

impl GatewayMetadataFetcher {
    pub fn new(gateway_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let mut gateway_url = gateway_url.into();
        if !gateway_url.ends_with('/') {
            gateway_url.push('/');
        }

        Ok(Self {
            gateway_url,
            client,
        })
    }

    /// HTTP URL for a pointer
    ///
    /// `ipfs://` pointers and bare content ids are rewritten to the gateway;
    /// HTTP(S) URLs are used as they are.
    pub fn resolve_url(&self, pointer: &str) -> String {
        let pointer = pointer.trim();
        if let Some(path) = pointer.strip_prefix(IPFS_SCHEME) {
            let path = path.strip_prefix("ipfs/").unwrap_or(path);
            format!("{}{}", self.gateway_url, path)
        } else if pointer.starts_with("http://") || pointer.starts_with("https://") {
            pointer.to_string()
        } else {
            format!("{}{}", self.gateway_url, pointer.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl MetadataSource for GatewayMetadataFetcher {
    async fn fetch(&self, pointer: &str) -> Result<MetadataDocument> {
        let url = self.resolve_url(pointer);
        debug!("Fetching metadata from {}", url);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RegistryError::Network(format!("metadata not found at {}", url)));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(RegistryError::Network(format!("HTTP {} from {}", status, url)));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Merges external metadata into records
pub struct MetadataEnricher {
    source: Arc<dyn MetadataSource>,
}

impl MetadataEnricher {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Best-effort enrichment; falls back to the category defaults
    pub async fn enrich(&self, mut record: Record, pointer: Option<String>) -> DiscoveryResult {
        let defaults = ExternalMetadata::defaults_for(record.category);
        let pointer = pointer.filter(|p| !p.trim().is_empty());

        let (metadata, metadata_resolved) = match &pointer {
            Some(p) => match self.source.fetch(p).await {
                Ok(doc) => (doc.merge_into(defaults), true),
                Err(e) => {
                    warn!("Metadata for record {} unavailable, using defaults: {}", record.id, e);
                    (defaults, false)
                }
            },
            None => {
                debug!("Record {} has no metadata pointer", record.id);
                (defaults, false)
            }
        };

        record.metadata_pointer = pointer;
        DiscoveryResult {
            record,
            metadata,
            metadata_resolved,
        }
    }
}
