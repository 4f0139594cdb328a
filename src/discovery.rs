//! Content discovery
//!
//! Produces a bounded, category-filtered, most-recent-first list of active
//! records enriched with their external metadata. An empty registry and a
//! registry with no matching records both yield an empty list. Individual
//! records that fail to load are skipped; only a failure to list recent ids
//! fails the whole pass.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::error::{RegistryError, Result};
use crate::metadata::MetadataEnricher;
use crate::reader::RegistryReader;
use crate::types::{ContentCard, ContentCategory, DiscoveryResult, Record};

/// Discovery tuning
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Pre-filter candidates with one `getContentBatch` call before fetching
    /// full records. Falls back to per-record fetches if the call fails.
    pub use_batch: bool,
}

pub struct ContentDiscoveryService {
    reader: Arc<dyn RegistryReader>,
    enricher: MetadataEnricher,
    options: DiscoveryOptions,
}

impl ContentDiscoveryService {
    pub fn new(reader: Arc<dyn RegistryReader>, enricher: MetadataEnricher) -> Self {
        Self {
            reader,
            enricher,
            options: DiscoveryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    /// Up to `limit` active records of `category`, scanning at most
    /// `max_scan` recent ids
    pub async fn discover(
        &self,
        category: ContentCategory,
        limit: usize,
        max_scan: u64,
    ) -> Result<Vec<DiscoveryResult>> {
        if limit == 0 || max_scan == 0 {
            return Ok(Vec::new());
        }

        let ids = match self.reader.list_recent_ids(max_scan).await {
            Ok(ids) => ids,
            Err(RegistryError::EmptyRegistry) => {
                info!("Registry is empty; no {} records to show", category);
                return Ok(Vec::new());
            }
            Err(e) => {
                error!("Failed to list recent ids: {}", e);
                return Err(e);
            }
        };
        debug!("Scanning {} recent ids for {} records", ids.len(), category);

        let candidates = if self.options.use_batch {
            self.prefilter(ids, category).await
        } else {
            ids
        };

        let accepted = self.scan(&candidates, category, limit).await;
        if accepted.is_empty() {
            info!("No active {} records among {} scanned", category, candidates.len());
            return Ok(Vec::new());
        }

        // join_all yields results in input order
        let results = join_all(accepted.into_iter().map(|record| self.enrich(record))).await;
        info!("Discovered {} {} records", results.len(), category);
        Ok(results)
    }

    /// `discover`, converted to display cards
    pub async fn discover_cards(
        &self,
        category: ContentCategory,
        limit: usize,
        max_scan: u64,
    ) -> Result<Vec<ContentCard>> {
        let results = self.discover(category, limit, max_scan).await?;
        Ok(results.iter().map(ContentCard::from).collect())
    }

    /// Drop ids the bulk accessor reports as the wrong category or inactive
    async fn prefilter(&self, ids: Vec<u64>, category: ContentCategory) -> Vec<u64> {
        match self.reader.get_record_batch(&ids).await {
            Ok(summaries) => {
                let kept: Vec<u64> = summaries
                    .into_iter()
                    .filter(|s| s.category == category && s.is_active)
                    .map(|s| s.id)
                    .collect();
                debug!("Batch pre-filter kept {} of {} ids", kept.len(), ids.len());
                kept
            }
            Err(e) => {
                warn!("Batch read failed, falling back to per-record reads: {}", e);
                ids
            }
        }
    }

    /// Fetch records in order, keeping matches until `limit`
    async fn scan(&self, ids: &[u64], category: ContentCategory, limit: usize) -> Vec<Record> {
        let mut accepted = Vec::with_capacity(limit.min(ids.len()));

        for id in ids {
            match self.reader.get_record(*id).await {
                Ok(record) if record.category == category && record.is_active => {
                    debug!("Accepted record {}", id);
                    accepted.push(record);
                    if accepted.len() >= limit {
                        break;
                    }
                }
                Ok(record) => debug!(
                    "Skipping record {} ({}, active={})",
                    id, record.category, record.is_active
                ),
                Err(e) => warn!("Skipping record {}: {}", id, e),
            }
        }

        accepted
    }

    async fn enrich(&self, record: Record) -> DiscoveryResult {
        let pointer = match self.reader.get_metadata_pointer(record.id).await {
            Ok(pointer) => Some(pointer),
            Err(e) => {
                warn!("No metadata pointer for record {}: {}", record.id, e);
                None
            }
        };
        self.enricher.enrich(record, pointer).await
    }
}
