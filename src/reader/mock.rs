//! Mock registry for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use super::RegistryReader;
use crate::error::{RegistryError, Result};
use crate::types::{Record, RecordSummary};

/// Mock registry for testing.
///
/// Records are listed most recent first in the order they were added.
/// Ids marked failing return a decode error from `get_record`.
#[derive(Default)]
pub struct MockRegistry {
    records: Vec<Record>,
    pointers: HashMap<u64, String>,
    failing: HashSet<u64>,
    latest_id: Option<u64>,
    supply: Option<u64>,
    batch_supported: bool,
    list_calls: AtomicU32,
    record_calls: AtomicU32,
    batch_calls: AtomicU32,
    latest_calls: AtomicU32,
    supply_calls: AtomicU32,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; later additions are more recent
    pub fn with_record(mut self, record: Record) -> Self {
        self.records.insert(0, record);
        self
    }

    pub fn with_pointer(mut self, id: u64, pointer: impl Into<String>) -> Self {
        self.pointers.insert(id, pointer.into());
        self
    }

    /// Make `get_record(id)` fail
    pub fn with_failing(mut self, id: u64) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn with_latest_id(mut self, id: u64) -> Self {
        self.latest_id = Some(id);
        self
    }

    pub fn with_supply(mut self, supply: u64) -> Self {
        self.supply = Some(supply);
        self
    }

    /// Serve `get_record_batch` in one call instead of failing it
    pub fn with_batch(mut self) -> Self {
        self.batch_supported = true;
        self
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> u32 {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> u32 {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn latest_calls(&self) -> u32 {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn supply_calls(&self) -> u32 {
        self.supply_calls.load(Ordering::SeqCst)
    }

    fn find(&self, id: u64) -> Result<&Record> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RegistryError::Rpc {
                code: 3,
                message: "execution reverted: Token does not exist".to_string(),
                data: None,
            })
    }
}

#[async_trait]
impl RegistryReader for MockRegistry {
    async fn list_recent_ids(&self, max_count: u64) -> Result<Vec<u64>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.records.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }
        Ok(self
            .records
            .iter()
            .take(max_count as usize)
            .map(|r| r.id)
            .collect())
    }

    async fn get_record(&self, id: u64) -> Result<Record> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&id) {
            return Err(RegistryError::Decode(format!("malformed record {}", id)));
        }
        self.find(id).cloned()
    }

    async fn get_metadata_pointer(&self, id: u64) -> Result<String> {
        self.pointers.get(&id).cloned().ok_or_else(|| RegistryError::Rpc {
            code: 3,
            message: "execution reverted".to_string(),
            data: None,
        })
    }

    async fn get_record_batch(&self, ids: &[u64]) -> Result<Vec<RecordSummary>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.batch_supported {
            return Err(RegistryError::Rpc {
                code: 3,
                message: "execution reverted".to_string(),
                data: None,
            });
        }
        ids.iter()
            .map(|id| self.find(*id).map(RecordSummary::from))
            .collect()
    }

    async fn latest_record_id(&self) -> Result<u64> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.latest_id
            .ok_or_else(|| RegistryError::Decode("getLatestTokenId returned no data".to_string()))
    }

    async fn total_supply(&self) -> Result<u64> {
        self.supply_calls.fetch_add(1, Ordering::SeqCst);
        self.supply
            .ok_or_else(|| RegistryError::Decode("totalSupply returned no data".to_string()))
    }
}
