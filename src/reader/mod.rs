//! Read-only registry access
//!
//! `RegistryReader` is what discovery and id resolution consume.
//! `RpcRegistryReader` implements it with `eth_call`s against the registry
//! contract; `MockRegistry` serves in-memory records in tests.
//!
//! All reads are side-effect free and safe to retry or run concurrently.

mod mock;

pub use mock::MockRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::abi::{self, registry, RevertData, Token};
use crate::error::{RegistryError, Result};
use crate::rpc::ChainReader;
use crate::types::{Address, ContentCategory, QualityTier, Record, RecordSummary};

/// Arithmetic overflow / underflow panic
const PANIC_ARITHMETIC: u64 = 0x11;
/// Array index out of bounds panic
const PANIC_OUT_OF_BOUNDS: u64 = 0x32;

/// Read-only access to the content registry
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Up to `max_count` identifiers, most recent first
    ///
    /// Fails with `EmptyRegistry` when the registry holds no entries.
    async fn list_recent_ids(&self, max_count: u64) -> Result<Vec<u64>>;

    /// Full on-chain fields of one record
    async fn get_record(&self, id: u64) -> Result<Record>;

    /// Pointer to the record's external metadata document
    async fn get_metadata_pointer(&self, id: u64) -> Result<String>;

    /// Summaries for several records at once, in the order of `ids`
    async fn get_record_batch(&self, ids: &[u64]) -> Result<Vec<RecordSummary>> {
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            summaries.push(RecordSummary::from(&self.get_record(*id).await?));
        }
        Ok(summaries)
    }

    /// The registry's "most recent identifier" accessor
    async fn latest_record_id(&self) -> Result<u64>;

    /// The registry's total-count accessor
    async fn total_supply(&self) -> Result<u64>;
}

/// Whether a failed read means "nothing has been created yet"
///
/// A decodable revert reason decides when one is present: an index or
/// arithmetic panic is what reading past the end of an empty list produces.
/// Without one, an empty revert payload or empty return data is taken to
/// mean an empty registry rather than a fault.
pub fn is_empty_registry_failure(err: &RegistryError) -> bool {
    match err {
        RegistryError::EmptyRegistry => true,
        RegistryError::Rpc { message, data, .. } => {
            match data.as_deref().and_then(abi::decode_revert) {
                Some(RevertData::Panic(code)) => {
                    code == PANIC_ARITHMETIC || code == PANIC_OUT_OF_BOUNDS
                }
                Some(RevertData::Message(reason)) => mentions_empty(&reason),
                None => {
                    let no_payload = data.as_ref().map_or(true, |d| d.is_empty());
                    let message = message.to_lowercase();
                    (no_payload && message.contains("revert")) || mentions_empty(&message)
                }
            }
        }
        RegistryError::Decode(message) => mentions_empty(message),
        _ => false,
    }
}

fn mentions_empty(message: &str) -> bool {
    let message = message.to_lowercase();
    ["zero data", "no data", "empty", "no content"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Registry reader over a read-only chain connection
pub struct RpcRegistryReader {
    chain: Arc<dyn ChainReader>,
    registry: Address,
}

impl RpcRegistryReader {
    pub fn new(chain: Arc<dyn ChainReader>, registry: Address) -> Self {
        Self { chain, registry }
    }

    pub fn registry(&self) -> &Address {
        &self.registry
    }

    async fn read(&self, function: abi::Function, args: &[Token]) -> Result<Vec<Token>> {
        let data = function.encode_call(args)?;
        let output = self.chain.call(&self.registry, &data).await?;
        function.decode_output(&output)
    }

    async fn read_uint(&self, function: abi::Function, args: &[Token]) -> Result<u64> {
        self.read(function, args)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::Decode(format!("{} returned nothing", function.name)))?
            .into_u64()
    }
}

#[async_trait]
impl RegistryReader for RpcRegistryReader {
    async fn list_recent_ids(&self, max_count: u64) -> Result<Vec<u64>> {
        if max_count == 0 {
            return Ok(Vec::new());
        }

        let tokens = match self
            .read(registry::GET_LATEST_CONTENT, &[Token::Uint(max_count as u128)])
            .await
        {
            Ok(tokens) => tokens,
            Err(e) if is_empty_registry_failure(&e) => {
                debug!("getLatestContent looks empty: {}", e);
                return Err(RegistryError::EmptyRegistry);
            }
            Err(e) => return Err(e),
        };

        let ids = tokens
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::Decode("getLatestContent returned nothing".to_string()))?
            .into_array()?
            .into_iter()
            .map(Token::into_u64)
            .collect::<Result<Vec<_>>>()?;

        // Some deployments pad the result with zeros
        let ids: Vec<u64> = ids
            .into_iter()
            .filter(|id| *id != 0)
            .take(max_count as usize)
            .collect();

        if ids.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }
        debug!("Registry returned {} recent ids", ids.len());
        Ok(ids)
    }

    async fn get_record(&self, id: u64) -> Result<Record> {
        let tokens = self.read(registry::GET_CONTENT, &[Token::Uint(id as u128)]).await?;
        record_from_tokens(id, tokens)
    }

    async fn get_metadata_pointer(&self, id: u64) -> Result<String> {
        self.read(registry::URI, &[Token::Uint(id as u128)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::Decode("uri returned nothing".to_string()))?
            .into_string()
    }

    async fn get_record_batch(&self, ids: &[u64]) -> Result<Vec<RecordSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let args = Token::Array(ids.iter().map(|id| Token::Uint(*id as u128)).collect());
        let tokens = self.read(registry::GET_CONTENT_BATCH, &[args]).await?;
        summaries_from_columns(ids, tokens)
    }

    async fn latest_record_id(&self) -> Result<u64> {
        self.read_uint(registry::GET_LATEST_TOKEN_ID, &[]).await
    }

    async fn total_supply(&self) -> Result<u64> {
        self.read_uint(registry::TOTAL_SUPPLY, &[]).await
    }
}

fn timestamp(seconds: u64) -> Result<DateTime<Utc>> {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .ok_or_else(|| RegistryError::Decode(format!("invalid timestamp {}", seconds)))
}

/// Build a record from decoded `getContent` output
pub(crate) fn record_from_tokens(id: u64, tokens: Vec<Token>) -> Result<Record> {
    let fields: [Token; 9] = tokens.try_into().map_err(|t: Vec<Token>| {
        RegistryError::Decode(format!("getContent returned {} values, expected 9", t.len()))
    })?;
    let [owner, category, storage_hash, title, tier, downloads, points, created, active] = fields;

    Ok(Record {
        id,
        owner: owner.into_address()?,
        category: ContentCategory::try_from(category.into_u8()?)?,
        storage_hash: storage_hash.into_string()?,
        metadata_pointer: None,
        title: title.into_string()?,
        quality_tier: QualityTier(tier.into_u8()?),
        download_count: downloads.into_u64()?,
        points: points.into_uint()?,
        created_at: timestamp(created.into_u64()?)?,
        is_active: active.into_bool()?,
    })
}

/// Zip the parallel arrays returned by `getContentBatch`
fn summaries_from_columns(ids: &[u64], tokens: Vec<Token>) -> Result<Vec<RecordSummary>> {
    let mut columns = tokens
        .into_iter()
        .map(Token::into_array)
        .collect::<Result<Vec<_>>>()?;

    if columns.len() != 7 || columns.iter().any(|c| c.len() != ids.len()) {
        return Err(RegistryError::Decode(
            "getContentBatch returned mismatched columns".to_string(),
        ));
    }

    let mut iters: Vec<_> = columns.drain(..).map(Vec::into_iter).collect();
    let mut next = |col: usize| {
        iters[col]
            .next()
            .ok_or_else(|| RegistryError::Decode("getContentBatch column exhausted".to_string()))
    };

    let mut summaries = Vec::with_capacity(ids.len());
    for id in ids {
        summaries.push(RecordSummary {
            id: *id,
            owner: next(0)?.into_address()?,
            category: ContentCategory::try_from(next(1)?.into_u8()?)?,
            storage_hash: next(2)?.into_string()?,
            title: next(3)?.into_string()?,
            quality_tier: QualityTier(next(4)?.into_u8()?),
            download_count: next(5)?.into_u64()?,
            is_active: next(6)?.into_bool()?,
        });
    }
    Ok(summaries)
}

/// Tokens `getContent` would return for `record`
#[cfg(test)]
pub(crate) fn record_tokens(record: &Record) -> Vec<Token> {
    vec![
        Token::Address(record.owner),
        Token::Uint(record.category.as_u8() as u128),
        Token::String(record.storage_hash.clone()),
        Token::String(record.title.clone()),
        Token::Uint(record.quality_tier.0 as u128),
        Token::Uint(record.download_count as u128),
        Token::Uint(record.points),
        Token::Uint(record.created_at.timestamp().max(0) as u128),
        Token::Bool(record.is_active),
    ]
}
