//! Record id resolution
//!
//! The creating call's return value is not observable from a receipt, and
//! the registry's creation event is not always decodable with certainty
//! (signature hashes differ across contract versions). The id is therefore
//! recovered by an explicit, ordered list of independent strategies:
//!
//! 1. `PrimaryEvent`: the registry's creation event, id in topic1
//! 2. `TransferEvent`: an ERC-1155 mint `TransferSingle` from the zero address
//! 3. `LatestIdRead`: the registry's `getLatestTokenId()`
//! 4. `SupplyRead`: `totalSupply()` plus a configured offset
//!
//! The first strategy to produce a value wins. A failing strategy is logged
//! and the next one is tried. Zero is never a valid id: a zero mint id counts
//! as no mint found, any other zero ends resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abi::registry::{CONTENT_UPLOADED, TRANSFER_SINGLE};
use crate::abi::{word_to_uint, Token};
use crate::error::{RegistryError, Result};
use crate::reader::RegistryReader;
use crate::types::{Address, Receipt, H256};

/// One way of recovering a freshly created record's id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    PrimaryEvent,
    TransferEvent,
    LatestIdRead,
    SupplyRead,
}

impl ResolutionStrategy {
    /// Strict order in which strategies are tried
    pub const ORDER: [ResolutionStrategy; 4] = [
        Self::PrimaryEvent,
        Self::TransferEvent,
        Self::LatestIdRead,
        Self::SupplyRead,
    ];
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrimaryEvent => "primary-event",
            Self::TransferEvent => "transfer-event",
            Self::LatestIdRead => "latest-id-read",
            Self::SupplyRead => "supply-read",
        };
        f.write_str(name)
    }
}

/// A resolved id and how it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub id: u64,
    pub strategy: ResolutionStrategy,
    /// Strategies tried, in order, including the successful one
    pub attempted: Vec<ResolutionStrategy>,
}

/// Recovers the registry-assigned id of a record from its creation receipt
#[derive(Debug, Clone)]
pub struct RecordIdResolver {
    creation_topic: H256,
    supply_id_offset: u64,
}

impl RecordIdResolver {
    pub fn new(creation_topic: H256, supply_id_offset: u64) -> Self {
        Self {
            creation_topic,
            supply_id_offset,
        }
    }

    /// Resolve the id, or fail with `UnresolvedId`
    pub async fn resolve_id(
        &self,
        receipt: &Receipt,
        registry: &Address,
        fallback: &dyn RegistryReader,
    ) -> Result<u64> {
        self.resolve(receipt, registry, fallback).await.map(|r| r.id)
    }

    /// Resolve the id and report which strategies ran
    pub async fn resolve(
        &self,
        receipt: &Receipt,
        registry: &Address,
        fallback: &dyn RegistryReader,
    ) -> Result<Resolution> {
        let mut attempted = Vec::with_capacity(ResolutionStrategy::ORDER.len());

        for strategy in ResolutionStrategy::ORDER {
            attempted.push(strategy);

            match self.attempt(strategy, receipt, registry, fallback).await {
                Ok(Some(0)) => {
                    warn!("{} yielded the zero sentinel; treating id as unresolved", strategy);
                    break;
                }
                Ok(Some(id)) => {
                    info!(
                        "Resolved record id {} for {} via {}",
                        id, receipt.transaction_hash, strategy
                    );
                    return Ok(Resolution {
                        id,
                        strategy,
                        attempted,
                    });
                }
                Ok(None) => debug!("{} found nothing", strategy),
                Err(e) => warn!("{} failed: {}", strategy, e),
            }
        }

        Err(RegistryError::UnresolvedId {
            hash: receipt.transaction_hash.to_string(),
            attempted,
        })
    }

    /// Run a single strategy
    ///
    /// `Ok(None)` means the strategy ran but found nothing to decode.
    pub async fn attempt(
        &self,
        strategy: ResolutionStrategy,
        receipt: &Receipt,
        registry: &Address,
        fallback: &dyn RegistryReader,
    ) -> Result<Option<u64>> {
        match strategy {
            ResolutionStrategy::PrimaryEvent => self.from_creation_event(receipt, registry),
            ResolutionStrategy::TransferEvent => from_mint_transfer(receipt, registry),
            ResolutionStrategy::LatestIdRead => fallback.latest_record_id().await.map(Some),
            ResolutionStrategy::SupplyRead => {
                let supply = fallback.total_supply().await?;
                warn!(
                    "Using totalSupply() = {} (+{}) as the newest id; assumes sequential ids",
                    supply, self.supply_id_offset
                );
                supply
                    .checked_add(self.supply_id_offset)
                    .map(Some)
                    .ok_or_else(|| RegistryError::Decode("supply id overflows u64".to_string()))
            }
        }
    }

    fn from_creation_event(&self, receipt: &Receipt, registry: &Address) -> Result<Option<u64>> {
        let log = receipt.logs.iter().find(|log| {
            log.address == *registry && log.topic(0) == Some(&self.creation_topic)
        });

        match log {
            Some(log) => {
                // The body is informational; the id comes from the indexed topic
                match CONTENT_UPLOADED.decode_data(log) {
                    Ok(body) => {
                        if let Some(Token::String(title)) = body.get(2) {
                            debug!("Creation event for \"{}\"", title);
                        }
                    }
                    Err(e) => debug!("Creation event body not decodable: {}", e),
                }
                let topic = log.topic(1).ok_or_else(|| {
                    RegistryError::Decode("creation event has no indexed id".to_string())
                })?;
                topic_to_u64(topic).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn from_mint_transfer(receipt: &Receipt, registry: &Address) -> Result<Option<u64>> {
    let topic0 = TRANSFER_SINGLE.topic();
    let log = receipt.logs.iter().find(|log| {
        log.address == *registry
            && log.topic(0) == Some(&topic0)
            && log.topic(2).map_or(false, H256::is_zero)
    });

    match log {
        Some(log) => {
            let id = TRANSFER_SINGLE
                .decode_data(log)?
                .into_iter()
                .next()
                .ok_or_else(|| RegistryError::Decode("TransferSingle body is empty".to_string()))?
                .into_u64()?;
            Ok(Some(id).filter(|id| *id != 0))
        }
        None => Ok(None),
    }
}

fn topic_to_u64(topic: &H256) -> Result<u64> {
    let value = word_to_uint(topic.as_bytes())?;
    u64::try_from(value)
        .map_err(|_| RegistryError::Decode(format!("id {} does not fit in u64", value)))
}
