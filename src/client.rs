//! Registry client
//!
//! Wires the services from a `RegistryConfig`: one read-only chain
//! connection shared by the reader, the submitter and the resolver.

use std::sync::Arc;

use tracing::info;

use crate::config::RegistryConfig;
use crate::discovery::{ContentDiscoveryService, DiscoveryOptions};
use crate::error::{RegistryError, Result, RevertReason};
use crate::guard::{NetworkCheck, NetworkGuard};
use crate::metadata::{GatewayMetadataFetcher, MetadataEnricher};
use crate::mutation::{ContentMutationService, PendingMutations};
use crate::notify::{Notifier, TracingNotifier};
use crate::reader::{RegistryReader, RpcRegistryReader};
use crate::resolver::{RecordIdResolver, Resolution};
use crate::rpc::{ChainReader, HttpRpcClient};
use crate::submitter::TransactionSubmitter;
use crate::types::{Address, Record, H256};

/// Entry point for talking to one registry deployment
///
/// # Example
///
/// ```rust,no_run
/// use dehug_client::{ContentCategory, RegistryClient, RegistryConfig};
///
/// # async fn example() -> dehug_client::Result<()> {
/// let client = RegistryClient::new(RegistryConfig::from_env()?)?;
/// let datasets = client
///     .discovery(Default::default())?
///     .discover(ContentCategory::Data, 10, 50)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RegistryClient {
    config: RegistryConfig,
    registry: Address,
    chain: Arc<dyn ChainReader>,
    reader: Arc<RpcRegistryReader>,
    notifier: Arc<dyn Notifier>,
    pending: PendingMutations,
}

impl RegistryClient {
    /// Client over JSON-RPC at `config.rpc_url`
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let chain = HttpRpcClient::new(&config.rpc_url, config.request_timeout_secs)?;
        Self::with_chain(config, Arc::new(chain))
    }

    /// Client over an existing chain connection
    pub fn with_chain(config: RegistryConfig, chain: Arc<dyn ChainReader>) -> Result<Self> {
        let registry = config.registry()?;
        let reader = Arc::new(RpcRegistryReader::new(chain.clone(), registry));

        Ok(Self {
            config,
            registry,
            chain,
            reader,
            notifier: Arc::new(TracingNotifier),
            pending: PendingMutations::new(),
        })
    }

    /// Deliver user-facing notices somewhere other than the log
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn reader(&self) -> Arc<dyn RegistryReader> {
        self.reader.clone()
    }

    pub fn guard(&self) -> NetworkGuard {
        NetworkGuard::new(
            self.config.chain_id,
            self.config.chain_name.clone(),
            self.config.network_policy,
            self.notifier.clone(),
        )
    }

    pub fn resolver(&self) -> Result<RecordIdResolver> {
        Ok(RecordIdResolver::new(
            self.config.creation_topic()?,
            self.config.supply_id_offset,
        ))
    }

    pub fn submitter(&self) -> TransactionSubmitter {
        TransactionSubmitter::new(self.chain.clone(), self.config.poll_interval())
    }

    pub fn discovery(&self, options: DiscoveryOptions) -> Result<ContentDiscoveryService> {
        let fetcher = GatewayMetadataFetcher::new(
            &self.config.gateway_url,
            self.config.request_timeout_secs,
        )?;
        Ok(
            ContentDiscoveryService::new(self.reader(), MetadataEnricher::new(Arc::new(fetcher)))
                .with_options(options),
        )
    }

    /// Mutation service; every service from this client shares one pending set
    pub fn mutations(&self) -> Result<ContentMutationService> {
        Ok(ContentMutationService::new(
            self.registry,
            self.guard(),
            self.submitter(),
            self.resolver()?,
            self.reader(),
            self.notifier.clone(),
            self.config.explorer_url.clone(),
        )
        .with_pending(self.pending.clone()))
    }

    /// One record with its metadata pointer filled in
    pub async fn record(&self, id: u64) -> Result<Record> {
        let mut record = self.reader.get_record(id).await?;
        record.metadata_pointer = Some(self.reader.get_metadata_pointer(id).await?)
            .filter(|p| !p.is_empty());
        Ok(record)
    }

    /// Resolve the record id created by an already-confirmed transaction
    pub async fn resolve_transaction(&self, hash: &H256) -> Result<Resolution> {
        let receipt = self.chain.transaction_receipt(hash).await?.ok_or_else(|| {
            RegistryError::Validation(format!("transaction {} has no receipt yet", hash))
        })?;
        if !receipt.succeeded() {
            return Err(RegistryError::Reverted {
                reason: RevertReason::Unknown("transaction reverted on-chain".to_string()),
            });
        }

        self.resolver()?
            .resolve(&receipt, &self.registry, self.reader.as_ref())
            .await
    }

    /// Compare the RPC endpoint's chain id with the required one
    pub async fn check_rpc_network(&self) -> Result<NetworkCheck> {
        let actual = self.chain.chain_id().await?;
        info!("RPC endpoint reports chain id {}", actual);
        if actual == self.config.chain_id {
            Ok(NetworkCheck::Verified)
        } else {
            Ok(NetworkCheck::Mismatch { actual })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{registry, Token};
    use crate::reader::record_tokens;
    use crate::rpc::{MockChain, MockReply};
    use crate::session::MockSession;
    use crate::types::{ContentCategory, QualityTier, Receipt};
    use chrono::{TimeZone, Utc};

    const REGISTRY: &str = "0x00000000000000000000000000000000000000aa";

    fn client(chain: MockChain) -> RegistryClient {
        RegistryClient::with_chain(RegistryConfig::for_registry(REGISTRY), Arc::new(chain))
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_includes_pointer() {
        let record = Record {
            id: 2,
            category: ContentCategory::Data,
            owner: Address::ZERO,
            storage_hash: "bafy-2".to_string(),
            metadata_pointer: None,
            title: "Two".to_string(),
            quality_tier: QualityTier(0),
            download_count: 0,
            points: 0,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            is_active: true,
        };
        let chain = MockChain::new()
            .with_call(
                registry::GET_CONTENT,
                &[Token::Uint(2)],
                MockReply::tokens(&record_tokens(&record)),
            )
            .with_function(
                registry::URI,
                MockReply::tokens(&[Token::String("ipfs://bafy-meta".to_string())]),
            );

        let fetched = client(chain).record(2).await.unwrap();
        assert_eq!(fetched.title, "Two");
        assert_eq!(fetched.metadata_pointer.as_deref(), Some("ipfs://bafy-meta"));
    }

    #[tokio::test]
    async fn test_resolve_transaction_uses_fallback_read() {
        let hash = H256([0x42; 32]);
        let receipt = Receipt {
            transaction_hash: hash,
            block_number: Some(3),
            status: Some(1),
            logs: vec![],
        };
        let chain = MockChain::new()
            .with_receipt(receipt, 0)
            .with_function(registry::GET_LATEST_TOKEN_ID, MockReply::uint(9));

        let resolution = client(chain).resolve_transaction(&hash).await.unwrap();
        assert_eq!(resolution.id, 9);
        assert_eq!(resolution.attempted.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_unknown_transaction() {
        let result = client(MockChain::new())
            .resolve_transaction(&H256([0x01; 32]))
            .await;
        assert!(matches!(result, Err(RegistryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rpc_network_check() {
        assert_eq!(
            client(MockChain::new()).check_rpc_network().await.unwrap(),
            NetworkCheck::Verified
        );
        assert_eq!(
            client(MockChain::new().with_chain_id(1)).check_rpc_network().await.unwrap(),
            NetworkCheck::Mismatch { actual: 1 }
        );
    }

    #[tokio::test]
    async fn test_mutation_services_share_pending_updates() {
        let client = client(MockChain::new());
        let session = MockSession::connected(Address::ZERO);

        let first = client.mutations().unwrap();
        let claim = first.claim(5).unwrap();

        let second = client.mutations().unwrap();
        assert!(second.is_pending(5));
        let result = second.update_download_count(&session, 5, 120).await;
        assert!(matches!(result, Err(RegistryError::MutationPending(5))));
        assert_eq!(session.send_count(), 0);

        drop(claim);
        assert!(!second.is_pending(5));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegistryConfig::for_registry("not-an-address");
        assert!(matches!(
            RegistryClient::new(config),
            Err(RegistryError::Config(_))
        ));
    }
}
