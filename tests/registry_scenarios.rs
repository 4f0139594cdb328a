//! End-to-end registry client scenarios against in-memory fakes

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use dehug_client::abi::{encode, registry, Token};
use dehug_client::metadata::MetadataDocument;
use dehug_client::notify::RecordingNotifier;
use dehug_client::reader::MockRegistry;
use dehug_client::rpc::MockChain;
use dehug_client::session::MockSession;
use dehug_client::types::{HexBytes, Log, QualityTier};
use dehug_client::{
    Address, ContentCategory, ContentDiscoveryService, ContentMutationService,
    CreateRecordParams, MetadataEnricher, MetadataSource, NetworkGuard, NetworkPolicy, Receipt,
    Record, RecordIdResolver, RegistryClient, RegistryConfig, RegistryError, ResolutionStrategy,
    TransactionSubmitter, H256,
};

const REGISTRY: &str = "0x00000000000000000000000000000000000000aa";

struct NoMetadata;

#[async_trait]
impl MetadataSource for NoMetadata {
    async fn fetch(&self, _pointer: &str) -> dehug_client::Result<MetadataDocument> {
        Err(RegistryError::Network("gateway unreachable".to_string()))
    }
}

fn registry_address() -> Address {
    REGISTRY.parse().unwrap()
}

fn account() -> Address {
    "0x00000000000000000000000000000000000000bb".parse().unwrap()
}

fn record(id: u64, category: ContentCategory) -> Record {
    Record {
        id,
        category,
        owner: account(),
        storage_hash: format!("bafy-{}", id),
        metadata_pointer: None,
        title: format!("Record {}", id),
        quality_tier: QualityTier(2),
        download_count: 10,
        points: 500,
        created_at: Utc.timestamp_opt(1_717_200_000, 0).unwrap(),
        is_active: true,
    }
}

/// Records 1..=n added oldest first; the registry lists them most recent first
fn seeded(categories: &[ContentCategory]) -> MockRegistry {
    categories
        .iter()
        .enumerate()
        .fold(MockRegistry::new(), |registry, (i, category)| {
            registry.with_record(record(i as u64 + 1, *category))
        })
}

fn discovery(registry: MockRegistry) -> ContentDiscoveryService {
    ContentDiscoveryService::new(
        Arc::new(registry),
        MetadataEnricher::new(Arc::new(NoMetadata)),
    )
}

fn resolver() -> RecordIdResolver {
    RecordIdResolver::new(registry::CONTENT_UPLOADED_TOPIC.parse().unwrap(), 0)
}

fn receipt(logs: Vec<Log>) -> Receipt {
    Receipt {
        transaction_hash: H256([0xab; 32]),
        block_number: Some(1),
        status: Some(1),
        logs,
    }
}

fn mint_log(id: u128) -> Log {
    Log {
        address: registry_address(),
        topics: vec![
            registry::TRANSFER_SINGLE.topic(),
            H256(account().to_word()),
            H256(Address::ZERO.to_word()),
            H256(account().to_word()),
        ],
        data: HexBytes(encode(&[Token::Uint(id), Token::Uint(1)])),
    }
}

fn mutations(chain: Arc<MockChain>) -> ContentMutationService {
    let notifier = Arc::new(RecordingNotifier::new());
    ContentMutationService::new(
        registry_address(),
        NetworkGuard::new(
            42101,
            "Push Chain Donut Testnet",
            NetworkPolicy::Advisory,
            notifier.clone(),
        ),
        TransactionSubmitter::new(chain, Duration::from_millis(1)),
        resolver(),
        Arc::new(MockRegistry::new()),
        notifier,
        "https://donut.push.network",
    )
}

use ContentCategory::{Data, Model};

#[tokio::test]
async fn discover_returns_most_recent_matching_records() {
    // ids [5, 4, 3, 2, 1] with categories [MODEL, DATA, DATA, MODEL, DATA]
    let service = discovery(seeded(&[Data, Model, Data, Data, Model]));

    let results = service.discover(Data, 2, 5).await.unwrap();
    let ids: Vec<u64> = results.iter().map(|r| r.record.id).collect();
    assert_eq!(ids, vec![4, 3]);
    assert!(results.iter().all(|r| r.record.category == Data && r.record.is_active));
}

#[tokio::test]
async fn discover_on_empty_registry_is_empty() {
    let results = discovery(MockRegistry::new()).discover(Model, 10, 50).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn discover_survives_one_malformed_record() {
    let registry = seeded(&[Data, Data, Data, Data, Data, Data]).with_failing(3);
    let service = discovery(registry);

    let all = service.discover(Data, 10, 6).await.unwrap();
    assert_eq!(all.len(), 5);

    let bounded = service.discover(Data, 4, 6).await.unwrap();
    assert_eq!(bounded.len(), 4);
    assert!(bounded.iter().all(|r| r.record.id != 3));
}

#[tokio::test]
async fn discover_uses_defaults_when_metadata_is_unreachable() {
    let service = discovery(seeded(&[Model]).with_pointer(1, "ipfs://bafy-meta"));
    let cards = service.discover_cards(Model, 1, 1).await.unwrap();

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].description, "No description available");
    assert_eq!(cards[0].format, "PyTorch");
    assert_eq!(cards[0].likes, 50);
    assert_eq!(cards[0].nft_value, "0.5 ETH");
    assert!(cards[0].verified);
}

#[tokio::test]
async fn resolve_from_mint_transfer_only() {
    let fallback = MockRegistry::new();
    let id = resolver()
        .resolve_id(&receipt(vec![mint_log(17)]), &registry_address(), &fallback)
        .await
        .unwrap();
    assert_eq!(id, 17);
}

#[tokio::test]
async fn resolve_from_latest_id_read_without_supply() {
    let fallback = MockRegistry::new().with_latest_id(9).with_supply(100);
    let resolution = resolver()
        .resolve(&receipt(vec![]), &registry_address(), &fallback)
        .await
        .unwrap();

    assert_eq!(resolution.id, 9);
    assert_eq!(
        resolution.attempted,
        vec![
            ResolutionStrategy::PrimaryEvent,
            ResolutionStrategy::TransferEvent,
            ResolutionStrategy::LatestIdRead,
        ]
    );
    assert_eq!(fallback.supply_calls(), 0);
}

#[tokio::test]
async fn resolve_skips_zero_mint_id() {
    let fallback = MockRegistry::new().with_latest_id(9);
    let id = resolver()
        .resolve_id(&receipt(vec![mint_log(0)]), &registry_address(), &fallback)
        .await
        .unwrap();
    assert_eq!(id, 9);
    assert_eq!(fallback.latest_calls(), 1);
}

#[tokio::test]
async fn resolve_never_returns_zero() {
    let fallback = MockRegistry::new().with_latest_id(0).with_supply(4);
    let result = resolver()
        .resolve(&receipt(vec![mint_log(0)]), &registry_address(), &fallback)
        .await;

    match result {
        Err(RegistryError::UnresolvedId { attempted, .. }) => assert_eq!(
            attempted,
            vec![
                ResolutionStrategy::PrimaryEvent,
                ResolutionStrategy::TransferEvent,
                ResolutionStrategy::LatestIdRead,
            ]
        ),
        other => panic!("expected UnresolvedId, got {:?}", other),
    }
    assert_eq!(fallback.supply_calls(), 0);
}

#[tokio::test]
async fn update_with_invalid_input_makes_no_chain_calls() {
    let chain = Arc::new(MockChain::new());
    let service = mutations(chain.clone());
    let session = MockSession::connected(account());

    for (id, count) in [(0, 1), (1, 0)] {
        let result = service.update_download_count(&session, id, count).await;
        assert!(matches!(result, Err(RegistryError::Validation(_))));
    }
    assert_eq!(chain.call_count(), 0);
    assert_eq!(chain.receipt_polls(), 0);
    assert_eq!(session.send_count(), 0);
}

#[tokio::test]
async fn create_with_empty_title_is_never_submitted() {
    let chain = Arc::new(MockChain::new());
    let service = mutations(chain.clone());
    let session = MockSession::connected(account());
    let params = CreateRecordParams {
        category: Data,
        storage_hash: "bafy-data".to_string(),
        metadata_pointer: "ipfs://bafy-meta".to_string(),
        image_pointer: String::new(),
        title: String::new(),
        tags: vec![],
    };

    let result = service.create_record(&session, &params).await;
    assert!(matches!(result, Err(RegistryError::Validation(_))));
    assert_eq!(session.send_count(), 0);
    assert_eq!(chain.receipt_polls(), 0);
}

#[tokio::test]
async fn create_then_resolve_over_mock_chain() {
    let chain = Arc::new(MockChain::new().with_receipt(receipt(vec![mint_log(42)]), 2));
    let service = mutations(chain.clone());
    let session = MockSession::connected(account()).with_chain_id(42101);
    let params = CreateRecordParams {
        category: Model,
        storage_hash: "bafy-weights".to_string(),
        metadata_pointer: "ipfs://bafy-meta".to_string(),
        image_pointer: "ipfs://bafy-image".to_string(),
        title: "Tiny LM".to_string(),
        tags: vec!["nlp".to_string(), "small".to_string()],
    };

    let outcome = service.create_record(&session, &params).await.unwrap();
    assert_eq!(outcome.resolved_record_id, Some(42));
    assert_eq!(chain.receipt_polls(), 3);
}

#[tokio::test]
async fn empty_registry_over_json_rpc() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0x"
        })))
        .mount(&server)
        .await;

    let config = RegistryConfig {
        rpc_url: server.uri(),
        gateway_url: format!("{}/ipfs/", server.uri()),
        ..RegistryConfig::for_registry(REGISTRY)
    };
    let client = RegistryClient::new(config).unwrap();

    let results = client
        .discovery(Default::default())
        .unwrap()
        .discover(Data, 10, 50)
        .await
        .unwrap();
    assert!(results.is_empty());
}
