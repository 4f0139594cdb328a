//! Content mutations: create a record, update its download count
//!
//! Both operations validate locally before anything else and pass the
//! network guard before any state-changing call. Every outcome is reported
//! to the `Notifier` as well as returned.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abi::{registry, Token};
use crate::config::explorer_tx_url;
use crate::error::{RegistryError, Result};
use crate::guard::NetworkGuard;
use crate::notify::{NoticeLevel, Notifier};
use crate::reader::RegistryReader;
use crate::resolver::RecordIdResolver;
use crate::session::WalletSession;
use crate::submitter::TransactionSubmitter;
use crate::types::{Address, ContentCategory, TransactionOutcome, H256};

/// Fields of a new record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRecordParams {
    pub category: ContentCategory,
    pub storage_hash: String,
    pub metadata_pointer: String,
    #[serde(default)]
    pub image_pointer: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateRecordParams {
    /// Storage hash, metadata pointer and title must be non-empty
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("storage hash", &self.storage_hash),
            ("metadata pointer", &self.metadata_pointer),
            ("title", &self.title),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Validation(format!(
                "Please fill in all required fields ({}).",
                missing.join(", ")
            )))
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        registry::UPLOAD_CONTENT.encode_call(&[
            Token::Uint(self.category.as_u8() as u128),
            Token::String(self.storage_hash.clone()),
            Token::String(self.metadata_pointer.clone()),
            Token::String(self.image_pointer.clone()),
            Token::String(self.title.clone()),
            Token::Array(self.tags.iter().cloned().map(Token::String).collect()),
        ])
    }
}

/// Record ids with an update waiting for its transaction hash
///
/// Clones share the same set, so every service built from one client sees
/// the same in-flight updates.
#[derive(Debug, Clone, Default)]
pub struct PendingMutations(Arc<Mutex<HashSet<u64>>>);

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).contains(&id)
    }

    fn claim(&self, id: u64) -> Result<PendingClaim> {
        let mut set = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id) {
            return Err(RegistryError::MutationPending(id));
        }
        Ok(PendingClaim {
            pending: self.clone(),
            id,
        })
    }
}

/// Marks a record id as having a mutation in flight until dropped
pub(crate) struct PendingClaim {
    pending: PendingMutations,
    id: u64,
}

impl Drop for PendingClaim {
    fn drop(&mut self) {
        let mut set = self.pending.0.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.id);
    }
}

pub struct ContentMutationService {
    registry: Address,
    guard: NetworkGuard,
    submitter: TransactionSubmitter,
    resolver: RecordIdResolver,
    reader: Arc<dyn RegistryReader>,
    notifier: Arc<dyn Notifier>,
    explorer_url: String,
    pending: PendingMutations,
}

impl ContentMutationService {
    pub fn new(
        registry: Address,
        guard: NetworkGuard,
        submitter: TransactionSubmitter,
        resolver: RecordIdResolver,
        reader: Arc<dyn RegistryReader>,
        notifier: Arc<dyn Notifier>,
        explorer_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            guard,
            submitter,
            resolver,
            reader,
            notifier,
            explorer_url: explorer_url.into(),
            pending: PendingMutations::new(),
        }
    }

    /// Share in-flight bookkeeping with other services
    pub fn with_pending(mut self, pending: PendingMutations) -> Self {
        self.pending = pending;
        self
    }

    /// Create a record and resolve its id
    ///
    /// A confirmed transaction whose id cannot be resolved is still a
    /// success: the outcome carries the hash and an explorer link but no id.
    pub async fn create_record(
        &self,
        session: &dyn WalletSession,
        params: &CreateRecordParams,
    ) -> Result<TransactionOutcome> {
        let result = self.try_create(session, params).await;
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    async fn try_create(
        &self,
        session: &dyn WalletSession,
        params: &CreateRecordParams,
    ) -> Result<TransactionOutcome> {
        params.validate()?;
        self.guard.enforce(session).await?;

        let call_data = params.encode()?;
        self.notifier.notify(
            NoticeLevel::Info,
            "Uploading content... Please confirm in wallet.",
        );

        let hash = self.submitter.submit(session, &self.registry, call_data).await?;
        self.notifier
            .notify(NoticeLevel::Info, "Transaction sent! Waiting for confirmation...");

        let receipt = self.submitter.confirm(&hash).await?;
        debug!("Creation {} confirmed, resolving record id", hash);

        let explorer_url = self.explorer_tx_url(&hash);
        match self
            .resolver
            .resolve_id(&receipt, &self.registry, self.reader.as_ref())
            .await
        {
            Ok(id) => {
                self.notifier.notify(
                    NoticeLevel::Success,
                    &format!("Content uploaded successfully! Token ID: {}", id),
                );
                Ok(TransactionOutcome {
                    success: true,
                    transaction_hash: hash,
                    resolved_record_id: Some(id),
                    explorer_url: Some(explorer_url),
                })
            }
            Err(e) => {
                warn!("Record created by {} but its id is unknown: {}", hash, e);
                self.notifier.notify(
                    NoticeLevel::Warning,
                    &format!("Content uploaded! View the transaction at {}", explorer_url),
                );
                Ok(TransactionOutcome {
                    success: true,
                    transaction_hash: hash,
                    resolved_record_id: None,
                    explorer_url: Some(explorer_url),
                })
            }
        }
    }

    /// Set a record's download count; owner only
    pub async fn update_download_count(
        &self,
        session: &dyn WalletSession,
        id: u64,
        new_count: u64,
    ) -> Result<TransactionOutcome> {
        let result = self.try_update(session, id, new_count).await;
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    async fn try_update(
        &self,
        session: &dyn WalletSession,
        id: u64,
        new_count: u64,
    ) -> Result<TransactionOutcome> {
        if id == 0 || new_count == 0 {
            return Err(RegistryError::Validation(
                "Invalid token ID or download count.".to_string(),
            ));
        }

        let claim = self.claim(id)?;
        self.guard.enforce(session).await?;

        let call_data = registry::UPDATE_DOWNLOAD_COUNT
            .encode_call(&[Token::Uint(id as u128), Token::Uint(new_count as u128)])?;
        self.notifier
            .notify(NoticeLevel::Info, "Updating download count...");

        let hash = self.submitter.submit(session, &self.registry, call_data).await?;
        // Further mutations of this record may start once the hash exists
        drop(claim);

        self.submitter.confirm(&hash).await?;
        info!("Download count of record {} set to {}", id, new_count);
        self.notifier
            .notify(NoticeLevel::Success, "Download count updated successfully!");

        Ok(TransactionOutcome {
            success: true,
            transaction_hash: hash,
            resolved_record_id: Some(id),
            explorer_url: Some(self.explorer_tx_url(&hash)),
        })
    }

    /// Whether an update for `id` is waiting for its transaction hash
    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains(id)
    }

    pub(crate) fn claim(&self, id: u64) -> Result<PendingClaim> {
        self.pending.claim(id)
    }

    fn explorer_tx_url(&self, hash: &H256) -> String {
        explorer_tx_url(&self.explorer_url, hash)
    }

    fn report_failure(&self, err: &RegistryError) {
        warn!("Mutation failed: {}", err);
        match err {
            // The guard has already told the user
            RegistryError::NoSession | RegistryError::WrongNetwork { .. } => {}
            _ => {
                let message = err
                    .revert_reason()
                    .map(|reason| reason.user_message())
                    .unwrap_or_else(|| err.user_message());
                self.notifier.notify(NoticeLevel::Error, &message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode;
    use crate::config::NetworkPolicy;
    use crate::error::RevertReason;
    use crate::notify::RecordingNotifier;
    use crate::reader::MockRegistry;
    use crate::rpc::MockChain;
    use crate::session::{MockSendBehavior, MockSession, WalletFailure};
    use crate::types::{HexBytes, Log, Receipt};
    use std::time::Duration;

    const HASH: H256 = H256([0xab; 32]);

    struct Harness {
        service: ContentMutationService,
        chain: Arc<MockChain>,
        notifier: Arc<RecordingNotifier>,
    }

    fn registry() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    fn account() -> Address {
        "0x00000000000000000000000000000000000000bb".parse().unwrap()
    }

    fn mint_receipt(id: u128) -> Receipt {
        let transfer = registry::TRANSFER_SINGLE;
        Receipt {
            transaction_hash: HASH,
            block_number: Some(7),
            status: Some(1),
            logs: vec![Log {
                address: registry(),
                topics: vec![
                    transfer.topic(),
                    H256(account().to_word()),
                    H256(Address::ZERO.to_word()),
                    H256(account().to_word()),
                ],
                data: HexBytes(encode(&[Token::Uint(id), Token::Uint(1)])),
            }],
        }
    }

    fn empty_receipt(status: u64) -> Receipt {
        Receipt {
            transaction_hash: HASH,
            block_number: Some(7),
            status: Some(status),
            logs: vec![],
        }
    }

    fn harness(chain: MockChain, reader: MockRegistry) -> Harness {
        let chain = Arc::new(chain);
        let notifier = Arc::new(RecordingNotifier::new());
        let guard = NetworkGuard::new(
            42101,
            "Push Chain Donut Testnet",
            NetworkPolicy::Advisory,
            notifier.clone(),
        );
        let service = ContentMutationService::new(
            registry(),
            guard,
            TransactionSubmitter::new(chain.clone(), Duration::from_millis(1)),
            RecordIdResolver::new(registry::CONTENT_UPLOADED_TOPIC.parse().unwrap(), 0),
            Arc::new(reader),
            notifier.clone(),
            "https://donut.push.network",
        );
        Harness {
            service,
            chain,
            notifier,
        }
    }

    fn params() -> CreateRecordParams {
        CreateRecordParams {
            category: ContentCategory::Model,
            storage_hash: "bafy-weights".to_string(),
            metadata_pointer: "ipfs://bafy-meta".to_string(),
            image_pointer: String::new(),
            title: "Tiny LM".to_string(),
            tags: vec!["nlp".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_resolves_id() {
        let h = harness(MockChain::new().with_receipt(mint_receipt(17), 1), MockRegistry::new());
        let session = MockSession::connected(account());

        let outcome = h.service.create_record(&session, &params()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.resolved_record_id, Some(17));
        assert!(!outcome.is_degraded());

        let sent = session.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, registry());
        assert_eq!(sent[0].data[..4], registry::UPLOAD_CONTENT.selector());
        assert!(h.notifier.messages(NoticeLevel::Success)[0].contains("Token ID: 17"));
    }

    #[tokio::test]
    async fn test_create_degrades_without_id() {
        let h = harness(MockChain::new().with_receipt(empty_receipt(1), 0), MockRegistry::new());
        let session = MockSession::connected(account());

        let outcome = h.service.create_record(&session, &params()).await.unwrap();
        assert!(outcome.is_degraded());
        assert_eq!(
            outcome.explorer_url.as_deref(),
            Some(format!("https://donut.push.network/tx/{}", HASH).as_str())
        );
        assert_eq!(h.notifier.messages(NoticeLevel::Warning).len(), 1);
    }

    #[tokio::test]
    async fn test_create_empty_title_never_submits() {
        let h = harness(MockChain::new(), MockRegistry::new());
        let session = MockSession::connected(account());
        let params = CreateRecordParams {
            title: "  ".to_string(),
            ..params()
        };

        let result = h.service.create_record(&session, &params).await;
        assert!(matches!(result, Err(RegistryError::Validation(_))));
        assert_eq!(session.send_count(), 0);
        assert_eq!(h.chain.call_count(), 0);
        assert_eq!(h.notifier.messages(NoticeLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_session() {
        let h = harness(MockChain::new(), MockRegistry::new());
        let session = MockSession::disconnected();

        let result = h.service.create_record(&session, &params()).await;
        assert!(matches!(result, Err(RegistryError::NoSession)));
        assert_eq!(session.send_count(), 0);
    }

    #[tokio::test]
    async fn test_create_refuses_wrong_network() {
        let h = harness(MockChain::new(), MockRegistry::new());
        let session = MockSession::connected(account()).with_chain_id(1);

        let result = h.service.create_record(&session, &params()).await;
        assert!(matches!(result, Err(RegistryError::WrongNetwork { .. })));
        assert_eq!(session.send_count(), 0);
    }

    #[tokio::test]
    async fn test_update_validation_makes_no_calls() {
        let h = harness(MockChain::new(), MockRegistry::new());
        let session = MockSession::connected(account());

        for (id, count) in [(0, 5), (5, 0), (0, 0)] {
            let result = h.service.update_download_count(&session, id, count).await;
            assert!(matches!(result, Err(RegistryError::Validation(_))));
        }
        assert_eq!(session.send_count(), 0);
        assert_eq!(h.chain.call_count(), 0);
        assert_eq!(h.chain.receipt_polls(), 0);
    }

    #[tokio::test]
    async fn test_update_success() {
        let h = harness(MockChain::new().with_receipt(empty_receipt(1), 0), MockRegistry::new());
        let session = MockSession::connected(account());

        let outcome = h.service.update_download_count(&session, 5, 120).await.unwrap();
        assert_eq!(outcome.resolved_record_id, Some(5));
        assert_eq!(
            session.sent()[0].data,
            registry::UPDATE_DOWNLOAD_COUNT
                .encode_call(&[Token::Uint(5), Token::Uint(120)])
                .unwrap()
        );
        assert!(!h.service.is_pending(5));
    }

    #[tokio::test]
    async fn test_update_maps_known_revert() {
        let h = harness(MockChain::new(), MockRegistry::new());
        let session = MockSession::connected(account()).with_behavior(MockSendBehavior::Fail(
            WalletFailure::new("execution reverted").with_reason("Not owner"),
        ));

        let result = h.service.update_download_count(&session, 5, 120).await;
        assert!(matches!(
            result,
            Err(RegistryError::Reverted { reason: RevertReason::NotOwner })
        ));
        assert_eq!(
            h.notifier.messages(NoticeLevel::Error),
            vec!["Only the content owner can update download count.".to_string()]
        );
        assert!(!h.service.is_pending(5));
    }

    #[tokio::test]
    async fn test_update_reverted_on_chain() {
        let h = harness(MockChain::new().with_receipt(empty_receipt(0), 0), MockRegistry::new());
        let session = MockSession::connected(account());

        let result = h.service.update_download_count(&session, 5, 120).await;
        assert!(matches!(result, Err(RegistryError::Reverted { .. })));
    }

    #[tokio::test]
    async fn test_second_update_waits_for_hash() {
        let h = harness(MockChain::new(), MockRegistry::new());
        let session = MockSession::connected(account());

        let claim = h.service.claim(5).unwrap();
        assert!(h.service.is_pending(5));

        let result = h.service.update_download_count(&session, 5, 120).await;
        assert!(matches!(result, Err(RegistryError::MutationPending(5))));
        assert_eq!(session.send_count(), 0);

        drop(claim);
        assert!(!h.service.is_pending(5));
    }

    #[test]
    fn test_rpc_revert_reported_with_its_reason() {
        let h = harness(MockChain::new(), MockRegistry::new());
        h.service.report_failure(&RegistryError::Rpc {
            code: 3,
            message: "execution reverted: Token does not exist".to_string(),
            data: None,
        });
        assert_eq!(
            h.notifier.messages(NoticeLevel::Error),
            vec!["Content not found.".to_string()]
        );
    }

    #[test]
    fn test_params_validation_lists_missing_fields() {
        let params = CreateRecordParams {
            storage_hash: String::new(),
            metadata_pointer: String::new(),
            ..params()
        };
        match params.validate() {
            Err(RegistryError::Validation(msg)) => {
                assert!(msg.contains("storage hash"));
                assert!(msg.contains("metadata pointer"));
                assert!(!msg.contains("title"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
