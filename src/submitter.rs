//! Transaction submission through the wallet session
//!
//! Submission and confirmation are separate steps so callers can release
//! per-record bookkeeping as soon as a hash exists. Confirmation polls a
//! read-only connection and has no deadline of its own.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::abi::{self, RevertData};
use crate::error::{RegistryError, Result, RevertReason};
use crate::rpc::{wait_for_receipt, ChainReader};
use crate::session::{has_active_account, UniversalTx, WalletFailure, WalletSession};
use crate::types::{Address, Receipt, TransactionOutcome, H256};

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;

pub struct TransactionSubmitter {
    chain: Arc<dyn ChainReader>,
    poll_interval: Duration,
}

impl TransactionSubmitter {
    pub fn new(chain: Arc<dyn ChainReader>, poll_interval: Duration) -> Self {
        Self {
            chain,
            poll_interval,
        }
    }

    /// Hand the encoded call to the wallet and return its hash
    pub async fn submit(
        &self,
        session: &dyn WalletSession,
        target: &Address,
        call_data: Vec<u8>,
    ) -> Result<H256> {
        if !has_active_account(session) {
            return Err(RegistryError::NoSession);
        }

        let tx = UniversalTx {
            to: *target,
            data: call_data,
            value: 0,
        };

        let response = session
            .send_transaction(tx)
            .await
            .map_err(classify_wallet_failure)?;

        let raw = response
            .hash
            .filter(|h| !h.trim().is_empty())
            .ok_or(RegistryError::NoHashReturned)?;
        let hash: H256 = raw.parse()?;

        info!("Transaction {} sent to {}", hash, target);
        Ok(hash)
    }

    /// Wait for the receipt, however long it takes
    ///
    /// A receipt with a failed status maps to `Reverted`.
    pub async fn confirm(&self, hash: &H256) -> Result<Receipt> {
        let receipt = wait_for_receipt(self.chain.as_ref(), hash, self.poll_interval).await?;
        if !receipt.succeeded() {
            warn!("Transaction {} reverted on-chain", hash);
            return Err(RegistryError::Reverted {
                reason: RevertReason::Unknown("transaction reverted on-chain".to_string()),
            });
        }
        Ok(receipt)
    }

    /// Bounded `confirm`; expiry cancels only this wait
    pub async fn confirm_within(&self, hash: &H256, timeout: Duration) -> Result<Receipt> {
        match tokio::time::timeout(timeout, self.confirm(hash)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Stopped waiting for {} after {:?}; it may still confirm", hash, timeout);
                Err(RegistryError::ConfirmationTimeout {
                    hash: hash.to_string(),
                    waited: timeout,
                })
            }
        }
    }

    /// Submit, then wait for confirmation
    pub async fn submit_and_confirm(
        &self,
        session: &dyn WalletSession,
        target: &Address,
        call_data: Vec<u8>,
    ) -> Result<(TransactionOutcome, Receipt)> {
        let hash = self.submit(session, target, call_data).await?;
        let receipt = self.confirm(&hash).await?;
        debug!("Transaction {} included in block {:?}", hash, receipt.block_number);

        let outcome = TransactionOutcome {
            success: true,
            transaction_hash: hash,
            resolved_record_id: None,
            explorer_url: None,
        };
        Ok((outcome, receipt))
    }
}

/// Map a wallet failure to a specific error kind
pub fn classify_wallet_failure(failure: WalletFailure) -> RegistryError {
    let message = failure.message.to_lowercase();

    if failure.code == Some(USER_REJECTED_CODE)
        || message.contains("user rejected")
        || message.contains("user denied")
    {
        return RegistryError::SubmissionRejected;
    }
    if message.contains("insufficient funds") {
        return RegistryError::InsufficientFunds(failure.message);
    }

    let reason = failure
        .reason
        .clone()
        .or_else(|| failure.data.as_deref().and_then(revert_message))
        .or_else(|| embedded_revert_data(&failure.message).and_then(|d| revert_message(&d)))
        .or_else(|| {
            failure
                .message
                .split_once("execution reverted:")
                .map(|(_, r)| r.trim().to_string())
        });
    match reason {
        Some(reason) if !reason.is_empty() => {
            let reason = RevertReason::from_reason(&reason);
            if !reason.is_known() {
                warn!("Unrecognized revert from the registry: {:?}", reason);
            }
            RegistryError::Reverted { reason }
        }
        _ => RegistryError::Wallet(failure.message),
    }
}

fn revert_message(data: &[u8]) -> Option<String> {
    match abi::decode_revert(data)? {
        RevertData::Message(msg) => Some(msg),
        RevertData::Panic(_) => None,
    }
}

/// Hex revert payload that ethers-style wallets inline as `data="0x..."`
fn embedded_revert_data(message: &str) -> Option<Vec<u8>> {
    let (_, rest) = message.split_once("data=")?;
    let rest = rest.trim_start_matches(['"', '\'']);
    let hex_digits: String = rest
        .strip_prefix("0x")?
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    hex::decode(hex_digits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::MockChain;
    use crate::session::{MockSendBehavior, MockSession};

    fn registry() -> Address {
        "0x00000000000000000000000000000000000000aa".parse().unwrap()
    }

    fn account() -> Address {
        "0x00000000000000000000000000000000000000bb".parse().unwrap()
    }

    fn receipt(hash: H256, status: u64) -> Receipt {
        Receipt {
            transaction_hash: hash,
            block_number: Some(1),
            status: Some(status),
            logs: vec![],
        }
    }

    fn submitter(chain: MockChain) -> TransactionSubmitter {
        TransactionSubmitter::new(Arc::new(chain), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_no_session() {
        let submitter = submitter(MockChain::new());
        let result = submitter
            .submit(&MockSession::disconnected(), &registry(), vec![1])
            .await;
        assert!(matches!(result, Err(RegistryError::NoSession)));
    }

    #[tokio::test]
    async fn test_missing_hash() {
        let session = MockSession::connected(account()).with_behavior(MockSendBehavior::NoHash);
        let result = submitter(MockChain::new()).submit(&session, &registry(), vec![1]).await;
        assert!(matches!(result, Err(RegistryError::NoHashReturned)));
    }

    #[tokio::test]
    async fn test_submit_and_confirm() {
        let hash = H256([0xab; 32]);
        let chain = MockChain::new().with_receipt(receipt(hash, 1), 2);
        let session = MockSession::connected(account());

        let (outcome, receipt) = submitter(chain)
            .submit_and_confirm(&session, &registry(), vec![0xde, 0xad])
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.transaction_hash, hash);
        assert_eq!(receipt.transaction_hash, hash);
        assert_eq!(session.sent()[0].data, vec![0xde, 0xad]);
        assert_eq!(session.sent()[0].to, registry());
    }

    #[tokio::test]
    async fn test_failed_status_is_reverted() {
        let hash = H256([0xab; 32]);
        let chain = MockChain::new().with_receipt(receipt(hash, 0), 0);
        let result = submitter(chain).confirm(&hash).await;
        assert!(matches!(result, Err(RegistryError::Reverted { .. })));
    }

    #[tokio::test]
    async fn test_confirm_within_times_out() {
        let hash = H256([0xcd; 32]);
        let result = submitter(MockChain::new())
            .confirm_within(&hash, Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(RegistryError::ConfirmationTimeout { .. })));
    }

    #[test]
    fn test_classify_wallet_failures() {
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new("MetaMask: user rejected transaction")),
            RegistryError::SubmissionRejected
        ));
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new("boom").with_code(4001)),
            RegistryError::SubmissionRejected
        ));
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new(
                "insufficient funds for gas * price + value"
            )),
            RegistryError::InsufficientFunds(_)
        ));
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new("reverted").with_reason("Not owner")),
            RegistryError::Reverted { reason: RevertReason::NotOwner }
        ));
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new("execution reverted: Token does not exist")),
            RegistryError::Reverted { reason: RevertReason::RecordNotFound }
        ));
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new("nonce too low")),
            RegistryError::Wallet(_)
        ));
    }

    fn error_payload(reason: &str) -> Vec<u8> {
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        data.extend(abi::encode(&[abi::Token::String(reason.to_string())]));
        data
    }

    #[test]
    fn test_classify_decodes_revert_payload() {
        let failure = WalletFailure::new("execution reverted")
            .with_code(3)
            .with_data(error_payload("Not owner"));
        assert!(matches!(
            classify_wallet_failure(failure),
            RegistryError::Reverted { reason: RevertReason::NotOwner }
        ));

        let inline = format!(
            "execution reverted (action=\"estimateGas\", data=\"0x{}\", reason=null)",
            hex::encode(error_payload("Content is not active"))
        );
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new(inline).with_code(3)),
            RegistryError::Reverted { reason: RevertReason::RecordInactive }
        ));
    }

    #[test]
    fn test_classify_panic_payload_stays_generic() {
        let mut data = vec![0x4e, 0x48, 0x7b, 0x71];
        data.extend(abi::encode(&[abi::Token::Uint(0x11)]));
        assert!(matches!(
            classify_wallet_failure(WalletFailure::new("execution reverted").with_data(data)),
            RegistryError::Wallet(_)
        ));
    }
}
