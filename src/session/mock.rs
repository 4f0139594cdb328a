//! Mock wallet session for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SendResponse, UniversalTx, WalletFailure, WalletSession};
use crate::types::{Address, H256};

/// How the mock wallet answers `send_transaction`
#[derive(Debug, Clone)]
pub enum MockSendBehavior {
    /// Accept and return this hash
    Hash(H256),
    /// Accept but return no hash
    NoHash,
    /// Fail with this wallet error
    Fail(WalletFailure),
}

/// Mock wallet session for testing.
pub struct MockSession {
    connected: bool,
    account: Option<Address>,
    chain_id: Option<u64>,
    behavior: MockSendBehavior,
    send_count: AtomicU32,
    sent: Mutex<Vec<UniversalTx>>,
}

impl MockSession {
    /// Connected session that accepts every transaction
    pub fn connected(account: Address) -> Self {
        Self {
            connected: true,
            account: Some(account),
            chain_id: None,
            behavior: MockSendBehavior::Hash(H256([0xab; 32])),
            send_count: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            account: None,
            ..Self::connected(Address::ZERO)
        }
    }

    /// Expose a chain id to the network guard
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_behavior(mut self, behavior: MockSendBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Number of `send_transaction` calls
    pub fn send_count(&self) -> u32 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Transactions handed to the wallet, in order
    pub fn sent(&self) -> Vec<UniversalTx> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl WalletSession for MockSession {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    async fn send_transaction(&self, tx: UniversalTx) -> Result<SendResponse, WalletFailure> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(tx);

        match &self.behavior {
            MockSendBehavior::Hash(hash) => Ok(SendResponse {
                hash: Some(hash.to_string()),
            }),
            MockSendBehavior::NoHash => Ok(SendResponse { hash: None }),
            MockSendBehavior::Fail(failure) => Err(failure.clone()),
        }
    }
}
