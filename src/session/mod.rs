//! Wallet session handle
//!
//! The connected wallet's authority to sign and submit transactions. The
//! handle is passed explicitly to the guard, the submitter and the services
//! instead of being read from ambient state, so tests can swap in a
//! `MockSession`.

mod mock;

pub use mock::{MockSendBehavior, MockSession};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Transaction handed to the wallet's universal-send capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalTx {
    pub to: Address,
    pub data: Vec<u8>,
    /// Native value in wei
    pub value: u128,
}

/// What the wallet reports after accepting a transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendResponse {
    /// Transaction hash as returned by the wallet, if any
    pub hash: Option<String>,
}

/// Failure reported by the wallet
///
/// Wallet stacks surface rejections and reverts inconsistently; `reason`
/// carries a decoded revert string when the wallet provides one, `data` the
/// raw revert payload (EIP-1193 `error.data`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletFailure {
    pub code: Option<i64>,
    pub message: String,
    pub reason: Option<String>,
    pub data: Option<Vec<u8>>,
}

impl WalletFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }
}

/// Connected wallet session
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Whether a wallet is connected
    fn is_connected(&self) -> bool;

    /// The connected account
    fn account(&self) -> Option<Address>;

    /// Chain id the session currently targets, when the wallet exposes it
    async fn chain_id(&self) -> Option<u64> {
        None
    }

    /// Sign and broadcast a transaction
    async fn send_transaction(&self, tx: UniversalTx) -> Result<SendResponse, WalletFailure>;
}

/// A session is usable only when connected with a known account
pub fn has_active_account(session: &dyn WalletSession) -> bool {
    session.is_connected() && session.account().is_some()
}
