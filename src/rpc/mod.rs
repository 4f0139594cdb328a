//! Read-only connection to the target network
//!
//! `ChainReader` is the seam between the registry logic and the node:
//! `HttpRpcClient` talks JSON-RPC over HTTP, `MockChain` serves canned
//! responses in tests.

mod confirm;
mod http;
mod mock;

pub use confirm::wait_for_receipt;
pub use http::HttpRpcClient;
pub use mock::{MockChain, MockReply};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Address, Receipt, H256};

/// Read-only chain access
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64>;

    /// `eth_call` against the latest block; returns raw return data
    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>>;

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending
    async fn transaction_receipt(&self, hash: &H256) -> Result<Option<Receipt>>;
}
