//! Mock chain for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::ChainReader;
use crate::abi::{self, Function, Token};
use crate::error::{RegistryError, Result};
use crate::types::{Address, Receipt, H256};

/// Canned reply for an `eth_call`
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw return data
    Data(Vec<u8>),
    /// Execution reverted, with optional revert payload
    Revert { message: String, data: Option<Vec<u8>> },
    /// Transport-level failure
    Transport(String),
}

impl MockReply {
    /// Return data encoding the given tokens
    pub fn tokens(tokens: &[Token]) -> Self {
        Self::Data(abi::encode(tokens))
    }

    /// Single uint return value
    pub fn uint(value: u128) -> Self {
        Self::tokens(&[Token::Uint(value)])
    }

    fn into_result(self) -> Result<Vec<u8>> {
        match self {
            Self::Data(data) => Ok(data),
            Self::Revert { message, data } => Err(RegistryError::Rpc {
                code: 3,
                message,
                data,
            }),
            Self::Transport(msg) => Err(RegistryError::Network(msg)),
        }
    }
}

/// Mock chain for testing.
///
/// Replies are matched on the full call data first, then on the selector.
/// Unmatched calls revert without a payload.
pub struct MockChain {
    chain_id: u64,
    by_call: HashMap<Vec<u8>, MockReply>,
    by_selector: HashMap<[u8; 4], MockReply>,
    receipts: Mutex<HashMap<H256, (Receipt, u32)>>,
    call_count: AtomicU32,
    selector_counts: Mutex<HashMap<[u8; 4], u32>>,
    receipt_polls: AtomicU32,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            chain_id: 42101,
            by_call: HashMap::new(),
            by_selector: HashMap::new(),
            receipts: Mutex::new(HashMap::new()),
            call_count: AtomicU32::new(0),
            selector_counts: Mutex::new(HashMap::new()),
            receipt_polls: AtomicU32::new(0),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Reply to `function(args)` exactly
    pub fn with_call(mut self, function: Function, args: &[Token], reply: MockReply) -> Self {
        let data = function
            .encode_call(args)
            .expect("mock call arguments must match the fragment");
        self.by_call.insert(data, reply);
        self
    }

    /// Reply to any call of `function`
    pub fn with_function(mut self, function: Function, reply: MockReply) -> Self {
        self.by_selector.insert(function.selector(), reply);
        self
    }

    /// Serve `receipt` after `pending_polls` polls that report it as pending
    pub fn with_receipt(self, receipt: Receipt, pending_polls: u32) -> Self {
        self.receipts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(receipt.transaction_hash, (receipt, pending_polls));
        self
    }

    /// Total `eth_call` count
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// `eth_call` count for one function
    pub fn calls_to(&self, function: Function) -> u32 {
        self.selector_counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&function.selector())
            .copied()
            .unwrap_or(0)
    }

    pub fn receipt_polls(&self) -> u32 {
        self.receipt_polls.load(Ordering::SeqCst)
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn call(&self, _to: &Address, data: &[u8]) -> Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let selector: Option<[u8; 4]> = data.get(..4).and_then(|s| s.try_into().ok());
        if let Some(selector) = selector {
            let mut counts = self.selector_counts.lock().unwrap_or_else(|e| e.into_inner());
            *counts.entry(selector).or_insert(0) += 1;
        }

        let reply = self
            .by_call
            .get(data)
            .or_else(|| selector.and_then(|s| self.by_selector.get(&s)))
            .cloned()
            .unwrap_or(MockReply::Revert {
                message: "execution reverted".to_string(),
                data: None,
            });

        reply.into_result()
    }

    async fn transaction_receipt(&self, hash: &H256) -> Result<Option<Receipt>> {
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);

        let mut receipts = self.receipts.lock().unwrap_or_else(|e| e.into_inner());
        match receipts.get_mut(hash) {
            Some((_, pending)) if *pending > 0 => {
                *pending -= 1;
                Ok(None)
            }
            Some((receipt, _)) => Ok(Some(receipt.clone())),
            None => Ok(None),
        }
    }
}
