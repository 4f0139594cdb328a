//! JSON-RPC over HTTP

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ChainReader;
use crate::error::{RegistryError, Result};
use crate::types::{from_hex, quantity, to_hex, Address, Receipt, H256};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RpcErrorObject> for RegistryError {
    fn from(err: RpcErrorObject) -> Self {
        // Revert payloads arrive as a hex string in `data`
        let data = err
            .data
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| from_hex(s).ok());

        RegistryError::Rpc {
            code: err.code,
            message: err.message,
            data,
        }
    }
}

/// HTTP JSON-RPC client for the target network
///
/// # Example
///
/// ```rust,no_run
/// use dehug_client::rpc::{ChainReader, HttpRpcClient};
///
/// # async fn example() -> dehug_client::Result<()> {
/// let rpc = HttpRpcClient::new("https://evm.rpc-testnet-donut-node1.push.org", 30)?;
/// let chain_id = rpc.chain_id().await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpRpcClient {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a client with the given request timeout
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Network(format!("HTTP {} - {}", status, body)));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            tracing::debug!("{} failed: {} ({})", method, err.message, err.code);
            return Err(err.into());
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ChainReader for HttpRpcClient {
    async fn chain_id(&self) -> Result<u64> {
        let result = self.request("eth_chainId", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| RegistryError::Decode(format!("eth_chainId returned {}", result)))?;
        quantity::parse(raw)
    }

    async fn call(&self, to: &Address, data: &[u8]) -> Result<Vec<u8>> {
        let params = json!([{ "to": to.to_string(), "data": to_hex(data) }, "latest"]);
        let result = self.request("eth_call", params).await?;
        match result.as_str() {
            Some(raw) => from_hex(raw),
            None if result.is_null() => Ok(Vec::new()),
            None => Err(RegistryError::Decode(format!("eth_call returned {}", result))),
        }
    }

    async fn transaction_receipt(&self, hash: &H256) -> Result<Option<Receipt>> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }
}
