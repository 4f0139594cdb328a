//! Chain primitives: addresses, 32-byte hashes, logs and receipts

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RegistryError, Result};

/// Decode a `0x`-prefixed (or bare) hex string
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    let trimmed = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    Ok(hex::decode(trimmed)?)
}

/// Encode bytes as a `0x`-prefixed lowercase hex string
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Shortened display form, e.g. `0x1234...abcd`
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }

    /// Left-padded 32-byte word, as used in indexed event topics
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = from_hex(s)?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| RegistryError::Decode(format!("invalid address length: {}", s)))?;
        Ok(Address(arr))
    }
}

impl TryFrom<String> for Address {
    type Error = RegistryError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// 32-byte value: transaction hashes and log topics
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct H256(pub [u8; 32]);

impl H256 {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl FromStr for H256 {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = from_hex(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| RegistryError::Decode(format!("invalid 32-byte hex: {}", s)))?;
        Ok(H256(arr))
    }
}

impl TryFrom<String> for H256 {
    type Error = RegistryError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<H256> for String {
    fn from(h: H256) -> Self {
        h.to_string()
    }
}

impl From<[u8; 32]> for H256 {
    fn from(bytes: [u8; 32]) -> Self {
        H256(bytes)
    }
}

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_hex(&self.0))
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H256({})", self)
    }
}

/// Arbitrary-length byte payload carried as hex on the wire
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexBytes(pub Vec<u8>);

impl TryFrom<String> for HexBytes {
    type Error = RegistryError;

    fn try_from(s: String) -> Result<Self> {
        Ok(HexBytes(from_hex(&s)?))
    }
}

impl From<HexBytes> for String {
    fn from(b: HexBytes) -> Self {
        to_hex(&b.0)
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_hex(&self.0))
    }
}

/// A log entry emitted during transaction execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// topic0 is the event signature hash for non-anonymous events
    pub topics: Vec<H256>,
    /// Non-indexed event fields, ABI-encoded
    pub data: HexBytes,
}

impl Log {
    pub fn topic(&self, index: usize) -> Option<&H256> {
        self.topics.get(index)
    }
}

/// Confirmed result of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: H256,
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub block_number: Option<u64>,
    /// 1 on success, 0 when execution reverted
    #[serde(default, deserialize_with = "quantity::deserialize_opt")]
    pub status: Option<u64>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Receipts without a status field predate status reporting; treat as success
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

/// JSON-RPC hex quantities (`"0x1a"`)
pub(crate) mod quantity {
    use super::*;

    pub fn parse(s: &str) -> Result<u64> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() {
            return Ok(0);
        }
        u64::from_str_radix(digits, 16)
            .map_err(|e| RegistryError::Decode(format!("invalid quantity {}: {}", s, e)))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_short() {
        let addr: Address = "0x1234567890abcdef1234567890abcdef12345678".parse().unwrap();
        assert_eq!(addr.to_string(), "0x1234567890abcdef1234567890abcdef12345678");
        assert_eq!(addr.short(), "0x1234...5678");
        assert!("0x1234".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_is_case_insensitive() {
        let lower: Address = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd".parse().unwrap();
        let upper: Address = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_receipt_from_rpc_json() {
        let json = serde_json::json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x1",
            "gasUsed": "0x5208",
            "logs": [{
                "address": "0x00000000000000000000000000000000000000aa",
                "topics": [format!("0x{}", "22".repeat(32))],
                "data": "0x",
                "logIndex": "0x0"
            }]
        });

        let receipt: Receipt = serde_json::from_value(json).unwrap();
        assert_eq!(receipt.block_number, Some(16));
        assert!(receipt.succeeded());
        assert_eq!(receipt.logs.len(), 1);
        assert!(receipt.logs[0].data.0.is_empty());
    }
}
