//! Minimal interface fragments: one function or event, no full ABI

use sha3::{Digest, Keccak256};

use super::codec::{self, ParamType, Token};
use crate::error::{RegistryError, Result};
use crate::types::{Log, H256};

/// keccak256 of the input
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

fn signature(name: &str, inputs: impl Iterator<Item = ParamType>) -> String {
    let params: Vec<String> = inputs.map(|p| p.canonical()).collect();
    format!("{}({})", name, params.join(","))
}

/// A single contract function
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub inputs: &'static [ParamType],
    pub outputs: &'static [ParamType],
}

impl Function {
    /// Canonical signature, e.g. `getContent(uint256)`
    pub fn signature(&self) -> String {
        signature(self.name, self.inputs.iter().copied())
    }

    /// First four bytes of the signature hash
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// Selector followed by the ABI-encoded arguments
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>> {
        codec::type_check(self.inputs, args)?;
        let mut data = self.selector().to_vec();
        data.extend(codec::encode(args));
        Ok(data)
    }

    /// Decode return data according to the declared outputs
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>> {
        if data.is_empty() && !self.outputs.is_empty() {
            return Err(RegistryError::Decode(format!(
                "{} returned no data",
                self.name
            )));
        }
        codec::decode(self.outputs, data)
    }
}

/// One event parameter
#[derive(Debug, Clone, Copy)]
pub struct EventParam {
    pub kind: ParamType,
    pub indexed: bool,
}

/// A single contract event
#[derive(Debug, Clone, Copy)]
pub struct Event {
    pub name: &'static str,
    pub inputs: &'static [EventParam],
}

impl Event {
    pub fn signature(&self) -> String {
        signature(self.name, self.inputs.iter().map(|p| p.kind))
    }

    /// topic0 for this event
    pub fn topic(&self) -> H256 {
        H256(keccak256(self.signature().as_bytes()))
    }

    /// Decode the non-indexed fields from a log body
    pub fn decode_data(&self, log: &Log) -> Result<Vec<Token>> {
        let types: Vec<ParamType> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind)
            .collect();
        codec::decode(&types, &log.data.0)
    }
}
