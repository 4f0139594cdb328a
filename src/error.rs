//! Error types for the registry client

use std::time::Duration;

use thiserror::Error;

use crate::resolver::ResolutionStrategy;

/// Result type for registry client operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry client error types
///
/// Every failure in this crate resolves to one of these kinds. None of them
/// are fatal to the process.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Local pre-flight validation failed; no chain call was made
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No wallet session is connected
    #[error("No wallet session connected")]
    NoSession,

    /// The session is not (or cannot be shown to be) on the required network
    #[error("Wallet is not on required network {required} (active: {actual:?})")]
    WrongNetwork { required: u64, actual: Option<u64> },

    /// The user rejected the transaction in the wallet
    #[error("Transaction rejected in wallet")]
    SubmissionRejected,

    /// Gas or balance failure reported by the wallet
    #[error("Insufficient funds for gas: {0}")]
    InsufficientFunds(String),

    /// The wallet reported success but returned no transaction hash
    #[error("Wallet returned success without a transaction hash")]
    NoHashReturned,

    /// Any other wallet-side submission failure
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// A caller-imposed confirmation wait expired. The transaction itself
    /// stays pending on-chain and may still confirm.
    #[error("Confirmation of {hash} not observed within {waited:?}")]
    ConfirmationTimeout { hash: String, waited: Duration },

    /// The transaction succeeded but the new record id could not be discovered
    #[error("Record id could not be resolved for transaction {hash}")]
    UnresolvedId {
        hash: String,
        attempted: Vec<ResolutionStrategy>,
    },

    /// The registry holds no entries yet
    #[error("Registry has no entries")]
    EmptyRegistry,

    /// The registry reverted the call
    #[error("Transaction reverted: {reason}")]
    Reverted { reason: RevertReason },

    /// A mutation for the same record is still waiting for its hash
    #[error("A mutation for record {0} is already pending")]
    MutationPending(u64),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Vec<u8>>,
    },

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// ABI or hex decoding error
    #[error("Decode error: {0}")]
    Decode(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    /// Text suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NoSession => "Please connect your wallet first.".to_string(),
            Self::WrongNetwork { required, .. } => {
                format!("Please switch your wallet to chain id {} and retry.", required)
            }
            Self::SubmissionRejected => "Transaction was rejected in your wallet.".to_string(),
            Self::InsufficientFunds(_) => {
                "Insufficient funds for gas. Please add funds to your wallet.".to_string()
            }
            Self::NoHashReturned => "The wallet did not return a transaction hash.".to_string(),
            Self::ConfirmationTimeout { .. } => {
                "Transaction is still pending. Check the explorer for its status.".to_string()
            }
            Self::UnresolvedId { .. } => {
                "Content uploaded, but its token id could not be determined. Check the explorer."
                    .to_string()
            }
            Self::EmptyRegistry => "No content has been uploaded yet.".to_string(),
            Self::Reverted { reason } => reason.user_message(),
            Self::MutationPending(id) => {
                format!("An update for token {} is already in progress.", id)
            }
            Self::Wallet(msg) => msg.clone(),
            Self::Rpc { .. } | Self::Network(_) | Self::Decode(_) | Self::Serialization(_) => {
                "Failed to reach the registry. The contract might be on a different network."
                    .to_string()
            }
            Self::Config(msg) => format!("Client misconfigured: {}", msg),
        }
    }

    /// Revert reason carried by this error, if any
    ///
    /// RPC errors are inspected for an ABI-encoded revert payload first and
    /// for the node's `execution reverted: <reason>` message second.
    pub fn revert_reason(&self) -> Option<RevertReason> {
        match self {
            Self::Reverted { reason } => Some(reason.clone()),
            Self::Rpc { message, data, .. } => {
                if let Some(crate::abi::RevertData::Message(msg)) =
                    data.as_deref().and_then(crate::abi::decode_revert)
                {
                    return Some(RevertReason::from_reason(&msg));
                }
                message
                    .split_once("execution reverted:")
                    .map(|(_, reason)| RevertReason::from_reason(reason.trim()))
                    .filter(|reason| !matches!(reason, RevertReason::Unknown(r) if r.is_empty()))
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for RegistryError {
    fn from(err: hex::FromHexError) -> Self {
        RegistryError::Decode(err.to_string())
    }
}

/// Revert reasons the registry contract is known to emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    EmptyStorageHash,
    EmptyMetadataPointer,
    EmptyTitle,
    ContentExists,
    RecordNotFound,
    RecordInactive,
    NotOwner,
    Unknown(String),
}

impl RevertReason {
    /// Map a raw revert string to a known reason
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "IPFS hash cannot be empty" => Self::EmptyStorageHash,
            "Metadata IPFS hash cannot be empty" => Self::EmptyMetadataPointer,
            "Title cannot be empty" => Self::EmptyTitle,
            "Content already exists" => Self::ContentExists,
            "Token does not exist" => Self::RecordNotFound,
            "Content is not active" => Self::RecordInactive,
            "Not owner" => Self::NotOwner,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyStorageHash => "IPFS hash is required.".to_string(),
            Self::EmptyMetadataPointer => "Metadata IPFS hash is required.".to_string(),
            Self::EmptyTitle => "Title is required.".to_string(),
            Self::ContentExists => "This content has already been uploaded.".to_string(),
            Self::RecordNotFound => "Content not found.".to_string(),
            Self::RecordInactive => "Content is no longer active.".to_string(),
            Self::NotOwner => "Only the content owner can update download count.".to_string(),
            Self::Unknown(_) => "The registry rejected the transaction.".to_string(),
        }
    }
}

impl std::fmt::Display for RevertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStorageHash => write!(f, "IPFS hash cannot be empty"),
            Self::EmptyMetadataPointer => write!(f, "Metadata IPFS hash cannot be empty"),
            Self::EmptyTitle => write!(f, "Title cannot be empty"),
            Self::ContentExists => write!(f, "Content already exists"),
            Self::RecordNotFound => write!(f, "Token does not exist"),
            Self::RecordInactive => write!(f, "Content is not active"),
            Self::NotOwner => write!(f, "Not owner"),
            Self::Unknown(reason) => write!(f, "{}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_reasons_round_trip_display() {
        for raw in ["Token does not exist", "Content is not active", "Not owner"] {
            let reason = RevertReason::from_reason(raw);
            assert!(reason.is_known());
            assert_eq!(reason.to_string(), raw);
        }
        assert!(!RevertReason::from_reason("Pausable: paused").is_known());
    }

    #[test]
    fn test_revert_reason_from_rpc_message() {
        let err = RegistryError::Rpc {
            code: 3,
            message: "execution reverted: Not owner".to_string(),
            data: None,
        };
        assert_eq!(err.revert_reason(), Some(RevertReason::NotOwner));

        let bare = RegistryError::Rpc {
            code: 3,
            message: "execution reverted".to_string(),
            data: None,
        };
        assert_eq!(bare.revert_reason(), None);
    }

    #[test]
    fn test_user_messages_are_specific() {
        let err = RegistryError::Reverted { reason: RevertReason::RecordInactive };
        assert_eq!(err.user_message(), "Content is no longer active.");
        assert_eq!(
            RegistryError::NoSession.user_message(),
            "Please connect your wallet first."
        );
    }
}
