//! Network guard
//!
//! Checks that the wallet session targets the required network before any
//! state-changing call. When the session reports its chain id the check is
//! a real comparison. When it does not, the `NetworkPolicy` decides: the
//! advisory policy instructs the user to switch and proceeds, so a `true`
//! result then means "likely correct", not proof.

use std::sync::Arc;

use tracing::debug;

use crate::config::NetworkPolicy;
use crate::error::{RegistryError, Result};
use crate::notify::{NoticeLevel, Notifier};
use crate::session::{has_active_account, WalletSession};

/// Outcome of probing the session's network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCheck {
    /// No connected session
    NoSession,
    /// Session reported the required chain id
    Verified,
    /// Session reported a different chain id
    Mismatch { actual: u64 },
    /// Session does not expose its chain id
    Unverified,
}

pub struct NetworkGuard {
    required_chain_id: u64,
    chain_name: String,
    policy: NetworkPolicy,
    notifier: Arc<dyn Notifier>,
}

impl NetworkGuard {
    pub fn new(
        required_chain_id: u64,
        chain_name: impl Into<String>,
        policy: NetworkPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            required_chain_id,
            chain_name: chain_name.into(),
            policy,
            notifier,
        }
    }

    pub fn required_chain_id(&self) -> u64 {
        self.required_chain_id
    }

    /// Probe the session without notifying anyone
    pub async fn check(&self, session: &dyn WalletSession) -> NetworkCheck {
        if !has_active_account(session) {
            return NetworkCheck::NoSession;
        }

        match session.chain_id().await {
            Some(id) if id == self.required_chain_id => NetworkCheck::Verified,
            Some(actual) => NetworkCheck::Mismatch { actual },
            None => NetworkCheck::Unverified,
        }
    }

    /// Whether a state-changing call may proceed
    ///
    /// Never errors: a missing session yields `false` with a warning notice.
    pub async fn ensure_correct_network(&self, session: &dyn WalletSession) -> bool {
        self.enforce(session).await.is_ok()
    }

    /// Like `ensure_correct_network`, but reports why the call may not proceed
    pub async fn enforce(&self, session: &dyn WalletSession) -> Result<NetworkCheck> {
        let check = self.check(session).await;
        debug!("Network check: {:?}", check);

        match check {
            NetworkCheck::NoSession => {
                self.notifier
                    .notify(NoticeLevel::Warning, "Please connect your wallet first.");
                Err(RegistryError::NoSession)
            }
            NetworkCheck::Verified => Ok(check),
            NetworkCheck::Mismatch { actual } => {
                self.notifier.notify(
                    NoticeLevel::Error,
                    &format!(
                        "Wallet is on chain id {}. Please switch to {} (chain id {}) and retry.",
                        actual, self.chain_name, self.required_chain_id
                    ),
                );
                Err(RegistryError::WrongNetwork {
                    required: self.required_chain_id,
                    actual: Some(actual),
                })
            }
            NetworkCheck::Unverified => {
                self.notifier.notify(NoticeLevel::Info, &self.switch_instruction());
                match self.policy {
                    NetworkPolicy::Advisory => Ok(check),
                    NetworkPolicy::Strict => Err(RegistryError::WrongNetwork {
                        required: self.required_chain_id,
                        actual: None,
                    }),
                }
            }
        }
    }

    fn switch_instruction(&self) -> String {
        format!(
            "Please switch your wallet to {} (chain id {}) and retry.",
            self.chain_name, self.required_chain_id
        )
    }
}
