//! Waiting for a broadcast transaction to confirm

use std::time::Duration;

use tracing::{debug, warn};

use super::ChainReader;
use crate::error::Result;
use crate::types::{Receipt, H256};

/// Poll until the transaction has a receipt
///
/// There is no built-in deadline. Callers that need a bounded wait wrap this
/// future in `tokio::time::timeout`; dropping it cancels only the wait, never
/// the transaction. Transport failures are logged and polling continues,
/// since reads are safely retryable.
pub async fn wait_for_receipt<C>(chain: &C, hash: &H256, poll_interval: Duration) -> Result<Receipt>
where
    C: ChainReader + ?Sized,
{
    let mut polls: u64 = 0;
    loop {
        polls += 1;
        match chain.transaction_receipt(hash).await {
            Ok(Some(receipt)) => {
                debug!("Transaction {} confirmed after {} poll(s)", hash, polls);
                return Ok(receipt);
            }
            Ok(None) => {}
            Err(e) => warn!("Receipt poll {} for {} failed: {}", polls, hash, e),
        }
        tokio::time::sleep(poll_interval).await;
    }
}
