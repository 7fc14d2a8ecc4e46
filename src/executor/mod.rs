//! The Executor
//!
//! Transaction-submission side of the demo:
//! - `SwapSubmitter` is the seam a real wallet/RPC backend plugs into
//! - `SimulatedSubmitter` fabricates ids and confirmations locally
//! - `wait_for_confirmation` polls a submitter until the swap settles

mod simulated;

pub use simulated::SimulatedSubmitter;

use alloy_primitives::B256;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::pool::SwapSubmission;
use crate::simulator::Scheduler;

/// Confirmation status of a submitted swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStatus::Pending => write!(f, "PENDING"),
            TxStatus::Confirmed => write!(f, "CONFIRMED"),
            TxStatus::Failed => write!(f, "FAILED"),
        }
    }
}

#[async_trait]
pub trait SwapSubmitter: Send + Sync {
    /// Submit a swap, returning its transaction hash
    async fn submit(&self, submission: &SwapSubmission) -> Result<B256>;

    async fn status(&self, tx_hash: B256) -> Result<TxStatus>;
}

/// Poll until the swap is confirmed or failed.
/// Returns `Pending` when `max_polls` run out.
pub async fn wait_for_confirmation(
    submitter: &dyn SwapSubmitter,
    tx_hash: B256,
    scheduler: &dyn Scheduler,
    interval: Duration,
    max_polls: u32,
) -> Result<TxStatus> {
    for attempt in 1..=max_polls {
        let status = submitter.status(tx_hash).await?;
        debug!("Tx {} poll {}/{}: {}", tx_hash, attempt, max_polls, status);

        if status.is_terminal() {
            return Ok(status);
        }
        scheduler.sleep(interval).await;
    }

    warn!("Tx {} still pending after {} polls", tx_hash, max_polls);
    Ok(TxStatus::Pending)
}
