//! Simulated Submitter
//!
//! Stands in for the wallet + PoolManager round trip. Ids come from a
//! seedable RNG; every tx stays pending for a fixed number of polls.

use alloy_primitives::B256;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use super::{SwapSubmitter, TxStatus};
use crate::error::{Result, SimulationError};
use crate::pool::SwapSubmission;
use crate::simulator::format_tx_hash;

pub struct SimulatedSubmitter {
    rng: Mutex<StdRng>,
    polls: Mutex<HashMap<B256, u32>>,
    pending_polls: u32,
    fail: bool,
}

impl SimulatedSubmitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            polls: Mutex::new(HashMap::new()),
            pending_polls: 1,
            fail: false,
        }
    }

    /// Number of polls that report `Pending` before settling
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Settle every tx as `Failed`
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

fn poisoned<T>(_: T) -> SimulationError {
    SimulationError::Submission("submitter state poisoned".to_string())
}

#[async_trait]
impl SwapSubmitter for SimulatedSubmitter {
    async fn submit(&self, submission: &SwapSubmission) -> Result<B256> {
        if submission.calldata.is_empty() {
            return Err(SimulationError::Submission("empty calldata".to_string()));
        }

        let tx_hash = B256::from(self.rng.lock().map_err(poisoned)?.gen::<[u8; 32]>());
        self.polls.lock().map_err(poisoned)?.insert(tx_hash, 0);

        info!(
            "📋 Simulated submission {} ({} bytes calldata, zeroForOne={})",
            format_tx_hash(&tx_hash),
            submission.calldata.len(),
            submission.params.zeroForOne
        );

        Ok(tx_hash)
    }

    async fn status(&self, tx_hash: B256) -> Result<TxStatus> {
        let mut polls = self.polls.lock().map_err(poisoned)?;
        let seen = polls.get_mut(&tx_hash).ok_or_else(|| {
            SimulationError::Submission(format!("unknown transaction {}", format_tx_hash(&tx_hash)))
        })?;

        if *seen < self.pending_polls {
            *seen += 1;
            return Ok(TxStatus::Pending);
        }

        Ok(if self.fail {
            TxStatus::Failed
        } else {
            TxStatus::Confirmed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_transaction() {
        let submitter = SimulatedSubmitter::new(1);
        assert!(submitter.status(B256::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_seeded_ids_repeat() {
        use crate::pool::{PoolPair, SwapDirection, SwapRequest};

        let request = SwapRequest::new(5.0, SwapDirection::BtoA).unwrap();
        let submission = PoolPair::default().swap_submission(&request).unwrap();

        let a = SimulatedSubmitter::new(99).submit(&submission).await.unwrap();
        let b = SimulatedSubmitter::new(99).submit(&submission).await.unwrap();
        assert_eq!(a, b);
    }
}
