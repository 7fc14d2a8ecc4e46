//! Swap Session
//!
//! Owns the state the demo front-end keeps between swaps: the current APY,
//! the connected wallet, and the simulator. The APY is never global; every
//! run and decision reads it from here.

use alloy_primitives::{Address, B256};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{Config, ExecutionMode};
use crate::error::{Result, SimulationError};
use crate::executor::{wait_for_confirmation, SwapSubmitter, TxStatus};
use crate::hook::{decide, format_yield_rate, routing_status, FeeTierDecision, YieldRate};
use crate::oracle::{ManualOracle, YieldOracle};
use crate::pool::{PoolKey, SwapRequest};
use crate::simulator::{EventSink, Scheduler, SimulationRun, YieldRoutingSimulator};

/// Interval between confirmation polls on the live path
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls before a live swap is reported as still pending
pub const MAX_CONFIRMATION_POLLS: u32 = 30;

/// The "Current APY Status" panel
#[derive(Debug, Clone, PartialEq)]
pub struct PoolStatus {
    pub apy: String,
    pub fee_tier: &'static str,
    pub routing: &'static str,
    pub routing_active: bool,
}

/// A swap handed to the submission collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedSwap {
    pub tx_hash: B256,
    pub status: TxStatus,
    pub decision: FeeTierDecision,
    pub pool_key: PoolKey,
}

pub struct SwapSession {
    mode: ExecutionMode,
    manual: ManualOracle,
    yield_rate: YieldRate,
    wallet: Option<Address>,
    simulator: YieldRoutingSimulator,
    scheduler: Arc<dyn Scheduler>,
}

impl SwapSession {
    pub fn new(
        mode: ExecutionMode,
        simulator: YieldRoutingSimulator,
        scheduler: Arc<dyn Scheduler>,
        initial_apy: f64,
    ) -> Result<Self> {
        let manual = ManualOracle::new(initial_apy)?;
        let yield_rate = manual.get();

        Ok(Self {
            mode,
            manual,
            yield_rate,
            wallet: None,
            simulator,
            scheduler,
        })
    }

    pub fn from_config(
        config: &Config,
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn EventSink>,
    ) -> eyre::Result<Self> {
        let simulator = YieldRoutingSimulator::from_config(config, scheduler.clone(), sink)?;
        Ok(Self::new(
            config.execution_mode,
            simulator,
            scheduler,
            config.manual_apy,
        )?)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn yield_rate(&self) -> YieldRate {
        self.yield_rate
    }

    pub fn simulator(&self) -> &YieldRoutingSimulator {
        &self.simulator
    }

    pub fn status(&self) -> PoolStatus {
        let decision = decide(self.yield_rate);
        PoolStatus {
            apy: format_yield_rate(self.yield_rate),
            fee_tier: decision.tier.label(),
            routing: routing_status(&decision),
            routing_active: decision.routing_active,
        }
    }

    /// Operator override through the bounded control
    pub fn set_manual_rate(&mut self, percent: f64) -> Result<YieldRate> {
        self.yield_rate = self.manual.set(percent)?;
        Ok(self.yield_rate)
    }

    /// Replace the session APY from any oracle
    pub async fn refresh_rate(&mut self, oracle: &dyn YieldOracle) -> Result<YieldRate> {
        let rate = oracle.current_yield_rate().await?;
        info!("APY updated from {}: {}", oracle.source(), rate);
        self.yield_rate = rate;
        Ok(rate)
    }

    pub fn connect_wallet(&mut self, address: Address) {
        info!("Wallet connected: {:?}", address);
        self.wallet = Some(address);
    }

    pub fn disconnect_wallet(&mut self) {
        self.wallet = None;
    }

    pub fn wallet(&self) -> Option<Address> {
        self.wallet
    }

    /// Simulated path: start a run with the session APY
    pub fn simulate(&mut self, request: SwapRequest) -> Result<SimulationRun> {
        self.simulator.run(request, self.yield_rate)
    }

    /// Non-simulated path: needs a connected wallet
    pub async fn submit(
        &self,
        request: SwapRequest,
        submitter: &dyn SwapSubmitter,
    ) -> Result<SubmittedSwap> {
        if self.wallet.is_none() {
            return Err(SimulationError::NotConnected);
        }
        SwapRequest::new(request.amount(), request.direction())?;

        let decision = decide(self.yield_rate);
        let submission = self.simulator.pair().swap_submission(&request)?;

        let tx_hash = submitter.submit(&submission).await?;
        let status = wait_for_confirmation(
            submitter,
            tx_hash,
            self.scheduler.as_ref(),
            CONFIRMATION_POLL_INTERVAL,
            MAX_CONFIRMATION_POLLS,
        )
        .await?;

        Ok(SubmittedSwap {
            tx_hash,
            status,
            decision,
            pool_key: submission.pool_key,
        })
    }
}
