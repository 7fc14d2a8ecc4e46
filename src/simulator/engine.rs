//! Yield Routing Simulator
//!
//! Fabricates the event trail of a swap through the StableYield hook:
//!
//! 1. Start notice
//! 2. Oracle query -> APY reading
//! 3. Fee tier decision
//! 4. Swap execution -> success
//! 5. Fee amount
//! 6. Routing to Morpho (or a single "inactive" notice)
//! 7. Yield compounding check
//! 8. Completion with a synthetic tx hash
//!
//! A run is a lazy stream: each `next_event` call advances one step and
//! suspends through the injected `Scheduler` where the real flow would wait
//! on the network. Only one run may be in flight per simulator.

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::events::{EventSink, Severity, SimulationEvent, Stage};
use super::scheduler::Scheduler;
use crate::config::Config;
use crate::error::{Result, SimulationError};
use crate::hook::{
    compute_fees, decide, FeeBreakdown, FeeTierDecision, YieldRate, MIN_APY_THRESHOLD,
};
use crate::oracle::YieldOracle;
use crate::pool::{PoolPair, SwapRequest};

// ============================================
// TIMING
// ============================================

/// Artificial latency at each suspension point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDelays {
    pub oracle: Duration,
    pub swap: Duration,
    pub routing: Duration,
    pub compounding: Duration,
}

impl StageDelays {
    pub fn zero() -> Self {
        Self {
            oracle: Duration::ZERO,
            swap: Duration::ZERO,
            routing: Duration::ZERO,
            compounding: Duration::ZERO,
        }
    }
}

impl Default for StageDelays {
    fn default() -> Self {
        Self {
            oracle: Duration::from_millis(500),
            swap: Duration::from_millis(1000),
            routing: Duration::from_millis(800),
            compounding: Duration::from_millis(500),
        }
    }
}

/// Checked at every suspension point
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Clears the simulator's running flag when the run ends or is dropped
#[derive(Debug)]
struct RunningGuard(Arc<AtomicBool>);

impl RunningGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SimulationError::SimulationInProgress)?;
        Ok(Self(flag.clone()))
    }

    fn release(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================
// RESULTS
// ============================================

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub request: SwapRequest,
    pub decision: FeeTierDecision,
    pub fees: FeeBreakdown,
    pub tx_hash: B256,
}

/// Every event of one run, plus the outcome if it completed
#[derive(Debug, Clone)]
pub struct SimulationTrace {
    pub events: Vec<SimulationEvent>,
    pub outcome: Option<RunOutcome>,
}

impl SimulationTrace {
    pub fn terminal(&self) -> Option<&SimulationEvent> {
        self.events.last().filter(|e| e.is_terminal())
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_some()
    }
}

/// `0x` + 64 lowercase hex chars
pub fn format_tx_hash(hash: &B256) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

// ============================================
// SIMULATOR
// ============================================

enum RateSource {
    Fixed(YieldRate),
    Oracle(Arc<dyn YieldOracle>),
}

pub struct YieldRoutingSimulator {
    pair: PoolPair,
    delays: StageDelays,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn EventSink>,
    rng: StdRng,
    running: Arc<AtomicBool>,
}

impl YieldRoutingSimulator {
    pub fn new(pair: PoolPair, scheduler: Arc<dyn Scheduler>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            pair,
            delays: StageDelays::default(),
            scheduler,
            sink,
            rng: StdRng::from_entropy(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_config(
        config: &Config,
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn EventSink>,
    ) -> eyre::Result<Self> {
        let mut simulator = Self::new(PoolPair::from_config(config)?, scheduler, sink)
            .with_delays(config.stage_delays());
        if let Some(seed) = config.rng_seed {
            simulator = simulator.with_seed(seed);
        }
        Ok(simulator)
    }

    pub fn with_delays(mut self, delays: StageDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Reproducible transaction ids
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn pair(&self) -> &PoolPair {
        &self.pair
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a run against a known yield rate
    pub fn run(&mut self, request: SwapRequest, current_yield_rate: YieldRate) -> Result<SimulationRun> {
        self.start(request, RateSource::Fixed(current_yield_rate))
    }

    /// Start a run that queries `oracle` during the oracle stage
    pub fn run_with_oracle(
        &mut self,
        request: SwapRequest,
        oracle: Arc<dyn YieldOracle>,
    ) -> Result<SimulationRun> {
        self.start(request, RateSource::Oracle(oracle))
    }

    fn start(&mut self, request: SwapRequest, rate_source: RateSource) -> Result<SimulationRun> {
        // Reject before anything is emitted
        SwapRequest::new(request.amount(), request.direction())?;
        let guard = RunningGuard::acquire(&self.running)?;

        debug!("Starting simulation run: {:?}", request);

        Ok(SimulationRun {
            request,
            pair: self.pair.clone(),
            delays: self.delays,
            scheduler: self.scheduler.clone(),
            sink: self.sink.clone(),
            rng: StdRng::seed_from_u64(self.rng.gen()),
            rate_source,
            cancel: CancelToken::default(),
            step: Step::Start,
            rate: None,
            decision: None,
            fees: None,
            outcome: None,
            last_timestamp: None,
            guard,
        })
    }
}

// ============================================
// RUN
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    OracleQuery,
    OracleResult,
    Decision,
    SwapNotice,
    SwapResult,
    Fees,
    RoutingNotice,
    RoutingResult,
    RoutingCompound,
    RoutingInactive,
    CompoundingNotice,
    CompoundingResult,
    Complete,
    Done,
}

impl Step {
    fn stage(&self) -> Stage {
        match self {
            Step::Start => Stage::Start,
            Step::OracleQuery | Step::OracleResult => Stage::Oracle,
            Step::Decision => Stage::FeeTier,
            Step::SwapNotice | Step::SwapResult => Stage::Swap,
            Step::Fees => Stage::Fees,
            Step::RoutingNotice
            | Step::RoutingResult
            | Step::RoutingCompound
            | Step::RoutingInactive => Stage::Routing,
            Step::CompoundingNotice | Step::CompoundingResult => Stage::Compounding,
            Step::Complete | Step::Done => Stage::Complete,
        }
    }
}

/// One in-flight simulation. Finite, not restartable.
pub struct SimulationRun {
    request: SwapRequest,
    pair: PoolPair,
    delays: StageDelays,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn EventSink>,
    rng: StdRng,
    rate_source: RateSource,
    cancel: CancelToken,
    step: Step,
    rate: Option<YieldRate>,
    decision: Option<FeeTierDecision>,
    fees: Option<FeeBreakdown>,
    outcome: Option<RunOutcome>,
    last_timestamp: Option<DateTime<Utc>>,
    guard: RunningGuard,
}

impl SimulationRun {
    pub fn request(&self) -> &SwapRequest {
        &self.request
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.step == Step::Done
    }

    /// Available once the completion event has been produced
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Advance one step; `None` once the terminal event has been produced
    pub async fn next_event(&mut self) -> Option<SimulationEvent> {
        if self.step == Step::Done {
            return None;
        }

        let stage = self.step.stage();
        let event = match self.advance().await {
            Ok(event) => event,
            Err(err) => {
                let message = match err {
                    SimulationError::StageFailure { message, .. } => message,
                    other => other.to_string(),
                };
                self.event(stage, Severity::Error, message)
            }
        };

        if event.is_terminal() {
            self.step = Step::Done;
            self.guard.release();
        }

        self.sink.record(&event);
        Some(event)
    }

    /// Drive the run to its terminal event
    pub async fn collect(mut self) -> SimulationTrace {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        SimulationTrace {
            events,
            outcome: self.outcome.take(),
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = SimulationEvent> + Send {
        stream::unfold(self, |mut run| async move {
            let event = run.next_event().await?;
            Some((event, run))
        })
    }

    async fn advance(&mut self) -> Result<SimulationEvent> {
        let request = self.request;
        let (token_in, _) = self.pair.route(request.direction());
        let symbol = token_in.symbol.clone();

        let event = match self.step {
            Step::Start => {
                self.step = Step::OracleQuery;
                self.event(
                    Stage::Start,
                    Severity::Info,
                    format!(
                        "Starting swap simulation: {} {} ({})",
                        request.amount(),
                        symbol,
                        self.pair.describe(request.direction())
                    ),
                )
            }

            Step::OracleQuery => {
                self.step = Step::OracleResult;
                self.event(Stage::Oracle, Severity::Info, "Querying AVS oracle for current APY...")
            }

            Step::OracleResult => {
                self.suspend(Stage::Oracle, self.delays.oracle).await?;
                let rate = match &self.rate_source {
                    RateSource::Fixed(rate) => *rate,
                    RateSource::Oracle(oracle) => oracle.current_yield_rate().await.map_err(|e| {
                        SimulationError::StageFailure {
                            stage: Stage::Oracle,
                            message: format!("Oracle query failed: {}", e),
                        }
                    })?,
                };
                self.rate = Some(rate);
                self.step = Step::Decision;
                self.event(Stage::Oracle, Severity::Success, format!("Oracle APY: {}", rate))
            }

            Step::Decision => {
                let rate = self.current_rate()?;
                let decision = decide(rate);
                self.decision = Some(decision);
                self.step = Step::SwapNotice;

                let comparison = if decision.routing_active { "above" } else { "at or below" };
                self.event(
                    Stage::FeeTier,
                    Severity::Info,
                    format!(
                        "Fee tier: {} - APY {} {} {:.0}% threshold",
                        decision.tier.label(),
                        rate,
                        comparison,
                        MIN_APY_THRESHOLD
                    ),
                )
            }

            Step::SwapNotice => {
                let decision = self.current_decision()?;
                self.step = Step::SwapResult;
                self.event(
                    Stage::Swap,
                    Severity::Info,
                    format!(
                        "Executing swap through PoolManager with {} fee...",
                        decision.tier.label()
                    ),
                )
            }

            Step::SwapResult => {
                self.suspend(Stage::Swap, self.delays.swap).await?;
                self.step = Step::Fees;
                self.event(
                    Stage::Swap,
                    Severity::Success,
                    format!(
                        "Swap executed: {} {} ({})",
                        request.amount(),
                        symbol,
                        self.pair.describe(request.direction())
                    ),
                )
            }

            Step::Fees => {
                let decision = self.current_decision()?;
                let fees = compute_fees(request.amount(), &decision)?;
                self.fees = Some(fees);
                self.step = if decision.routing_active {
                    Step::RoutingNotice
                } else {
                    Step::RoutingInactive
                };
                self.event(
                    Stage::Fees,
                    Severity::Info,
                    format!(
                        "Fee collected: {:.6} {} ({}%)",
                        fees.fee_amount, symbol, decision.fee_percent
                    ),
                )
            }

            Step::RoutingNotice => {
                let routed = self.routed_amount()?;
                self.step = Step::RoutingResult;
                self.event(
                    Stage::Routing,
                    Severity::Info,
                    format!("Routing {:.6} {} (50% of fees) to Morpho...", routed, symbol),
                )
            }

            Step::RoutingResult => {
                self.suspend(Stage::Routing, self.delays.routing).await?;
                let routed = self.routed_amount()?;
                self.step = Step::RoutingCompound;
                self.event(
                    Stage::Routing,
                    Severity::Success,
                    format!("Deposited {:.6} {} into Morpho vault", routed, symbol),
                )
            }

            Step::RoutingCompound => {
                self.step = Step::CompoundingNotice;
                self.event(
                    Stage::Routing,
                    Severity::Info,
                    "Morpho yield will compound back into the pool",
                )
            }

            Step::RoutingInactive => {
                let rate = self.current_rate()?;
                self.step = Step::CompoundingNotice;
                self.event(
                    Stage::Routing,
                    Severity::Info,
                    format!(
                        "Yield routing inactive - APY {} at or below {:.0}% threshold",
                        rate, MIN_APY_THRESHOLD
                    ),
                )
            }

            Step::CompoundingNotice => {
                self.step = Step::CompoundingResult;
                self.event(Stage::Compounding, Severity::Info, "Checking yield compounding...")
            }

            Step::CompoundingResult => {
                self.suspend(Stage::Compounding, self.delays.compounding).await?;
                self.step = Step::Complete;
                self.event(Stage::Compounding, Severity::Success, "Yield compounding check complete")
            }

            Step::Complete => {
                let decision = self.current_decision()?;
                let fees = self.fees.ok_or_else(|| missing(Stage::Complete, "fee breakdown"))?;
                let tx_hash = B256::from(self.rng.gen::<[u8; 32]>());

                self.outcome = Some(RunOutcome {
                    request,
                    decision,
                    fees,
                    tx_hash,
                });
                debug!("Simulated swap complete: {}", format_tx_hash(&tx_hash));

                self.event(
                    Stage::Complete,
                    Severity::Success,
                    format!("Swap completed! Tx: {}", format_tx_hash(&tx_hash)),
                )
            }

            Step::Done => return Err(missing(Stage::Complete, "next stage")),
        };

        Ok(event)
    }

    /// Suspension point; cancellation is observed on both sides of the wait
    async fn suspend(&self, stage: Stage, delay: Duration) -> Result<()> {
        self.check_cancelled(stage)?;
        self.scheduler.sleep(delay).await;
        self.check_cancelled(stage)
    }

    fn check_cancelled(&self, stage: Stage) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SimulationError::StageFailure {
                stage,
                message: "Simulation cancelled".to_string(),
            });
        }
        Ok(())
    }

    fn current_rate(&self) -> Result<YieldRate> {
        self.rate.ok_or_else(|| missing(self.step.stage(), "oracle reading"))
    }

    fn current_decision(&self) -> Result<FeeTierDecision> {
        self.decision.ok_or_else(|| missing(self.step.stage(), "fee tier decision"))
    }

    fn routed_amount(&self) -> Result<f64> {
        self.fees
            .and_then(|f| f.routed_amount)
            .ok_or_else(|| missing(Stage::Routing, "routed amount"))
    }

    /// Build an event with a non-decreasing timestamp
    fn event(&mut self, stage: Stage, severity: Severity, message: impl Into<String>) -> SimulationEvent {
        let now = self.scheduler.now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        SimulationEvent {
            timestamp,
            stage,
            severity,
            message: message.into(),
        }
    }
}

fn missing(stage: Stage, what: &str) -> SimulationError {
    SimulationError::StageFailure {
        stage,
        message: format!("{} unavailable", what),
    }
}
