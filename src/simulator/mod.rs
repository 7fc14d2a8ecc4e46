//! The Simulator
//!
//! Responsible for:
//! - Deciding the fee tier for the current APY
//! - Emitting the staged event trail of a simulated swap
//! - Mirroring every event to the observability sinks

mod engine;
mod events;
mod scheduler;

pub use engine::{
    format_tx_hash, CancelToken, RunOutcome, SimulationRun, SimulationTrace, StageDelays,
    YieldRoutingSimulator,
};
pub use events::{
    EventSink, JsonlSink, MemorySink, MultiSink, Severity, SimulationEvent, Stage, TracingSink,
};
pub use scheduler::{Scheduler, TokioScheduler, VirtualScheduler};
