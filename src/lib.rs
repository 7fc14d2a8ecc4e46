//! StableYield - yield-aware fee tier and routing simulator
//!
//! Mirrors the StableYield Uniswap v4 hook off-chain: an APY reading picks
//! the pool's fee tier, and a staged simulation shows what a swap would do
//! to fees and Morpho routing.

pub mod config;
pub mod error;
pub mod executor;
pub mod hook;
pub mod oracle;
pub mod pool;
pub mod session;
pub mod simulator;

pub use config::{Config, ExecutionMode};
pub use error::{Result, SimulationError};
pub use hook::{compute_fees, decide, FeeBreakdown, FeeTier, FeeTierDecision, YieldRate};
pub use pool::{PoolPair, SwapDirection, SwapRequest};
pub use session::{PoolStatus, SwapSession};
pub use simulator::{
    SimulationEvent, SimulationRun, SimulationTrace, Stage, YieldRoutingSimulator,
};
