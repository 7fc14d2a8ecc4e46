//! The StableYield Hook
//!
//! Off-chain mirror of the hook's decision rule:
//! - APY above the threshold switches the pool to the dynamic fee tier
//! - The dynamic tier routes half of the collected fees to Morpho

mod fee_tier;

pub use fee_tier::{
    compute_fees, decide, format_yield_rate, routing_status, FeeBreakdown, FeeTier,
    FeeTierDecision, YieldRate, BASE_FEE_TIER, DYNAMIC_FEE_TIER, MIN_APY_THRESHOLD,
    ROUTED_FEE_SHARE,
};
