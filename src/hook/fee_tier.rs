//! Fee Tier Decision
//!
//! The hook charges the base tier (0.3%) until the lending APY clears
//! the threshold. Above it the pool switches to the dynamic tier (0.5%)
//! and half of every fee is routed to Morpho.
//!
//! The threshold is strict: exactly 4.00% stays on the base tier.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

// ============================================
// HOOK CONSTANTS
// ============================================

/// APY (in percent) that must be exceeded to activate yield routing
pub const MIN_APY_THRESHOLD: f64 = 4.0;

/// Base fee tier in hundredths of a basis point (0.3%)
pub const BASE_FEE_TIER: u32 = 3000;

/// Dynamic fee tier in hundredths of a basis point (0.5%)
pub const DYNAMIC_FEE_TIER: u32 = 5000;

/// Share of collected fees routed to the lending venue
pub const ROUTED_FEE_SHARE: f64 = 0.5;

// ============================================
// YIELD RATE
// ============================================

/// Annualized yield rate in percent (5.0 = 5%)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct YieldRate(f64);

impl YieldRate {
    pub const ZERO: YieldRate = YieldRate(0.0);

    pub fn new(percent: f64) -> Result<Self> {
        if !percent.is_finite() || percent < 0.0 {
            return Err(SimulationError::InvalidYieldRate(percent));
        }
        Ok(Self(percent))
    }

    /// Raw, unrounded percentage
    pub fn percent(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for YieldRate {
    type Error = SimulationError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<YieldRate> for f64 {
    fn from(rate: YieldRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for YieldRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", format_yield_rate(*self))
    }
}

/// Two-decimal display of a rate. Never feed this back into `decide`.
pub fn format_yield_rate(rate: YieldRate) -> String {
    format!("{:.2}", rate.0)
}

// ============================================
// FEE TIER
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeTier {
    Base,
    Dynamic,
}

impl FeeTier {
    /// Fee as a percentage of the swap amount
    pub fn fee_percent(&self) -> f64 {
        self.hook_fee() as f64 / 10_000.0
    }

    /// Fee as encoded in the pool key (uint24, hundredths of a bip)
    pub fn hook_fee(&self) -> u32 {
        match self {
            FeeTier::Base => BASE_FEE_TIER,
            FeeTier::Dynamic => DYNAMIC_FEE_TIER,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeeTier::Base => "0.3% (Base)",
            FeeTier::Dynamic => "0.5% (Dynamic)",
        }
    }
}

impl std::fmt::Display for FeeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Outcome of the threshold rule for one yield reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeTierDecision {
    pub tier: FeeTier,
    /// The yield rate the decision was taken from
    pub rate_percent: f64,
    pub fee_percent: f64,
    pub routing_active: bool,
}

/// Map a yield rate to a fee tier and routing decision
pub fn decide(yield_rate: YieldRate) -> FeeTierDecision {
    let routing_active = yield_rate.percent() > MIN_APY_THRESHOLD;
    let tier = if routing_active {
        FeeTier::Dynamic
    } else {
        FeeTier::Base
    };

    FeeTierDecision {
        tier,
        rate_percent: yield_rate.percent(),
        fee_percent: tier.fee_percent(),
        routing_active,
    }
}

pub fn routing_status(decision: &FeeTierDecision) -> &'static str {
    if decision.routing_active {
        "Active - 50% fees routed to Morpho"
    } else {
        "Inactive - APY below 4% threshold"
    }
}

// ============================================
// FEE BREAKDOWN
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub fee_amount: f64,
    /// Portion deposited to Morpho, `None` when routing is inactive
    pub routed_amount: Option<f64>,
}

impl FeeBreakdown {
    /// Fees left in the pool for LPs
    pub fn retained_amount(&self) -> f64 {
        self.fee_amount - self.routed_amount.unwrap_or(0.0)
    }
}

pub fn compute_fees(amount: f64, decision: &FeeTierDecision) -> Result<FeeBreakdown> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(SimulationError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    let fee_amount = amount * decision.fee_percent / 100.0;
    let routed_amount = decision
        .routing_active
        .then(|| fee_amount * ROUTED_FEE_SHARE);

    Ok(FeeBreakdown {
        fee_amount,
        routed_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(v: f64) -> YieldRate {
        YieldRate::new(v).unwrap()
    }

    #[test]
    fn test_threshold_is_strict() {
        let at = decide(rate(4.0));
        assert!(!at.routing_active);
        assert_eq!(at.tier, FeeTier::Base);

        let above = decide(rate(4.0001));
        assert!(above.routing_active);
        assert_eq!(above.tier, FeeTier::Dynamic);
    }

    #[test]
    fn test_tier_tracks_routing_across_range() {
        for step in 0..=100 {
            let r = step as f64 / 10.0;
            let decision = decide(rate(r));
            assert_eq!(decision.routing_active, r > 4.0, "rate {}", r);
            assert_eq!(decision.tier == FeeTier::Dynamic, decision.routing_active);
            assert_eq!(decision.rate_percent, r);
        }
    }

    #[test]
    fn test_decide_is_idempotent() {
        assert_eq!(decide(rate(5.25)), decide(rate(5.25)));
        assert_eq!(decide(rate(0.0)), decide(rate(0.0)));
    }

    #[test]
    fn test_rejects_negative_and_nan_rates() {
        assert!(YieldRate::new(-0.1).is_err());
        assert!(YieldRate::new(f64::NAN).is_err());
        assert!(YieldRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display_rounding_does_not_affect_decision() {
        let r = rate(4.004);
        assert_eq!(format_yield_rate(r), "4.00");
        assert!(decide(r).routing_active);
    }

    #[test]
    fn test_fee_amounts() {
        let dynamic = compute_fees(100.0, &decide(rate(5.0))).unwrap();
        assert!((dynamic.fee_amount - 0.5).abs() < 1e-12);
        assert!((dynamic.routed_amount.unwrap() - 0.25).abs() < 1e-12);
        assert!((dynamic.retained_amount() - 0.25).abs() < 1e-12);

        let base = compute_fees(50.0, &decide(rate(4.0))).unwrap();
        assert!((base.fee_amount - 0.15).abs() < 1e-12);
        assert_eq!(base.routed_amount, None);
    }

    #[test]
    fn test_fee_rejects_non_positive_amount() {
        let decision = decide(rate(3.0));
        assert!(matches!(
            compute_fees(0.0, &decision),
            Err(SimulationError::InvalidAmount(_))
        ));
        assert!(compute_fees(-1.0, &decision).is_err());
        assert!(compute_fees(f64::NAN, &decision).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(FeeTier::Dynamic.label(), "0.5% (Dynamic)");
        assert_eq!(routing_status(&decide(rate(3.0))), "Inactive - APY below 4% threshold");
        assert_eq!(FeeTier::Base.hook_fee(), 3000);
        assert!((FeeTier::Dynamic.fee_percent() - 0.5).abs() < 1e-12);
    }
}
