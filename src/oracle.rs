//! Yield Oracle - APY sources for the fee-tier decision
//!
//! The hook reads APY from an AVS oracle; the demo also lets the operator
//! override it with a bounded control (0-10%, step 0.1). Both sit behind
//! `YieldOracle` so the simulator never cares where the number came from.
//!
//! `CachedOracle` keeps the last good reading and serves it when the inner
//! source fails.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::error::{Result, SimulationError};
use crate::hook::YieldRate;

// ============================================
// CONSTANTS
// ============================================

/// Manual control bounds (percent)
pub const MANUAL_APY_MIN: f64 = 0.0;
pub const MANUAL_APY_MAX: f64 = 10.0;

/// Manual control step (percent)
pub const MANUAL_APY_STEP: f64 = 0.1;

/// Default manual APY (percent)
pub const DEFAULT_MANUAL_APY: f64 = 5.0;

/// `getAPY()` returns an 18-decimal fraction (0.05e18 = 5%)
const WAD: f64 = 1e18;

// ============================================
// ORACLE TRAIT
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleSource {
    /// Operator override
    Manual,
    /// Reading pushed from the AVS oracle contract
    AvsFeed,
    /// Last good reading, served after a failed refresh
    Fallback,
}

impl std::fmt::Display for OracleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleSource::Manual => write!(f, "Manual"),
            OracleSource::AvsFeed => write!(f, "AVS Oracle"),
            OracleSource::Fallback => write!(f, "Fallback"),
        }
    }
}

#[async_trait]
pub trait YieldOracle: Send + Sync {
    fn source(&self) -> OracleSource;

    async fn current_yield_rate(&self) -> Result<YieldRate>;
}

#[async_trait]
impl<O: YieldOracle + ?Sized> YieldOracle for Arc<O> {
    fn source(&self) -> OracleSource {
        (**self).source()
    }

    async fn current_yield_rate(&self) -> Result<YieldRate> {
        (**self).current_yield_rate().await
    }
}

/// Convert a raw `getAPY()` value (18-decimal fraction) into percent
pub fn yield_rate_from_wad(raw: U256) -> Result<YieldRate> {
    let fraction: f64 = raw.to_string().parse().map_err(|_| {
        SimulationError::Oracle(format!("unreadable oracle value {}", raw))
    })?;
    YieldRate::new(fraction / WAD * 100.0)
}

// ============================================
// MANUAL OVERRIDE
// ============================================

/// Operator-controlled APY, bounded and stepped like the UI slider
#[derive(Debug)]
pub struct ManualOracle {
    bits: AtomicU64,
}

impl ManualOracle {
    pub fn new(initial: f64) -> Result<Self> {
        let oracle = Self {
            bits: AtomicU64::new(0f64.to_bits()),
        };
        oracle.set(initial)?;
        Ok(oracle)
    }

    /// Set the override; clamps to the control range and snaps to 0.1
    pub fn set(&self, percent: f64) -> Result<YieldRate> {
        if percent.is_nan() {
            return Err(SimulationError::InvalidYieldRate(percent));
        }
        let clamped = percent.clamp(MANUAL_APY_MIN, MANUAL_APY_MAX);
        let snapped = (clamped / MANUAL_APY_STEP).round() * MANUAL_APY_STEP;
        let rate = YieldRate::new(snapped)?;

        self.bits.store(rate.percent().to_bits(), Ordering::SeqCst);
        debug!("Manual APY set to {}", rate);
        Ok(rate)
    }

    pub fn get(&self) -> YieldRate {
        let percent = f64::from_bits(self.bits.load(Ordering::SeqCst));
        YieldRate::new(percent).unwrap_or(YieldRate::ZERO)
    }
}

impl Default for ManualOracle {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(DEFAULT_MANUAL_APY.to_bits()),
        }
    }
}

#[async_trait]
impl YieldOracle for ManualOracle {
    fn source(&self) -> OracleSource {
        OracleSource::Manual
    }

    async fn current_yield_rate(&self) -> Result<YieldRate> {
        Ok(self.get())
    }
}

// ============================================
// AVS FEED
// ============================================

/// Holds the latest raw `getAPY()` reading handed in by whoever watches
/// the oracle contract
#[derive(Debug, Default)]
pub struct AvsFeedOracle {
    latest: RwLock<Option<U256>>,
}

impl AvsFeedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new raw reading; rejects values that don't map to a rate
    pub async fn push_raw(&self, raw: U256) -> Result<YieldRate> {
        let rate = yield_rate_from_wad(raw)?;
        *self.latest.write().await = Some(raw);
        trace!("AVS oracle reading: {} -> {}", raw, rate);
        Ok(rate)
    }
}

#[async_trait]
impl YieldOracle for AvsFeedOracle {
    fn source(&self) -> OracleSource {
        OracleSource::AvsFeed
    }

    async fn current_yield_rate(&self) -> Result<YieldRate> {
        let latest = *self.latest.read().await;
        let raw = latest
            .ok_or_else(|| SimulationError::Oracle("no AVS oracle reading yet".to_string()))?;
        yield_rate_from_wad(raw)
    }
}

// ============================================
// CACHED ORACLE
// ============================================

#[derive(Debug, Clone, Copy)]
pub struct YieldReading {
    pub rate: YieldRate,
    pub source: OracleSource,
    pub fetched_at: Instant,
}

impl YieldReading {
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

pub struct CachedOracle<O> {
    inner: O,
    ttl: Duration,
    cache: RwLock<Option<YieldReading>>,
}

impl<O: YieldOracle> CachedOracle<O> {
    pub fn new(inner: O, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current reading (with caching)
    pub async fn reading(&self) -> Result<YieldReading> {
        // Check cache first
        {
            let cache = self.cache.read().await;
            if let Some(ref reading) = *cache {
                if !reading.is_stale(self.ttl) {
                    trace!("Using cached APY: {}", reading.rate);
                    return Ok(*reading);
                }
            }
        }

        match self.inner.current_yield_rate().await {
            Ok(rate) => {
                let reading = YieldReading {
                    rate,
                    source: self.inner.source(),
                    fetched_at: Instant::now(),
                };
                *self.cache.write().await = Some(reading);
                debug!("APY from {}: {}", reading.source, rate);
                Ok(reading)
            }
            Err(e) => {
                let cache = self.cache.read().await;
                match *cache {
                    Some(last) => {
                        warn!(
                            "{} refresh failed ({}), serving last reading {}",
                            self.inner.source(),
                            e,
                            last.rate
                        );
                        Ok(YieldReading {
                            source: OracleSource::Fallback,
                            ..last
                        })
                    }
                    None => Err(e),
                }
            }
        }
    }
}

#[async_trait]
impl<O: YieldOracle> YieldOracle for CachedOracle<O> {
    fn source(&self) -> OracleSource {
        self.inner.source()
    }

    async fn current_yield_rate(&self) -> Result<YieldRate> {
        Ok(self.reading().await?.rate)
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    /// Succeeds until told to fail
    struct FlakyOracle {
        rate: YieldRate,
        failing: AtomicBool,
    }

    #[async_trait]
    impl YieldOracle for FlakyOracle {
        fn source(&self) -> OracleSource {
            OracleSource::AvsFeed
        }

        async fn current_yield_rate(&self) -> Result<YieldRate> {
            if self.failing.load(Ordering::SeqCst) {
                Err(SimulationError::Oracle("rpc down".to_string()))
            } else {
                Ok(self.rate)
            }
        }
    }

    #[test]
    fn test_wad_conversion() {
        // 0.05e18 = 5%
        let raw = U256::from(50_000_000_000_000_000u128);
        let rate = yield_rate_from_wad(raw).unwrap();
        assert!((rate.percent() - 5.0).abs() < 1e-9);

        assert_eq!(yield_rate_from_wad(U256::ZERO).unwrap().percent(), 0.0);
    }

    #[test]
    fn test_manual_bounds_and_step() {
        let oracle = ManualOracle::default();
        assert_eq!(oracle.get().percent(), 5.0);

        assert_eq!(oracle.set(12.0).unwrap().percent(), 10.0);
        assert_eq!(oracle.set(-3.0).unwrap().percent(), 0.0);
        assert!((oracle.set(4.26).unwrap().percent() - 4.3).abs() < 1e-9);
        assert!(oracle.set(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_avs_feed_requires_reading() {
        let oracle = AvsFeedOracle::new();
        assert!(oracle.current_yield_rate().await.is_err());

        oracle.push_raw(U256::from(30_000_000_000_000_000u128)).await.unwrap();
        let rate = oracle.current_yield_rate().await.unwrap();
        assert!((rate.percent() - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cache_falls_back_to_last_reading() {
        let cached = CachedOracle::new(
            FlakyOracle {
                rate: YieldRate::new(6.0).unwrap(),
                failing: AtomicBool::new(false),
            },
            Duration::ZERO,
        );

        let first = cached.reading().await.unwrap();
        assert_eq!(first.source, OracleSource::AvsFeed);

        cached.inner.failing.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;

        let second = cached.reading().await.unwrap();
        assert_eq!(second.source, OracleSource::Fallback);
        assert_eq!(second.rate.percent(), 6.0);
    }

    #[tokio::test]
    async fn test_cache_serves_fresh_reading() {
        let cached = CachedOracle::new(
            FlakyOracle {
                rate: YieldRate::new(4.5).unwrap(),
                failing: AtomicBool::new(false),
            },
            Duration::from_secs(60),
        );

        let first = cached.reading().await.unwrap();
        cached.inner.failing.store(true, Ordering::SeqCst);

        // Inner oracle is down, but the reading is still within its TTL
        let second = cached.reading().await.unwrap();
        assert_eq!(second.source, OracleSource::AvsFeed);
        assert_eq!(second.fetched_at, first.fetched_at);
        assert_eq!(second.rate, first.rate);
    }

    #[tokio::test]
    async fn test_cache_propagates_first_failure() {
        let cached = CachedOracle::new(
            FlakyOracle {
                rate: YieldRate::ZERO,
                failing: AtomicBool::new(true),
            },
            Duration::from_secs(10),
        );
        assert!(cached.current_yield_rate().await.is_err());
    }
}
