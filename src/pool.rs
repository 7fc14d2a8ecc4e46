//! Pool Model - Token pair, swap requests and V4 swap payloads
//!
//! The simulator never talks to the PoolManager, but the non-simulated path
//! hands a fully built `swap(key, params, hookData)` payload to the
//! submission collaborator. Everything here is pure data.

use alloy_primitives::aliases::{I24, U160, U24};
use alloy_primitives::utils::parse_ether;
use alloy_primitives::{address, Address, Bytes, I256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::Config;
use crate::error::{Result, SimulationError};
use crate::hook::BASE_FEE_TIER;

// ============================================
// POOL MANAGER INTERFACE
// ============================================

sol! {
    #[sol(all_derives)]
    interface IPoolManager {
        struct PoolKey {
            address currency0;
            address currency1;
            uint24 fee;
            int24 tickSpacing;
            address hooks;
        }

        struct SwapParams {
            bool zeroForOne;
            int256 amountSpecified;
            uint160 sqrtPriceLimitX96;
        }

        function swap(PoolKey memory key, SwapParams memory params, bytes calldata hookData)
            external returns (int256 delta);
    }
}

pub use IPoolManager::{PoolKey, SwapParams};

// ============================================
// CONSTANTS
// ============================================

/// Sepolia USDC
pub const SEPOLIA_USDC: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");

/// Sepolia USDT
pub const SEPOLIA_USDT: Address = address!("aA8E23Fb1079EA71e0a56F48a2aA51851D8433D0");

/// Tick spacing paired with the 0.3% tier
pub const DEFAULT_TICK_SPACING: i32 = 60;

/// Highest static LP fee the PoolManager accepts (100%)
pub const MAX_LP_FEE: u32 = 1_000_000;

/// `fee` value marking a pool whose fee is set by its hook
pub const DYNAMIC_FEE_FLAG: u32 = 0x800000;

// ============================================
// TYPES
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
}

impl Token {
    pub fn new(symbol: impl Into<String>, address: Address) -> Self {
        Self {
            symbol: symbol.into(),
            address,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// Token A -> Token B
    AtoB,
    /// Token B -> Token A
    BtoA,
}

impl std::fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapDirection::AtoB => write!(f, "A → B"),
            SwapDirection::BtoA => write!(f, "B → A"),
        }
    }
}

/// A caller's swap intent, validated on construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapRequest {
    amount: f64,
    direction: SwapDirection,
}

impl SwapRequest {
    pub fn new(amount: f64, direction: SwapDirection) -> Result<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(SimulationError::InvalidAmount(format!(
                "amount must be a positive number, got {}",
                amount
            )));
        }
        Ok(Self { amount, direction })
    }

    /// Parse a user-entered amount; empty input counts as missing
    pub fn parse(input: &str, direction: SwapDirection) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SimulationError::InvalidAmount("amount is required".to_string()));
        }
        let amount = f64::from_str(trimmed).map_err(|_| {
            SimulationError::InvalidAmount(format!("'{}' is not a number", trimmed))
        })?;
        Self::new(amount, direction)
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn direction(&self) -> SwapDirection {
        self.direction
    }
}

/// A swap ready for the PoolManager
#[derive(Debug, Clone)]
pub struct SwapSubmission {
    pub pool_key: PoolKey,
    pub params: SwapParams,
    pub calldata: Bytes,
}

// ============================================
// POOL PAIR
// ============================================

/// The hooked pool the demo swaps through
#[derive(Debug, Clone)]
pub struct PoolPair {
    pub token_a: Token,
    pub token_b: Token,
    pub tick_spacing: i32,
    /// Fee the pool was initialized with; part of the pool id
    pub pool_fee: u32,
    pub hook: Address,
    pub pool_manager: Address,
}

impl Default for PoolPair {
    fn default() -> Self {
        Self {
            token_a: Token::new("USDC", SEPOLIA_USDC),
            token_b: Token::new("USDT", SEPOLIA_USDT),
            tick_spacing: DEFAULT_TICK_SPACING,
            pool_fee: BASE_FEE_TIER,
            hook: Address::ZERO,
            pool_manager: Address::ZERO,
        }
    }
}

impl PoolPair {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        Ok(Self {
            token_a: Token::new(
                config.token_a_symbol.clone(),
                Address::from_str(&config.token_a_address)?,
            ),
            token_b: Token::new(
                config.token_b_symbol.clone(),
                Address::from_str(&config.token_b_address)?,
            ),
            tick_spacing: config.tick_spacing,
            pool_fee: config.pool_fee,
            hook: Address::from_str(&config.hook_address)?,
            pool_manager: Address::from_str(&config.pool_manager_address)?,
        })
    }

    /// (input, output) tokens for a direction
    pub fn route(&self, direction: SwapDirection) -> (&Token, &Token) {
        match direction {
            SwapDirection::AtoB => (&self.token_a, &self.token_b),
            SwapDirection::BtoA => (&self.token_b, &self.token_a),
        }
    }

    /// Human-readable route, e.g. "USDC → USDT"
    pub fn describe(&self, direction: SwapDirection) -> String {
        let (token_in, token_out) = self.route(direction);
        format!("{} → {}", token_in.symbol, token_out.symbol)
    }

    /// Pool key with currencies in V4 order (lower address first).
    /// The key identifies one pool, so it never depends on the APY tier.
    pub fn pool_key(&self) -> Result<PoolKey> {
        let (currency0, currency1) = if self.token_a.address < self.token_b.address {
            (self.token_a.address, self.token_b.address)
        } else {
            (self.token_b.address, self.token_a.address)
        };

        let tick_spacing = I24::try_from(self.tick_spacing).map_err(|_| {
            SimulationError::Encoding(format!("tick spacing {} out of range", self.tick_spacing))
        })?;

        Ok(PoolKey {
            currency0,
            currency1,
            fee: U24::from(self.pool_fee),
            tickSpacing: tick_spacing,
            hooks: self.hook,
        })
    }

    /// Build the exact-input swap for a request
    pub fn swap_submission(&self, request: &SwapRequest) -> Result<SwapSubmission> {
        let pool_key = self.pool_key()?;
        let (token_in, _) = self.route(request.direction());

        let amount_wei = parse_ether(&format!("{:.18}", request.amount()))
            .map_err(|e| SimulationError::Encoding(format!("amount: {}", e)))?;
        if amount_wei.is_zero() {
            return Err(SimulationError::InvalidAmount(format!(
                "{} rounds to zero at 18 decimals",
                request.amount()
            )));
        }
        let amount = I256::try_from(amount_wei)
            .map_err(|e| SimulationError::Encoding(format!("amount: {}", e)))?;

        let params = SwapParams {
            zeroForOne: token_in.address == pool_key.currency0,
            // Always exact input, in both directions (negative = exact in)
            amountSpecified: -amount,
            sqrtPriceLimitX96: U160::ZERO,
        };

        let calldata = IPoolManager::swapCall {
            key: pool_key.clone(),
            params: params.clone(),
            hookData: Bytes::new(),
        }
        .abi_encode();

        Ok(SwapSubmission {
            pool_key,
            params,
            calldata: calldata.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::DYNAMIC_FEE_TIER;

    #[test]
    fn test_parse_amount() {
        let req = SwapRequest::parse(" 100 ", SwapDirection::AtoB).unwrap();
        assert_eq!(req.amount(), 100.0);

        assert!(matches!(
            SwapRequest::parse("", SwapDirection::AtoB),
            Err(SimulationError::InvalidAmount(_))
        ));
        assert!(SwapRequest::parse("abc", SwapDirection::AtoB).is_err());
        assert!(SwapRequest::parse("0", SwapDirection::BtoA).is_err());
        assert!(SwapRequest::parse("-5", SwapDirection::BtoA).is_err());
    }

    #[test]
    fn test_pool_key_ordering_and_fee() {
        let pair = PoolPair::default();
        let key = pair.pool_key().unwrap();

        assert!(key.currency0 < key.currency1);
        assert_eq!(key.currency0, SEPOLIA_USDC);
        assert_eq!(key.fee, U24::from(BASE_FEE_TIER));
    }

    #[test]
    fn test_pool_key_is_stable() {
        let pair = PoolPair::default();
        let low = SwapRequest::new(1.0, SwapDirection::AtoB).unwrap();
        let high = SwapRequest::new(250.0, SwapDirection::BtoA).unwrap();

        let a = pair.swap_submission(&low).unwrap();
        let b = pair.swap_submission(&high).unwrap();
        assert_eq!(a.pool_key, b.pool_key);
        assert_ne!(a.pool_key.fee, U24::from(DYNAMIC_FEE_TIER));

        let flagged = PoolPair {
            pool_fee: DYNAMIC_FEE_FLAG,
            ..PoolPair::default()
        };
        assert_eq!(flagged.pool_key().unwrap().fee, U24::from(DYNAMIC_FEE_FLAG));
    }

    #[test]
    fn test_dust_amount_rejected() {
        let pair = PoolPair::default();
        let dust = SwapRequest::new(1e-20, SwapDirection::AtoB).unwrap();

        assert!(matches!(
            pair.swap_submission(&dust),
            Err(SimulationError::InvalidAmount(_))
        ));

        let one_wei = SwapRequest::new(1e-18, SwapDirection::AtoB).unwrap();
        let sub = pair.swap_submission(&one_wei).unwrap();
        assert_eq!(sub.params.amountSpecified, I256::MINUS_ONE);
    }

    #[test]
    fn test_swap_direction_sets_zero_for_one() {
        let pair = PoolPair::default();

        let a_to_b = SwapRequest::new(1.0, SwapDirection::AtoB).unwrap();
        let sub = pair.swap_submission(&a_to_b).unwrap();
        assert!(sub.params.zeroForOne);
        assert!(sub.params.amountSpecified.is_negative());

        let b_to_a = SwapRequest::new(1.0, SwapDirection::BtoA).unwrap();
        let sub = pair.swap_submission(&b_to_a).unwrap();
        assert!(!sub.params.zeroForOne);
        assert!(sub.params.amountSpecified.is_negative());
    }

    #[test]
    fn test_calldata_selector() {
        let pair = PoolPair::default();
        let req = SwapRequest::new(100.0, SwapDirection::AtoB).unwrap();
        let sub = pair.swap_submission(&req).unwrap();

        assert_eq!(&sub.calldata[..4], &IPoolManager::swapCall::SELECTOR[..]);
    }

    #[test]
    fn test_describe_route() {
        let pair = PoolPair::default();
        assert_eq!(pair.describe(SwapDirection::AtoB), "USDC → USDT");
        assert_eq!(pair.describe(SwapDirection::BtoA), "USDT → USDC");
    }
}
