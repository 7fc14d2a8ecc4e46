//! Configuration for the StableYield simulator
//!
//! Parameters for running the hook demo in Simulation or Live mode.
//! Values come from the environment (with .env support) or a TOML file.

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;

use crate::hook::BASE_FEE_TIER;
use crate::pool::{DYNAMIC_FEE_FLAG, MAX_LP_FEE};
use crate::simulator::StageDelays;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ============================================
// EXECUTION MODE
// ============================================

/// Execution mode determines whether swaps are simulated or submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Simulation mode - every interaction is fabricated locally
    Simulation,

    /// Live mode - swaps go through a connected wallet and a submitter
    Live,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Simulation
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Simulation => write!(f, "SIMULATION"),
            ExecutionMode::Live => write!(f, "LIVE"),
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// Chain ID (11155111 = Sepolia)
    pub chain_id: u64,

    /// Current execution mode
    pub execution_mode: ExecutionMode,

    // ========== Contracts ==========
    pub pool_manager_address: String,
    pub hook_address: String,
    pub avs_oracle_address: String,

    // ========== Pool ==========
    pub token_a_symbol: String,
    pub token_a_address: String,
    pub token_b_symbol: String,
    pub token_b_address: String,
    pub tick_spacing: i32,
    /// Fee in the pool key (pips, or the dynamic-fee flag)
    pub pool_fee: u32,

    // ========== Oracle ==========
    /// Starting APY for the manual override (percent, 0-10)
    pub manual_apy: f64,

    /// How long an oracle reading stays fresh
    pub oracle_cache_secs: u64,

    // ========== Simulated Latency ==========
    pub oracle_delay_ms: u64,
    pub swap_delay_ms: u64,
    pub routing_delay_ms: u64,
    pub compounding_delay_ms: u64,

    // ========== Event Log ==========
    /// Append every simulation event to a JSONL file
    pub event_log: bool,
    pub event_log_path: String,

    /// Fixed seed for synthetic transaction ids (random if unset)
    pub rng_seed: Option<u64>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            chain_id: env_or("CHAIN_ID", defaults.chain_id),
            execution_mode: match env::var("EXECUTION_MODE")
                .unwrap_or_else(|_| "simulation".to_string())
                .to_lowercase()
                .as_str()
            {
                "live" | "production" => ExecutionMode::Live,
                _ => ExecutionMode::Simulation,
            },

            pool_manager_address: env::var("POOL_MANAGER_ADDRESS")
                .unwrap_or(defaults.pool_manager_address),
            hook_address: env::var("HOOK_ADDRESS").unwrap_or(defaults.hook_address),
            avs_oracle_address: env::var("AVS_ORACLE_ADDRESS")
                .unwrap_or(defaults.avs_oracle_address),

            token_a_symbol: env::var("TOKEN_A_SYMBOL").unwrap_or(defaults.token_a_symbol),
            token_a_address: env::var("TOKEN_A_ADDRESS").unwrap_or(defaults.token_a_address),
            token_b_symbol: env::var("TOKEN_B_SYMBOL").unwrap_or(defaults.token_b_symbol),
            token_b_address: env::var("TOKEN_B_ADDRESS").unwrap_or(defaults.token_b_address),
            tick_spacing: env_or("TICK_SPACING", defaults.tick_spacing),
            pool_fee: env_or("POOL_FEE", defaults.pool_fee),

            manual_apy: env_or("MANUAL_APY", defaults.manual_apy),
            oracle_cache_secs: env_or("ORACLE_CACHE_SECS", defaults.oracle_cache_secs),

            oracle_delay_ms: env_or("ORACLE_DELAY_MS", defaults.oracle_delay_ms),
            swap_delay_ms: env_or("SWAP_DELAY_MS", defaults.swap_delay_ms),
            routing_delay_ms: env_or("ROUTING_DELAY_MS", defaults.routing_delay_ms),
            compounding_delay_ms: env_or("COMPOUNDING_DELAY_MS", defaults.compounding_delay_ms),

            event_log: env_or("EVENT_LOG", defaults.event_log),
            event_log_path: env::var("EVENT_LOG_PATH").unwrap_or(defaults.event_log_path),
            rng_seed: env::var("RNG_SEED").ok().and_then(|s| s.parse().ok()),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration before starting a session
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=10.0).contains(&self.manual_apy) {
            return Err(eyre::eyre!(
                "MANUAL_APY must be between 0 and 10 (currently {:.2})",
                self.manual_apy
            ));
        }

        if self.tick_spacing <= 0 {
            return Err(eyre::eyre!(
                "TICK_SPACING must be positive (currently {})",
                self.tick_spacing
            ));
        }

        if self.pool_fee > MAX_LP_FEE && self.pool_fee != DYNAMIC_FEE_FLAG {
            return Err(eyre::eyre!(
                "POOL_FEE must be at most {} or the dynamic fee flag (currently {})",
                MAX_LP_FEE,
                self.pool_fee
            ));
        }

        for (key, value) in [
            ("POOL_MANAGER_ADDRESS", &self.pool_manager_address),
            ("HOOK_ADDRESS", &self.hook_address),
            ("AVS_ORACLE_ADDRESS", &self.avs_oracle_address),
            ("TOKEN_A_ADDRESS", &self.token_a_address),
            ("TOKEN_B_ADDRESS", &self.token_b_address),
        ] {
            if Address::from_str(value).is_err() {
                return Err(eyre::eyre!("{} is not a valid address: {}", key, value));
            }
        }

        if self.token_a_address.eq_ignore_ascii_case(&self.token_b_address) {
            return Err(eyre::eyre!("TOKEN_A_ADDRESS and TOKEN_B_ADDRESS must differ"));
        }

        // Live mode needs deployed contracts
        if self.execution_mode == ExecutionMode::Live {
            if self.pool_manager_address == ZERO_ADDRESS {
                return Err(eyre::eyre!("Live mode requires POOL_MANAGER_ADDRESS"));
            }
            if self.hook_address == ZERO_ADDRESS {
                return Err(eyre::eyre!("Live mode requires HOOK_ADDRESS"));
            }
        }

        Ok(())
    }

    /// Whether a live oracle contract is configured
    pub fn has_oracle(&self) -> bool {
        self.avs_oracle_address != ZERO_ADDRESS
    }

    pub fn stage_delays(&self) -> StageDelays {
        StageDelays {
            oracle: Duration::from_millis(self.oracle_delay_ms),
            swap: Duration::from_millis(self.swap_delay_ms),
            routing: Duration::from_millis(self.routing_delay_ms),
            compounding: Duration::from_millis(self.compounding_delay_ms),
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║            STABLEYIELD HOOK - CONFIGURATION                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Execution Mode:    {:^40} ║", self.execution_mode);
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ POOL                                                       ║");
        println!(
            "║ • Pair:            {:^40} ║",
            format!("{}/{}", self.token_a_symbol, self.token_b_symbol)
        );
        println!("║ • Tick Spacing:    {:^40} ║", self.tick_spacing);
        println!("║ • Pool Fee:        {:^40} ║", self.pool_fee);
        println!(
            "║ • Hook:            {:^40} ║",
            if self.hook_address == ZERO_ADDRESS { "✗ Not Deployed" } else { "✓ Configured" }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ ORACLE                                                     ║");
        println!(
            "║ • AVS Oracle:      {:^40} ║",
            if self.has_oracle() { "✓ Configured" } else { "✗ Manual APY" }
        );
        println!("║ • Manual APY:      {:<38.2}% ║", self.manual_apy);
        println!("║ • Cache:           {:>38} s ║", self.oracle_cache_secs);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ SIMULATED LATENCY                                          ║");
        println!("║ • Oracle:          {:>37} ms ║", self.oracle_delay_ms);
        println!("║ • Swap:            {:>37} ms ║", self.swap_delay_ms);
        println!("║ • Routing:         {:>37} ms ║", self.routing_delay_ms);
        println!("║ • Compounding:     {:>37} ms ║", self.compounding_delay_ms);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║ • Event Log:       {:^40} ║",
            if self.event_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: 11155111,
            execution_mode: ExecutionMode::Simulation,
            pool_manager_address: ZERO_ADDRESS.to_string(),
            hook_address: ZERO_ADDRESS.to_string(),
            avs_oracle_address: ZERO_ADDRESS.to_string(),
            token_a_symbol: "USDC".to_string(),
            token_a_address: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238".to_string(),
            token_b_symbol: "USDT".to_string(),
            token_b_address: "0xaA8E23Fb1079EA71e0a56F48a2aA51851D8433D0".to_string(),
            tick_spacing: 60,
            pool_fee: BASE_FEE_TIER,
            manual_apy: 5.0,
            oracle_cache_secs: 10,
            oracle_delay_ms: 500,
            swap_delay_ms: 1000,
            routing_delay_ms: 800,
            compounding_delay_ms: 500,
            event_log: false,
            event_log_path: "./logs/simulation_events.jsonl".to_string(),
            rng_seed: None,
        }
    }
}

// ============================================
// TESTS
// ============================================
