//! StableYield - Hook Simulator CLI
//!
//! Run with: cargo run -- --amount 100 --apy 5.2
//!
//! Shows the pool's APY status, then either streams a simulated swap
//! through the hook or (in live mode) hands the swap to a submitter.

use alloy_primitives::{Address, U256};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stableyield::config::{Config, ExecutionMode};
use stableyield::executor::{SimulatedSubmitter, TxStatus};
use stableyield::oracle::{AvsFeedOracle, CachedOracle};
use stableyield::pool::{SwapDirection, SwapRequest};
use stableyield::session::SwapSession;
use stableyield::simulator::{
    format_tx_hash, EventSink, JsonlSink, MultiSink, Severity, SimulationEvent, TokioScheduler,
    TracingSink,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    AToB,
    BToA,
}

impl From<Direction> for SwapDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::AToB => SwapDirection::AtoB,
            Direction::BToA => SwapDirection::BtoA,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "stableyield", about = "Simulate swaps through the StableYield hook")]
struct Args {
    /// Swap amount in input-token units
    #[arg(long, default_value = "100")]
    amount: String,

    #[arg(long, value_enum, default_value = "a-to-b")]
    direction: Direction,

    /// Manual APY override (percent, 0-10)
    #[arg(long)]
    apy: Option<f64>,

    /// Raw AVS oracle reading (18-decimal fraction, e.g. 52000000000000000 = 5.2%)
    #[arg(long)]
    oracle_wad: Option<u128>,

    /// TOML config file (defaults to environment)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for synthetic transaction ids
    #[arg(long)]
    seed: Option<u64>,

    /// Skip the simulated network latency
    #[arg(long)]
    fast: bool,

    /// Also mirror events into the log stream
    #[arg(long)]
    trace_events: bool,

    /// Wallet address used in live mode
    #[arg(long)]
    wallet: Option<Address>,
}

/// Renders the event panel
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn record(&self, event: &SimulationEvent) {
        let time = event.timestamp.format("%H:%M:%S%.3f");
        let line = match event.severity {
            Severity::Info => style(format!("  {} {}", style("•").blue(), event.message)),
            Severity::Success => style(format!("  {} {}", style("✓").green(), event.message)),
            Severity::Error => style(format!("  {} {}", style("✗").red(), event.message)).red(),
        };
        println!("{} {}", style(time).dim(), line);
    }
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🌾 STABLEYIELD - Yield-Aware Uniswap V4 Hook").cyan().bold()
    );
    println!(
        "{}",
        style("    APY-Driven Fee Tiers | Morpho Yield Routing").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn print_status(session: &SwapSession) {
    let status = session.status();
    let routing = if status.routing_active {
        style(status.routing).green()
    } else {
        style(status.routing).yellow()
    };

    println!("{}", style("═══ CURRENT APY STATUS ═══").magenta().bold());
    println!("  Current APY: {}%", style(&status.apy).bold());
    println!("  Fee Tier:    {}", style(status.fee_tier).cyan());
    println!("  Routing:     {}", routing);
    println!();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(seed) = args.seed {
        config.rng_seed = Some(seed);
    }
    if args.fast {
        config.oracle_delay_ms = 0;
        config.swap_delay_ms = 0;
        config.routing_delay_ms = 0;
        config.compounding_delay_ms = 0;
    }

    Ok(config)
}

fn build_sink(args: &Args, config: &Config) -> Arc<dyn EventSink> {
    let mut sink = MultiSink::new().with(Arc::new(ConsoleSink));
    if args.trace_events {
        sink = sink.with(Arc::new(TracingSink));
    }
    if config.event_log {
        info!("Event log: {}", config.event_log_path);
        sink = sink.with(Arc::new(JsonlSink::new(&config.event_log_path)));
    }
    Arc::new(sink)
}

async fn run_simulation(session: &mut SwapSession, request: SwapRequest) -> Result<()> {
    println!("{}", style("═══ SIMULATION ═══").green().bold());

    let mut run = session.simulate(request)?;

    let token = run.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    while run.next_event().await.is_some() {}

    println!();
    match run.outcome() {
        Some(outcome) => {
            println!("{}", style("Swap Summary").green().bold());
            println!("  Fee tier:  {}", outcome.decision.tier.label());
            println!("  Fee:       {:.6}", outcome.fees.fee_amount);
            match outcome.fees.routed_amount {
                Some(routed) => println!("  Routed:    {:.6} → Morpho", routed),
                None => println!("  Routed:    {}", style("none").yellow()),
            }
            println!("  Tx:        {}", style(format_tx_hash(&outcome.tx_hash)).cyan());
        }
        None => println!("{}", style("Simulation did not complete").red()),
    }

    Ok(())
}

async fn run_live(session: &mut SwapSession, request: SwapRequest, args: &Args) -> Result<()> {
    println!("{}", style("═══ LIVE SWAP ═══").yellow().bold());

    if let Some(wallet) = args.wallet {
        session.connect_wallet(wallet);
    }

    let submitter = SimulatedSubmitter::new(args.seed.unwrap_or_else(rand::random));
    match session.submit(request, &submitter).await {
        Ok(swap) => {
            let status = match swap.status {
                TxStatus::Confirmed => style(swap.status.to_string()).green(),
                TxStatus::Pending => style(swap.status.to_string()).yellow(),
                TxStatus::Failed => style(swap.status.to_string()).red(),
            };
            println!("  Fee tier:  {}", swap.decision.tier.label());
            println!("  Tx:        {}", style(format_tx_hash(&swap.tx_hash)).cyan());
            println!("  Status:    {}", status);
        }
        Err(e) => {
            error!("Swap submission failed: {}", e);
            println!("{} {}", style("✗").red(), e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stableyield=info".parse()?),
        )
        .init();

    let args = Args::parse();

    print_banner();

    // Load configuration
    let config = load_config(&args)?;

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    config.print_summary();
    println!();

    let sink = build_sink(&args, &config);
    let mut session = SwapSession::from_config(&config, Arc::new(TokioScheduler), sink)?;

    if let Some(apy) = args.apy {
        session.set_manual_rate(apy)?;
    }

    if let Some(raw) = args.oracle_wad {
        let feed = AvsFeedOracle::new();
        feed.push_raw(U256::from(raw)).await?;
        let oracle = CachedOracle::new(feed, Duration::from_secs(config.oracle_cache_secs));
        if let Err(e) = session.refresh_rate(&oracle).await {
            warn!("Oracle reading rejected, keeping manual APY: {}", e);
        }
    }

    print_status(&session);

    let request = match SwapRequest::parse(&args.amount, args.direction.into()) {
        Ok(request) => request,
        Err(e) => {
            println!("{} {}", style("✗").red(), e);
            return Ok(());
        }
    };

    match session.mode() {
        ExecutionMode::Simulation => run_simulation(&mut session, request).await?,
        ExecutionMode::Live => run_live(&mut session, request, &args).await?,
    }

    println!();
    Ok(())
}
