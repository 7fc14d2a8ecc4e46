//! End-to-end runs through the public API with a virtual clock

use std::sync::Arc;

use stableyield::hook::{FeeTier, YieldRate};
use stableyield::oracle::{AvsFeedOracle, ManualOracle};
use stableyield::pool::{PoolPair, SwapDirection, SwapRequest};
use stableyield::simulator::{
    format_tx_hash, JsonlSink, MemorySink, MultiSink, Severity, SimulationTrace, Stage,
    VirtualScheduler, YieldRoutingSimulator,
};
use stableyield::SimulationError;

fn simulator(seed: u64) -> (YieldRoutingSimulator, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let sim = YieldRoutingSimulator::new(
        PoolPair::default(),
        Arc::new(VirtualScheduler::default()),
        sink.clone(),
    )
    .with_seed(seed);
    (sim, sink)
}

async fn run(amount: f64, rate: f64) -> SimulationTrace {
    let (mut sim, _) = simulator(1);
    let request = SwapRequest::new(amount, SwapDirection::AtoB).unwrap();
    sim.run(request, YieldRate::new(rate).unwrap())
        .unwrap()
        .collect()
        .await
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[tokio::test]
async fn high_apy_routes_half_the_fee_to_morpho() {
    let trace = run(100.0, 5.0).await;
    let outcome = trace.outcome.clone().unwrap();

    assert_eq!(outcome.decision.tier, FeeTier::Dynamic);
    assert!(close(outcome.fees.fee_amount, 0.5));
    assert!(close(outcome.fees.routed_amount.unwrap(), 0.25));

    assert!(trace
        .events
        .iter()
        .any(|e| e.stage == Stage::Routing && e.message.contains("Deposited 0.250000 USDC")));

    let terminal = trace.terminal().unwrap();
    assert_eq!(terminal.severity, Severity::Success);
    let tx = terminal.message.rsplit(' ').next().unwrap();
    assert_eq!(tx.len(), 66);
    assert!(tx.starts_with("0x"));
    assert_eq!(tx, format_tx_hash(&outcome.tx_hash));
}

#[tokio::test]
async fn low_apy_keeps_base_tier_without_routing() {
    let trace = run(100.0, 3.0).await;
    let outcome = trace.outcome.clone().unwrap();

    assert_eq!(outcome.decision.tier, FeeTier::Base);
    assert!(close(outcome.fees.fee_amount, 0.3));
    assert_eq!(outcome.fees.routed_amount, None);
    assert!(trace
        .events
        .iter()
        .any(|e| e.message.starts_with("Yield routing inactive")));
    assert!(!trace.events.iter().any(|e| e.message.contains("Morpho vault")));
}

#[test]
fn threshold_rate_is_inactive() {
    let trace = tokio_test::block_on(run(50.0, 4.0));
    let outcome = trace.outcome.unwrap();

    assert!(!outcome.decision.routing_active);
    assert_eq!(outcome.decision.tier, FeeTier::Base);
    assert!(close(outcome.fees.fee_amount, 0.15));
}

#[tokio::test]
async fn invalid_amount_is_rejected_before_any_event() {
    assert!(matches!(
        SwapRequest::parse("", SwapDirection::AtoB),
        Err(SimulationError::InvalidAmount(_))
    ));
    assert!(matches!(
        SwapRequest::new(0.0, SwapDirection::AtoB),
        Err(SimulationError::InvalidAmount(_))
    ));

    // A request that bypassed the constructor is still checked by the run
    let (mut sim, sink) = simulator(1);
    let request: SwapRequest =
        serde_json::from_str(r#"{"amount":0.0,"direction":"AtoB"}"#).unwrap();
    let result = sim.run(request, YieldRate::new(5.0).unwrap());

    assert!(matches!(result, Err(SimulationError::InvalidAmount(_))));
    assert!(sink.events().is_empty());
    assert!(!sim.is_running());
}

#[tokio::test]
async fn seeded_runs_repeat_transaction_ids() {
    let request = SwapRequest::new(10.0, SwapDirection::BtoA).unwrap();
    let rate = YieldRate::new(6.0).unwrap();

    let (mut a, _) = simulator(7);
    let (mut b, _) = simulator(7);
    let first = a.run(request, rate).unwrap().collect().await;
    let second = b.run(request, rate).unwrap().collect().await;

    let first_hash = first.outcome.unwrap().tx_hash;
    assert_eq!(first_hash, second.outcome.unwrap().tx_hash);

    // Consecutive runs on one simulator draw fresh ids
    let third = a.run(request, rate).unwrap().collect().await;
    assert_ne!(third.outcome.unwrap().tx_hash, first_hash);
}

#[tokio::test]
async fn oracle_failure_emits_one_error_after_the_query_notice() {
    let (mut sim, sink) = simulator(1);
    let request = SwapRequest::new(100.0, SwapDirection::AtoB).unwrap();

    let trace = sim
        .run_with_oracle(request, Arc::new(AvsFeedOracle::new()))
        .unwrap()
        .collect()
        .await;

    assert_eq!(trace.events.len(), 3);
    assert_eq!(trace.events[1].message, "Querying AVS oracle for current APY...");

    let error = &trace.events[2];
    assert_eq!(error.severity, Severity::Error);
    assert_eq!(error.stage, Stage::Oracle);
    assert!(error.message.starts_with("Oracle query failed"));
    assert!(!trace.succeeded());
    assert_eq!(sink.events(), trace.events);
    assert!(!sim.is_running());
}

#[tokio::test]
async fn oracle_reading_drives_the_decision() {
    let (mut sim, _) = simulator(1);
    let request = SwapRequest::new(100.0, SwapDirection::AtoB).unwrap();
    let oracle = Arc::new(ManualOracle::new(7.3).unwrap());

    let trace = sim.run_with_oracle(request, oracle).unwrap().collect().await;

    assert!(trace.events.iter().any(|e| e.message == "Oracle APY: 7.30%"));
    assert_eq!(trace.outcome.unwrap().decision.tier, FeeTier::Dynamic);
}

#[tokio::test]
async fn every_run_ends_in_exactly_one_terminal_event() {
    for rate in [0.0, 3.9, 4.0, 4.1, 10.0] {
        let trace = run(25.0, rate).await;
        let terminals = trace.events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "rate {}", rate);
        assert!(trace.events.last().unwrap().is_terminal());
    }
}

#[tokio::test]
async fn unwritable_event_log_does_not_fail_the_run() {
    // A regular file where the log directory should be
    let blocker = std::env::temp_dir().join("stableyield_blocked_log");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let memory = Arc::new(MemorySink::default());
    let sink = MultiSink::new()
        .with(Arc::new(JsonlSink::new(blocker.join("events.jsonl"))))
        .with(memory.clone());
    let mut sim = YieldRoutingSimulator::new(
        PoolPair::default(),
        Arc::new(VirtualScheduler::default()),
        Arc::new(sink),
    )
    .with_seed(1);

    let request = SwapRequest::new(100.0, SwapDirection::AtoB).unwrap();
    let trace = sim
        .run(request, YieldRate::new(5.0).unwrap())
        .unwrap()
        .collect()
        .await;
    let _ = std::fs::remove_file(&blocker);

    assert!(trace.succeeded());
    assert_eq!(trace.terminal().unwrap().stage, Stage::Complete);
    assert_eq!(memory.events().len(), trace.events.len());
}
