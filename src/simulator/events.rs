//! Simulation events and the sinks that observe them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Pipeline stage that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Oracle,
    FeeTier,
    Swap,
    Fees,
    Routing,
    Compounding,
    Complete,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Start => write!(f, "Start"),
            Stage::Oracle => write!(f, "Oracle query"),
            Stage::FeeTier => write!(f, "Fee tier decision"),
            Stage::Swap => write!(f, "Swap execution"),
            Stage::Fees => write!(f, "Fee computation"),
            Stage::Routing => write!(f, "Yield routing"),
            Stage::Compounding => write!(f, "Yield compounding"),
            Stage::Complete => write!(f, "Completion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub timestamp: DateTime<Utc>,
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

impl SimulationEvent {
    /// Completion or error - nothing follows a terminal event
    pub fn is_terminal(&self) -> bool {
        self.severity == Severity::Error || self.stage == Stage::Complete
    }
}

// ============================================
// SINKS
// ============================================

/// Observability collaborator. Must not block or fail the run.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SimulationEvent);
}

/// Mirrors events into the tracing stream
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &SimulationEvent) {
        match event.severity {
            Severity::Info => info!(stage = %event.stage, "{}", event.message),
            Severity::Success => info!(stage = %event.stage, "✓ {}", event.message),
            Severity::Error => error!(stage = %event.stage, "{}", event.message),
        }
    }
}

/// Appends each event as one JSON line
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn append(&self, event: &SimulationEvent) -> eyre::Result<()> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

impl EventSink for JsonlSink {
    fn record(&self, event: &SimulationEvent) {
        if let Err(e) = self.append(event) {
            warn!("Failed to write event log {}: {}", self.path.display(), e);
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SimulationEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<SimulationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &SimulationEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Fans one event out to several sinks
#[derive(Default, Clone)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for MultiSink {
    fn record(&self, event: &SimulationEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
