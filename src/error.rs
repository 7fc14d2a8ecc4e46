//! Error taxonomy for the hook simulator

use thiserror::Error;

use crate::simulator::Stage;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Missing, unparseable, zero or negative swap amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid yield rate: {0}")]
    InvalidYieldRate(f64),

    /// A collaborator raised mid-run
    #[error("{stage} failed: {message}")]
    StageFailure { stage: Stage, message: String },

    #[error("Wallet not connected")]
    NotConnected,

    #[error("A simulation is already in progress")]
    SimulationInProgress,

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
