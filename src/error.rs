//! # Error Types
//!
//! Typed failures raised by the sequencing core. Application code (catalog
//! store, CLI, settings) wraps these in `anyhow::Error` with extra context.
//!
//! Data-sparsity conditions have no variant here: an empty state or an
//! exhausted catalog degrades the output shape instead of failing.

use thiserror::Error;

/// Errors raised by model construction, plan validation and catalog parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CadenceError {
    /// Kernel temperature must be a positive, finite number
    #[error("Invalid temperature tau={tau}: must be positive and finite")]
    InvalidTemperature { tau: f64 },

    /// A workout plan needs at least one phase
    #[error("Workout plan is empty")]
    EmptyPlan,

    /// Every plan step must request at least one slot
    #[error("Plan step {position} ({phase}) requests zero slots")]
    ZeroSlots { position: usize, phase: String },

    /// A phase used by the plan has no weight vector configured
    #[error("No phase weights configured for phase '{phase}'")]
    MissingPhaseWeights { phase: String },

    /// A configured weight vector cannot be used for reweighting
    #[error("Invalid phase weights for '{phase}': {reason}")]
    InvalidPhaseWeights { phase: String, reason: String },

    /// A song's BPM could not be turned into a number
    #[error("Song '{id}' has an unusable BPM value '{raw}'")]
    InvalidBpm { id: String, raw: String },

    /// A song record without an identifier
    #[error("Song record is missing an id")]
    MissingId,

    /// BPM range table is not a contiguous ascending partition
    #[error("Invalid BPM ranges: {reason}")]
    InvalidRanges { reason: String },

    /// Name does not match any workout state
    #[error("Unknown workout state '{name}'")]
    UnknownState { name: String },

    /// Plan text could not be parsed
    #[error("Invalid plan step '{step}': {reason}")]
    InvalidPlanStep { step: String, reason: String },

    /// Externally supplied rows are not a probability distribution
    #[error("Row {row} is not a probability distribution (sum={sum})")]
    NotStochastic { row: usize, sum: f64 },

    /// Hitting-time target outside the state index range
    #[error("Target index {index} is out of range for {states} states")]
    InvalidTarget { index: usize, states: usize },
}

/// Convenience alias for core results
pub type Result<T> = std::result::Result<T, CadenceError>;
