//! # Transition Model Builder
//!
//! Turns a classified catalog into transition matrices.
//!
//! ## Pipeline
//!
//! ```text
//! songs ──bin_centers──▶ centers[N] ──similarity_matrix(τ)──▶ S[N][N]
//!       ──row_normalize──▶ P_base ──phase_transition(weights)──▶ P_phase
//! ```
//!
//! ## Kernel
//!
//! `S[i][j] = exp(-|c_i - c_j| / τ)`. Larger `τ` flattens rows (more
//! movement between states), smaller `τ` keeps mass near the diagonal.
//!
//! ## Empty States
//!
//! A state with no classified songs has a NaN center. Any similarity that
//! touches a NaN center is forced to zero, including that state's own
//! diagonal, so its row normalizes to uniform and no other row ever routes
//! probability into it from the base model.

use crate::error::{CadenceError, Result};
use crate::matrix::{row_normalize, Grid, TransitionMatrix};
use crate::song::Song;
use crate::state::{WorkoutState, STATE_COUNT};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default kernel temperature
pub const DEFAULT_TAU: f64 = 12.0;

/// Per-state mean BPM in canonical order. NaN marks a state without songs.
pub type Centers = [f64; STATE_COUNT];

/// Static reweighting vectors, one per phase.
///
/// Each vector multiplies every row of the base matrix elementwise; entry
/// `j` is the weight toward state `j`. Push phases favour their own state
/// and higher intensities, recovery phases favour lower ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseWeights {
    table: BTreeMap<WorkoutState, [f64; STATE_COUNT]>,
}

impl Default for PhaseWeights {
    fn default() -> Self {
        let table = BTreeMap::from([
            (WorkoutState::Warmup, [2.0, 1.2, 0.8, 0.5]),
            (WorkoutState::SteadyState, [1.0, 2.0, 1.0, 0.8]),
            (WorkoutState::PushPace, [0.7, 1.0, 2.0, 1.0]),
            (WorkoutState::Sprint, [0.5, 0.8, 1.0, 2.5]),
        ]);
        Self { table }
    }
}

impl PhaseWeights {
    /// Empty table; phases must be added with [`PhaseWeights::with_phase`]
    #[must_use]
    pub fn empty() -> Self {
        Self { table: BTreeMap::new() }
    }

    /// Add or replace the weight vector of one phase.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::InvalidPhaseWeights`] for negative or
    /// non-finite weights, or an all-zero vector.
    pub fn with_phase(mut self, phase: WorkoutState, weights: [f64; STATE_COUNT]) -> Result<Self> {
        validate_weights(phase, &weights)?;
        self.table.insert(phase, weights);
        Ok(self)
    }

    /// Weight vector for `phase`.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::MissingPhaseWeights`]; a default is never
    /// substituted.
    pub fn get(&self, phase: WorkoutState) -> Result<&[f64; STATE_COUNT]> {
        self.table
            .get(&phase)
            .ok_or_else(|| CadenceError::MissingPhaseWeights { phase: phase.name().to_string() })
    }

    /// Check every configured vector (used after deserializing settings).
    ///
    /// # Errors
    ///
    /// Returns the first invalid vector found.
    pub fn validate(&self) -> Result<()> {
        self.table.iter().try_for_each(|(phase, weights)| validate_weights(*phase, weights))
    }

    pub fn phases(&self) -> impl Iterator<Item = WorkoutState> + '_ {
        self.table.keys().copied()
    }
}

fn validate_weights(phase: WorkoutState, weights: &[f64; STATE_COUNT]) -> Result<()> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(CadenceError::InvalidPhaseWeights {
            phase: phase.name().to_string(),
            reason: "weights must be finite and non-negative".to_string(),
        });
    }
    if weights.iter().all(|w| *w == 0.0) {
        return Err(CadenceError::InvalidPhaseWeights {
            phase: phase.name().to_string(),
            reason: "at least one weight must be positive".to_string(),
        });
    }
    Ok(())
}

/// Reject non-positive or non-finite temperatures.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTemperature`].
pub fn validate_tau(tau: f64) -> Result<()> {
    if tau.is_finite() && tau > 0.0 {
        Ok(())
    } else {
        Err(CadenceError::InvalidTemperature { tau })
    }
}

/// Mean BPM of the classified songs of each state.
///
/// Unclassified songs are ignored. States with no songs get NaN.
#[must_use]
pub fn bin_centers(catalog: &[Song]) -> Centers {
    let mut sums = [0.0; STATE_COUNT];
    let mut counts = [0_usize; STATE_COUNT];

    for song in catalog {
        if let Some(state) = song.state {
            sums[state.index()] += song.bpm;
            counts[state.index()] += 1;
        }
    }

    let mut centers = [f64::NAN; STATE_COUNT];
    for (i, center) in centers.iter_mut().enumerate() {
        if counts[i] > 0 {
            *center = sums[i] / counts[i] as f64;
        }
    }
    trace!("Bin centers: {centers:?} (counts {counts:?})");
    centers
}

/// Laplace-kernel similarity between state centers.
///
/// Symmetric, with a diagonal of exactly 1 for every state that has a
/// center. Pairs involving a NaN center are 0.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTemperature`] for `tau <= 0`.
pub fn similarity_matrix(centers: &Centers, tau: f64) -> Result<Grid> {
    validate_tau(tau)?;

    let mut similarity = [[0.0; STATE_COUNT]; STATE_COUNT];
    for (i, row) in similarity.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = kernel(centers[i], centers[j], tau);
        }
    }
    Ok(similarity)
}

/// Laplace kernel; a missing (NaN) center has zero similarity to everything.
fn kernel(a: f64, b: f64, tau: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    (-(a - b).abs() / tau).exp()
}

/// Base matrix from precomputed centers
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTemperature`] for `tau <= 0`.
pub fn base_transition_from_centers(centers: &Centers, tau: f64) -> Result<TransitionMatrix> {
    let base = row_normalize(&similarity_matrix(centers, tau)?);
    debug!("Built base transition matrix (tau={tau})");
    Ok(base)
}

/// `row_normalize(similarity_matrix(bin_centers(catalog), tau))`
///
/// Deterministic: identical catalog and `tau` give identical matrices.
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTemperature`] for `tau <= 0`.
pub fn base_transition(catalog: &[Song], tau: f64) -> Result<TransitionMatrix> {
    base_transition_from_centers(&bin_centers(catalog), tau)
}

/// Reweight every row of `base` by `weights` and renormalize.
#[must_use]
pub fn phase_transition(base: &TransitionMatrix, weights: &[f64; STATE_COUNT]) -> TransitionMatrix {
    let mut weighted = *base.rows();
    for row in weighted.iter_mut() {
        for (p, w) in row.iter_mut().zip(weights) {
            *p *= w;
        }
    }
    row_normalize(&weighted)
}

/// Phase matrix looked up from a weight table.
///
/// # Errors
///
/// Returns [`CadenceError::MissingPhaseWeights`] when `phase` has no entry.
pub fn phase_transition_for(
    base: &TransitionMatrix,
    weights: &PhaseWeights,
    phase: WorkoutState,
) -> Result<TransitionMatrix> {
    let matrix = phase_transition(base, weights.get(phase)?);
    debug!("Built phase matrix for {phase}");
    Ok(matrix)
}
