//! # Chain Simulator
//!
//! Random walk over workout states driven by one transition matrix per
//! playlist slot. Consecutive matrices may differ, which makes the chain
//! time-inhomogeneous.
//!
//! The walk always starts from [`START_STATE`]: a playlist logically opens at
//! warm-up intensity. The random source is passed in, so a seeded
//! [`rand::rngs::StdRng`] gives exactly reproducible paths.

use crate::matrix::TransitionMatrix;
use crate::state::WorkoutState;
use log::trace;
use rand::Rng;
use serde::Serialize;

/// Fixed initial state of every simulated path (the lowest-intensity state)
pub const START_STATE: WorkoutState = WorkoutState::Warmup;

/// Visited states, start state first. Length is `steps + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatePath(Vec<WorkoutState>);

impl StatePath {
    #[must_use]
    pub fn states(&self) -> &[WorkoutState] {
        &self.0
    }

    #[must_use]
    pub fn start(&self) -> WorkoutState {
        self.0[0]
    }

    /// States drawn after the start, one per slot
    #[must_use]
    pub fn steps(&self) -> &[WorkoutState] {
        &self.0[1..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A path always holds at least its start state
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Draw the successor of `from` from its row in `matrix`.
///
/// Inverse-CDF sampling over the row. Rounding can leave the cumulative sum
/// a hair under 1; a draw past the end lands on the last state with positive
/// probability.
pub fn step<R: Rng + ?Sized>(matrix: &TransitionMatrix, from: WorkoutState, rng: &mut R) -> WorkoutState {
    let row = matrix.row(from);
    let draw: f64 = rng.gen();

    let mut cumulative = 0.0;
    for (state, p) in WorkoutState::ALL.iter().zip(row) {
        cumulative += p;
        if draw < cumulative {
            return *state;
        }
    }

    WorkoutState::ALL
        .iter()
        .zip(row)
        .rev()
        .find(|(_, p)| **p > 0.0)
        .map_or(from, |(state, _)| *state)
}

/// Simulate one transition per matrix, starting at `start`.
///
/// Returns a path of length `matrices.len() + 1`.
pub fn simulate<R: Rng + ?Sized>(matrices: &[TransitionMatrix], start: WorkoutState, rng: &mut R) -> StatePath {
    let mut path = Vec::with_capacity(matrices.len() + 1);
    let mut current = start;
    path.push(current);

    for (slot, matrix) in matrices.iter().enumerate() {
        current = step(matrix, current, rng);
        trace!("Slot {slot}: -> {current}");
        path.push(current);
    }

    StatePath(path)
}
