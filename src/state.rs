//! # Workout States and BPM Binning
//!
//! The fixed, ordered list of workout states and the BPM ranges used to
//! classify songs into them.
//!
//! ## Canonical Order
//!
//! States are ordered low-to-high intensity. That order is the index order
//! of every matrix and state vector in the crate:
//!
//! | Index | State          | Default BPM range |
//! |-------|----------------|------------------|
//! | 0     | `warmup`       | [80, 110)        |
//! | 1     | `steady_state` | [110, 140)       |
//! | 2     | `push_pace`    | [140, 170)       |
//! | 3     | `sprint`       | [170, 1000)      |
//!
//! ## Boundaries
//!
//! Ranges are half-open: inclusive lower bound, exclusive upper bound. A song
//! at exactly 110 BPM is `steady_state`, never `warmup`.

use crate::error::{CadenceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of workout states. Every matrix in the crate is `STATE_COUNT` square.
pub const STATE_COUNT: usize = 4;

/// A workout intensity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutState {
    Warmup,
    SteadyState,
    PushPace,
    Sprint,
}

impl WorkoutState {
    /// All states in canonical (ascending intensity) order
    pub const ALL: [WorkoutState; STATE_COUNT] = [
        WorkoutState::Warmup,
        WorkoutState::SteadyState,
        WorkoutState::PushPace,
        WorkoutState::Sprint,
    ];

    /// Canonical matrix index of this state
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            WorkoutState::Warmup => 0,
            WorkoutState::SteadyState => 1,
            WorkoutState::PushPace => 2,
            WorkoutState::Sprint => 3,
        }
    }

    /// State at a canonical index, if in range
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Snake-case name used in plans, settings and exports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            WorkoutState::Warmup => "warmup",
            WorkoutState::SteadyState => "steady_state",
            WorkoutState::PushPace => "push_pace",
            WorkoutState::Sprint => "sprint",
        }
    }

    /// Canonical labels, index-aligned with matrix rows
    #[must_use]
    pub fn labels() -> Vec<String> {
        Self::ALL.iter().map(|s| s.name().to_string()).collect()
    }
}

impl fmt::Display for WorkoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkoutState {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|state| state.name() == normalized)
            .ok_or_else(|| CadenceError::UnknownState { name: s.to_string() })
    }
}

/// Half-open BPM interval `[lower, upper)` assigned to one state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateRange {
    pub state: WorkoutState,
    pub lower: f64,
    pub upper: f64,
}

impl StateRange {
    #[must_use]
    pub fn contains(&self, bpm: f64) -> bool {
        self.lower <= bpm && bpm < self.upper
    }

    /// Width of the interval
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ranges wider than this are treated as open-ended when picking a target tempo.
pub const OPEN_RANGE_WIDTH: f64 = 200.0;

/// Target offset above the lower bound for an open-ended range.
const OPEN_RANGE_TARGET_OFFSET: f64 = 10.0;

/// BPM range table, one range per state in canonical order.
///
/// Constructed once (defaults or settings file) and passed explicitly to the
/// binner; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StateRange>", into = "Vec<StateRange>")]
pub struct StateRanges {
    ranges: [StateRange; STATE_COUNT],
}

impl Default for StateRanges {
    fn default() -> Self {
        Self {
            ranges: [
                StateRange { state: WorkoutState::Warmup, lower: 80.0, upper: 110.0 },
                StateRange { state: WorkoutState::SteadyState, lower: 110.0, upper: 140.0 },
                StateRange { state: WorkoutState::PushPace, lower: 140.0, upper: 170.0 },
                StateRange { state: WorkoutState::Sprint, lower: 170.0, upper: 1000.0 },
            ],
        }
    }
}

impl StateRanges {
    /// Build a validated range table.
    ///
    /// Ranges may be given in any order; they are stored in canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::InvalidRanges`] unless every state appears
    /// exactly once, each interval is non-empty and finite at its lower
    /// bound, and the intervals are contiguous and ascending in canonical
    /// state order.
    pub fn new(ranges: Vec<StateRange>) -> Result<Self> {
        if ranges.len() != STATE_COUNT {
            return Err(CadenceError::InvalidRanges {
                reason: format!("expected {STATE_COUNT} ranges, got {}", ranges.len()),
            });
        }

        let mut slots: [Option<StateRange>; STATE_COUNT] = [None; STATE_COUNT];
        for range in ranges {
            let slot = &mut slots[range.state.index()];
            if slot.is_some() {
                return Err(CadenceError::InvalidRanges {
                    reason: format!("state '{}' appears more than once", range.state),
                });
            }
            if !range.lower.is_finite() || range.lower < 0.0 || range.upper.is_nan() || range.lower >= range.upper {
                return Err(CadenceError::InvalidRanges {
                    reason: format!("range for '{}' is empty or malformed", range.state),
                });
            }
            *slot = Some(range);
        }

        // Every slot is filled: length matched and no duplicates.
        let mut ordered = Vec::with_capacity(STATE_COUNT);
        for (index, slot) in slots.into_iter().enumerate() {
            let range = slot.ok_or_else(|| CadenceError::InvalidRanges {
                reason: format!("missing range for state index {index}"),
            })?;
            ordered.push(range);
        }

        for pair in ordered.windows(2) {
            if pair[0].upper != pair[1].lower {
                return Err(CadenceError::InvalidRanges {
                    reason: format!(
                        "'{}' ends at {} but '{}' starts at {}",
                        pair[0].state, pair[0].upper, pair[1].state, pair[1].lower
                    ),
                });
            }
        }

        Ok(Self {
            ranges: [ordered[0], ordered[1], ordered[2], ordered[3]],
        })
    }

    /// Classify a tempo.
    ///
    /// Iterates states in canonical order and returns the first whose
    /// interval contains `bpm`. Non-finite, negative, or out-of-table values
    /// yield `None` (unclassified); callers decide what to do with those.
    #[must_use]
    pub fn classify(&self, bpm: f64) -> Option<WorkoutState> {
        if !bpm.is_finite() || bpm < 0.0 {
            return None;
        }
        self.ranges
            .iter()
            .find(|range| range.contains(bpm))
            .map(|range| range.state)
    }

    /// Range for one state
    #[must_use]
    pub fn range(&self, state: WorkoutState) -> &StateRange {
        &self.ranges[state.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateRange> {
        self.ranges.iter()
    }

    /// Representative tempo of a state, used to score phase accuracy.
    ///
    /// Bounded ranges use their midpoint; the open-ended top range uses a
    /// realistic tempo just above its lower bound.
    #[must_use]
    pub fn target_bpm(&self, state: WorkoutState) -> f64 {
        let range = self.range(state);
        if range.upper.is_infinite() || range.width() >= OPEN_RANGE_WIDTH {
            range.lower + OPEN_RANGE_TARGET_OFFSET
        } else {
            (range.lower + range.upper) / 2.0
        }
    }
}

impl TryFrom<Vec<StateRange>> for StateRanges {
    type Error = CadenceError;

    fn try_from(ranges: Vec<StateRange>) -> Result<Self> {
        Self::new(ranges)
    }
}

impl From<StateRanges> for Vec<StateRange> {
    fn from(ranges: StateRanges) -> Self {
        ranges.ranges.to_vec()
    }
}

/// Classify with the default range table.
#[must_use]
pub fn classify(bpm: f64) -> Option<WorkoutState> {
    StateRanges::default().classify(bpm)
}
