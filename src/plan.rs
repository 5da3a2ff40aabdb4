//! # Workout Plans
//!
//! A plan is an ordered list of `(phase, count)` steps. The total playlist
//! length is the sum of the counts; every slot inherits the phase of the
//! step it belongs to.
//!
//! Plans can be written as text (`warmup:2,steady_state:4,sprint:1`), read
//! from JSON, or taken from the built-in presets.

use crate::error::{CadenceError, Result};
use crate::state::WorkoutState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One plan segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub phase: WorkoutState,
    pub count: usize,
}

/// Validated, non-empty phase schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PlanStep>", into = "Vec<PlanStep>")]
pub struct WorkoutPlan {
    steps: Vec<PlanStep>,
}

impl WorkoutPlan {
    /// # Errors
    ///
    /// Returns [`CadenceError::EmptyPlan`] for no steps and
    /// [`CadenceError::ZeroSlots`] for a step with `count == 0`.
    pub fn new(steps: Vec<PlanStep>) -> Result<Self> {
        if steps.is_empty() {
            return Err(CadenceError::EmptyPlan);
        }
        if let Some((position, step)) = steps.iter().enumerate().find(|(_, s)| s.count == 0) {
            return Err(CadenceError::ZeroSlots { position, phase: step.phase.name().to_string() });
        }
        Ok(Self { steps })
    }

    /// Build from `(phase, count)` pairs
    ///
    /// # Errors
    ///
    /// Same as [`WorkoutPlan::new`].
    pub fn from_pairs(pairs: &[(WorkoutState, usize)]) -> Result<Self> {
        Self::new(pairs.iter().map(|&(phase, count)| PlanStep { phase, count }).collect())
    }

    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Planned playlist length
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.steps.iter().map(|s| s.count).sum()
    }

    /// Phase of every slot, in order
    #[must_use]
    pub fn slot_phases(&self) -> Vec<WorkoutState> {
        self.steps
            .iter()
            .flat_map(|step| std::iter::repeat(step.phase).take(step.count))
            .collect()
    }

    /// Human readable summary, e.g. `"2 warmup, 4 steady state"`
    #[must_use]
    pub fn summary(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{} {}", s.count, s.phase.name().replace('_', " ")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl TryFrom<Vec<PlanStep>> for WorkoutPlan {
    type Error = CadenceError;

    fn try_from(steps: Vec<PlanStep>) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<WorkoutPlan> for Vec<PlanStep> {
    fn from(plan: WorkoutPlan) -> Self {
        plan.steps
    }
}

impl fmt::Display for WorkoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .steps
            .iter()
            .map(|s| format!("{}:{}", s.phase, s.count))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&text)
    }
}

impl FromStr for WorkoutPlan {
    type Err = CadenceError;

    /// Parse `phase:count` steps separated by commas.
    fn from_str(s: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for raw in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let (phase, count) = raw.split_once(':').ok_or_else(|| CadenceError::InvalidPlanStep {
                step: raw.to_string(),
                reason: "expected 'phase:count'".to_string(),
            })?;
            let phase: WorkoutState = phase.parse()?;
            let count = count.trim().parse().map_err(|_| CadenceError::InvalidPlanStep {
                step: raw.to_string(),
                reason: format!("'{}' is not a slot count", count.trim()),
            })?;
            steps.push(PlanStep { phase, count });
        }
        Self::new(steps)
    }
}

/// Names of the built-in plans
pub const PRESET_NAMES: [&str; 4] = ["default", "beginner_30min", "hiit_intervals", "progressive_build"];

/// Built-in interval workouts.
#[must_use]
pub fn preset(name: &str) -> Option<WorkoutPlan> {
    use WorkoutState::{PushPace, SteadyState, Sprint, Warmup};

    let pairs: &[(WorkoutState, usize)] = match name {
        "default" => &[(Warmup, 2), (SteadyState, 4), (PushPace, 3), (SteadyState, 2), (Sprint, 1)],
        "beginner_30min" => &[(Warmup, 3), (SteadyState, 6), (PushPace, 2), (SteadyState, 2)],
        "hiit_intervals" => &[
            (Warmup, 2),
            (PushPace, 2),
            (SteadyState, 2),
            (Sprint, 1),
            (SteadyState, 2),
            (Sprint, 1),
            // cooldown
            (Warmup, 1),
        ],
        "progressive_build" => &[
            (Warmup, 2),
            (SteadyState, 3),
            (PushPace, 3),
            (Sprint, 2),
            (PushPace, 1),
            (Warmup, 1),
        ],
        _ => return None,
    };
    WorkoutPlan::from_pairs(pairs).ok()
}
