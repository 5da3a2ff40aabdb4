//! # Chain Analytics and Evaluation
//!
//! Diagnostics for the transition model and for generated playlists.
//!
//! ## Hitting Times
//!
//! For the *time-homogeneous* base chain `P` and a target state `t`, the
//! expected number of steps `h(i)` to first reach `t` satisfies
//!
//! ```text
//! h(t) = 0
//! h(i) = 1 + Σ_j P[i][j] · h(j)      for i ≠ t
//! ```
//!
//! Restricting to the non-target states gives `(I - P_sub) · h_sub = 1`. A
//! singular system (a non-target state that never leaves itself) is solved in
//! the least-squares sense instead of failing.
//!
//! ## Playlist Metrics
//!
//! - transition variance: variance of consecutive BPM jumps (lower is smoother)
//! - phase error: mean distance between each song's BPM and its phase target
//!
//! Both are compared against random-shuffle and sorted-by-BPM baselines.

use crate::error::{CadenceError, Result};
use crate::linalg::{solve, SolveMethod};
use crate::matrix::TransitionMatrix;
use crate::model::{base_transition, PhaseWeights};
use crate::plan::WorkoutPlan;
use crate::queue::PlaylistGenerator;
use crate::song::Song;
use crate::state::{StateRanges, WorkoutState, STATE_COUNT};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Expected steps to reach a target, indexed by state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HittingTimes {
    pub target: WorkoutState,
    pub steps: [f64; STATE_COUNT],
    /// Whether the singular-system fallback produced these values
    pub method: SolveMethod,
}

impl HittingTimes {
    /// Expected steps from `state` (0 for the target itself)
    #[must_use]
    pub fn from_state(&self, state: WorkoutState) -> f64 {
        self.steps[state.index()]
    }

    /// Values keyed by state name
    #[must_use]
    pub fn by_name(&self) -> BTreeMap<&'static str, f64> {
        WorkoutState::ALL.iter().map(|s| (s.name(), self.from_state(*s))).collect()
    }
}

impl Serialize for HittingTimes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Labeled {
            target: WorkoutState,
            least_squares: bool,
            steps: BTreeMap<&'static str, f64>,
        }
        Labeled {
            target: self.target,
            least_squares: self.method == SolveMethod::LeastSquares,
            steps: self.by_name(),
        }
        .serialize(serializer)
    }
}

/// Expected hitting times to `target` under the base chain.
///
/// Pure: depends on `matrix` and `target` only.
#[must_use]
pub fn hitting_times(matrix: &TransitionMatrix, target: WorkoutState) -> HittingTimes {
    let t = target.index();
    let others: Vec<usize> = (0..STATE_COUNT).filter(|&i| i != t).collect();
    let rows = matrix.rows();

    // A = I - P_sub, b = 1. The diagonal 1 - P[i][i] is taken as the row's
    // off-diagonal mass, which keeps it exact when P[i][i] rounds to 1.
    let a: Vec<Vec<f64>> = others
        .iter()
        .enumerate()
        .map(|(r, &i)| {
            let leave: f64 = (0..STATE_COUNT).filter(|&k| k != i).map(|k| rows[i][k]).sum();
            others
                .iter()
                .enumerate()
                .map(|(c, &j)| if r == c { leave } else { -rows[i][j] })
                .collect()
        })
        .collect();
    let b = vec![1.0; others.len()];

    let solution = solve(&a, &b);
    let mut steps = [0.0; STATE_COUNT];
    for (&i, value) in others.iter().zip(solution.values) {
        steps[i] = value;
    }
    debug!("Hitting times to {target}: {steps:?} ({:?})", solution.method);

    HittingTimes { target, steps, method: solution.method }
}

/// Index-based form of [`hitting_times`].
///
/// # Errors
///
/// Returns [`CadenceError::InvalidTarget`] if `target` is not a state index.
pub fn expected_hitting_time(matrix: &TransitionMatrix, target: usize) -> Result<[f64; STATE_COUNT]> {
    let state = WorkoutState::from_index(target)
        .ok_or(CadenceError::InvalidTarget { index: target, states: STATE_COUNT })?;
    Ok(hitting_times(matrix, state).steps)
}

/// Population variance of consecutive BPM differences. 0 for fewer than two songs.
#[must_use]
pub fn transition_variance(bpms: &[f64]) -> f64 {
    let diffs: Vec<f64> = bpms.windows(2).map(|w| w[1] - w[0]).collect();
    Summary::of(&diffs).map_or(0.0, |s| s.std_dev * s.std_dev)
}

/// Mean absolute error between each song's BPM and its slot's phase target.
///
/// Songs are matched to plan slots in order; surplus slots are ignored.
#[must_use]
pub fn phase_error(bpms: &[f64], plan: &WorkoutPlan, ranges: &StateRanges) -> f64 {
    let errors: Vec<f64> = bpms
        .iter()
        .zip(plan.slot_phases())
        .map(|(bpm, phase)| (bpm - ranges.target_bpm(phase)).abs())
        .collect();
    Summary::of(&errors).map_or(0.0, |s| s.mean)
}

/// Random shuffle baseline: up to `plan.total_slots()` distinct songs.
pub fn baseline_random<R: Rng + ?Sized>(catalog: &[Song], plan: &WorkoutPlan, rng: &mut R) -> Vec<Song> {
    let n = plan.total_slots().min(catalog.len());
    catalog.choose_multiple(rng, n).cloned().collect()
}

/// Sorted baseline: the lowest-BPM songs, ascending.
#[must_use]
pub fn baseline_sorted(catalog: &[Song], plan: &WorkoutPlan) -> Vec<Song> {
    let mut sorted = catalog.to_vec();
    sorted.sort_by(|a, b| a.bpm.total_cmp(&b.bpm));
    sorted.truncate(plan.total_slots());
    sorted
}

/// Mean and standard deviation of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl Summary {
    /// Population statistics; `None` for an empty sample
    #[must_use]
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self { mean, std_dev: variance.sqrt(), count: values.len() })
    }
}

/// Playlist construction strategies under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Strategy {
    Markov,
    Random,
    Sorted,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Markov, Strategy::Random, Strategy::Sorted];
}

/// Aggregated metrics of one strategy over all trials
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub variance: Summary,
    pub phase_error: Summary,
}

#[derive(Debug, Clone, Copy)]
struct TrialMetrics {
    variance: f64,
    phase_error: f64,
}

fn measure(songs: &[Song], plan: &WorkoutPlan, ranges: &StateRanges) -> TrialMetrics {
    let bpms: Vec<f64> = songs.iter().map(|s| s.bpm).collect();
    TrialMetrics { variance: transition_variance(&bpms), phase_error: phase_error(&bpms, plan, ranges) }
}

/// Compare the Markov generator with the baselines over `trials` trials.
///
/// Trials run in parallel. Each gets its own RNG seeded with `seed + trial`
/// and its own usage tracking; the catalog is shared read-only.
///
/// # Errors
///
/// Propagates configuration errors from the generator.
pub fn compare_strategies(
    catalog: &[Song],
    plan: &WorkoutPlan,
    generator: &PlaylistGenerator,
    ranges: &StateRanges,
    trials: usize,
    seed: u64,
) -> Result<Vec<StrategyReport>> {
    let per_trial: Vec<[TrialMetrics; 3]> = (0..trials)
        .into_par_iter()
        .map(|trial| -> Result<[TrialMetrics; 3]> {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(trial as u64));
            let markov = generator.generate_with_rng(catalog, plan, &mut rng)?;
            let markov_songs: Vec<Song> = markov.entries.into_iter().map(|e| e.song).collect();
            let random = baseline_random(catalog, plan, &mut rng);
            let sorted = baseline_sorted(catalog, plan);
            Ok([
                measure(&markov_songs, plan, ranges),
                measure(&random, plan, ranges),
                measure(&sorted, plan, ranges),
            ])
        })
        .collect::<Result<_>>()?;

    let reports = Strategy::ALL
        .iter()
        .enumerate()
        .map(|(k, &strategy)| {
            let variances: Vec<f64> = per_trial.iter().map(|m| m[k].variance).collect();
            let errors: Vec<f64> = per_trial.iter().map(|m| m[k].phase_error).collect();
            let empty = Summary { mean: 0.0, std_dev: 0.0, count: 0 };
            StrategyReport {
                strategy,
                variance: Summary::of(&variances).unwrap_or(empty),
                phase_error: Summary::of(&errors).unwrap_or(empty),
            }
        })
        .collect();

    info!("Compared strategies over {trials} trials");
    Ok(reports)
}

/// Effect of one temperature value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityPoint {
    pub tau: f64,
    /// Transition variance of a playlist generated at this temperature
    pub variance: f64,
    /// Expected steps warmup -> sprint under the base chain
    pub hitting_time: f64,
}

/// Default temperatures swept by [`sensitivity`]
pub const DEFAULT_SENSITIVITY_TAUS: [f64; 4] = [5.0, 10.0, 15.0, 20.0];

/// Sweep `taus`, recording playlist smoothness and warmup -> sprint hitting time.
///
/// # Errors
///
/// Fails on the first invalid temperature or missing phase weight.
pub fn sensitivity(
    catalog: &[Song],
    plan: &WorkoutPlan,
    weights: &PhaseWeights,
    taus: &[f64],
    seed: u64,
) -> Result<Vec<SensitivityPoint>> {
    let mut rng = StdRng::seed_from_u64(seed);
    taus.iter()
        .map(|&tau| -> Result<SensitivityPoint> {
            let generator = PlaylistGenerator::new(tau, weights.clone())?;
            let playlist = generator.generate_with_rng(catalog, plan, &mut rng)?;
            let base = base_transition(catalog, tau)?;
            let times = hitting_times(&base, WorkoutState::Sprint);
            Ok(SensitivityPoint {
                tau,
                variance: transition_variance(&playlist.bpms()),
                hitting_time: times.from_state(WorkoutState::Warmup),
            })
        })
        .collect()
}
