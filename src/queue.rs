//! # Playlist Generation
//!
//! Maps a simulated state path onto concrete songs.
//!
//! ## Song Selection
//!
//! For each slot the selector looks at catalog songs not yet used in this
//! generation call and
//!
//! 1. picks uniformly among those classified in the requested state, or
//! 2. falls back to a uniform pick among *all* unused songs, or
//! 3. reports the catalog as exhausted, leaving the slot unfilled.
//!
//! A song id is never selected twice within one call.
//!
//! ## Orchestration
//!
//! [`PlaylistGenerator`] builds the base matrix, one phase matrix per plan
//! step (repeated for each of its slots), simulates the path from
//! [`START_STATE`], and selects a song per step. A short catalog yields a
//! short playlist, never an error; compare [`Playlist::len`] with
//! [`Playlist::planned_slots`].

use crate::chain::{simulate, StatePath, START_STATE};
use crate::error::Result;
use crate::matrix::TransitionMatrix;
use crate::model::{base_transition, phase_transition_for, validate_tau, PhaseWeights, DEFAULT_TAU};
use crate::plan::WorkoutPlan;
use crate::song::Song;
use crate::state::WorkoutState;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;

/// Ids consumed during one generation call. Never shared between calls.
pub type UsedSongSet = HashSet<String>;

/// Outcome of selecting a song for one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a> {
    /// Song classified in the requested state
    Matched(&'a Song),
    /// No unused song in the requested state; any unused song instead
    Fallback(&'a Song),
    /// Every song has been used
    Exhausted,
}

impl<'a> Selection<'a> {
    #[must_use]
    pub fn song(self) -> Option<&'a Song> {
        match self {
            Selection::Matched(song) | Selection::Fallback(song) => Some(song),
            Selection::Exhausted => None,
        }
    }
}

/// Select a song for `state` from the unused part of `catalog`.
///
/// Does not record the pick; the caller adds the id to `used_ids`.
pub fn select<'a, R: Rng + ?Sized>(
    catalog: &'a [Song],
    state: WorkoutState,
    used_ids: &UsedSongSet,
    rng: &mut R,
) -> Selection<'a> {
    let unused: Vec<&Song> = catalog.iter().filter(|s| !used_ids.contains(&s.id)).collect();

    let matching: Vec<&Song> = unused.iter().copied().filter(|s| s.state == Some(state)).collect();
    if let Some(&song) = matching.choose(rng) {
        return Selection::Matched(song);
    }

    match unused.choose(rng) {
        Some(&song) => Selection::Fallback(song),
        None => Selection::Exhausted,
    }
}

/// [`select`] collapsed to "a song or nothing".
pub fn pick<'a, R: Rng + ?Sized>(
    catalog: &'a [Song],
    state: WorkoutState,
    used_ids: &UsedSongSet,
    rng: &mut R,
) -> Option<&'a Song> {
    select(catalog, state, used_ids, rng).song()
}

/// One filled playlist slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistEntry {
    pub song: Song,
    /// State drawn by the chain for this slot
    pub requested: WorkoutState,
    /// Phase of the plan step this slot belongs to
    pub phase: WorkoutState,
    /// True when the song came from the fallback pool
    pub fallback: bool,
}

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
    pub path: StatePath,
    pub planned_slots: usize,
}

impl Playlist {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots left unfilled because the catalog ran out
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.planned_slots - self.entries.len()
    }

    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.entries.iter().filter(|e| e.fallback).count()
    }

    /// Track ids in order, for downstream playlist creation
    #[must_use]
    pub fn track_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.song.id.clone()).collect()
    }

    #[must_use]
    pub fn songs(&self) -> Vec<&Song> {
        self.entries.iter().map(|e| &e.song).collect()
    }

    #[must_use]
    pub fn bpms(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.song.bpm).collect()
    }
}

/// Builds playlists from a catalog, a weight table and a temperature.
#[derive(Debug, Clone)]
pub struct PlaylistGenerator {
    tau: f64,
    weights: PhaseWeights,
}

impl Default for PlaylistGenerator {
    fn default() -> Self {
        Self { tau: DEFAULT_TAU, weights: PhaseWeights::default() }
    }
}

impl PlaylistGenerator {
    /// # Errors
    ///
    /// Returns [`crate::CadenceError::InvalidTemperature`] for `tau <= 0`.
    pub fn new(tau: f64, weights: PhaseWeights) -> Result<Self> {
        validate_tau(tau)?;
        Ok(Self { tau, weights })
    }

    #[must_use]
    pub fn tau(&self) -> f64 {
        self.tau
    }

    #[must_use]
    pub fn weights(&self) -> &PhaseWeights {
        &self.weights
    }

    /// One matrix per slot: each step's phase matrix, repeated `count` times.
    ///
    /// # Errors
    ///
    /// Fails fast when a plan phase has no weight vector.
    pub fn slot_matrices(&self, base: &TransitionMatrix, plan: &WorkoutPlan) -> Result<Vec<TransitionMatrix>> {
        let mut matrices = Vec::with_capacity(plan.total_slots());
        for step in plan.steps() {
            let phase_matrix = phase_transition_for(base, &self.weights, step.phase)?;
            matrices.extend(std::iter::repeat(phase_matrix).take(step.count));
        }
        Ok(matrices)
    }

    /// Generate a playlist with the supplied random source.
    ///
    /// # Errors
    ///
    /// Configuration problems (missing phase weights) are reported before
    /// any randomness is consumed. Sparse or exhausted catalogs are not
    /// errors.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        catalog: &[Song],
        plan: &WorkoutPlan,
        rng: &mut R,
    ) -> Result<Playlist> {
        let base = base_transition(catalog, self.tau)?;
        let matrices = self.slot_matrices(&base, plan)?;
        let path = simulate(&matrices, START_STATE, rng);

        let mut used = UsedSongSet::new();
        let mut entries = Vec::with_capacity(matrices.len());
        let mut exhausted_at = None;

        for (slot, (&requested, phase)) in path.steps().iter().zip(plan.slot_phases()).enumerate() {
            match select(catalog, requested, &used, rng) {
                Selection::Matched(song) => {
                    used.insert(song.id.clone());
                    entries.push(PlaylistEntry { song: song.clone(), requested, phase, fallback: false });
                }
                Selection::Fallback(song) => {
                    debug!("Slot {slot}: no unused {requested} song, falling back to '{}'", song.id);
                    used.insert(song.id.clone());
                    entries.push(PlaylistEntry { song: song.clone(), requested, phase, fallback: true });
                }
                Selection::Exhausted => {
                    exhausted_at.get_or_insert(slot);
                }
            }
        }

        if let Some(slot) = exhausted_at {
            warn!(
                "Catalog exhausted at slot {slot}: {} of {} slots filled",
                entries.len(),
                matrices.len()
            );
        }
        info!("Generated playlist with {} songs for plan {}", entries.len(), plan);

        Ok(Playlist { entries, path, planned_slots: matrices.len() })
    }

    /// Generate with the thread-local random source.
    ///
    /// # Errors
    ///
    /// See [`PlaylistGenerator::generate_with_rng`].
    pub fn generate(&self, catalog: &[Song], plan: &WorkoutPlan) -> Result<Playlist> {
        self.generate_with_rng(catalog, plan, &mut rand::thread_rng())
    }
}

/// End-to-end generation with default phase weights.
///
/// # Errors
///
/// Returns an error for an invalid `tau`.
pub fn generate(catalog: &[Song], plan: &WorkoutPlan, tau: f64) -> Result<Vec<Song>> {
    let playlist = PlaylistGenerator::new(tau, PhaseWeights::default())?.generate(catalog, plan)?;
    Ok(playlist.entries.into_iter().map(|e| e.song).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn song(id: &str, bpm: f64, state: Option<WorkoutState>) -> Song {
        Song {
            id: id.to_string(),
            name: format!("Song {id}"),
            artists: "Test Artist".to_string(),
            duration: Some(200.0),
            bpm,
            energy: None,
            danceability: None,
            state,
        }
    }

    fn balanced_catalog() -> Vec<Song> {
        vec![
            song("w1", 94.0, Some(WorkoutState::Warmup)),
            song("w2", 96.0, Some(WorkoutState::Warmup)),
            song("s1", 124.0, Some(WorkoutState::SteadyState)),
            song("s2", 126.0, Some(WorkoutState::SteadyState)),
            song("p1", 154.0, Some(WorkoutState::PushPace)),
            song("p2", 156.0, Some(WorkoutState::PushPace)),
            song("r1", 184.0, Some(WorkoutState::Sprint)),
            song("r2", 186.0, Some(WorkoutState::Sprint)),
        ]
    }

    #[test]
    fn test_select_prefers_matching_state() {
        let catalog = balanced_catalog();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            match select(&catalog, WorkoutState::PushPace, &UsedSongSet::new(), &mut rng) {
                Selection::Matched(song) => assert_eq!(song.state, Some(WorkoutState::PushPace)),
                other => panic!("expected a matched song, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_fallback_when_state_is_empty() {
        let catalog: Vec<Song> = balanced_catalog().into_iter().filter(|s| s.state != Some(WorkoutState::Sprint)).collect();
        let mut rng = StdRng::seed_from_u64(9);
        let selection = select(&catalog, WorkoutState::Sprint, &UsedSongSet::new(), &mut rng);
        assert!(matches!(selection, Selection::Fallback(_)));
        assert!(pick(&catalog, WorkoutState::Sprint, &UsedSongSet::new(), &mut rng).is_some());
    }

    #[test]
    fn test_fallback_when_state_is_used_up() {
        let catalog = balanced_catalog();
        let used: UsedSongSet = ["r1", "r2"].iter().map(|s| s.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(9);
        let selection = select(&catalog, WorkoutState::Sprint, &used, &mut rng);
        let Selection::Fallback(song) = selection else {
            panic!("expected fallback, got {selection:?}");
        };
        assert!(!used.contains(&song.id));
    }

    #[test]
    fn test_exhausted_returns_nothing() {
        let catalog = balanced_catalog();
        let used: UsedSongSet = catalog.iter().map(|s| s.id.clone()).collect();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select(&catalog, WorkoutState::Warmup, &used, &mut rng), Selection::Exhausted);
        assert!(pick(&[], WorkoutState::Warmup, &UsedSongSet::new(), &mut rng).is_none());
    }

    #[test]
    fn test_selection_is_roughly_uniform() {
        let catalog = balanced_catalog();
        let mut rng = StdRng::seed_from_u64(77);
        let mut first = 0;
        let draws = 4_000;
        for _ in 0..draws {
            if pick(&catalog, WorkoutState::Warmup, &UsedSongSet::new(), &mut rng).map(|s| s.id.as_str()) == Some("w1") {
                first += 1;
            }
        }
        let share = f64::from(first) / f64::from(draws);
        assert!((share - 0.5).abs() < 0.05, "w1 share {share}");
    }

    #[test]
    fn test_generate_never_repeats() {
        let catalog = balanced_catalog();
        let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 3), (WorkoutState::Sprint, 3)]).unwrap();
        let generator = PlaylistGenerator::default();
        for seed in 0..30 {
            let playlist = generator.generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(seed)).unwrap();
            let ids: HashSet<_> = playlist.track_ids().into_iter().collect();
            assert_eq!(ids.len(), playlist.len());
            assert_eq!(playlist.len(), 6);
        }
    }

    #[test]
    fn test_short_catalog_gives_short_playlist() {
        let catalog: Vec<Song> = balanced_catalog().into_iter().take(3).collect();
        let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 2), (WorkoutState::SteadyState, 3)]).unwrap();
        let playlist = PlaylistGenerator::default()
            .generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(playlist.len(), 3);
        assert_eq!(playlist.planned_slots, 5);
        assert_eq!(playlist.skipped(), 2);
        assert_eq!(playlist.path.len(), 6);
    }

    #[test]
    fn test_path_reproducible_with_seed() {
        let catalog = balanced_catalog();
        let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 1), (WorkoutState::SteadyState, 2), (WorkoutState::Sprint, 1)]).unwrap();
        let generator = PlaylistGenerator::default();
        let a = generator.generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = generator.generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.path, b.path);
        assert_eq!(a.track_ids(), b.track_ids());
    }

    #[test]
    fn test_entries_carry_requested_state_or_fallback() {
        let catalog = balanced_catalog();
        let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 1), (WorkoutState::SteadyState, 2), (WorkoutState::Sprint, 1)]).unwrap();
        let playlist = PlaylistGenerator::default()
            .generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(12))
            .unwrap();
        assert_eq!(playlist.path.steps().len(), 4);
        for (entry, state) in playlist.entries.iter().zip(playlist.path.steps()) {
            assert_eq!(entry.requested, *state);
            assert!(entry.fallback || entry.song.state == Some(*state));
        }
    }

    #[test]
    fn test_missing_phase_weights_fail_before_generation() {
        let weights = PhaseWeights::empty().with_phase(WorkoutState::Warmup, [1.0; 4]).unwrap();
        let generator = PlaylistGenerator::new(12.0, weights).unwrap();
        let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 1), (WorkoutState::Sprint, 1)]).unwrap();
        assert!(generator.generate_with_rng(&balanced_catalog(), &plan, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_generate_rejects_bad_tau() {
        let plan = WorkoutPlan::from_pairs(&[(WorkoutState::Warmup, 1)]).unwrap();
        assert!(generate(&balanced_catalog(), &plan, 0.0).is_err());
        assert_eq!(generate(&balanced_catalog(), &plan, 12.0).unwrap().len(), 1);
    }
}
