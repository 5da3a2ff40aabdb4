//! Property-based checks of the model invariants.

use cadence::matrix::{row_normalize, ROW_SUM_TOLERANCE};
use cadence::model::{base_transition_from_centers, phase_transition, similarity_matrix};
use cadence::{classify_catalog, PlaylistGenerator, SongRecord, StateRanges, WorkoutPlan, WorkoutState, STATE_COUNT};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn assert_stochastic(rows: &[[f64; STATE_COUNT]; STATE_COUNT]) {
    for row in rows {
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() <= ROW_SUM_TOLERANCE, "row sums to {sum}");
        assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}

fn state_strategy() -> impl Strategy<Value = WorkoutState> {
    (0..STATE_COUNT).prop_map(|i| WorkoutState::ALL[i])
}

proptest! {
    #[test]
    fn row_normalize_is_stochastic(values in prop::array::uniform4(prop::array::uniform4(0.0..50.0f64))) {
        assert_stochastic(row_normalize(&values).rows());
    }

    #[test]
    fn similarity_is_symmetric_with_unit_diagonal(
        centers in prop::array::uniform4(60.0..220.0f64),
        tau in 0.5..50.0f64,
    ) {
        let grid = similarity_matrix(&centers, tau).unwrap();
        for i in 0..STATE_COUNT {
            prop_assert_eq!(grid[i][i], 1.0);
            for j in 0..STATE_COUNT {
                prop_assert_eq!(grid[i][j], grid[j][i]);
            }
        }
    }

    #[test]
    fn phase_matrices_stay_stochastic(
        centers in prop::array::uniform4(60.0..220.0f64),
        tau in 0.5..50.0f64,
        weights in prop::array::uniform4(0.01..5.0f64),
    ) {
        let base = base_transition_from_centers(&centers, tau).unwrap();
        assert_stochastic(base.rows());
        assert_stochastic(phase_transition(&base, &weights).rows());
    }

    #[test]
    fn generated_playlists_never_repeat(
        bpms in prop::collection::vec(70.0..200.0f64, 0..25),
        steps in prop::collection::vec((state_strategy(), 1usize..5), 1..5),
        seed in any::<u64>(),
    ) {
        let records: Vec<SongRecord> = bpms
            .iter()
            .enumerate()
            .map(|(i, bpm)| SongRecord::new(format!("s{i}"), "", "", *bpm))
            .collect();
        let catalog = classify_catalog(records, &StateRanges::default()).songs;
        let plan = WorkoutPlan::from_pairs(&steps).unwrap();

        let playlist = PlaylistGenerator::default()
            .generate_with_rng(&catalog, &plan, &mut StdRng::seed_from_u64(seed))
            .unwrap();

        prop_assert_eq!(playlist.len(), plan.total_slots().min(catalog.len()));
        prop_assert_eq!(playlist.path.len(), plan.total_slots() + 1);
        let mut ids = playlist.track_ids();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), playlist.len());
    }

    #[test]
    fn classification_respects_range_bounds(bpm in 0.0..1200.0f64) {
        let ranges = StateRanges::default();
        match ranges.classify(bpm) {
            Some(state) => prop_assert!(ranges.range(state).contains(bpm)),
            None => prop_assert!(!(80.0..1000.0).contains(&bpm)),
        }
    }
}
