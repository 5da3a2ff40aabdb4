//! # Transition Matrices
//!
//! Dense `STATE_COUNT x STATE_COUNT` row-stochastic matrices indexed by
//! [`WorkoutState`] in canonical order.
//!
//! A [`TransitionMatrix`] can only be obtained through [`row_normalize`] or
//! the validating [`TransitionMatrix::from_rows`], so every value of the type
//! has rows summing to 1 within [`ROW_SUM_TOLERANCE`] and entries in `[0, 1]`.

use crate::error::{CadenceError, Result};
use crate::state::{WorkoutState, STATE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw square matrix in canonical state order
pub type Grid = [[f64; STATE_COUNT]; STATE_COUNT];

/// Allowed deviation of a row sum from 1
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Row sums at or below this are treated as empty rows
pub const ZERO_ROW_EPSILON: f64 = 1e-12;

/// A row-stochastic matrix over workout states.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionMatrix {
    rows: Grid,
}

impl TransitionMatrix {
    /// Validate externally supplied rows.
    ///
    /// # Errors
    ///
    /// Returns [`CadenceError::NotStochastic`] for the first row with a
    /// negative or non-finite entry, or whose sum is not 1.
    pub fn from_rows(rows: Grid) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            let entries_ok = row.iter().all(|p| p.is_finite() && *p >= 0.0);
            if !entries_ok || (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(CadenceError::NotStochastic { row: i, sum });
            }
        }
        Ok(Self { rows })
    }

    /// Uniform transitions from every state
    #[must_use]
    pub fn uniform() -> Self {
        Self {
            rows: [[1.0 / STATE_COUNT as f64; STATE_COUNT]; STATE_COUNT],
        }
    }

    #[must_use]
    pub fn rows(&self) -> &Grid {
        &self.rows
    }

    /// Transition distribution out of `from`
    #[must_use]
    pub fn row(&self, from: WorkoutState) -> &[f64; STATE_COUNT] {
        &self.rows[from.index()]
    }

    /// Probability of moving `from` -> `to`
    #[must_use]
    pub fn get(&self, from: WorkoutState, to: WorkoutState) -> f64 {
        self.rows[from.index()][to.index()]
    }

    /// Labels plus values rounded to 4 decimals, for JSON export and plotting.
    #[must_use]
    pub fn labeled(&self) -> LabeledMatrix {
        LabeledMatrix {
            labels: WorkoutState::labels(),
            matrix: self
                .rows
                .iter()
                .map(|row| row.iter().map(|p| (p * 10_000.0).round() / 10_000.0).collect())
                .collect(),
        }
    }

    /// `from -> to -> probability` keyed by state names
    #[must_use]
    pub fn to_nested_map(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        WorkoutState::ALL
            .iter()
            .map(|from| {
                let row = WorkoutState::ALL
                    .iter()
                    .map(|to| (to.name().to_string(), self.get(*from, *to)))
                    .collect();
                (from.name().to_string(), row)
            })
            .collect()
    }
}

impl<'de> Deserialize<'de> for TransitionMatrix {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            rows: Grid,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::from_rows(raw.rows).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TransitionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>14}", "")?;
        for state in WorkoutState::ALL {
            write!(f, "{:>14}", state.name())?;
        }
        writeln!(f)?;
        for state in WorkoutState::ALL {
            write!(f, "{:>14}", state.name())?;
            for p in self.row(state) {
                write!(f, "{p:>14.3}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Serializable matrix with explicit state labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMatrix {
    pub labels: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

/// Divide each row by its sum.
///
/// A row whose sum is zero (or not a usable number) becomes uniform, so the
/// result is always row-stochastic and never contains NaN. Negative and
/// non-finite entries are clamped to zero first.
#[must_use]
pub fn row_normalize(grid: &Grid) -> TransitionMatrix {
    let mut rows = [[0.0; STATE_COUNT]; STATE_COUNT];
    for (out, row) in rows.iter_mut().zip(grid.iter()) {
        let cleaned = (*row).map(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 });
        let sum: f64 = cleaned.iter().sum();
        if sum > ZERO_ROW_EPSILON && sum.is_finite() {
            for (o, v) in out.iter_mut().zip(cleaned) {
                *o = v / sum;
            }
        } else {
            *out = [1.0 / STATE_COUNT as f64; STATE_COUNT];
        }
    }
    TransitionMatrix { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_stochastic(m: &TransitionMatrix) {
        for row in m.rows() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() <= ROW_SUM_TOLERANCE, "row sums to {sum}");
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_row_normalize_scales_rows() {
        let grid = [
            [1.0, 1.0, 2.0, 0.0],
            [0.0, 5.0, 0.0, 0.0],
            [3.0, 3.0, 3.0, 3.0],
            [0.1, 0.2, 0.3, 0.4],
        ];
        let m = row_normalize(&grid);
        assert_stochastic(&m);
        assert_eq!(m.rows()[0], [0.25, 0.25, 0.5, 0.0]);
        assert_eq!(m.rows()[1], [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_row_becomes_uniform() {
        let grid = [
            [0.0; STATE_COUNT],
            [f64::NAN, f64::NAN, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
        ];
        let m = row_normalize(&grid);
        assert_stochastic(&m);
        assert_eq!(m.rows()[0], [0.25; STATE_COUNT]);
        assert_eq!(m.rows()[1], [0.25; STATE_COUNT]);
        assert_eq!(m.rows()[3], [0.25; STATE_COUNT]);
    }

    #[test]
    fn test_from_rows_validates() {
        assert!(TransitionMatrix::from_rows(*TransitionMatrix::uniform().rows()).is_ok());

        let mut bad = *TransitionMatrix::uniform().rows();
        bad[2][0] = 0.5;
        assert!(matches!(
            TransitionMatrix::from_rows(bad),
            Err(CadenceError::NotStochastic { row: 2, .. })
        ));
    }

    #[test]
    fn test_labeled_export() {
        let grid = [
            [1.0, 2.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let labeled = row_normalize(&grid).labeled();
        assert_eq!(labeled.labels, vec!["warmup", "steady_state", "push_pace", "sprint"]);
        assert_eq!(labeled.matrix[0], vec![0.3333, 0.6667, 0.0, 0.0]);

        let nested = row_normalize(&grid).to_nested_map();
        assert_eq!(nested["push_pace"]["push_pace"], 1.0);
    }

    #[test]
    fn test_serde_rejects_non_stochastic() {
        let json = serde_json::to_string(&TransitionMatrix::uniform()).unwrap();
        let back: TransitionMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TransitionMatrix::uniform());

        let bad = r#"{"rows":[[1,1,0,0],[1,0,0,0],[1,0,0,0],[1,0,0,0]]}"#;
        assert!(serde_json::from_str::<TransitionMatrix>(bad).is_err());
    }
}
