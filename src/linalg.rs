//! # Small Dense Linear Solves
//!
//! Systems here are at most `STATE_COUNT - 1` square, so a direct solver is
//! all that is needed:
//!
//! - Gaussian elimination with partial pivoting for well-conditioned systems
//! - minimum-norm least squares (pseudo-inverse through a Jacobi eigen
//!   decomposition of `AᵀA`) when the system is singular
//!
//! [`solve`] always returns a finite vector and reports which path produced it.

use log::warn;

/// Pivots smaller than this (relative to the largest entry) count as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Jacobi rotation sweeps before giving up on further convergence
const MAX_JACOBI_SWEEPS: usize = 100;

/// Off-diagonal mass (relative to the whole matrix) at which Jacobi stops
const JACOBI_TOLERANCE: f64 = 1e-24;

/// How a solution was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Unique solution via elimination
    Exact,
    /// Singular system; minimum-norm least-squares solution
    LeastSquares,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: Vec<f64>,
    pub method: SolveMethod,
}

/// Solve `a · x = b` for square `a`.
///
/// Falls back to least squares instead of failing when `a` is singular.
/// Non-finite entries in the answer are replaced with zero.
///
/// # Panics
///
/// Panics if `a` is not square or `b` does not match its size; callers in
/// this crate always build both from the same index set.
#[must_use]
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Solution {
    let n = b.len();
    assert!(a.len() == n && a.iter().all(|row| row.len() == n), "solve: dimension mismatch");

    if n == 0 {
        return Solution { values: Vec::new(), method: SolveMethod::Exact };
    }

    match gaussian_elimination(a, b) {
        Some(values) if values.iter().all(|v| v.is_finite()) => Solution { values, method: SolveMethod::Exact },
        _ => {
            warn!("Singular {n}x{n} system, using least-squares solution");
            let values = least_squares(a, b)
                .into_iter()
                .map(|v| if v.is_finite() { v } else { 0.0 })
                .collect();
            Solution { values, method: SolveMethod::LeastSquares }
        }
    }
}

fn max_abs(a: &[Vec<f64>]) -> f64 {
    a.iter().flatten().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Elimination with partial pivoting. `None` when a pivot vanishes.
fn gaussian_elimination(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let scale = max_abs(a);
    if scale == 0.0 {
        return None;
    }
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b)
        .map(|(row, rhs)| {
            let mut augmented = row.clone();
            augmented.push(*rhs);
            augmented
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot_row][col].abs() <= SINGULAR_TOLERANCE * scale {
            return None;
        }
        m.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }
    Some(x)
}

/// Minimum-norm least squares: `x = V · diag(1/λ) · Vᵀ · Aᵀb` over the
/// non-negligible eigenvalues `λ` of `AᵀA`.
fn least_squares(a: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    let mut ata = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            ata[i][j] = (0..n).map(|k| a[k][i] * a[k][j]).sum();
        }
    }
    let atb: Vec<f64> = (0..n).map(|i| (0..n).map(|k| a[k][i] * b[k]).sum()).collect();

    let (eigenvalues, eigenvectors) = jacobi_eigen(ata);
    let largest = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let cutoff = largest * SINGULAR_TOLERANCE.sqrt() * n as f64;

    let mut x = vec![0.0; n];
    for (k, &lambda) in eigenvalues.iter().enumerate() {
        if lambda.abs() <= cutoff || lambda == 0.0 {
            continue;
        }
        // Projection of Aᵀb onto eigenvector k, scaled by 1/λ
        let coeff: f64 = (0..n).map(|i| eigenvectors[i][k] * atb[i]).sum::<f64>() / lambda;
        for (i, xi) in x.iter_mut().enumerate() {
            *xi += coeff * eigenvectors[i][k];
        }
    }
    x
}

/// Cyclic Jacobi eigenvalue iteration for a symmetric matrix.
/// Returns eigenvalues and a matrix whose columns are the eigenvectors.
fn jacobi_eigen(mut s: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = s.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for _ in 0..MAX_JACOBI_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| s[i][j] * s[i][j])
            .sum();
        let total: f64 = s.iter().flatten().map(|v| v * v).sum();
        if off_diagonal <= JACOBI_TOLERANCE * total {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if s[p][q] == 0.0 {
                    continue;
                }
                let theta = (s[q][q] - s[p][p]) / (2.0 * s[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let sn = t * c;

                for k in 0..n {
                    let skp = s[k][p];
                    let skq = s[k][q];
                    s[k][p] = c * skp - sn * skq;
                    s[k][q] = sn * skp + c * skq;
                }
                for k in 0..n {
                    let spk = s[p][k];
                    let sqk = s[q][k];
                    s[p][k] = c * spk - sn * sqk;
                    s[q][k] = sn * spk + c * sqk;
                }
                for row in v.iter_mut() {
                    let vkp = row[p];
                    let vkq = row[q];
                    row[p] = c * vkp - sn * vkq;
                    row[q] = sn * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| s[i][i]).collect();
    (eigenvalues, v)
}
