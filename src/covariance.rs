//! Covariance and correlation estimators.
//!
//! The Ledoit-Wolf estimator matches scikit-learn's
//! `sklearn.covariance.LedoitWolf` (centred data, biased empirical
//! covariance, scaled-identity target).
//!
//! # References
//!
//! - O. Ledoit, M. Wolf, "A well-conditioned estimator for large-dimensional
//!   covariance matrices", J. Multivariate Analysis 88 (2004).
//! - scikit-learn source: `sklearn/covariance/_shrunk_covariance.py`

use crate::error::{Error, Result};
use crate::prices::column_means;

/// Dense square matrix, row-major.
pub type Matrix = Vec<Vec<f64>>;

/// Which covariance estimate feeds the optimizers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Estimator {
    /// Unbiased sample covariance (n - 1).
    Sample,
    /// Ledoit-Wolf shrinkage toward `mu * I`.
    #[default]
    LedoitWolf,
}

impl Estimator {
    pub fn estimate(self, rows: &[Vec<f64>]) -> Result<Matrix> {
        match self {
            Estimator::Sample => sample_covariance(rows),
            Estimator::LedoitWolf => ledoit_wolf(rows).map(|s| s.covariance),
        }
    }
}

/// A shrunk covariance matrix and the intensity that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Shrunk {
    pub covariance: Matrix,
    /// Weight on the identity target, in `[0, 1]`.
    pub shrinkage: f64,
}

/// Validate an observations × assets matrix; returns `(rows, cols)`.
pub(crate) fn check_shape(rows: &[Vec<f64>], min_rows: usize) -> Result<(usize, usize)> {
    if rows.len() < min_rows {
        return Err(Error::InsufficientData {
            needed: min_rows,
            got: rows.len(),
        });
    }
    let cols = rows.first().map_or(0, Vec::len);
    if cols == 0 {
        return Err(Error::EmptyUniverse);
    }
    for row in rows {
        if row.len() != cols {
            return Err(Error::ShapeMismatch(format!(
                "row has {} values, expected {cols}",
                row.len()
            )));
        }
        if row.iter().any(|x| !x.is_finite()) {
            return Err(Error::NonFinite("returns"));
        }
    }
    Ok((rows.len(), cols))
}

fn centered(rows: &[Vec<f64>]) -> Matrix {
    let means = column_means(rows);
    rows.iter()
        .map(|row| row.iter().zip(&means).map(|(x, m)| x - m).collect())
        .collect()
}

/// `XᵀX / denom` for an already-centred matrix.
fn scatter(x: &[Vec<f64>], denom: f64) -> Matrix {
    let cols = x[0].len();
    let mut cov = vec![vec![0.0; cols]; cols];
    for row in x {
        for i in 0..cols {
            let di = row[i];
            for j in i..cols {
                cov[i][j] += di * row[j];
            }
        }
    }
    for i in 0..cols {
        for j in i..cols {
            let v = cov[i][j] / denom;
            cov[i][j] = v;
            cov[j][i] = v;
        }
    }
    cov
}

/// Unbiased sample covariance of the columns.
pub fn sample_covariance(rows: &[Vec<f64>]) -> Result<Matrix> {
    let (n, _) = check_shape(rows, 2)?;
    Ok(scatter(&centered(rows), (n - 1) as f64))
}

/// Ledoit-Wolf shrunk covariance.
///
/// Requires at least two observations. A single asset gets its (biased)
/// variance and zero shrinkage.
pub fn ledoit_wolf(rows: &[Vec<f64>]) -> Result<Shrunk> {
    let (n, p) = check_shape(rows, 2)?;
    let x = centered(rows);
    let nf = n as f64;
    let pf = p as f64;

    let emp = scatter(&x, nf);
    if p == 1 {
        return Ok(Shrunk {
            covariance: emp,
            shrinkage: 0.0,
        });
    }

    let trace: f64 = (0..p).map(|i| emp[i][i]).sum();
    let mu = trace / pf;

    // beta_ = sum((X²)ᵀ X²) = Σ_t (Σ_i x_ti²)²
    let beta_raw: f64 = x
        .iter()
        .map(|row| row.iter().map(|v| v * v).sum::<f64>().powi(2))
        .sum();
    // delta_ = sum((XᵀX)²) / n² = Σ_ij emp_ij²
    let delta_raw: f64 = emp.iter().flatten().map(|v| v * v).sum();

    let beta = (beta_raw / nf - delta_raw) / (pf * nf);
    let delta = (delta_raw - 2.0 * mu * trace + pf * mu * mu) / pf;
    let beta = beta.min(delta);

    let shrinkage = if beta <= 0.0 || delta <= 0.0 {
        0.0
    } else {
        (beta / delta).clamp(0.0, 1.0)
    };

    let mut covariance = emp;
    for (i, row) in covariance.iter_mut().enumerate() {
        for v in row.iter_mut() {
            *v *= 1.0 - shrinkage;
        }
        row[i] += shrinkage * mu;
    }

    Ok(Shrunk {
        covariance,
        shrinkage,
    })
}

/// Correlation matrix from a covariance matrix.
///
/// Correlation with a zero-variance asset is undefined and comes back as
/// NaN off the diagonal. [`correlation_distance`] maps it to 0, so constant
/// assets join the first cluster they meet.
pub fn correlation(cov: &[Vec<f64>]) -> Matrix {
    let n = cov.len();
    let sd: Vec<f64> = (0..n).map(|i| cov[i][i].max(0.0).sqrt()).collect();
    let mut corr = vec![vec![0.0; n]; n];
    for i in 0..n {
        corr[i][i] = 1.0;
        for j in (i + 1)..n {
            let denom = sd[i] * sd[j];
            let rho = if denom > 0.0 {
                (cov[i][j] / denom).clamp(-1.0, 1.0)
            } else {
                f64::NAN
            };
            corr[i][j] = rho;
            corr[j][i] = rho;
        }
    }
    corr
}

/// Correlation distance `sqrt((1 - rho) / 2)`, in `[0, 1]`.
pub fn correlation_distance(corr: &[Vec<f64>]) -> Matrix {
    corr.iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, rho)| {
                    if i == j || !rho.is_finite() {
                        0.0
                    } else {
                        ((1.0 - rho) / 2.0).max(0.0).sqrt()
                    }
                })
                .collect()
        })
        .collect()
}

pub(crate) fn mat_vec_mul(matrix: &[Vec<f64>], vec: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(vec).map(|(a, b)| a * b).sum::<f64>())
        .collect()
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `wᵀ Σ w`.
pub fn portfolio_variance(cov: &[Vec<f64>], w: &[f64]) -> f64 {
    dot(w, &mat_vec_mul(cov, w))
}

/// Principal sub-matrix over `items`.
pub(crate) fn sub_matrix(cov: &[Vec<f64>], items: &[usize]) -> Matrix {
    items
        .iter()
        .map(|&i| items.iter().map(|&j| cov[i][j]).collect())
        .collect()
}
