//! Long-only portfolio optimizers.
//!
//! Every optimizer here returns weights that are finite, non-negative,
//! aligned with the input column order and sum to 1. Bounds are expressed as
//! a single per-asset cap (`0 <= w_i <= max_weight`).
//!
//! - [`max_sharpe`]: mean-variance tangency portfolio under the bounds,
//! - [`min_variance`]: minimum-variance portfolio under the bounds,
//! - [`hrp`]: Hierarchical Risk Parity (López de Prado, 2016).

use log::debug;

use crate::cluster::single_linkage;
use crate::covariance::{
    Estimator, check_shape, correlation, correlation_distance, dot, mat_vec_mul,
    portfolio_variance, sample_covariance, sub_matrix,
};
use crate::error::{Error, Result};
use crate::prices::{ReturnMatrix, column_means};
use crate::ticker::Ticker;

const MAX_ITERS: usize = 5_000;
const MIN_STEP: f64 = 1e-12;

/// Which optimizer to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Method {
    /// Maximum Sharpe ratio.
    #[default]
    Sharpe,
    /// Minimum variance.
    #[cfg_attr(feature = "serde", serde(alias = "min_variance"))]
    MinVariance,
    /// Hierarchical Risk Parity.
    Hrp,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Sharpe => write!(f, "sharpe"),
            Method::MinVariance => write!(f, "min-variance"),
            Method::Hrp => write!(f, "hrp"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharpe" | "max-sharpe" | "max_sharpe" => Ok(Method::Sharpe),
            "min-variance" | "min_variance" | "minvar" => Ok(Method::MinVariance),
            "hrp" => Ok(Method::Hrp),
            other => Err(Error::InvalidParameter(format!("unknown method '{other}'"))),
        }
    }
}

/// Optimizer settings shared by all methods.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Params {
    pub method: Method,
    /// Risk-free rate per return period (Sharpe only).
    pub risk_free: f64,
    /// Upper bound on each weight, in `(0, 1]`.
    pub max_weight: f64,
    pub estimator: Estimator,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            method: Method::Sharpe,
            risk_free: 0.0,
            max_weight: 1.0,
            estimator: Estimator::LedoitWolf,
        }
    }
}

/// Run the configured optimizer over a return matrix.
///
/// Returns `(ticker, weight)` pairs in the matrix's column order. HRP has no
/// native bound, so its weights are capped afterwards with [`cap_weights`].
pub fn optimize(returns: &ReturnMatrix, params: &Params) -> Result<Vec<(Ticker, f64)>> {
    let rows = returns.rows();
    let weights = match params.method {
        Method::Sharpe => max_sharpe(rows, params.risk_free, params.max_weight, params.estimator)?,
        Method::MinVariance => min_variance(rows, params.max_weight, params.estimator)?,
        Method::Hrp => cap_weights(&hrp(rows, params.estimator)?, params.max_weight)?,
    };
    Ok(returns.tickers().iter().copied().zip(weights).collect())
}

/// Long-only maximum-Sharpe weights with a per-asset cap.
///
/// Maximises `(w·mu - rf) / sqrt(wᵀΣw)` by projected gradient ascent with
/// backtracking. When no asset beats the risk-free rate the Sharpe ratio has
/// no meaningful maximum and the minimum-variance portfolio is returned.
pub fn max_sharpe(
    returns: &[Vec<f64>],
    risk_free: f64,
    max_weight: f64,
    estimator: Estimator,
) -> Result<Vec<f64>> {
    let (_rows, cols) = check_shape(returns, 2)?;
    check_cap(max_weight, cols)?;
    if cols == 1 {
        return Ok(vec![1.0]);
    }

    let excess: Vec<f64> = column_means(returns)
        .into_iter()
        .map(|m| m - risk_free)
        .collect();
    let cov = estimator.estimate(returns)?;

    if excess.iter().all(|x| *x <= 0.0) {
        debug!("no asset has positive excess return; falling back to min variance");
        return Ok(minimize_variance(&cov, max_weight));
    }

    let sharpe = |w: &[f64]| {
        let var = portfolio_variance(&cov, w);
        if var <= 0.0 {
            return f64::NEG_INFINITY;
        }
        dot(w, &excess) / var.sqrt()
    };

    let w = ascend(equal_weights(cols), max_weight, sharpe, |w| {
        let sigma_w = mat_vec_mul(&cov, w);
        let var = dot(w, &sigma_w).max(1e-18);
        let vol = var.sqrt();
        let num = dot(w, &excess);
        excess
            .iter()
            .zip(&sigma_w)
            .map(|(a, sw)| a / vol - num * sw / (var * vol))
            .collect()
    });
    Ok(normalize_long_only(w))
}

/// Long-only minimum-variance weights with a per-asset cap.
pub fn min_variance(returns: &[Vec<f64>], max_weight: f64, estimator: Estimator) -> Result<Vec<f64>> {
    let (_rows, cols) = check_shape(returns, 2)?;
    check_cap(max_weight, cols)?;
    if cols == 1 {
        return Ok(vec![1.0]);
    }
    let cov = estimator.estimate(returns)?;
    Ok(minimize_variance(&cov, max_weight))
}

fn minimize_variance(cov: &[Vec<f64>], max_weight: f64) -> Vec<f64> {
    let n = cov.len();
    let w = ascend(
        equal_weights(n),
        max_weight,
        |w| -portfolio_variance(cov, w),
        |w| mat_vec_mul(cov, w).into_iter().map(|g| -2.0 * g).collect(),
    );
    normalize_long_only(w)
}

/// Projected gradient ascent on the capped simplex.
///
/// The gradient is rescaled to unit max-norm and the step length adapts:
/// it grows after an improving step and halves otherwise, so the objective
/// never decreases.
fn ascend<F, G>(start: Vec<f64>, cap: f64, objective: F, gradient: G) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
    G: Fn(&[f64]) -> Vec<f64>,
{
    let mut w = project_capped_simplex(&start, cap);
    let mut best = objective(&w);
    let mut step = 0.25_f64;

    for _ in 0..MAX_ITERS {
        let grad = gradient(&w);
        let scale = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
        if !scale.is_finite() || scale == 0.0 {
            break;
        }

        let candidate: Vec<f64> = w
            .iter()
            .zip(&grad)
            .map(|(wi, gi)| wi + step * gi / scale)
            .collect();
        let candidate = project_capped_simplex(&candidate, cap);
        let value = objective(&candidate);

        if value > best {
            let moved = squared_distance(&candidate, &w);
            w = candidate;
            best = value;
            step = (step * 1.5).min(1.0);
            if moved < 1e-24 {
                break;
            }
        } else {
            step *= 0.5;
            if step < MIN_STEP {
                break;
            }
        }
    }

    w
}

/// Hierarchical Risk Parity weights.
///
/// 1. Correlation distance `sqrt((1 - rho) / 2)` from the sample correlation.
/// 2. Single-linkage clustering, leaves taken in dendrogram order.
/// 3. Recursive bisection of that order: each half gets
///    `1 - v_half / (v_left + v_right)` of its parent's weight, where `v` is
///    the inverse-variance portfolio variance of the half under the
///    estimator's covariance.
pub fn hrp(returns: &[Vec<f64>], estimator: Estimator) -> Result<Vec<f64>> {
    let (_rows, cols) = check_shape(returns, 2)?;
    if cols == 1 {
        return Ok(vec![1.0]);
    }

    let corr = correlation(&sample_covariance(returns)?);
    let link = single_linkage(&correlation_distance(&corr))?;
    let order = link.leaves_order();
    let cov = estimator.estimate(returns)?;

    Ok(normalize_long_only(recursive_bisection(&cov, &order)))
}

/// Split `order` in halves top-down, allocating by inverse cluster variance.
pub fn recursive_bisection(cov: &[Vec<f64>], order: &[usize]) -> Vec<f64> {
    let mut w = vec![0.0; cov.len()];
    for &i in order {
        w[i] = 1.0;
    }

    let mut clusters: Vec<&[usize]> = vec![order];
    while let Some(cluster) = clusters.pop() {
        if cluster.len() <= 1 {
            continue;
        }
        let (left, right) = cluster.split_at(cluster.len() / 2);
        let v_left = cluster_variance(cov, left);
        let v_right = cluster_variance(cov, right);
        let total = v_left + v_right;
        let alpha = if total > 0.0 && total.is_finite() {
            1.0 - v_left / total
        } else {
            0.5
        };

        for &i in left {
            w[i] *= alpha;
        }
        for &i in right {
            w[i] *= 1.0 - alpha;
        }
        clusters.push(right);
        clusters.push(left);
    }
    w
}

/// Variance of the inverse-variance portfolio over `items`.
fn cluster_variance(cov: &[Vec<f64>], items: &[usize]) -> f64 {
    let sub = sub_matrix(cov, items);
    let w = inverse_variance(&sub);
    portfolio_variance(&sub, &w)
}

/// Inverse-variance weights from the covariance diagonal.
///
/// Zero-variance assets would take everything; they are floored at a tiny
/// variance so the result stays finite.
pub fn inverse_variance(cov: &[Vec<f64>]) -> Vec<f64> {
    let inv: Vec<f64> = (0..cov.len())
        .map(|i| 1.0 / cov[i][i].max(1e-18))
        .collect();
    normalize_long_only(inv)
}

/// Scale weights by per-asset multipliers and renormalise.
///
/// Used to favor sectors the macro scenario likes.
pub fn apply_tilt(weights: &[f64], multipliers: &[f64]) -> Result<Vec<f64>> {
    if weights.len() != multipliers.len() {
        return Err(Error::ShapeMismatch(format!(
            "{} weights but {} multipliers",
            weights.len(),
            multipliers.len()
        )));
    }
    if multipliers.iter().any(|m| !m.is_finite() || *m < 0.0) {
        return Err(Error::InvalidParameter(
            "tilt multipliers must be finite and non-negative".into(),
        ));
    }
    let tilted: Vec<f64> = weights.iter().zip(multipliers).map(|(w, m)| w * m).collect();
    Ok(normalize_long_only(tilted))
}

/// Enforce `w_i <= cap` while keeping `sum w = 1`.
///
/// Weights above the cap are pinned to it and the excess is redistributed
/// over the remaining assets in proportion to their weight, repeating until
/// nothing exceeds the cap.
pub fn cap_weights(weights: &[f64], cap: f64) -> Result<Vec<f64>> {
    check_cap(cap, weights.len())?;
    let mut w = normalize_long_only(weights.to_vec());
    let n = w.len();
    let mut pinned = vec![false; n];

    for _ in 0..n {
        let over: Vec<usize> = (0..n).filter(|&i| !pinned[i] && w[i] > cap + 1e-12).collect();
        if over.is_empty() {
            break;
        }
        for &i in &over {
            pinned[i] = true;
            w[i] = cap;
        }

        let remaining = 1.0 - cap * pinned.iter().filter(|p| **p).count() as f64;
        let free: Vec<usize> = (0..n).filter(|&i| !pinned[i]).collect();
        let free_sum: f64 = free.iter().map(|&i| w[i]).sum();
        if free.is_empty() {
            break;
        }
        for &i in &free {
            w[i] = if free_sum > 1e-15 {
                w[i] / free_sum * remaining
            } else {
                remaining / free.len() as f64
            };
        }
    }

    Ok(w)
}

/// Euclidean projection onto `{w : sum w = 1, 0 <= w_i <= cap}`.
///
/// Solves for the shift `theta` with `sum clamp(v_i - theta, 0, cap) = 1`
/// by bisection. Requires `cap * n >= 1`.
pub fn project_capped_simplex(v: &[f64], cap: f64) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }
    let cap = cap.min(1.0);
    let mass = |theta: f64| -> f64 { v.iter().map(|x| (x - theta).clamp(0.0, cap)).sum() };

    let lo_v = v.iter().copied().fold(f64::INFINITY, f64::min);
    let hi_v = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo_v.is_finite() || !hi_v.is_finite() {
        return equal_weights(v.len());
    }

    // mass(lo) = n * cap >= 1, mass(hi) = 0.
    let mut lo = lo_v - cap;
    let mut hi = hi_v;
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mass(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-16 {
            break;
        }
    }
    let theta = 0.5 * (lo + hi);
    let projected: Vec<f64> = v.iter().map(|x| (x - theta).clamp(0.0, cap)).collect();
    normalize_long_only(projected)
}

fn check_cap(cap: f64, assets: usize) -> Result<()> {
    if assets == 0 {
        return Err(Error::EmptyUniverse);
    }
    if !cap.is_finite() || cap <= 0.0 {
        return Err(Error::InvalidParameter(format!("max weight {cap} must be positive")));
    }
    if cap * (assets as f64) < 1.0 - 1e-12 {
        return Err(Error::InfeasibleBounds { cap, assets });
    }
    Ok(())
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
}

pub(crate) fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Clamp negatives and non-finite values to zero and rescale to sum 1.
/// All-zero input becomes equal weights.
pub fn normalize_long_only(mut w: Vec<f64>) -> Vec<f64> {
    if w.is_empty() {
        return w;
    }

    for x in &mut w {
        if !x.is_finite() || *x < 0.0 {
            *x = 0.0;
        }
    }

    let sum = w.iter().sum::<f64>();
    if sum <= 1e-15 {
        return equal_weights(w.len());
    }

    for x in &mut w {
        *x /= sum;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Twelve weeks of PETR4, VALE3, ITUB4 and WEGE3 returns.
    fn sample_returns() -> Vec<Vec<f64>> {
        vec![
            vec![0.021, -0.011, 0.006, 0.013],
            vec![-0.014, 0.019, 0.003, -0.006],
            vec![0.008, 0.006, -0.005, 0.017],
            vec![0.017, -0.013, 0.009, -0.011],
            vec![-0.009, 0.022, 0.002, 0.004],
            vec![0.012, -0.004, -0.007, 0.019],
            vec![-0.018, 0.010, 0.008, -0.012],
            vec![0.025, -0.016, 0.004, 0.008],
            vec![0.004, 0.013, -0.003, 0.015],
            vec![-0.006, 0.007, 0.010, -0.009],
            vec![0.015, -0.008, 0.001, 0.006],
            vec![0.009, 0.011, -0.002, 0.003],
        ]
    }

    /// Two assets with orthogonal deviations: A = 1% ± 2%, B = 0.5% ± 1%.
    fn orthogonal_pair() -> Vec<Vec<f64>> {
        let a = [1.0, -1.0, 1.0, -1.0];
        let b = [1.0, 1.0, -1.0, -1.0];
        (0..4)
            .map(|t| vec![0.01 + 0.02 * a[t], 0.005 + 0.01 * b[t]])
            .collect()
    }

    fn assert_valid_weights(w: &[f64], n: usize) {
        assert_eq!(w.len(), n);
        assert!(w.iter().all(|x| x.is_finite() && *x >= -1e-12));
        let s: f64 = w.iter().sum();
        assert!((s - 1.0).abs() < 1e-9, "sum={s}");
    }

    fn assert_close(got: &[f64], expected: &[f64], atol: f64) {
        assert_eq!(got.len(), expected.len());
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() <= atol, "got={got:?} expected={expected:?}");
        }
    }

    #[test]
    fn max_sharpe_weights_are_valid() {
        let w = max_sharpe(&sample_returns(), 0.0, 1.0, Estimator::LedoitWolf).unwrap();
        assert_valid_weights(&w, 4);
    }

    #[test]
    fn max_sharpe_matches_tangency_portfolio() {
        // Diagonal covariance: w ∝ mu / var = (0.01/0.0004, 0.005/0.0001) = (25, 50).
        let w = max_sharpe(&orthogonal_pair(), 0.0, 1.0, Estimator::Sample).unwrap();
        assert_close(&w, &[1.0 / 3.0, 2.0 / 3.0], 1e-5);
    }

    #[test]
    fn max_sharpe_respects_cap() {
        let w = max_sharpe(&orthogonal_pair(), 0.0, 0.6, Estimator::Sample).unwrap();
        assert_close(&w, &[0.4, 0.6], 1e-6);

        let w = max_sharpe(&sample_returns(), 0.0, 0.3, Estimator::LedoitWolf).unwrap();
        assert_valid_weights(&w, 4);
        assert!(w.iter().all(|x| *x <= 0.3 + 1e-9), "{w:?}");
    }

    #[test]
    fn max_sharpe_improves_on_equal_weights() {
        let r = sample_returns();
        let cov = Estimator::LedoitWolf.estimate(&r).unwrap();
        let mu = column_means(&r);
        let sharpe = |w: &[f64]| dot(w, &mu) / portfolio_variance(&cov, w).sqrt();

        let w = max_sharpe(&r, 0.0, 1.0, Estimator::LedoitWolf).unwrap();
        assert!(sharpe(&w) >= sharpe(&equal_weights(4)));
    }

    #[test]
    fn max_sharpe_falls_back_when_nothing_beats_risk_free() {
        let r = orthogonal_pair();
        let w = max_sharpe(&r, 0.5, 1.0, Estimator::Sample).unwrap();
        let mv = min_variance(&r, 1.0, Estimator::Sample).unwrap();
        assert_close(&w, &mv, 1e-12);
    }

    #[test]
    fn min_variance_inverse_variance_for_uncorrelated() {
        // Variances 4:1 → weights 0.2 / 0.8.
        let w = min_variance(&orthogonal_pair(), 1.0, Estimator::Sample).unwrap();
        assert_close(&w, &[0.2, 0.8], 1e-5);
    }

    #[test]
    fn hrp_two_assets_is_inverse_variance() {
        let r = orthogonal_pair();
        let w = hrp(&r, Estimator::Sample).unwrap();
        assert_close(&w, &[0.2, 0.8], 1e-12);
    }

    #[test]
    fn hrp_weights_are_valid() {
        let w = hrp(&sample_returns(), Estimator::LedoitWolf).unwrap();
        assert_valid_weights(&w, 4);
        assert!(w.iter().all(|x| *x > 0.0));
    }

    #[test]
    fn recursive_bisection_equal_variances() {
        let cov = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ];
        let w = recursive_bisection(&cov, &[2, 0, 3, 1]);
        assert_close(&w, &[0.25; 4], 1e-15);
    }

    #[test]
    fn recursive_bisection_follows_order() {
        // Order [0, 1, 2]: first split {0} vs {1, 2}.
        let cov = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let w = recursive_bisection(&cov, &[0, 1, 2]);
        // v({0}) = 1, v({1,2}) = 0.5 → alpha = 1 - 1/1.5 = 1/3.
        assert_close(&w, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 1e-15);

        let cov = vec![
            vec![4.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let w = recursive_bisection(&cov, &[0, 1, 2]);
        // v({0}) = 4, v({1,2}) = 0.5 → alpha = 1/9; the right half splits evenly.
        assert_close(&w, &[1.0 / 9.0, 4.0 / 9.0, 4.0 / 9.0], 1e-15);
    }

    #[test]
    fn optimize_pairs_tickers() {
        let tickers = vec![
            Ticker::new("PETR4.SA"),
            Ticker::new("VALE3.SA"),
            Ticker::new("ITUB4.SA"),
            Ticker::new("WEGE3.SA"),
        ];
        let m = ReturnMatrix::from_rows(tickers.clone(), sample_returns()).unwrap();
        for method in [Method::Sharpe, Method::MinVariance, Method::Hrp] {
            let params = Params {
                method,
                max_weight: 0.4,
                ..Params::default()
            };
            let out = optimize(&m, &params).unwrap();
            let got: Vec<Ticker> = out.iter().map(|(t, _)| *t).collect();
            assert_eq!(got, tickers);
            let w: Vec<f64> = out.iter().map(|(_, w)| *w).collect();
            assert_valid_weights(&w, 4);
            assert!(w.iter().all(|x| *x <= 0.4 + 1e-9), "{method}: {w:?}");
        }
    }

    #[test]
    fn single_asset_gets_everything() {
        let r = vec![vec![0.01], vec![0.02], vec![-0.01]];
        assert_eq!(max_sharpe(&r, 0.0, 1.0, Estimator::LedoitWolf).unwrap(), vec![1.0]);
        assert_eq!(hrp(&r, Estimator::LedoitWolf).unwrap(), vec![1.0]);
        assert_eq!(min_variance(&r, 1.0, Estimator::Sample).unwrap(), vec![1.0]);
    }

    #[test]
    fn insufficient_rows() {
        let r = vec![vec![0.01, 0.02]];
        assert_eq!(
            max_sharpe(&r, 0.0, 1.0, Estimator::LedoitWolf),
            Err(Error::InsufficientData { needed: 2, got: 1 })
        );
        assert!(hrp(&r, Estimator::LedoitWolf).is_err());
    }

    #[test]
    fn infeasible_cap() {
        assert_eq!(
            max_sharpe(&sample_returns(), 0.0, 0.2, Estimator::LedoitWolf),
            Err(Error::InfeasibleBounds { cap: 0.2, assets: 4 })
        );
        assert!(cap_weights(&[0.5, 0.5], 0.4).is_err());
    }

    #[test]
    fn cap_redistributes_excess() {
        let w = cap_weights(&[0.7, 0.2, 0.1], 0.5).unwrap();
        // 0.2 excess spread 2:1 over the rest.
        assert_close(&w, &[0.5, 1.0 / 3.0, 1.0 / 6.0], 1e-12);

        // Second pass: redistribution pushes another asset over the cap.
        let w = cap_weights(&[0.6, 0.3, 0.05, 0.05], 0.35).unwrap();
        assert_valid_weights(&w, 4);
        assert!(w.iter().all(|x| *x <= 0.35 + 1e-12), "{w:?}");
        assert!((w[0] - 0.35).abs() < 1e-12);
        assert!((w[1] - 0.35).abs() < 1e-12);
    }

    #[test]
    fn cap_noop_when_within_bounds() {
        let w = cap_weights(&[0.25, 0.25, 0.5], 0.5).unwrap();
        assert_close(&w, &[0.25, 0.25, 0.5], 1e-15);
    }

    #[test]
    fn tilt_renormalises() {
        let w = apply_tilt(&[0.5, 0.5], &[1.2, 1.0]).unwrap();
        assert_close(&w, &[1.2 / 2.2, 1.0 / 2.2], 1e-15);
        assert!(apply_tilt(&[0.5, 0.5], &[1.0]).is_err());
        assert!(apply_tilt(&[0.5, 0.5], &[-1.0, 1.0]).is_err());
        // All-zero tilt collapses to equal weights.
        assert_close(&apply_tilt(&[0.7, 0.3], &[0.0, 0.0]).unwrap(), &[0.5, 0.5], 0.0);
    }

    #[test]
    fn projection_onto_capped_simplex() {
        let p = project_capped_simplex(&[0.9, 0.1, 0.0], 1.0);
        assert_close(&p, &[0.9, 0.1, 0.0], 1e-12);

        let p = project_capped_simplex(&[2.0, 0.0, 0.0], 0.5);
        assert_close(&p, &[0.5, 0.25, 0.25], 1e-12);
    }

    #[test]
    fn method_parsing() {
        assert_eq!("HRP".parse::<Method>().unwrap(), Method::Hrp);
        assert_eq!("max_sharpe".parse::<Method>().unwrap(), Method::Sharpe);
        assert!("kelly".parse::<Method>().is_err());
        assert_eq!(Method::MinVariance.to_string(), "min-variance");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn method_json_matches_display() {
        for m in [Method::Sharpe, Method::MinVariance, Method::Hrp] {
            let json = serde_json::to_string(&m).unwrap();
            assert_eq!(json, format!("\"{m}\""));
            assert_eq!(serde_json::from_str::<Method>(&json).unwrap(), m);
        }
        let m: Method = serde_json::from_str("\"min_variance\"").unwrap();
        assert_eq!(m, Method::MinVariance);
    }
}
