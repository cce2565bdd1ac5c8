//! Splitting a contribution and blending it with current holdings.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::ticker::Ticker;

/// Per-ticker outcome of blending a contribution into a portfolio.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlendRow {
    pub ticker: Ticker,
    /// Weight in the portfolio before the contribution.
    pub current_weight: f64,
    /// Currency amount allocated from the contribution.
    pub contribution: f64,
    /// Weight after the contribution is invested.
    pub final_weight: f64,
}

/// Split `amount` across tickers proportionally to `weights`.
pub fn split_contribution(
    tickers: &[Ticker],
    weights: &[f64],
    amount: f64,
) -> Result<Vec<(Ticker, f64)>> {
    if tickers.len() != weights.len() {
        return Err(Error::ShapeMismatch(format!(
            "{} tickers but {} weights",
            tickers.len(),
            weights.len()
        )));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "contribution must be a non-negative amount, got {amount}"
        )));
    }
    Ok(tickers
        .iter()
        .zip(weights)
        .map(|(&t, &w)| (t, w * amount))
        .collect())
}

/// Blend a contribution into existing holdings.
///
/// `holdings` are current market values; `suggested` are target weights for
/// the contribution. Each ticker ends at `current + weight * amount`.
/// Rows follow holdings order, then suggested tickers not yet held.
/// Repeated tickers on either side are summed.
pub fn blend_with_holdings(
    holdings: &[(Ticker, f64)],
    suggested: &[(Ticker, f64)],
    amount: f64,
) -> Result<Vec<BlendRow>> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "contribution must be a non-negative amount, got {amount}"
        )));
    }
    if holdings.iter().any(|(_, v)| !v.is_finite() || *v < 0.0) {
        return Err(Error::NonFinite("holding value"));
    }

    let mut added: FxHashMap<Ticker, f64> = FxHashMap::default();
    for &(t, w) in suggested {
        *added.entry(t).or_insert(0.0) += w * amount;
    }

    let mut order: Vec<(Ticker, f64)> = Vec::with_capacity(holdings.len() + suggested.len());
    for &(t, v) in holdings {
        match order.iter_mut().find(|(o, _)| *o == t) {
            Some(slot) => slot.1 += v,
            None => order.push((t, v)),
        }
    }
    for &(t, _) in suggested {
        if !order.iter().any(|(o, _)| *o == t) {
            order.push((t, 0.0));
        }
    }

    let current_total: f64 = order.iter().map(|(_, v)| v).sum();
    let final_total = current_total + added.values().sum::<f64>();

    let share = |v: f64, total: f64| if total > 0.0 { v / total } else { 0.0 };
    Ok(order
        .into_iter()
        .map(|(ticker, current)| {
            let contribution = added.get(&ticker).copied().unwrap_or(0.0);
            BlendRow {
                ticker,
                current_weight: share(current, current_total),
                contribution,
                final_weight: share(current + contribution, final_total),
            }
        })
        .collect())
}
