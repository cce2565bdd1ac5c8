//! Performance metrics for periodic return series and contribution plans.

use std::fmt;

/// Summary statistics of a return series.
///
/// Returns are simple (not log). Annualization uses `periods_per_year`
/// (12 for the monthly backtest).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    /// Compounded return over the whole series (0.15 = 15%).
    pub total_return: f64,
    pub cagr: f64,
    /// Annualized standard deviation.
    pub volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Largest peak-to-trough loss as a positive fraction.
    pub max_drawdown: f64,
    /// CAGR over max drawdown.
    pub calmar: f64,
    pub num_periods: usize,
    pub winning_periods: usize,
    pub losing_periods: usize,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |x: f64| x * 100.0;
        writeln!(f, "  Total return   {:>9.2}%", pct(self.total_return))?;
        writeln!(f, "  CAGR           {:>9.2}%", pct(self.cagr))?;
        writeln!(f, "  Volatility     {:>9.2}%", pct(self.volatility))?;
        writeln!(f, "  Sharpe         {:>9.2}", self.sharpe)?;
        writeln!(f, "  Sortino        {:>9.2}", self.sortino)?;
        writeln!(f, "  Max drawdown   {:>9.2}%", pct(self.max_drawdown))?;
        writeln!(f, "  Calmar         {:>9.2}", self.calmar)?;
        write!(
            f,
            "  Up/Down/Total  {}/{}/{}",
            self.winning_periods, self.losing_periods, self.num_periods
        )
    }
}

/// Compute [`Metrics`] from periodic simple returns.
///
/// `risk_free` is per period. Returns `None` for an empty series.
pub fn compute_metrics(returns: &[f64], periods_per_year: f64, risk_free: f64) -> Option<Metrics> {
    if returns.is_empty() {
        return None;
    }
    let n = returns.len();
    let nf = n as f64;
    let ann = periods_per_year.sqrt();

    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    let total_return = growth - 1.0;

    let years = nf / periods_per_year;
    let cagr = if growth <= 0.0 {
        -1.0
    } else if years > 0.0 {
        growth.powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let mean = returns.iter().sum::<f64>() / nf;
    let denom = (n.max(2) - 1) as f64;
    let (sum_sq, sum_down_sq) = returns.iter().fold((0.0, 0.0), |(sq, down), &r| {
        let excess = r - risk_free;
        let down_term = if excess < 0.0 { excess * excess } else { 0.0 };
        (sq + (r - mean).powi(2), down + down_term)
    });
    // A single observation has no dispersion.
    let (std, downside) = if n > 1 {
        ((sum_sq / denom).sqrt(), (sum_down_sq / denom).sqrt())
    } else {
        (0.0, 0.0)
    };

    let excess = mean - risk_free;
    let ratio = |dev: f64| if dev > 0.0 { excess * ann / dev } else { 0.0 };

    let max_drawdown = max_drawdown(returns);
    Some(Metrics {
        total_return,
        cagr,
        volatility: std * ann,
        sharpe: ratio(std),
        sortino: ratio(downside),
        max_drawdown,
        calmar: if max_drawdown > 0.0 { cagr / max_drawdown } else { 0.0 },
        num_periods: n,
        winning_periods: returns.iter().filter(|&&r| r > 0.0).count(),
        losing_periods: returns.iter().filter(|&&r| r < 0.0).count(),
    })
}

/// Largest peak-to-trough decline of the compounded series.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for &r in returns {
        equity *= 1.0 + r;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Annualized growth of a contribution plan: `(final / contributed)^(1/years) - 1`.
///
/// This treats the total contributed as if it had been invested at the
/// start, so it understates the return of a dollar-cost-averaging plan.
/// It is still a fair yardstick when comparing two plans fed with the same
/// cash flows. Zero contributions or a non-positive horizon give `0.0`.
pub fn contribution_cagr(final_value: f64, contributed: f64, years: f64) -> f64 {
    if contributed <= 0.0 || years <= 0.0 || !final_value.is_finite() {
        return 0.0;
    }
    if final_value <= 0.0 {
        return -1.0;
    }
    (final_value / contributed).powf(1.0 / years) - 1.0
}
