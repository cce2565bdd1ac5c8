//! Parallel sweep over backtest configurations.

use crate::backtest::{BacktestConfig, BacktestResult, MarketData, run_backtest};
use crate::error::Result;

/// Run every configuration against the same market data in parallel.
///
/// Results come back in input order, each tagged with the index of the
/// configuration that produced it. A failing configuration does not stop
/// the others.
///
/// # Example
///
/// ```ignore
/// use macrofolio::{BacktestConfig, Method, sweep_backtests};
///
/// let configs: Vec<BacktestConfig> = [Method::Sharpe, Method::Hrp]
///     .into_iter()
///     .map(|method| BacktestConfig { method, ..BacktestConfig::default() })
///     .collect();
/// for (i, res) in sweep_backtests(&configs, &data) {
///     println!("{}: {:?}", configs[i].method, res.map(|r| r.cagr));
/// }
/// ```
#[cfg(feature = "parallel")]
pub fn sweep_backtests(
    configs: &[BacktestConfig],
    data: &MarketData<'_>,
) -> Vec<(usize, Result<BacktestResult>)> {
    use rayon::prelude::*;

    configs
        .par_iter()
        .enumerate()
        .map(|(i, config)| (i, run_backtest(config, data)))
        .collect()
}

/// Sequential fallback with the same output as the parallel sweep.
#[cfg(not(feature = "parallel"))]
pub fn sweep_backtests(
    configs: &[BacktestConfig],
    data: &MarketData<'_>,
) -> Vec<(usize, Result<BacktestResult>)> {
    configs
        .iter()
        .enumerate()
        .map(|(i, config)| (i, run_backtest(config, data)))
        .collect()
}
