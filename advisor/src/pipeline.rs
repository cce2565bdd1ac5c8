//! Command workflows: scenario → screen → optimize → split → blend, and the
//! historical backtest.

use chrono::Months;
use log::{info, warn};
use serde::Serialize;

use macrofolio::{
    BacktestConfig, BacktestResult, BlendRow, Candidate, MacroHistory, MacroSnapshot, MarketData,
    Method, Params, PriceTable, Quote, Scenario, SectorMap, Ticker, apply_tilt,
    blend_with_holdings, cap_weights, optimize, run_backtest, screen, split_contribution,
    sweep_backtests,
};

use crate::config::Config;
use crate::error::{Error, Result};

/// Classified macro snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub snapshot: MacroSnapshot,
    pub scenario: Scenario,
    pub score: f64,
}

/// Apply config overrides to a snapshot and classify it.
pub fn assess(config: &Config, snapshot: &MacroSnapshot) -> Result<ScenarioReport> {
    let mut snapshot = *snapshot;
    if let Some(target) = config.scenario.inflation_target {
        snapshot.inflation_target = target;
    }
    let rule = &config.scenario.rule;
    Ok(ScenarioReport {
        scenario: rule.classify(&snapshot)?,
        score: rule.score(&snapshot)?,
        snapshot,
    })
}

/// Everything the `suggest` command needs.
pub struct SuggestInputs<'a> {
    pub quotes: &'a [Quote],
    pub prices: &'a PriceTable,
    pub snapshot: &'a MacroSnapshot,
    pub holdings: &'a [(Ticker, f64)],
    pub contribution: f64,
    /// Overrides `[optimizer] method`.
    pub method: Option<Method>,
}

/// Result of the `suggest` command.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub scenario: ScenarioReport,
    pub method: Method,
    pub candidates: Vec<Candidate>,
    /// Final weights for the contribution, after tilt and cap.
    pub weights: Vec<(Ticker, f64)>,
    /// Currency amount per ticker.
    pub split: Vec<(Ticker, f64)>,
    pub contribution: f64,
    pub blend: Vec<BlendRow>,
}

/// Screen the watch-list, optimize over the survivors and allocate the
/// contribution.
pub fn suggest(config: &Config, sectors: &SectorMap, inputs: &SuggestInputs<'_>) -> Result<Suggestion> {
    let report = assess(config, inputs.snapshot)?;
    info!(
        "scenario {} (score {:+.2})",
        report.scenario, report.score
    );

    let mut candidates = screen(
        inputs.quotes,
        sectors,
        report.scenario,
        &report.snapshot,
        &config.screen.bonuses,
    );
    if config.screen.max_candidates > 0 {
        candidates.truncate(config.screen.max_candidates);
    }
    if candidates.is_empty() {
        return Err(Error::NoCandidates(
            "no quote trades below its target price".into(),
        ));
    }

    let tickers: Vec<Ticker> = candidates
        .iter()
        .map(|c| c.ticker)
        .filter(|t| {
            let known = inputs.prices.contains(t);
            if !known {
                warn!("{t}: no price history, dropped");
            }
            known
        })
        .collect();
    if tickers.is_empty() {
        return Err(Error::NoCandidates(
            "no candidate has price history".into(),
        ));
    }

    let method = inputs.method.unwrap_or(config.optimizer.method);
    let weights = optimize_candidates(config, sectors, &report, inputs.prices, &tickers, method)?;

    let (names, w): (Vec<Ticker>, Vec<f64>) = weights.iter().copied().unzip();
    let split = split_contribution(&names, &w, inputs.contribution)?;
    let blend = blend_with_holdings(inputs.holdings, &weights, inputs.contribution)?;

    Ok(Suggestion {
        scenario: report,
        method,
        candidates,
        weights,
        split,
        contribution: inputs.contribution,
        blend,
    })
}

/// Optimize over the trailing lookback window, then tilt and cap.
fn optimize_candidates(
    config: &Config,
    sectors: &SectorMap,
    report: &ScenarioReport,
    prices: &PriceTable,
    tickers: &[Ticker],
    method: Method,
) -> Result<Vec<(Ticker, f64)>> {
    if let [only] = tickers {
        return Ok(vec![(*only, 1.0)]);
    }
    let last = *prices
        .dates()
        .last()
        .ok_or(macrofolio::Error::InsufficientData { needed: 2, got: 0 })?;
    let from = last
        .checked_sub_months(Months::new(config.optimizer.lookback_months))
        .unwrap_or(chrono::NaiveDate::MIN);
    let returns = prices
        .select(tickers)?
        .window(from, last)
        .forward_fill()
        .drop_incomplete_rows()
        .returns();

    let cap = config.optimizer.max_weight.max(1.0 / tickers.len() as f64);
    if cap > config.optimizer.max_weight {
        warn!(
            "max_weight {:.2} infeasible for {} assets, using {cap:.2}",
            config.optimizer.max_weight,
            tickers.len()
        );
    }
    let params = Params {
        method,
        risk_free: config.optimizer.risk_free,
        max_weight: cap,
        estimator: config.optimizer.estimator,
    };
    let raw = optimize(&returns, &params)?;

    let base: Vec<f64> = raw.iter().map(|(_, w)| *w).collect();
    let multipliers: Vec<f64> = raw
        .iter()
        .map(|(t, _)| {
            sectors.multiplier(t, config.optimizer.tilt, report.scenario, report.score)
        })
        .collect();
    let weights = cap_weights(&apply_tilt(&base, &multipliers)?, cap)?;
    Ok(raw.into_iter().map(|(t, _)| t).zip(weights).collect())
}

/// Run the configured backtest.
pub fn backtest(
    config: &Config,
    sectors: &SectorMap,
    prices: &PriceTable,
    history: &MacroHistory,
    tickers: Vec<Ticker>,
    method: Option<Method>,
) -> Result<BacktestResult> {
    let mut bt = config.backtest_config(tickers);
    if let Some(m) = method {
        bt.method = m;
    }
    let data = MarketData {
        prices,
        history,
        sectors,
    };
    Ok(run_backtest(&bt, &data)?)
}

/// Backtest every optimizer method side by side.
pub fn compare_methods(
    config: &Config,
    sectors: &SectorMap,
    prices: &PriceTable,
    history: &MacroHistory,
    tickers: Vec<Ticker>,
) -> Vec<(Method, Result<BacktestResult>)> {
    let methods = [Method::Sharpe, Method::MinVariance, Method::Hrp];
    let base = config.backtest_config(tickers);
    let configs: Vec<BacktestConfig> = methods
        .iter()
        .map(|&method| BacktestConfig {
            method,
            ..base.clone()
        })
        .collect();
    let data = MarketData {
        prices,
        history,
        sectors,
    };
    sweep_backtests(&configs, &data)
        .into_iter()
        .map(|(i, res)| (methods[i], res.map_err(Error::from)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot() -> MacroSnapshot {
        MacroSnapshot {
            selic: Some(13.75),
            ipca: Some(5.2),
            usd_brl: Some(5.4),
            oil: Some(82.0),
            ..MacroSnapshot::default()
        }
    }

    fn prices() -> PriceTable {
        let tickers = vec![
            Ticker::new("PETR4.SA"),
            Ticker::new("VALE3.SA"),
            Ticker::new("ITUB4.SA"),
        ];
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..120).map(|i| start + chrono::Duration::days(i)).collect();
        let rows = (0..120)
            .map(|i| {
                let t = i as f64;
                vec![
                    Some(35.0 + 0.02 * t + 0.8 * (t * 0.5).sin()),
                    Some(65.0 - 0.01 * t + 1.1 * (t * 0.3).cos()),
                    Some(30.0 + 0.015 * t + 0.4 * (t * 0.8).sin()),
                ]
            })
            .collect();
        PriceTable::new(dates, tickers, rows).unwrap()
    }

    #[test]
    fn assess_applies_target_override() {
        let mut config = Config::default();
        config.scenario.inflation_target = Some(4.5);
        let r = assess(&config, &snapshot()).unwrap();
        assert_eq!(r.snapshot.inflation_target, 4.5);
        assert_eq!(r.scenario, Scenario::Restrictive);
        assert!(r.score < 0.0);
    }

    #[test]
    fn suggest_end_to_end() {
        let config = Config::default();
        let sectors = SectorMap::brazil_default();
        let prices = prices();
        let quotes = [
            Quote::new(Ticker::new("PETR4.SA"), 36.0, 42.0),
            Quote::new(Ticker::new("VALE3.SA"), 64.0, 80.0),
            Quote::new(Ticker::new("ITUB4.SA"), 31.0, 35.0),
            Quote::new(Ticker::new("WEGE3.SA"), 40.0, 30.0),
        ];
        let holdings = [(Ticker::new("ITUB4.SA"), 2000.0)];
        let snap = snapshot();
        let inputs = SuggestInputs {
            quotes: &quotes,
            prices: &prices,
            snapshot: &snap,
            holdings: &holdings,
            contribution: 1000.0,
            method: Some(Method::Hrp),
        };
        let s = suggest(&config, &sectors, &inputs).unwrap();
        assert_eq!(s.method, Method::Hrp);
        assert_eq!(s.candidates.len(), 3);
        assert_eq!(s.weights.len(), 3);
        let total: f64 = s.weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
        // Three assets cannot all sit under 0.30; the cap is lifted to 1/3.
        assert!(s.weights.iter().all(|(_, w)| *w <= 1.0 / 3.0 + 1e-9));
        let spent: f64 = s.split.iter().map(|(_, v)| v).sum();
        assert!((spent - 1000.0).abs() < 1e-6);
        let final_sum: f64 = s.blend.iter().map(|r| r.final_weight).sum();
        assert!((final_sum - 1.0).abs() < 1e-9);
        assert_eq!(s.blend[0].ticker, Ticker::new("ITUB4.SA"));
        assert_eq!(s.blend[0].current_weight, 1.0);
    }

    #[test]
    fn suggest_without_candidates() {
        let config = Config::default();
        let sectors = SectorMap::brazil_default();
        let prices = prices();
        let quotes = [Quote::new(Ticker::new("PETR4.SA"), 40.0, 38.0)];
        let snap = snapshot();
        let inputs = SuggestInputs {
            quotes: &quotes,
            prices: &prices,
            snapshot: &snap,
            holdings: &[],
            contribution: 1000.0,
            method: None,
        };
        assert!(matches!(
            suggest(&config, &sectors, &inputs),
            Err(Error::NoCandidates(_))
        ));
    }

    #[test]
    fn single_candidate_takes_everything() {
        let config = Config::default();
        let sectors = SectorMap::brazil_default();
        let prices = prices();
        let quotes = [
            Quote::new(Ticker::new("VALE3.SA"), 60.0, 75.0),
            Quote::new(Ticker::new("BBAS3.SA"), 25.0, 30.0),
        ];
        let snap = snapshot();
        let inputs = SuggestInputs {
            quotes: &quotes,
            prices: &prices,
            snapshot: &snap,
            holdings: &[],
            contribution: 500.0,
            method: None,
        };
        // BBAS3 has no price history and is dropped.
        let s = suggest(&config, &sectors, &inputs).unwrap();
        assert_eq!(s.weights, vec![(Ticker::new("VALE3.SA"), 1.0)]);
        assert_eq!(s.split, vec![(Ticker::new("VALE3.SA"), 500.0)]);
    }

    #[test]
    fn backtest_uses_configured_inflation_target() {
        let mut config = Config::default();
        config.backtest.start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        config.optimizer.lookback_months = 1;
        config.scenario.rule = macrofolio::ScenarioRule::InflationTarget {
            restrictive_selic: 12.0,
            expansionary_selic: 10.0,
        };
        config.scenario.inflation_target = Some(6.0);
        let sectors = SectorMap::brazil_default();
        let prices = prices();
        let snap = MacroSnapshot {
            selic: Some(13.0),
            ipca: Some(5.0),
            ..MacroSnapshot::default()
        };

        let assessed = assess(&config, &snap).unwrap();
        assert_eq!(assessed.scenario, Scenario::Neutral);

        let history = MacroHistory::constant(snap);
        let res = backtest(&config, &sectors, &prices, &history, Vec::new(), None).unwrap();
        assert_eq!(res.months.len(), 4);
        assert!(res.months.iter().all(|m| m.scenario == Some(assessed.scenario)));

        let rows = compare_methods(&config, &sectors, &prices, &history, Vec::new());
        for (_, res) in &rows {
            let res = res.as_ref().unwrap();
            assert!(res.months.iter().all(|m| m.scenario == Some(Scenario::Neutral)));
        }
    }

    #[test]
    fn compare_runs_every_method() {
        let mut config = Config::default();
        config.backtest.start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        config.optimizer.lookback_months = 1;
        let sectors = SectorMap::brazil_default();
        let prices = prices();
        let history = MacroHistory::constant(snapshot());
        let out = compare_methods(&config, &sectors, &prices, &history, Vec::new());
        let methods: Vec<Method> = out.iter().map(|(m, _)| *m).collect();
        assert_eq!(methods, [Method::Sharpe, Method::MinVariance, Method::Hrp]);
        for (_, res) in &out {
            let res = res.as_ref().unwrap();
            assert_eq!(res.months.len(), 4);
        }
    }
}
