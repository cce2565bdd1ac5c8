//! Monthly contribution backtest against a buy-only benchmark.
//!
//! Each month a fixed contribution arrives. The strategy re-optimizes over
//! the trailing lookback window, tilts the weights toward the sectors the
//! macro scenario favors, and buys whole shares to move the portfolio
//! toward the target. It never sells. The benchmark spends every
//! contribution on whole shares of a single ticker. Uninvested cash carries
//! over on both sides.

use chrono::{Datelike, Months, NaiveDate};
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::covariance::Estimator;
use crate::error::{Error, Result};
use crate::metrics::{Metrics, compute_metrics, contribution_cagr};
use crate::optimize::{Method, Params, apply_tilt, cap_weights, optimize};
use crate::prices::PriceTable;
use crate::scenario::{MacroHistory, Scenario, ScenarioRule};
use crate::sectors::{SectorMap, Tilt};
use crate::ticker::Ticker;

const MONTHS_PER_YEAR: f64 = 12.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Backtest settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BacktestConfig {
    /// First contribution is made on the first month start on or after this.
    pub start: NaiveDate,
    /// Last date considered; `None` runs to the end of the price table.
    pub end: Option<NaiveDate>,
    /// Cash added every month.
    pub contribution: f64,
    /// Per-asset weight cap. Raised to `1/n` when `n` assets cannot satisfy it.
    pub max_weight: f64,
    pub lookback_months: u32,
    pub method: Method,
    pub estimator: Estimator,
    /// Risk-free rate per price period, for the Sharpe optimizer.
    pub risk_free: f64,
    pub benchmark: Ticker,
    pub tilt: Tilt,
    pub rule: ScenarioRule,
    /// Replaces the inflation target of every macro snapshot.
    pub inflation_target: Option<f64>,
    /// Candidate tickers; empty means every ticker in the sector map.
    pub tickers: Vec<Ticker>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN),
            end: None,
            contribution: 1000.0,
            max_weight: 0.30,
            lookback_months: 12,
            method: Method::Sharpe,
            estimator: Estimator::LedoitWolf,
            risk_free: 0.0,
            benchmark: Ticker::new("BOVA11.SA"),
            tilt: Tilt::Continuous(0.5),
            rule: ScenarioRule::default(),
            inflation_target: None,
            tickers: Vec::new(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.contribution.is_finite() || self.contribution <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "contribution must be positive, got {}",
                self.contribution
            )));
        }
        if !(self.max_weight > 0.0 && self.max_weight <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "max_weight must be in (0, 1], got {}",
                self.max_weight
            )));
        }
        if self.lookback_months == 0 {
            return Err(Error::InvalidParameter("lookback_months must be at least 1".into()));
        }
        if let Some(end) = self.end.filter(|end| *end < self.start) {
            return Err(Error::InvalidParameter(format!(
                "end {end} is before start {}",
                self.start
            )));
        }
        if self.inflation_target.is_some_and(|t| !t.is_finite()) {
            return Err(Error::InvalidParameter("inflation_target must be finite".into()));
        }
        self.rule.validate()
    }
}

/// Inputs shared by every run over the same market.
#[derive(Clone, Copy, Debug)]
pub struct MarketData<'a> {
    pub prices: &'a PriceTable,
    pub history: &'a MacroHistory,
    pub sectors: &'a SectorMap,
}

/// State of the backtest after one month.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonthRecord {
    /// Contribution date (month start).
    pub date: NaiveDate,
    /// Strategy value at month end, cash included.
    pub equity: f64,
    pub benchmark_equity: f64,
    /// Cumulative contributions so far.
    pub contributed: f64,
    pub cash: f64,
    pub scenario: Option<Scenario>,
    pub score: Option<f64>,
    /// Target weights used this month (empty when skipped).
    pub weights: Vec<(Ticker, f64)>,
    pub assets: usize,
    /// Why no rebalance happened, if one didn't.
    pub skipped: Option<String>,
}

/// Full backtest output.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BacktestResult {
    pub months: Vec<MonthRecord>,
    pub contributed: f64,
    pub final_equity: f64,
    pub final_benchmark: f64,
    /// Growth of the final value over total contributions, annualized.
    pub cagr: f64,
    pub benchmark_cagr: f64,
    /// Time-weighted monthly returns (contributions removed).
    pub returns: Vec<f64>,
    pub benchmark_returns: Vec<f64>,
    pub metrics: Option<Metrics>,
    pub benchmark_metrics: Option<Metrics>,
}

/// Month-start dates from the first one on or after `start` through `end`.
pub fn month_starts(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let Some(first) = NaiveDate::from_ymd_opt(start.year(), start.month(), 1) else {
        return out;
    };
    let mut d = if first < start {
        match first.checked_add_months(Months::new(1)) {
            Some(d) => d,
            None => return out,
        }
    } else {
        first
    };
    while d <= end {
        out.push(d);
        match d.checked_add_months(Months::new(1)) {
            Some(next) => d = next,
            None => break,
        }
    }
    out
}

/// Monthly returns of an equity curve fed by external flows.
///
/// `equity[t]` is the value after `flows[t]` was added at the start of
/// period `t`, so `r_t = equity[t] / (equity[t-1] + flows[t]) - 1`.
pub fn time_weighted_returns(equity: &[f64], flows: &[f64]) -> Vec<f64> {
    let mut prev = 0.0;
    let mut out = Vec::with_capacity(equity.len());
    for (&e, &f) in equity.iter().zip(flows) {
        let base = prev + f;
        if base > 0.0 {
            out.push(e / base - 1.0);
        }
        prev = e;
    }
    out
}

#[derive(Default)]
struct Account {
    shares: FxHashMap<Ticker, u64>,
    cash: f64,
}

impl Account {
    fn value(&self, prices: &PriceTable, date: NaiveDate) -> f64 {
        let held: f64 = self
            .shares
            .iter()
            .map(|(t, &q)| q as f64 * prices.price_asof(t, date).unwrap_or(0.0))
            .sum();
        held + self.cash
    }

    /// Buy whole shares worth at most `amount`, limited by cash.
    fn buy(&mut self, ticker: Ticker, price: f64, amount: f64) {
        if price <= 0.0 {
            return;
        }
        let qty = (amount.min(self.cash) / price).floor();
        if qty >= 1.0 {
            *self.shares.entry(ticker).or_insert(0) += qty as u64;
            self.cash -= qty * price;
        }
    }
}

/// Run the backtest.
pub fn run_backtest(config: &BacktestConfig, data: &MarketData<'_>) -> Result<BacktestResult> {
    config.validate()?;
    if data.prices.is_empty() {
        return Err(Error::InsufficientData { needed: 2, got: 0 });
    }
    let prices = data.prices.forward_fill();
    let last = *prices.dates().last().ok_or(Error::EmptyUniverse)?;
    let end = config.end.unwrap_or(last).min(last);
    let dates = month_starts(config.start, end);
    if dates.is_empty() {
        return Err(Error::InvalidParameter(format!(
            "no month start between {} and {end}",
            config.start
        )));
    }

    let universe: Vec<Ticker> = if config.tickers.is_empty() {
        data.sectors.tickers()
    } else {
        config.tickers.clone()
    };
    let eligible: Vec<Ticker> = universe
        .into_iter()
        .filter(|t| data.sectors.sector(t).is_some() && prices.contains(t))
        .collect();
    if !prices.contains(&config.benchmark) {
        warn!("benchmark {} has no prices; it will hold cash", config.benchmark);
    }

    let mut account = Account::default();
    let mut bench = Account::default();
    let mut contributed = 0.0;
    let mut months = Vec::with_capacity(dates.len());

    for &date in &dates {
        let month_end = date
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(end)
            .min(end);

        contributed += config.contribution;
        account.cash += config.contribution;
        bench.cash += config.contribution;

        if let Some(p) = prices.price_asof(&config.benchmark, date) {
            let cash = bench.cash;
            bench.buy(config.benchmark, p, cash);
        }

        let step = rebalance(config, data, &prices, &eligible, date, &mut account);
        let (scenario, score, weights, skipped) = match step {
            Ok(s) => (Some(s.scenario), Some(s.score), s.weights, None),
            Err(Skip { scenario, score, reason }) => {
                debug!("{date}: skipped ({reason})");
                (scenario, score, Vec::new(), Some(reason))
            }
        };

        months.push(MonthRecord {
            date,
            equity: account.value(&prices, month_end),
            benchmark_equity: bench.value(&prices, month_end),
            contributed,
            cash: account.cash,
            scenario,
            score,
            assets: weights.len(),
            weights,
            skipped,
        });
    }

    let flows = vec![config.contribution; months.len()];
    let equity: Vec<f64> = months.iter().map(|m| m.equity).collect();
    let bench_equity: Vec<f64> = months.iter().map(|m| m.benchmark_equity).collect();
    let returns = time_weighted_returns(&equity, &flows);
    let benchmark_returns = time_weighted_returns(&bench_equity, &flows);

    let final_equity = equity.last().copied().unwrap_or(0.0);
    let final_benchmark = bench_equity.last().copied().unwrap_or(0.0);
    let years = (end - dates[0]).num_days() as f64 / DAYS_PER_YEAR;

    Ok(BacktestResult {
        contributed,
        final_equity,
        final_benchmark,
        cagr: contribution_cagr(final_equity, contributed, years),
        benchmark_cagr: contribution_cagr(final_benchmark, contributed, years),
        metrics: compute_metrics(&returns, MONTHS_PER_YEAR, 0.0),
        benchmark_metrics: compute_metrics(&benchmark_returns, MONTHS_PER_YEAR, 0.0),
        returns,
        benchmark_returns,
        months,
    })
}

struct Step {
    scenario: Scenario,
    score: f64,
    weights: Vec<(Ticker, f64)>,
}

struct Skip {
    scenario: Option<Scenario>,
    score: Option<f64>,
    reason: String,
}

impl Skip {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            scenario: None,
            score: None,
            reason: reason.into(),
        }
    }
}

/// Optimize for `date` and spend the account's cash toward the targets.
fn rebalance(
    config: &BacktestConfig,
    data: &MarketData<'_>,
    prices: &PriceTable,
    eligible: &[Ticker],
    date: NaiveDate,
    account: &mut Account,
) -> std::result::Result<Step, Skip> {
    let mut snapshot = *data
        .history
        .asof(date)
        .ok_or_else(|| Skip::new("no macro data"))?;
    if let Some(target) = config.inflation_target {
        snapshot.inflation_target = target;
    }
    let scenario = config
        .rule
        .classify(&snapshot)
        .map_err(|e| Skip::new(e.to_string()))?;
    let score = config
        .rule
        .score(&snapshot)
        .map_err(|e| Skip::new(e.to_string()))?;
    let skip = |reason: String| Skip {
        scenario: Some(scenario),
        score: Some(score),
        reason,
    };

    if eligible.is_empty() {
        return Err(skip("no eligible tickers".into()));
    }

    let from = date
        .checked_sub_months(Months::new(config.lookback_months))
        .unwrap_or(NaiveDate::MIN);
    let window = prices
        .window(from, date)
        .select(eligible)
        .map_err(|e| skip(e.to_string()))?
        .drop_incomplete_rows();
    let returns = window.returns();
    if returns.observations() < 2 {
        return Err(skip(format!(
            "insufficient history: {} return rows",
            returns.observations()
        )));
    }

    let n = eligible.len();
    let cap = config.max_weight.max(1.0 / n as f64);
    let params = Params {
        method: config.method,
        risk_free: config.risk_free,
        max_weight: cap,
        estimator: config.estimator,
    };
    let raw = optimize(&returns, &params).map_err(|e| skip(e.to_string()))?;
    let tickers: Vec<Ticker> = raw.iter().map(|(t, _)| *t).collect();
    let base: Vec<f64> = raw.iter().map(|(_, w)| *w).collect();
    let multipliers: Vec<f64> = tickers
        .iter()
        .map(|t| data.sectors.multiplier(t, config.tilt, scenario, score))
        .collect();
    let weights = apply_tilt(&base, &multipliers)
        .and_then(|w| cap_weights(&w, cap))
        .map_err(|e| skip(e.to_string()))?;

    let total = account.value(prices, date);
    let mut orders: Vec<(Ticker, f64, f64)> = tickers
        .iter()
        .zip(&weights)
        .filter_map(|(t, &w)| {
            let price = prices.price_asof(t, date)?;
            let held = account.shares.get(t).copied().unwrap_or(0) as f64 * price;
            Some((*t, price, (w * total - held).max(0.0)))
        })
        .collect();
    // Largest gaps first.
    orders.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
    for (ticker, price, amount) in orders {
        account.buy(ticker, price, amount);
    }

    Ok(Step {
        scenario,
        score,
        weights: tickers.into_iter().zip(weights).collect(),
    })
}
