//! TOML configuration loading and validation.
//!
//! Every section is optional; a missing file means built-in defaults.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use macrofolio::{
    BacktestConfig, Bonuses, Estimator, Method, ScenarioRule, SectorMap, SectorTable, Ticker,
    Tilt,
};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scenario: ScenarioConfig,
    pub optimizer: OptimizerConfig,
    pub screen: ScreenConfig,
    pub backtest: BacktestSection,
    pub sectors: SectorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub rule: ScenarioRule,
    /// Overrides the inflation target found in macro files.
    pub inflation_target: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub estimator: Estimator,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    /// Per-period risk-free rate (daily prices ⇒ daily rate).
    #[serde(default)]
    pub risk_free: f64,
    #[serde(default = "default_tilt")]
    pub tilt: Tilt,
    #[serde(default = "default_lookback")]
    pub lookback_months: u32,
}

fn default_max_weight() -> f64 {
    0.30
}
fn default_tilt() -> Tilt {
    Tilt::Favored(0.2)
}
fn default_lookback() -> u32 {
    12
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            method: Method::default(),
            estimator: Estimator::default(),
            max_weight: default_max_weight(),
            risk_free: 0.0,
            tilt: default_tilt(),
            lookback_months: default_lookback(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_bonuses")]
    pub bonuses: Bonuses,
    /// Keep at most this many candidates (0 = all).
    #[serde(default)]
    pub max_candidates: usize,
}

fn default_bonuses() -> Bonuses {
    Bonuses::default()
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            bonuses: default_bonuses(),
            max_candidates: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_start")]
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default = "default_contribution")]
    pub contribution: f64,
    #[serde(default = "default_benchmark")]
    pub benchmark: String,
    /// Tilt used when replaying history (continuous by default).
    #[serde(default = "default_backtest_tilt")]
    pub tilt: Tilt,
}

fn default_start() -> NaiveDate {
    BacktestConfig::default().start
}
fn default_contribution() -> f64 {
    1000.0
}
fn default_benchmark() -> String {
    "BOVA11.SA".into()
}
fn default_backtest_tilt() -> Tilt {
    Tilt::Continuous(0.5)
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            start: default_start(),
            end: None,
            contribution: default_contribution(),
            benchmark: default_benchmark(),
            tilt: default_backtest_tilt(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectorsConfig {
    /// JSON sector table replacing the built-in B3 universe.
    #[serde(default)]
    pub table: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_journal_file")]
    pub journal_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_journal_file() -> String {
    "journal.jsonl".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            journal_file: default_journal_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        self.scenario
            .rule
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        if self.scenario.inflation_target.is_some_and(|t| !t.is_finite()) {
            return Err(Error::Config("inflation_target must be finite".into()));
        }
        let o = &self.optimizer;
        if !(o.max_weight > 0.0 && o.max_weight <= 1.0) {
            return Err(Error::Config("max_weight must be in (0.0, 1.0]".into()));
        }
        if !o.risk_free.is_finite() {
            return Err(Error::Config("risk_free must be finite".into()));
        }
        if o.lookback_months == 0 {
            return Err(Error::Config("lookback_months must be >= 1".into()));
        }
        for tilt in [o.tilt, self.backtest.tilt] {
            let strength = match tilt {
                Tilt::None => continue,
                Tilt::Favored(s) | Tilt::Continuous(s) => s,
            };
            if !(strength.is_finite() && strength >= 0.0) {
                return Err(Error::Config("tilt strength must be >= 0".into()));
            }
        }
        let b = &self.backtest;
        if !(b.contribution.is_finite() && b.contribution > 0.0) {
            return Err(Error::Config("contribution must be > 0".into()));
        }
        if Ticker::try_new(&b.benchmark).is_none_or(|t| t.is_empty()) {
            return Err(Error::Config(format!(
                "invalid benchmark ticker '{}'",
                b.benchmark
            )));
        }
        if b.end.is_some_and(|end| end < b.start) {
            return Err(Error::Config("backtest end is before start".into()));
        }
        Ok(())
    }

    /// Full path to the journal file.
    pub fn journal_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.journal_file)
    }

    /// The sector map in effect: the configured table or the B3 default.
    pub fn sector_map(&self) -> Result<SectorMap> {
        match &self.sectors.table {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
                    path: path.clone(),
                    source: e,
                })?;
                let table: SectorTable = serde_json::from_str(&contents)?;
                Ok(SectorMap::from_table(&table)?)
            }
            None => Ok(SectorMap::brazil_default()),
        }
    }

    /// Backtest settings assembled from the `[scenario]`, `[optimizer]` and
    /// `[backtest]` sections.
    pub fn backtest_config(&self, tickers: Vec<Ticker>) -> BacktestConfig {
        BacktestConfig {
            start: self.backtest.start,
            end: self.backtest.end,
            contribution: self.backtest.contribution,
            max_weight: self.optimizer.max_weight,
            lookback_months: self.optimizer.lookback_months,
            method: self.optimizer.method,
            estimator: self.optimizer.estimator,
            risk_free: self.optimizer.risk_free,
            // Validated in `validate`.
            benchmark: Ticker::try_new(&self.backtest.benchmark).unwrap_or_default(),
            tilt: self.backtest.tilt,
            rule: self.scenario.rule,
            inflation_target: self.scenario.inflation_target,
            tickers,
        }
    }
}
