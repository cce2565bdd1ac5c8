//! Macroeconomic scenario classification.
//!
//! A [`MacroSnapshot`] holds the latest readings of the Brazilian policy rate
//! (SELIC, % p.a.), 12-month inflation (IPCA, %), USD/BRL and WTI oil. A
//! [`ScenarioRule`] maps it to one of three regimes that drive which sectors
//! are favored.

use std::fmt;

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Default inflation target of the Central Bank (% p.a.).
pub const DEFAULT_INFLATION_TARGET: f64 = 3.0;

/// Latest macro readings. Any indicator may be unavailable.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MacroSnapshot {
    /// SELIC policy rate, % p.a.
    pub selic: Option<f64>,
    /// IPCA inflation, %.
    pub ipca: Option<f64>,
    /// BRL per USD.
    pub usd_brl: Option<f64>,
    /// Oil, USD per barrel.
    pub oil: Option<f64>,
    /// Inflation target, % p.a.
    pub inflation_target: f64,
}

impl Default for MacroSnapshot {
    fn default() -> Self {
        Self {
            selic: None,
            ipca: None,
            usd_brl: None,
            oil: None,
            inflation_target: DEFAULT_INFLATION_TARGET,
        }
    }
}

impl MacroSnapshot {
    fn selic(&self) -> Result<f64> {
        finite(self.selic, "selic")
    }

    fn ipca(&self) -> Result<f64> {
        finite(self.ipca, "ipca")
    }
}

fn finite(v: Option<f64>, name: &'static str) -> Result<f64> {
    match v {
        Some(x) if x.is_finite() => Ok(x),
        _ => Err(Error::MissingIndicator(name)),
    }
}

/// Monetary/economic regime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Scenario {
    /// Low inflation and low rates: cyclical sectors favored.
    Expansionary,
    Neutral,
    /// High inflation or high rates: defensive sectors favored.
    Restrictive,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Expansionary,
        Scenario::Neutral,
        Scenario::Restrictive,
    ];
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Expansionary => write!(f, "expansionary"),
            Scenario::Neutral => write!(f, "neutral"),
            Scenario::Restrictive => write!(f, "restrictive"),
        }
    }
}

/// How readings are mapped to a [`Scenario`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ScenarioRule {
    /// Fixed bands: restrictive if IPCA or SELIC is above its upper bound,
    /// expansionary if both are below their lower bounds.
    Thresholds {
        restrictive_ipca: f64,
        restrictive_selic: f64,
        expansionary_ipca: f64,
        expansionary_selic: f64,
    },
    /// IPCA compared with the inflation target: restrictive when inflation
    /// is above target and SELIC at or above `restrictive_selic`,
    /// expansionary when below target and SELIC under `expansionary_selic`.
    InflationTarget {
        restrictive_selic: f64,
        expansionary_selic: f64,
    },
}

impl Default for ScenarioRule {
    fn default() -> Self {
        ScenarioRule::Thresholds {
            restrictive_ipca: 5.0,
            restrictive_selic: 12.0,
            expansionary_ipca: 4.0,
            expansionary_selic: 10.0,
        }
    }
}

impl ScenarioRule {
    /// Classify a snapshot. SELIC and IPCA are required.
    pub fn classify(&self, m: &MacroSnapshot) -> Result<Scenario> {
        let selic = m.selic()?;
        let ipca = m.ipca()?;
        let scenario = match *self {
            ScenarioRule::Thresholds {
                restrictive_ipca,
                restrictive_selic,
                expansionary_ipca,
                expansionary_selic,
            } => {
                if ipca > restrictive_ipca || selic > restrictive_selic {
                    Scenario::Restrictive
                } else if ipca < expansionary_ipca && selic < expansionary_selic {
                    Scenario::Expansionary
                } else {
                    Scenario::Neutral
                }
            }
            ScenarioRule::InflationTarget {
                restrictive_selic,
                expansionary_selic,
            } => {
                let target = m.inflation_target;
                if ipca > target && selic >= restrictive_selic {
                    Scenario::Restrictive
                } else if ipca < target && selic < expansionary_selic {
                    Scenario::Expansionary
                } else {
                    Scenario::Neutral
                }
            }
        };
        Ok(scenario)
    }

    /// Continuous easing score in `[-1, 1]`.
    ///
    /// Each of IPCA and SELIC is placed relative to the midpoint of its band
    /// (half-width = half the band) and clipped to `[-1, 1]`; the score is
    /// their mean. `+1` is deep in expansionary territory, `-1` deep in
    /// restrictive territory. For the inflation-target rule the IPCA band is
    /// centred on the target with a half-width of one percentage point.
    pub fn score(&self, m: &MacroSnapshot) -> Result<f64> {
        let selic = m.selic()?;
        let ipca = m.ipca()?;
        let (ipca_lo, ipca_hi, selic_lo, selic_hi) = match *self {
            ScenarioRule::Thresholds {
                restrictive_ipca,
                restrictive_selic,
                expansionary_ipca,
                expansionary_selic,
            } => (
                expansionary_ipca,
                restrictive_ipca,
                expansionary_selic,
                restrictive_selic,
            ),
            ScenarioRule::InflationTarget {
                restrictive_selic,
                expansionary_selic,
            } => (
                m.inflation_target - 1.0,
                m.inflation_target + 1.0,
                expansionary_selic,
                restrictive_selic,
            ),
        };
        let s_ipca = band_position(ipca, ipca_lo, ipca_hi);
        let s_selic = band_position(selic, selic_lo, selic_hi);
        Ok(0.5 * (s_ipca + s_selic))
    }

    /// Check that every expansionary bound sits strictly below its
    /// restrictive bound. NaN bounds fail.
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            ScenarioRule::Thresholds {
                restrictive_ipca,
                restrictive_selic,
                expansionary_ipca,
                expansionary_selic,
            } => expansionary_ipca < restrictive_ipca && expansionary_selic < restrictive_selic,
            ScenarioRule::InflationTarget {
                restrictive_selic,
                expansionary_selic,
            } => expansionary_selic < restrictive_selic,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidParameter(
                "expansionary bounds must sit below restrictive bounds".into(),
            ))
        }
    }
}

/// Shorthand for [`ScenarioRule::score`].
pub fn macro_score(m: &MacroSnapshot, rule: &ScenarioRule) -> Result<f64> {
    rule.score(m)
}

/// `+1` at or below `lo`, `-1` at or above `hi`, linear in between.
fn band_position(x: f64, lo: f64, hi: f64) -> f64 {
    let mid = 0.5 * (lo + hi);
    let half = 0.5 * (hi - lo);
    if half <= 0.0 {
        return if x < mid {
            1.0
        } else if x > mid {
            -1.0
        } else {
            0.0
        };
    }
    ((mid - x) / half).clamp(-1.0, 1.0)
}

/// Dated macro snapshots, for replaying scenarios in a backtest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MacroHistory {
    entries: Vec<(NaiveDate, MacroSnapshot)>,
}

impl MacroHistory {
    /// Build from entries in any order; later duplicates of a date win.
    pub fn new(mut entries: Vec<(NaiveDate, MacroSnapshot)>) -> Self {
        entries.sort_by_key(|(d, _)| *d);
        let mut deduped: Vec<(NaiveDate, MacroSnapshot)> = Vec::with_capacity(entries.len());
        for (d, m) in entries {
            match deduped.last_mut() {
                Some((last, slot)) if *last == d => *slot = m,
                _ => deduped.push((d, m)),
            }
        }
        Self { entries: deduped }
    }

    /// The same snapshot for every date.
    pub fn constant(m: MacroSnapshot) -> Self {
        Self {
            entries: vec![(NaiveDate::MIN, m)],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The latest snapshot dated on or before `date`.
    pub fn asof(&self, date: NaiveDate) -> Option<&MacroSnapshot> {
        let idx = self.entries.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| &self.entries[i].1)
    }
}
