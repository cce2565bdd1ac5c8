//! Watch-list screening by analyst upside plus scenario bonuses.

use log::debug;

use crate::scenario::{MacroSnapshot, Scenario};
use crate::sectors::SectorMap;
use crate::ticker::Ticker;

/// Latest price and analyst target for one ticker.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quote {
    pub ticker: Ticker,
    pub price: f64,
    pub target_price: f64,
}

impl Quote {
    pub fn new(ticker: Ticker, price: f64, target_price: f64) -> Self {
        Self {
            ticker,
            price,
            target_price,
        }
    }

    /// `(target - price) / price`.
    pub fn upside(&self) -> f64 {
        (self.target_price - self.price) / self.price
    }
}

/// Score adjustments applied on top of upside.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Bonuses {
    /// Added when the ticker's sector is favored by the scenario.
    pub favored: f64,
    /// Added to exporters when USD/BRL is above `usd_trigger`.
    pub weak_real: f64,
    pub usd_trigger: f64,
    /// Added to exporters when oil is above `oil_trigger`.
    pub expensive_oil: f64,
    pub oil_trigger: f64,
}

impl Default for Bonuses {
    fn default() -> Self {
        Self {
            favored: 0.10,
            weak_real: 0.05,
            usd_trigger: 5.0,
            expensive_oil: 0.05,
            oil_trigger: 80.0,
        }
    }
}

/// A quote that passed the screen.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    pub ticker: Ticker,
    pub sector: Option<String>,
    pub price: f64,
    pub target_price: f64,
    pub favored: bool,
    pub score: f64,
}

/// Upside plus bonuses for a single quote.
pub fn score(
    quote: &Quote,
    sectors: &SectorMap,
    scenario: Scenario,
    m: &MacroSnapshot,
    bonuses: &Bonuses,
) -> f64 {
    let mut s = quote.upside();
    if sectors.is_favored(&quote.ticker, scenario) {
        s += bonuses.favored;
    }
    if sectors.is_exporter(&quote.ticker) {
        if m.usd_brl.is_some_and(|usd| usd > bonuses.usd_trigger) {
            s += bonuses.weak_real;
        }
        if m.oil.is_some_and(|oil| oil > bonuses.oil_trigger) {
            s += bonuses.expensive_oil;
        }
    }
    s
}

/// Keep quotes trading below target and rank them by score.
///
/// Quotes with a non-positive or non-finite price or target are dropped.
/// Ties are ordered by ticker so the output is deterministic.
pub fn screen(
    quotes: &[Quote],
    sectors: &SectorMap,
    scenario: Scenario,
    m: &MacroSnapshot,
    bonuses: &Bonuses,
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = quotes
        .iter()
        .filter(|q| {
            let valid = q.price.is_finite()
                && q.target_price.is_finite()
                && q.price > 0.0
                && q.target_price > 0.0;
            if !valid {
                debug!("dropping {}: invalid quote", q.ticker);
            }
            valid && q.price < q.target_price
        })
        .map(|q| Candidate {
            ticker: q.ticker,
            sector: sectors.sector(&q.ticker).map(str::to_string),
            price: q.price,
            target_price: q.target_price,
            favored: sectors.is_favored(&q.ticker, scenario),
            score: score(q, sectors, scenario, m, bonuses),
        })
        .collect();

    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    out
}
