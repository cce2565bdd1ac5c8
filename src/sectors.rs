//! Ticker → sector mapping and scenario-dependent sector preferences.
//!
//! [`SectorMap::brazil_default`] ships a B3 universe grouped into sectors,
//! the sectors each [`Scenario`] favors, and the exporters that benefit
//! from a weak real or expensive oil. Other universes can be loaded from a
//! [`SectorTable`].

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::scenario::Scenario;
use crate::ticker::Ticker;

pub const BANKS: &str = "Banks";
pub const INSURANCE: &str = "Insurance";
pub const EXCHANGES: &str = "Exchanges & Financial Services";
pub const ELECTRIC: &str = "Electric Utilities";
pub const OIL_GAS: &str = "Oil, Gas & Biofuels";
pub const MINING: &str = "Mining & Steel";
pub const INDUSTRIALS: &str = "Industrials & Capital Goods";
pub const AGRIBUSINESS: &str = "Agribusiness";
pub const HEALTH: &str = "Health Care";
pub const TECHNOLOGY: &str = "Technology";
pub const DISCRETIONARY: &str = "Consumer Discretionary";
pub const STAPLES: &str = "Consumer Staples";
pub const COMMUNICATION: &str = "Communication";
pub const PUBLIC_UTILITIES: &str = "Public Utilities";

const DEFAULT_TICKERS: &[(&str, &str)] = &[
    ("ITUB4.SA", BANKS),
    ("ITUB3.SA", BANKS),
    ("BBDC4.SA", BANKS),
    ("SANB11.SA", BANKS),
    ("BBAS3.SA", BANKS),
    ("ABCB4.SA", BANKS),
    ("BRSR6.SA", BANKS),
    ("BMGB4.SA", BANKS),
    ("BPAC11.SA", BANKS),
    ("BBSE3.SA", INSURANCE),
    ("PSSA3.SA", INSURANCE),
    ("SULA11.SA", INSURANCE),
    ("CXSE3.SA", INSURANCE),
    ("B3SA3.SA", EXCHANGES),
    ("XPBR31.SA", EXCHANGES),
    ("EGIE3.SA", ELECTRIC),
    ("TAEE11.SA", ELECTRIC),
    ("TAEE3.SA", ELECTRIC),
    ("CMIG4.SA", ELECTRIC),
    ("AURE3.SA", ELECTRIC),
    ("CPFE3.SA", ELECTRIC),
    ("AESB3.SA", ELECTRIC),
    ("ENBR3.SA", ELECTRIC),
    ("TRPL4.SA", ELECTRIC),
    ("PETR4.SA", OIL_GAS),
    ("PRIO3.SA", OIL_GAS),
    ("RECV3.SA", OIL_GAS),
    ("RRRP3.SA", OIL_GAS),
    ("UGPA3.SA", OIL_GAS),
    ("VBBR3.SA", OIL_GAS),
    ("VALE3.SA", MINING),
    ("CSNA3.SA", MINING),
    ("GGBR4.SA", MINING),
    ("CMIN3.SA", MINING),
    ("GOAU4.SA", MINING),
    ("BRAP4.SA", MINING),
    ("WEGE3.SA", INDUSTRIALS),
    ("RANI3.SA", INDUSTRIALS),
    ("KLBN11.SA", INDUSTRIALS),
    ("SUZB3.SA", INDUSTRIALS),
    ("UNIP6.SA", INDUSTRIALS),
    ("KEPL3.SA", INDUSTRIALS),
    ("AGRO3.SA", AGRIBUSINESS),
    ("SLCE3.SA", AGRIBUSINESS),
    ("SMTO3.SA", AGRIBUSINESS),
    ("CAML3.SA", AGRIBUSINESS),
    ("HAPV3.SA", HEALTH),
    ("FLRY3.SA", HEALTH),
    ("RDOR3.SA", HEALTH),
    ("QUAL3.SA", HEALTH),
    ("RADL3.SA", HEALTH),
    ("TOTS3.SA", TECHNOLOGY),
    ("POSI3.SA", TECHNOLOGY),
    ("LINX3.SA", TECHNOLOGY),
    ("LWSA3.SA", TECHNOLOGY),
    ("MGLU3.SA", DISCRETIONARY),
    ("LREN3.SA", DISCRETIONARY),
    ("RENT3.SA", DISCRETIONARY),
    ("ARZZ3.SA", DISCRETIONARY),
    ("ALPA4.SA", DISCRETIONARY),
    ("ABEV3.SA", STAPLES),
    ("NTCO3.SA", STAPLES),
    ("PCAR3.SA", STAPLES),
    ("MDIA3.SA", STAPLES),
    ("VIVT3.SA", COMMUNICATION),
    ("TIMS3.SA", COMMUNICATION),
    ("OIBR3.SA", COMMUNICATION),
    ("SBSP3.SA", PUBLIC_UTILITIES),
    ("SAPR11.SA", PUBLIC_UTILITIES),
    ("SAPR3.SA", PUBLIC_UTILITIES),
    ("CSMG3.SA", PUBLIC_UTILITIES),
    ("ALUP11.SA", PUBLIC_UTILITIES),
    ("CPLE6.SA", PUBLIC_UTILITIES),
];

const DEFAULT_EXPORTERS: &[&str] = &[
    "VALE3.SA",
    "SUZB3.SA",
    "KLBN11.SA",
    "AGRO3.SA",
    "PRIO3.SA",
    "SLCE3.SA",
    "SMTO3.SA",
    "CSNA3.SA",
    "GGBR4.SA",
    "CMIN3.SA",
];

fn default_favored(scenario: Scenario) -> &'static [&'static str] {
    match scenario {
        Scenario::Expansionary => &[DISCRETIONARY, TECHNOLOGY, INDUSTRIALS, AGRIBUSINESS],
        Scenario::Neutral => &[HEALTH, BANKS, INSURANCE, EXCHANGES, PUBLIC_UTILITIES],
        Scenario::Restrictive => &[ELECTRIC, OIL_GAS, MINING, STAPLES, COMMUNICATION],
    }
}

/// How sector preferences turn into weight multipliers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "strength", rename_all = "snake_case"))]
pub enum Tilt {
    /// Leave optimizer weights untouched.
    #[default]
    None,
    /// Multiply favored tickers by `1 + strength`.
    Favored(f64),
    /// `1 + strength * lean * score`: cyclical sectors gain as the macro
    /// score rises, defensive ones as it falls.
    Continuous(f64),
}

/// Serializable form of a [`SectorMap`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SectorTable {
    /// Ticker → sector name.
    pub tickers: BTreeMap<String, String>,
    /// Sectors favored in each scenario.
    pub favored: BTreeMap<Scenario, Vec<String>>,
    pub exporters: Vec<String>,
}

/// Sector lookups for a ticker universe.
#[derive(Clone, Debug, Default)]
pub struct SectorMap {
    sectors: FxHashMap<Ticker, String>,
    favored: FxHashMap<Scenario, FxHashSet<String>>,
    exporters: FxHashSet<Ticker>,
}

impl SectorMap {
    /// The built-in B3 universe.
    pub fn brazil_default() -> Self {
        let sectors = DEFAULT_TICKERS
            .iter()
            .map(|(t, s)| (Ticker::new(t), (*s).to_string()))
            .collect();
        let favored = Scenario::ALL
            .iter()
            .map(|&sc| {
                let set = default_favored(sc).iter().map(|s| (*s).to_string()).collect();
                (sc, set)
            })
            .collect();
        let exporters = DEFAULT_EXPORTERS.iter().map(|t| Ticker::new(t)).collect();
        Self {
            sectors,
            favored,
            exporters,
        }
    }

    /// Build from a table, rejecting tickers that do not fit a [`Ticker`].
    pub fn from_table(table: &SectorTable) -> Result<Self> {
        let parse = |s: &str| {
            let s = s.trim();
            match Ticker::try_new(s) {
                Some(t) if !t.is_empty() => Ok(t),
                _ => Err(Error::InvalidParameter(format!("invalid ticker '{s}'"))),
            }
        };
        let sectors = table
            .tickers
            .iter()
            .map(|(t, s)| Ok((parse(t)?, s.clone())))
            .collect::<Result<_>>()?;
        let favored = table
            .favored
            .iter()
            .map(|(sc, list)| (*sc, list.iter().cloned().collect()))
            .collect();
        let exporters = table
            .exporters
            .iter()
            .map(|t| parse(t))
            .collect::<Result<_>>()?;
        Ok(Self {
            sectors,
            favored,
            exporters,
        })
    }

    /// Export as a table (sorted, for stable output).
    pub fn to_table(&self) -> SectorTable {
        let tickers = self
            .sectors
            .iter()
            .map(|(t, s)| (t.as_str().to_string(), s.clone()))
            .collect();
        let favored = self
            .favored
            .iter()
            .map(|(sc, set)| {
                let mut list: Vec<String> = set.iter().cloned().collect();
                list.sort();
                (*sc, list)
            })
            .collect();
        let mut exporters: Vec<String> =
            self.exporters.iter().map(|t| t.as_str().to_string()).collect();
        exporters.sort();
        SectorTable {
            tickers,
            favored,
            exporters,
        }
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn sector(&self, ticker: &Ticker) -> Option<&str> {
        self.sectors.get(ticker).map(String::as_str)
    }

    pub fn is_exporter(&self, ticker: &Ticker) -> bool {
        self.exporters.contains(ticker)
    }

    /// Whether the ticker's sector is on the scenario's list.
    pub fn is_favored(&self, ticker: &Ticker, scenario: Scenario) -> bool {
        match (self.sector(ticker), self.favored.get(&scenario)) {
            (Some(sector), Some(set)) => set.contains(sector),
            _ => false,
        }
    }

    /// `+1` for expansionary-favored sectors, `-1` for restrictive-favored,
    /// `0` otherwise (or when a sector is on both lists).
    pub fn lean(&self, ticker: &Ticker) -> f64 {
        let on = |sc| self.is_favored(ticker, sc) as i32 as f64;
        on(Scenario::Expansionary) - on(Scenario::Restrictive)
    }

    /// Weight multiplier for `ticker` under the given tilt.
    pub fn multiplier(&self, ticker: &Ticker, tilt: Tilt, scenario: Scenario, score: f64) -> f64 {
        match tilt {
            Tilt::None => 1.0,
            Tilt::Favored(strength) => {
                if self.is_favored(ticker, scenario) {
                    1.0 + strength
                } else {
                    1.0
                }
            }
            Tilt::Continuous(strength) => self.favorability(ticker, score, strength),
        }
    }

    /// Continuous scenario multiplier, `1 + strength * lean * score`, never
    /// negative.
    pub fn favorability(&self, ticker: &Ticker, score: f64, strength: f64) -> f64 {
        (1.0 + strength * self.lean(ticker) * score).max(0.0)
    }

    /// Tickers known to the map, sorted.
    pub fn tickers(&self) -> Vec<Ticker> {
        let mut v: Vec<Ticker> = self.sectors.keys().copied().collect();
        v.sort();
        v
    }
}
