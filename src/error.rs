//! Errors raised by the numerical core and the scenario model.

use crate::ticker::Ticker;

/// Errors returned by estimators, optimizers and the backtest.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// Not enough observations (rows of returns, price dates, ...).
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Rows or columns of different lengths.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A NaN or infinite value where a finite one is required.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// No assets left to allocate.
    #[error("empty universe")]
    EmptyUniverse,

    /// `cap * assets < 1`: no long-only weights can satisfy the bound.
    #[error("max weight {cap} is infeasible for {assets} assets")]
    InfeasibleBounds { cap: f64, assets: usize },

    /// A macro indicator required by the scenario rule is missing.
    #[error("missing macro indicator: {0}")]
    MissingIndicator(&'static str),

    #[error("unknown ticker: {0}")]
    UnknownTicker(Ticker),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
