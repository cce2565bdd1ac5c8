//! # macrofolio
//!
//! Macro-aware long-only portfolio construction for Brazilian equities.
//!
//! ## Features
//!
//! - **Scenario model**: classify SELIC/IPCA readings as expansionary,
//!   neutral or restrictive, plus a continuous easing score in `[-1, 1]`
//! - **Sector tilts**: favor the sectors a scenario likes, discretely or
//!   proportionally to the score
//! - **Optimizers**: maximum Sharpe, minimum variance and Hierarchical Risk
//!   Parity over a Ledoit-Wolf covariance, all with a per-asset cap
//! - **Screening**: rank a watch-list by analyst upside plus bonuses
//! - **Contribution backtest**: monthly cash, whole-share buys, buy-only
//!   benchmark
//!
//! ## Quick Start
//!
//! ```
//! use macrofolio::{MacroSnapshot, Scenario, ScenarioRule};
//!
//! let m = MacroSnapshot {
//!     selic: Some(13.75),
//!     ipca: Some(4.6),
//!     ..MacroSnapshot::default()
//! };
//! let rule = ScenarioRule::default();
//! assert_eq!(rule.classify(&m).unwrap(), Scenario::Restrictive);
//! assert!(rule.score(&m).unwrap() < 0.0);
//! ```
//!
//! ## Weights
//!
//! Every optimizer returns finite, non-negative weights that sum to 1, in
//! the column order of the [`ReturnMatrix`]:
//!
//! ```
//! use macrofolio::{Estimator, Method, Params, ReturnMatrix, Ticker, optimize};
//!
//! let returns = ReturnMatrix::from_rows(
//!     vec![Ticker::new("ITUB4.SA"), Ticker::new("WEGE3.SA")],
//!     vec![
//!         vec![0.01, 0.02],
//!         vec![-0.01, 0.00],
//!         vec![0.01, -0.02],
//!         vec![-0.01, 0.00],
//!     ],
//! )
//! .unwrap();
//!
//! let params = Params {
//!     method: Method::Hrp,
//!     estimator: Estimator::Sample,
//!     ..Params::default()
//! };
//! let w = optimize(&returns, &params).unwrap();
//! let total: f64 = w.iter().map(|(_, x)| x).sum();
//! assert!((total - 1.0).abs() < 1e-9);
//! // Less volatile asset gets more weight.
//! assert!(w[0].1 > w[1].1);
//! ```
//!
//! ## Sectors
//!
//! ```
//! use macrofolio::{Scenario, SectorMap, Ticker};
//!
//! let map = SectorMap::brazil_default();
//! let petr = Ticker::new("PETR4.SA");
//! assert!(map.is_favored(&petr, Scenario::Restrictive));
//! assert!(map.favorability(&petr, -1.0, 0.5) > 1.0);
//! ```

pub mod allocation;
pub mod backtest;
pub mod cluster;
pub mod covariance;
mod error;
pub mod metrics;
pub mod optimize;
pub mod prices;
pub mod scenario;
pub mod screen;
pub mod sectors;
pub mod sweep;
mod ticker;

// Re-export public API
pub use allocation::{BlendRow, blend_with_holdings, split_contribution};
pub use backtest::{BacktestConfig, BacktestResult, MarketData, MonthRecord, run_backtest};
pub use cluster::{Linkage, single_linkage};
pub use covariance::{Estimator, Matrix, Shrunk, ledoit_wolf, sample_covariance};
pub use error::{Error, Result};
pub use metrics::{Metrics, compute_metrics, contribution_cagr};
pub use optimize::{Method, Params, apply_tilt, cap_weights, hrp, max_sharpe, min_variance, optimize};
pub use prices::{PriceTable, ReturnMatrix};
pub use scenario::{MacroHistory, MacroSnapshot, Scenario, ScenarioRule, macro_score};
pub use screen::{Bonuses, Candidate, Quote, screen};
pub use sectors::{SectorMap, SectorTable, Tilt};
pub use sweep::sweep_backtests;
pub use ticker::{MAX_TICKER_LEN, Ticker};
