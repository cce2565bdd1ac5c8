//! End-to-end tests: files on disk → loaders → pipeline → journal.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};

use macrofolio::{Method, Scenario, Ticker};
use macrofolio_advisor::config::Config;
use macrofolio_advisor::data;
use macrofolio_advisor::error::Error;
use macrofolio_advisor::journal::{self, Journal};
use macrofolio_advisor::pipeline::{self, SuggestInputs};

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Daily prices for three stocks and the benchmark, with a gap in VALE3.
fn prices_csv() -> String {
    let mut s = String::from("date,PETR4.SA,VALE3.SA,ITUB4.SA,BOVA11.SA\n");
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    for i in 0..400 {
        let t = i as f64;
        let date = start + Duration::days(i);
        let petr = 30.0 + 0.01 * t + 0.9 * (t * 0.21).sin();
        let vale = 70.0 - 0.005 * t + 1.3 * (t * 0.13).cos();
        let itub = 27.0 + 0.008 * t + 0.5 * (t * 0.37).sin();
        let bova = 105.0 + 0.02 * t;
        if i % 50 == 7 {
            writeln!(s, "{date},{petr:.4},,{itub:.4},{bova:.4}").unwrap();
        } else {
            writeln!(s, "{date},{petr:.4},{vale:.4},{itub:.4},{bova:.4}").unwrap();
        }
    }
    s
}

const QUOTES: &str = "ticker,price,target_price
PETR4.SA,34.00,41.00
VALE3.SA,66.50,80.00
ITUB4.SA,30.10,34.00
WEGE3.SA,45.00,40.00
BBAS3.SA,27.00,
";

const HOLDINGS: &str = "ticker,value
ITUB4.SA,1500
TAEE11.SA,500
";

const MACRO: &str = r#"{ "selic": 13.75, "ipca": 5.4, "usd_brl": 5.1, "oil": 78.0 }"#;

const MACRO_HISTORY: &str = "date,selic,ipca,usd_brl,oil
2023-01-01,13.75,5.8,5.2,80
2023-09-01,12.75,5.2,4.9,90
2023-12-01,11.75,4.6,4.9,75
";

#[test]
fn suggest_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let prices = data::load_prices(&write(dir.path(), "prices.csv", &prices_csv())).unwrap();
    let quotes = data::load_quotes(&write(dir.path(), "quotes.csv", QUOTES)).unwrap();
    let holdings = data::load_holdings(&write(dir.path(), "holdings.csv", HOLDINGS)).unwrap();
    let snapshot = data::load_macro(&write(dir.path(), "macro.json", MACRO)).unwrap();
    assert_eq!(quotes.len(), 4);
    assert_eq!(snapshot.inflation_target, 3.0);

    let config = Config::default();
    let sectors = config.sector_map().unwrap();
    let inputs = SuggestInputs {
        quotes: &quotes,
        prices: &prices,
        snapshot: &snapshot,
        holdings: &holdings,
        contribution: 1000.0,
        method: Some(Method::Sharpe),
    };
    let s = pipeline::suggest(&config, &sectors, &inputs).unwrap();

    assert_eq!(s.scenario.scenario, Scenario::Restrictive);
    let names: Vec<&str> = s.candidates.iter().map(|c| c.ticker.as_str()).collect();
    assert_eq!(names, ["VALE3.SA", "PETR4.SA", "ITUB4.SA"]);

    let total: f64 = s.weights.iter().map(|(_, w)| w).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(s.weights.iter().all(|(_, w)| *w >= 0.0 && *w <= 1.0 / 3.0 + 1e-9));

    // Holdings first (in file order), then new names.
    assert_eq!(s.blend[0].ticker, Ticker::new("ITUB4.SA"));
    assert_eq!(s.blend[1].ticker, Ticker::new("TAEE11.SA"));
    assert_eq!(s.blend.len(), 4);
    assert!((s.blend[1].current_weight - 0.25).abs() < 1e-12);
    assert_eq!(s.blend[1].contribution, 0.0);
    let final_sum: f64 = s.blend.iter().map(|r| r.final_weight).sum();
    assert!((final_sum - 1.0).abs() < 1e-9);

    // The report serializes.
    let json = serde_json::to_value(&s).unwrap();
    assert_eq!(json["method"], "sharpe");
    assert_eq!(json["scenario"]["scenario"], "restrictive");
}

#[test]
fn no_candidates_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let prices = data::load_prices(&write(dir.path(), "prices.csv", &prices_csv())).unwrap();
    let quotes = data::load_quotes(&write(
        dir.path(),
        "quotes.csv",
        "ticker,price,target_price\nPETR4.SA,40,35\n",
    ))
    .unwrap();
    let snapshot = data::load_macro(&write(dir.path(), "macro.json", MACRO)).unwrap();
    let config = Config::default();
    let sectors = config.sector_map().unwrap();
    let inputs = SuggestInputs {
        quotes: &quotes,
        prices: &prices,
        snapshot: &snapshot,
        holdings: &[],
        contribution: 1000.0,
        method: None,
    };
    let err = pipeline::suggest(&config, &sectors, &inputs).unwrap_err();
    assert!(matches!(err, Error::NoCandidates(_)));
}

#[test]
fn missing_selic_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot =
        data::load_macro(&write(dir.path(), "macro.json", r#"{ "ipca": 4.0 }"#)).unwrap();
    let err = pipeline::assess(&Config::default(), &snapshot).unwrap_err();
    assert!(err.to_string().contains("selic"));
}

#[test]
fn backtest_with_macro_history() {
    let dir = tempfile::tempdir().unwrap();
    let prices = data::load_prices(&write(dir.path(), "prices.csv", &prices_csv())).unwrap();
    let history =
        data::load_macro_history(&write(dir.path(), "macro.csv", MACRO_HISTORY)).unwrap();

    let config = Config::from_toml(
        r#"
[optimizer]
lookback_months = 3

[backtest]
start = "2023-01-01"
end = "2023-12-31"
contribution = 1000.0
"#,
    )
    .unwrap();
    let sectors = config.sector_map().unwrap();
    let tickers = data::parse_ticker_list("PETR4.SA,VALE3.SA,ITUB4.SA").unwrap();
    let result =
        pipeline::backtest(&config, &sectors, &prices, &history, tickers, Some(Method::Hrp))
            .unwrap();

    assert_eq!(result.months.len(), 12);
    assert!((result.contributed - 12_000.0).abs() < 1e-9);
    assert!(result.months[0].skipped.is_some());
    assert!(result.months.iter().skip(1).any(|m| m.skipped.is_none()));
    // Scenario follows the dated history.
    assert_eq!(result.months[0].scenario, Some(Scenario::Restrictive));
    assert_eq!(result.months[11].scenario, Some(Scenario::Neutral));
    for m in &result.months {
        assert!(m.cash >= -1e-9);
        assert!(m.equity.is_finite());
        assert!(m.benchmark_equity > 0.0);
    }

    let journal_path = dir.path().join("logs").join("journal.jsonl");
    let mut j = Journal::open(&journal_path).unwrap();
    journal::log_backtest(&mut j, &result).unwrap();
    let line = std::fs::read_to_string(&journal_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(v["event"], "backtest_completed");
    assert_eq!(v["months"], 12);
}

#[test]
fn custom_sector_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = r#"{
        "tickers": { "AAA3.SA": "Technology", "BBB4.SA": "Banks" },
        "favored": { "expansionary": ["Technology"], "restrictive": ["Banks"] },
        "exporters": ["AAA3.SA"]
    }"#;
    let path = write(dir.path(), "sectors.json", table);
    let toml = format!("[sectors]\ntable = {:?}\n", path.display().to_string());
    let config = Config::from_toml(&toml).unwrap();
    let map = config.sector_map().unwrap();
    assert_eq!(map.len(), 2);
    assert!(map.is_exporter(&Ticker::new("AAA3.SA")));
    assert!(map.is_favored(&Ticker::new("BBB4.SA"), Scenario::Restrictive));
}
