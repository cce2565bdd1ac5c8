//! Plain-text tables for the terminal.

use std::fmt::Write;

use macrofolio::{BacktestResult, Method, SectorMap};

use crate::pipeline::{ScenarioReport, Suggestion};

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"))
}

pub fn scenario(r: &ScenarioReport) -> String {
    let m = &r.snapshot;
    let mut s = String::new();
    let _ = writeln!(s, "MACRO INDICATORS:");
    let _ = writeln!(s, "  SELIC       {:>8}", opt(m.selic));
    let _ = writeln!(s, "  IPCA        {:>8}", opt(m.ipca));
    let _ = writeln!(s, "  USD/BRL     {:>8}", opt(m.usd_brl));
    let _ = writeln!(s, "  Oil         {:>8}", opt(m.oil));
    let _ = writeln!(s, "  Target      {:>8.2}", m.inflation_target);
    let _ = writeln!(s, "\nScenario: {} (score {:+.2})", r.scenario, r.score);
    s
}

pub fn suggestion(sg: &Suggestion) -> String {
    let mut s = scenario(&sg.scenario);

    let _ = writeln!(s, "\nCANDIDATES:");
    let _ = writeln!(
        s,
        "  {:>3}  {:10} {:32} {:>9} {:>9} {:>7}",
        "#", "Ticker", "Sector", "Price", "Target", "Score"
    );
    for (i, c) in sg.candidates.iter().enumerate() {
        let _ = writeln!(
            s,
            "  {:>3}  {:10} {:32} {:>9.2} {:>9.2} {:>7.3}{}",
            i + 1,
            c.ticker,
            c.sector.as_deref().unwrap_or("-"),
            c.price,
            c.target_price,
            c.score,
            if c.favored { "  *" } else { "" },
        );
    }

    let _ = writeln!(
        s,
        "\nALLOCATION ({}, contribution {:.2}):",
        sg.method, sg.contribution
    );
    let _ = writeln!(
        s,
        "  {:10} {:>8} {:>12} {:>9} {:>9}",
        "Ticker", "Weight", "Amount", "Current", "Final"
    );
    for row in &sg.blend {
        let weight = sg
            .weights
            .iter()
            .find(|(t, _)| *t == row.ticker)
            .map_or(0.0, |(_, w)| *w);
        let _ = writeln!(
            s,
            "  {:10} {:>7.2}% {:>12.2} {:>8.2}% {:>8.2}%",
            row.ticker,
            weight * 100.0,
            row.contribution,
            row.current_weight * 100.0,
            row.final_weight * 100.0,
        );
    }
    s
}

pub fn backtest(result: &BacktestResult) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "  {:10} {:>12} {:>12} {:>12} {:>6}  {}",
        "Month", "Equity", "Benchmark", "Contributed", "Assets", "Note"
    );
    for m in &result.months {
        let _ = writeln!(
            s,
            "  {:10} {:>12.2} {:>12.2} {:>12.2} {:>6}  {}",
            m.date.format("%Y-%m"),
            m.equity,
            m.benchmark_equity,
            m.contributed,
            m.assets,
            m.skipped.as_deref().unwrap_or(""),
        );
    }
    let _ = writeln!(s);
    let _ = writeln!(s, "Contributed:        {:>12.2}", result.contributed);
    let _ = writeln!(s, "Final equity:       {:>12.2}", result.final_equity);
    let _ = writeln!(s, "Final benchmark:    {:>12.2}", result.final_benchmark);
    let _ = writeln!(s, "CAGR (strategy):    {:>11.2}%", result.cagr * 100.0);
    let _ = writeln!(s, "CAGR (benchmark):   {:>11.2}%", result.benchmark_cagr * 100.0);
    if let Some(m) = &result.metrics {
        let _ = writeln!(s, "\nStrategy (time-weighted):\n{m}");
    }
    if let Some(m) = &result.benchmark_metrics {
        let _ = writeln!(s, "\nBenchmark (time-weighted):\n{m}");
    }
    s
}

pub fn comparison(rows: &[(Method, Result<BacktestResult, crate::error::Error>)]) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "  {:14} {:>12} {:>9} {:>9} {:>9}",
        "Method", "Final", "CAGR", "Sharpe", "MaxDD"
    );
    for (method, res) in rows {
        match res {
            Ok(r) => {
                let (sharpe, dd) = r
                    .metrics
                    .as_ref()
                    .map_or((0.0, 0.0), |m| (m.sharpe, m.max_drawdown));
                let _ = writeln!(
                    s,
                    "  {:14} {:>12.2} {:>8.2}% {:>9.2} {:>8.2}%",
                    method.to_string(),
                    r.final_equity,
                    r.cagr * 100.0,
                    sharpe,
                    dd * 100.0
                );
            }
            Err(e) => {
                let _ = writeln!(s, "  {:14} error: {e}", method.to_string());
            }
        }
    }
    s
}

pub fn sectors(map: &SectorMap) -> String {
    let table = map.to_table();
    let mut s = String::new();
    let _ = writeln!(s, "  {:10} {:32} {}", "Ticker", "Sector", "Exporter");
    for (ticker, sector) in &table.tickers {
        let exporter = table.exporters.iter().any(|e| e == ticker);
        let _ = writeln!(
            s,
            "  {:10} {:32} {}",
            ticker,
            sector,
            if exporter { "yes" } else { "" }
        );
    }
    for (scenario, list) in &table.favored {
        let _ = writeln!(s, "\nFavored when {scenario}: {}", list.join(", "));
    }
    s
}
