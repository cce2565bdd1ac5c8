//! JSONL run journal.
//!
//! Every advisor command appends events to a journal file, one JSON object
//! per line, so past suggestions can be compared with what happened next.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use macrofolio::{BacktestResult, BlendRow, Candidate, MacroSnapshot, Scenario};

use crate::error::Result;

/// One journal line.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only journal writer.
pub struct Journal {
    writer: BufWriter<fs::File>,
}

impl Journal {
    /// Open (or create) the journal for appending, creating parent dirs.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append an event with arbitrary JSON payload.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = JournalEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn log_command(journal: &mut Journal, command: &str, inputs: &[(&str, String)]) -> Result<()> {
    let inputs: serde_json::Map<String, serde_json::Value> = inputs
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::String(v.clone())))
        .collect();
    journal.log(
        "command_started",
        serde_json::json!({ "command": command, "inputs": inputs }),
    )
}

pub fn log_scenario(
    journal: &mut Journal,
    snapshot: &MacroSnapshot,
    scenario: Scenario,
    score: f64,
) -> Result<()> {
    journal.log(
        "scenario",
        serde_json::json!({
            "macro": snapshot,
            "scenario": scenario,
            "score": score,
        }),
    )
}

pub fn log_candidates(journal: &mut Journal, candidates: &[Candidate]) -> Result<()> {
    let rows: Vec<_> = candidates
        .iter()
        .map(|c| {
            serde_json::json!({
                "ticker": c.ticker.as_str(),
                "score": c.score,
                "favored": c.favored,
            })
        })
        .collect();
    journal.log("screened", serde_json::json!({ "candidates": rows }))
}

pub fn log_allocation(journal: &mut Journal, rows: &[BlendRow], amount: f64) -> Result<()> {
    journal.log(
        "allocation",
        serde_json::json!({ "contribution": amount, "rows": rows }),
    )
}

pub fn log_backtest(journal: &mut Journal, result: &BacktestResult) -> Result<()> {
    let skipped = result.months.iter().filter(|m| m.skipped.is_some()).count();
    journal.log(
        "backtest_completed",
        serde_json::json!({
            "months": result.months.len(),
            "skipped": skipped,
            "contributed": result.contributed,
            "final_equity": result.final_equity,
            "final_benchmark": result.final_benchmark,
            "cagr": result.cagr,
            "benchmark_cagr": result.benchmark_cagr,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        {
            let mut j = Journal::open(&path).unwrap();
            log_command(&mut j, "scenario", &[("macro", "macro.json".into())]).unwrap();
            let m = MacroSnapshot {
                selic: Some(10.5),
                ipca: Some(4.2),
                ..MacroSnapshot::default()
            };
            log_scenario(&mut j, &m, Scenario::Neutral, 0.15).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "command_started");
        assert_eq!(first["inputs"]["macro"], "macro.json");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["scenario"], "neutral");
        assert_eq!(second["macro"]["selic"], 10.5);
        assert!(second["ts"].is_string());
    }

    #[test]
    fn journal_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("journal.jsonl");
        for _ in 0..2 {
            let mut j = Journal::open(&path).unwrap();
            j.log("ping", serde_json::json!({})).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
