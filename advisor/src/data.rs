//! Loading market data from local CSV and JSON files.
//!
//! Formats:
//!
//! - prices: wide CSV `date,T1,T2,...`, one row per date, blank = missing
//! - quotes: `ticker,price,target_price`
//! - holdings: `ticker,value` (current market value)
//! - macro history: `date,selic,ipca,usd_brl,oil`, blanks allowed
//! - macro snapshot: JSON object with the same indicator fields

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use log::warn;
use rustc_hash::FxHashSet;
use serde::Deserialize;

use macrofolio::{MacroHistory, MacroSnapshot, PriceTable, Quote, Ticker};

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Accept timestamps such as "2024-01-02 00:00:00" by keeping the date part.
    let s = raw.trim();
    let s = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn parse_ticker(raw: &str) -> Option<Ticker> {
    let upper = raw.trim().to_ascii_uppercase();
    Ticker::try_new(&upper).filter(|t| !t.is_empty())
}

/// Parse a comma-separated ticker list such as `"petr4.sa, VALE3.SA"`.
/// Repeats are dropped, first occurrence wins.
pub fn parse_ticker_list(list: &str) -> Result<Vec<Ticker>> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for s in list.split(',').filter(|s| !s.trim().is_empty()) {
        let t = parse_ticker(s).ok_or_else(|| Error::Config(format!("invalid ticker '{}'", s.trim())))?;
        if seen.insert(t) {
            out.push(t);
        }
    }
    Ok(out)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a wide price CSV.
pub fn load_prices(path: &Path) -> Result<PriceTable> {
    read_prices(open(path)?, path)
}

/// Parse a wide price CSV. `origin` only labels errors.
pub fn read_prices<R: Read>(reader: R, origin: &Path) -> Result<PriceTable> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 {
        return Err(Error::data(origin, "expected a date column and at least one ticker"));
    }
    let tickers = headers
        .iter()
        .skip(1)
        .map(|h| parse_ticker(h).ok_or_else(|| Error::data(origin, format!("bad ticker header '{h}'"))))
        .collect::<Result<Vec<_>>>()?;

    let mut records: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let raw_date = rec.get(0).unwrap_or_default();
        let date = parse_date(raw_date)
            .ok_or_else(|| Error::data(origin, format!("row {}: bad date '{raw_date}'", line + 2)))?;
        let cells = (1..headers.len())
            .map(|i| match rec.get(i).unwrap_or_default() {
                "" | "NaN" | "nan" => Ok(None),
                s => s.parse::<f64>().map(Some).map_err(|_| {
                    Error::data(origin, format!("row {}: bad price '{s}'", line + 2))
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        records.push((date, cells));
    }
    records.sort_by_key(|(d, _)| *d);

    let (dates, rows): (Vec<_>, Vec<_>) = records.into_iter().unzip();
    Ok(PriceTable::new(dates, tickers, rows)?)
}

#[derive(Deserialize)]
struct QuoteRow {
    ticker: String,
    price: Option<f64>,
    target_price: Option<f64>,
}

/// Load quotes; rows without a price or target are skipped with a warning.
pub fn load_quotes(path: &Path) -> Result<Vec<Quote>> {
    read_quotes(open(path)?, path)
}

/// Parse quotes. A ticker listed twice keeps its first row.
pub fn read_quotes<R: Read>(reader: R, origin: &Path) -> Result<Vec<Quote>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for row in rdr.deserialize::<QuoteRow>() {
        let row = row?;
        let ticker = parse_ticker(&row.ticker)
            .ok_or_else(|| Error::data(origin, format!("bad ticker '{}'", row.ticker)))?;
        if !seen.insert(ticker) {
            warn!("{ticker}: duplicate quote, keeping the first");
            continue;
        }
        match (row.price, row.target_price) {
            (Some(price), Some(target)) => out.push(Quote::new(ticker, price, target)),
            _ => warn!("{ticker}: missing price or target, skipped"),
        }
    }
    Ok(out)
}

#[derive(Deserialize)]
struct HoldingRow {
    ticker: String,
    value: f64,
}

/// Load current holdings as `(ticker, market value)`.
pub fn load_holdings(path: &Path) -> Result<Vec<(Ticker, f64)>> {
    read_holdings(open(path)?, path)
}

pub fn read_holdings<R: Read>(reader: R, origin: &Path) -> Result<Vec<(Ticker, f64)>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize::<HoldingRow>()
        .map(|row| {
            let row = row?;
            let ticker = parse_ticker(&row.ticker)
                .ok_or_else(|| Error::data(origin, format!("bad ticker '{}'", row.ticker)))?;
            if !(row.value.is_finite() && row.value >= 0.0) {
                return Err(Error::data(origin, format!("{ticker}: bad value {}", row.value)));
            }
            Ok((ticker, row.value))
        })
        .collect()
}

/// Load a macro snapshot from JSON.
pub fn load_macro(path: &Path) -> Result<MacroSnapshot> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[derive(Deserialize)]
struct MacroRow {
    date: String,
    selic: Option<f64>,
    ipca: Option<f64>,
    usd_brl: Option<f64>,
    oil: Option<f64>,
}

/// Load dated macro snapshots from CSV.
pub fn load_macro_history(path: &Path) -> Result<MacroHistory> {
    read_macro_history(open(path)?, path)
}

pub fn read_macro_history<R: Read>(reader: R, origin: &Path) -> Result<MacroHistory> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let entries = rdr
        .deserialize::<MacroRow>()
        .map(|row| {
            let row = row?;
            let date = parse_date(&row.date)
                .ok_or_else(|| Error::data(origin, format!("bad date '{}'", row.date)))?;
            let snapshot = MacroSnapshot {
                selic: row.selic,
                ipca: row.ipca,
                usd_brl: row.usd_brl,
                oil: row.oil,
                ..MacroSnapshot::default()
            };
            Ok((date, snapshot))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(MacroHistory::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn prices_with_gaps_and_unsorted_rows() {
        let csv = "date,PETR4.SA,vale3.sa\n\
                   2024-01-03,36.1,\n\
                   2024-01-02 00:00:00,35.9,68.0\n";
        let table = read_prices(csv.as_bytes(), origin()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.tickers()[1], Ticker::new("VALE3.SA"));
        assert_eq!(table.dates()[0], NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(table.get(1, &Ticker::new("VALE3.SA")), None);
        assert_eq!(table.get(1, &Ticker::new("PETR4.SA")), Some(36.1));
    }

    #[test]
    fn prices_reject_garbage() {
        let csv = "date,PETR4.SA\n2024-01-02,abc\n";
        assert!(read_prices(csv.as_bytes(), origin()).is_err());
        let csv = "date,PETR4.SA\nyesterday,1.0\n";
        assert!(read_prices(csv.as_bytes(), origin()).is_err());
        let csv = "date,PETR4.SA\n2024-01-02,1.0\n2024-01-02,1.1\n";
        assert!(read_prices(csv.as_bytes(), origin()).is_err());
        assert!(read_prices("date\n2024-01-02\n".as_bytes(), origin()).is_err());
    }

    #[test]
    fn quotes_skip_incomplete_rows() {
        let csv = "ticker,price,target_price\n\
                   itub4.sa,30.5,36\n\
                   WEGE3.SA,40,\n\
                   ITUB4.SA,31,40\n";
        let quotes = read_quotes(csv.as_bytes(), origin()).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].ticker, Ticker::new("ITUB4.SA"));
        assert_eq!(quotes[0].target_price, 36.0);
    }

    #[test]
    fn holdings() {
        let csv = "ticker,value\nBBAS3.SA,1200.50\nTAEE11.SA,800\n";
        let h = read_holdings(csv.as_bytes(), origin()).unwrap();
        assert_eq!(h, vec![(Ticker::new("BBAS3.SA"), 1200.5), (Ticker::new("TAEE11.SA"), 800.0)]);
        let bad = "ticker,value\nBBAS3.SA,-1\n";
        assert!(read_holdings(bad.as_bytes(), origin()).is_err());
    }

    #[test]
    fn macro_history_rows() {
        let csv = "date,selic,ipca,usd_brl,oil\n\
                   2023-01-01,13.75,5.8,5.2,80\n\
                   2024-01-01,11.75,4.5,,\n";
        let h = read_macro_history(csv.as_bytes(), origin()).unwrap();
        assert_eq!(h.len(), 2);
        let m = h.asof(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()).unwrap();
        assert_eq!(m.selic, Some(11.75));
        assert_eq!(m.usd_brl, None);
    }

    #[test]
    fn ticker_lists() {
        let v = parse_ticker_list("petr4.sa, VALE3.SA,,PETR4.SA").unwrap();
        assert_eq!(v, vec![Ticker::new("PETR4.SA"), Ticker::new("VALE3.SA")]);
        assert!(parse_ticker_list("THIS_TICKER_IS_TOO_LONG").is_err());
    }
}
