//! Dated price tables and the return matrices derived from them.
//!
//! A [`PriceTable`] is a dense dates × tickers grid of adjusted closes where
//! any cell may be missing. The optimizers never see it directly: they take a
//! [`ReturnMatrix`] (observations × assets of simple returns).

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::ticker::Ticker;

/// Adjusted close prices indexed by date (rows) and ticker (columns).
#[derive(Clone, Debug, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<Ticker>,
    rows: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table, checking that dates are strictly increasing, tickers
    /// are unique, every row has one cell per ticker, and every present
    /// price is finite and positive.
    pub fn new(
        dates: Vec<NaiveDate>,
        tickers: Vec<Ticker>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if dates.len() != rows.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} dates but {} rows",
                dates.len(),
                rows.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidParameter(
                "dates must be strictly increasing".into(),
            ));
        }
        let mut seen = FxHashMap::default();
        for (i, t) in tickers.iter().enumerate() {
            if seen.insert(*t, i).is_some() {
                return Err(Error::InvalidParameter(format!("duplicate ticker {t}")));
            }
        }
        for (date, row) in dates.iter().zip(&rows) {
            if row.len() != tickers.len() {
                return Err(Error::ShapeMismatch(format!(
                    "row {date} has {} cells, expected {}",
                    row.len(),
                    tickers.len()
                )));
            }
            if row.iter().flatten().any(|p| !p.is_finite() || *p <= 0.0) {
                return Err(Error::NonFinite("price table"));
            }
        }
        Ok(Self {
            dates,
            tickers,
            rows,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Column index of a ticker.
    pub fn column(&self, ticker: &Ticker) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.column(ticker).is_some()
    }

    /// Cell value at (row, ticker).
    pub fn get(&self, row: usize, ticker: &Ticker) -> Option<f64> {
        let col = self.column(ticker)?;
        self.rows.get(row)?.get(col).copied().flatten()
    }

    /// Carry the last seen price forward into missing cells.
    ///
    /// Leading gaps (before a ticker's first price) stay missing.
    pub fn forward_fill(&self) -> Self {
        let mut rows = self.rows.clone();
        let mut last: Vec<Option<f64>> = vec![None; self.tickers.len()];
        for row in &mut rows {
            for (cell, prev) in row.iter_mut().zip(last.iter_mut()) {
                match cell {
                    Some(p) => *prev = Some(*p),
                    None => *cell = *prev,
                }
            }
        }
        Self {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            rows,
        }
    }

    /// Keep only rows where every ticker has a price.
    pub fn drop_incomplete_rows(&self) -> Self {
        let (dates, rows): (Vec<_>, Vec<_>) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(d, r)| (*d, r.clone()))
            .unzip();
        Self {
            dates,
            tickers: self.tickers.clone(),
            rows,
        }
    }

    /// Sub-table with the given columns, in the given order.
    pub fn select(&self, tickers: &[Ticker]) -> Result<Self> {
        let cols: Vec<usize> = tickers
            .iter()
            .map(|t| self.column(t).ok_or(Error::UnknownTicker(*t)))
            .collect::<Result<_>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| cols.iter().map(|&c| row[c]).collect())
            .collect();
        Ok(Self {
            dates: self.dates.clone(),
            tickers: tickers.to_vec(),
            rows,
        })
    }

    /// Rows with `from <= date <= to`.
    pub fn window(&self, from: NaiveDate, to: NaiveDate) -> Self {
        let start = self.dates.partition_point(|d| *d < from);
        let end = self.dates.partition_point(|d| *d <= to);
        let end = end.max(start);
        Self {
            dates: self.dates[start..end].to_vec(),
            tickers: self.tickers.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// Index of the last row dated on or before `date`.
    pub fn asof(&self, date: NaiveDate) -> Option<usize> {
        self.dates.partition_point(|d| *d <= date).checked_sub(1)
    }

    /// Last known price of `ticker` on or before `date`.
    ///
    /// Walks back past missing cells, like `Series.asof`.
    pub fn price_asof(&self, ticker: &Ticker, date: NaiveDate) -> Option<f64> {
        let col = self.column(ticker)?;
        let end = self.asof(date)?;
        self.rows[..=end].iter().rev().find_map(|row| row[col])
    }

    /// Simple returns between consecutive rows.
    ///
    /// A return row is produced only when both the previous and the current
    /// row are complete, which matches `pct_change().dropna()` on a table
    /// that was already forward-filled.
    pub fn returns(&self) -> ReturnMatrix {
        let mut rows = Vec::with_capacity(self.len().saturating_sub(1));
        let mut dates = Vec::with_capacity(rows.capacity());
        for i in 1..self.rows.len() {
            let prev = &self.rows[i - 1];
            let cur = &self.rows[i];
            let r: Option<Vec<f64>> = prev
                .iter()
                .zip(cur)
                .map(|(p, c)| match (p, c) {
                    (Some(p), Some(c)) => Some(c / p - 1.0),
                    _ => None,
                })
                .collect();
            if let Some(r) = r {
                rows.push(r);
                dates.push(self.dates[i]);
            }
        }
        ReturnMatrix {
            tickers: self.tickers.clone(),
            dates,
            rows,
        }
    }
}

/// Simple returns: one row per observation, one column per asset.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
    tickers: Vec<Ticker>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Build from raw rows, checking the shape and finiteness.
    pub fn from_rows(tickers: Vec<Ticker>, rows: Vec<Vec<f64>>) -> Result<Self> {
        for row in &rows {
            if row.len() != tickers.len() {
                return Err(Error::ShapeMismatch(format!(
                    "return row has {} values, expected {}",
                    row.len(),
                    tickers.len()
                )));
            }
            if row.iter().any(|x| !x.is_finite()) {
                return Err(Error::NonFinite("returns"));
            }
        }
        Ok(Self {
            tickers,
            dates: Vec::new(),
            rows,
        })
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Observation dates (empty when built with [`from_rows`](Self::from_rows)).
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of observations.
    pub fn observations(&self) -> usize {
        self.rows.len()
    }

    /// Number of assets.
    pub fn assets(&self) -> usize {
        self.tickers.len()
    }

    pub fn column_means(&self) -> Vec<f64> {
        column_means(&self.rows)
    }
}

pub(crate) fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut sums = vec![0.0; first.len()];
    for row in rows {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += *v;
        }
    }
    let n = rows.len() as f64;
    sums.into_iter().map(|s| s / n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> PriceTable {
        PriceTable::new(
            vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 5)],
            vec![Ticker::new("PETR4.SA"), Ticker::new("VALE3.SA")],
            vec![
                vec![Some(10.0), None],
                vec![Some(11.0), Some(50.0)],
                vec![None, Some(55.0)],
                vec![Some(12.1), Some(44.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_unsorted_dates() {
        let err = PriceTable::new(
            vec![d(2024, 1, 3), d(2024, 1, 2)],
            vec![Ticker::new("A")],
            vec![vec![Some(1.0)], vec![Some(1.0)]],
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_non_positive_price() {
        let err = PriceTable::new(
            vec![d(2024, 1, 2)],
            vec![Ticker::new("A")],
            vec![vec![Some(0.0)]],
        );
        assert_eq!(err, Err(Error::NonFinite("price table")));
    }

    #[test]
    fn rejects_duplicate_tickers() {
        let err = PriceTable::new(
            vec![d(2024, 1, 2)],
            vec![Ticker::new("A"), Ticker::new("A")],
            vec![vec![Some(1.0), Some(2.0)]],
        );
        assert!(matches!(err, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn forward_fill_keeps_leading_gap() {
        let filled = sample().forward_fill();
        let vale = Ticker::new("VALE3.SA");
        let petr = Ticker::new("PETR4.SA");
        assert_eq!(filled.get(0, &vale), None);
        assert_eq!(filled.get(2, &petr), Some(11.0));
    }

    #[test]
    fn returns_skip_incomplete_pairs() {
        // Every consecutive pair has a gap on one side.
        let r = sample().returns();
        assert_eq!(r.observations(), 0);
        assert_eq!(r.assets(), 2);

        let complete = sample().drop_incomplete_rows().returns();
        assert_eq!(complete.observations(), 1);
        assert_eq!(complete.dates(), &[d(2024, 1, 5)]);
        assert!((complete.rows()[0][0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn returns_after_forward_fill() {
        let r = sample().forward_fill().returns();
        assert_eq!(r.observations(), 2);
        assert_eq!(r.dates(), &[d(2024, 1, 4), d(2024, 1, 5)]);
        assert!((r.rows()[0][0]).abs() < 1e-12);
        assert!((r.rows()[0][1] - 0.1).abs() < 1e-12);
        assert!((r.rows()[1][0] - 0.1).abs() < 1e-12);
        assert!((r.rows()[1][1] - (44.0 / 55.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn window_is_inclusive() {
        let w = sample().window(d(2024, 1, 3), d(2024, 1, 4));
        assert_eq!(w.dates(), &[d(2024, 1, 3), d(2024, 1, 4)]);
        let empty = sample().window(d(2025, 1, 1), d(2024, 1, 1));
        assert!(empty.is_empty());
    }

    #[test]
    fn asof_lookup() {
        let t = sample();
        assert_eq!(t.asof(d(2024, 1, 1)), None);
        assert_eq!(t.asof(d(2024, 1, 4)), Some(2));
        assert_eq!(t.asof(d(2030, 1, 1)), Some(3));
        // Missing cell on the 4th: walk back to the 3rd.
        assert_eq!(t.price_asof(&Ticker::new("PETR4.SA"), d(2024, 1, 4)), Some(11.0));
    }

    #[test]
    fn select_reorders_and_rejects_unknown() {
        let t = sample();
        let s = t
            .select(&[Ticker::new("VALE3.SA"), Ticker::new("PETR4.SA")])
            .unwrap();
        assert_eq!(s.get(1, &Ticker::new("VALE3.SA")), Some(50.0));
        assert_eq!(s.column(&Ticker::new("VALE3.SA")), Some(0));
        assert_eq!(
            t.select(&[Ticker::new("XPTO3.SA")]),
            Err(Error::UnknownTicker(Ticker::new("XPTO3.SA")))
        );
    }

    #[test]
    fn drop_incomplete() {
        let t = sample().drop_incomplete_rows();
        assert_eq!(t.dates(), &[d(2024, 1, 3), d(2024, 1, 5)]);
    }
}
