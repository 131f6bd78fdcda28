//! Input collaborators: pre-fetched market snapshots and price files.
//!
//! Network fetching is not done here. A snapshot carries everything one
//! evaluation needs, in the shape the market-data provider returns it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use crate::portfolio::Portfolio;
use crate::utils::error::{Error, Result};
use crate::utils::types::{FinancialMetrics, InsiderTrade, PriceBar, SignalReading};

/// Insider trades considered per evaluation when no limit is given.
pub const DEFAULT_TRADE_LIMIT: usize = 5;

/// Everything fetched for one ticker before the pipeline runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    /// Provider returns a list; the first record is the current period.
    #[serde(default)]
    pub financial_metrics: Vec<FinancialMetrics>,
    #[serde(default)]
    pub insider_trades: Vec<InsiderTrade>,
    #[serde(default)]
    pub prices: Vec<PriceBar>,
    #[serde(default)]
    pub portfolio: Option<PortfolioRecord>,
    /// Readings from the external technical-analysis producer, if any.
    #[serde(default)]
    pub technical: Option<SignalReading>,
    /// Readings from the external valuation-model producer, if any.
    #[serde(default)]
    pub valuation: Option<SignalReading>,
}

impl MarketSnapshot {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::DataError(format!("Failed to read snapshot {:?}: {}", path.as_ref(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Restrict the snapshot to what was known as of `end`.
    ///
    /// Bars outside `[start, end]` are dropped. Trades dated after `end` are
    /// dropped; the rest are ordered most recent first and cut to
    /// `trade_limit`. Undated trades sort after dated ones.
    pub fn window(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>, trade_limit: usize) -> Self {
        let bars = self.prices.len();
        self.prices.retain(|bar| {
            start.map_or(true, |s| bar.time >= s) && end.map_or(true, |e| bar.time <= e)
        });

        let trades = self.insider_trades.len();
        if let Some(end) = end {
            self.insider_trades.retain(|t| t.date.map_or(true, |d| d <= end));
        }
        self.insider_trades.sort_by_key(|t| Reverse(t.date));
        self.insider_trades.truncate(trade_limit);

        log::debug!(
            "{} windowed to {:?}..{:?}: {}/{} bar(s), {}/{} insider trade(s)",
            self.ticker,
            start,
            end,
            self.prices.len(),
            bars,
            self.insider_trades.len(),
            trades
        );
        self
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Holdings as a snapshot carries them. Fields stay optional at the
/// deserialization boundary so a partial record is reported as missing input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioRecord {
    pub cash: Option<f64>,
    pub stock: Option<u64>,
}

impl PortfolioRecord {
    pub fn into_portfolio(self) -> Result<Portfolio> {
        let cash = self.cash.ok_or_else(|| Error::missing("portfolio.cash"))?;
        let stock = self.stock.ok_or_else(|| Error::missing("portfolio.stock"))?;
        Ok(Portfolio::new(cash, stock))
    }
}

impl From<Portfolio> for PortfolioRecord {
    fn from(p: Portfolio) -> Self {
        Self { cash: Some(p.cash), stock: Some(p.stock) }
    }
}

/// Source of snapshots.
pub trait DataProvider {
    fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot>;
}

/// Reads `<dir>/<TICKER>.json`.
#[derive(Debug, Clone)]
pub struct FileProvider {
    dir: PathBuf,
}

impl FileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.json", ticker.to_uppercase()))
    }
}

impl DataProvider for FileProvider {
    fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot> {
        let path = self.path_for(ticker);
        let mut snapshot = MarketSnapshot::from_file(&path)?;
        if snapshot.ticker.is_empty() {
            snapshot.ticker = ticker.to_uppercase();
        } else if !snapshot.ticker.eq_ignore_ascii_case(ticker) {
            log::warn!("snapshot {:?} is for {}, requested {}", path, snapshot.ticker, ticker);
        }
        log::debug!(
            "loaded {}: {} metric record(s), {} insider trade(s), {} bar(s)",
            snapshot.ticker,
            snapshot.financial_metrics.len(),
            snapshot.insider_trades.len(),
            snapshot.prices.len()
        );
        Ok(snapshot)
    }
}

/// Read OHLCV bars from a CSV with header `time,open,high,low,close,volume`.
pub fn load_prices_csv<P: AsRef<Path>>(path: P) -> Result<Vec<PriceBar>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_path(path)?;
    let mut bars = Vec::new();
    for row in rdr.deserialize() {
        let bar: PriceBar = row?;
        bars.push(bar);
    }
    bars.sort_by_key(|b| b.time);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::TransactionType;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const SNAPSHOT: &str = r#"{
        "ticker": "MSFT",
        "financial_metrics": [{"return_on_equity": 0.3, "beta": 0.9}],
        "insider_trades": [
            {"shares": 100.0, "value": 40000.0, "transaction_type": "buy", "date": "2024-03-01", "insider_name": "J. Doe"}
        ],
        "prices": [{"time": "2024-03-01", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0}],
        "portfolio": {"cash": 100000.0, "stock": 0},
        "technical": {"signal": "bearish", "confidence": 0.4}
    }"#;

    #[test]
    fn parses_provider_snapshot() {
        let s = MarketSnapshot::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(s.ticker, "MSFT");
        assert_eq!(s.financial_metrics[0].return_on_equity, Some(0.3));
        assert_eq!(s.insider_trades[0].insider_name.as_deref(), Some("J. Doe"));
        assert!(s.valuation.is_none());
        assert_eq!(s.technical.unwrap().confidence.value(), 0.4);
    }

    #[test]
    fn file_provider_reads_uppercase_ticker_file() {
        let dir = tempdir().unwrap();
        let provider = FileProvider::new(dir.path());
        std::fs::write(provider.path_for("msft"), SNAPSHOT).unwrap();
        let s = provider.snapshot("msft").unwrap();
        assert_eq!(s.prices.len(), 1);

        assert_matches!(provider.snapshot("NOPE"), Err(Error::DataError(_)));
    }

    #[test]
    fn snapshot_save_round_trips_portfolio() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/AAPL.json");
        let snapshot = MarketSnapshot {
            ticker: "AAPL".into(),
            portfolio: Some(Portfolio::new(5.0, 1).into()),
            ..Default::default()
        };
        snapshot.save(&path).unwrap();
        let loaded = MarketSnapshot::from_file(&path).unwrap();
        assert_eq!(loaded.portfolio.unwrap().into_portfolio().unwrap(), Portfolio::new(5.0, 1));
    }

    fn dated(day: u32, tx: TransactionType) -> InsiderTrade {
        InsiderTrade { date: NaiveDate::from_ymd_opt(2024, 3, day), ..InsiderTrade::new(10.0, 1_000.0, tx) }
    }

    fn bar(day: u32) -> PriceBar {
        PriceBar {
            time: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: day as f64,
            high: day as f64,
            low: day as f64,
            close: day as f64,
            volume: 1.0,
        }
    }

    #[test]
    fn window_bounds_prices_and_trades() {
        let snapshot = MarketSnapshot {
            ticker: "AAPL".into(),
            prices: (1..=10).map(bar).collect(),
            insider_trades: vec![
                dated(2, TransactionType::Sell),
                dated(9, TransactionType::Buy),
                dated(4, TransactionType::Buy),
                InsiderTrade::new(1.0, 1.0, TransactionType::Sell),
                dated(6, TransactionType::Buy),
                dated(3, TransactionType::Sell),
                dated(5, TransactionType::Buy),
                dated(1, TransactionType::Sell),
            ],
            ..Default::default()
        };

        let start = NaiveDate::from_ymd_opt(2024, 3, 3);
        let end = NaiveDate::from_ymd_opt(2024, 3, 7);
        let w = snapshot.window(start, end, DEFAULT_TRADE_LIMIT);

        let closes: Vec<f64> = w.prices.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![3.0, 4.0, 5.0, 6.0, 7.0]);

        // day 9 is after `end`; most recent five remain, newest first
        let days: Vec<Option<NaiveDate>> = w.insider_trades.iter().map(|t| t.date).collect();
        let expected: Vec<Option<NaiveDate>> =
            [6, 5, 4, 3, 2].iter().map(|d| NaiveDate::from_ymd_opt(2024, 3, *d)).collect();
        assert_eq!(days, expected);
    }

    #[test]
    fn open_window_only_caps_trades() {
        let snapshot = MarketSnapshot {
            prices: (1..=3).map(bar).collect(),
            insider_trades: vec![
                InsiderTrade::new(1.0, 1.0, TransactionType::Buy),
                dated(2, TransactionType::Sell),
                dated(8, TransactionType::Buy),
            ],
            ..Default::default()
        };
        let w = snapshot.window(None, None, 2);
        assert_eq!(w.prices.len(), 3);
        assert_eq!(w.insider_trades.len(), 2);
        assert_eq!(w.insider_trades[0].date, NaiveDate::from_ymd_opt(2024, 3, 8));
        assert_eq!(w.insider_trades[1].date, NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn window_past_all_bars_leaves_nothing_to_price() {
        let snapshot = MarketSnapshot {
            ticker: "AAPL".into(),
            financial_metrics: vec![FinancialMetrics::default()],
            prices: (1..=3).map(bar).collect(),
            portfolio: Some(Portfolio::new(1.0, 0).into()),
            ..Default::default()
        };
        let w = snapshot.window(NaiveDate::from_ymd_opt(2024, 4, 1), None, DEFAULT_TRADE_LIMIT);
        assert_matches!(
            crate::pipeline::DecisionContext::from_snapshot(w),
            Err(Error::MissingInput(f)) if f == "prices"
        );
    }

    #[test]
    fn csv_prices_are_sorted() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(tmp, "time,open,high,low,close,volume")?;
        writeln!(tmp, "2024-01-03,3,3,3,3,100")?;
        writeln!(tmp, "2024-01-01,1,1,1,1,100")?;
        writeln!(tmp, "2024-01-02,2,2,2,2,100")?;
        tmp.flush()?;
        let bars = load_prices_csv(tmp.path())?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        Ok(())
    }
}
