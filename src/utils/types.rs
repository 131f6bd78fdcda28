//! Common types used throughout the decision pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::error::{Error, Result};

/// Categorical market view produced by every analyzer stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            | Signal::Bullish => "bullish",
            | Signal::Bearish => "bearish",
            | Signal::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strength of a [`Signal`], always within [0, 1].
///
/// Construction clamps out-of-range values and maps NaN to 0 so nothing
/// non-finite reaches downstream arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const NEUTRAL: Confidence = Confidence(0.5);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            log::warn!("confidence is NaN, using 0");
            return Confidence(0.0);
        }
        if !(0.0..=1.0).contains(&value) {
            log::warn!("confidence {} outside [0, 1], clamping", value);
        }
        Confidence(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::NEUTRAL
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Confidence::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

/// A (signal, confidence) pair. Every upstream producer, internal or external,
/// speaks this shape. The default is neutral at 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SignalReading {
    pub signal: Signal,
    pub confidence: Confidence,
}

impl SignalReading {
    pub fn new(signal: Signal, confidence: f64) -> Self {
        Self { signal, confidence: Confidence::new(confidence) }
    }

    pub fn neutral() -> Self {
        Self::default()
    }
}

/// The four readings the risk and portfolio stages weigh. Absent producers
/// are represented by the neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct UpstreamSignals {
    pub fundamentals: SignalReading,
    pub technical: SignalReading,
    pub sentiment: SignalReading,
    pub valuation: SignalReading,
}

impl UpstreamSignals {
    pub fn as_array(&self) -> [SignalReading; 4] {
        [self.fundamentals, self.technical, self.sentiment, self.valuation]
    }

    /// Sum of confidences over the readings that carry `signal`.
    pub fn weight_of(&self, signal: Signal) -> f64 {
        self.as_array()
            .iter()
            .filter(|r| r.signal == signal)
            .map(|r| r.confidence.value())
            .sum()
    }
}

/// Names of the fields carried by [`FinancialMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    ReturnOnEquity,
    NetMargin,
    OperatingMargin,
    RevenueGrowth,
    EarningsGrowth,
    BookValueGrowth,
    DebtToEquity,
    CurrentRatio,
    QuickRatio,
    FreeCashFlowPerShare,
    EarningsPerShare,
    PriceToEarnings,
    PriceToBook,
    PriceToSales,
    Beta,
    MarketCap,
}

impl MetricField {
    pub fn as_str(&self) -> &'static str {
        match self {
            | MetricField::ReturnOnEquity => "return_on_equity",
            | MetricField::NetMargin => "net_margin",
            | MetricField::OperatingMargin => "operating_margin",
            | MetricField::RevenueGrowth => "revenue_growth",
            | MetricField::EarningsGrowth => "earnings_growth",
            | MetricField::BookValueGrowth => "book_value_growth",
            | MetricField::DebtToEquity => "debt_to_equity",
            | MetricField::CurrentRatio => "current_ratio",
            | MetricField::QuickRatio => "quick_ratio",
            | MetricField::FreeCashFlowPerShare => "free_cash_flow_per_share",
            | MetricField::EarningsPerShare => "earnings_per_share",
            | MetricField::PriceToEarnings => "price_to_earnings",
            | MetricField::PriceToBook => "price_to_book",
            | MetricField::PriceToSales => "price_to_sales",
            | MetricField::Beta => "beta",
            | MetricField::MarketCap => "market_cap",
        }
    }
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat snapshot of financial ratios for one ticker and period.
///
/// Fields are optional at the deserialization boundary; scoring code reads
/// them through [`FinancialMetrics::require`], which turns an absent value
/// into [`Error::MissingInput`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialMetrics {
    pub return_on_equity: Option<f64>,
    pub net_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub book_value_growth: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub price_to_earnings: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub beta: Option<f64>,
    pub market_cap: Option<f64>,
    // informational, not scored
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

impl FinancialMetrics {
    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            | MetricField::ReturnOnEquity => self.return_on_equity,
            | MetricField::NetMargin => self.net_margin,
            | MetricField::OperatingMargin => self.operating_margin,
            | MetricField::RevenueGrowth => self.revenue_growth,
            | MetricField::EarningsGrowth => self.earnings_growth,
            | MetricField::BookValueGrowth => self.book_value_growth,
            | MetricField::DebtToEquity => self.debt_to_equity,
            | MetricField::CurrentRatio => self.current_ratio,
            | MetricField::QuickRatio => self.quick_ratio,
            | MetricField::FreeCashFlowPerShare => self.free_cash_flow_per_share,
            | MetricField::EarningsPerShare => self.earnings_per_share,
            | MetricField::PriceToEarnings => self.price_to_earnings,
            | MetricField::PriceToBook => self.price_to_book,
            | MetricField::PriceToSales => self.price_to_sales,
            | MetricField::Beta => self.beta,
            | MetricField::MarketCap => self.market_cap,
        }
    }

    /// Read a field that scoring depends on. Absent or non-finite values fail fast.
    pub fn require(&self, field: MetricField) -> Result<f64> {
        match self.get(field) {
            | Some(v) if v.is_finite() => Ok(v),
            | Some(v) => Err(Error::MissingInput(format!("{} is not a finite number ({})", field, v))),
            | None => Err(Error::missing(field.as_str())),
        }
    }
}

/// Direction of an insider transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
}

/// One insider trade as reported by the data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsiderTrade {
    pub shares: f64,
    pub value: f64,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub insider_name: Option<String>,
}

impl InsiderTrade {
    pub fn new(shares: f64, value: f64, transaction_type: TransactionType) -> Self {
        Self { shares, value, transaction_type, date: None, insider_name: None }
    }

    pub fn is_buy(&self) -> bool {
        self.transaction_type == TransactionType::Buy
    }
}

/// Daily OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    pub time: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Side of the final order. `Hold` always carries a zero quantity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | OrderAction::Buy => f.write_str("buy"),
            | OrderAction::Sell => f.write_str("sell"),
            | OrderAction::Hold => f.write_str("hold"),
        }
    }
}

/// Terminal output of the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub action: OrderAction,
    pub quantity: u64,
}

impl Order {
    pub fn hold() -> Self {
        Self { action: OrderAction::Hold, quantity: 0 }
    }

    /// Order that moves a holding of `current` shares to `target` shares.
    pub fn rebalance(current: u64, target: u64) -> Self {
        match target.cmp(&current) {
            | std::cmp::Ordering::Greater => Self { action: OrderAction::Buy, quantity: target - current },
            | std::cmp::Ordering::Less => Self { action: OrderAction::Sell, quantity: current - target },
            | std::cmp::Ordering::Equal => Self::hold(),
        }
    }
}
