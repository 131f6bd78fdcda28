//! Accumulating decision context threaded through the stages.
//!
//! Inputs are fixed at construction. Each stage owns one write-once slot;
//! publishing into a filled slot fails with [`Error::AlreadyPublished`].

use crate::analysis::fundamentals::FundamentalsReport;
use crate::analysis::sentiment::SentimentReport;
use crate::data::MarketSnapshot;
use crate::portfolio::manager::TradeDecision;
use crate::portfolio::Portfolio;
use crate::risk::manager::RiskAssessment;
use crate::utils::error::{Error, Result};
use crate::utils::types::{FinancialMetrics, InsiderTrade, PriceBar, SignalReading, UpstreamSignals};

#[derive(Debug, Clone)]
pub struct DecisionContext {
    ticker: String,
    metrics: FinancialMetrics,
    insider_trades: Vec<InsiderTrade>,
    prices: Vec<PriceBar>,
    portfolio: Portfolio,

    technical: Option<SignalReading>,
    valuation: Option<SignalReading>,
    fundamentals: Option<FundamentalsReport>,
    sentiment: Option<SentimentReport>,
    risk: Option<RiskAssessment>,
    decision: Option<TradeDecision>,
}

fn publish_once<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<()> {
    if slot.is_some() {
        return Err(Error::AlreadyPublished(name));
    }
    *slot = Some(value);
    Ok(())
}

impl DecisionContext {
    /// Build a context from already-fetched inputs. Prices are sorted by time.
    pub fn new(
        ticker: impl Into<String>, metrics: FinancialMetrics, insider_trades: Vec<InsiderTrade>,
        mut prices: Vec<PriceBar>, portfolio: Portfolio,
    ) -> Result<Self> {
        if prices.is_empty() {
            return Err(Error::missing("prices"));
        }
        prices.sort_by_key(|bar| bar.time);
        Ok(Self {
            ticker: ticker.into(),
            metrics,
            insider_trades,
            prices,
            portfolio,
            technical: None,
            valuation: None,
            fundamentals: None,
            sentiment: None,
            risk: None,
            decision: None,
        })
    }

    /// Build a context from a provider snapshot. The first metrics record is used.
    pub fn from_snapshot(snapshot: MarketSnapshot) -> Result<Self> {
        let MarketSnapshot {
            ticker,
            financial_metrics,
            insider_trades,
            prices,
            portfolio,
            technical,
            valuation,
        } = snapshot;
        let metrics = financial_metrics
            .into_iter()
            .next()
            .ok_or_else(|| Error::missing("financial_metrics"))?;
        let portfolio = portfolio.ok_or_else(|| Error::missing("portfolio"))?.into_portfolio()?;
        let mut ctx = Self::new(ticker, metrics, insider_trades, prices, portfolio)?;
        if let Some(reading) = technical {
            ctx.publish_technical(reading)?;
        }
        if let Some(reading) = valuation {
            ctx.publish_valuation(reading)?;
        }
        Ok(ctx)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn metrics(&self) -> &FinancialMetrics {
        &self.metrics
    }

    pub fn insider_trades(&self) -> &[InsiderTrade] {
        &self.insider_trades
    }

    pub fn prices(&self) -> &[PriceBar] {
        &self.prices
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Close of the most recent bar.
    pub fn current_price(&self) -> f64 {
        // non-empty by construction
        self.prices.last().map(|bar| bar.close).unwrap_or(0.0)
    }

    pub fn fundamentals(&self) -> Option<&FundamentalsReport> {
        self.fundamentals.as_ref()
    }

    pub fn sentiment(&self) -> Option<&SentimentReport> {
        self.sentiment.as_ref()
    }

    pub fn technical(&self) -> Option<SignalReading> {
        self.technical
    }

    pub fn valuation(&self) -> Option<SignalReading> {
        self.valuation
    }

    pub fn risk(&self) -> Option<&RiskAssessment> {
        self.risk.as_ref()
    }

    pub fn decision(&self) -> Option<&TradeDecision> {
        self.decision.as_ref()
    }

    /// Upstream readings with absent producers defaulted to neutral at 0.5.
    pub fn upstream_signals(&self) -> UpstreamSignals {
        UpstreamSignals {
            fundamentals: self.fundamentals.as_ref().map(|r| r.reading()).unwrap_or_default(),
            technical: self.technical.unwrap_or_default(),
            sentiment: self.sentiment.as_ref().map(|r| r.reading()).unwrap_or_default(),
            valuation: self.valuation.unwrap_or_default(),
        }
    }

    pub fn publish_fundamentals(&mut self, report: FundamentalsReport) -> Result<()> {
        publish_once(&mut self.fundamentals, report, "fundamentals")
    }

    pub fn publish_sentiment(&mut self, report: SentimentReport) -> Result<()> {
        publish_once(&mut self.sentiment, report, "sentiment")
    }

    pub fn publish_technical(&mut self, reading: SignalReading) -> Result<()> {
        publish_once(&mut self.technical, reading, "technical")
    }

    pub fn publish_valuation(&mut self, reading: SignalReading) -> Result<()> {
        publish_once(&mut self.valuation, reading, "valuation")
    }

    pub fn publish_risk(&mut self, assessment: RiskAssessment) -> Result<()> {
        publish_once(&mut self.risk, assessment, "risk")
    }

    pub fn publish_decision(&mut self, decision: TradeDecision) -> Result<()> {
        publish_once(&mut self.decision, decision, "decision")
    }
}
