//! Fundamentals scoring.
//!
//! Five sub-factors (profitability, growth, health, cash flow, valuation) are
//! each scored by counting passed threshold tests, mapped to a signal, and then
//! aggregated by majority vote.

use serde::Serialize;
use serde_json::json;

use crate::pipeline::{DecisionContext, Reporter, Stage, TraceEntry};
use crate::utils::error::Result;
use crate::utils::types::{Confidence, FinancialMetrics, MetricField, Signal, SignalReading};

/// Minimum number of agreeing sub-factors for a directional call.
const MIN_AGREEING_FACTORS: usize = 3;

/// Result of one sub-factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorReading {
    pub score: u8,
    pub max_score: u8,
    pub signal: Signal,
    pub details: String,
}

impl FactorReading {
    /// Bullish at two or more passes, bearish at none.
    fn majority(tests: &[bool], details: String) -> Self {
        let score = passed(tests);
        let signal = match score {
            | 0 => Signal::Bearish,
            | s if s >= 2 => Signal::Bullish,
            | _ => Signal::Neutral,
        };
        Self { score, max_score: tests.len() as u8, signal, details }
    }

    /// Bullish only when every test passes, bearish at none.
    fn unanimous(tests: &[bool], details: String) -> Self {
        let score = passed(tests);
        let max_score = tests.len() as u8;
        let signal = if score == 0 {
            Signal::Bearish
        } else if score == max_score {
            Signal::Bullish
        } else {
            Signal::Neutral
        };
        Self { score, max_score, signal, details }
    }
}

fn passed(tests: &[bool]) -> u8 {
    tests.iter().filter(|t| **t).count() as u8
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalsReport {
    pub signal: Signal,
    pub confidence: Confidence,
    pub profitability: FactorReading,
    pub growth: FactorReading,
    pub health: FactorReading,
    pub cash_flow: FactorReading,
    pub valuation: FactorReading,
}

impl FundamentalsReport {
    pub fn reading(&self) -> SignalReading {
        SignalReading { signal: self.signal, confidence: self.confidence }
    }

    pub fn factors(&self) -> [&FactorReading; 5] {
        [&self.profitability, &self.growth, &self.health, &self.cash_flow, &self.valuation]
    }

    /// Per-factor trace in the same shape the console output has always used.
    pub fn reasoning(&self) -> serde_json::Value {
        let entry = |f: &FactorReading| json!({ "signal": f.signal, "details": f.details });
        json!({
            "profitability_signal": entry(&self.profitability),
            "growth_signal": entry(&self.growth),
            "health_signal": entry(&self.health),
            "cash_flow_signal": entry(&self.cash_flow),
            "valuation_signal": entry(&self.valuation),
        })
    }
}

/// Combine sub-factor signals into one reading.
pub fn aggregate(signals: &[Signal]) -> (Signal, Confidence) {
    let bullish = signals.iter().filter(|s| **s == Signal::Bullish).count();
    let bearish = signals.iter().filter(|s| **s == Signal::Bearish).count();
    let spread = bullish.abs_diff(bearish) as f64 / signals.len().max(1) as f64;

    if bullish > bearish && bullish >= MIN_AGREEING_FACTORS {
        (Signal::Bullish, Confidence::new(spread.min(1.0)))
    } else if bearish > bullish && bearish >= MIN_AGREEING_FACTORS {
        (Signal::Bearish, Confidence::new(spread.min(1.0)))
    } else {
        (Signal::Neutral, Confidence::NEUTRAL)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FundamentalsAnalyzer;

impl FundamentalsAnalyzer {
    pub fn analyze(&self, metrics: &FinancialMetrics) -> Result<FundamentalsReport> {
        let profitability = Self::profitability(metrics)?;
        let growth = Self::growth(metrics)?;
        let health = Self::health(metrics)?;
        let cash_flow = Self::cash_flow(metrics)?;
        let valuation = Self::valuation(metrics)?;

        let (signal, confidence) = aggregate(&[
            profitability.signal,
            growth.signal,
            health.signal,
            cash_flow.signal,
            valuation.signal,
        ]);

        Ok(FundamentalsReport { signal, confidence, profitability, growth, health, cash_flow, valuation })
    }

    fn profitability(m: &FinancialMetrics) -> Result<FactorReading> {
        let roe = m.require(MetricField::ReturnOnEquity)?;
        let net_margin = m.require(MetricField::NetMargin)?;
        let op_margin = m.require(MetricField::OperatingMargin)?;
        Ok(FactorReading::majority(
            &[roe > 0.15, net_margin > 0.20, op_margin > 0.15],
            format!(
                "ROE: {}, Net Margin: {}, Op Margin: {}",
                pct(roe),
                pct(net_margin),
                pct(op_margin)
            ),
        ))
    }

    fn growth(m: &FinancialMetrics) -> Result<FactorReading> {
        let revenue = m.require(MetricField::RevenueGrowth)?;
        let earnings = m.require(MetricField::EarningsGrowth)?;
        let book_value = m.require(MetricField::BookValueGrowth)?;
        Ok(FactorReading::majority(
            &[revenue > 0.10, earnings > 0.10, book_value > 0.10],
            format!(
                "Revenue Growth: {}, Earnings Growth: {}, Book Value Growth: {}",
                pct(revenue),
                pct(earnings),
                pct(book_value)
            ),
        ))
    }

    fn health(m: &FinancialMetrics) -> Result<FactorReading> {
        let de = m.require(MetricField::DebtToEquity)?;
        let current = m.require(MetricField::CurrentRatio)?;
        let quick = m.require(MetricField::QuickRatio)?;
        Ok(FactorReading::majority(
            &[de < 1.0, current > 1.5, quick > 1.0],
            format!("D/E: {:.2}, Current Ratio: {:.2}, Quick Ratio: {:.2}", de, current, quick),
        ))
    }

    fn cash_flow(m: &FinancialMetrics) -> Result<FactorReading> {
        let fcf = m.require(MetricField::FreeCashFlowPerShare)?;
        let eps = m.require(MetricField::EarningsPerShare)?;
        Ok(FactorReading::unanimous(
            &[fcf > eps * 0.8, fcf > 0.0],
            format!("FCF/Share: ${:.2}, EPS: ${:.2}", fcf, eps),
        ))
    }

    fn valuation(m: &FinancialMetrics) -> Result<FactorReading> {
        let pe = m.require(MetricField::PriceToEarnings)?;
        let pb = m.require(MetricField::PriceToBook)?;
        let ps = m.require(MetricField::PriceToSales)?;
        Ok(FactorReading::majority(
            &[pe > 0.0 && pe < 30.0, pb < 5.0, ps < 10.0],
            format!("P/E: {:.2}, P/B: {:.2}, P/S: {:.2}", pe, pb, ps),
        ))
    }
}

impl Stage for FundamentalsAnalyzer {
    fn name(&self) -> &'static str {
        "fundamentals"
    }

    fn run(&self, ctx: &mut DecisionContext, reporter: &dyn Reporter) -> Result<()> {
        let report = self.analyze(ctx.metrics())?;
        let entry = TraceEntry::new(
            self.name(),
            Some(report.signal),
            Some(report.confidence.value()),
            report.reasoning(),
        );
        log::debug!("[{}] fundamentals {} ({:.2})", ctx.ticker(), report.signal, report.confidence.value());
        ctx.publish_fundamentals(report)?;
        reporter.record(&entry);
        Ok(())
    }
}
