//! Insider-trading sentiment.

use serde::Serialize;
use serde_json::json;

use crate::pipeline::{DecisionContext, Reporter, Stage, TraceEntry};
use crate::utils::error::Result;
use crate::utils::types::{Confidence, InsiderTrade, Signal, SignalReading};

/// Total traded value above which insider activity counts as a real signal.
const SIGNIFICANT_VALUE: f64 = 1_000_000.0;
const STRONG_BUYING_RATIO: f64 = 0.7;
const STRONG_SELLING_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InsiderMetrics {
    pub total_transactions: usize,
    pub avg_transaction_size: f64,
    pub total_value: f64,
    pub buy_ratio: f64,
}

impl InsiderMetrics {
    /// Non-finite share or value entries are left out of the mean and the sum
    /// but still count as transactions.
    pub fn from_trades(trades: &[InsiderTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let shares: Vec<f64> = trades.iter().map(|t| t.shares).filter(|s| s.is_finite()).collect();
        let total_value: f64 = trades.iter().map(|t| t.value).filter(|v| v.is_finite()).sum();
        let buys = trades.iter().filter(|t| t.is_buy()).count();

        let avg_transaction_size = if shares.is_empty() {
            0.0
        } else {
            shares.iter().sum::<f64>() / shares.len() as f64
        };

        Self {
            total_transactions: trades.len(),
            avg_transaction_size,
            total_value,
            buy_ratio: buys as f64 / trades.len() as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub signal: Signal,
    pub confidence: Confidence,
    pub insider_metrics: InsiderMetrics,
}

impl SentimentReport {
    pub fn reading(&self) -> SignalReading {
        SignalReading { signal: self.signal, confidence: self.confidence }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn analyze(&self, trades: &[InsiderTrade]) -> SentimentReport {
        let metrics = InsiderMetrics::from_trades(trades);
        if trades.is_empty() {
            log::warn!("no insider trades available, sentiment is neutral");
            return SentimentReport {
                signal: Signal::Neutral,
                confidence: Confidence::NEUTRAL,
                insider_metrics: metrics,
            };
        }

        let significant = metrics.total_value > SIGNIFICANT_VALUE;
        let (signal, confidence) = if significant && metrics.buy_ratio > STRONG_BUYING_RATIO {
            (Signal::Bullish, Confidence::new(metrics.buy_ratio.min(1.0)))
        } else if significant && metrics.buy_ratio < STRONG_SELLING_RATIO {
            (Signal::Bearish, Confidence::new((1.0 - metrics.buy_ratio).min(1.0)))
        } else {
            (Signal::Neutral, Confidence::NEUTRAL)
        };

        SentimentReport { signal, confidence, insider_metrics: metrics }
    }
}

impl Stage for SentimentAnalyzer {
    fn name(&self) -> &'static str {
        "sentiment"
    }

    fn run(&self, ctx: &mut DecisionContext, reporter: &dyn Reporter) -> Result<()> {
        let report = self.analyze(ctx.insider_trades());
        let entry = TraceEntry::new(
            self.name(),
            Some(report.signal),
            Some(report.confidence.value()),
            json!({ "insider_metrics": report.insider_metrics }),
        );
        ctx.publish_sentiment(report)?;
        reporter.record(&entry);
        Ok(())
    }
}
