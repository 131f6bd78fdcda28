//! Leaf analyzers: fundamentals and insider sentiment.

pub mod fundamentals;
pub mod sentiment;

pub use fundamentals::{FactorReading, FundamentalsAnalyzer, FundamentalsReport};
pub use sentiment::{InsiderMetrics, SentimentAnalyzer, SentimentReport};
