//! # hedgefund
//! Signal aggregation and risk-adjusted position sizing for a single instrument.
//!
//! Fundamentals and insider sentiment are scored into (signal, confidence)
//! readings, the risk manager turns those plus the metrics snapshot into a
//! capped position size, and the portfolio manager converts that into a
//! buy / sell / hold order.

pub use crate::utils::error::{Error, Result};

pub mod analysis;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod portfolio;
pub mod risk;
pub mod utils;

use std::sync::Arc;

pub use crate::data::MarketSnapshot;
pub use crate::pipeline::{DecisionContext, Pipeline, Reporter};
pub use crate::portfolio::{Portfolio, TradeDecision};
pub use crate::utils::types::{Order, OrderAction, Signal, SignalReading};

/// Run the standard pipeline over one snapshot.
pub fn evaluate(snapshot: MarketSnapshot, reporter: Arc<dyn Reporter>) -> Result<TradeDecision> {
    let mut ctx = DecisionContext::from_snapshot(snapshot)?;
    Pipeline::standard(reporter).run(&mut ctx)
}
