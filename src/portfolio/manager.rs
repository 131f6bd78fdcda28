//! Turns the recommended position size into a discrete order.

use serde::Serialize;
use serde_json::json;

use super::{is_tradable_price, Portfolio};
use crate::pipeline::{DecisionContext, Reporter, Stage, TraceEntry};
use crate::risk::MAX_POSITION_SIZE;
use crate::utils::error::Result;
use crate::utils::types::{Order, Signal, UpstreamSignals};

/// Audit record attached to every decision. Upstream signals are recorded
/// here only; they do not feed the arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionReasoning {
    pub signals: UpstreamSignals,
    pub risk_signal: Signal,
    pub position_size: f64,
    pub current_shares: u64,
    pub target_shares: u64,
    pub current_price: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeDecision {
    #[serde(flatten)]
    pub order: Order,
    pub reasoning: DecisionReasoning,
}

/// Whole shares worth `total_value * position_size` at `price`; zero when the
/// price cannot be divided by.
pub fn target_shares(total_value: f64, position_size: f64, price: f64) -> u64 {
    if !is_tradable_price(price) {
        log::warn!("degenerate price {}, target position is 0 shares", price);
        return 0;
    }
    let shares = (total_value * position_size / price).floor();
    if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioManager;

impl PortfolioManager {
    pub fn decide(
        &self, portfolio: &Portfolio, price: f64, risk_signal: Signal, position_size: f64,
        signals: UpstreamSignals,
    ) -> TradeDecision {
        let position_size = if (0.0..=MAX_POSITION_SIZE).contains(&position_size) {
            position_size
        } else {
            log::warn!("position size {} outside [0, {}], clamping", position_size, MAX_POSITION_SIZE);
            if position_size.is_nan() { 0.0 } else { position_size.clamp(0.0, MAX_POSITION_SIZE) }
        };

        let total_value = portfolio.total_value(price);
        let target = target_shares(total_value, position_size, price);
        let order = Order::rebalance(portfolio.stock, target);

        TradeDecision {
            order,
            reasoning: DecisionReasoning {
                signals,
                risk_signal,
                position_size,
                current_shares: portfolio.stock,
                target_shares: target,
                current_price: price,
                total_value,
            },
        }
    }
}

impl Stage for PortfolioManager {
    fn name(&self) -> &'static str {
        "portfolio_management"
    }

    fn run(&self, ctx: &mut DecisionContext, reporter: &dyn Reporter) -> Result<()> {
        // Without a risk assessment nothing is allocated.
        let (risk_signal, position_size) = ctx
            .risk()
            .map(|r| (r.signal, r.position_size))
            .unwrap_or((Signal::Neutral, 0.0));
        let decision = self.decide(
            ctx.portfolio(),
            ctx.current_price(),
            risk_signal,
            position_size,
            ctx.upstream_signals(),
        );
        let entry = TraceEntry::new(
            self.name(),
            Some(risk_signal),
            None,
            json!({
                "action": decision.order.action,
                "quantity": decision.order.quantity,
                "reasoning": decision.reasoning,
            }),
        );
        log::info!(
            "[{}] decision: {} {} (target {} shares)",
            ctx.ticker(),
            decision.order.action,
            decision.order.quantity,
            decision.reasoning.target_shares
        );
        ctx.publish_decision(decision)?;
        reporter.record(&entry);
        Ok(())
    }
}
