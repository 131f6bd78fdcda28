//! Current holdings and the portfolio-management stage.

pub mod manager;

use serde::{Deserialize, Serialize};

pub use manager::{DecisionReasoning, PortfolioManager, TradeDecision};

/// Cash plus whole shares of the single instrument under evaluation.
/// Read-only here; applying orders is the broker's job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: f64,
    pub stock: u64,
}

impl Portfolio {
    pub fn new(cash: f64, stock: u64) -> Self {
        Self { cash, stock }
    }

    /// Cash used for valuation. Negative or non-finite cash counts as zero.
    pub fn usable_cash(&self) -> f64 {
        if self.cash.is_finite() && self.cash >= 0.0 {
            self.cash
        } else {
            log::warn!("portfolio cash {} out of range, treating as 0", self.cash);
            0.0
        }
    }

    /// Value of the shares held at `price`. A degenerate price values them at zero.
    pub fn holdings_value(&self, price: f64) -> f64 {
        if is_tradable_price(price) {
            self.stock as f64 * price
        } else {
            0.0
        }
    }

    /// `cash + stock * price`
    pub fn total_value(&self, price: f64) -> f64 {
        self.usable_cash() + self.holdings_value(price)
    }
}

/// A price we can divide by.
pub fn is_tradable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}
