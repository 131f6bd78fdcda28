//! Composite risk scoring and capped position sizing.
//!
//! Four normalised risk scores (higher is riskier) are blended into a total
//! risk; `1 - total_risk` is the base position, scaled by how strongly the
//! upstream signals agree.

use serde::Serialize;
use serde_json::json;

use crate::pipeline::{DecisionContext, Reporter, Stage, TraceEntry};
use crate::utils::error::Result;
use crate::utils::types::{FinancialMetrics, MetricField, Signal, UpstreamSignals};

/// Never commit more than this fraction of portfolio value to one position.
pub const MAX_POSITION_SIZE: f64 = 0.8;

/// Market cap at which size risk reaches zero.
const LARGE_CAP: f64 = 1e12;

const MARKET_WEIGHT: f64 = 0.3;
const SIZE_WEIGHT: f64 = 0.2;
const LEVERAGE_WEIGHT: f64 = 0.3;
const LIQUIDITY_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub market_risk: f64,
    pub size_risk: f64,
    pub leverage_risk: f64,
    pub liquidity_risk: f64,
    pub total_risk: f64,
}

impl RiskMetrics {
    pub fn from_metrics(metrics: &FinancialMetrics) -> Result<Self> {
        let beta = metrics.require(MetricField::Beta)?;
        let market_cap = metrics.require(MetricField::MarketCap)?;
        let debt_to_equity = metrics.require(MetricField::DebtToEquity)?;
        let current_ratio = metrics.require(MetricField::CurrentRatio)?;

        if market_cap < 0.0 {
            log::warn!("negative market cap {} clamped to 0", market_cap);
        }

        let market_risk = (beta / 2.0).clamp(0.0, 1.0); // beta > 2 is very risky
        let size_risk = 1.0 - (market_cap / LARGE_CAP).clamp(0.0, 1.0);
        let leverage_risk = (debt_to_equity / 2.0).clamp(0.0, 1.0);
        let liquidity_risk = (1.0 - current_ratio / 2.0).clamp(0.0, 1.0);

        let total_risk = market_risk * MARKET_WEIGHT
            + size_risk * SIZE_WEIGHT
            + leverage_risk * LEVERAGE_WEIGHT
            + liquidity_risk * LIQUIDITY_WEIGHT;

        Ok(Self { market_risk, size_risk, leverage_risk, liquidity_risk, total_risk })
    }

    /// Position fraction before signal agreement is applied.
    pub fn base_position(&self) -> f64 {
        1.0 - self.total_risk
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub signal: Signal,
    pub position_size: f64,
    pub risk_metrics: RiskMetrics,
    pub bullish_weight: f64,
    pub bearish_weight: f64,
}

impl RiskAssessment {
    pub fn reasoning(&self) -> serde_json::Value {
        let pct = |v: f64| format!("{:.1}%", v * 100.0);
        json!({
            "position_size": pct(self.position_size),
            "risk_metrics": {
                "total_risk_score": pct(self.risk_metrics.total_risk),
                "market_risk": pct(self.risk_metrics.market_risk),
                "size_risk": pct(self.risk_metrics.size_risk),
                "leverage_risk": pct(self.risk_metrics.leverage_risk),
                "liquidity_risk": pct(self.risk_metrics.liquidity_risk),
            },
            "signal_agreement": {
                "bullish_weight": pct(self.bullish_weight),
                "bearish_weight": pct(self.bearish_weight),
            }
        })
    }
}

/// Scale the base position by the dominant side's weight and apply the hard cap.
pub fn size_position(base_position: f64, bullish_weight: f64, bearish_weight: f64) -> (Signal, f64) {
    let (signal, size) = if bullish_weight > bearish_weight {
        (Signal::Bullish, base_position * bullish_weight.min(1.0))
    } else if bearish_weight > bullish_weight {
        (Signal::Bearish, base_position * bearish_weight.min(1.0))
    } else {
        (Signal::Neutral, 0.0)
    };
    (signal, size.clamp(0.0, MAX_POSITION_SIZE))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskManager;

impl RiskManager {
    pub fn assess(&self, metrics: &FinancialMetrics, signals: &UpstreamSignals) -> Result<RiskAssessment> {
        let risk_metrics = RiskMetrics::from_metrics(metrics)?;
        let bullish_weight = signals.weight_of(Signal::Bullish);
        let bearish_weight = signals.weight_of(Signal::Bearish);
        let (signal, position_size) =
            size_position(risk_metrics.base_position(), bullish_weight, bearish_weight);

        Ok(RiskAssessment { signal, position_size, risk_metrics, bullish_weight, bearish_weight })
    }
}

impl Stage for RiskManager {
    fn name(&self) -> &'static str {
        "risk_management"
    }

    fn run(&self, ctx: &mut DecisionContext, reporter: &dyn Reporter) -> Result<()> {
        let assessment = self.assess(ctx.metrics(), &ctx.upstream_signals())?;
        let entry = TraceEntry::new(self.name(), Some(assessment.signal), None, assessment.reasoning());
        log::debug!(
            "[{}] risk {} size {:.3} (total risk {:.3})",
            ctx.ticker(),
            assessment.signal,
            assessment.position_size,
            assessment.risk_metrics.total_risk
        );
        ctx.publish_risk(assessment)?;
        reporter.record(&entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Error;
    use crate::utils::types::SignalReading;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn metrics(beta: f64, market_cap: f64, de: f64, current: f64) -> FinancialMetrics {
        FinancialMetrics {
            beta: Some(beta),
            market_cap: Some(market_cap),
            debt_to_equity: Some(de),
            current_ratio: Some(current),
            ..Default::default()
        }
    }

    fn all(signal: Signal, confidence: f64) -> UpstreamSignals {
        let r = SignalReading::new(signal, confidence);
        UpstreamSignals { fundamentals: r, technical: r, sentiment: r, valuation: r }
    }

    #[test]
    fn high_beta_mega_cap_scenario() {
        let risk = RiskMetrics::from_metrics(&metrics(4.0, 2e12, 0.0, 3.0)).unwrap();
        assert_eq!(risk.market_risk, 1.0);
        assert_eq!(risk.size_risk, 0.0);
        assert_eq!(risk.leverage_risk, 0.0);
        assert_eq!(risk.liquidity_risk, 0.0);
        assert!((risk.total_risk - 0.3).abs() < 1e-9);
        assert!((risk.base_position() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn negative_market_cap_is_clamped() {
        let risk = RiskMetrics::from_metrics(&metrics(1.0, -5e9, 1.0, 1.0)).unwrap();
        assert_eq!(risk.size_risk, 1.0);
        assert!(risk.total_risk.is_finite());
    }

    #[test]
    fn adversarial_inputs_stay_capped() {
        for signals in [all(Signal::Bullish, 1.0), all(Signal::Bearish, 1.0)] {
            let a = RiskManager.assess(&metrics(100.0, 0.0, 50.0, 0.0), &signals).unwrap();
            assert!(a.position_size <= MAX_POSITION_SIZE);
            assert!(a.position_size >= 0.0);
        }
        let safe = RiskManager.assess(&metrics(0.0, 5e12, 0.0, 10.0), &all(Signal::Bullish, 1.0)).unwrap();
        assert_eq!(safe.position_size, MAX_POSITION_SIZE);
    }

    #[test]
    fn tied_weights_give_no_position() {
        let signals = UpstreamSignals {
            fundamentals: SignalReading::new(Signal::Bullish, 0.6),
            technical: SignalReading::new(Signal::Bearish, 0.6),
            ..Default::default()
        };
        let a = RiskManager.assess(&metrics(1.0, 1e12, 0.5, 2.0), &signals).unwrap();
        assert_eq!(a.signal, Signal::Neutral);
        assert_eq!(a.position_size, 0.0);

        let a = RiskManager.assess(&metrics(1.0, 1e12, 0.5, 2.0), &UpstreamSignals::default()).unwrap();
        assert_eq!(a.signal, Signal::Neutral);
        assert_eq!(a.position_size, 0.0);
    }

    #[rstest]
    #[case(0.5, 0.0, Signal::Bullish, 0.35)]
    #[case(0.2, 0.6, Signal::Bearish, 0.42)]
    #[case(1.8, 0.0, Signal::Bullish, 0.7)]
    fn position_scales_with_dominant_weight(
        #[case] bull: f64, #[case] bear: f64, #[case] expected: Signal, #[case] size: f64,
    ) {
        let (signal, position) = size_position(0.7, bull, bear);
        assert_eq!(signal, expected);
        assert!((position - size).abs() < 1e-9);
    }

    #[test]
    fn missing_beta_is_fatal() {
        let mut m = metrics(1.0, 1e12, 0.5, 2.0);
        m.beta = None;
        assert_matches!(
            RiskManager.assess(&m, &UpstreamSignals::default()),
            Err(Error::MissingInput(f)) if f == "beta"
        );
    }

    #[test]
    fn assessment_is_idempotent() {
        let m = metrics(1.3, 4e11, 0.8, 1.4);
        let s = all(Signal::Bullish, 0.4);
        assert_eq!(RiskManager.assess(&m, &s).unwrap(), RiskManager.assess(&m, &s).unwrap());
    }
}
