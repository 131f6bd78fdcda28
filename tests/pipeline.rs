use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;

use hedgefund::data::{DataProvider, FileProvider, MarketSnapshot};
use hedgefund::pipeline::{MemoryReporter, NullReporter};
use hedgefund::utils::types::{FinancialMetrics, InsiderTrade, PriceBar, TransactionType};
use hedgefund::{evaluate, DecisionContext, Error, OrderAction, Pipeline, Portfolio, Signal, SignalReading};

fn metrics() -> FinancialMetrics {
    FinancialMetrics {
        return_on_equity: Some(0.20),
        net_margin: Some(0.25),
        operating_margin: Some(0.18),
        revenue_growth: Some(0.15),
        earnings_growth: Some(0.12),
        book_value_growth: Some(0.05),
        debt_to_equity: Some(0.0),
        current_ratio: Some(2.0),
        quick_ratio: Some(1.2),
        free_cash_flow_per_share: Some(2.0),
        earnings_per_share: Some(2.0),
        price_to_earnings: Some(20.0),
        price_to_book: Some(3.0),
        price_to_sales: Some(5.0),
        beta: Some(0.0),
        market_cap: Some(2e12),
        ..Default::default()
    }
}

fn bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| PriceBar {
            time: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
            open: *close,
            high: *close,
            low: *close,
            close: *close,
            volume: 1_000.0,
        })
        .collect()
}

fn insider_buying() -> Vec<InsiderTrade> {
    let mut trades: Vec<InsiderTrade> =
        (0..8).map(|_| InsiderTrade::new(1_000.0, 200_000.0, TransactionType::Buy)).collect();
    trades.extend((0..2).map(|_| InsiderTrade::new(1_000.0, 200_000.0, TransactionType::Sell)));
    trades
}

fn snapshot(trades: Vec<InsiderTrade>, closes: &[f64], portfolio: Portfolio) -> MarketSnapshot {
    MarketSnapshot {
        ticker: "AAPL".into(),
        financial_metrics: vec![metrics()],
        insider_trades: trades,
        prices: bars(closes),
        portfolio: Some(portfolio.into()),
        ..Default::default()
    }
}

#[test]
fn bullish_snapshot_buys_up_to_the_cap() {
    let reporter = Arc::new(MemoryReporter::new());
    let snap = snapshot(insider_buying(), &[90.0, 95.0, 100.0], Portfolio::new(100_000.0, 0));
    let mut ctx = DecisionContext::from_snapshot(snap).unwrap();
    let decision = Pipeline::standard(reporter.clone()).run(&mut ctx).unwrap();

    let fundamentals = ctx.fundamentals().unwrap();
    assert_eq!(fundamentals.signal, Signal::Bullish);
    assert_eq!(fundamentals.confidence.value(), 1.0);

    let sentiment = ctx.sentiment().unwrap();
    assert_eq!(sentiment.signal, Signal::Bullish);
    assert!((sentiment.confidence.value() - 0.8).abs() < 1e-9);

    let risk = ctx.risk().unwrap();
    assert_eq!(risk.signal, Signal::Bullish);
    assert!((risk.position_size - 0.8).abs() < 1e-9);

    assert_eq!(decision.order.action, OrderAction::Buy);
    assert_eq!(decision.order.quantity, 800);
    assert_eq!(decision.reasoning.current_price, 100.0);

    assert_eq!(
        reporter.stages(),
        vec!["fundamentals", "sentiment", "risk_management", "portfolio_management"]
    );
}

#[test]
fn empty_insider_trades_still_decide() {
    let reporter = Arc::new(MemoryReporter::new());
    let snap = snapshot(Vec::new(), &[100.0], Portfolio::new(100_000.0, 0));
    let mut ctx = DecisionContext::from_snapshot(snap).unwrap();
    Pipeline::standard(reporter).run(&mut ctx).unwrap();

    let sentiment = ctx.sentiment().unwrap();
    assert_eq!(sentiment.signal, Signal::Neutral);
    assert_eq!(sentiment.confidence.value(), 0.5);
    assert_eq!(sentiment.insider_metrics.total_transactions, 0);
    assert_eq!(sentiment.insider_metrics.total_value, 0.0);
}

#[test]
fn zero_price_sells_existing_holdings() {
    let snap = snapshot(insider_buying(), &[50.0, 0.0], Portfolio::new(10_000.0, 40));
    let decision = evaluate(snap, Arc::new(NullReporter)).unwrap();
    assert_eq!(decision.reasoning.target_shares, 0);
    assert_eq!(decision.order.action, OrderAction::Sell);
    assert_eq!(decision.order.quantity, 40);

    let snap = snapshot(insider_buying(), &[0.0], Portfolio::new(10_000.0, 0));
    let decision = evaluate(snap, Arc::new(NullReporter)).unwrap();
    assert_eq!(decision.order.action, OrderAction::Hold);
    assert_eq!(decision.order.quantity, 0);
}

#[test]
fn bearish_upstream_sells_down() {
    let mut snap = snapshot(Vec::new(), &[100.0], Portfolio::new(0.0, 1_000));
    snap.technical = Some(SignalReading::new(Signal::Bearish, 0.9));
    snap.valuation = Some(SignalReading::new(Signal::Bearish, 0.9));
    let decision = evaluate(snap, Arc::new(NullReporter)).unwrap();

    // bullish 1.0 vs bearish 1.8 -> bearish, size = min(1.8, 1) * 1.0 capped at 0.8
    assert_eq!(decision.reasoning.risk_signal, Signal::Bearish);
    assert_eq!(decision.reasoning.target_shares, 800);
    assert_eq!(decision.order.action, OrderAction::Sell);
    assert_eq!(decision.order.quantity, 200);
}

#[test]
fn same_inputs_same_decision() {
    let a = evaluate(snapshot(insider_buying(), &[100.0], Portfolio::new(50_000.0, 10)), Arc::new(NullReporter))
        .unwrap();
    let b = evaluate(snapshot(insider_buying(), &[100.0], Portfolio::new(50_000.0, 10)), Arc::new(NullReporter))
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn reporter_choice_does_not_change_the_decision() {
    let memory = Arc::new(MemoryReporter::new());
    let with_trace =
        evaluate(snapshot(insider_buying(), &[100.0], Portfolio::new(100_000.0, 0)), memory.clone()).unwrap();
    let silent =
        evaluate(snapshot(insider_buying(), &[100.0], Portfolio::new(100_000.0, 0)), Arc::new(NullReporter))
            .unwrap();
    assert_eq!(with_trace, silent);
    assert_eq!(memory.entries().len(), 4);
}

#[test]
fn rerunning_a_context_is_rejected() {
    let pipeline = Pipeline::standard(Arc::new(NullReporter));
    let mut ctx =
        DecisionContext::from_snapshot(snapshot(insider_buying(), &[100.0], Portfolio::new(1_000.0, 0))).unwrap();
    pipeline.run(&mut ctx).unwrap();
    assert_matches!(pipeline.run(&mut ctx), Err(Error::AlreadyPublished("fundamentals")));
}

#[test]
fn missing_risk_input_fails_fast() {
    let mut snap = snapshot(insider_buying(), &[100.0], Portfolio::new(1_000.0, 0));
    snap.financial_metrics[0].beta = None;
    let reporter = Arc::new(MemoryReporter::new());
    let mut ctx = DecisionContext::from_snapshot(snap).unwrap();
    let err = Pipeline::standard(reporter.clone()).run(&mut ctx).unwrap_err();

    assert_matches!(err, Error::MissingInput(ref field) if field == "beta");
    assert!(ctx.decision().is_none());
    assert_eq!(reporter.stages(), vec!["fundamentals", "sentiment"]);
}

#[test]
fn snapshot_without_prices_is_rejected() {
    let snap = snapshot(insider_buying(), &[], Portfolio::new(1_000.0, 0));
    assert_matches!(DecisionContext::from_snapshot(snap), Err(Error::MissingInput(_)));
}

#[test]
fn file_provider_feeds_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let provider = FileProvider::new(dir.path());
    snapshot(insider_buying(), &[100.0], Portfolio::new(100_000.0, 0))
        .save(provider.path_for("aapl"))
        .unwrap();

    let snap = provider.snapshot("aapl").unwrap();
    let decision = evaluate(snap, Arc::new(NullReporter)).unwrap();
    assert_eq!(decision.order.action, OrderAction::Buy);
    assert_eq!(decision.order.quantity, 800);
}
