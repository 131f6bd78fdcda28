//! Sequential stage runner.
//!
//! Stages run one after another over a single [`DecisionContext`]; each reads
//! what earlier stages published and adds its own slot.

pub mod context;
pub mod report;

use std::sync::Arc;

use crate::analysis::{FundamentalsAnalyzer, SentimentAnalyzer};
use crate::portfolio::manager::{PortfolioManager, TradeDecision};
use crate::risk::RiskManager;
use crate::utils::error::{Error, Result};

pub use context::DecisionContext;
pub use report::{
    ConsoleReporter, LogReporter, MemoryReporter, NullReporter, Reporter, ReporterKind, TraceEntry,
};

/// One step of the pipeline.
pub trait Stage: Send + Sync {
    /// Stage name used in traces and logs.
    fn name(&self) -> &'static str;

    /// Read inputs from `ctx`, publish this stage's slot and report it.
    fn run(&self, ctx: &mut DecisionContext, reporter: &dyn Reporter) -> Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Empty pipeline; add stages with [`Pipeline::with_stage`].
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self { stages: Vec::new(), reporter }
    }

    /// Fundamentals, sentiment, risk, portfolio, in that order.
    pub fn standard(reporter: Arc<dyn Reporter>) -> Self {
        Self::new(reporter)
            .with_stage(Box::new(FundamentalsAnalyzer))
            .with_stage(Box::new(SentimentAnalyzer))
            .with_stage(Box::new(RiskManager))
            .with_stage(Box::new(PortfolioManager))
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage to completion, stopping at the first error.
    pub fn run(&self, ctx: &mut DecisionContext) -> Result<TradeDecision> {
        for stage in &self.stages {
            log::debug!("[{}] running stage {}", ctx.ticker(), stage.name());
            stage.run(ctx, self.reporter.as_ref()).map_err(|e| {
                log::error!("[{}] stage {} failed: {}", ctx.ticker(), stage.name(), e);
                e
            })?;
        }
        ctx.decision()
            .cloned()
            .ok_or_else(|| Error::Other("pipeline finished without a trade decision".to_string()))
    }
}
