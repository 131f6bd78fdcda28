//! Risk management: composite risk score and capped position sizing.
//! Pure arithmetic over the metrics snapshot and upstream readings, so it can
//! run inside the pipeline or on its own.

pub mod manager;

pub use manager::{size_position, RiskAssessment, RiskManager, RiskMetrics, MAX_POSITION_SIZE};
