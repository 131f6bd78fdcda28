//! Utility functions and types for the decision pipeline.

pub mod error;
pub mod logging;
pub mod types;

pub use error::Error;
pub use logging::init_logging;
pub use types::*;
