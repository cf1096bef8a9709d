//! Logging and metrics setup for OracleNet processes
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("oraclenet", LogFormat::Json)?;
//! observability::init_metrics("0.0.0.0", 9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_filter, LogFormat};
pub use metrics::{init_metrics, ServerMetrics};
