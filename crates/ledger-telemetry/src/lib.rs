//! Prometheus metrics and structured logging for fill-ledger.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for import outcomes: ingested/ignored fills,
//!   incomplete sessions, closed and open positions

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::Metrics;
