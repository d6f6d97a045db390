//! Fill rejection reasons.
//!
//! The engine never fails a batch. These only explain why a single raw
//! fill was dropped and counted.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Missing or blank symbol")]
    MissingSymbol,

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid side: {0}")]
    InvalidSide(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid qty: {0}")]
    InvalidQty(String),

    #[error("Invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
}
