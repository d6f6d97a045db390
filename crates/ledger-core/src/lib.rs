//! Core domain types for fill-ledger position reconstruction.
//!
//! This crate provides the data model shared by the engine and its adapters:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `RawFill`, `Fill`: Exchange execution records before and after validation
//! - `ClosedPosition`, `OpenPosition`: Reconstructed position lifecycle records
//! - `Side`, `PositionSide`, `Direction`: Trading enums

pub mod decimal;
pub mod error;
pub mod fill;
pub mod position;

pub use decimal::{parse_decimal, Price, Size};
pub use error::{CoreError, Result};
pub use fill::{Direction, Fill, PositionSide, RawFill, Side};
pub use position::{ClosedPosition, OpenPosition, PositionKey};
