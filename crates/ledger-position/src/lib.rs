//! Position lifecycle reconstruction from exchange fills.
//!
//! Rebuilds when each position opened and closed, its entry/exit VWAP,
//! realized PnL and fees, from a time-ordered batch of fills alone.
//!
//! # Pipeline
//!
//! raw fills -> [`FillNormalizer`] -> [`group_fills`] -> [`PositionSessionizer`]
//! -> [`ClosedPosition`](ledger_core::ClosedPosition) /
//! [`OpenPosition`](ledger_core::OpenPosition)
//!
//! # Key Components
//!
//! - [`FillNormalizer`]: Validates raw fills, counts the rejected ones
//! - [`FillGroup`]: Partial fills of one execution merged with a running VWAP
//! - [`TrackingMode`]: Hedge vs one-way routing, decided per record
//! - [`VwapAccumulator`]: `Σ(px×qty) / Σ(qty)` bookkeeping
//! - [`PositionSessionizer`]: FLAT/OPEN state machine per tracking key
//! - [`PositionReconstructor`]: Multi-batch entry point producing a [`ReconstructionReport`]
//!
//! The engine performs no I/O and never fails a batch. Data-quality problems
//! show up as counters in the report.

pub mod error;
pub mod grouper;
pub mod mode;
pub mod normalizer;
pub mod reconstructor;
pub mod sessionizer;
pub mod vwap;

pub use error::RejectReason;
pub use grouper::{group_fills, FillGroup, GroupKey};
pub use mode::{route, TrackingKey, TrackingMode};
pub use normalizer::{normalize_fill, FillNormalizer};
pub use reconstructor::{reconstruct_positions, PositionReconstructor, ReconstructionReport};
pub use sessionizer::{
    pnl_ratio, PositionSessionizer, SessionizerConfig, SessionizerOutput, ZeroCrossPolicy,
};
pub use vwap::{running_vwap, VwapAccumulator};
