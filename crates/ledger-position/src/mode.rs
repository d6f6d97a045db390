//! Hedge vs one-way mode disambiguation.
//!
//! Decided per record from `positionSide`, never per account: an account may
//! mix conventions across symbols and each symbol's state is keyed on its own.

use std::fmt;

use ledger_core::{Direction, PositionSide};

use crate::grouper::FillGroup;

/// Accounting convention a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingMode {
    /// Explicit LONG/SHORT bucket, independent of the opposite bucket.
    Hedge(Direction),
    /// Single net exposure per symbol; direction inferred from its sign.
    OneWay,
}

impl TrackingMode {
    pub fn resolve(position_side: PositionSide) -> Self {
        match position_side.hedge_direction() {
            Some(direction) => Self::Hedge(direction),
            None => Self::OneWay,
        }
    }
}

/// Key under which a session accumulates.
///
/// `(symbol, Some(direction))` in hedge mode, `(symbol, None)` in one-way mode,
/// so hedge buckets never share state with each other or with one-way fills.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackingKey {
    pub symbol: String,
    pub side: Option<Direction>,
}

impl TrackingKey {
    pub fn new(symbol: impl Into<String>, mode: TrackingMode) -> Self {
        let side = match mode {
            TrackingMode::Hedge(direction) => Some(direction),
            TrackingMode::OneWay => None,
        };
        Self {
            symbol: symbol.into(),
            side,
        }
    }

    pub fn mode(&self) -> TrackingMode {
        match self.side {
            Some(direction) => TrackingMode::Hedge(direction),
            None => TrackingMode::OneWay,
        }
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            Some(direction) => write!(f, "{}/{}", self.symbol, direction),
            None => write!(f, "{}/NET", self.symbol),
        }
    }
}

/// Resolve mode and tracking key for a record before any state is touched.
pub fn route(group: &FillGroup) -> (TrackingMode, TrackingKey) {
    let key = TrackingKey::new(
        group.symbol.clone(),
        TrackingMode::resolve(group.position_side),
    );
    (key.mode(), key)
}
