//! Reconstructed position records.
//!
//! These are the engine's outputs. Both are immutable once emitted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::decimal::{Price, Size};
use crate::error::CoreError;
use crate::fill::Direction;

/// Position identifier: `symbol#DIRECTION#openTime`.
///
/// Unique within one account's history, so it doubles as the upsert key
/// for persisted closed positions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PositionKey {
    pub symbol: String,
    pub direction: Direction,
    pub open_time: i64,
}

impl PositionKey {
    pub fn new(symbol: impl Into<String>, direction: Direction, open_time: i64) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            open_time,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}#{}", self.symbol, self.direction, self.open_time)
    }
}

impl FromStr for PositionKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Symbols never contain '#', but split from the right anyway.
        let mut parts = s.rsplitn(3, '#');
        let (Some(time), Some(direction), Some(symbol)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::InvalidPositionKey(s.to_string()));
        };

        let direction = match direction {
            "LONG" => Direction::Long,
            "SHORT" => Direction::Short,
            _ => return Err(CoreError::InvalidPositionKey(s.to_string())),
        };
        let open_time = time
            .parse::<i64>()
            .map_err(|_| CoreError::InvalidPositionKey(s.to_string()))?;

        if symbol.is_empty() {
            return Err(CoreError::InvalidPositionKey(s.to_string()));
        }

        Ok(Self::new(symbol, direction, open_time))
    }
}

impl From<PositionKey> for String {
    fn from(key: PositionKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for PositionKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A position that opened and returned to zero exposure within the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPosition {
    pub position_key: PositionKey,
    pub symbol: String,
    pub position_side: Direction,
    /// Time of the first opening fill (Unix ms).
    pub open_time: i64,
    /// Time of the fill that brought exposure back to zero (Unix ms).
    pub close_time: i64,
    /// VWAP of the exposure-increasing fills.
    pub open_price: Price,
    /// VWAP of the exposure-decreasing fills.
    pub close_price: Price,
    pub closed_qty: Size,
    /// High-water mark of absolute exposure during the session.
    pub max_open_qty: Size,
    pub realized_pnl: Decimal,
    /// `realized_pnl / (max_open_qty * open_price)` as a fraction.
    /// `None` when the notional is zero.
    pub pnl_percent: Option<Decimal>,
    pub fees: Decimal,
    pub fee_asset: Option<String>,
    pub fill_count: u32,
}

impl ClosedPosition {
    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }

    pub fn close_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_time)
    }

    /// Holding duration in milliseconds.
    pub fn holding_ms(&self) -> i64 {
        self.close_time - self.open_time
    }

    /// Realized PnL after fees.
    pub fn net_pnl(&self) -> Decimal {
        self.realized_pnl - self.fees
    }
}

/// A position still carrying exposure when the batch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPosition {
    pub position_key: PositionKey,
    pub symbol: String,
    pub position_side: Direction,
    pub open_time: i64,
    /// Time of the most recent fill seen for this position (Unix ms).
    pub last_fill_time: i64,
    pub open_price: Price,
    /// Absolute residual exposure.
    pub current_qty: Size,
    pub max_open_qty: Size,
    /// PnL already realized by partial reductions.
    pub realized_pnl: Decimal,
    pub fees: Decimal,
    pub fee_asset: Option<String>,
    pub fill_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_position_key_display_and_parse() {
        let key = PositionKey::new("BTCUSDC", Direction::Short, 1_745_000_000_000);
        assert_eq!(key.to_string(), "BTCUSDC#SHORT#1745000000000");

        let parsed: PositionKey = "BTCUSDC#SHORT#1745000000000".parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_position_key_parse_rejects_garbage() {
        assert!("BTCUSDC".parse::<PositionKey>().is_err());
        assert!("BTCUSDC#FLAT#1".parse::<PositionKey>().is_err());
        assert!("BTCUSDC#LONG#soon".parse::<PositionKey>().is_err());
        assert!("#LONG#1".parse::<PositionKey>().is_err());
    }

    #[test]
    fn test_position_key_serializes_as_string() {
        let key = PositionKey::new("ETHUSDT", Direction::Long, 42);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"ETHUSDT#LONG#42\"");
        let back: PositionKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_closed_position_helpers() {
        let closed = ClosedPosition {
            position_key: PositionKey::new("ETHUSDT", Direction::Long, 1_000),
            symbol: "ETHUSDT".to_string(),
            position_side: Direction::Long,
            open_time: 1_000,
            close_time: 61_000,
            open_price: Price::new(dec!(2000)),
            close_price: Price::new(dec!(2100)),
            closed_qty: Size::new(dec!(2)),
            max_open_qty: Size::new(dec!(2)),
            realized_pnl: dec!(200),
            pnl_percent: Some(dec!(0.05)),
            fees: dec!(3.5),
            fee_asset: Some("USDT".to_string()),
            fill_count: 2,
        };

        assert_eq!(closed.holding_ms(), 60_000);
        assert_eq!(closed.net_pnl(), dec!(196.5));
        assert_eq!(closed.open_datetime().unwrap().timestamp_millis(), 1_000);
        assert_eq!(closed.close_datetime().unwrap().timestamp_millis(), 61_000);
    }
}
