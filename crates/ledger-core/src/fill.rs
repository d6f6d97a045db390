//! Fill (trade execution) types.
//!
//! A [`RawFill`] is what the exchange hands us: loosely typed, possibly
//! incomplete. A [`Fill`] is the validated form the engine works with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::decimal::{Price, Size};

/// Execution side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse exchange side text. Case and surrounding whitespace are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    /// Returns 1 for buy, -1 for sell (for exposure calculations).
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Direction of a reconstructed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction implied by the sign of a signed exposure. `None` for zero.
    pub fn from_signed(qty: Decimal) -> Option<Self> {
        if qty.is_zero() {
            None
        } else if qty.is_sign_positive() {
            Some(Self::Long)
        } else {
            Some(Self::Short)
        }
    }

    /// Side that adds exposure in this direction.
    pub fn opening_side(&self) -> Side {
        match self {
            Self::Long => Side::Buy,
            Self::Short => Side::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Position side tag as reported on the fill.
///
/// `Long`/`Short` only appear on hedge-mode accounts. One-way accounts report
/// `Both`; older records may omit the field entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
    Both,
    #[default]
    Unspecified,
}

impl PositionSide {
    /// Parse exchange text. Unknown values map to `Unspecified`.
    pub fn parse(text: Option<&str>) -> Self {
        match text.map(|t| t.trim().to_ascii_uppercase()).as_deref() {
            Some("LONG") => Self::Long,
            Some("SHORT") => Self::Short,
            Some("BOTH") => Self::Both,
            _ => Self::Unspecified,
        }
    }

    /// Hedge-mode bucket, if this tag names one.
    pub fn hedge_direction(&self) -> Option<Direction> {
        match self {
            Self::Long => Some(Direction::Long),
            Self::Short => Some(Direction::Short),
            Self::Both | Self::Unspecified => None,
        }
    }
}

/// Raw execution record as supplied by the exchange or a persisted store.
///
/// Every field is optional and loosely typed: numbers may arrive as JSON
/// strings or JSON numbers. Validation happens in the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFill {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub position_side: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub qty: Option<Value>,
    #[serde(default)]
    pub realized_pnl: Option<Value>,
    #[serde(default)]
    pub commission: Option<Value>,
    #[serde(default)]
    pub commission_asset: Option<String>,
    #[serde(default)]
    pub order_id: Option<Value>,
    #[serde(default, alias = "id")]
    pub trade_id: Option<Value>,
}

/// A validated fill.
///
/// Invariants: `qty > 0`, `price > 0`, `symbol` non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub symbol: String,
    /// Execution time (Unix ms).
    pub time: i64,
    pub side: Side,
    pub position_side: PositionSide,
    pub price: Price,
    /// Execution size (always positive, direction indicated by side).
    pub qty: Size,
    /// Realized PnL reported by the exchange. Non-zero only on reducing fills.
    pub realized_pnl: Decimal,
    pub commission: Decimal,
    pub commission_asset: Option<String>,
    pub order_id: Option<String>,
    pub trade_id: Option<String>,
}

impl Fill {
    /// Signed size: +qty for buy, -qty for sell.
    pub fn signed_qty(&self) -> Decimal {
        self.qty.inner() * self.side.sign()
    }
}
