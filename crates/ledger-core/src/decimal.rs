//! Precision-safe decimal types for fill accounting.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors when summing many small fills.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{AddAssign, Mul};
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Parse exchange numeric text into a `Decimal`.
///
/// Accepts plain (`"75194.4"`) and scientific (`"1.5e-3"`) notation.
/// Anything else, including `"NaN"` and `"inf"`, is an error.
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidDecimal(text.to_string()));
    }

    match Decimal::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(_) if trimmed.contains(['e', 'E']) => Ok(Decimal::from_scientific(trimmed)?),
        Err(_) => Err(CoreError::InvalidDecimal(text.to_string())),
    }
}

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with sizes in calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Mul<Size> for Price {
    type Output = Decimal;

    fn mul(self, rhs: Size) -> Self::Output {
        self.0 * rhs.0
    }
}

/// Size/quantity with exact decimal precision.
///
/// Always a magnitude. Signed exposure is carried as a bare `Decimal`
/// by the sessionizer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Size(pub Decimal);

impl Size {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AddAssign for Size {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_plain_and_scientific() {
        assert_eq!(parse_decimal("75194.4").unwrap(), dec!(75194.4));
        assert_eq!(parse_decimal(" 0.066 ").unwrap(), dec!(0.066));
        assert_eq!(parse_decimal("1.5e-3").unwrap(), dec!(0.0015));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        assert!(parse_decimal("NaN").is_err());
        assert!(parse_decimal("inf").is_err());
        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("   ").is_err());
    }

    #[test]
    fn test_price_times_size() {
        let size = Size::new(dec!(0.5));
        let price = Price::new(dec!(50000));

        assert_eq!(price * size, dec!(25000));
    }

    #[test]
    fn test_size_add_assign() {
        let mut size = Size::new(dec!(0.066));
        size += Size::new(dec!(0.066));
        assert_eq!(size, Size::new(dec!(0.132)));
    }
}
