//! Volume-weighted average price bookkeeping.

use ledger_core::{Price, Size};
use rust_decimal::Decimal;

/// Running `Σ(price × qty)` and `Σ(qty)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VwapAccumulator {
    px_qty: Decimal,
    qty: Decimal,
}

impl VwapAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, price: Price, qty: Size) {
        self.px_qty += price * qty;
        self.qty += qty.inner();
    }

    pub fn qty(&self) -> Size {
        Size::new(self.qty)
    }

    pub fn is_empty(&self) -> bool {
        self.qty.is_zero()
    }

    /// Average price, or `None` before any quantity has been added.
    pub fn vwap(&self) -> Option<Price> {
        if self.qty.is_zero() {
            None
        } else {
            Some(Price::new(self.px_qty / self.qty))
        }
    }

    /// Average price, falling back to `fallback` when empty.
    pub fn vwap_or(&self, fallback: Price) -> Price {
        self.vwap().unwrap_or(fallback)
    }
}

/// Fold one more execution into an existing average:
/// `(old_px × old_qty + px × qty) / (old_qty + qty)`.
pub fn running_vwap(old_px: Price, old_qty: Size, px: Price, qty: Size) -> Price {
    let total = old_qty.inner() + qty.inner();
    if total.is_zero() {
        return px;
    }
    Price::new((old_px * old_qty + px * qty) / total)
}
