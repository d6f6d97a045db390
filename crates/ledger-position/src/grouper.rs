//! Collapse partial fills into logical executions.
//!
//! Some exchanges split one execution into several rows sharing
//! `(symbol, orderId, time, side)`. Sessionizing each row on its own
//! produces spurious micro-sessions, so rows are merged first.

use std::collections::HashMap;

use ledger_core::{Fill, PositionSide, Price, Side, Size};
use rust_decimal::Decimal;

use crate::vwap::running_vwap;

/// Grouping key for one logical execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub symbol: String,
    pub order_id: Option<String>,
    pub time: i64,
    pub side: Side,
}

impl GroupKey {
    pub fn of(fill: &Fill) -> Self {
        Self {
            symbol: fill.symbol.clone(),
            order_id: fill.order_id.clone(),
            time: fill.time,
            side: fill.side,
        }
    }
}

/// One or more fills merged into a single execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillGroup {
    pub symbol: String,
    pub order_id: Option<String>,
    pub time: i64,
    pub side: Side,
    pub position_side: PositionSide,
    /// Total quantity (always positive).
    pub qty: Size,
    /// Running VWAP of the merged fills.
    pub price: Price,
    pub realized_pnl: Decimal,
    pub fee: Decimal,
    pub fee_asset: Option<String>,
    /// Trade ids of the contributing fills, in arrival order.
    pub trade_ids: Vec<String>,
    /// Number of raw fills merged into this group.
    pub fill_count: u32,
}

impl FillGroup {
    pub fn from_fill(fill: Fill) -> Self {
        Self {
            trade_ids: fill.trade_id.into_iter().collect(),
            symbol: fill.symbol,
            order_id: fill.order_id,
            time: fill.time,
            side: fill.side,
            position_side: fill.position_side,
            qty: fill.qty,
            price: fill.price,
            realized_pnl: fill.realized_pnl,
            fee: fill.commission,
            fee_asset: fill.commission_asset,
            fill_count: 1,
        }
    }

    /// Merge another fill with the same key.
    pub fn absorb(&mut self, fill: Fill) {
        self.price = running_vwap(self.price, self.qty, fill.price, fill.qty);
        self.qty += fill.qty;
        self.realized_pnl += fill.realized_pnl;
        self.fee += fill.commission;
        if self.fee_asset.is_none() {
            self.fee_asset = fill.commission_asset;
        }
        self.trade_ids.extend(fill.trade_id);
        self.fill_count += 1;
    }

    /// Signed quantity: +qty for buy, -qty for sell.
    pub fn signed_qty(&self) -> Decimal {
        self.qty.inner() * self.side.sign()
    }
}

/// Group fills by `(symbol, orderId, time, side)`.
///
/// Output is ascending by time; ties keep the order in which each group
/// first appeared in the input. Input order is otherwise unconstrained.
pub fn group_fills(fills: impl IntoIterator<Item = Fill>) -> Vec<FillGroup> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<FillGroup> = Vec::new();

    for fill in fills {
        let key = GroupKey::of(&fill);
        match index.get(&key) {
            Some(&i) => groups[i].absorb(fill),
            None => {
                index.insert(key, groups.len());
                groups.push(FillGroup::from_fill(fill));
            }
        }
    }

    // Stable sort keeps first-appearance order for equal times.
    groups.sort_by_key(|g| g.time);
    groups
}
