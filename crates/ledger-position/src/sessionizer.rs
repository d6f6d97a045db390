//! Position sessionizer state machine.
//!
//! Per tracking key: FLAT (no session) -> OPEN (non-zero net exposure) -> FLAT.
//! A session closes the instant its net exposure returns to exactly zero and
//! is replaced by a fresh one (new open time, new position key) on the next
//! record for the same key.
//!
//! Exposure is signed in account terms throughout: BUY adds, SELL subtracts.
//! A record is *increasing* when it grows `|exposure|` and *decreasing*
//! otherwise. Increasing records feed the open-side VWAP, decreasing records
//! the close-side VWAP.

use std::collections::HashMap;

use ledger_core::{ClosedPosition, Direction, OpenPosition, PositionKey, Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::grouper::FillGroup;
use crate::mode::{route, TrackingKey, TrackingMode};
use crate::vwap::VwapAccumulator;

/// Treatment of a one-way record that carries exposure through zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroCrossPolicy {
    /// Classify the whole record by magnitude; never split it.
    #[default]
    Preserve,
    /// Close the current session at zero and open the remainder as a new
    /// session in the opposite direction.
    Split,
}

/// Sessionizer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionizerConfig {
    #[serde(default)]
    pub zero_cross: ZeroCrossPolicy,
}

/// One application of a record to a session.
///
/// Usually the whole fill group; under `ZeroCrossPolicy::Split` a crossing
/// group yields a closing leg and an opening leg.
#[derive(Debug, Clone)]
struct Leg {
    time: i64,
    delta: Decimal,
    price: Price,
    realized_pnl: Decimal,
    fee: Decimal,
    fee_asset: Option<String>,
    fill_count: u32,
}

impl Leg {
    fn from_group(group: &FillGroup) -> Self {
        Self {
            time: group.time,
            delta: group.signed_qty(),
            price: group.price,
            realized_pnl: group.realized_pnl,
            fee: group.fee,
            fee_asset: group.fee_asset.clone(),
            fill_count: group.fill_count,
        }
    }

    fn qty(&self) -> Size {
        Size::new(self.delta.abs())
    }
}

/// In-progress position for one tracking key.
#[derive(Debug, Clone)]
struct Session {
    symbol: String,
    direction: Direction,
    open_time: i64,
    /// Time of the last record applied.
    close_time: i64,
    /// Signed net exposure.
    open_qty: Decimal,
    max_abs_qty: Decimal,
    open_sum: VwapAccumulator,
    close_sum: VwapAccumulator,
    realized_pnl: Decimal,
    fees: Decimal,
    fee_asset: Option<String>,
    fill_count: u32,
    last_price: Price,
}

impl Session {
    fn new(symbol: String, direction: Direction, open_time: i64, price: Price) -> Self {
        Self {
            symbol,
            direction,
            open_time,
            close_time: open_time,
            open_qty: Decimal::ZERO,
            max_abs_qty: Decimal::ZERO,
            open_sum: VwapAccumulator::new(),
            close_sum: VwapAccumulator::new(),
            realized_pnl: Decimal::ZERO,
            fees: Decimal::ZERO,
            fee_asset: None,
            fill_count: 0,
            last_price: price,
        }
    }

    fn key(&self) -> PositionKey {
        PositionKey::new(self.symbol.clone(), self.direction, self.open_time)
    }

    /// Apply a leg. Returns the exposure before and after.
    fn apply(&mut self, leg: &Leg) -> (Decimal, Decimal) {
        let prev = self.open_qty;
        let next = prev + leg.delta;

        if next.abs() > prev.abs() {
            self.open_sum.add(leg.price, leg.qty());
        } else {
            self.close_sum.add(leg.price, leg.qty());
        }

        self.open_qty = next;
        self.max_abs_qty = self.max_abs_qty.max(next.abs());
        self.realized_pnl += leg.realized_pnl;
        self.fees += leg.fee;
        if self.fee_asset.is_none() {
            self.fee_asset.clone_from(&leg.fee_asset);
        }
        self.fill_count += leg.fill_count;
        self.close_time = leg.time;
        self.last_price = leg.price;

        (prev, next)
    }

    fn open_price(&self) -> Price {
        self.open_sum.vwap_or(self.last_price)
    }

    fn into_closed(self) -> ClosedPosition {
        let open_price = self.open_price();
        let close_price = self.close_sum.vwap_or(self.last_price);
        let max_open_qty = Size::new(self.max_abs_qty);
        let closed_qty = if self.close_sum.is_empty() {
            max_open_qty
        } else {
            self.close_sum.qty()
        };

        ClosedPosition {
            position_key: self.key(),
            symbol: self.symbol,
            position_side: self.direction,
            open_time: self.open_time,
            close_time: self.close_time,
            open_price,
            close_price,
            closed_qty,
            max_open_qty,
            realized_pnl: self.realized_pnl,
            pnl_percent: self
                .max_abs_qty
                .checked_mul(open_price.inner())
                .and_then(|notional| pnl_ratio(self.realized_pnl, notional)),
            fees: self.fees,
            fee_asset: self.fee_asset,
            fill_count: self.fill_count,
        }
    }

    fn to_open(&self) -> OpenPosition {
        OpenPosition {
            position_key: self.key(),
            symbol: self.symbol.clone(),
            position_side: self.direction,
            open_time: self.open_time,
            last_fill_time: self.close_time,
            open_price: self.open_price(),
            current_qty: Size::new(self.open_qty.abs()),
            max_open_qty: Size::new(self.max_abs_qty),
            realized_pnl: self.realized_pnl,
            fees: self.fees,
            fee_asset: self.fee_asset.clone(),
            fill_count: self.fill_count,
        }
    }
}

/// `pnl / notional`, or `None` when the notional is zero or so small the
/// quotient leaves `Decimal` range.
pub fn pnl_ratio(pnl: Decimal, notional: Decimal) -> Option<Decimal> {
    pnl.checked_div(notional)
}

/// Everything the sessionizer produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionizerOutput {
    /// Closed positions in close order.
    pub closed: Vec<ClosedPosition>,
    /// Residual sessions, ordered by `(open_time, symbol, side)`.
    pub open: Vec<OpenPosition>,
    /// Reducing records seen on a FLAT key and dropped.
    pub incomplete_sessions: u64,
}

/// Session state machine over fill groups.
///
/// Owns its session map; nothing is shared between instances.
#[derive(Debug, Default)]
pub struct PositionSessionizer {
    config: SessionizerConfig,
    sessions: HashMap<TrackingKey, Session>,
    closed: Vec<ClosedPosition>,
    incomplete_sessions: u64,
}

impl PositionSessionizer {
    pub fn new(config: SessionizerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Apply one fill group. Groups must arrive in non-decreasing time order.
    pub fn apply(&mut self, group: &FillGroup) {
        let (mode, key) = route(group);
        let leg = Leg::from_group(group);

        trace!(
            key = %key,
            time = group.time,
            side = %group.side,
            qty = %group.qty,
            price = %group.price,
            "Applying fill group"
        );

        if !self.sessions.contains_key(&key) && !self.open_session(&key, mode, group, &leg) {
            return;
        }

        let crosses = self.sessions.get(&key).is_some_and(|s| {
            let next = s.open_qty + leg.delta;
            !s.open_qty.is_zero()
                && !next.is_zero()
                && s.open_qty.is_sign_positive() != next.is_sign_positive()
        });

        if crosses && mode == TrackingMode::OneWay && self.config.zero_cross == ZeroCrossPolicy::Split
        {
            self.apply_split(&key, leg);
        } else {
            self.apply_leg(&key, &leg);
        }
    }

    pub fn apply_all<'a>(&mut self, groups: impl IntoIterator<Item = &'a FillGroup>) {
        for group in groups {
            self.apply(group);
        }
    }

    /// Number of keys currently OPEN.
    pub fn open_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Closed positions emitted so far.
    pub fn closed(&self) -> &[ClosedPosition] {
        &self.closed
    }

    pub fn incomplete_sessions(&self) -> u64 {
        self.incomplete_sessions
    }

    /// End the batch: residual sessions become open positions.
    pub fn finish(self) -> SessionizerOutput {
        let mut open: Vec<OpenPosition> = self.sessions.values().map(Session::to_open).collect();
        open.sort_by(|a, b| {
            (a.open_time, &a.symbol, a.position_side).cmp(&(b.open_time, &b.symbol, b.position_side))
        });

        SessionizerOutput {
            closed: self.closed,
            open,
            incomplete_sessions: self.incomplete_sessions,
        }
    }

    /// Create a session for a FLAT key. Returns false if the record was dropped.
    fn open_session(
        &mut self,
        key: &TrackingKey,
        mode: TrackingMode,
        group: &FillGroup,
        leg: &Leg,
    ) -> bool {
        // A reducing record on a FLAT key means the session began before the
        // batch window. Its open time is unknowable.
        let reduces_unseen = match mode {
            TrackingMode::Hedge(direction) => group.side != direction.opening_side(),
            TrackingMode::OneWay => !group.realized_pnl.is_zero(),
        };
        if reduces_unseen {
            self.incomplete_sessions += 1;
            debug!(
                key = %key,
                time = group.time,
                side = %group.side,
                realized_pnl = %group.realized_pnl,
                "Dropping reducing record with no observed open"
            );
            return false;
        }

        let direction = match mode {
            TrackingMode::Hedge(direction) => direction,
            TrackingMode::OneWay => match Direction::from_signed(leg.delta) {
                Some(direction) => direction,
                None => return false,
            },
        };

        debug!(key = %key, %direction, time = group.time, "Session opened");
        self.sessions.insert(
            key.clone(),
            Session::new(group.symbol.clone(), direction, group.time, group.price),
        );
        true
    }

    fn apply_leg(&mut self, key: &TrackingKey, leg: &Leg) {
        let Some(session) = self.sessions.get_mut(key) else {
            return;
        };

        let (prev, next) = session.apply(leg);
        if !prev.is_zero() && next.is_zero() {
            self.close(key);
        }
    }

    fn apply_split(&mut self, key: &TrackingKey, leg: Leg) {
        let Some(session) = self.sessions.get(key) else {
            return;
        };

        let total = leg.delta.abs();
        let closing_delta = -session.open_qty;
        let closing_fee = leg.fee * closing_delta.abs() / total;

        let closing = Leg {
            delta: closing_delta,
            fee: closing_fee,
            ..leg.clone()
        };
        let opening = Leg {
            delta: leg.delta - closing_delta,
            realized_pnl: Decimal::ZERO,
            fee: leg.fee - closing_fee,
            ..leg
        };

        debug!(
            key = %key,
            time = opening.time,
            closing = %closing.delta,
            opening = %opening.delta,
            "Splitting record across zero"
        );

        self.apply_leg(key, &closing);

        let Some(direction) = Direction::from_signed(opening.delta) else {
            return;
        };
        let symbol = key.symbol.clone();
        self.sessions.insert(
            key.clone(),
            Session::new(symbol, direction, opening.time, opening.price),
        );
        self.apply_leg(key, &opening);
    }

    fn close(&mut self, key: &TrackingKey) {
        if let Some(session) = self.sessions.remove(key) {
            let closed = session.into_closed();
            debug!(
                position_key = %closed.position_key,
                open_price = %closed.open_price,
                close_price = %closed.close_price,
                realized_pnl = %closed.realized_pnl,
                holding_ms = closed.holding_ms(),
                fills = closed.fill_count,
                "Session closed"
            );
            self.closed.push(closed);
        }
    }
}
