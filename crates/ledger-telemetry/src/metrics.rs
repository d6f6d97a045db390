//! Prometheus metrics for fill-ledger imports.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a build defect and should crash on first
//! use rather than silently drop metrics.

use once_cell::sync::Lazy;
use prometheus::{
    register_gauge_vec, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGaugeVec, TextEncoder,
};

use crate::error::TelemetryResult;

/// Total raw fills read from the input.
pub static FILLS_INGESTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ledger_fills_ingested_total", "Total raw fills read").unwrap()
});

/// Total raw fills rejected by validation.
pub static FILLS_IGNORED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ledger_fills_ignored_total",
        "Total raw fills rejected by validation"
    )
    .unwrap()
});

/// Reducing records dropped because their position opened before the input window.
pub static INCOMPLETE_SESSIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ledger_incomplete_sessions_total",
        "Reducing records dropped with no observed open"
    )
    .unwrap()
});

/// Closed positions emitted.
/// Labels: symbol, side (LONG/SHORT)
pub static POSITIONS_CLOSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ledger_positions_closed_total",
        "Total closed positions reconstructed",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Positions still open at the end of the last import.
/// Labels: symbol, side (LONG/SHORT)
pub static POSITIONS_OPEN: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "ledger_positions_open",
        "Positions still open at end of import",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Sum of realized PnL over closed positions (display only).
pub static REALIZED_PNL_TOTAL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "ledger_realized_pnl_total",
        "Summed realized PnL of closed positions",
        &["symbol"]
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn fills_ingested(count: u64) {
        FILLS_INGESTED_TOTAL.inc_by(count);
    }

    pub fn fills_ignored(count: u64) {
        FILLS_IGNORED_TOTAL.inc_by(count);
    }

    pub fn incomplete_sessions(count: u64) {
        INCOMPLETE_SESSIONS_TOTAL.inc_by(count);
    }

    /// Record one closed position.
    pub fn position_closed(symbol: &str, side: &str, realized_pnl: f64) {
        POSITIONS_CLOSED_TOTAL
            .with_label_values(&[symbol, side])
            .inc();
        REALIZED_PNL_TOTAL
            .with_label_values(&[symbol])
            .add(realized_pnl);
    }

    pub fn positions_open(symbol: &str, side: &str, count: i64) {
        POSITIONS_OPEN.with_label_values(&[symbol, side]).set(count);
    }

    /// Render the default registry in the text exposition format.
    pub fn gather_text() -> TelemetryResult<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}
