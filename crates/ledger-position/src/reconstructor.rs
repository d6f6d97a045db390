//! Batch entry point: raw fills in, position records out.
//!
//! `ingest` may be called once per page of an account's history; session
//! state carries across pages until `finish`.

use ledger_core::{ClosedPosition, OpenPosition, RawFill};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::grouper::group_fills;
use crate::normalizer::FillNormalizer;
use crate::sessionizer::{PositionSessionizer, SessionizerConfig};

/// Result of a reconstruction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionReport {
    pub closed: Vec<ClosedPosition>,
    pub open: Vec<OpenPosition>,
    /// Raw fills that failed validation.
    pub ignored_fills: u64,
    /// Reducing records dropped because their open predates the input.
    pub incomplete_sessions: u64,
    /// Valid fills fed to the sessionizer.
    pub accepted_fills: u64,
}

impl ReconstructionReport {
    pub fn total_realized_pnl(&self) -> Decimal {
        self.closed.iter().map(|c| c.realized_pnl).sum()
    }

    pub fn total_fees(&self) -> Decimal {
        self.closed.iter().map(|c| c.fees).sum()
    }
}

/// Drives normalize -> group -> sessionize over one or more batches.
#[derive(Debug)]
pub struct PositionReconstructor {
    normalizer: FillNormalizer,
    sessionizer: PositionSessionizer,
    accepted_fills: u64,
    last_time: Option<i64>,
}

impl PositionReconstructor {
    pub fn new(config: SessionizerConfig) -> Self {
        Self {
            normalizer: FillNormalizer::new(),
            sessionizer: PositionSessionizer::new(config),
            accepted_fills: 0,
            last_time: None,
        }
    }

    /// Feed one batch of raw fills.
    ///
    /// Fills are expected in non-decreasing time order. Out-of-order input is
    /// sorted (stable) before sessionizing and logged.
    pub fn ingest(&mut self, raws: &[RawFill]) {
        let ignored_before = self.normalizer.ignored_fills();
        let fills = self.normalizer.normalize_batch(raws);

        if fills.windows(2).any(|w| w[1].time < w[0].time) {
            warn!(fills = fills.len(), "Batch not in time order, sorting");
        }

        self.accepted_fills += fills.len() as u64;
        let accepted = fills.len();
        let groups = group_fills(fills);

        if let (Some(last), Some(first)) = (self.last_time, groups.first()) {
            if first.time < last {
                warn!(
                    batch_start = first.time,
                    previous_end = last,
                    "Batch overlaps previously ingested history"
                );
            }
        }
        if let Some(last) = groups.last() {
            self.last_time = Some(self.last_time.map_or(last.time, |t| t.max(last.time)));
        }

        self.sessionizer.apply_all(&groups);

        info!(
            raw = raws.len(),
            accepted,
            ignored = self.normalizer.ignored_fills() - ignored_before,
            groups = groups.len(),
            open_sessions = self.sessionizer.open_session_count(),
            closed_total = self.sessionizer.closed().len(),
            "Batch ingested"
        );
    }

    /// Count records that could not even be decoded into a raw fill.
    pub fn record_unreadable(&mut self, count: u64) {
        self.normalizer.record_ignored(count);
    }

    pub fn ignored_fills(&self) -> u64 {
        self.normalizer.ignored_fills()
    }

    pub fn finish(self) -> ReconstructionReport {
        let ignored_fills = self.normalizer.ignored_fills();
        let output = self.sessionizer.finish();

        ReconstructionReport {
            closed: output.closed,
            open: output.open,
            ignored_fills,
            incomplete_sessions: output.incomplete_sessions,
            accepted_fills: self.accepted_fills,
        }
    }
}

/// Reconstruct positions from a single batch.
pub fn reconstruct_positions(raws: &[RawFill], config: SessionizerConfig) -> ReconstructionReport {
    let mut reconstructor = PositionReconstructor::new(config);
    reconstructor.ingest(raws);
    reconstructor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Direction, Price, Size};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(
        order_id: u64,
        time: i64,
        side: &str,
        price: &str,
        qty: &str,
        pnl: &str,
        fee: &str,
    ) -> RawFill {
        serde_json::from_value(json!({
            "symbol": "BTCUSDC",
            "id": order_id * 10 + qty.len() as u64,
            "orderId": order_id,
            "side": side,
            "positionSide": "BOTH",
            "price": price,
            "qty": qty,
            "realizedPnl": pnl,
            "commission": fee,
            "commissionAsset": "USDC",
            "time": time
        }))
        .unwrap()
    }

    const T0: i64 = 1_745_100_000_000;
    const T1: i64 = 1_745_100_900_000;

    fn btcusdc_round_trip() -> Vec<RawFill> {
        vec![
            raw(1, T0, "SELL", "75194.4", "0.089", "0", "2.67692064"),
            raw(1, T0, "SELL", "75194.4", "0.043", "0", "1.29334368"),
            raw(2, T1, "BUY", "73888.9", "0.093", "121.2999", "2.74871172"),
            raw(2, T1, "BUY", "73896.6", "0.039", "50.70", "1.15275264"),
        ]
    }

    #[test]
    fn test_btcusdc_short_round_trip() {
        let report = reconstruct_positions(&btcusdc_round_trip(), SessionizerConfig::default());

        assert_eq!(report.closed.len(), 1);
        assert!(report.open.is_empty());
        assert_eq!(report.ignored_fills, 0);
        assert_eq!(report.accepted_fills, 4);

        let c = &report.closed[0];
        assert_eq!(c.position_side, Direction::Short);
        assert_eq!(c.open_time, T0);
        assert_eq!(c.close_time, T1);
        assert_eq!(c.open_price, Price::new(dec!(75194.4)));
        assert!(c.close_price.inner() > dec!(73890) && c.close_price.inner() < dec!(73900));
        assert_eq!(c.closed_qty, Size::new(dec!(0.132)));
        assert_eq!(c.realized_pnl, dec!(171.9999));
        assert_eq!(
            c.fees,
            dec!(2.67692064) + dec!(1.29334368) + dec!(2.74871172) + dec!(1.15275264)
        );
        assert_eq!(c.fee_asset.as_deref(), Some("USDC"));
        assert_eq!(c.fill_count, 4);
        assert_eq!(c.position_key.to_string(), format!("BTCUSDC#SHORT#{T0}"));
        assert!(c.pnl_percent.is_some());
    }

    #[test]
    fn test_ignored_fills_counted_exactly() {
        let mut fills = btcusdc_round_trip();
        fills.insert(1, raw(9, T0, "SELL", "0", "0.1", "0", "0"));
        fills.push(raw(9, T1, "SIDEWAYS", "1", "0.1", "0", "0"));
        fills.push(RawFill::default());

        let report = reconstruct_positions(&fills, SessionizerConfig::default());
        assert_eq!(report.ignored_fills, 3);
        assert_eq!(report.closed.len(), 1);
        assert_eq!(report.closed[0].realized_pnl, dec!(171.9999));
    }

    #[test]
    fn test_session_spans_batches() {
        let fills = btcusdc_round_trip();
        let mut reconstructor = PositionReconstructor::new(SessionizerConfig::default());
        reconstructor.ingest(&fills[..2]);
        reconstructor.ingest(&fills[2..]);
        reconstructor.record_unreadable(2);
        assert_eq!(reconstructor.ignored_fills(), 2);

        let report = reconstructor.finish();
        assert_eq!(report.closed.len(), 1);
        assert_eq!(report.closed[0].open_time, T0);
        assert_eq!(report.ignored_fills, 2);
    }

    #[test]
    fn test_unsorted_batch_is_sorted() {
        let mut fills = btcusdc_round_trip();
        fills.reverse();

        let report = reconstruct_positions(&fills, SessionizerConfig::default());
        assert_eq!(report.closed.len(), 1);
        assert_eq!(report.closed[0].position_side, Direction::Short);
        assert_eq!(report.closed[0].open_price, Price::new(dec!(75194.4)));
    }

    #[test]
    fn test_open_position_at_batch_end() {
        let fills = btcusdc_round_trip();
        let report = reconstruct_positions(&fills[..2], SessionizerConfig::default());

        assert!(report.closed.is_empty());
        assert_eq!(report.open.len(), 1);
        assert_eq!(report.open[0].current_qty, Size::new(dec!(0.132)));
        assert_eq!(report.open[0].position_side, Direction::Short);
    }

    #[test]
    fn test_report_totals() {
        let report = reconstruct_positions(&btcusdc_round_trip(), SessionizerConfig::default());
        assert_eq!(report.total_realized_pnl(), dec!(171.9999));
        assert_eq!(report.total_fees(), report.closed[0].fees);
    }
}
