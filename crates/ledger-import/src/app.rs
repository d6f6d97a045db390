//! Import orchestration.
//!
//! read pages -> reconstruct -> record metrics -> persist.

use crate::config::AppConfig;
use crate::error::AppResult;
use ledger_core::ClosedPosition;
use ledger_persistence::{read_fill_pages, PositionWriter};
use ledger_position::{PositionReconstructor, ReconstructionReport};
use ledger_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one import and return what was reconstructed.
    pub fn run(&self) -> AppResult<ReconstructionReport> {
        info!(
            input = %self.config.input_path.display(),
            output = %self.config.output_dir.display(),
            zero_cross = ?self.config.sessionizer.zero_cross,
            "Starting import"
        );

        let pages = read_fill_pages(&self.config.input_path)?;
        let mut reconstructor = PositionReconstructor::new(self.config.sessionizer.clone());
        let mut raw_total = 0u64;

        for page in &pages {
            raw_total += page.fills.len() as u64 + page.unreadable;
            reconstructor.record_unreadable(page.unreadable);
            reconstructor.ingest(&page.fills);
        }

        let report = reconstructor.finish();
        self.record_metrics(raw_total, &report);

        if report.incomplete_sessions > 0 {
            warn!(
                count = report.incomplete_sessions,
                "Dropped reducing fills whose position opened before the input window"
            );
        }

        let mut writer = PositionWriter::open(&self.config.output_dir)?;
        let written = writer.write_closed(&report.closed)?;
        writer.write_open_snapshot(&report.open)?;

        let net_pnl: Decimal = report.closed.iter().map(ClosedPosition::net_pnl).sum();

        info!(
            pages = pages.len(),
            raw = raw_total,
            ignored = report.ignored_fills,
            closed = report.closed.len(),
            new_closed = written,
            open = report.open.len(),
            realized_pnl = %report.total_realized_pnl(),
            fees = %report.total_fees(),
            %net_pnl,
            "Import complete"
        );

        Ok(report)
    }

    fn record_metrics(&self, raw_total: u64, report: &ReconstructionReport) {
        Metrics::fills_ingested(raw_total);
        Metrics::fills_ignored(report.ignored_fills);
        Metrics::incomplete_sessions(report.incomplete_sessions);

        for closed in &report.closed {
            Metrics::position_closed(
                &closed.symbol,
                &closed.position_side.to_string(),
                closed.realized_pnl.to_f64().unwrap_or(0.0),
            );
        }

        let mut open_counts: BTreeMap<(String, String), i64> = BTreeMap::new();
        for open in &report.open {
            *open_counts
                .entry((open.symbol.clone(), open.position_side.to_string()))
                .or_default() += 1;
        }
        for ((symbol, side), count) in open_counts {
            Metrics::positions_open(&symbol, &side, count);
        }
    }
}
