//! fill-ledger importer - Entry Point

use anyhow::Result;
use clap::Parser;
use ledger_telemetry::Metrics;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reconstruct position history from exchange fills
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via LEDGER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Fill file or directory of fill pages (overrides config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config first so its log level can seed the filter
    let config_path = ledger_import::AppConfig::resolve_path(args.config.as_deref());
    let config = ledger_import::AppConfig::load(&config_path)?
        .with_overrides(args.input, args.output_dir);

    ledger_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting ledger-import v{}", env!("CARGO_PKG_VERSION"));
    if Path::new(&config_path).exists() {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        // The loader's own warning fired before the subscriber existed
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }

    let metrics_dump = config.telemetry.metrics_dump;
    let app = ledger_import::Application::new(config);
    app.run()?;

    if metrics_dump {
        print!("{}", Metrics::gather_text()?);
    }

    Ok(())
}
