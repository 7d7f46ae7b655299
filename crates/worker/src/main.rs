//! `adfit-worker` -- one-shot eligibility scan.
//!
//! Usage: `adfit-worker <scan.json> [report.json]`
//!
//! Reads a scan file, analyzes it against the channel catalog, and writes
//! the report envelope to `report.json` or stdout. Configuration comes from
//! the environment (see [`WorkerConfig::from_env`]).
//!
//! # Logging
//!
//! | Variable     | Default                              |
//! |--------------|--------------------------------------|
//! | `RUST_LOG`   | `adfit_worker=info,adfit_core=info`  |
//! | `LOG_FORMAT` | text; `json` for structured lines    |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adfit_worker::config::WorkerConfig;
use adfit_worker::runner::run_scan;
use adfit_worker::scan::{load_catalog, load_scan, to_json, write_report};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    // Logs go to stderr so a report on stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adfit_worker=info,adfit_core=info".into()),
        )
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let scan_path = args
        .next()
        .context("usage: adfit-worker <scan.json> [report.json]")?;
    let report_path = args.next();

    let config = WorkerConfig::from_env().context("Failed to load worker configuration")?;
    let catalog = Arc::new(load_catalog(&config).context("Failed to load channel catalog")?);
    let scan = load_scan(&scan_path)?;

    tracing::info!(
        scan = %scan_path.display(),
        source = %scan.source,
        channels = catalog.len(),
        "Starting adfit-worker",
    );

    let report = run_scan(scan, catalog, &config.run_options()).await?;

    match report_path {
        Some(path) => {
            write_report(&path, &report)?;
            tracing::info!(path = %path.display(), run_id = %report.run_id, "Report written");
        }
        None => println!("{}", to_json(&report)?),
    }

    Ok(())
}
