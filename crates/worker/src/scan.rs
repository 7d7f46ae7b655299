//! Scan input and report envelope I/O.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adfit_core::report::ReportTotals;
use adfit_core::types::AssetId;
use adfit_core::{default_catalog, AssetDescriptor, BatchReport, ChannelSpecCatalog, DerivativesByAsset};

use crate::config::{CatalogMode, WorkerConfig};
use crate::error::WorkerError;

/// One integration scan: the assets it found plus their known derivatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanInput {
    /// Free-form label of the scanning integration, e.g. `"google_drive"`.
    pub source: String,
    /// Optional; ad-hoc scans have no integration record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    pub assets: Vec<AssetDescriptor>,
    #[serde(default)]
    pub derivatives: DerivativesByAsset,
}

/// Report envelope written for one scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    pub totals: ReportTotals,
    pub report: BatchReport,
    /// Platform group -> distinct ids of assets usable in that group.
    pub platform_coverage: BTreeMap<String, Vec<AssetId>>,
    /// Assets whose partition did not finish inside the scan budget.
    pub omitted_assets: Vec<AssetId>,
}

impl ScanReport {
    pub fn new(
        source: String,
        integration_id: Option<String>,
        report: BatchReport,
        catalog: &ChannelSpecCatalog,
        omitted_assets: Vec<AssetId>,
    ) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            source,
            integration_id,
            totals: report.totals(),
            platform_coverage: report.platform_coverage(catalog.specs()),
            report,
            omitted_assets,
        }
    }
}

/// Read and parse a scan file.
pub fn load_scan(path: &Path) -> Result<ScanInput, WorkerError> {
    let raw = read(path)?;
    serde_json::from_str(&raw).map_err(|source| WorkerError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the catalog for this run.
///
/// Without `CATALOG_PATH` the built-in catalog is used. With it, the file's
/// channels either extend the built-in list or replace it.
pub fn load_catalog(config: &WorkerConfig) -> Result<ChannelSpecCatalog, WorkerError> {
    let Some(path) = &config.catalog_path else {
        return Ok(default_catalog()?);
    };
    let from_file = ChannelSpecCatalog::from_json_str(&read(path)?)?;
    let catalog = match config.catalog_mode {
        CatalogMode::Extend => default_catalog()?.extend(from_file)?,
        CatalogMode::Replace => from_file,
    };
    tracing::info!(
        path = %path.display(),
        mode = ?config.catalog_mode,
        channels = catalog.len(),
        "Loaded channel catalog",
    );
    Ok(catalog)
}

/// Write a report as pretty-printed JSON.
pub fn write_report(path: &Path, report: &ScanReport) -> Result<(), WorkerError> {
    let json = to_json(report)?;
    std::fs::write(path, json).map_err(|source| WorkerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn to_json(report: &ScanReport) -> Result<String, WorkerError> {
    serde_json::to_string_pretty(report).map_err(WorkerError::Serialize)
}

fn read(path: &Path) -> Result<String, WorkerError> {
    std::fs::read_to_string(path).map_err(|source| WorkerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
