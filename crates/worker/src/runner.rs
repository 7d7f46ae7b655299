//! Bounded-parallel scan runner.
//!
//! Assets are split into contiguous partitions. Each partition is analyzed on
//! the blocking pool, at most `concurrency` at a time, and the partial
//! reports are merged back in partition order so the result matches a
//! sequential run. With a budget, partitions still running at the deadline
//! are cancelled and their assets listed as omitted. Blocking workers check
//! a shared flag between assets, so a cancelled partition stops after the
//! asset it is on instead of running to completion.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use adfit_core::eligibility::EligibilityPolicy;
use adfit_core::report::report_partition;
use adfit_core::types::AssetId;
use adfit_core::{
    AssetDescriptor, BatchReport, ChannelSpec, ChannelSpecCatalog, CoreError, DerivativesByAsset,
};

use crate::config::RunOptions;
use crate::error::WorkerError;
use crate::scan::{ScanInput, ScanReport};

/// Run one scan against `catalog`.
///
/// Configuration errors from the catalog abort the whole scan. Invalid
/// assets do not; they land in the report's incompatible bucket.
pub async fn run_scan(
    scan: ScanInput,
    catalog: Arc<ChannelSpecCatalog>,
    options: &RunOptions,
) -> Result<ScanReport, WorkerError> {
    let ScanInput {
        source,
        integration_id,
        assets,
        derivatives,
    } = scan;

    let ranges = partition_ranges(assets.len(), options.partition_size);
    let assets = Arc::new(assets);
    let derivatives = Arc::new(derivatives);
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let cancelled = Arc::new(AtomicBool::new(false));

    tracing::info!(
        source = %source,
        assets = assets.len(),
        partitions = ranges.len(),
        concurrency = options.concurrency,
        budget_secs = options.budget.map(|b| b.as_secs()),
        "Starting eligibility scan",
    );

    let mut tasks = JoinSet::new();
    for (index, range) in ranges.iter().cloned().enumerate() {
        let assets = Arc::clone(&assets);
        let derivatives = Arc::clone(&derivatives);
        let catalog = Arc::clone(&catalog);
        let semaphore = Arc::clone(&semaphore);
        let cancelled = Arc::clone(&cancelled);
        let policy = options.policy;

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| WorkerError::Task(e.to_string()))?;
            let partial = tokio::task::spawn_blocking(move || {
                analyze_partition(
                    &assets[range],
                    catalog.specs(),
                    &derivatives,
                    &policy,
                    &cancelled,
                )
            })
            .await
            .map_err(|e| WorkerError::Task(e.to_string()))??;
            if partial.is_some() {
                tracing::debug!(partition = index, "Partition analyzed");
            }
            Ok::<_, WorkerError>((index, partial))
        });
    }

    let deadline = options.budget.map(|budget| Instant::now() + budget);
    let mut finished: Vec<Option<BatchReport>> = vec![None; ranges.len()];

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(
                        pending = tasks.len(),
                        "Scan budget exhausted, cancelling remaining partitions",
                    );
                    cancelled.store(true, Ordering::Relaxed);
                    tasks.abort_all();
                    break;
                }
            },
            None => tasks.join_next().await,
        };
        let Some(joined) = next else { break };
        let (index, partial) = joined.map_err(|e| WorkerError::Task(e.to_string()))??;
        finished[index] = partial;
    }

    let mut report = BatchReport::for_catalog(catalog.specs());
    let mut omitted: Vec<AssetId> = Vec::new();
    for (range, partial) in ranges.into_iter().zip(finished) {
        match partial {
            Some(partial) => report.merge(partial),
            None => omitted.extend(assets[range].iter().map(|a| a.id.clone())),
        }
    }

    let totals = report.totals();
    tracing::info!(
        source = %source,
        total = totals.total,
        eligible = totals.eligible,
        needs_resizing = totals.needs_resizing,
        incompatible = totals.incompatible,
        omitted = omitted.len(),
        "Eligibility scan complete",
    );

    Ok(ScanReport::new(
        source,
        integration_id,
        report,
        &catalog,
        omitted,
    ))
}

/// Analyze one partition asset by asset, giving up with `None` once
/// `cancelled` is set.
fn analyze_partition(
    assets: &[AssetDescriptor],
    catalog: &[ChannelSpec],
    derivatives: &DerivativesByAsset,
    policy: &EligibilityPolicy,
    cancelled: &AtomicBool,
) -> Result<Option<BatchReport>, CoreError> {
    let mut partial = BatchReport::default();
    for asset in assets {
        if cancelled.load(Ordering::Relaxed) {
            return Ok(None);
        }
        partial.merge(report_partition(
            std::slice::from_ref(asset),
            catalog,
            derivatives,
            policy,
        )?);
    }
    Ok(Some(partial))
}

/// Contiguous index ranges of at most `size` items covering `0..len`.
fn partition_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}
