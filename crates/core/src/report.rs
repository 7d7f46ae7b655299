//! Batch eligibility reporting over one integration scan.
//!
//! [`report`] is the sequential entry point. Parallel callers analyze
//! partitions with [`report_partition`] and fold the partial reports back
//! together with [`BatchReport::merge`] in partition order, which keeps
//! every bucket in input order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::ChannelSpec;
use crate::coverage::CoverageIndex;
use crate::eligibility::{
    analyze_with_policy, AssetEligibility, Classification, EligibilityPolicy,
};
use crate::error::CoreError;
use crate::types::{AssetDescriptor, AssetId, DerivativeAsset};

/// Existing derivatives keyed by source asset id.
pub type DerivativesByAsset = HashMap<AssetId, Vec<DerivativeAsset>>;

/// Compact per-asset entry of a batch report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub asset_id: AssetId,
    pub score: u32,
    /// Every channel the asset can run on, natively or through a derivative.
    pub compatible_channels: Vec<String>,
    /// The subset of `compatible_channels` satisfied only by a derivative.
    pub covered_channels: Vec<String>,
    pub fix_channels: Vec<String>,
    pub diagnostic_codes: Vec<String>,
}

impl From<&AssetEligibility> for AssetSummary {
    fn from(result: &AssetEligibility) -> Self {
        Self {
            asset_id: result.asset_id.clone(),
            score: result.score,
            compatible_channels: result
                .compatible_channels
                .iter()
                .map(|c| c.channel_name.clone())
                .collect(),
            covered_channels: result.covered_channels().map(str::to_string).collect(),
            fix_channels: result
                .fix_suggestions
                .iter()
                .map(|s| s.channel_name.clone())
                .collect(),
            diagnostic_codes: result
                .diagnostics
                .iter()
                .map(|d| d.code().to_string())
                .collect(),
        }
    }
}

/// Bucket counts of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportTotals {
    pub total: usize,
    pub eligible: usize,
    pub needs_resizing: usize,
    pub incompatible: usize,
}

/// Aggregate over a set of assets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub eligible: Vec<AssetSummary>,
    pub needs_resizing: Vec<AssetSummary>,
    pub incompatible: Vec<AssetSummary>,
    /// Channel name -> ids of assets usable there (natively or through a
    /// derivative). Every catalog channel has an entry; an empty list is a
    /// coverage gap.
    pub channel_coverage: BTreeMap<String, Vec<AssetId>>,
}

impl BatchReport {
    /// An empty report with every catalog channel seeded.
    pub fn for_catalog(catalog: &[ChannelSpec]) -> Self {
        Self {
            channel_coverage: catalog
                .iter()
                .map(|s| (s.channel_name.clone(), Vec::new()))
                .collect(),
            ..Self::default()
        }
    }

    /// File one analyzed asset.
    pub fn record(&mut self, result: &AssetEligibility) {
        for channel in &result.compatible_channels {
            self.channel_coverage
                .entry(channel.channel_name.clone())
                .or_default()
                .push(result.asset_id.clone());
        }
        let summary = AssetSummary::from(result);
        match result.classification {
            Classification::Eligible => self.eligible.push(summary),
            Classification::NeedsResizing => self.needs_resizing.push(summary),
            Classification::Incompatible => self.incompatible.push(summary),
        }
    }

    /// Append a later partition's report. Single writer: the caller merges
    /// partitions one at a time, in input order.
    pub fn merge(&mut self, other: BatchReport) {
        self.eligible.extend(other.eligible);
        self.needs_resizing.extend(other.needs_resizing);
        self.incompatible.extend(other.incompatible);
        for (channel, ids) in other.channel_coverage {
            self.channel_coverage.entry(channel).or_default().extend(ids);
        }
    }

    pub fn totals(&self) -> ReportTotals {
        ReportTotals {
            total: self.eligible.len() + self.needs_resizing.len() + self.incompatible.len(),
            eligible: self.eligible.len(),
            needs_resizing: self.needs_resizing.len(),
            incompatible: self.incompatible.len(),
        }
    }

    /// Channels no asset in the batch can serve.
    pub fn uncovered_channels(&self) -> Vec<&str> {
        self.channel_coverage
            .iter()
            .filter(|(_, ids)| ids.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Distinct asset ids usable per platform group.
    pub fn platform_coverage(&self, catalog: &[ChannelSpec]) -> BTreeMap<String, Vec<AssetId>> {
        let mut groups: BTreeMap<String, BTreeSet<AssetId>> = BTreeMap::new();
        for spec in catalog {
            let ids = groups.entry(spec.platform_group.clone()).or_default();
            if let Some(assets) = self.channel_coverage.get(&spec.channel_name) {
                ids.extend(assets.iter().cloned());
            }
        }
        groups
            .into_iter()
            .map(|(group, ids)| (group, ids.into_iter().collect()))
            .collect()
    }

    /// All summaries, highest score first. Equal scores keep bucket order.
    pub fn ranked(&self) -> Vec<&AssetSummary> {
        let mut all: Vec<&AssetSummary> = self
            .eligible
            .iter()
            .chain(&self.needs_resizing)
            .chain(&self.incompatible)
            .collect();
        all.sort_by(|a, b| b.score.cmp(&a.score));
        all
    }
}

/// Analyze a batch of assets and roll the results into a report.
pub fn report(
    assets: &[AssetDescriptor],
    catalog: &[ChannelSpec],
    derivatives_by_asset: &DerivativesByAsset,
) -> Result<BatchReport, CoreError> {
    report_with_policy(assets, catalog, derivatives_by_asset, &EligibilityPolicy::default())
}

pub fn report_with_policy(
    assets: &[AssetDescriptor],
    catalog: &[ChannelSpec],
    derivatives_by_asset: &DerivativesByAsset,
    policy: &EligibilityPolicy,
) -> Result<BatchReport, CoreError> {
    let mut report = BatchReport::for_catalog(catalog);
    report.merge(report_partition(assets, catalog, derivatives_by_asset, policy)?);
    let totals = report.totals();
    tracing::info!(
        total = totals.total,
        eligible = totals.eligible,
        needs_resizing = totals.needs_resizing,
        incompatible = totals.incompatible,
        "Batch eligibility report complete",
    );
    Ok(report)
}

/// Analyze one partition of a batch. The result only carries coverage
/// entries for channels some asset in the partition satisfies.
pub fn report_partition(
    assets: &[AssetDescriptor],
    catalog: &[ChannelSpec],
    derivatives_by_asset: &DerivativesByAsset,
    policy: &EligibilityPolicy,
) -> Result<BatchReport, CoreError> {
    let mut partial = BatchReport::default();
    for asset in assets {
        let coverage = derivatives_by_asset
            .get(&asset.id)
            .map(|d| CoverageIndex::build(d))
            .unwrap_or_default();
        let result = analyze_with_policy(asset, catalog, &coverage, policy)?;
        partial.record(&result);
    }
    Ok(partial)
}
