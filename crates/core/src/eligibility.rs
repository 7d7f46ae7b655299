//! Asset-level eligibility across a whole channel catalog.
//!
//! Runs the evaluator for every channel, layers derivative coverage on top,
//! and classifies the asset. A malformed descriptor never aborts the
//! caller: it comes back as an `incompatible` result carrying a single
//! `invalid_asset` diagnostic. Catalog errors, by contrast, are fatal.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::catalog::ChannelSpec;
use crate::coverage::CoverageIndex;
use crate::error::CoreError;
use crate::evaluator::{evaluate_with, ChannelVerdict, Fix, FixTarget, IncompatibleReason};
use crate::ratio::{ratio_deviation, DEFAULT_MIN_SCALE_FACTOR};
use crate::types::{AssetDescriptor, AssetId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Compatible channels needed for an asset to count as broadly usable.
pub const ELIGIBLE_CHANNEL_THRESHOLD: usize = 3;

/// Score weight of each compatible channel.
pub const COMPATIBLE_WEIGHT: u32 = 10;

/// Score weight of each fixable channel.
pub const FIXABLE_WEIGHT: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Asset-level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Eligible,
    NeedsResizing,
    Incompatible,
}

/// How a compatible channel is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilitySource {
    /// The source asset itself fits.
    Native,
    /// An existing derivative fits.
    Derivative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleChannel {
    pub channel_name: String,
    pub platform_group: String,
    pub source: CompatibilitySource,
}

/// A fix the generation service could be asked to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub channel_name: String,
    pub platform_group: String,
    pub fix: Fix,
    /// 1-based rank; lower is cheaper (less of the frame changes).
    pub priority: u32,
}

/// Diagnostic recorded for channels (or assets) that cannot be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Diagnostic {
    Channel {
        channel_name: String,
        reason: IncompatibleReason,
    },
    InvalidAsset {
        message: String,
    },
}

impl Diagnostic {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Channel { reason, .. } => reason.as_str(),
            Self::InvalidAsset { .. } => "invalid_asset",
        }
    }
}

/// Aggregate result for one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEligibility {
    pub asset_id: AssetId,
    pub classification: Classification,
    pub compatible_channels: Vec<CompatibleChannel>,
    pub fix_suggestions: Vec<FixSuggestion>,
    pub diagnostics: Vec<Diagnostic>,
    pub score: u32,
}

/// One derivative request that would satisfy several channels at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub fix: Fix,
    pub channel_names: Vec<String>,
}

impl AssetEligibility {
    pub fn native_channels(&self) -> impl Iterator<Item = &str> {
        self.channels_from(CompatibilitySource::Native)
    }

    pub fn covered_channels(&self) -> impl Iterator<Item = &str> {
        self.channels_from(CompatibilitySource::Derivative)
    }

    fn channels_from(&self, source: CompatibilitySource) -> impl Iterator<Item = &str> {
        self.compatible_channels
            .iter()
            .filter(move |c| c.source == source)
            .map(|c| c.channel_name.as_str())
    }

    pub fn is_compatible_with(&self, channel_name: &str) -> bool {
        self.compatible_channels
            .iter()
            .any(|c| c.channel_name == channel_name)
    }

    /// Group fix suggestions that share an identical target, in priority
    /// order, so one generated derivative can serve all of them.
    pub fn generation_requests(&self) -> Vec<GenerationRequest> {
        let mut requests: Vec<GenerationRequest> = Vec::new();
        for suggestion in &self.fix_suggestions {
            match requests.iter_mut().find(|r| r.fix == suggestion.fix) {
                Some(request) => request.channel_names.push(suggestion.channel_name.clone()),
                None => requests.push(GenerationRequest {
                    fix: suggestion.fix,
                    channel_names: vec![suggestion.channel_name.clone()],
                }),
            }
        }
        requests
    }
}

/// Tunables of the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EligibilityPolicy {
    pub eligible_threshold: usize,
    pub min_scale_factor: f64,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            eligible_threshold: ELIGIBLE_CHANNEL_THRESHOLD,
            min_scale_factor: DEFAULT_MIN_SCALE_FACTOR,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring / classification
// ---------------------------------------------------------------------------

/// `10 x compatible + 5 x fixable`. Only meaningful for ordering.
pub fn compute_score(compatible: usize, fixable: usize) -> u32 {
    let compatible = u32::try_from(compatible).unwrap_or(u32::MAX);
    let fixable = u32::try_from(fixable).unwrap_or(u32::MAX);
    COMPATIBLE_WEIGHT
        .saturating_mul(compatible)
        .saturating_add(FIXABLE_WEIGHT.saturating_mul(fixable))
}

pub fn classify(compatible: usize, fixable: usize, eligible_threshold: usize) -> Classification {
    if compatible >= eligible_threshold {
        Classification::Eligible
    } else if compatible + fixable > 0 {
        Classification::NeedsResizing
    } else {
        Classification::Incompatible
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Analyze an asset against a catalog with the default policy.
pub fn analyze(
    asset: &AssetDescriptor,
    catalog: &[ChannelSpec],
    coverage: &CoverageIndex,
) -> Result<AssetEligibility, CoreError> {
    analyze_with_policy(asset, catalog, coverage, &EligibilityPolicy::default())
}

/// Analyze an asset against a catalog.
///
/// Only [`CoreError::Configuration`] is returned; invalid assets are folded
/// into an `incompatible` result.
pub fn analyze_with_policy(
    asset: &AssetDescriptor,
    catalog: &[ChannelSpec],
    coverage: &CoverageIndex,
    policy: &EligibilityPolicy,
) -> Result<AssetEligibility, CoreError> {
    for spec in catalog {
        spec.validate()?;
    }
    let dims = match asset.checked_dimensions() {
        Ok(dims) => dims,
        Err(e) => {
            tracing::warn!(asset_id = %asset.id, error = %e, "Invalid asset descriptor");
            return Ok(invalid_asset(asset, e));
        }
    };

    let mut compatible_channels = Vec::new();
    let mut pending_fixes: Vec<(usize, f64, FixSuggestion)> = Vec::new();
    let mut diagnostics = Vec::new();

    for spec in catalog {
        let verdict = evaluate_with(asset, spec, policy.min_scale_factor)?;
        let covered = coverage.covers(spec);
        match verdict {
            ChannelVerdict::Compatible => compatible_channels.push(CompatibleChannel {
                channel_name: spec.channel_name.clone(),
                platform_group: spec.platform_group.clone(),
                source: CompatibilitySource::Native,
            }),
            _ if covered => compatible_channels.push(CompatibleChannel {
                channel_name: spec.channel_name.clone(),
                platform_group: spec.platform_group.clone(),
                source: CompatibilitySource::Derivative,
            }),
            ChannelVerdict::NeedsResize { fix } => {
                let deviation = fix_deviation(dims.ratio(), &fix.target);
                pending_fixes.push((
                    pending_fixes.len(),
                    deviation,
                    FixSuggestion {
                        channel_name: spec.channel_name.clone(),
                        platform_group: spec.platform_group.clone(),
                        fix,
                        priority: 0,
                    },
                ));
            }
            ChannelVerdict::Incompatible { reason } => diagnostics.push(Diagnostic::Channel {
                channel_name: spec.channel_name.clone(),
                reason,
            }),
        }
    }

    // Least invasive fix first; catalog order breaks ties.
    pending_fixes.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    let fix_suggestions: Vec<FixSuggestion> = pending_fixes
        .into_iter()
        .zip(1u32..)
        .map(|((_, _, mut suggestion), rank)| {
            suggestion.priority = rank;
            suggestion
        })
        .collect();

    let compatible = compatible_channels.len();
    let fixable = fix_suggestions.len();
    let classification = classify(compatible, fixable, policy.eligible_threshold);

    tracing::debug!(
        asset_id = %asset.id,
        compatible,
        fixable,
        incompatible = diagnostics.len(),
        ?classification,
        "Asset analyzed",
    );

    Ok(AssetEligibility {
        asset_id: asset.id.clone(),
        classification,
        compatible_channels,
        fix_suggestions,
        diagnostics,
        score: compute_score(compatible, fixable),
    })
}

fn fix_deviation(actual: f64, target: &FixTarget) -> f64 {
    ratio_deviation(actual, target.ratio_value())
}

fn invalid_asset(asset: &AssetDescriptor, error: CoreError) -> AssetEligibility {
    let message = match error {
        CoreError::InvalidAsset(message) | CoreError::Configuration(message) => message,
    };
    AssetEligibility {
        asset_id: asset.id.clone(),
        classification: Classification::Incompatible,
        compatible_channels: Vec::new(),
        fix_suggestions: Vec::new(),
        diagnostics: vec![Diagnostic::InvalidAsset { message }],
        score: 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::catalog::{AcceptedMedia, ToleranceClass};
    use crate::types::{DerivativeAsset, Dimensions};

    fn ratio(name: &str, ratios: &[&str]) -> ChannelSpec {
        let ratios = ratios.iter().map(|r| r.parse().unwrap()).collect();
        let media = AcceptedMedia::Both;
        ChannelSpec::ratio_based(name, "Social", media, ratios, ToleranceClass::Strict)
    }

    fn exact(name: &str, w: u32, h: u32) -> ChannelSpec {
        ChannelSpec::exact_size(name, "Display", AcceptedMedia::Image, Dimensions::new(w, h))
    }

    // -- compute_score / classify --

    #[test]
    fn score_weights_compatible_over_fixable() {
        assert_eq!(compute_score(0, 0), 0);
        assert_eq!(compute_score(2, 3), 35);
        assert!(compute_score(1, 0) > compute_score(0, 1));
    }

    #[test]
    fn classification_threshold_is_three() {
        assert_eq!(classify(3, 0, ELIGIBLE_CHANNEL_THRESHOLD), Classification::Eligible);
        assert_eq!(classify(2, 1, ELIGIBLE_CHANNEL_THRESHOLD), Classification::NeedsResizing);
        assert_eq!(classify(2, 0, ELIGIBLE_CHANNEL_THRESHOLD), Classification::NeedsResizing);
        assert_eq!(classify(0, 0, ELIGIBLE_CHANNEL_THRESHOLD), Classification::Incompatible);
    }

    // -- analyze --

    #[test]
    fn square_image_against_mixed_catalog() {
        let catalog = vec![
            ratio("Square A", &["1:1"]),
            ratio("Square B", &["1:1", "4:5"]),
            ratio("Vertical", &["9:16"]),
            exact("Medium Rectangle", 300, 250),
            exact("Large", 4000, 4000),
        ];
        let result = analyze(
            &AssetDescriptor::image("sq", 1080, 1080),
            &catalog,
            &CoverageIndex::empty(),
        )
        .unwrap();

        assert_eq!(result.classification, Classification::NeedsResizing);
        assert_eq!(
            result.native_channels().collect::<Vec<_>>(),
            vec!["Square A", "Square B"]
        );
        assert_eq!(result.fix_suggestions.len(), 2);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code(), "insufficient_resolution");
        assert_eq!(result.score, 2 * 10 + 2 * 5);
    }

    #[test]
    fn fix_suggestions_ranked_by_deviation() {
        // 1.2 is closer to 300x250 (1.2) than to 9:16
        let catalog = vec![ratio("Vertical", &["9:16"]), exact("Medium Rectangle", 300, 250)];
        let result = analyze(
            &AssetDescriptor::image("a", 1200, 1000),
            &catalog,
            &CoverageIndex::empty(),
        )
        .unwrap();
        let ranked: Vec<(&str, u32)> = result
            .fix_suggestions
            .iter()
            .map(|s| (s.channel_name.as_str(), s.priority))
            .collect();
        assert_eq!(ranked, vec![("Medium Rectangle", 1), ("Vertical", 2)]);
    }

    #[test]
    fn equal_deviation_keeps_catalog_order() {
        let catalog = vec![ratio("Story", &["9:16"]), ratio("Reels", &["9:16"])];
        let result = analyze(
            &AssetDescriptor::image("a", 1000, 1000),
            &catalog,
            &CoverageIndex::empty(),
        )
        .unwrap();
        let names: Vec<&str> = result
            .fix_suggestions
            .iter()
            .map(|s| s.channel_name.as_str())
            .collect();
        assert_eq!(names, vec!["Story", "Reels"]);
    }

    #[test]
    fn covered_channel_moves_out_of_fix_suggestions() {
        let catalog = vec![ratio("LinkedIn Feed", &["1.91:1", "1:1"])];
        let asset = AssetDescriptor::image("tall", 1080, 1920);
        let before = analyze(&asset, &catalog, &CoverageIndex::empty()).unwrap();
        assert_eq!(before.fix_suggestions.len(), 1);

        let coverage =
            CoverageIndex::build(&[DerivativeAsset::new("d1", 1, 1).for_channel("LinkedIn Feed")]);
        let after = analyze(&asset, &catalog, &coverage).unwrap();
        assert!(after.fix_suggestions.is_empty());
        assert_eq!(after.covered_channels().collect::<Vec<_>>(), vec!["LinkedIn Feed"]);
    }

    #[test]
    fn native_match_wins_over_coverage() {
        let catalog = vec![ratio("Square", &["1:1"])];
        let coverage =
            CoverageIndex::build(&[DerivativeAsset::new("d1", 500, 500).for_channel("Square")]);
        let result = analyze(&AssetDescriptor::image("a", 800, 800), &catalog, &coverage).unwrap();
        assert_eq!(result.compatible_channels.len(), 1);
        assert_eq!(result.compatible_channels[0].source, CompatibilitySource::Native);
    }

    #[test]
    fn coverage_rescues_incompatible_channel() {
        let catalog = vec![exact("Billboard", 970, 250)];
        let asset = AssetDescriptor::image("small", 100, 100);
        let coverage = CoverageIndex::build(&[DerivativeAsset::new("d", 970, 250)]);
        let result = analyze(&asset, &catalog, &coverage).unwrap();
        assert!(result.is_compatible_with("Billboard"));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn invalid_asset_is_folded_into_result() {
        let catalog = vec![ratio("Square", &["1:1"])];
        let result = analyze(
            &AssetDescriptor::image("bad", 0, 100),
            &catalog,
            &CoverageIndex::empty(),
        )
        .unwrap();
        assert_eq!(result.classification, Classification::Incompatible);
        assert_eq!(result.diagnostics.len(), 1);
        assert_matches!(&result.diagnostics[0], Diagnostic::InvalidAsset { .. });
        assert_eq!(result.diagnostics[0].code(), "invalid_asset");
        assert_eq!(result.score, 0);
    }

    #[test]
    fn broken_catalog_is_fatal_even_for_invalid_asset() {
        let catalog = vec![ratio("Broken", &[])];
        let err = analyze(
            &AssetDescriptor::image("bad", 0, 0),
            &catalog,
            &CoverageIndex::empty(),
        )
        .unwrap_err();
        assert_matches!(err, CoreError::Configuration(_));
    }

    #[test]
    fn policy_threshold_override() {
        let catalog = vec![ratio("Square", &["1:1"])];
        let policy = EligibilityPolicy {
            eligible_threshold: 1,
            ..EligibilityPolicy::default()
        };
        let result = analyze_with_policy(
            &AssetDescriptor::image("a", 600, 600),
            &catalog,
            &CoverageIndex::empty(),
            &policy,
        )
        .unwrap();
        assert_eq!(result.classification, Classification::Eligible);
    }

    // -- generation_requests --

    #[test]
    fn identical_fixes_share_one_request() {
        let catalog = vec![
            ratio("Story", &["9:16"]),
            exact("Medium Rectangle", 300, 250),
            ratio("Reels", &["9:16"]),
        ];
        let result = analyze(
            &AssetDescriptor::image("a", 1920, 1080),
            &catalog,
            &CoverageIndex::empty(),
        )
        .unwrap();
        let requests = result.generation_requests();
        assert_eq!(requests.len(), 2);
        let vertical = requests
            .iter()
            .find(|r| matches!(r.fix.target, FixTarget::Ratio { .. }))
            .unwrap();
        assert_eq!(vertical.channel_names, vec!["Story", "Reels"]);
    }
}
