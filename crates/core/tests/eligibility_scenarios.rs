//! End-to-end behaviour of the eligibility engine.
//!
//! Exercises `evaluate`, `analyze`, and `report` together against small
//! synthetic catalogs and the built-in catalog.

use assert_matches::assert_matches;

use adfit_core::catalog::{AcceptedMedia, ToleranceClass};
use adfit_core::eligibility::CompatibilitySource;
use adfit_core::evaluator::{FixTarget, IncompatibleReason};
use adfit_core::{
    analyze, default_catalog, evaluate, report, AssetDescriptor, ChannelSpec, ChannelVerdict,
    Classification, CoverageIndex, DerivativeAsset, DerivativesByAsset, Dimensions,
};

fn exact(name: &str, w: u32, h: u32) -> ChannelSpec {
    ChannelSpec::exact_size(name, "Display", AcceptedMedia::Image, Dimensions::new(w, h))
}

fn ratio(name: &str, media: AcceptedMedia, ratios: &[&str]) -> ChannelSpec {
    let ratios = ratios.iter().map(|r| r.parse().unwrap()).collect();
    ChannelSpec::ratio_based(name, "Social", media, ratios, ToleranceClass::Strict)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// A square image is large enough to be cut down to a 300x250 display slot.
#[test]
fn scenario_a_square_image_resized_to_medium_rectangle() {
    let verdict = evaluate(
        &AssetDescriptor::image("a", 1080, 1080),
        &exact("Medium Rectangle", 300, 250),
    )
    .unwrap();
    let fix = verdict.fix().expect("a fix should be proposed");
    assert_eq!(
        fix.target,
        FixTarget::Size {
            size: Dimensions::new(300, 250)
        }
    );
}

/// A thumbnail would need more than a 2x upscale for a 1200x627 slot.
#[test]
fn scenario_b_thumbnail_has_insufficient_resolution() {
    let verdict = evaluate(
        &AssetDescriptor::image("b", 100, 100),
        &exact("Sponsored Content", 1200, 627),
    )
    .unwrap();
    assert_eq!(
        verdict,
        ChannelVerdict::Incompatible {
            reason: IncompatibleReason::InsufficientResolution
        }
    );
}

/// Ratio mismatch is reported before duration is even looked at.
#[test]
fn scenario_c_ratio_mismatch_dominates_short_duration() {
    let spec =
        ratio("Vertical Video", AcceptedMedia::Video, &["9:16"]).with_duration(Some(5.0), None);
    let verdict = evaluate(&AssetDescriptor::video("c", 1920, 1080, 3.0), &spec).unwrap();
    assert_matches!(
        verdict,
        ChannelVerdict::NeedsResize { fix }
            if matches!(fix.target, FixTarget::Ratio { ratio } if ratio.to_string() == "9:16")
    );
}

/// Once the ratio matches, a too-short clip is rejected.
#[test]
fn scenario_d_matching_ratio_then_duration_too_short() {
    let spec =
        ratio("Vertical Video", AcceptedMedia::Video, &["9:16"]).with_duration(Some(5.0), None);
    let verdict = evaluate(&AssetDescriptor::video("d", 1080, 1920, 3.0), &spec).unwrap();
    assert_eq!(verdict.reason(), Some(IncompatibleReason::DurationTooShort));
}

/// A derivative tagged for LinkedIn Feed covers that channel on re-analysis.
#[test]
fn scenario_e_tagged_derivative_covers_channel() {
    let catalog = default_catalog().unwrap();
    let asset = AssetDescriptor::image("e", 1080, 1920);

    let before = analyze(&asset, catalog.specs(), &CoverageIndex::empty()).unwrap();
    assert!(before
        .fix_suggestions
        .iter()
        .any(|s| s.channel_name == "LinkedIn Feed"));

    let coverage = CoverageIndex::build(&[
        DerivativeAsset::new("e-linkedin", 1200, 628).for_channel("LinkedIn Feed")
    ]);
    let after = analyze(&asset, catalog.specs(), &coverage).unwrap();
    let linkedin = after
        .compatible_channels
        .iter()
        .find(|c| c.channel_name == "LinkedIn Feed")
        .expect("LinkedIn Feed should be compatible");
    assert_eq!(linkedin.source, CompatibilitySource::Derivative);
    assert!(!after
        .fix_suggestions
        .iter()
        .any(|s| s.channel_name == "LinkedIn Feed"));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Every exact-size channel accepts an asset of exactly its size.
#[test]
fn exact_dimensions_are_always_compatible() {
    let catalog = default_catalog().unwrap();
    for spec in catalog.specs() {
        if let Some(size) = spec.exact() {
            let asset = AssetDescriptor::image("x", i64::from(size.width), i64::from(size.height));
            assert_eq!(
                evaluate(&asset, spec).unwrap(),
                ChannelVerdict::Compatible,
                "{} should accept {size}",
                spec.channel_name
            );
        }
    }
}

/// A ratio outside every accepted ratio's tolerance is never compatible.
#[test]
fn out_of_tolerance_ratio_is_never_compatible() {
    let catalog = default_catalog().unwrap();
    // 3:1 panorama is far from every accepted ratio in the built-in table
    let assets = [
        AssetDescriptor::image("pano", 3000, 1000),
        AssetDescriptor::video("pano-v", 3000, 1000, 10.0),
    ];
    for asset in &assets {
        for spec in catalog.specs().iter().filter(|s| s.exact().is_none()) {
            assert!(
                !evaluate(asset, spec).unwrap().is_compatible(),
                "{} should not accept a 3:1 asset",
                spec.channel_name
            );
        }
    }
}

/// Analysis holds no hidden state.
#[test]
fn analyze_is_idempotent() {
    let catalog = default_catalog().unwrap();
    let asset = AssetDescriptor::video("v", 1920, 1080, 30.0);
    let coverage = CoverageIndex::build(&[DerivativeAsset::new("d", 1080, 1920)]);
    let first = analyze(&asset, catalog.specs(), &coverage).unwrap();
    let second = analyze(&asset, catalog.specs(), &coverage).unwrap();
    assert_eq!(first, second);
}

/// Adding a derivative only ever grows the compatible set.
#[test]
fn coverage_is_monotonic() {
    let catalog = default_catalog().unwrap();
    let asset = AssetDescriptor::image("m", 1080, 1080);
    let before = analyze(&asset, catalog.specs(), &CoverageIndex::empty()).unwrap();

    let coverage = CoverageIndex::build(&[
        DerivativeAsset::new("m-story", 1080, 1920).for_channel("Instagram Story"),
        DerivativeAsset::new("m-mrec", 300, 250),
    ]);
    let after = analyze(&asset, catalog.specs(), &coverage).unwrap();

    for channel in &before.compatible_channels {
        assert!(after.is_compatible_with(&channel.channel_name));
    }
    for name in ["Instagram Story", "Facebook Story", "Medium Rectangle"] {
        assert!(!before.is_compatible_with(name));
        assert!(after.is_compatible_with(name), "{name} should now be covered");
        assert!(!after.fix_suggestions.iter().any(|s| s.channel_name == name));
    }
    assert!(after.score >= before.score);
}

/// Exactly three compatible channels is the eligibility boundary.
#[test]
fn classification_boundary_at_three_channels() {
    let three = vec![
        ratio("A", AcceptedMedia::Both, &["1:1"]),
        ratio("B", AcceptedMedia::Both, &["1:1"]),
        ratio("C", AcceptedMedia::Both, &["1:1"]),
    ];
    let asset = AssetDescriptor::image("sq", 600, 600);
    let result = analyze(&asset, &three, &CoverageIndex::empty()).unwrap();
    assert_eq!(result.classification, Classification::Eligible);

    let two_and_fixable = vec![
        ratio("A", AcceptedMedia::Both, &["1:1"]),
        ratio("B", AcceptedMedia::Both, &["1:1"]),
        ratio("C", AcceptedMedia::Both, &["9:16"]),
    ];
    let result = analyze(&asset, &two_and_fixable, &CoverageIndex::empty()).unwrap();
    assert_eq!(result.classification, Classification::NeedsResizing);

    let nothing = vec![exact("Huge", 5000, 5000), ratio("Video", AcceptedMedia::Video, &["1:1"])];
    let result = analyze(&asset, &nothing, &CoverageIndex::empty()).unwrap();
    assert_eq!(result.classification, Classification::Incompatible);
    assert_eq!(result.diagnostics.len(), 2);
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// One malformed asset does not abort the batch.
#[test]
fn batch_survives_invalid_asset() {
    let catalog = default_catalog().unwrap();
    let mut broken_video = AssetDescriptor::video("no-duration", 1080, 1920, 0.0);
    broken_video.duration_seconds = None;
    let assets = vec![
        AssetDescriptor::image("good", 1080, 1080),
        broken_video,
        AssetDescriptor::video("reel", 1080, 1920, 15.0),
    ];
    let derivatives = DerivativesByAsset::new();
    let batch = report(&assets, catalog.specs(), &derivatives).unwrap();

    assert_eq!(batch.totals().total, 3);
    assert_eq!(batch.incompatible.len(), 1);
    assert_eq!(batch.incompatible[0].asset_id, "no-duration");
    assert!(batch.channel_coverage["TikTok In-Feed"].contains(&"reel".to_string()));
    assert_eq!(batch.channel_coverage.len(), catalog.len());
}

/// Duration bounds on a display slot are ignored rather than failing the batch.
#[test]
fn duration_bounded_display_slot_does_not_abort_batch() {
    let catalog = vec![
        exact("Video Display", 300, 250).with_duration(None, Some(30.0)),
        ratio("Square", AcceptedMedia::Image, &["1:1"]).with_duration(Some(1.0), None),
    ];
    let assets = vec![
        AssetDescriptor::image("mrec", 300, 250),
        AssetDescriptor::image("sq", 1050, 1000),
    ];
    let batch = report(&assets, &catalog, &DerivativesByAsset::new()).unwrap();
    assert_eq!(batch.totals().total, 2);
    assert_eq!(batch.channel_coverage["Video Display"], vec!["mrec"]);
    assert_eq!(batch.channel_coverage["Square"], vec!["sq"]);
}
