//! Per-channel compatibility evaluation.
//!
//! Pure logic: one asset against one channel spec yields one
//! [`ChannelVerdict`]. No coverage information is consulted here; the
//! analyzer layers derivative coverage on top.

use serde::{Deserialize, Serialize};

use crate::catalog::{ChannelSpec, SizingRule};
use crate::error::CoreError;
use crate::ratio::{
    can_resize_to, crop_to_ratio, nearest_accepted_ratio, ratios_match, AspectRatio,
    DEFAULT_MIN_SCALE_FACTOR,
};
use crate::types::{AssetDescriptor, Dimensions, MediaKind};

// ---------------------------------------------------------------------------
// Verdict types
// ---------------------------------------------------------------------------

/// Why an asset cannot be used for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompatibleReason {
    WrongMediaKind,
    RatioMismatch,
    SizeMismatch,
    DurationTooShort,
    DurationTooLong,
    InsufficientResolution,
}

impl IncompatibleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WrongMediaKind => "wrong_media_kind",
            Self::RatioMismatch => "ratio_mismatch",
            Self::SizeMismatch => "size_mismatch",
            Self::DurationTooShort => "duration_too_short",
            Self::DurationTooLong => "duration_too_long",
            Self::InsufficientResolution => "insufficient_resolution",
        }
    }
}

/// The operation the generation service is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixAction {
    CropOrExtend,
}

/// What a fix should produce.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FixTarget {
    Ratio { ratio: AspectRatio },
    Size { size: Dimensions },
}

impl FixTarget {
    pub fn ratio_value(&self) -> f64 {
        match self {
            Self::Ratio { ratio } => ratio.value(),
            Self::Size { size } => size.ratio(),
        }
    }
}

/// A resize/crop/extend instruction for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub target: FixTarget,
    pub action: FixAction,
    /// Concrete output size: the exact size for pixel-exact channels, the
    /// largest centre crop of the target ratio for ratio-based ones.
    pub output_size: Dimensions,
}

/// Result of evaluating one asset against one channel spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ChannelVerdict {
    Compatible,
    NeedsResize { fix: Fix },
    Incompatible { reason: IncompatibleReason },
}

impl ChannelVerdict {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible)
    }

    pub fn fix(&self) -> Option<&Fix> {
        match self {
            Self::NeedsResize { fix } => Some(fix),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<IncompatibleReason> {
        match self {
            Self::Incompatible { reason } => Some(*reason),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate an asset against a channel spec with the default 2x upscale limit.
pub fn evaluate(asset: &AssetDescriptor, spec: &ChannelSpec) -> Result<ChannelVerdict, CoreError> {
    evaluate_with(asset, spec, DEFAULT_MIN_SCALE_FACTOR)
}

/// Evaluate an asset against a channel spec.
///
/// Fails with [`CoreError::Configuration`] when the spec is malformed and
/// with [`CoreError::InvalidAsset`] when the descriptor is.
pub fn evaluate_with(
    asset: &AssetDescriptor,
    spec: &ChannelSpec,
    min_scale_factor: f64,
) -> Result<ChannelVerdict, CoreError> {
    spec.validate()?;
    let dims = asset.checked_dimensions()?;

    if !spec.media.accepts(asset.kind) {
        return Ok(ChannelVerdict::Incompatible {
            reason: IncompatibleReason::WrongMediaKind,
        });
    }

    match &spec.sizing {
        SizingRule::ExactSize { size } => Ok(evaluate_exact(dims, *size, min_scale_factor)),
        SizingRule::AspectRatios { ratios, tolerance } => {
            let actual = dims.ratio();
            if ratios_match(actual, ratios, tolerance.fraction()) {
                return Ok(check_duration(asset, spec));
            }
            let ratio = nearest_accepted_ratio(actual, ratios).ok_or_else(|| {
                CoreError::Configuration(format!(
                    "Channel '{}' has no accepted aspect ratios",
                    spec.channel_name
                ))
            })?;
            Ok(ChannelVerdict::NeedsResize {
                fix: Fix {
                    target: FixTarget::Ratio { ratio },
                    action: FixAction::CropOrExtend,
                    output_size: crop_to_ratio(dims, ratio),
                },
            })
        }
    }
}

fn evaluate_exact(dims: Dimensions, size: Dimensions, min_scale_factor: f64) -> ChannelVerdict {
    if dims == size {
        ChannelVerdict::Compatible
    } else if can_resize_to(dims, size, min_scale_factor) {
        ChannelVerdict::NeedsResize {
            fix: Fix {
                target: FixTarget::Size { size },
                action: FixAction::CropOrExtend,
                output_size: size,
            },
        }
    } else {
        ChannelVerdict::Incompatible {
            reason: IncompatibleReason::InsufficientResolution,
        }
    }
}

/// Duration bounds apply to video only and only once the ratio matched.
fn check_duration(asset: &AssetDescriptor, spec: &ChannelSpec) -> ChannelVerdict {
    if asset.kind != MediaKind::Video {
        return ChannelVerdict::Compatible;
    }
    // Validated descriptors always carry a duration for video.
    let duration = asset.duration_seconds.unwrap_or_default();
    if spec.min_duration_seconds.is_some_and(|min| duration < min) {
        ChannelVerdict::Incompatible {
            reason: IncompatibleReason::DurationTooShort,
        }
    } else if spec.max_duration_seconds.is_some_and(|max| duration > max) {
        ChannelVerdict::Incompatible {
            reason: IncompatibleReason::DurationTooLong,
        }
    } else {
        ChannelVerdict::Compatible
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
