//! Aspect-ratio arithmetic and tolerance matching.
//!
//! Pure numeric helpers used by the evaluator and the coverage index. All
//! ratio comparisons in the engine go through [`ratios_match`] so that an
//! asset and a derivative with the same pixel shape are always judged the
//! same way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Dimensions;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Tolerance for exact-size and strict ratio checks (5%).
pub const STRICT_TOLERANCE: f64 = 0.05;

/// Tolerance for informal social buckets such as "square" or "vertical" (10%).
pub const COARSE_TOLERANCE: f64 = 0.10;

/// Slack added to tolerance comparisons so a ratio exactly on the boundary
/// still matches despite floating-point rounding.
pub const TOLERANCE_EPSILON: f64 = 1e-9;

/// An asset must be at least half the target size on each axis, i.e. a fix
/// may never require more than a 2x upscale.
pub const DEFAULT_MIN_SCALE_FACTOR: f64 = 0.5;

/* --------------------------------------------------------------------------
AspectRatio
-------------------------------------------------------------------------- */

/// A `w:h` aspect ratio such as `9:16` or `1.91:1`.
///
/// Serialized as its `w:h` string form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    width: f64,
    height: f64,
}

impl AspectRatio {
    pub fn new(width: f64, height: f64) -> Result<Self, CoreError> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(CoreError::Configuration(format!(
                "Aspect ratio terms must be positive numbers (got {width}:{height})"
            )));
        }
        Ok(Self { width, height })
    }

    /// The ratio of a pixel size. Fails for zero-sized dimensions.
    pub fn of(dimensions: Dimensions) -> Result<Self, CoreError> {
        Self::new(f64::from(dimensions.width), f64::from(dimensions.height))
    }

    pub fn value(self) -> f64 {
        self.width / self.height
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.split_once(':').ok_or_else(|| {
            CoreError::Configuration(format!("Aspect ratio '{s}' must be written as 'w:h'"))
        })?;
        let parse = |term: &str| {
            term.trim().parse::<f64>().map_err(|_| {
                CoreError::Configuration(format!("Aspect ratio '{s}' has a non-numeric term"))
            })
        };
        Self::new(parse(w)?, parse(h)?)
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

/* --------------------------------------------------------------------------
Matching functions
-------------------------------------------------------------------------- */

/// Relative distance between two ratios: `|actual / target - 1|`.
pub fn ratio_deviation(actual: f64, target: f64) -> f64 {
    (actual / target - 1.0).abs()
}

/// Whether `actual` is within `tolerance_fraction` of any accepted ratio.
/// The boundary is inclusive.
pub fn ratios_match(actual: f64, accepted: &[AspectRatio], tolerance_fraction: f64) -> bool {
    accepted
        .iter()
        .any(|r| ratio_deviation(actual, r.value()) <= tolerance_fraction + TOLERANCE_EPSILON)
}

/// Whether `source` can be brought to `target` without upscaling past
/// `1 / min_scale_factor` on either axis.
pub fn can_resize_to(source: Dimensions, target: Dimensions, min_scale_factor: f64) -> bool {
    f64::from(source.width) >= min_scale_factor * f64::from(target.width)
        && f64::from(source.height) >= min_scale_factor * f64::from(target.height)
}

/// The accepted ratio closest to `actual`. Ties go to the first listed.
///
/// Returns `None` only for an empty list.
pub fn nearest_accepted_ratio(actual: f64, accepted: &[AspectRatio]) -> Option<AspectRatio> {
    let mut best: Option<(AspectRatio, f64)> = None;
    for ratio in accepted {
        let diff = (actual - ratio.value()).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((*ratio, diff)),
        }
    }
    best.map(|(ratio, _)| ratio)
}

/// The largest pixel box of `ratio` that fits inside `source` (centre crop).
pub fn crop_to_ratio(source: Dimensions, ratio: AspectRatio) -> Dimensions {
    let target = ratio.value();
    if source.ratio() > target {
        let width = (f64::from(source.height) * target).round() as u32;
        Dimensions::new(width.clamp(1, source.width), source.height)
    } else {
        let height = (f64::from(source.width) / target).round() as u32;
        Dimensions::new(source.width, height.clamp(1, source.height))
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
