//! Input descriptors shared by every stage of the engine.
//!
//! Assets and derivatives arrive from external collaborators (scanners,
//! the generation service, persistence) as plain data. Nothing in this
//! module fetches or inspects media; it only describes it.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;

/// Assets are keyed by the identifier their source provider hands us.
pub type AssetId = String;

/// What kind of media an asset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// A pixel size. Rendered and keyed as `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Callers must not pass a zero height.
    pub fn ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The `"WxH"` key used by the coverage index.
    pub fn key(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A raw asset as supplied by a source provider.
///
/// Dimensions are signed so that a provider reporting nonsense (zero or
/// negative sizes) still deserializes; such descriptors are rejected by
/// [`AssetDescriptor::checked_dimensions`] instead of aborting a whole scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_video_duration"))]
pub struct AssetDescriptor {
    pub id: AssetId,
    pub kind: MediaKind,
    #[validate(range(min = 1, message = "width_px must be greater than 0"))]
    pub width_px: i64,
    #[validate(range(min = 1, message = "height_px must be greater than 0"))]
    pub height_px: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl AssetDescriptor {
    pub fn image(id: impl Into<AssetId>, width_px: i64, height_px: i64) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Image,
            width_px,
            height_px,
            duration_seconds: None,
        }
    }

    pub fn video(id: impl Into<AssetId>, width_px: i64, height_px: i64, duration: f64) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Video,
            width_px,
            height_px,
            duration_seconds: Some(duration),
        }
    }

    /// Validate the descriptor and return its pixel size.
    pub fn checked_dimensions(&self) -> Result<Dimensions, CoreError> {
        self.validate().map_err(|e| {
            CoreError::InvalidAsset(format!("asset '{}': {}", self.id, e).replace('\n', "; "))
        })?;
        let width = u32::try_from(self.width_px).map_err(|_| {
            CoreError::InvalidAsset(format!("asset '{}': width_px out of range", self.id))
        })?;
        let height = u32::try_from(self.height_px).map_err(|_| {
            CoreError::InvalidAsset(format!("asset '{}': height_px out of range", self.id))
        })?;
        Ok(Dimensions::new(width, height))
    }
}

fn validate_video_duration(asset: &AssetDescriptor) -> Result<(), ValidationError> {
    if asset.kind != MediaKind::Video {
        return Ok(());
    }
    match asset.duration_seconds {
        Some(d) if d.is_finite() && d >= 0.0 => Ok(()),
        Some(_) => Err(ValidationError::new("duration_seconds")
            .with_message("video duration_seconds must be a non-negative number".into())),
        None => Err(ValidationError::new("duration_seconds")
            .with_message("video assets require duration_seconds".into())),
    }
}

/// A previously generated alternate version of a source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeAsset {
    pub id: String,
    pub width_px: u32,
    pub height_px: u32,
    /// Media kind of the derivative, when the generation service recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    /// Channel the derivative was requested for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_channel: Option<String>,
}

impl DerivativeAsset {
    pub fn new(id: impl Into<String>, width_px: u32, height_px: u32) -> Self {
        Self {
            id: id.into(),
            width_px,
            height_px,
            kind: None,
            target_channel: None,
        }
    }

    pub fn for_channel(mut self, channel: impl Into<String>) -> Self {
        self.target_channel = Some(channel.into());
        self
    }

    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width_px, self.height_px)
    }
}
