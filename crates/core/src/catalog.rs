//! Advertising channel specs and the catalog that holds them.
//!
//! A catalog is configuration data: an explicitly constructed, immutable,
//! ordered list of [`ChannelSpec`]s passed into every engine call. The
//! built-in table is available through [`default_catalog`]; collaborators
//! may load additional definitions from JSON at startup and extend or
//! replace it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ratio::{AspectRatio, COARSE_TOLERANCE, STRICT_TOLERANCE};
use crate::types::{Dimensions, MediaKind};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which media kinds a channel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptedMedia {
    Image,
    Video,
    Both,
}

impl AcceptedMedia {
    pub fn accepts(self, kind: MediaKind) -> bool {
        match self {
            Self::Both => true,
            Self::Image => kind == MediaKind::Image,
            Self::Video => kind == MediaKind::Video,
        }
    }
}

/// How loosely a ratio-based channel compares aspect ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceClass {
    /// 5%, for placements with published exact ratios.
    #[default]
    Strict,
    /// 10%, for informal buckets such as "square" or "vertical".
    Coarse,
}

impl ToleranceClass {
    pub fn fraction(self) -> f64 {
        match self {
            Self::Strict => STRICT_TOLERANCE,
            Self::Coarse => COARSE_TOLERANCE,
        }
    }
}

/// The single sizing rule of a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum SizingRule {
    AspectRatios {
        ratios: Vec<AspectRatio>,
        tolerance: ToleranceClass,
    },
    ExactSize {
        size: Dimensions,
    },
}

// ---------------------------------------------------------------------------
// ChannelSpec
// ---------------------------------------------------------------------------

/// One named advertising placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSpec {
    pub channel_name: String,
    pub media: AcceptedMedia,
    pub sizing: SizingRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<f64>,
    /// Grouping label for reporting only; never consulted when matching.
    pub platform_group: String,
}

impl ChannelSpec {
    /// A ratio-based channel with no duration bounds.
    pub fn ratio_based(
        channel_name: impl Into<String>,
        platform_group: impl Into<String>,
        media: AcceptedMedia,
        ratios: Vec<AspectRatio>,
        tolerance: ToleranceClass,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            media,
            sizing: SizingRule::AspectRatios { ratios, tolerance },
            min_duration_seconds: None,
            max_duration_seconds: None,
            platform_group: platform_group.into(),
        }
    }

    /// A pixel-exact channel.
    pub fn exact_size(
        channel_name: impl Into<String>,
        platform_group: impl Into<String>,
        media: AcceptedMedia,
        size: Dimensions,
    ) -> Self {
        Self {
            channel_name: channel_name.into(),
            media,
            sizing: SizingRule::ExactSize { size },
            min_duration_seconds: None,
            max_duration_seconds: None,
            platform_group: platform_group.into(),
        }
    }

    pub fn with_duration(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_duration_seconds = min;
        self.max_duration_seconds = max;
        self
    }

    pub fn exact(&self) -> Option<Dimensions> {
        match self.sizing {
            SizingRule::ExactSize { size } => Some(size),
            SizingRule::AspectRatios { .. } => None,
        }
    }

    /// Check the spec for authoring errors.
    pub fn validate(&self) -> Result<(), CoreError> {
        let name = &self.channel_name;
        if name.trim().is_empty() {
            return Err(CoreError::Configuration(
                "Channel name must not be empty".to_string(),
            ));
        }
        match &self.sizing {
            SizingRule::AspectRatios { ratios, .. } if ratios.is_empty() => {
                return Err(CoreError::Configuration(format!(
                    "Channel '{name}' declares neither accepted aspect ratios nor an exact size"
                )));
            }
            SizingRule::ExactSize { size } if size.is_empty() => {
                return Err(CoreError::Configuration(format!(
                    "Channel '{name}' has a zero-sized exact size ({size})"
                )));
            }
            _ => {}
        }

        for bound in [self.min_duration_seconds, self.max_duration_seconds]
            .into_iter()
            .flatten()
        {
            if !bound.is_finite() || bound < 0.0 {
                return Err(CoreError::Configuration(format!(
                    "Channel '{name}' has an invalid duration bound ({bound})"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_duration_seconds, self.max_duration_seconds) {
            if min > max {
                return Err(CoreError::Configuration(format!(
                    "Channel '{name}' has min duration {min}s greater than max duration {max}s"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChannelSpecDefinition (authoring shape)
// ---------------------------------------------------------------------------

/// The loose, serde-facing shape specs are authored in.
///
/// Exactly one of `accepted_aspect_ratios` and `exact_size` must be set;
/// conversion into [`ChannelSpec`] enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpecDefinition {
    pub channel_name: String,
    pub media: AcceptedMedia,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_aspect_ratios: Option<Vec<AspectRatio>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_size: Option<Dimensions>,
    #[serde(default)]
    pub tolerance: ToleranceClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<f64>,
    pub platform_group: String,
}

impl TryFrom<ChannelSpecDefinition> for ChannelSpec {
    type Error = CoreError;

    fn try_from(def: ChannelSpecDefinition) -> Result<Self, Self::Error> {
        let sizing = match (def.accepted_aspect_ratios, def.exact_size) {
            (Some(ratios), None) => SizingRule::AspectRatios {
                ratios,
                tolerance: def.tolerance,
            },
            (None, Some(size)) => SizingRule::ExactSize { size },
            (Some(_), Some(_)) => {
                return Err(CoreError::Configuration(format!(
                    "Channel '{}' declares both accepted aspect ratios and an exact size",
                    def.channel_name
                )));
            }
            (None, None) => {
                return Err(CoreError::Configuration(format!(
                    "Channel '{}' declares neither accepted aspect ratios nor an exact size",
                    def.channel_name
                )));
            }
        };
        let spec = ChannelSpec {
            channel_name: def.channel_name,
            media: def.media,
            sizing,
            min_duration_seconds: def.min_duration_seconds,
            max_duration_seconds: def.max_duration_seconds,
            platform_group: def.platform_group,
        };
        spec.validate()?;
        Ok(spec)
    }
}

// ---------------------------------------------------------------------------
// ChannelSpecCatalog
// ---------------------------------------------------------------------------

/// An ordered, validated list of channel specs with unique names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelSpecCatalog {
    specs: Vec<ChannelSpec>,
}

impl ChannelSpecCatalog {
    /// Validate every spec and reject duplicate channel names.
    pub fn new(specs: Vec<ChannelSpec>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for spec in &specs {
            spec.validate()?;
            if !seen.insert(spec.channel_name.as_str()) {
                return Err(CoreError::Configuration(format!(
                    "Duplicate channel name '{}' in catalog",
                    spec.channel_name
                )));
            }
        }
        Ok(Self { specs })
    }

    pub fn from_definitions(defs: Vec<ChannelSpecDefinition>) -> Result<Self, CoreError> {
        let specs = defs
            .into_iter()
            .map(ChannelSpec::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    /// Parse a JSON array of [`ChannelSpecDefinition`]s.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let defs: Vec<ChannelSpecDefinition> = serde_json::from_str(json)
            .map_err(|e| CoreError::Configuration(format!("Invalid catalog JSON: {e}")))?;
        Self::from_definitions(defs)
    }

    /// Append `other`'s specs after this catalog's. Names must stay unique.
    pub fn extend(self, other: ChannelSpecCatalog) -> Result<Self, CoreError> {
        let mut specs = self.specs;
        specs.extend(other.specs);
        Self::new(specs)
    }

    pub fn specs(&self) -> &[ChannelSpec] {
        &self.specs
    }

    pub fn get(&self, channel_name: &str) -> Option<&ChannelSpec> {
        self.specs.iter().find(|s| s.channel_name == channel_name)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.channel_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

pub const GROUP_META: &str = "Meta";
pub const GROUP_TIKTOK: &str = "TikTok";
pub const GROUP_YOUTUBE: &str = "YouTube";
pub const GROUP_LINKEDIN: &str = "LinkedIn";
pub const GROUP_X: &str = "X";
pub const GROUP_PINTEREST: &str = "Pinterest";
pub const GROUP_SNAPCHAT: &str = "Snapchat";
pub const GROUP_GOOGLE_DISPLAY: &str = "Google Display";

/// Row of the built-in table. Ratios are `w:h` literals.
struct BuiltinChannel {
    name: &'static str,
    group: &'static str,
    media: AcceptedMedia,
    ratios: &'static [&'static str],
    exact: Option<(u32, u32)>,
    tolerance: ToleranceClass,
    duration: (Option<f64>, Option<f64>),
}

const fn ratio_channel(
    name: &'static str,
    group: &'static str,
    media: AcceptedMedia,
    ratios: &'static [&'static str],
    tolerance: ToleranceClass,
    duration: (Option<f64>, Option<f64>),
) -> BuiltinChannel {
    BuiltinChannel {
        name,
        group,
        media,
        ratios,
        exact: None,
        tolerance,
        duration,
    }
}

const fn display_channel(
    name: &'static str,
    group: &'static str,
    w: u32,
    h: u32,
) -> BuiltinChannel {
    BuiltinChannel {
        name,
        group,
        media: AcceptedMedia::Image,
        ratios: &[],
        exact: Some((w, h)),
        tolerance: ToleranceClass::Strict,
        duration: (None, None),
    }
}

const NO_BOUNDS: (Option<f64>, Option<f64>) = (None, None);

#[rustfmt::skip]
const BUILTIN_CHANNELS: &[BuiltinChannel] = &[
    ratio_channel("Instagram Feed", GROUP_META, AcceptedMedia::Both, &["1:1", "4:5", "1.91:1"], ToleranceClass::Coarse, (None, Some(60.0))),
    ratio_channel("Instagram Story", GROUP_META, AcceptedMedia::Both, &["9:16"], ToleranceClass::Coarse, (None, Some(60.0))),
    ratio_channel("Instagram Reels", GROUP_META, AcceptedMedia::Video, &["9:16"], ToleranceClass::Coarse, (Some(3.0), Some(90.0))),
    ratio_channel("Facebook Feed", GROUP_META, AcceptedMedia::Both, &["1:1", "4:5", "1.91:1"], ToleranceClass::Coarse, (Some(1.0), Some(240.0))),
    ratio_channel("Facebook Story", GROUP_META, AcceptedMedia::Both, &["9:16"], ToleranceClass::Coarse, (None, Some(120.0))),
    ratio_channel("TikTok In-Feed", GROUP_TIKTOK, AcceptedMedia::Video, &["9:16"], ToleranceClass::Coarse, (Some(5.0), Some(60.0))),
    ratio_channel("YouTube Shorts", GROUP_YOUTUBE, AcceptedMedia::Video, &["9:16"], ToleranceClass::Coarse, (None, Some(60.0))),
    ratio_channel("YouTube In-Stream", GROUP_YOUTUBE, AcceptedMedia::Video, &["16:9"], ToleranceClass::Strict, (Some(12.0), None)),
    ratio_channel("LinkedIn Feed", GROUP_LINKEDIN, AcceptedMedia::Both, &["1.91:1", "1:1"], ToleranceClass::Strict, (Some(3.0), Some(1800.0))),
    ratio_channel("X Feed", GROUP_X, AcceptedMedia::Both, &["16:9", "1:1"], ToleranceClass::Coarse, (Some(0.5), Some(140.0))),
    ratio_channel("Pinterest Standard Pin", GROUP_PINTEREST, AcceptedMedia::Image, &["2:3"], ToleranceClass::Strict, NO_BOUNDS),
    ratio_channel("Snapchat Snap Ad", GROUP_SNAPCHAT, AcceptedMedia::Video, &["9:16"], ToleranceClass::Coarse, (Some(3.0), Some(180.0))),
    display_channel("LinkedIn Sponsored Content", GROUP_LINKEDIN, 1200, 627),
    display_channel("Medium Rectangle", GROUP_GOOGLE_DISPLAY, 300, 250),
    display_channel("Leaderboard", GROUP_GOOGLE_DISPLAY, 728, 90),
    display_channel("Wide Skyscraper", GROUP_GOOGLE_DISPLAY, 160, 600),
    display_channel("Half Page", GROUP_GOOGLE_DISPLAY, 300, 600),
    display_channel("Billboard", GROUP_GOOGLE_DISPLAY, 970, 250),
    display_channel("Mobile Banner", GROUP_GOOGLE_DISPLAY, 320, 50),
];

/// The built-in channel catalog.
pub fn default_catalog() -> Result<ChannelSpecCatalog, CoreError> {
    let specs = BUILTIN_CHANNELS
        .iter()
        .map(|row| -> Result<ChannelSpec, CoreError> {
            let spec = match row.exact {
                Some((w, h)) => {
                    ChannelSpec::exact_size(row.name, row.group, row.media, Dimensions::new(w, h))
                }
                None => {
                    let ratios = row
                        .ratios
                        .iter()
                        .map(|r| r.parse())
                        .collect::<Result<Vec<AspectRatio>, _>>()?;
                    ChannelSpec::ratio_based(row.name, row.group, row.media, ratios, row.tolerance)
                }
            };
            Ok(spec.with_duration(row.duration.0, row.duration.1))
        })
        .collect::<Result<Vec<_>, _>>()?;
    ChannelSpecCatalog::new(specs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
