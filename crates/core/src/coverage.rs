//! Coverage of channels by previously generated derivatives.
//!
//! [`CoverageIndex`] is a read-only snapshot built from the derivatives the
//! caller already holds for one source asset. It answers a single question:
//! does some existing derivative already satisfy this channel?

use std::collections::{HashMap, HashSet};

use crate::catalog::{ChannelSpec, SizingRule};
use crate::ratio::ratios_match;
use crate::types::{DerivativeAsset, Dimensions, MediaKind};

/// Shape of one derivative as seen by ratio and size matching.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DerivativeShape {
    ratio: f64,
    kind: Option<MediaKind>,
}

/// Channels, exact sizes, and ratios already satisfied for a source asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageIndex {
    channels: HashSet<String>,
    /// `"WxH"` key -> media kinds seen at that size (`None` = unknown kind).
    sizes: HashMap<String, Vec<Option<MediaKind>>>,
    shapes: Vec<DerivativeShape>,
}

impl CoverageIndex {
    /// An index with no derivatives.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index a set of derivatives.
    ///
    /// Zero-sized derivatives only contribute their channel tag.
    pub fn build(derivatives: &[DerivativeAsset]) -> Self {
        let mut index = Self::default();
        for derivative in derivatives {
            if let Some(channel) = &derivative.target_channel {
                index.channels.insert(channel.clone());
            }
            let dims = derivative.dimensions();
            if dims.is_empty() {
                continue;
            }
            index
                .sizes
                .entry(dims.key())
                .or_default()
                .push(derivative.kind);
            index.shapes.push(DerivativeShape {
                ratio: dims.ratio(),
                kind: derivative.kind,
            });
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.shapes.is_empty()
    }

    pub fn has_channel(&self, channel_name: &str) -> bool {
        self.channels.contains(channel_name)
    }

    pub fn has_size(&self, size: Dimensions) -> bool {
        self.sizes.contains_key(&size.key())
    }

    /// Whether any derivative satisfies `spec`.
    ///
    /// A derivative covers a channel when it names the channel, when its
    /// pixel size equals the channel's exact size, or when its ratio is
    /// within the channel's tolerance of an accepted ratio. Incidental size
    /// and ratio matches are skipped for derivatives whose recorded media
    /// kind the channel does not accept.
    pub fn covers(&self, spec: &ChannelSpec) -> bool {
        if self.has_channel(&spec.channel_name) {
            return true;
        }
        let kind_ok = |kind: &Option<MediaKind>| kind.map_or(true, |k| spec.media.accepts(k));
        match &spec.sizing {
            SizingRule::ExactSize { size } => self
                .sizes
                .get(&size.key())
                .is_some_and(|kinds| kinds.iter().any(kind_ok)),
            SizingRule::AspectRatios { ratios, tolerance } => self.shapes.iter().any(|shape| {
                kind_ok(&shape.kind) && ratios_match(shape.ratio, ratios, tolerance.fraction())
            }),
        }
    }
}
