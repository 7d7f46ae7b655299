//! `adfit-core` -- channel eligibility engine.
//!
//! Decides, for each advertising channel in a catalog, whether a media
//! asset is usable as-is, usable after a crop/extend, or unusable, and rolls
//! those verdicts up per asset and per scan. Pure logic: no I/O, no async,
//! no shared mutable state.

pub mod catalog;
pub mod coverage;
pub mod eligibility;
pub mod error;
pub mod evaluator;
pub mod ratio;
pub mod report;
pub mod types;

pub use catalog::{default_catalog, ChannelSpec, ChannelSpecCatalog};
pub use coverage::CoverageIndex;
pub use eligibility::{analyze, AssetEligibility, Classification};
pub use error::CoreError;
pub use evaluator::{evaluate, ChannelVerdict};
pub use report::{report, BatchReport, DerivativesByAsset};
pub use types::{AssetDescriptor, DerivativeAsset, Dimensions, MediaKind};
