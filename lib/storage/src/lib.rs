//! # BlendX Storage
//!
//! On-disk state of the recommender: the extracted feature table (CSV), the
//! versioned model bundle, and [`ModelManager`], which ties both to the
//! bundle currently in service.

pub mod feature_csv;
pub mod manager;
pub mod store;

pub use feature_csv::{read_feature_table, write_feature_table};
pub use manager::{BuildSummary, ModelManager, TrainSummary};
pub use store::{ArtifactEntry, ArtifactKind, BundleManifest, BundleStore, BUNDLE_FORMAT_VERSION};
