//! # BlendX Core
//!
//! Core library for the BlendX track blending recommender.
//!
//! This crate provides the scoring model and its data structures:
//!
//! - [`to_camelot`] - maps a detected key onto the Camelot wheel
//! - [`camelot_distance`], [`bpm_penalty`], [`compute_blending_score`] - blending penalties
//! - [`FeatureTable`] - one feature row per track, with an explicit [`FeatureSchema`]
//! - [`StandardScaler`] and [`NeighborIndex`] - normalization and exact k-NN search
//! - [`ModelBundle`] - the fitted model that answers recommendation queries
//!
//! ## Example
//!
//! ```rust
//! use blendx_core::{FeatureSchema, FeatureTable, IndexParams, ModelBundle, TrackFeatures};
//!
//! let track = |name: &str, bpm: f64, key: &str, energy: f64| TrackFeatures {
//!     filename: name.to_string(),
//!     bpm,
//!     key: key.to_string(),
//!     energy,
//!     mfcc: vec![energy * 10.0, 1.0],
//! };
//! let table = FeatureTable::new(
//!     FeatureSchema::with_mfcc(2),
//!     vec![
//!         track("intro.mp3", 120.0, "C_major", 0.20),
//!         track("peak.mp3", 121.0, "G_major", 0.25),
//!         track("outro.mp3", 180.0, "A_minor", 0.90),
//!     ],
//! )
//! .unwrap();
//!
//! let bundle = ModelBundle::fit(table, &IndexParams::default()).unwrap();
//! let recs = bundle.recommend("intro.mp3", 5).unwrap();
//! assert_eq!(recs.len(), 2);
//! ```

pub mod bundle;
pub mod camelot;
pub mod config;
pub mod error;
pub mod extract;
pub mod knn;
pub mod penalty;
pub mod scaler;
pub mod table;
pub mod vector;

pub use bundle::{IndexParams, ModelBundle, Recommendation, DEFAULT_K_NEIGHBORS_CAP, DEFAULT_TOP_N};
pub use camelot::{to_camelot, CamelotCode, Mode};
pub use config::{BlendConfig, ExtractorConfig};
pub use error::{Error, Result};
pub use extract::{
    build_feature_table, CommandExtractor, ExtractionFailure, ExtractionReport, FeatureExtractor,
};
pub use knn::{Neighbor, NeighborIndex};
pub use penalty::{bpm_penalty, camelot_distance, compute_blending_score};
pub use scaler::StandardScaler;
pub use table::{FeatureSchema, FeatureTable, TrackFeatures};
pub use vector::Vector;
