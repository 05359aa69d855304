//! # BlendX
//!
//! Recommends which tracks of a DJ library blend well with a given track.
//!
//! Candidates are found by acoustic similarity (nearest neighbours over
//! standardized energy and timbral features) and then ranked by a blending
//! score that penalizes harmonic clashes on the Camelot wheel and large tempo
//! jumps.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! blendx --data-dir ./data --music-dir ./music --extractor ./extract.sh serve --port 8000
//! curl -X POST localhost:8000/train
//! curl localhost:8000/recommend/intro.mp3?top_n=5
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use blendx::prelude::*;
//!
//! let config = BlendConfig::new("./data", "./music");
//! let manager = ModelManager::new(config).unwrap();
//!
//! // fit on the feature table already on disk
//! manager.train(false).unwrap();
//!
//! for rec in manager.recommend("intro.mp3", Some(5)).unwrap() {
//!     println!("{} {} {:.4}", rec.filename, rec.camelot, rec.score);
//! }
//! ```
//!
//! ## Crate Structure
//!
//! - `blendx-core` - Camelot mapping, blending penalties, feature table, scaler, k-NN index, model bundle
//! - `blendx-storage` - Feature table CSV, versioned bundle store, model manager
//! - `blendx-api` - REST API

// Re-export core types
pub use blendx_core::{
    bpm_penalty, camelot_distance, compute_blending_score, to_camelot,
    BlendConfig, CamelotCode, CommandExtractor, ExtractorConfig, FeatureExtractor,
    FeatureSchema, FeatureTable, IndexParams, ModelBundle, Recommendation, TrackFeatures,
    Error, Result,
};

// Re-export storage
pub use blendx_storage::{BundleStore, ModelManager};

// Re-export API
pub use blendx_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        bpm_penalty, camelot_distance, compute_blending_score, to_camelot,
        BlendConfig, CamelotCode, FeatureExtractor, FeatureSchema, FeatureTable,
        ModelBundle, Recommendation, TrackFeatures,
        Error, Result,
        ModelManager,
        RestApi,
    };
}
