use crate::bundle::{IndexParams, DEFAULT_K_NEIGHBORS_CAP, DEFAULT_TOP_N};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const FEATURES_FILENAME: &str = "features.csv";
pub const BUNDLE_DIRNAME: &str = "model";
pub const DEFAULT_EXTRACTION_ATTEMPTS: u32 = 2;

/// External feature extraction program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub data_dir: PathBuf,
    /// Directory scanned for audio files when building features
    pub music_dir: PathBuf,
    pub feature_table_path: PathBuf,
    /// Directory holding the bundle manifest and its artifact generations
    pub bundle_path: PathBuf,
    pub k_neighbors_cap: usize,
    pub default_top_n: usize,
    /// Extraction attempts per track before it is reported as failed
    pub extraction_attempts: u32,
    pub extractor: Option<ExtractorConfig>,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self::new("/data", "/music")
    }
}

impl BlendConfig {
    /// Configuration with the feature table and bundle placed under `data_dir`
    pub fn new<D: AsRef<Path>, M: AsRef<Path>>(data_dir: D, music_dir: M) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            feature_table_path: data_dir.join(FEATURES_FILENAME),
            bundle_path: data_dir.join(BUNDLE_DIRNAME),
            data_dir,
            music_dir: music_dir.as_ref().to_path_buf(),
            k_neighbors_cap: DEFAULT_K_NEIGHBORS_CAP,
            default_top_n: DEFAULT_TOP_N,
            extraction_attempts: DEFAULT_EXTRACTION_ATTEMPTS,
            extractor: None,
        }
    }

    pub fn index_params(&self) -> IndexParams {
        IndexParams {
            k_neighbors_cap: self.k_neighbors_cap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_neighbors_cap == 0 {
            return Err(Error::InvalidConfig(
                "k_neighbors_cap must be at least 1".to_string(),
            ));
        }
        if self.extraction_attempts == 0 {
            return Err(Error::InvalidConfig(
                "extraction_attempts must be at least 1".to_string(),
            ));
        }
        if self.feature_table_path.as_os_str().is_empty() || self.bundle_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "feature table and bundle paths must be set".to_string(),
            ));
        }
        Ok(())
    }
}
