use crate::feature_csv::{read_feature_table, write_feature_table};
use crate::store::{BundleManifest, BundleStore};
use blendx_core::extract::build_feature_table;
use blendx_core::{
    BlendConfig, CommandExtractor, Error, ExtractionFailure, FeatureExtractor, ModelBundle,
    Recommendation, Result,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of a feature extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub count: usize,
    pub failures: Vec<ExtractionFailure>,
    pub path: PathBuf,
}

/// Result of a successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSummary {
    pub rows: usize,
    pub bundle_id: Uuid,
    /// Manifest of the bundle now in service
    pub model_path: PathBuf,
    /// Set when features were re-extracted before fitting
    pub build: Option<BuildSummary>,
}

struct Loaded {
    manifest: BundleManifest,
    bundle: Arc<ModelBundle>,
}

fn persistence(e: anyhow::Error) -> Error {
    Error::Persistence(format!("{:#}", e))
}

/// Owns the feature table and the model bundle on disk and the bundle in
/// service.
///
/// Queries take a snapshot of the current bundle and never block on
/// training. Training is serialised: only one build/fit/persist sequence runs
/// at a time, and the new bundle is swapped in only after it is on disk.
pub struct ModelManager {
    config: BlendConfig,
    store: BundleStore,
    extractor: Option<Arc<dyn FeatureExtractor>>,
    loaded: RwLock<Option<Loaded>>,
    train_lock: Mutex<()>,
}

impl ModelManager {
    pub fn new(config: BlendConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        let store = BundleStore::new(&config.bundle_path).map_err(persistence)?;
        let extractor = config.extractor.as_ref().map(|e| {
            Arc::new(CommandExtractor::new(e.program.clone(), e.args.clone()))
                as Arc<dyn FeatureExtractor>
        });

        let manager = Self {
            config,
            store,
            extractor,
            loaded: RwLock::new(None),
            train_lock: Mutex::new(()),
        };

        match manager.reload_locked() {
            Ok(true) => {}
            Ok(false) => info!("no trained model on disk, starting untrained"),
            // an unreadable bundle must not keep the service from starting
            Err(e) => warn!(error = %e, "ignoring persisted model"),
        }

        Ok(manager)
    }

    /// Replace the extractor used by [`build_features`](Self::build_features)
    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[inline]
    pub fn config(&self) -> &BlendConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.loaded.read().is_some()
    }

    /// Manifest of the bundle in service
    pub fn manifest(&self) -> Option<BundleManifest> {
        self.loaded.read().as_ref().map(|l| l.manifest.clone())
    }

    /// Snapshot of the bundle in service
    pub fn bundle(&self) -> Result<Arc<ModelBundle>> {
        self.loaded
            .read()
            .as_ref()
            .map(|l| Arc::clone(&l.bundle))
            .ok_or(Error::NotTrained)
    }

    /// Re-read the persisted bundle. Returns `false` when none exists.
    pub fn reload(&self) -> Result<bool> {
        let _guard = self.train_lock.lock();
        self.reload_locked()
    }

    fn reload_locked(&self) -> Result<bool> {
        let Some((manifest, bundle)) = self.store.load().map_err(persistence)? else {
            return Ok(false);
        };

        info!(
            bundle_id = %manifest.bundle_id,
            rows = manifest.rows,
            created_at = %manifest.created_at,
            "model loaded"
        );
        *self.loaded.write() = Some(Loaded {
            manifest,
            bundle: Arc::new(bundle),
        });
        Ok(true)
    }

    /// Extract features from the music directory and rewrite the feature table
    pub fn build_features(&self) -> Result<BuildSummary> {
        let _guard = self.train_lock.lock();
        self.build_features_locked()
    }

    fn build_features_locked(&self) -> Result<BuildSummary> {
        let extractor = self.extractor.as_ref().ok_or_else(|| {
            Error::InvalidConfig("no feature extractor configured".to_string())
        })?;

        let (table, report) = build_feature_table(
            &self.config.music_dir,
            extractor.as_ref(),
            self.config.extraction_attempts,
        )?;
        write_feature_table(&self.config.feature_table_path, &table)?;

        info!(
            count = report.extracted,
            failed = report.failures.len(),
            path = %self.config.feature_table_path.display(),
            "features built"
        );

        Ok(BuildSummary {
            count: report.extracted,
            failures: report.failures,
            path: self.config.feature_table_path.clone(),
        })
    }

    /// Fit a fresh bundle on the feature table, persist it and put it in service
    pub fn train(&self, rebuild_features: bool) -> Result<TrainSummary> {
        let _guard = self.train_lock.lock();

        let build = if rebuild_features {
            Some(self.build_features_locked()?)
        } else {
            None
        };

        let table = read_feature_table(&self.config.feature_table_path)?;
        let bundle = ModelBundle::fit(table, &self.config.index_params())?;
        let manifest = self.store.save(&bundle).map_err(persistence)?;

        let summary = TrainSummary {
            rows: manifest.rows,
            bundle_id: manifest.bundle_id,
            model_path: self.store.manifest_path(),
            build,
        };

        *self.loaded.write() = Some(Loaded {
            manifest,
            bundle: Arc::new(bundle),
        });

        info!(rows = summary.rows, bundle_id = %summary.bundle_id, "model trained");
        Ok(summary)
    }

    /// Recommendations for `filename`; `top_n` defaults to the configured count
    pub fn recommend(&self, filename: &str, top_n: Option<usize>) -> Result<Vec<Recommendation>> {
        let bundle = self.bundle()?;
        bundle.recommend(filename, top_n.unwrap_or(self.config.default_top_n))
    }
}
