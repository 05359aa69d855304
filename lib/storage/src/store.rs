// Model bundle persistence: three versioned artifacts plus a manifest
use anyhow::{anyhow, bail, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use blendx_core::{FeatureSchema, FeatureTable, ModelBundle, NeighborIndex, StandardScaler, TrackFeatures};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Layout version of the manifest itself
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const GENERATIONS_DIR: &str = "generations";
const LOAD_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Table,
    Scaler,
    Index,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Table, ArtifactKind::Scaler, ArtifactKind::Index];

    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Table => "table.bin",
            ArtifactKind::Scaler => "scaler.bin",
            ArtifactKind::Index => "index.bin",
        }
    }

    /// Encoding version written for this artifact
    pub fn version(self) -> u32 {
        match self {
            ArtifactKind::Table => 1,
            ArtifactKind::Scaler => 1,
            ArtifactKind::Index => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub kind: ArtifactKind,
    pub file: String,
    pub version: u32,
    pub size: u64,
    pub sha256: String,
}

/// Describes the bundle currently in service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub format_version: u32,
    pub bundle_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub schema: FeatureSchema,
    pub rows: usize,
    pub artifacts: Vec<ArtifactEntry>,
}

impl BundleManifest {
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ArtifactEntry> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }
}

#[derive(Serialize)]
struct TableDataRef<'a> {
    schema: &'a FeatureSchema,
    rows: &'a [TrackFeatures],
}

#[derive(Deserialize)]
struct TableData {
    schema: FeatureSchema,
    rows: Vec<TrackFeatures>,
}

/// Persists model bundles under one directory.
///
/// Each save writes a new generation directory and then atomically replaces
/// `manifest.json` to point at it, so readers see either the old or the new
/// bundle, never a mix. The previous generation is kept for readers that
/// resolved the old manifest; older ones are pruned.
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(GENERATIONS_DIR))?;
        Ok(Self { root })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn generation_dir(&self, bundle_id: Uuid) -> PathBuf {
        self.root.join(GENERATIONS_DIR).join(bundle_id.to_string())
    }

    /// The current manifest, or `None` when nothing has been saved yet
    pub fn read_manifest(&self) -> Result<Option<BundleManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)?;
        let manifest: BundleManifest = serde_json::from_slice(&data)
            .with_context(|| format!("invalid manifest {}", path.display()))?;

        if manifest.format_version != BUNDLE_FORMAT_VERSION {
            bail!(
                "unsupported bundle format version {} (expected {})",
                manifest.format_version,
                BUNDLE_FORMAT_VERSION
            );
        }
        Ok(Some(manifest))
    }

    /// Persist `bundle` as a new generation and make it current
    pub fn save(&self, bundle: &ModelBundle) -> Result<BundleManifest> {
        let previous = self.read_manifest().ok().flatten().map(|m| m.bundle_id);

        let bundle_id = Uuid::new_v4();
        let dir = self.generation_dir(bundle_id);
        fs::create_dir_all(&dir)?;

        let table = bundle.table();
        let artifacts = vec![
            self.write_artifact(
                &dir,
                ArtifactKind::Table,
                &TableDataRef {
                    schema: table.schema(),
                    rows: table.rows(),
                },
            )?,
            self.write_artifact(&dir, ArtifactKind::Scaler, bundle.scaler())?,
            self.write_artifact(&dir, ArtifactKind::Index, bundle.index())?,
        ];

        let manifest = BundleManifest {
            format_version: BUNDLE_FORMAT_VERSION,
            bundle_id,
            created_at: Utc::now(),
            schema: table.schema().clone(),
            rows: table.len(),
            artifacts,
        };

        let json = serde_json::to_vec_pretty(&manifest)?;
        AtomicFile::new(self.manifest_path(), OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&json))
            .map_err(|e| anyhow!("failed to write manifest: {}", e))?;

        info!(%bundle_id, rows = manifest.rows, path = %self.root.display(), "bundle saved");

        let keep: Vec<Uuid> = std::iter::once(bundle_id).chain(previous).collect();
        self.prune(&keep);

        Ok(manifest)
    }

    fn write_artifact<T: Serialize + ?Sized>(
        &self,
        dir: &Path,
        kind: ArtifactKind,
        value: &T,
    ) -> Result<ArtifactEntry> {
        let data = bincode::serialize(value)
            .map_err(|e| anyhow!("Serialization error: {}", e))?;
        let path = dir.join(kind.file_name());

        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&data))
            .map_err(|e| anyhow!("failed to write {}: {}", path.display(), e))?;

        debug!(artifact = kind.file_name(), bytes = data.len(), "artifact written");

        Ok(ArtifactEntry {
            kind,
            file: kind.file_name().to_string(),
            version: kind.version(),
            size: data.len() as u64,
            sha256: format!("{:x}", Sha256::digest(&data)),
        })
    }

    fn read_artifact<T: DeserializeOwned>(&self, manifest: &BundleManifest, kind: ArtifactKind) -> Result<T> {
        let entry = manifest
            .artifact(kind)
            .ok_or_else(|| anyhow!("manifest has no {:?} artifact", kind))?;

        if entry.version != kind.version() {
            bail!(
                "unsupported {:?} artifact version {} (expected {})",
                kind,
                entry.version,
                kind.version()
            );
        }

        let path = self.generation_dir(manifest.bundle_id).join(&entry.file);
        let data = fs::read(&path).with_context(|| format!("cannot read {}", path.display()))?;

        let checksum = format!("{:x}", Sha256::digest(&data));
        if checksum != entry.sha256 {
            bail!(
                "Checksum mismatch for {}: expected {}, got {}",
                path.display(),
                entry.sha256,
                checksum
            );
        }

        bincode::deserialize(&data).map_err(|e| anyhow!("Deserialization error: {}", e))
    }

    pub fn load_table(&self, manifest: &BundleManifest) -> Result<FeatureTable> {
        let data: TableData = self.read_artifact(manifest, ArtifactKind::Table)?;
        if data.schema != manifest.schema {
            bail!("table schema does not match the manifest");
        }
        Ok(FeatureTable::new(data.schema, data.rows)?)
    }

    pub fn load_scaler(&self, manifest: &BundleManifest) -> Result<StandardScaler> {
        let scaler: StandardScaler = self.read_artifact(manifest, ArtifactKind::Scaler)?;
        Ok(StandardScaler::from_parts(scaler.mean().to_vec(), scaler.scale().to_vec())?)
    }

    pub fn load_index(&self, manifest: &BundleManifest) -> Result<NeighborIndex> {
        let index: NeighborIndex = self.read_artifact(manifest, ArtifactKind::Index)?;
        if index.dim() != manifest.schema.width() {
            bail!(
                "index dimension {} does not match the {} feature columns",
                index.dim(),
                manifest.schema.width()
            );
        }
        if index.len() != manifest.rows {
            bail!(
                "index holds {} rows, manifest lists {}",
                index.len(),
                manifest.rows
            );
        }
        Ok(index)
    }

    /// Load the current bundle together with its manifest.
    ///
    /// A concurrent save can prune the generation a reader is part way
    /// through; the load is then restarted from the new manifest.
    pub fn load(&self) -> Result<Option<(BundleManifest, ModelBundle)>> {
        let mut attempt = 1;
        loop {
            let Some(manifest) = self.read_manifest()? else {
                return Ok(None);
            };

            match self.load_generation(&manifest) {
                Ok(bundle) => {
                    debug!(bundle_id = %manifest.bundle_id, "bundle loaded");
                    return Ok(Some((manifest, bundle)));
                }
                Err(e) if attempt < LOAD_ATTEMPTS && self.manifest_moved(&manifest) => {
                    debug!(bundle_id = %manifest.bundle_id, error = %e, "bundle replaced during load, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn load_generation(&self, manifest: &BundleManifest) -> Result<ModelBundle> {
        let table = self.load_table(manifest)?;
        let scaler = self.load_scaler(manifest)?;
        let index = self.load_index(manifest)?;
        Ok(ModelBundle::from_parts(table, scaler, index)?)
    }

    fn manifest_moved(&self, manifest: &BundleManifest) -> bool {
        matches!(
            self.read_manifest(),
            Ok(Some(current)) if current.bundle_id != manifest.bundle_id
        )
    }

    /// Remove generation directories not listed in `keep`
    fn prune(&self, keep: &[Uuid]) {
        let entries = match fs::read_dir(self.root.join(GENERATIONS_DIR)) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cannot list bundle generations");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let retained = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| Uuid::parse_str(n).ok())
                .map(|id| keep.contains(&id))
                .unwrap_or(false);
            if !retained && path.is_dir() {
                if let Err(e) = fs::remove_dir_all(&path) {
                    warn!(path = %path.display(), error = %e, "failed to prune bundle generation");
                }
            }
        }
    }
}
