//! Batch feature extraction
//!
//! Audio decoding and signal analysis live outside this crate behind the
//! [`FeatureExtractor`] trait. This module walks the music directory, runs the
//! extractor per file with retries, and isolates failures so that one bad
//! track never aborts the batch.

use crate::table::{FeatureSchema, FeatureTable, TrackFeatures};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// File extensions picked up from the music directory (compared case-insensitively)
pub const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "flac"];

/// Produces one feature row for an audio file
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<TrackFeatures>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub file: String,
    pub reason: String,
}

/// Outcome of a batch extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub extracted: usize,
    pub failures: Vec<ExtractionFailure>,
}

/// Audio files directly inside `dir`, sorted by file name
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Data(format!(
            "music directory {} does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_audio_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run the extractor on one file, retrying up to `attempts` times
pub fn extract_with_retry(
    extractor: &dyn FeatureExtractor,
    path: &Path,
    attempts: u32,
) -> Result<TrackFeatures> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match extractor.extract(path) {
            Ok(features) => return Ok(features),
            Err(e) if attempt < attempts => {
                warn!(file = %path.display(), attempt, error = %e, "extraction failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Extract every audio file in `music_dir` into a feature table.
///
/// The first successfully extracted track fixes the number of timbral
/// coefficients; later tracks that disagree are reported as failures.
/// Fails with [`Error::Data`] when the directory holds no audio files or no
/// track could be extracted.
pub fn build_feature_table(
    music_dir: &Path,
    extractor: &dyn FeatureExtractor,
    attempts: u32,
) -> Result<(FeatureTable, ExtractionReport)> {
    let files = list_audio_files(music_dir)?;
    if files.is_empty() {
        return Err(Error::Data(format!(
            "no audio files in {}",
            music_dir.display()
        )));
    }

    let mut schema: Option<FeatureSchema> = None;
    let mut rows = Vec::with_capacity(files.len());
    let mut report = ExtractionReport::default();

    for path in &files {
        let result = extract_with_retry(extractor, path, attempts).and_then(|features| {
            let expected = schema
                .clone()
                .unwrap_or_else(|| FeatureSchema::with_mfcc(features.mfcc.len()));
            features.validate(&expected)?;
            schema.get_or_insert(expected);
            Ok(features)
        });

        match result {
            Ok(features) => {
                info!(file = %features.filename, "track processed");
                rows.push(features);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "track skipped");
                report.failures.push(ExtractionFailure {
                    file: display_name(path),
                    reason: e.to_string(),
                });
            }
        }
    }

    let Some(schema) = schema else {
        return Err(Error::Data(format!(
            "none of the {} audio files in {} could be extracted",
            files.len(),
            music_dir.display()
        )));
    };

    report.extracted = rows.len();
    let table = FeatureTable::new(schema, rows)?;
    Ok((table, report))
}

/// JSON printed by an external extraction program
#[derive(Debug, Deserialize)]
struct ExtractorOutput {
    bpm: f64,
    energy: f64,
    key: String,
    /// When present, `key` holds only the tonic
    #[serde(default)]
    scale: Option<String>,
    mfcc: Vec<f64>,
}

/// Runs an external program per audio file.
///
/// The program is invoked as `<program> <args...> <path>` and must print a
/// JSON object with `bpm`, `energy`, `key` and `mfcc` on stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new<P: Into<PathBuf>>(program: P, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl FeatureExtractor for CommandExtractor {
    fn extract(&self, path: &Path) -> Result<TrackFeatures> {
        let file = display_name(path);
        let fail = |reason: String| Error::Extraction {
            file: file.clone(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| fail(format!("cannot run {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!("{} ({})", output.status, stderr.trim())));
        }

        let parsed: ExtractorOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| fail(format!("invalid extractor output: {}", e)))?;

        let key = match parsed.scale {
            Some(scale) => format!("{}_{}", parsed.key, scale),
            None => parsed.key,
        };

        Ok(TrackFeatures {
            filename: file.clone(),
            bpm: parsed.bpm,
            key,
            energy: parsed.energy,
            mfcc: parsed.mfcc,
        })
    }
}
