//! Feature table CSV
//!
//! One header row (`filename,bpm,energy,key,mfcc_0,...`) followed by one row
//! per track. Columns are located by name on read, so their order on disk does
//! not matter, but the set must match the feature schema exactly.

use atomicwrites::{AtomicFile, OverwriteBehavior};
use blendx_core::table::{
    mfcc_column, BPM_COLUMN, ENERGY_COLUMN, FILENAME_COLUMN, KEY_COLUMN, MFCC_PREFIX,
};
use blendx_core::{Error, FeatureSchema, FeatureTable, Result, TrackFeatures};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Derived column that older tables may carry; ignored on read
const CAMELOT_COLUMN: &str = "camelot";

struct ColumnLayout {
    filename: usize,
    bpm: usize,
    key: usize,
    energy: usize,
    mfcc: Vec<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Error::Data(format!("feature table is missing column '{}'", name)))
        };

        for (pos, header) in headers.iter().enumerate() {
            if headers.iter().take(pos).any(|h| h == header) {
                return Err(Error::Data(format!(
                    "duplicate column '{}' in feature table",
                    header
                )));
            }
        }

        let mut mfcc: Vec<(usize, usize)> = Vec::new();
        for (pos, header) in headers.iter().enumerate() {
            match header {
                FILENAME_COLUMN | BPM_COLUMN | KEY_COLUMN | ENERGY_COLUMN | CAMELOT_COLUMN => {}
                h => {
                    let coeff = h
                        .strip_prefix(MFCC_PREFIX)
                        .and_then(|n| n.parse::<usize>().ok())
                        .ok_or_else(|| {
                            Error::Data(format!("unexpected column '{}' in feature table", h))
                        })?;
                    mfcc.push((coeff, pos));
                }
            }
        }
        mfcc.sort_unstable();
        for (expected, (coeff, _)) in mfcc.iter().enumerate() {
            if *coeff != expected {
                return Err(Error::Data(format!(
                    "feature table is missing column '{}'",
                    mfcc_column(expected)
                )));
            }
        }

        Ok(Self {
            filename: find(FILENAME_COLUMN)?,
            bpm: find(BPM_COLUMN)?,
            key: find(KEY_COLUMN)?,
            energy: find(ENERGY_COLUMN)?,
            mfcc: mfcc.into_iter().map(|(_, pos)| pos).collect(),
        })
    }

    fn parse_row(&self, line: usize, record: &csv::StringRecord) -> Result<TrackFeatures> {
        let field = |pos: usize| record.get(pos).unwrap_or("");
        let number = |pos: usize| {
            field(pos).trim().parse::<f64>().map_err(|_| {
                Error::Data(format!(
                    "line {}: invalid number '{}'",
                    line,
                    field(pos)
                ))
            })
        };

        Ok(TrackFeatures {
            filename: field(self.filename).to_string(),
            bpm: number(self.bpm)?,
            key: field(self.key).to_string(),
            energy: number(self.energy)?,
            mfcc: self
                .mfcc
                .iter()
                .map(|&pos| number(pos))
                .collect::<Result<Vec<f64>>>()?,
        })
    }
}

fn csv_error(e: csv::Error) -> Error {
    Error::Data(format!("malformed feature table: {}", e))
}

/// Load a feature table written by [`write_feature_table`] or an external extractor
pub fn read_feature_table(path: &Path) -> Result<FeatureTable> {
    if !path.exists() {
        return Err(Error::Data(format!(
            "feature table {} not found, build features first",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let layout = ColumnLayout::from_headers(reader.headers().map_err(csv_error)?)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        // header is line 1
        rows.push(layout.parse_row(i + 2, &record)?);
    }

    let schema = FeatureSchema::with_mfcc(layout.mfcc.len());
    FeatureTable::new(schema, rows)
}

/// Atomically replace the feature table at `path`
pub fn write_feature_table(path: &Path, table: &FeatureTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![
        FILENAME_COLUMN.to_string(),
        BPM_COLUMN.to_string(),
        ENERGY_COLUMN.to_string(),
        KEY_COLUMN.to_string(),
    ];
    header.extend((0..table.schema().mfcc_count()).map(mfcc_column));
    writer.write_record(&header).map_err(csv_error)?;

    for row in table.rows() {
        let mut record = vec![
            row.filename.clone(),
            row.bpm.to_string(),
            row.energy.to_string(),
            row.key.clone(),
        ];
        record.extend(row.mfcc.iter().map(|c| c.to_string()));
        writer.write_record(&record).map_err(csv_error)?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| Error::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(&data))
        .map_err(|e| Error::Persistence(e.to_string()))?;

    info!(path = %path.display(), rows = table.len(), "feature table written");
    Ok(())
}
