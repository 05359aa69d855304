//! Feature table
//!
//! One row per track as produced by feature extraction, plus the explicit
//! ordered feature schema that the scaler and the neighbour index are fit on.

use crate::camelot::{to_camelot, CamelotCode};
use crate::vector::Vector;
use crate::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub const FILENAME_COLUMN: &str = "filename";
pub const BPM_COLUMN: &str = "bpm";
pub const KEY_COLUMN: &str = "key";
pub const ENERGY_COLUMN: &str = "energy";
pub const MFCC_PREFIX: &str = "mfcc_";

/// Name of the `i`-th timbral coefficient column
pub fn mfcc_column(i: usize) -> String {
    format!("{}{}", MFCC_PREFIX, i)
}

/// Ordered feature columns used for distance computation.
///
/// Identifier and label columns (filename, key, camelot, bpm) are never part
/// of the schema; the feature columns are always `energy` followed by
/// `mfcc_0 .. mfcc_{N-1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = Error;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Self::from_columns(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

impl FeatureSchema {
    /// Schema with energy and `mfcc_count` timbral coefficients
    pub fn with_mfcc(mfcc_count: usize) -> Self {
        let mut columns = Vec::with_capacity(mfcc_count + 1);
        columns.push(ENERGY_COLUMN.to_string());
        columns.extend((0..mfcc_count).map(mfcc_column));
        Self { columns }
    }

    /// Validate a column list read back from disk
    pub fn from_columns(columns: Vec<String>) -> Result<Self> {
        let Some(mfcc_count) = columns.len().checked_sub(1) else {
            return Err(Error::Data("feature schema has no columns".to_string()));
        };
        let expected = Self::with_mfcc(mfcc_count);
        if expected.columns != columns {
            return Err(Error::Data(format!(
                "unexpected feature columns {:?}, expected {:?}",
                columns, expected.columns
            )));
        }
        Ok(expected)
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of feature columns (energy + coefficients)
    #[inline]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn mfcc_count(&self) -> usize {
        self.columns.len() - 1
    }
}

/// Features of a single track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFeatures {
    pub filename: String,
    pub bpm: f64,
    /// Detected key as `<tonic>_<major|minor>`
    pub key: String,
    pub energy: f64,
    /// Mean timbral coefficients
    pub mfcc: Vec<f64>,
}

impl TrackFeatures {
    /// Feature values in schema order
    pub fn feature_vector(&self) -> Vector {
        let mut data = Vec::with_capacity(self.mfcc.len() + 1);
        data.push(self.energy);
        data.extend_from_slice(&self.mfcc);
        Vector::new(data)
    }

    pub(crate) fn validate(&self, schema: &FeatureSchema) -> Result<()> {
        if self.filename.is_empty() {
            return Err(Error::Data("track with empty filename".to_string()));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(Error::Data(format!(
                "track '{}' has invalid bpm {}",
                self.filename, self.bpm
            )));
        }
        if self.mfcc.len() != schema.mfcc_count() {
            return Err(Error::Data(format!(
                "track '{}' has {} timbral coefficients, expected {}",
                self.filename,
                self.mfcc.len(),
                schema.mfcc_count()
            )));
        }
        if !self.energy.is_finite() || self.mfcc.iter().any(|c| !c.is_finite()) {
            return Err(Error::Data(format!(
                "track '{}' has non-finite feature values",
                self.filename
            )));
        }
        Ok(())
    }
}

/// All track rows of one extraction run.
///
/// Rows live in an arena; lookups by filename go through an index map. The
/// Camelot code of every row is derived once on construction.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    schema: FeatureSchema,
    rows: Vec<TrackFeatures>,
    camelot: Vec<CamelotCode>,
    by_filename: AHashMap<String, usize>,
}

impl FeatureTable {
    pub fn new(schema: FeatureSchema, rows: Vec<TrackFeatures>) -> Result<Self> {
        let mut by_filename = AHashMap::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            row.validate(&schema)?;
            if by_filename.insert(row.filename.clone(), idx).is_some() {
                return Err(Error::Data(format!("duplicate track '{}'", row.filename)));
            }
        }

        let camelot = rows.iter().map(|row| to_camelot(&row.key)).collect();

        Ok(Self {
            schema,
            rows,
            camelot,
            by_filename,
        })
    }

    #[inline]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> &[TrackFeatures] {
        &self.rows
    }

    /// Row index of a track
    #[inline]
    pub fn position(&self, filename: &str) -> Option<usize> {
        self.by_filename.get(filename).copied()
    }

    pub fn get(&self, filename: &str) -> Option<&TrackFeatures> {
        self.position(filename).map(|idx| &self.rows[idx])
    }

    #[inline]
    pub fn contains(&self, filename: &str) -> bool {
        self.by_filename.contains_key(filename)
    }

    /// Camelot code of the row at `idx`
    #[inline]
    pub fn camelot(&self, idx: usize) -> CamelotCode {
        self.camelot[idx]
    }

    pub fn feature_vectors(&self) -> Vec<Vector> {
        self.rows.iter().map(TrackFeatures::feature_vector).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, bpm: f64, key: &str) -> TrackFeatures {
        TrackFeatures {
            filename: name.to_string(),
            bpm,
            key: key.to_string(),
            energy: 0.1,
            mfcc: vec![1.0, 2.0],
        }
    }

    #[test]
    fn test_schema_columns() {
        let schema = FeatureSchema::with_mfcc(3);
        assert_eq!(schema.columns(), ["energy", "mfcc_0", "mfcc_1", "mfcc_2"]);
        assert_eq!(schema.width(), 4);
        assert_eq!(schema.mfcc_count(), 3);
    }

    #[test]
    fn test_schema_from_columns_rejects_drift() {
        let ok = FeatureSchema::from_columns(vec!["energy".into(), "mfcc_0".into()]);
        assert_eq!(ok.unwrap(), FeatureSchema::with_mfcc(1));

        let swapped = FeatureSchema::from_columns(vec!["mfcc_0".into(), "energy".into()]);
        assert!(matches!(swapped, Err(Error::Data(_))));

        let gap = FeatureSchema::from_columns(vec!["energy".into(), "mfcc_1".into()]);
        assert!(matches!(gap, Err(Error::Data(_))));

        assert!(FeatureSchema::from_columns(Vec::new()).is_err());
    }

    #[test]
    fn test_schema_serde_validates() {
        let json = serde_json::to_string(&FeatureSchema::with_mfcc(2)).unwrap();
        assert_eq!(json, r#"["energy","mfcc_0","mfcc_1"]"#);
        assert!(serde_json::from_str::<FeatureSchema>(&json).is_ok());
        assert!(serde_json::from_str::<FeatureSchema>(r#"["mfcc_0"]"#).is_err());
    }

    #[test]
    fn test_table_lookup_and_camelot() {
        let table = FeatureTable::new(
            FeatureSchema::with_mfcc(2),
            vec![track("a.mp3", 120.0, "C_major"), track("b.mp3", 121.0, "Bb_minor")],
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.position("b.mp3"), Some(1));
        assert!(table.get("missing.mp3").is_none());
        assert_eq!(table.camelot(0).to_string(), "8B");
        assert_eq!(table.camelot(1), CamelotCode::Unknown);
        assert_eq!(table.rows()[0].feature_vector().as_slice(), &[0.1, 1.0, 2.0]);
    }

    #[test]
    fn test_table_rejects_invalid_rows() {
        let schema = FeatureSchema::with_mfcc(2);

        let dup = FeatureTable::new(
            schema.clone(),
            vec![track("a.mp3", 120.0, "C_major"), track("a.mp3", 120.0, "C_major")],
        );
        assert!(matches!(dup, Err(Error::Data(_))));

        let zero_bpm = FeatureTable::new(schema.clone(), vec![track("a.mp3", 0.0, "C_major")]);
        assert!(matches!(zero_bpm, Err(Error::Data(_))));

        let mut short = track("a.mp3", 120.0, "C_major");
        short.mfcc.pop();
        assert!(FeatureTable::new(schema.clone(), vec![short]).is_err());

        let mut nan = track("a.mp3", 120.0, "C_major");
        nan.energy = f64::NAN;
        assert!(FeatureTable::new(schema, vec![nan]).is_err());
    }

    #[test]
    fn test_empty_table_is_allowed() {
        let table = FeatureTable::new(FeatureSchema::with_mfcc(13), Vec::new()).unwrap();
        assert!(table.is_empty());
    }
}
