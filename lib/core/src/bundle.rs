use crate::camelot::CamelotCode;
use crate::knn::NeighborIndex;
use crate::penalty::{bpm_penalty, camelot_distance, compute_blending_score};
use crate::scaler::StandardScaler;
use crate::table::FeatureTable;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_K_NEIGHBORS_CAP: usize = 10;
pub const DEFAULT_TOP_N: usize = 5;

/// Parameters for building the neighbour index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParams {
    /// Upper bound on neighbours retained at build time
    pub k_neighbors_cap: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            k_neighbors_cap: DEFAULT_K_NEIGHBORS_CAP,
        }
    }
}

impl IndexParams {
    /// Neighbours retained for a table of `rows` rows, never more than `rows - 1`
    pub fn neighbors_for(&self, rows: usize) -> usize {
        self.k_neighbors_cap.min(rows.saturating_sub(1).max(1))
    }
}

/// A track recommended for blending with the query track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub filename: String,
    /// Euclidean distance in normalized feature space
    pub distance: f64,
    pub bpm: f64,
    pub key: String,
    pub camelot: CamelotCode,
    /// Blending score in [0, 1], rounded to 4 decimals
    pub score: f64,
}

/// Feature table, normalization parameters and neighbour index of one training run
#[derive(Debug, Clone)]
pub struct ModelBundle {
    table: FeatureTable,
    scaler: StandardScaler,
    index: NeighborIndex,
}

impl ModelBundle {
    /// Fit the scaler and build the neighbour index over every row of `table`
    pub fn fit(table: FeatureTable, params: &IndexParams) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::Data("feature table is empty".to_string()));
        }

        let features = table.feature_vectors();
        let scaler = StandardScaler::fit(&features)?;
        let normalized = scaler.transform_all(&features)?;

        let n_neighbors = params.neighbors_for(table.len());
        let index = NeighborIndex::build(&normalized, n_neighbors)?;

        debug!(
            rows = table.len(),
            features = table.schema().width(),
            n_neighbors,
            "model fitted"
        );

        Ok(Self {
            table,
            scaler,
            index,
        })
    }

    /// Reassemble a bundle from separately stored parts, checking they agree
    pub fn from_parts(table: FeatureTable, scaler: StandardScaler, index: NeighborIndex) -> Result<Self> {
        let width = table.schema().width();
        if scaler.dim() != width {
            return Err(Error::InvalidDimension {
                expected: width,
                actual: scaler.dim(),
            });
        }
        if index.dim() != width {
            return Err(Error::InvalidDimension {
                expected: width,
                actual: index.dim(),
            });
        }
        if index.len() != table.len() {
            return Err(Error::Data(format!(
                "index holds {} rows but the feature table has {}",
                index.len(),
                table.len()
            )));
        }
        Ok(Self {
            table,
            scaler,
            index,
        })
    }

    #[inline]
    pub fn table(&self) -> &FeatureTable {
        &self.table
    }

    #[inline]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    #[inline]
    pub fn index(&self) -> &NeighborIndex {
        &self.index
    }

    /// Rank the tracks that blend best with `filename`.
    ///
    /// Returns `min(top_n, rows - 1)` results, never the query itself, sorted
    /// by score descending and then by filename.
    pub fn recommend(&self, filename: &str, top_n: usize) -> Result<Vec<Recommendation>> {
        let query_idx = self
            .table
            .position(filename)
            .ok_or_else(|| Error::TrackNotFound(filename.to_string()))?;
        let query = &self.table.rows()[query_idx];
        let query_camelot = self.table.camelot(query_idx);

        let x = self.scaler.transform(&query.feature_vector())?;
        let k = top_n.saturating_add(1).min(self.table.len());
        let neighbors = self.index.search(&x, Some(k))?;

        let mut recs: Vec<Recommendation> = neighbors
            .into_iter()
            .filter(|n| n.index != query_idx)
            .take(top_n)
            .map(|n| {
                let target = &self.table.rows()[n.index];
                let target_camelot = self.table.camelot(n.index);
                let bpm_p = bpm_penalty(query.bpm, target.bpm);
                let camelot_p = camelot_distance(query_camelot, target_camelot);
                let score = compute_blending_score(n.distance, camelot_p, bpm_p);
                Recommendation {
                    filename: target.filename.clone(),
                    distance: n.distance,
                    bpm: target.bpm,
                    key: target.key.clone(),
                    camelot: target_camelot,
                    score: round4(score),
                }
            })
            .collect();

        recs.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        debug!(query = filename, results = recs.len(), "recommendations computed");
        Ok(recs)
    }
}

#[inline]
fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
