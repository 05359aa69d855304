use crate::vector::{l2_distance, Vector};
use crate::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;

/// A search hit: row index into the indexed matrix and its Euclidean distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Exact nearest neighbour index with Euclidean distance.
///
/// Vectors are kept in one contiguous buffer for cache locality. Results are
/// ordered by (distance, row index), so equal distances resolve the same way
/// on every build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborIndex {
    dim: usize,
    vectors: Vec<f64>,
    /// Neighbours returned when a query does not ask for a count
    n_neighbors: usize,
}

impl NeighborIndex {
    pub fn build(rows: &[Vector], n_neighbors: usize) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::Data("cannot index an empty matrix".to_string()));
        };
        let dim = first.dim();

        let mut vectors = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.dim() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: row.dim(),
                });
            }
            vectors.extend_from_slice(row.as_slice());
        }

        Self::from_parts(dim, vectors, n_neighbors)
    }

    /// Rebuild an index from its stored buffer
    pub fn from_parts(dim: usize, vectors: Vec<f64>, n_neighbors: usize) -> Result<Self> {
        if dim == 0 || vectors.len() % dim != 0 {
            return Err(Error::InvalidDimension {
                expected: dim,
                actual: vectors.len(),
            });
        }
        if n_neighbors == 0 {
            return Err(Error::InvalidConfig(
                "index must retain at least one neighbour".to_string(),
            ));
        }
        Ok(Self {
            dim,
            vectors,
            n_neighbors,
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dim
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    #[inline]
    fn get_vector(&self, idx: usize) -> &[f64] {
        let start = idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// The `k` nearest rows to `query`, closest first.
    ///
    /// `k` defaults to the count retained at build time and is clamped to
    /// the number of indexed rows.
    pub fn search(&self, query: &Vector, k: Option<usize>) -> Result<Vec<Neighbor>> {
        if query.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: query.dim(),
            });
        }

        let k = k.unwrap_or(self.n_neighbors).min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // Max-heap on (distance, index): the worst kept candidate sits on top
        let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::with_capacity(k + 1);
        for idx in 0..self.len() {
            let dist = OrderedFloat(l2_distance(query.as_slice(), self.get_vector(idx)));
            if heap.len() < k {
                heap.push((dist, idx));
            } else if let Some(&worst) = heap.peek() {
                if (dist, idx) < worst {
                    heap.pop();
                    heap.push((dist, idx));
                }
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|(dist, index)| Neighbor {
                index,
                distance: dist.into_inner(),
            })
            .collect())
    }
}
