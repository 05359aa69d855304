use serde::{Deserialize, Serialize};

/// A feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Euclidean distance between two equally sized slices.
/// Uses two accumulators for better pipelining.
#[inline]
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum1 = 0.0;
    let mut sum2 = 0.0;

    let mut pairs = a.chunks_exact(2).zip(b.chunks_exact(2));
    for (x, y) in &mut pairs {
        let d0 = x[0] - y[0];
        let d1 = x[1] - y[1];
        sum1 += d0 * d0;
        sum2 += d1 * d1;
    }
    if a.len() % 2 == 1 {
        let d = a[a.len() - 1] - b[b.len() - 1];
        sum1 += d * d;
    }

    (sum1 + sum2).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_distance() {
        assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_l2_distance_odd_dimension() {
        let v1 = Vector::new(vec![1.0, 2.0, 3.0]);
        let v2 = Vector::new(vec![1.0, 2.0, 5.0]);
        assert!((l2_distance(v1.as_slice(), v2.as_slice()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_vector_accessors() {
        let v = Vector::new(vec![1.0, 2.0]);
        assert_eq!(v.dim(), 2);
        assert!(!v.is_empty());
        assert!(Vector::new(Vec::new()).is_empty());
    }
}
