use crate::vector::Vector;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Scales smaller than this are treated as zero variance
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Per-column standardization `(x - mean) / scale`.
///
/// `scale` is the population standard deviation of the column; columns with
/// zero variance keep a scale of 1.0 so they only get centered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and scale over all rows
    pub fn fit(rows: &[Vector]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::Data("cannot fit scaler on an empty matrix".to_string()));
        };
        let dim = first.dim();
        let n = rows.len() as f64;

        let mut mean = vec![0.0; dim];
        for row in rows {
            if row.dim() != dim {
                return Err(Error::InvalidDimension {
                    expected: dim,
                    actual: row.dim(),
                });
            }
            for (m, x) in mean.iter_mut().zip(row.as_slice()) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; dim];
        for row in rows {
            for ((v, m), x) in var.iter_mut().zip(&mean).zip(row.as_slice()) {
                let d = x - m;
                *v += d * d;
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std < MIN_SCALE {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Rebuild a fitted scaler from stored parameters
    pub fn from_parts(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != scale.len() {
            return Err(Error::InvalidDimension {
                expected: mean.len(),
                actual: scale.len(),
            });
        }
        if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::Data("scaler has a non-positive scale".to_string()));
        }
        Ok(Self { mean, scale })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    #[inline]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    #[inline]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn transform(&self, x: &Vector) -> Result<Vector> {
        if x.dim() != self.dim() {
            return Err(Error::InvalidDimension {
                expected: self.dim(),
                actual: x.dim(),
            });
        }
        Ok(Vector::new(
            x.as_slice()
                .iter()
                .zip(self.mean.iter().zip(&self.scale))
                .map(|(v, (m, s))| (v - m) / s)
                .collect(),
        ))
    }

    pub fn transform_all(&self, rows: &[Vector]) -> Result<Vec<Vector>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform() {
        let rows = vec![
            Vector::new(vec![1.0, 10.0]),
            Vector::new(vec![3.0, 10.0]),
        ];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.mean(), &[2.0, 10.0]);
        // population std of [1, 3] is 1, constant column keeps scale 1
        assert_eq!(scaler.scale(), &[1.0, 1.0]);

        let out = scaler.transform_all(&rows).unwrap();
        assert_eq!(out[0].as_slice(), &[-1.0, 0.0]);
        assert_eq!(out[1].as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn test_transformed_columns_have_unit_variance() {
        let rows: Vec<Vector> = (0..10)
            .map(|i| Vector::new(vec![i as f64 * 3.0 + 7.0, (i * i) as f64]))
            .collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let out = scaler.transform_all(&rows).unwrap();

        for col in 0..2 {
            let values: Vec<f64> = out.iter().map(|v| v.as_slice()[col]).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_dimension_checks() {
        assert!(matches!(StandardScaler::fit(&[]), Err(Error::Data(_))));

        let ragged = vec![Vector::new(vec![1.0]), Vector::new(vec![1.0, 2.0])];
        assert!(matches!(
            StandardScaler::fit(&ragged),
            Err(Error::InvalidDimension { expected: 1, actual: 2 })
        ));

        let scaler = StandardScaler::from_parts(vec![0.0], vec![1.0]).unwrap();
        assert!(scaler.transform(&Vector::new(vec![1.0, 2.0])).is_err());
        assert!(StandardScaler::from_parts(vec![0.0], vec![0.0]).is_err());
    }
}
