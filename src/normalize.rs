use log::debug;

use crate::error::{Error, Result};

/// One power-of-ten divisor per dataset column, the label column last.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetScale {
    columns: Vec<f64>,
}

/// Smallest power of ten with as many digits as the integer part of `max`.
/// A column whose maximum is below 1 (or negative) still gets 10.
pub fn column_scale(max: f64) -> f64 {
    let mut integer = max.trunc().max(0.0);
    if integer.is_infinite() {
        return f64::INFINITY;
    }
    let mut digits = 1;
    while integer >= 10.0 {
        integer = (integer / 10.0).trunc();
        digits += 1;
    }
    10f64.powi(digits)
}

impl DatasetScale {
    /// Scans every row; rows must already be validated to share one width.
    pub fn fit(dataset: &[Vec<f64>]) -> Result<Self> {
        let width = dataset
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::InvalidDataset("dataset is empty".to_string()))?;

        let mut maxima = vec![0.0f64; width];
        for row in dataset {
            for (max, value) in maxima.iter_mut().zip(row) {
                if *max < *value {
                    *max = *value;
                }
            }
        }

        let mut columns = Vec::with_capacity(width);
        for (column, max) in maxima.into_iter().enumerate() {
            let scale = column_scale(max);
            if !scale.is_finite() || scale == 0.0 {
                return Err(Error::NumericalInstability(format!(
                    "column {} has maximum {} and no usable scale",
                    column, max
                )));
            }
            columns.push(scale);
        }
        debug!("dataset scale: {:?}", columns);

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[f64] {
        &self.columns
    }

    pub fn apply_in_place(&self, dataset: &mut [Vec<f64>]) {
        for row in dataset {
            for (value, scale) in row.iter_mut().zip(&self.columns) {
                *value /= scale;
            }
        }
    }

    pub fn normalize(&self, task: &[f64]) -> Vec<f64> {
        task.iter()
            .zip(&self.columns)
            .map(|(value, scale)| value / scale)
            .collect()
    }

    /// Maps a network output back onto the label column.
    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.label_scale()
    }

    pub fn label_scale(&self) -> f64 {
        self.columns.last().copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_follows_integer_digits() {
        assert_eq!(column_scale(0.0), 10.0);
        assert_eq!(column_scale(0.7), 10.0);
        assert_eq!(column_scale(6.9), 10.0);
        assert_eq!(column_scale(10.0), 100.0);
        assert_eq!(column_scale(99.99), 100.0);
        assert_eq!(column_scale(147.0), 1000.0);
        assert_eq!(column_scale(1000.0), 10000.0);
        assert_eq!(column_scale(-42.0), 10.0);
    }

    #[test]
    fn fit_per_column() {
        let dataset = vec![vec![5.1, 147.0, 1.0], vec![6.9, 12.0, 3.0]];
        let scale = DatasetScale::fit(&dataset).unwrap();
        assert_eq!(scale.columns(), &[10.0, 1000.0, 10.0]);

        let mut dataset = dataset;
        scale.apply_in_place(&mut dataset);
        assert!((dataset[0][1] - 0.147).abs() < 1e-12);
        assert!((dataset[1][2] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn denormalize_reverses_label_column() {
        let dataset = vec![vec![3.0, 250.0], vec![8.0, 20.0]];
        let scale = DatasetScale::fit(&dataset).unwrap();
        for row in &dataset {
            let normalized = scale.normalize(row);
            let label = normalized[normalized.len() - 1];
            assert!((scale.denormalize(label) - row[1]).abs() < 1e-9);
        }
        // features divide by their own column, the output uses the label's
        assert_eq!(scale.normalize(&[5.0]), vec![0.5]);
        assert_eq!(scale.denormalize(0.5), 500.0);
    }

    #[test]
    fn overflowing_scale_is_reported() {
        let dataset = vec![vec![1.0, 1e308]];
        assert!(matches!(
            DatasetScale::fit(&dataset),
            Err(Error::NumericalInstability(_))
        ));
    }

    #[test]
    fn empty_dataset() {
        assert!(matches!(
            DatasetScale::fit(&[]),
            Err(Error::InvalidDataset(_))
        ));
    }
}
