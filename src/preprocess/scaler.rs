use serde::{Deserialize, Serialize};

use super::PreprocessError;

/// Per-feature min-max scaler: `x' = (x - min) / (max - min)`.
///
/// Training minimum maps to 0 and training maximum to 1. Values outside the
/// fitted range are not clamped, so they land proportionally outside `[0, 1]`.
/// A constant feature uses a range of 1 and therefore maps to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub feature_names: Vec<String>,
    pub data_min: Vec<f32>,
    pub data_max: Vec<f32>,
}

impl MinMaxScaler {
    /// Fit bounds from row-major `rows`, one column per feature name.
    pub fn fit(feature_names: Vec<String>, rows: &[Vec<f32>]) -> Result<Self, PreprocessError> {
        if rows.is_empty() {
            return Err(PreprocessError::EmptyInput);
        }
        let width = feature_names.len();
        let mut data_min = vec![f32::INFINITY; width];
        let mut data_max = vec![f32::NEG_INFINITY; width];
        for (row_idx, row) in rows.iter().enumerate() {
            check_width(row_idx, width, row.len())?;
            for (j, &v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(PreprocessError::NonFinite {
                        feature: feature_names[j].clone(),
                    });
                }
                data_min[j] = data_min[j].min(v);
                data_max[j] = data_max[j].max(v);
            }
        }
        Ok(Self {
            feature_names,
            data_min,
            data_max,
        })
    }

    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    fn range(&self, j: usize) -> f32 {
        let range = self.data_max[j] - self.data_min[j];
        if range == 0.0 { 1.0 } else { range }
    }

    pub fn transform_row(&self, row: &[f32]) -> Result<Vec<f32>, PreprocessError> {
        check_width(0, self.width(), row.len())?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, &v)| (v - self.data_min[j]) / self.range(j))
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, PreprocessError> {
        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                self.transform_row(row).map_err(|err| match err {
                    PreprocessError::WidthMismatch {
                        expected, found, ..
                    } => PreprocessError::WidthMismatch {
                        row: idx,
                        expected,
                        found,
                    },
                    other => other,
                })
            })
            .collect()
    }

    pub fn inverse_transform_row(&self, row: &[f32]) -> Result<Vec<f32>, PreprocessError> {
        check_width(0, self.width(), row.len())?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, &v)| v * self.range(j) + self.data_min[j])
            .collect())
    }

    pub fn validate(&self) -> Result<(), String> {
        let width = self.feature_names.len();
        if width == 0 {
            return Err("scaler has no features".to_string());
        }
        if self.data_min.len() != width || self.data_max.len() != width {
            return Err("scaler bounds length mismatch".to_string());
        }
        for j in 0..width {
            let (lo, hi) = (self.data_min[j], self.data_max[j]);
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(format!(
                    "invalid bounds for {}: [{lo}, {hi}]",
                    self.feature_names[j]
                ));
            }
        }
        Ok(())
    }
}

fn check_width(row: usize, expected: usize, found: usize) -> Result<(), PreprocessError> {
    if expected == found {
        Ok(())
    } else {
        Err(PreprocessError::WidthMismatch {
            row,
            expected,
            found,
        })
    }
}
