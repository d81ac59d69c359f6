//! Standardization of the numeric fund attributes.

use crate::core::fund::{FundRecord, NumericField};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub scale: f64,
}

/// Zero-mean, unit-variance scaler over the five numeric fund attributes.
///
/// Statistics use the population standard deviation and skip NaN values.
/// A column with zero spread keeps a scale of 1 so it maps to all zeros.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    stats: HashMap<NumericField, ColumnStats>,
}

impl StandardScaler {
    pub fn fit(records: &[FundRecord]) -> Self {
        let stats = NumericField::ALL
            .iter()
            .map(|&field| {
                let values: Vec<f64> = records
                    .iter()
                    .map(|r| r.numeric(field))
                    .filter(|v| !v.is_nan())
                    .collect();
                (field, column_stats(&values))
            })
            .collect();
        Self { stats }
    }

    pub fn stats(&self, field: NumericField) -> ColumnStats {
        self.stats.get(&field).copied().unwrap_or(ColumnStats {
            mean: 0.0,
            scale: 1.0,
        })
    }

    /// Returns a copy of `record` with its numeric attributes standardized.
    pub fn transform(&self, record: &FundRecord) -> FundRecord {
        let mut normalized = record.clone();
        for field in NumericField::ALL {
            let s = self.stats(field);
            normalized.set_numeric(field, (record.numeric(field) - s.mean) / s.scale);
        }
        normalized
    }

    pub fn inverse_transform_value(&self, field: NumericField, value: f64) -> f64 {
        let s = self.stats(field);
        value * s.scale + s.mean
    }
}

fn column_stats(values: &[f64]) -> ColumnStats {
    if values.is_empty() {
        return ColumnStats {
            mean: f64::NAN,
            scale: 1.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let scale = if std == 0.0 { 1.0 } else { std };
    ColumnStats { mean, scale }
}
