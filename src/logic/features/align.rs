//! Feature Aligner - maps an arbitrary table onto a model's feature schema
//!
//! Output columns are exactly the requested features in the requested order.
//! Features absent from the input become constant 0.0 columns so that a model
//! trained on a sensor superset can still score a partial fleet.

use ndarray::Array2;

use super::table::TimeSeriesTable;

/// Model-ready matrix (rows x features, f32, NaN-free)
#[derive(Debug, Clone)]
pub struct AlignedFeatures {
    pub names: Vec<String>,
    pub matrix: Array2<f32>,
    /// Requested features that were not in the input table
    pub synthesized: Vec<String>,
}

impl AlignedFeatures {
    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.ncols()
    }

    /// Column by feature name
    pub fn column(&self, name: &str) -> Option<ndarray::ArrayView1<'_, f32>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.matrix.column(i))
    }
}

/// Align `table` to `features`, filling missing columns and NaN cells with 0.0
pub fn align_features(table: &TimeSeriesTable, features: &[String]) -> AlignedFeatures {
    let source_idx: Vec<Option<usize>> = features
        .iter()
        .map(|f| table.column_index(f))
        .collect();

    let synthesized: Vec<String> = features
        .iter()
        .zip(&source_idx)
        .filter(|(_, idx)| idx.is_none())
        .map(|(f, _)| f.clone())
        .collect();

    if !synthesized.is_empty() {
        log::debug!(
            "Feature aligner: {} of {} features absent, zero-filled: {:?}",
            synthesized.len(),
            features.len(),
            synthesized
        );
    }

    let values = table.values();
    let matrix = Array2::from_shape_fn((table.len(), features.len()), |(row, col)| {
        match source_idx[col] {
            Some(src) => {
                let v = values[[row, src]];
                if v.is_nan() { 0.0 } else { v as f32 }
            }
            None => 0.0,
        }
    });

    AlignedFeatures {
        names: features.to_vec(),
        matrix,
        synthesized,
    }
}
