//! Labeled transaction data: CSV ingestion, stratified splitting and persisted tables.

pub mod loader;
pub mod split;
pub mod tables;

pub use loader::{load_labeled_csv, read_table, RawTable};
pub use split::{DatasetSplit, DatasetSplitter, SplitIndices};
pub use tables::{read_feature_table, read_label_table, write_split, SplitPaths};

use crate::features::{FeatureVector, LabeledRecord, FEATURE_COUNT};
use ndarray::Array2;

/// Row-major design matrix plus 0/1 labels, in schema column order.
pub fn to_design_matrix(records: &[LabeledRecord]) -> (Array2<f64>, Vec<u8>) {
    let features: Vec<FeatureVector> = records.iter().map(|r| r.features).collect();
    let labels = records.iter().map(|r| r.label.as_u8()).collect();
    (to_feature_matrix(&features), labels)
}

pub fn to_feature_matrix(vectors: &[FeatureVector]) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((vectors.len(), FEATURE_COUNT));
    for (mut row, fv) in out.rows_mut().into_iter().zip(vectors) {
        for (dst, src) in row.iter_mut().zip(fv.as_slice()) {
            *dst = *src;
        }
    }
    out
}
