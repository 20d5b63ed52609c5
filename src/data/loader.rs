//! CSV ingestion. Columns are matched by header name and reordered into schema
//! order, so a source file with shuffled columns still lands positionally correct.

use crate::error::{FraudError, FraudResult};
use crate::features::{FeatureVector, Label, LabeledRecord, FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Numeric table as read from disk, before schema checks.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl RawTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Validate label and feature columns and build labeled records.
    pub fn into_records(self) -> FraudResult<Vec<LabeledRecord>> {
        let label_idx = self.column_index(LABEL_COLUMN).ok_or_else(|| {
            FraudError::Schema(format!("dataset missing {:?} target column", LABEL_COLUMN))
        })?;

        let mut feature_idx = [0usize; FEATURE_COUNT];
        for (slot, name) in feature_idx.iter_mut().zip(FEATURE_NAMES.iter()) {
            *slot = self
                .column_index(name)
                .ok_or_else(|| FraudError::Schema(format!("dataset missing feature column {:?}", name)))?;
        }

        let mut out = Vec::with_capacity(self.rows.len());
        let mut buf = [0.0f64; FEATURE_COUNT];
        for (row_no, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(FraudError::Schema(format!(
                    "row {} has {} cells, header has {}",
                    row_no,
                    row.len(),
                    self.columns.len()
                )));
            }
            for (dst, &src) in buf.iter_mut().zip(feature_idx.iter()) {
                *dst = row[src];
            }
            let features = FeatureVector::from_slice(&buf)
                .map_err(|e| FraudError::Schema(format!("row {}: {}", row_no, e)))?;
            let raw_label = row[label_idx];
            let label = if raw_label == 0.0 {
                Label::Legit
            } else if raw_label == 1.0 {
                Label::Fraud
            } else {
                return Err(FraudError::Schema(format!(
                    "row {}: {} must be 0 or 1, got {}",
                    row_no, LABEL_COLUMN, raw_label
                )));
            };
            out.push(LabeledRecord::new(features, label));
        }
        Ok(out)
    }
}

/// Parse a headed CSV stream into a numeric table.
pub fn read_table<R: Read>(reader: R) -> FraudResult<RawTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for (row_no, record) in rdr.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                cell.trim().parse::<f64>().map_err(|_| {
                    FraudError::Schema(format!(
                        "row {}, column {:?}: {:?} is not numeric",
                        row_no,
                        columns.get(col).map(String::as_str).unwrap_or("?"),
                        cell
                    ))
                })
            })
            .collect::<FraudResult<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(RawTable { columns, rows })
}

pub fn load_labeled_csv(path: &Path) -> FraudResult<Vec<LabeledRecord>> {
    info!(path = %path.display(), "loading labeled records");
    let file = std::fs::File::open(path)?;
    let records = read_table(file)?.into_records()?;
    let fraud = records.iter().filter(|r| r.label == Label::Fraud).count();
    info!(rows = records.len(), fraud, "loaded labeled records");
    Ok(records)
}
