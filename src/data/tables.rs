//! Persisted train/test tables. Column-major JSON that keeps the feature names,
//! their order and the schema version, so a later run reads back exactly what
//! was fitted on.

use super::split::DatasetSplit;
use crate::error::{FraudError, FraudResult};
use crate::features::{FeatureSchema, FeatureVector, Label, LabeledRecord, FEATURE_COUNT, LABEL_COLUMN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub rows: usize,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelTable {
    pub column: String,
    pub values: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SplitPaths {
    pub x_train: PathBuf,
    pub x_test: PathBuf,
    pub y_train: PathBuf,
    pub y_test: PathBuf,
}

impl SplitPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            x_train: dir.join("X_train.json"),
            x_test: dir.join("X_test.json"),
            y_train: dir.join("y_train.json"),
            y_test: dir.join("y_test.json"),
        }
    }
}

impl FeatureTable {
    fn from_records(records: &[LabeledRecord]) -> Self {
        let schema = FeatureSchema::canonical();
        let columns = schema
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| Column {
                name: name.clone(),
                values: records.iter().map(|r| r.features.as_slice()[i]).collect(),
            })
            .collect();
        Self {
            schema,
            rows: records.len(),
            columns,
        }
    }

    fn into_vectors(self) -> FraudResult<Vec<FeatureVector>> {
        self.schema.validate()?;
        if self.columns.len() != FEATURE_COUNT {
            return Err(FraudError::Schema(format!(
                "table has {} columns, expected {}",
                self.columns.len(),
                FEATURE_COUNT
            )));
        }
        for (col, name) in self.columns.iter().zip(self.schema.fields.iter()) {
            if &col.name != name || col.values.len() != self.rows {
                return Err(FraudError::Schema(format!(
                    "column {:?} does not match schema field {:?} with {} rows",
                    col.name, name, self.rows
                )));
            }
        }
        let mut out = Vec::with_capacity(self.rows);
        let mut buf = [0.0f64; FEATURE_COUNT];
        for row in 0..self.rows {
            for (dst, col) in buf.iter_mut().zip(self.columns.iter()) {
                *dst = col.values[row];
            }
            out.push(FeatureVector::from_slice(&buf).map_err(|e| FraudError::Schema(e.to_string()))?);
        }
        Ok(out)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> FraudResult<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer(std::io::BufWriter::new(file), value)?;
    Ok(())
}

fn label_table(records: &[LabeledRecord]) -> LabelTable {
    LabelTable {
        column: LABEL_COLUMN.to_string(),
        values: records.iter().map(|r| r.label.as_u8()).collect(),
    }
}

/// Write `X_train`, `X_test`, `y_train`, `y_test` into `dir`.
pub fn write_split(dir: &Path, split: &DatasetSplit) -> FraudResult<SplitPaths> {
    std::fs::create_dir_all(dir)?;
    let paths = SplitPaths::in_dir(dir);
    write_json(&paths.x_train, &FeatureTable::from_records(&split.train))?;
    write_json(&paths.x_test, &FeatureTable::from_records(&split.test))?;
    write_json(&paths.y_train, &label_table(&split.train))?;
    write_json(&paths.y_test, &label_table(&split.test))?;
    info!(dir = %dir.display(), "persisted train/test tables");
    Ok(paths)
}

pub fn read_feature_table(path: &Path) -> FraudResult<Vec<FeatureVector>> {
    let file = std::fs::File::open(path)?;
    let table: FeatureTable = serde_json::from_reader(std::io::BufReader::new(file))?;
    table.into_vectors()
}

pub fn read_label_table(path: &Path) -> FraudResult<Vec<Label>> {
    let file = std::fs::File::open(path)?;
    let table: LabelTable = serde_json::from_reader(std::io::BufReader::new(file))?;
    if table.column != LABEL_COLUMN {
        return Err(FraudError::Schema(format!("label column is {:?}", table.column)));
    }
    table
        .values
        .into_iter()
        .map(|v| Label::from_u8(v).ok_or_else(|| FraudError::Schema(format!("label {} is not 0 or 1", v))))
        .collect()
}
