//! Seeded stratified train/test partitioning.
//!
//! Test size targets `ceil(p * n)`. Each class receives `floor(p * n_c)` test rows,
//! kept between 1 and `n_c - 1`, and the leftover is handed out by largest
//! fractional remainder (ties to the lower label), so every class lands on both
//! sides and is off its exact share by less than one row.

use super::loader::RawTable;
use crate::error::{FraudError, FraudResult};
use crate::features::{Label, LabeledRecord};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

/// Guards `ceil`/`floor` against products like `0.2 * 15 = 3.0000000000000004`.
const ROUNDING_EPS: f64 = 1e-9;

/// Row indices into the source collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<LabeledRecord>,
    pub test: Vec<LabeledRecord>,
}

#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    test_fraction: f64,
    seed: u64,
}

impl DatasetSplitter {
    pub fn new(test_fraction: f64, seed: u64) -> FraudResult<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(FraudError::Config(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }
        Ok(Self { test_fraction, seed })
    }

    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Per-class test counts, keyed by label.
    ///
    /// Every class keeps at least one row on each side. A class starts at
    /// `floor(p * n_c)`, raised to 1 if that is zero and capped at `n_c - 1`;
    /// the leftover up to `ceil(p * n)` then goes one row per class by largest
    /// remainder, skipping classes that were raised, sit at their cap, or have
    /// an exact share. Each class stays within one row of `p * n_c`.
    fn allocate(&self, class_sizes: &BTreeMap<Label, usize>, total: usize) -> FraudResult<BTreeMap<Label, usize>> {
        if let Some((label, n)) = class_sizes.iter().find(|(_, &n)| n < 2) {
            return Err(FraudError::InsufficientData(format!(
                "class {:?} has {} row(s); need at least 2 to appear in both train and test",
                label, n
            )));
        }
        let p = self.test_fraction;
        let n_test = (p * total as f64 - ROUNDING_EPS).ceil().max(0.0) as usize;

        // (label, test rows, remainder, may take a leftover row)
        let mut alloc: Vec<(Label, usize, f64, bool)> = class_sizes
            .iter()
            .map(|(label, &n)| {
                let exact = p * n as f64;
                let floor = (exact + ROUNDING_EPS).floor() as usize;
                let count = floor.clamp(1, n - 1);
                let remainder = (exact - floor as f64).max(0.0);
                let open = count == floor && count < n - 1 && remainder > ROUNDING_EPS;
                (*label, count, remainder, open)
            })
            .collect();

        let assigned: usize = alloc.iter().map(|a| a.1).sum();
        let mut leftover = n_test.saturating_sub(assigned);
        let mut order: Vec<usize> = (0..alloc.len()).filter(|&i| alloc[i].3).collect();
        order.sort_by(|&a, &b| {
            alloc[b]
                .2
                .partial_cmp(&alloc[a].2)
                .unwrap_or(Ordering::Equal)
                .then(alloc[a].0.cmp(&alloc[b].0))
        });
        for i in order {
            if leftover == 0 {
                break;
            }
            alloc[i].1 += 1;
            leftover -= 1;
        }
        Ok(alloc.into_iter().map(|(label, n, _, _)| (label, n)).collect())
    }

    /// Partition row indices by label. Same seed and labels give the same split.
    pub fn split_indices(&self, labels: &[Label]) -> FraudResult<SplitIndices> {
        if labels.is_empty() {
            return Err(FraudError::InsufficientData("no records to split".into()));
        }
        let mut by_class: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            by_class.entry(*label).or_default().push(i);
        }
        let sizes: BTreeMap<Label, usize> = by_class.iter().map(|(l, idx)| (*l, idx.len())).collect();
        let alloc = self.allocate(&sizes, labels.len())?;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(labels.len());
        let mut test = Vec::new();
        for (label, mut idx) in by_class {
            idx.shuffle(&mut rng);
            let n_test = alloc.get(&label).copied().unwrap_or(0);
            test.extend_from_slice(&idx[..n_test]);
            train.extend_from_slice(&idx[n_test..]);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok(SplitIndices { train, test })
    }

    pub fn split(&self, records: &[LabeledRecord]) -> FraudResult<DatasetSplit> {
        let labels: Vec<Label> = records.iter().map(|r| r.label).collect();
        let idx = self.split_indices(&labels)?;
        let split = DatasetSplit {
            train: idx.train.iter().map(|&i| records[i].clone()).collect(),
            test: idx.test.iter().map(|&i| records[i].clone()).collect(),
        };
        info!(
            train = split.train.len(),
            test = split.test.len(),
            seed = self.seed,
            "stratified split"
        );
        Ok(split)
    }

    /// Split straight from a raw table; fails with a schema error if `Class` is absent.
    pub fn split_table(&self, table: RawTable) -> FraudResult<DatasetSplit> {
        let records = table.into_records()?;
        self.split(&records)
    }
}
