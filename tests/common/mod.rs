//! Shared fixtures: seeded synthetic transactions and ready-made artifacts.
#![allow(dead_code)]

use fraudscore::features::{FeatureVector, Label, LabeledRecord, FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN};
use fraudscore::pipeline::metrics::EvaluationMetrics;
use fraudscore::pipeline::{BoostParams, FittedPipeline, GradientBoostedTrees, StandardScaler};
use fraudscore::registry::ArtifactDraft;
use fraudscore::FeatureSchema;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

pub const MODEL_NAME: &str = "fraud-detection-v2";

/// Legit rows are uniform noise; fraud rows are shifted by +3 on V1..V4.
pub fn synthetic_records(n_legit: usize, n_fraud: usize, seed: u64) -> Vec<LabeledRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n_legit + n_fraud);
    for i in 0..n_legit + n_fraud {
        let label = if i < n_legit { Label::Legit } else { Label::Fraud };
        let mut values = [0.0f64; FEATURE_COUNT];
        values[0] = rng.gen_range(0.0..172_800.0);
        for v in values.iter_mut().take(FEATURE_COUNT - 1).skip(1) {
            *v = rng.gen_range(-1.0..1.0);
        }
        values[FEATURE_COUNT - 1] = rng.gen_range(0.0..200.0);
        if label == Label::Fraud {
            for v in values.iter_mut().skip(1).take(4) {
                *v += 3.0;
            }
        }
        let features = FeatureVector::from_slice(&values).unwrap();
        out.push(LabeledRecord::new(features, label));
    }
    out
}

/// Write records as a CSV with the usual `Time,V1..V28,Amount,Class` header.
pub fn write_csv(path: &Path, records: &[LabeledRecord]) {
    let mut w = csv::Writer::from_path(path).unwrap();
    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.push(LABEL_COLUMN);
    w.write_record(&header).unwrap();
    for r in records {
        let mut row: Vec<String> = r.features.as_slice().iter().map(|v| v.to_string()).collect();
        row.push(r.label.as_u8().to_string());
        w.write_record(&row).unwrap();
    }
    w.flush().unwrap();
}

/// Small enough to keep test fits fast.
pub fn small_params() -> BoostParams {
    BoostParams {
        n_estimators: 15,
        max_depth: 3,
        ..BoostParams::default()
    }
}

pub fn dummy_metrics() -> EvaluationMetrics {
    EvaluationMetrics {
        roc_auc: 0.5,
        f1_score: 0.0,
        precision: 0.0,
        recall: 0.0,
        accuracy: 0.0,
        true_positives: 0,
        false_positives: 0,
        true_negatives: 0,
        false_negatives: 0,
    }
}

/// A pipeline that scores every transaction with the same fraud probability.
pub fn constant_pipeline(probability: f64) -> FittedPipeline {
    FittedPipeline::from_parts(
        StandardScaler::identity(FEATURE_COUNT),
        GradientBoostedTrees::constant(probability, FEATURE_COUNT),
    )
}

pub fn constant_draft(probability: f64) -> ArtifactDraft {
    ArtifactDraft::new(
        constant_pipeline(probability),
        MODEL_NAME,
        dummy_metrics(),
        FeatureSchema::canonical(),
    )
}

pub fn zero_vector() -> Vec<f64> {
    vec![0.0; FEATURE_COUNT]
}

/// A pipeline that loads and validates but whose only tree points at a node
/// that does not exist, so every score fails inside the classifier.
pub fn broken_pipeline() -> FittedPipeline {
    let mut value = serde_json::to_value(constant_pipeline(0.02)).unwrap();
    value["classifier"]["trees"] = serde_json::json!([{
        "nodes": [{ "kind": "split", "feature": 0, "threshold": 0.0, "left": 7, "right": 8 }]
    }]);
    serde_json::from_value(value).unwrap()
}

pub fn broken_draft() -> ArtifactDraft {
    ArtifactDraft::new(broken_pipeline(), MODEL_NAME, dummy_metrics(), FeatureSchema::canonical())
}
