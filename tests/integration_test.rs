//! Integration test: config load, CSV → training run → registry → inference service.

mod common;

use fraudscore::config::AppConfig;
use fraudscore::data::{read_feature_table, read_label_table};
use fraudscore::registry::{InMemoryRegistry, ModelRegistry, ModelUri, ModelVersion, SqliteRegistry};
use fraudscore::serving::{InferenceService, LoadOutcome, ServiceState};
use fraudscore::training::run_training;
use fraudscore::FraudError;
use std::path::Path;
use std::sync::Arc;

fn fast_config() -> AppConfig {
    let mut c = AppConfig::default();
    c.training.classifier = common::small_params();
    c
}

#[test]
fn config_load_default() {
    let c = AppConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.split.test_fraction, 0.2);
    assert_eq!(c.split.seed, 42);
    assert_eq!(c.training.model_name, "fraud-detection-v2");
    assert_eq!(c.training.promote_alias.as_deref(), Some("production"));
    let uri = c.serve.model_uri().unwrap();
    assert_eq!(uri, ModelUri::alias("fraud-detection-v2", "production"));
}

#[test]
fn train_publish_and_serve() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("creditcard.csv");
    common::write_csv(&csv_path, &common::synthetic_records(600, 40, 17));
    let registry = Arc::new(SqliteRegistry::open(&dir.path().join("registry.db")).unwrap());
    let config = fast_config();

    let report = run_training(&config, &csv_path, &dir.path().join("out"), registry.as_ref()).unwrap();
    assert_eq!(report.version, ModelVersion(1));
    assert_eq!(report.train_rows + report.test_rows, 640);
    assert!(report.metrics.roc_auc > 0.9, "roc_auc {}", report.metrics.roc_auc);

    assert_eq!(read_feature_table(&report.tables.x_train).unwrap().len(), report.train_rows);
    assert_eq!(read_label_table(&report.tables.y_test).unwrap().len(), report.test_rows);

    let service = InferenceService::new(registry.clone(), config.serve.model_uri().unwrap());
    assert_eq!(service.load(), LoadOutcome::Loaded(report.version));
    let model = service.active_model().unwrap();
    assert_eq!(model.artifact.input_example.len(), 5);
    assert_eq!(model.artifact.params.n_estimators, 15);
    assert_eq!(model.artifact.pipeline.correction(), Some("smote"));

    let mut fraud_like = common::zero_vector();
    for v in fraud_like.iter_mut().skip(1).take(4) {
        *v = 3.0;
    }
    fraud_like[29] = 100.0;
    let r = service.score(&fraud_like).unwrap();
    assert!(r.is_fraud, "{:?}", r);
    let mut legit_like = fraud_like.clone();
    for v in legit_like.iter_mut().skip(1).take(4) {
        *v = 0.0;
    }
    assert!(!service.score(&legit_like).unwrap().is_fraud);
}

#[test]
fn same_seed_gives_same_model() {
    let records = common::synthetic_records(300, 30, 2);
    let split = fast_config().split.splitter().unwrap().split(&records).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let registry = InMemoryRegistry::new();
    let config = fast_config();

    fraudscore::training::train_on_split(&config, &split, &dir.path().join("a"), &registry).unwrap();
    fraudscore::training::train_on_split(&config, &split, &dir.path().join("b"), &registry).unwrap();
    let a = registry.resolve(&ModelUri::version(common::MODEL_NAME, 1)).unwrap();
    let b = registry.resolve(&ModelUri::version(common::MODEL_NAME, 2)).unwrap();
    assert_eq!(a.pipeline, b.pipeline);
    assert_eq!(a.metrics, b.metrics);
}

#[test]
fn failed_run_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("bad.csv");
    std::fs::write(&csv_path, "Time,V1,Amount\n0,1.0,2.0\n").unwrap();
    let registry = InMemoryRegistry::new();

    let err = run_training(&fast_config(), &csv_path, &dir.path().join("out"), &registry).unwrap_err();
    assert!(matches!(err, FraudError::Schema(_)));
    assert!(registry.versions(common::MODEL_NAME).unwrap().is_empty());
}

#[test]
fn unpromoted_run_leaves_alias_alone() {
    let registry = Arc::new(InMemoryRegistry::new());
    let v1 = registry.publish(&common::constant_draft(0.02)).unwrap();
    registry.set_alias(common::MODEL_NAME, "production", v1).unwrap();

    let mut config = fast_config();
    config.training.promote_alias = None;
    let records = common::synthetic_records(200, 20, 9);
    let split = config.split.splitter().unwrap().split(&records).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let report = fraudscore::training::train_on_split(&config, &split, dir.path(), registry.as_ref()).unwrap();
    assert_eq!(report.version, ModelVersion(2));

    let service = InferenceService::new(registry, ModelUri::alias(common::MODEL_NAME, "production"));
    assert_eq!(service.load(), LoadOutcome::Loaded(v1));
    assert_eq!(service.state(), ServiceState::Ready);
}
