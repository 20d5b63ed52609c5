//! Offline training run: load → split → persist tables → fit → evaluate → publish.
//!
//! Any error aborts the run before `publish`, so a failed run never leaves a
//! partial artifact in the registry.

use crate::config::AppConfig;
use crate::data::{self, DatasetSplit, SplitPaths};
use crate::error::FraudResult;
use crate::features::{FeatureSchema, FeatureVector, Label};
use crate::pipeline::{EvaluationMetrics, TrainingPipeline};
use crate::registry::{ArtifactDraft, ModelRegistry, ModelVersion};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Rows of the training set stored alongside the artifact as its input example.
const INPUT_EXAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub run_id: Uuid,
    pub model_name: String,
    pub version: ModelVersion,
    pub promoted_alias: Option<String>,
    pub metrics: EvaluationMetrics,
    pub tables: SplitPaths,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Train from a labeled CSV and publish the result.
pub fn run_training(
    config: &AppConfig,
    source: &Path,
    out_dir: &Path,
    registry: &dyn ModelRegistry,
) -> FraudResult<TrainingReport> {
    let records = data::load_labeled_csv(source)?;
    let split = config.split.splitter()?.split(&records)?;
    train_on_split(config, &split, out_dir, registry)
}

/// Everything after the split; exposed so callers with records already in
/// memory can skip CSV parsing.
pub fn train_on_split(
    config: &AppConfig,
    split: &DatasetSplit,
    out_dir: &Path,
    registry: &dyn ModelRegistry,
) -> FraudResult<TrainingReport> {
    let run_id = Uuid::new_v4();
    let training = &config.training;
    info!(
        %run_id,
        model = %training.model_name,
        n_estimators = training.classifier.n_estimators,
        max_depth = training.classifier.max_depth,
        learning_rate = training.classifier.learning_rate,
        smote_k = training.smote.k_neighbors,
        "training run started"
    );

    let tables = data::write_split(out_dir, split)?;

    let mut pipeline = TrainingPipeline::with_smote(training.smote.clone(), training.classifier.clone());
    pipeline.fit_records(&split.train)?;
    let fitted = pipeline.into_fitted()?;

    let test_x: Vec<FeatureVector> = split.test.iter().map(|r| r.features).collect();
    let test_y: Vec<Label> = split.test.iter().map(|r| r.label).collect();
    let metrics = fitted.evaluate(&test_x, &test_y)?;
    info!(
        roc_auc = metrics.roc_auc,
        f1_score = metrics.f1_score,
        precision = metrics.precision,
        recall = metrics.recall,
        "hold-out evaluation"
    );

    let input_example = split
        .train
        .iter()
        .take(INPUT_EXAMPLE_ROWS)
        .map(|r| r.features.as_slice().to_vec())
        .collect();
    let draft = ArtifactDraft::new(fitted, training.model_name.clone(), metrics.clone(), FeatureSchema::canonical())
        .with_run_id(run_id)
        .with_input_example(input_example);
    let version = registry.publish(&draft)?;
    info!(model = %training.model_name, version = version.0, "model published");

    if let Some(alias) = &training.promote_alias {
        registry.set_alias(&training.model_name, alias, version)?;
        info!(model = %training.model_name, alias = %alias, version = version.0, "alias promoted");
    }

    Ok(TrainingReport {
        run_id,
        model_name: training.model_name.clone(),
        version,
        promoted_alias: training.promote_alias.clone(),
        metrics,
        tables,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    })
}
