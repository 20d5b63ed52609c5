//! Hold-out evaluation: ROC-AUC on positive-class probabilities, F1 on hard labels.

use crate::error::{FraudError, FraudResult};
use crate::features::Label;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub roc_auc: f64,
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn support(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share their average rank.
pub fn roc_auc(labels: &[Label], scores: &[f64]) -> FraudResult<f64> {
    if labels.len() != scores.len() {
        return Err(FraudError::Schema(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    let n_pos = labels.iter().filter(|&&l| l == Label::Fraud).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(FraudError::DegenerateEvaluation(format!(
            "ROC-AUC needs both classes ({} fraud, {} legit)",
            n_pos, n_neg
        )));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their mean.
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &k in &order[i..=j] {
            if labels[k] == Label::Fraud {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }
    let n_pos = n_pos as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn evaluate(labels: &[Label], fraud_probabilities: &[f64], predictions: &[Label]) -> FraudResult<EvaluationMetrics> {
    if labels.len() != predictions.len() {
        return Err(FraudError::Schema(format!(
            "{} labels but {} predictions",
            labels.len(),
            predictions.len()
        )));
    }
    let roc_auc = roc_auc(labels, fraud_probabilities)?;

    let (mut tp, mut fp, mut tn, mut fn_) = (0, 0, 0, 0);
    for (truth, pred) in labels.iter().zip(predictions) {
        match (truth, pred) {
            (Label::Fraud, Label::Fraud) => tp += 1,
            (Label::Legit, Label::Fraud) => fp += 1,
            (Label::Legit, Label::Legit) => tn += 1,
            (Label::Fraud, Label::Legit) => fn_ += 1,
        }
    }
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(EvaluationMetrics {
        roc_auc,
        f1_score,
        precision,
        recall,
        accuracy: ratio(tp + tn, labels.len()),
        true_positives: tp,
        false_positives: fp,
        true_negatives: tn,
        false_negatives: fn_,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Fraud, Legit};

    #[test]
    fn perfect_ranking_scores_one() {
        let auc = roc_auc(&[Legit, Legit, Fraud, Fraud], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert_eq!(auc, 1.0);
    }

    #[test]
    fn ties_count_half() {
        let auc = roc_auc(&[Legit, Fraud], &[0.5, 0.5]).unwrap();
        assert_eq!(auc, 0.5);
    }

    #[test]
    fn matches_pairwise_definition() {
        let labels = [Legit, Fraud, Legit, Fraud, Legit];
        let scores = [0.3, 0.35, 0.4, 0.8, 0.1];
        // Fraud 0.35 beats 0.3 and 0.1; fraud 0.8 beats all three: 5 of 6 pairs.
        let auc = roc_auc(&labels, &scores).unwrap();
        assert!((auc - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_degenerate() {
        let err = roc_auc(&[Legit, Legit], &[0.1, 0.2]).unwrap_err();
        assert!(matches!(err, FraudError::DegenerateEvaluation(_)));
    }

    #[test]
    fn f1_from_confusion_counts() {
        let labels = [Fraud, Fraud, Legit, Legit];
        let preds = [Fraud, Legit, Fraud, Legit];
        let m = evaluate(&labels, &[0.9, 0.4, 0.6, 0.1], &preds).unwrap();
        assert_eq!((m.true_positives, m.false_negatives, m.false_positives, m.true_negatives), (1, 1, 1, 1));
        assert!((m.f1_score - 0.5).abs() < 1e-12);
        assert_eq!(m.support(), 4);
    }
}
