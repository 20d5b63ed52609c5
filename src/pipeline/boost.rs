//! Gradient-boosted decision trees for binary classification (logistic loss).
//!
//! Splits are searched over per-feature quantile cut points with gradient/hessian
//! histograms. Leaf weights are stored pre-multiplied by the learning rate.

use crate::error::{FraudError, FraudResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularisation on leaf weights.
    pub lambda: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
    pub max_bins: usize,
    /// Fraud is predicted when the positive-class probability exceeds this.
    pub decision_threshold: f64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
            max_bins: 64,
            decision_threshold: 0.5,
        }
    }
}

impl BoostParams {
    pub fn validate(&self) -> FraudResult<()> {
        if self.n_estimators == 0 {
            return Err(FraudError::Config("n_estimators must be positive".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(FraudError::Config("learning_rate must be positive".into()));
        }
        if !(self.lambda >= 0.0) || !(self.min_child_weight >= 0.0) {
            return Err(FraudError::Config("lambda and min_child_weight must be non-negative".into()));
        }
        if self.max_bins < 2 || self.max_bins > u16::MAX as usize {
            return Err(FraudError::Config(format!("max_bins must be in 2..={}", u16::MAX)));
        }
        if !(self.decision_threshold > 0.0 && self.decision_threshold < 1.0) {
            return Err(FraudError::Config("decision_threshold must be in (0, 1)".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// `None` on a malformed tree (bad index or cycle).
    fn predict(&self, row: &[f64]) -> Option<f64> {
        let mut i = 0;
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(i)? {
                Node::Leaf { value } => return Some(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if *row.get(*feature)? <= *threshold { *left } else { *right };
                }
            }
        }
        None
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

/// Candidate thresholds for one column: midpoints between distinct values,
/// thinned to at most `max_bins - 1` quantile cuts.
fn cut_points(mut values: Vec<f64>, max_bins: usize) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values.dedup();
    if values.len() < 2 {
        return Vec::new();
    }
    let mid = |i: usize| values[i - 1] + (values[i] - values[i - 1]) / 2.0;
    let mut cuts: Vec<f64> = if values.len() <= max_bins {
        (1..values.len()).map(mid).collect()
    } else {
        (1..max_bins).map(|k| mid((k * values.len() / max_bins).max(1))).collect()
    };
    cuts.dedup();
    cuts
}

/// Bin index such that `x <= cuts[b]` iff `bin(x) <= b`.
fn bin_of(cuts: &[f64], x: f64) -> u16 {
    cuts.partition_point(|&c| c < x) as u16
}

struct Grower<'a> {
    bins: &'a [u16],
    n_features: usize,
    cuts: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoostParams,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();
        let leaf = Node::Leaf {
            value: -g / (h + self.params.lambda) * self.params.learning_rate,
        };
        if depth >= self.params.max_depth || rows.len() < 2 {
            return self.push(leaf);
        }
        let Some((feature, bin)) = self.best_split(&rows, g, h) else {
            return self.push(leaf);
        };

        let nf = self.n_features;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| (self.bins[r * nf + feature] as usize) <= bin);

        let idx = self.push(Node::Leaf { value: 0.0 });
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature,
            threshold: self.cuts[feature][bin],
            left,
            right,
        };
        idx
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<(usize, usize)> {
        let lambda = self.params.lambda;
        let mcw = self.params.min_child_weight;
        let parent = g * g / (h + lambda);
        let nf = self.n_features;
        let mut best: Option<(usize, usize, f64)> = None;

        for (f, cuts) in self.cuts.iter().enumerate() {
            if cuts.is_empty() {
                continue;
            }
            let mut hist_g = vec![0.0; cuts.len() + 1];
            let mut hist_h = vec![0.0; cuts.len() + 1];
            for &r in rows {
                let b = self.bins[r * nf + f] as usize;
                hist_g[b] += self.grad[r];
                hist_h[b] += self.hess[r];
            }
            let (mut gl, mut hl) = (0.0, 0.0);
            for b in 0..cuts.len() {
                gl += hist_g[b];
                hl += hist_h[b];
                let (gr, hr) = (g - gl, h - hl);
                if hl < mcw || hr < mcw {
                    continue;
                }
                let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent);
                if gain > 1e-12 && best.map_or(true, |(_, _, bg)| gain > bg) {
                    best = Some((f, b, gain));
                }
            }
        }
        best.map(|(f, b, _)| (f, b))
    }
}

/// Fitted boosted ensemble. Immutable after `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostParams,
    n_features: usize,
    base_margin: f64,
    trees: Vec<Tree>,
}

impl GradientBoostedTrees {
    pub fn fit(x: &Array2<f64>, y: &[u8], params: &BoostParams) -> FraudResult<Self> {
        params.validate()?;
        let (n, nf) = x.dim();
        if n == 0 || n != y.len() {
            return Err(FraudError::InsufficientData(format!(
                "classifier needs matching non-empty features/labels ({} rows, {} labels)",
                n,
                y.len()
            )));
        }
        let data: Vec<f64> = x.iter().copied().collect();
        let target: Vec<f64> = y.iter().map(|&l| if l == 1 { 1.0 } else { 0.0 }).collect();

        let cuts: Vec<Vec<f64>> = (0..nf)
            .map(|f| cut_points(x.column(f).to_vec(), params.max_bins))
            .collect();
        let bins: Vec<u16> = (0..n * nf).map(|i| bin_of(&cuts[i % nf], data[i])).collect();

        let base_margin = logit(target.iter().sum::<f64>() / n as f64);
        let mut margin = vec![base_margin; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators {
            for i in 0..n {
                let p = sigmoid(margin[i]);
                grad[i] = p - target[i];
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }
            let mut grower = Grower {
                bins: &bins,
                n_features: nf,
                cuts: &cuts,
                grad: &grad,
                hess: &hess,
                params,
                nodes: Vec::new(),
            };
            grower.grow((0..n).collect(), 0);
            let tree = Tree { nodes: grower.nodes };
            for (i, m) in margin.iter_mut().enumerate() {
                *m += tree.predict(&data[i * nf..(i + 1) * nf]).unwrap_or(0.0);
            }
            if round % 25 == 0 {
                debug!(round, nodes = tree.nodes.len(), "boosting round");
            }
            trees.push(tree);
        }

        Ok(Self {
            params: params.clone(),
            n_features: nf,
            base_margin,
            trees,
        })
    }

    /// Ensemble with no trees that always returns `probability`.
    pub fn constant(probability: f64, n_features: usize) -> Self {
        Self {
            params: BoostParams::default(),
            n_features,
            base_margin: logit(probability),
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &BoostParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Positive-class probability for one scaled row. `None` if the ensemble is malformed
    /// or the row has the wrong width.
    pub fn predict_proba_row(&self, row: &[f64]) -> Option<f64> {
        if row.len() != self.n_features {
            return None;
        }
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.predict(row)?;
        }
        Some(sigmoid(margin))
    }
}
