use firetype_core::classifier::{argmax, check_fit_input, normalize_importances};
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{DecisionTreeRegressor, TreeParams};

/// Gradient Boosted Trees for multiclass classification.
///
/// Keeps one raw score per class, starting from the log class priors. Each
/// round fits one regression tree per class to the negative gradient of the
/// softmax cross-entropy (`onehot - p`) and adds it scaled by the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// `None` means unbounded depth.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    init: Vec<f64>,
    stages: Vec<Vec<DecisionTreeRegressor>>,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: Option<usize>) -> Self {
        GradientBoostingClassifier {
            n_estimators,
            learning_rate,
            max_depth,
            min_samples_split: 2,
            init: Vec::new(),
            stages: Vec::new(),
            n_features: 0,
        }
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    fn raw_scores(&self, x: &FeatureMatrix) -> FireResult<Vec<Vec<f64>>> {
        if self.init.is_empty() {
            return Err(FireError::NotFitted("GradientBoostingClassifier"));
        }
        if x.n_cols() != self.n_features {
            return Err(FireError::ShapeMismatch {
                expected: vec![self.n_features],
                got: vec![x.n_cols()],
            });
        }
        (0..x.n_rows())
            .map(|i| {
                let row = x.row(i);
                let mut scores = self.init.clone();
                for stage in &self.stages {
                    for (s, tree) in scores.iter_mut().zip(stage) {
                        *s += self.learning_rate * tree.predict_row(row)?;
                    }
                }
                Ok(scores)
            })
            .collect()
    }

    pub fn predict_proba(&self, x: &FeatureMatrix) -> FireResult<Vec<Vec<f64>>> {
        Ok(self.raw_scores(x)?.into_iter().map(softmax).collect())
    }
}

fn softmax(mut scores: Vec<f64>) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        total += *s;
    }
    for s in scores.iter_mut() {
        *s /= total;
    }
    scores
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
        check_fit_input(x, y, n_classes)?;
        if self.n_estimators == 0 {
            return Err(FireError::InvalidParameter("n_estimators must be positive".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(FireError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let n = x.n_rows();
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            ..TreeParams::default()
        };

        let mut counts = vec![0usize; n_classes];
        for &c in y {
            counts[c] += 1;
        }
        // An absent class gets the prior of a single row
        self.init = counts.iter().map(|&c| (c.max(1) as f64 / n as f64).ln()).collect();
        self.n_features = x.n_cols();
        self.stages.clear();

        let mut scores: Vec<Vec<f64>> = vec![self.init.clone(); n];
        for _round in 0..self.n_estimators {
            let probs: Vec<Vec<f64>> = scores.iter().cloned().map(softmax).collect();
            let stage = (0..n_classes)
                .into_par_iter()
                .map(|k| {
                    let residuals: Vec<f64> = (0..n)
                        .map(|i| (if y[i] == k { 1.0 } else { 0.0 }) - probs[i][k])
                        .collect();
                    let mut tree = DecisionTreeRegressor::new(params);
                    tree.fit(x, &residuals)?;
                    Ok(tree)
                })
                .collect::<FireResult<Vec<_>>>()?;

            for (i, row_scores) in scores.iter_mut().enumerate() {
                for (s, tree) in row_scores.iter_mut().zip(&stage) {
                    *s += self.learning_rate * tree.predict_row(x.row(i))?;
                }
            }
            self.stages.push(stage);
        }
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<usize>> {
        Ok(self.raw_scores(x)?.iter().map(|s| argmax(s)).collect())
    }

    /// Squared-error reduction summed over every tree in every stage.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.stages.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for tree in self.stages.iter().flatten() {
            for (t, v) in total.iter_mut().zip(tree.raw_importances()) {
                *t += v;
            }
        }
        Some(normalize_importances(total))
    }
}
