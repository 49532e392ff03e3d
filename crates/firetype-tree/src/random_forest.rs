use firetype_core::classifier::{argmax, check_fit_input, normalize_importances};
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{DecisionTreeClassifier, TreeParams};

/// Random Forest Classifier: bagged CART trees with per-split feature subsampling.
///
/// Tree `t` draws its bootstrap sample from a generator seeded with
/// `seed + t`, so the forest is identical regardless of how rayon schedules
/// the trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    /// `None` grows every tree to purity.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features_ratio: f64,
    pub seed: u64,
    trees: Vec<DecisionTreeClassifier>,
    n_classes: usize,
    n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize, max_depth: Option<usize>, min_samples_split: usize, seed: u64) -> Self {
        RandomForestClassifier {
            n_estimators,
            max_depth,
            min_samples_split,
            max_features_ratio: 0.0,
            seed,
            trees: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    /// Features tried at each split; a non-positive ratio means `sqrt(p)`.
    fn max_features(&self, p: usize) -> usize {
        let m = if self.max_features_ratio > 0.0 {
            (p as f64 * self.max_features_ratio).ceil() as usize
        } else {
            (p as f64).sqrt().ceil() as usize
        };
        m.clamp(1, p.max(1))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fraction of trees voting for each class.
    pub fn predict_proba(&self, x: &FeatureMatrix) -> FireResult<Vec<Vec<f64>>> {
        if self.trees.is_empty() {
            return Err(FireError::NotFitted("RandomForestClassifier"));
        }
        if x.n_cols() != self.n_features {
            return Err(FireError::ShapeMismatch {
                expected: vec![self.n_features],
                got: vec![x.n_cols()],
            });
        }
        let n_trees = self.trees.len() as f64;
        (0..x.n_rows())
            .map(|i| {
                let mut votes = vec![0.0; self.n_classes];
                for tree in &self.trees {
                    let cls = tree.predict_row(x.row(i))?;
                    if cls < self.n_classes {
                        votes[cls] += 1.0;
                    }
                }
                Ok(votes.into_iter().map(|v| v / n_trees).collect())
            })
            .collect()
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
        check_fit_input(x, y, n_classes)?;
        if self.n_estimators == 0 {
            return Err(FireError::InvalidParameter("n_estimators must be positive".into()));
        }
        let n = x.n_rows();
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: 1,
            max_features: Some(self.max_features(x.n_cols())),
        };

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree = DecisionTreeClassifier::new(params, rng.gen());
                tree.fit_rows(x, y, n_classes, &sample)?;
                Ok(tree)
            })
            .collect::<FireResult<Vec<_>>>()?;

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = x.n_cols();
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<usize>> {
        Ok(self.predict_proba(x)?.iter().map(|p| argmax(p)).collect())
    }

    /// Mean of the per-tree normalized impurity decreases.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let per_tree = normalize_importances(tree.raw_importances().to_vec());
            for (t, v) in total.iter_mut().zip(per_tree) {
                *t += v;
            }
        }
        Some(normalize_importances(total))
    }
}
