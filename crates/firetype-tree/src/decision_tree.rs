use firetype_core::classifier::{argmax, check_fit_input, normalize_importances};
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A node in the flattened tree. Children are indices into `Tree::nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    /// Internal node: rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaf: predicts a class index or regression value.
    Leaf { value: f64 },
}

/// Fitted tree stored as a node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Growth limits shared by classification and regression trees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered at each split; `None` means all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

// ─── Split statistics ───────────────────────────────────────────────────────

/// Running statistics of the targets of a set of rows.
pub(crate) trait SplitStats: Clone {
    fn clear(&mut self);
    fn push(&mut self, sample: usize);
    fn pop(&mut self, sample: usize);
    fn n(&self) -> usize;
    /// Impurity multiplied by the row count.
    fn weighted_impurity(&self) -> f64;
    fn leaf_value(&self) -> f64;
}

/// Gini impurity over class counts.
#[derive(Clone)]
pub(crate) struct GiniStats<'a> {
    y: &'a [usize],
    counts: Vec<usize>,
    n: usize,
}

impl<'a> GiniStats<'a> {
    pub(crate) fn new(y: &'a [usize], n_classes: usize) -> Self {
        GiniStats { y, counts: vec![0; n_classes], n: 0 }
    }
}

impl SplitStats for GiniStats<'_> {
    fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.n = 0;
    }

    fn push(&mut self, sample: usize) {
        self.counts[self.y[sample]] += 1;
        self.n += 1;
    }

    fn pop(&mut self, sample: usize) {
        self.counts[self.y[sample]] -= 1;
        self.n -= 1;
    }

    fn n(&self) -> usize {
        self.n
    }

    fn weighted_impurity(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let n = self.n as f64;
        let sum_sq: f64 = self.counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
        n - sum_sq / n
    }

    fn leaf_value(&self) -> f64 {
        let counts: Vec<f64> = self.counts.iter().map(|&c| c as f64).collect();
        argmax(&counts) as f64
    }
}

/// Squared error around the mean.
#[derive(Clone)]
pub(crate) struct MseStats<'a> {
    y: &'a [f64],
    sum: f64,
    sum_sq: f64,
    n: usize,
}

impl<'a> MseStats<'a> {
    pub(crate) fn new(y: &'a [f64]) -> Self {
        MseStats { y, sum: 0.0, sum_sq: 0.0, n: 0 }
    }
}

impl SplitStats for MseStats<'_> {
    fn clear(&mut self) {
        self.sum = 0.0;
        self.sum_sq = 0.0;
        self.n = 0;
    }

    fn push(&mut self, sample: usize) {
        let v = self.y[sample];
        self.sum += v;
        self.sum_sq += v * v;
        self.n += 1;
    }

    fn pop(&mut self, sample: usize) {
        let v = self.y[sample];
        self.sum -= v;
        self.sum_sq -= v * v;
        self.n -= 1;
    }

    fn n(&self) -> usize {
        self.n
    }

    fn weighted_impurity(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        (self.sum_sq - self.sum * self.sum / self.n as f64).max(0.0)
    }

    fn leaf_value(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }
}

// ─── Growing ────────────────────────────────────────────────────────────────

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

pub(crate) struct Grower<'a, S: SplitStats> {
    x: &'a FeatureMatrix,
    params: TreeParams,
    proto: S,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

fn by_feature(x: &FeatureMatrix, f: usize) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    move |&a, &b| x.get(a, f).partial_cmp(&x.get(b, f)).unwrap_or(Ordering::Equal)
}

impl<'a, S: SplitStats> Grower<'a, S> {
    pub(crate) fn new(x: &'a FeatureMatrix, params: TreeParams, proto: S, seed: u64) -> Self {
        Grower {
            x,
            params,
            proto,
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
            importances: vec![0.0; x.n_cols()],
        }
    }

    /// Grow the tree over `indices`; returns the tree and raw importances.
    pub(crate) fn run(mut self, indices: &mut [usize]) -> (Tree, Vec<f64>) {
        self.grow(indices, 0);
        (Tree { nodes: self.nodes }, self.importances)
    }

    fn stats_of(&self, indices: &[usize]) -> S {
        let mut s = self.proto.clone();
        s.clear();
        for &i in indices {
            s.push(i);
        }
        s
    }

    fn grow(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let parent = self.stats_of(indices);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: parent.leaf_value() });

        let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
        if depth_reached
            || indices.len() < self.params.min_samples_split.max(2)
            || parent.weighted_impurity() <= 1e-12
        {
            return id;
        }

        let best = match self.best_split(indices, &parent) {
            Some(b) => b,
            None => return id,
        };

        indices.sort_by(by_feature(self.x, best.feature));
        let n_left = indices
            .iter()
            .take_while(|&&i| self.x.get(i, best.feature) <= best.threshold)
            .count();
        self.importances[best.feature] += parent.weighted_impurity() - best.score;

        let (l, r) = indices.split_at_mut(n_left);
        let left = self.grow(l, depth + 1);
        let right = self.grow(r, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let p = self.x.n_cols();
        let mut features: Vec<usize> = (0..p).collect();
        if let Some(m) = self.params.max_features {
            if m < p {
                features.shuffle(&mut self.rng);
                features.truncate(m.max(1));
            }
        }
        features
    }

    fn best_split(&mut self, indices: &mut [usize], parent: &S) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;
        let mut best_score = parent.weighted_impurity() - 1e-12;

        for f in self.candidate_features() {
            indices.sort_by(by_feature(self.x, f));
            let mut left = self.proto.clone();
            left.clear();
            let mut right = parent.clone();

            for pos in 0..n - 1 {
                let i = indices[pos];
                left.push(i);
                right.pop(i);

                let v = self.x.get(i, f);
                let next = self.x.get(indices[pos + 1], f);
                if next <= v {
                    continue;
                }
                if left.n() < min_leaf || right.n() < min_leaf {
                    continue;
                }
                let score = left.weighted_impurity() + right.weighted_impurity();
                if score < best_score {
                    best_score = score;
                    let mid = v + (next - v) / 2.0;
                    best = Some(BestSplit {
                        feature: f,
                        threshold: if mid < next { mid } else { v },
                        score,
                    });
                }
            }
        }
        best
    }
}

// ─── Classifier ─────────────────────────────────────────────────────────────

/// Decision Tree Classifier using CART (Gini impurity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    pub params: TreeParams,
    pub seed: u64,
    tree: Option<Tree>,
    importances: Vec<f64>,
    n_features: usize,
}

impl DecisionTreeClassifier {
    pub fn new(params: TreeParams, seed: u64) -> Self {
        DecisionTreeClassifier {
            params,
            seed,
            tree: None,
            importances: Vec::new(),
            n_features: 0,
        }
    }

    /// Fit on a subset of rows (duplicates allowed, as in a bootstrap sample).
    pub fn fit_rows(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize, rows: &[usize]) -> FireResult<()> {
        check_fit_input(x, y, n_classes)?;
        if rows.is_empty() {
            return Err(FireError::InsufficientData("cannot grow a tree on zero rows".into()));
        }
        let mut indices = rows.to_vec();
        let grower = Grower::new(x, self.params, GiniStats::new(y, n_classes), self.seed);
        let (tree, raw) = grower.run(&mut indices);
        self.tree = Some(tree);
        self.importances = raw;
        self.n_features = x.n_cols();
        Ok(())
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Unnormalized impurity decrease per feature.
    pub fn raw_importances(&self) -> &[f64] {
        &self.importances
    }

    pub(crate) fn predict_row(&self, row: &[f64]) -> FireResult<usize> {
        let tree = self.tree.as_ref().ok_or(FireError::NotFitted("DecisionTreeClassifier"))?;
        Ok(tree.predict_row(row).round() as usize)
    }
}

impl Classifier for DecisionTreeClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
        let rows: Vec<usize> = (0..x.n_rows()).collect();
        self.fit_rows(x, y, n_classes, &rows)
    }

    fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<usize>> {
        if self.tree.is_some() && x.n_cols() != self.n_features {
            return Err(FireError::ShapeMismatch {
                expected: vec![self.n_features],
                got: vec![x.n_cols()],
            });
        }
        (0..x.n_rows()).map(|i| self.predict_row(x.row(i))).collect()
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.tree.as_ref().map(|_| normalize_importances(self.importances.clone()))
    }
}

// ─── Regressor ──────────────────────────────────────────────────────────────

/// Decision Tree Regressor using CART (MSE criterion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub params: TreeParams,
    tree: Option<Tree>,
    importances: Vec<f64>,
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeRegressor {
            params,
            tree: None,
            importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FireResult<()> {
        if x.n_rows() != y.len() {
            return Err(FireError::ShapeMismatch {
                expected: vec![x.n_rows()],
                got: vec![y.len()],
            });
        }
        if x.is_empty() {
            return Err(FireError::InsufficientData("cannot grow a tree on zero rows".into()));
        }
        let mut indices: Vec<usize> = (0..x.n_rows()).collect();
        let grower = Grower::new(x, self.params, MseStats::new(y), 0);
        let (tree, raw) = grower.run(&mut indices);
        self.tree = Some(tree);
        self.importances = raw;
        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> FireResult<f64> {
        let tree = self.tree.as_ref().ok_or(FireError::NotFitted("DecisionTreeRegressor"))?;
        Ok(tree.predict_row(row))
    }

    pub fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<f64>> {
        (0..x.n_rows()).map(|i| self.predict_row(x.row(i))).collect()
    }

    pub fn raw_importances(&self) -> &[f64] {
        &self.importances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> FeatureMatrix {
        FeatureMatrix::from_columns(vec![("x".into(), values.to_vec())]).unwrap()
    }

    #[test]
    fn test_decision_tree_classifier() {
        let x = column(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];

        let mut tree = DecisionTreeClassifier::new(TreeParams::default(), 0);
        tree.fit(&x, &y, 2).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.tree().unwrap().depth(), 1);
        assert_eq!(tree.feature_importances().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_threshold_between_values() {
        let x = column(&[1.0, 2.0, 10.0, 11.0]);
        let mut tree = DecisionTreeClassifier::new(TreeParams::default(), 0);
        tree.fit(&x, &[0, 0, 2, 2], 3).unwrap();
        let probe = column(&[5.9, 6.1]);
        assert_eq!(tree.predict(&probe).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = column(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = vec![0, 1, 0, 1, 0, 1];
        let params = TreeParams { max_depth: Some(1), ..TreeParams::default() };
        let mut tree = DecisionTreeClassifier::new(params, 0);
        tree.fit(&x, &y, 2).unwrap();
        assert!(tree.tree().unwrap().depth() <= 1);
    }

    #[test]
    fn test_importances_prefer_informative_feature() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![(i % 3) as f64, if i < 10 { 0.0 } else { 1.0 }])
            .collect();
        let y: Vec<usize> = (0..20).map(|i| if i < 10 { 0 } else { 1 }).collect();
        let x = FeatureMatrix::from_rows(&rows, vec!["noise".into(), "signal".into()]).unwrap();
        let mut tree = DecisionTreeClassifier::new(TreeParams::default(), 0);
        tree.fit(&x, &y, 2).unwrap();
        let imp = tree.feature_importances().unwrap();
        assert_eq!(imp, vec![0.0, 1.0]);
    }

    #[test]
    fn test_decision_tree_regressor() {
        let x = column(&[1.0, 2.0, 3.0, 4.0]);
        let y = vec![2.0, 4.0, 6.0, 8.0];

        let mut tree = DecisionTreeRegressor::new(TreeParams::default());
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();
        for i in 0..4 {
            assert!((pred[i] - y[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTreeClassifier::new(TreeParams::default(), 0);
        assert_eq!(tree.predict(&column(&[1.0])).unwrap_err().kind(), "NotFittedError");
    }
}
