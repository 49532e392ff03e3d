use firetype_core::classifier::{argmax, check_fit_input};
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Optimizer used to fit the logistic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Full-batch gradient descent.
    GradientDescent,
    /// Per-sample stochastic gradient descent with a seeded visiting order.
    Sgd,
}

/// Multinomial logistic regression (softmax) with L2 regularization.
///
/// `c` is the inverse regularization strength: the penalty on the mean
/// log-loss is `||W||² / (2·c·n)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub c: f64,
    pub solver: Solver,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
    weights: Vec<f64>,
    bias: Vec<f64>,
    n_classes: usize,
    n_features: usize,
}

impl LogisticRegression {
    pub fn new(c: f64, solver: Solver, max_iter: usize, seed: u64) -> Self {
        LogisticRegression {
            c,
            solver,
            learning_rate: 0.1,
            max_iter,
            tol: 1e-6,
            seed,
            weights: Vec::new(),
            bias: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    fn is_fitted(&self) -> bool {
        self.n_classes > 0
    }

    /// Softmax probabilities for one row, written into `out`.
    fn softmax_row(&self, row: &[f64], out: &mut [f64]) {
        let p = self.n_features;
        for (k, o) in out.iter_mut().enumerate() {
            let w = &self.weights[k * p..(k + 1) * p];
            *o = self.bias[k] + w.iter().zip(row).map(|(a, b)| a * b).sum::<f64>();
        }
        let max = out.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut total = 0.0;
        for o in out.iter_mut() {
            *o = (*o - max).exp();
            total += *o;
        }
        for o in out.iter_mut() {
            *o /= total;
        }
    }

    fn fit_gradient_descent(&mut self, x: &FeatureMatrix, y: &[usize]) {
        let n = x.n_rows();
        let (k, p) = (self.n_classes, self.n_features);
        let n_f = n as f64;
        let reg = 1.0 / (self.c * n_f);
        let mut probs = vec![0.0; k];

        for _iter in 0..self.max_iter {
            let mut dw = vec![0.0; k * p];
            let mut db = vec![0.0; k];
            for i in 0..n {
                let row = x.row(i);
                self.softmax_row(row, &mut probs);
                for c in 0..k {
                    let err = probs[c] - if y[i] == c { 1.0 } else { 0.0 };
                    db[c] += err;
                    for (g, v) in dw[c * p..(c + 1) * p].iter_mut().zip(row) {
                        *g += err * v;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for (w, g) in self.weights.iter_mut().zip(&dw) {
                let grad = g / n_f + reg * *w;
                *w -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }
            for (b, g) in self.bias.iter_mut().zip(&db) {
                let grad = g / n_f;
                *b -= self.learning_rate * grad;
                max_grad = max_grad.max(grad.abs());
            }

            if max_grad < self.tol {
                break;
            }
        }
    }

    fn fit_sgd(&mut self, x: &FeatureMatrix, y: &[usize]) {
        let n = x.n_rows();
        let (k, p) = (self.n_classes, self.n_features);
        let reg = 1.0 / (self.c * n as f64);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n).collect();
        let mut probs = vec![0.0; k];

        for epoch in 0..self.max_iter {
            order.shuffle(&mut rng);
            let lr = self.learning_rate / (1.0 + epoch as f64).sqrt();
            for &i in &order {
                let row = x.row(i);
                self.softmax_row(row, &mut probs);
                for c in 0..k {
                    let err = probs[c] - if y[i] == c { 1.0 } else { 0.0 };
                    self.bias[c] -= lr * err;
                    for (w, v) in self.weights[c * p..(c + 1) * p].iter_mut().zip(row) {
                        *w -= lr * (err * v + reg * *w);
                    }
                }
            }
        }
    }

    /// Class probabilities, one row of `n_classes` values per input row.
    pub fn predict_proba(&self, x: &FeatureMatrix) -> FireResult<Vec<Vec<f64>>> {
        if !self.is_fitted() {
            return Err(FireError::NotFitted("LogisticRegression"));
        }
        if x.n_cols() != self.n_features {
            return Err(FireError::ShapeMismatch {
                expected: vec![self.n_features],
                got: vec![x.n_cols()],
            });
        }
        Ok((0..x.n_rows())
            .map(|i| {
                let mut probs = vec![0.0; self.n_classes];
                self.softmax_row(x.row(i), &mut probs);
                probs
            })
            .collect())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
        check_fit_input(x, y, n_classes)?;
        if self.c <= 0.0 {
            return Err(FireError::InvalidParameter(format!("c must be positive, got {}", self.c)));
        }
        self.n_classes = n_classes;
        self.n_features = x.n_cols();
        self.weights = vec![0.0; n_classes * self.n_features];
        self.bias = vec![0.0; n_classes];

        match self.solver {
            Solver::GradientDescent => self.fit_gradient_descent(x, y),
            Solver::Sgd => self.fit_sgd(x, y),
        }
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<usize>> {
        Ok(self.predict_proba(x)?.iter().map(|p| argmax(p)).collect())
    }
}
