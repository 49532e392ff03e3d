use crate::cv::{cross_val_score, CvScore};
use crate::family::{Hyperparams, Model, ModelFamily};
use crate::trainer::select_best;
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult};
use firetype_metrics::accuracy;
use firetype_preprocessing::stratified_k_fold;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared flag that asks a running grid search to stop starting candidates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one grid candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateStatus {
    Scored { cv: CvScore },
    Failed { error: String },
    /// Not started because the search was cancelled.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCandidate {
    pub hyperparams: Hyperparams,
    pub status: CandidateStatus,
}

impl GridCandidate {
    pub fn cv(&self) -> Option<&CvScore> {
        match &self.status {
            CandidateStatus::Scored { cv } => Some(cv),
            _ => None,
        }
    }
}

/// Called with the grid index and status of each finished candidate.
#[derive(Clone)]
struct CandidateHook(Arc<dyn Fn(usize, &CandidateStatus) + Send + Sync>);

impl fmt::Debug for CandidateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CandidateHook")
    }
}

/// Result of a grid search and the model refit with the winning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub family: ModelFamily,
    pub best_params: Hyperparams,
    pub best_cv: CvScore,
    pub candidates: Vec<GridCandidate>,
    /// Outer-fold accuracy of the whole search, when a nested estimate was requested.
    pub nested: Option<CvScore>,
    pub model: Model,
}

impl TuningOutcome {
    pub fn n_scored(&self) -> usize {
        self.candidates.iter().filter(|c| c.cv().is_some()).count()
    }

    pub fn n_skipped(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Skipped)
            .count()
    }
}

/// Exhaustive search over one family's grid, scored by stratified k-fold accuracy.
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub grid: Vec<Hyperparams>,
    pub inner_folds: usize,
    /// 0 disables the nested estimate.
    pub outer_folds: usize,
    pub seed: u64,
    cancel: CancelToken,
    on_candidate: Option<CandidateHook>,
}

impl GridSearch {
    pub fn new(grid: Vec<Hyperparams>, inner_folds: usize, seed: u64) -> Self {
        GridSearch {
            grid,
            inner_folds,
            outer_folds: 0,
            seed,
            cancel: CancelToken::new(),
            on_candidate: None,
        }
    }

    pub fn with_outer_folds(mut self, outer_folds: usize) -> Self {
        self.outer_folds = outer_folds;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Observe each candidate as it finishes, e.g. for progress reporting.
    /// The hook runs on rayon workers, in completion order.
    pub fn with_candidate_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize, &CandidateStatus) + Send + Sync + 'static,
    {
        self.on_candidate = Some(CandidateHook(Arc::new(hook)));
        self
    }

    /// Score every candidate and return them with the index of the winner.
    fn search(&self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<(Vec<GridCandidate>, usize)> {
        if self.grid.is_empty() {
            return Err(FireError::Tuning("empty hyperparameter grid".into()));
        }
        if let Some(other) = self.grid.iter().find(|h| h.family() != self.grid[0].family()) {
            return Err(FireError::Tuning(format!(
                "grid mixes families {} and {}",
                self.grid[0].family(),
                other.family()
            )));
        }

        let candidates: Vec<GridCandidate> = self
            .grid
            .par_iter()
            .enumerate()
            .map(|(i, params)| {
                let status = if self.cancel.is_cancelled() {
                    CandidateStatus::Skipped
                } else {
                    match cross_val_score(params, self.seed, x, y, n_classes, self.inner_folds) {
                        Ok(cv) => {
                            debug!(params = %params, mean = cv.mean, "grid candidate scored");
                            CandidateStatus::Scored { cv }
                        }
                        Err(e) => {
                            warn!(params = %params, error = %e, "grid candidate failed");
                            CandidateStatus::Failed { error: e.to_string() }
                        }
                    }
                };
                if let Some(hook) = &self.on_candidate {
                    (hook.0)(i, &status);
                }
                GridCandidate {
                    hyperparams: params.clone(),
                    status,
                }
            })
            .collect();

        let scored: Vec<(usize, &CvScore)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.cv().map(|cv| (i, cv)))
            .collect();
        let best = select_best(scored.iter().map(|(_, cv)| *cv))
            .map(|j| scored[j].0)
            .ok_or_else(|| {
                let skipped = candidates.iter().filter(|c| c.status == CandidateStatus::Skipped).count();
                FireError::Tuning(format!(
                    "no candidate out of {} completed ({} skipped)",
                    candidates.len(),
                    skipped
                ))
            })?;
        Ok((candidates, best))
    }

    fn refit(&self, params: &Hyperparams, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<Model> {
        let mut model = params.build(self.seed);
        model.fit(x, y, n_classes)?;
        Ok(model)
    }

    /// Accuracy of search-then-refit on outer folds the search never saw.
    fn nested_estimate(&self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<CvScore> {
        let folds = stratified_k_fold(y, n_classes, self.outer_folds)?;
        let mut scores = Vec::with_capacity(folds.len());
        for (i, fold) in folds.iter().enumerate() {
            let x_train = x.select_rows(&fold.train);
            let y_train: Vec<usize> = fold.train.iter().map(|&r| y[r]).collect();
            let (candidates, best) = self.search(&x_train, &y_train, n_classes)?;
            let model = self.refit(&candidates[best].hyperparams, &x_train, &y_train, n_classes)?;

            let y_test: Vec<usize> = fold.test.iter().map(|&r| y[r]).collect();
            let score = accuracy(&y_test, &model.predict(&x.select_rows(&fold.test))?)?;
            debug!(outer_fold = i, score, "nested fold scored");
            scores.push(score);
        }
        Ok(CvScore::from_scores(scores))
    }

    /// Search the grid on the full training data and refit the winner.
    pub fn fit(&self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<TuningOutcome> {
        let (candidates, best) = self.search(x, y, n_classes)?;
        let best_params = candidates[best].hyperparams.clone();
        let best_cv = candidates[best].cv().cloned().ok_or_else(|| FireError::Tuning("winner has no score".into()))?;
        let model = self
            .refit(&best_params, x, y, n_classes)
            .map_err(|e| FireError::Tuning(format!("refit of {} failed: {}", best_params, e)))?;

        let nested = if self.outer_folds >= 2 && !self.cancel.is_cancelled() {
            match self.nested_estimate(x, y, n_classes) {
                Ok(score) => Some(score),
                Err(e) => {
                    warn!(error = %e, "nested estimate unavailable");
                    None
                }
            }
        } else {
            None
        };

        let outcome = TuningOutcome {
            family: best_params.family(),
            best_params,
            best_cv,
            candidates,
            nested,
            model,
        };
        info!(
            family = %outcome.family,
            params = %outcome.best_params,
            cv_mean = outcome.best_cv.mean,
            scored = outcome.n_scored(),
            skipped = outcome.n_skipped(),
            "grid search complete"
        );
        Ok(outcome)
    }
}
