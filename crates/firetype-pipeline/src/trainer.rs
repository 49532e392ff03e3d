use crate::cv::{cross_val_score, CvScore};
use crate::family::{Hyperparams, Model, ModelFamily};
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult};
use firetype_metrics::accuracy;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Scores of one fitted candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub hyperparams: Hyperparams,
    pub model: Model,
    pub test_accuracy: f64,
    pub cv: CvScore,
    pub test_predictions: Vec<usize>,
}

impl CandidateResult {
    pub fn family(&self) -> ModelFamily {
        self.hyperparams.family()
    }
}

/// All candidates in declaration order plus the index of the winner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub results: Vec<CandidateResult>,
    pub best: usize,
}

impl TrainingOutcome {
    pub fn best(&self) -> &CandidateResult {
        &self.results[self.best]
    }

    pub fn get(&self, name: &str) -> Option<&CandidateResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Index of the best score: highest mean, then lowest std, then earliest.
pub fn select_best<'a, I>(scores: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a CvScore>,
{
    let mut best: Option<(usize, &CvScore)> = None;
    for (i, s) in scores.into_iter().enumerate() {
        match best {
            Some((_, b)) if !s.beats(b) => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Fits every candidate family, scores it on the held-out set and by
/// cross-validation on the training set only.
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    pub candidates: Vec<Hyperparams>,
    pub cv_folds: usize,
    pub seed: u64,
}

impl ModelTrainer {
    pub fn new(candidates: Vec<Hyperparams>, cv_folds: usize, seed: u64) -> Self {
        ModelTrainer {
            candidates,
            cv_folds,
            seed,
        }
    }

    pub fn train(
        &self,
        x_train: &FeatureMatrix,
        y_train: &[usize],
        x_test: &FeatureMatrix,
        y_test: &[usize],
        n_classes: usize,
    ) -> FireResult<TrainingOutcome> {
        if self.candidates.is_empty() {
            return Err(FireError::InvalidParameter("no candidate models configured".into()));
        }

        let mut results = Vec::with_capacity(self.candidates.len());
        for params in &self.candidates {
            let name = params.family().name().to_string();
            let mut model = params.build(self.seed);
            model.fit(x_train, y_train, n_classes)?;
            let test_predictions = model.predict(x_test)?;
            let test_accuracy = accuracy(y_test, &test_predictions)?;
            let cv = cross_val_score(params, self.seed, x_train, y_train, n_classes, self.cv_folds)?;

            info!(
                model = %name,
                test_accuracy,
                cv_mean = cv.mean,
                cv_std = cv.std,
                "candidate trained"
            );
            results.push(CandidateResult {
                name,
                hyperparams: params.clone(),
                model,
                test_accuracy,
                cv,
                test_predictions,
            });
        }

        let best = select_best(results.iter().map(|r| &r.cv)).unwrap_or(0);
        info!(best = %results[best].name, cv_mean = results[best].cv.mean, "best candidate selected");
        Ok(TrainingOutcome { results, best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{BoostingParams, ForestParams, LogisticParams};

    fn score(mean: f64, std: f64) -> CvScore {
        CvScore {
            fold_scores: Vec::new(),
            mean,
            std,
        }
    }

    #[test]
    fn test_select_best_rule() {
        assert_eq!(select_best(&[score(0.5, 0.1), score(0.75, 0.2), score(0.625, 0.0)]), Some(1));
        // equal means fall back to the lower spread
        assert_eq!(select_best(&[score(0.75, 0.25), score(0.75, 0.125)]), Some(1));
        // full tie keeps declaration order
        assert_eq!(select_best(&[score(0.75, 0.125), score(0.75, 0.125)]), Some(0));
        assert_eq!(select_best(&Vec::<CvScore>::new()), None);
    }

    fn blobs(offset: f64) -> (FeatureMatrix, Vec<usize>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for c in 0..3 {
            for i in 0..12 {
                let t = i as f64 * 0.05 + offset;
                rows.push(vec![c as f64 * 3.0 + t, -(c as f64) * 2.0 + t * 0.5]);
                y.push(c);
            }
        }
        (FeatureMatrix::from_rows(&rows, vec!["a".into(), "b".into()]).unwrap(), y)
    }

    #[test]
    fn test_trainer_scores_every_candidate() {
        let (x_train, y_train) = blobs(0.0);
        let (x_test, y_test) = blobs(0.02);
        let trainer = ModelTrainer::new(
            vec![
                Hyperparams::Logistic(LogisticParams { max_iter: 300, ..LogisticParams::default() }),
                Hyperparams::RandomForest(ForestParams { n_estimators: 10, ..ForestParams::default() }),
                Hyperparams::GradientBoosting(BoostingParams { n_estimators: 10, ..BoostingParams::default() }),
            ],
            3,
            42,
        );
        let outcome = trainer.train(&x_train, &y_train, &x_test, &y_test, 3).unwrap();

        assert_eq!(outcome.names(), vec!["logistic_regression", "random_forest", "gradient_boosting"]);
        for r in &outcome.results {
            assert!((0.0..=1.0).contains(&r.cv.mean));
            assert_eq!(r.test_predictions.len(), y_test.len());
            assert_eq!(r.cv.fold_scores.len(), 3);
        }
        let expected = select_best(outcome.results.iter().map(|r| &r.cv)).unwrap();
        assert_eq!(outcome.best, expected);
        assert!(outcome.get("random_forest").is_some());

        let again = trainer.train(&x_train, &y_train, &x_test, &y_test, 3).unwrap();
        assert_eq!(again.best, outcome.best);
    }
}
