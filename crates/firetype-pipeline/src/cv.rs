use crate::family::Hyperparams;
use firetype_core::{Classifier, FeatureMatrix, FireResult};
use firetype_metrics::accuracy;
use firetype_preprocessing::stratified_k_fold;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accuracy over the folds of one cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScore {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of the fold scores.
    pub std: f64,
}

impl CvScore {
    pub fn from_scores(fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len().max(1) as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let var = fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        CvScore {
            fold_scores,
            mean,
            std: var.sqrt(),
        }
    }

    /// Higher mean wins; equal means prefer the lower spread.
    pub fn beats(&self, other: &CvScore) -> bool {
        self.mean > other.mean || (self.mean == other.mean && self.std < other.std)
    }
}

/// Stratified k-fold accuracy of a model configuration on `x`/`y`.
///
/// Folds are fitted in parallel; each fold builds its model from the same
/// seed, so the scores do not depend on scheduling.
pub fn cross_val_score(
    params: &Hyperparams,
    seed: u64,
    x: &FeatureMatrix,
    y: &[usize],
    n_classes: usize,
    n_folds: usize,
) -> FireResult<CvScore> {
    let folds = stratified_k_fold(y, n_classes, n_folds)?;
    let scores = folds
        .par_iter()
        .enumerate()
        .map(|(i, fold)| {
            let x_train = x.select_rows(&fold.train);
            let y_train: Vec<usize> = fold.train.iter().map(|&r| y[r]).collect();
            let x_test = x.select_rows(&fold.test);
            let y_test: Vec<usize> = fold.test.iter().map(|&r| y[r]).collect();

            let mut model = params.build(seed);
            model.fit(&x_train, &y_train, n_classes)?;
            let score = accuracy(&y_test, &model.predict(&x_test)?)?;
            debug!(fold = i, score, params = %params, "cv fold scored");
            Ok(score)
        })
        .collect::<FireResult<Vec<f64>>>()?;
    Ok(CvScore::from_scores(scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::ForestParams;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cv_score_stats() {
        let s = CvScore::from_scores(vec![0.5, 1.0, 0.75]);
        assert_abs_diff_eq!(s.mean, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std, (0.125f64 / 3.0).sqrt(), epsilon = 1e-12);

        let steady = CvScore::from_scores(vec![0.75, 0.75, 0.75]);
        assert!(steady.beats(&s));
        assert!(!s.beats(&steady));
        assert!(CvScore::from_scores(vec![0.875]).beats(&steady));
    }

    #[test]
    fn test_cross_val_score_on_separable_data() {
        let rows: Vec<Vec<f64>> = (0..30).map(|i| vec![(i / 10) as f64 * 5.0 + (i % 10) as f64 * 0.1]).collect();
        let y: Vec<usize> = (0..30).map(|i| i / 10).collect();
        let x = FeatureMatrix::from_rows(&rows, vec!["v".into()]).unwrap();
        let params = Hyperparams::RandomForest(ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        });

        let score = cross_val_score(&params, 42, &x, &y, 3, 5).unwrap();
        assert_eq!(score.fold_scores.len(), 5);
        assert_abs_diff_eq!(score.mean, 1.0);
        assert_eq!(score, cross_val_score(&params, 42, &x, &y, 3, 5).unwrap());
    }
}
