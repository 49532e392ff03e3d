use firetype_core::{Classifier, FeatureMatrix, FireResult};
use firetype_linear::{LogisticRegression, Solver};
use firetype_tree::{GradientBoostingClassifier, RandomForestClassifier};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate classifier families, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Logistic,
    RandomForest,
    GradientBoosting,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Logistic,
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::Logistic => "logistic_regression",
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::GradientBoosting => "gradient_boosting",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    pub c: f64,
    pub solver: Solver,
    pub max_iter: usize,
}

impl Default for LogisticParams {
    fn default() -> Self {
        LogisticParams {
            c: 1.0,
            solver: Solver::GradientDescent,
            max_iter: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Absent means trees grow until their leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: Option<usize>,
}

impl Default for BoostingParams {
    fn default() -> Self {
        BoostingParams {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(3),
        }
    }
}

/// One hyperparameter configuration, tagged with the family it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Hyperparams {
    Logistic(LogisticParams),
    RandomForest(ForestParams),
    GradientBoosting(BoostingParams),
}

impl Hyperparams {
    pub fn family(&self) -> ModelFamily {
        match self {
            Hyperparams::Logistic(_) => ModelFamily::Logistic,
            Hyperparams::RandomForest(_) => ModelFamily::RandomForest,
            Hyperparams::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    /// An unfitted model configured with these hyperparameters.
    pub fn build(&self, seed: u64) -> Model {
        match self {
            Hyperparams::Logistic(p) => Model::Logistic(LogisticRegression::new(p.c, p.solver, p.max_iter, seed)),
            Hyperparams::RandomForest(p) => Model::RandomForest(RandomForestClassifier::new(
                p.n_estimators,
                p.max_depth,
                p.min_samples_split,
                seed,
            )),
            Hyperparams::GradientBoosting(p) => Model::GradientBoosting(GradientBoostingClassifier::new(
                p.n_estimators,
                p.learning_rate,
                p.max_depth,
            )),
        }
    }
}

fn depth(d: Option<usize>) -> String {
    d.map_or_else(|| "none".to_string(), |d| d.to_string())
}

impl fmt::Display for Hyperparams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hyperparams::Logistic(p) => write!(f, "c={} solver={:?} max_iter={}", p.c, p.solver, p.max_iter),
            Hyperparams::RandomForest(p) => write!(
                f,
                "n_estimators={} max_depth={} min_samples_split={}",
                p.n_estimators,
                depth(p.max_depth),
                p.min_samples_split
            ),
            Hyperparams::GradientBoosting(p) => write!(
                f,
                "n_estimators={} learning_rate={} max_depth={}",
                p.n_estimators,
                p.learning_rate,
                depth(p.max_depth)
            ),
        }
    }
}

/// A classifier of any supported family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    Logistic(LogisticRegression),
    RandomForest(RandomForestClassifier),
    GradientBoosting(GradientBoostingClassifier),
}

impl Model {
    pub fn family(&self) -> ModelFamily {
        match self {
            Model::Logistic(_) => ModelFamily::Logistic,
            Model::RandomForest(_) => ModelFamily::RandomForest,
            Model::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Model::Logistic(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }
}

impl Classifier for Model {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
        match self {
            Model::Logistic(m) => m.fit(x, y, n_classes),
            Model::RandomForest(m) => m.fit(x, y, n_classes),
            Model::GradientBoosting(m) => m.fit(x, y, n_classes),
        }
    }

    fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<usize>> {
        self.inner().predict(x)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.inner().feature_importances()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_matches_family() {
        for params in [
            Hyperparams::Logistic(LogisticParams::default()),
            Hyperparams::RandomForest(ForestParams::default()),
            Hyperparams::GradientBoosting(BoostingParams::default()),
        ] {
            assert_eq!(params.build(42).family(), params.family());
        }
    }

    #[test]
    fn test_hyperparams_are_tagged() {
        let params = Hyperparams::RandomForest(ForestParams {
            n_estimators: 200,
            max_depth: Some(10),
            min_samples_split: 5,
        });
        let text = toml::to_string(&params).unwrap();
        assert!(text.contains("family = \"random_forest\""));
        assert_eq!(params.to_string(), "n_estimators=200 max_depth=10 min_samples_split=5");
    }

    #[test]
    fn test_only_trees_expose_importances() {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, (i % 2) as f64]).collect();
        let y: Vec<usize> = (0..12).map(|i| usize::from(i >= 6)).collect();
        let x = FeatureMatrix::from_rows(&rows, vec!["a".into(), "b".into()]).unwrap();

        let mut logistic = Hyperparams::Logistic(LogisticParams::default()).build(0);
        logistic.fit(&x, &y, 2).unwrap();
        assert!(logistic.feature_importances().is_none());

        let mut forest = Hyperparams::RandomForest(ForestParams { n_estimators: 5, ..ForestParams::default() }).build(0);
        forest.fit(&x, &y, 2).unwrap();
        assert_eq!(forest.feature_importances().unwrap().len(), 2);
    }
}
