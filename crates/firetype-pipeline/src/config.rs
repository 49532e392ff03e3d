use crate::family::{BoostingParams, ForestParams, Hyperparams, LogisticParams, ModelFamily};
use firetype_core::{FireError, FireResult};
use firetype_linear::Solver;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one pipeline run. Every field has a default, so a TOML file
/// only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub seed: u64,
    /// Per-class row count ceiling for the balancer.
    pub balance_cap: usize,
    pub test_ratio: f64,
    pub k_features: usize,
    pub cv_folds: usize,
    pub models: ModelsConfig,
    pub tuning: TuningConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            seed: 42,
            balance_cap: 50_000,
            test_ratio: 0.2,
            k_features: 10,
            cv_folds: 5,
            models: ModelsConfig::default(),
            tuning: TuningConfig::default(),
        }
    }
}

/// Default hyperparameters of each candidate family.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub logistic: LogisticParams,
    pub random_forest: ForestParams,
    pub gradient_boosting: BoostingParams,
}

impl ModelsConfig {
    /// Candidates in declaration order.
    pub fn candidates(&self) -> Vec<Hyperparams> {
        ModelFamily::ALL.iter().map(|&f| self.default_for(f)).collect()
    }

    pub fn default_for(&self, family: ModelFamily) -> Hyperparams {
        match family {
            ModelFamily::Logistic => Hyperparams::Logistic(self.logistic.clone()),
            ModelFamily::RandomForest => Hyperparams::RandomForest(self.random_forest.clone()),
            ModelFamily::GradientBoosting => Hyperparams::GradientBoosting(self.gradient_boosting.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub enabled: bool,
    pub inner_folds: usize,
    /// Outer folds of the nested estimate; 0 skips it. Each outer fold reruns
    /// the whole grid search, so n folds cost n extra searches.
    pub outer_folds: usize,
    pub grid: GridConfig,
}

impl Default for TuningConfig {
    fn default() -> Self {
        TuningConfig {
            enabled: true,
            inner_folds: 3,
            outer_folds: 0,
            grid: GridConfig::default(),
        }
    }
}

/// Value lists searched per family. For tree depths, 0 means unbounded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub logistic: LogisticGrid,
    pub random_forest: ForestGrid,
    pub gradient_boosting: BoostingGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticGrid {
    pub c: Vec<f64>,
    pub solver: Vec<Solver>,
}

impl Default for LogisticGrid {
    fn default() -> Self {
        LogisticGrid {
            c: vec![0.1, 1.0, 10.0],
            solver: vec![Solver::GradientDescent, Solver::Sgd],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        ForestGrid {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![10, 20, 0],
            min_samples_split: vec![2, 5, 10],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingGrid {
    pub n_estimators: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub max_depth: Vec<usize>,
}

impl Default for BoostingGrid {
    fn default() -> Self {
        BoostingGrid {
            n_estimators: vec![100, 200],
            learning_rate: vec![0.05, 0.1, 0.2],
            max_depth: vec![3, 5, 7],
        }
    }
}

fn depth_limit(d: usize) -> Option<usize> {
    if d == 0 {
        None
    } else {
        Some(d)
    }
}

impl GridConfig {
    /// Cartesian product of the family's value lists, first list varying slowest.
    /// Fields a grid does not search are taken from `base`.
    pub fn candidates(&self, family: ModelFamily, base: &ModelsConfig) -> Vec<Hyperparams> {
        let mut out = Vec::new();
        match family {
            ModelFamily::Logistic => {
                let g = &self.logistic;
                for &c in &g.c {
                    for &solver in &g.solver {
                        out.push(Hyperparams::Logistic(LogisticParams {
                            c,
                            solver,
                            ..base.logistic.clone()
                        }));
                    }
                }
            }
            ModelFamily::RandomForest => {
                let g = &self.random_forest;
                for &n_estimators in &g.n_estimators {
                    for &d in &g.max_depth {
                        for &min_samples_split in &g.min_samples_split {
                            out.push(Hyperparams::RandomForest(ForestParams {
                                n_estimators,
                                max_depth: depth_limit(d),
                                min_samples_split,
                            }));
                        }
                    }
                }
            }
            ModelFamily::GradientBoosting => {
                let g = &self.gradient_boosting;
                for &n_estimators in &g.n_estimators {
                    for &learning_rate in &g.learning_rate {
                        for &d in &g.max_depth {
                            out.push(Hyperparams::GradientBoosting(BoostingParams {
                                n_estimators,
                                learning_rate,
                                max_depth: depth_limit(d),
                            }));
                        }
                    }
                }
            }
        }
        out
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> FireResult<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| FireError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> FireResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> FireResult<String> {
        toml::to_string(self).map_err(|e| FireError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> FireResult<()> {
        let invalid = |msg: String| Err(FireError::InvalidParameter(msg));
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return invalid(format!("test_ratio must lie in (0, 1), got {}", self.test_ratio));
        }
        if self.balance_cap == 0 {
            return invalid("balance_cap must be positive".into());
        }
        if self.k_features == 0 {
            return invalid("k_features must be positive".into());
        }
        if self.cv_folds < 2 {
            return invalid(format!("cv_folds must be at least 2, got {}", self.cv_folds));
        }
        if self.tuning.inner_folds < 2 {
            return invalid(format!(
                "tuning.inner_folds must be at least 2, got {}",
                self.tuning.inner_folds
            ));
        }
        if self.tuning.outer_folds == 1 {
            return invalid("tuning.outer_folds must be 0 (skip) or at least 2".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.balance_cap, 50_000);
        assert!(config.validate().is_ok());
        assert_eq!(config.tuning.outer_folds, 0);
        let families: Vec<ModelFamily> = config.models.candidates().iter().map(|h| h.family()).collect();
        assert_eq!(families, ModelFamily::ALL.to_vec());
    }

    #[test]
    fn test_default_grid_sizes() {
        let config = PipelineConfig::default();
        let grid = &config.tuning.grid;
        assert_eq!(grid.candidates(ModelFamily::RandomForest, &config.models).len(), 27);
        assert_eq!(grid.candidates(ModelFamily::GradientBoosting, &config.models).len(), 18);
        assert_eq!(grid.candidates(ModelFamily::Logistic, &config.models).len(), 6);
    }

    #[test]
    fn test_zero_depth_is_unbounded() {
        let config = PipelineConfig::default();
        let candidates = config.tuning.grid.candidates(ModelFamily::RandomForest, &config.models);
        match &candidates[6] {
            Hyperparams::RandomForest(p) => {
                assert_eq!(p.n_estimators, 100);
                assert_eq!(p.max_depth, None);
                assert_eq!(p.min_samples_split, 2);
            }
            other => panic!("unexpected candidate {:?}", other),
        }
    }

    #[test]
    fn test_from_toml_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            seed = 7
            balance_cap = 100

            [models.random_forest]
            n_estimators = 10

            [tuning]
            outer_folds = 2

            [tuning.grid.logistic]
            c = [0.5]
            solver = ["sgd"]
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.balance_cap, 100);
        assert_eq!(config.k_features, 10);
        assert_eq!(config.models.random_forest.n_estimators, 10);
        assert_eq!(config.models.random_forest.min_samples_split, 2);
        assert_eq!(config.tuning.outer_folds, 2);
        assert_eq!(config.tuning.grid.logistic.solver, vec![Solver::Sgd]);
        assert_eq!(config.tuning.grid.random_forest, ForestGrid::default());
    }

    #[test]
    fn test_printed_defaults_parse_back() {
        let text = PipelineConfig::default().to_toml_string().unwrap();
        assert!(text.contains("[tuning.grid.random_forest]"));
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let bad_ratio = PipelineConfig { test_ratio: 1.0, ..PipelineConfig::default() };
        assert_eq!(bad_ratio.validate().unwrap_err().kind(), "InvalidParameterError");
        let bad_folds = PipelineConfig { cv_folds: 1, ..PipelineConfig::default() };
        assert!(bad_folds.validate().is_err());
        assert!(PipelineConfig::from_toml_str("k_features = 0").is_err());
        assert_eq!(
            PipelineConfig::from_toml_str("seed = \"x\"").unwrap_err().kind(),
            "SerializationError"
        );
    }
}
