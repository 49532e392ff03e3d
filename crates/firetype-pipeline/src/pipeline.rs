use crate::artifact::ModelArtifact;
use crate::config::PipelineConfig;
use crate::evaluator::{evaluate, EvaluationReport};
use crate::trainer::{ModelTrainer, TrainingOutcome};
use crate::tuner::{CancelToken, GridSearch, TuningOutcome};
use firetype_core::{ClassLabels, FireError, FireResult, FireType, RejectedRecords};
use firetype_features::{encode_features, engineer_features, CategoryEncoders, CATEGORICAL_COLUMNS};
use firetype_io::{load_sources, Dataset, FireRecord, Ingested};
use firetype_preprocessing::{train_test_split, ClassBalancer, SelectKBest, StandardScaler};

use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configuration,
    Ingestion,
    FeatureEngineering,
    Encoding,
    Balancing,
    Splitting,
    Scaling,
    FeatureSelection,
    Training,
    Tuning,
    Evaluation,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Configuration => "configuration",
            Stage::Ingestion => "ingestion",
            Stage::FeatureEngineering => "feature engineering",
            Stage::Encoding => "encoding",
            Stage::Balancing => "class balancing",
            Stage::Splitting => "train/test split",
            Stage::Scaling => "scaling",
            Stage::FeatureSelection => "feature selection",
            Stage::Training => "model training",
            Stage::Tuning => "hyperparameter tuning",
            Stage::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage failure, with the records already dropped before it happened.
#[derive(Debug, Error)]
#[error("{stage} failed ({kind}, {rejected} records rejected so far): {source}", kind = .source.kind(), rejected = .rejected.total())]
pub struct PipelineError {
    pub stage: Stage,
    pub source: FireError,
    pub rejected: RejectedRecords,
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }
}

/// Everything a run produces for display, apart from the artifact itself.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Dataset after feature engineering, for charting.
    #[serde(skip)]
    pub engineered: Dataset,
    /// Records dropped per stage, only for stages that dropped any.
    pub rejected: Vec<(Stage, RejectedRecords)>,
    pub classes: Vec<FireType>,
    pub balanced_rows: usize,
    pub rows_per_class: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub selected_features: Vec<String>,
    /// ANOVA F score of every candidate feature, in matrix column order.
    pub feature_scores: Vec<(String, f64)>,
    pub training: TrainingOutcome,
    pub tuning: Option<TuningOutcome>,
    pub evaluation: EvaluationReport,
}

impl PipelineReport {
    pub fn total_rejected(&self) -> usize {
        self.rejected.iter().map(|(_, r)| r.total()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub artifact: ModelArtifact,
    pub report: PipelineReport,
}

/// Runs every stage from raw records to an evaluated model artifact.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub config: PipelineConfig,
    cancel: CancelToken,
}

struct Tally(Vec<(Stage, RejectedRecords)>);

impl Tally {
    fn add(&mut self, stage: Stage, rejected: RejectedRecords) {
        if !rejected.is_empty() {
            self.0.push((stage, rejected));
        }
    }

    fn fail(&self, stage: Stage) -> impl FnOnce(FireError) -> PipelineError + '_ {
        move |source| {
            let mut rejected = RejectedRecords::new();
            for (_, r) in &self.0 {
                rejected.merge(r);
            }
            PipelineError { stage, source, rejected }
        }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Token that stops the grid search from starting further candidates.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<PipelineRun, PipelineError> {
        let ingested = load_sources(paths, true).map_err(|source| PipelineError {
            stage: Stage::Ingestion,
            source,
            rejected: RejectedRecords::new(),
        })?;
        self.run(ingested)
    }

    pub fn run_records(&self, records: Vec<FireRecord>) -> Result<PipelineRun, PipelineError> {
        self.run(Ingested {
            records,
            rejected: RejectedRecords::new(),
        })
    }

    pub fn run(&self, ingested: Ingested) -> Result<PipelineRun, PipelineError> {
        let config = &self.config;
        let mut tally = Tally(Vec::new());
        config.validate().map_err(tally.fail(Stage::Configuration))?;
        let dataset = ingested.dataset();
        tally.add(Stage::Ingestion, ingested.rejected);
        if dataset.is_empty() {
            return Err(tally.fail(Stage::Ingestion)(FireError::InsufficientData("no usable records".into())));
        }

        let engineered = engineer_features(&dataset).map_err(tally.fail(Stage::FeatureEngineering))?;
        tally.add(Stage::FeatureEngineering, engineered.rejected);
        let engineered = engineered.dataset;

        let encoders =
            CategoryEncoders::fit(&engineered, &CATEGORICAL_COLUMNS).map_err(tally.fail(Stage::Encoding))?;
        let encoded = encode_features(&engineered, &encoders).map_err(tally.fail(Stage::Encoding))?;
        tally.add(Stage::Encoding, encoded.rejected);
        let (classes, y) = encode_labels(&engineered, &encoded.rows).map_err(tally.fail(Stage::Encoding))?;
        let n_classes = classes.len();

        let balanced = ClassBalancer::new(config.balance_cap, config.seed)
            .balance(&encoded.matrix, &y, n_classes)
            .map_err(tally.fail(Stage::Balancing))?;

        let split = train_test_split(&balanced.x, &balanced.y, n_classes, config.test_ratio, config.seed)
            .map_err(tally.fail(Stage::Splitting))?;

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&split.x_train).map_err(tally.fail(Stage::Scaling))?;
        let x_test = scaler.transform(&split.x_test).map_err(tally.fail(Stage::Scaling))?;

        let mut selector = SelectKBest::new(config.k_features);
        let x_train = selector
            .fit_transform(&x_train, &split.y_train, n_classes)
            .map_err(tally.fail(Stage::FeatureSelection))?;
        let x_test = selector.transform(&x_test).map_err(tally.fail(Stage::FeatureSelection))?;
        let selected_features = selector.selected_names();
        let feature_scores = split
            .x_train
            .columns()
            .iter()
            .cloned()
            .zip(selector.scores().unwrap_or_default().iter().copied())
            .collect();
        info!(selected = ?selected_features, "features selected");

        let trainer = ModelTrainer::new(config.models.candidates(), config.cv_folds, config.seed);
        let training = trainer
            .train(&x_train, &split.y_train, &x_test, &split.y_test, n_classes)
            .map_err(tally.fail(Stage::Training))?;
        let best = training.best();

        let mut artifact = ModelArtifact {
            encoders,
            scaler,
            selector,
            classes,
            hyperparams: best.hyperparams.clone(),
            model: best.model.clone(),
        };

        let tuning = if config.tuning.enabled {
            let grid = config.tuning.grid.candidates(best.family(), &config.models);
            let outcome = GridSearch::new(grid, config.tuning.inner_folds, config.seed)
                .with_outer_folds(config.tuning.outer_folds)
                .with_cancel_token(self.cancel.clone())
                .fit(&x_train, &split.y_train, n_classes)
                .map_err(tally.fail(Stage::Tuning))?;
            artifact.replace_model(outcome.best_params.clone(), outcome.model.clone());
            Some(outcome)
        } else {
            None
        };

        let evaluation = evaluate(&artifact, &x_test, &split.y_test).map_err(tally.fail(Stage::Evaluation))?;

        let report = PipelineReport {
            engineered,
            rejected: tally.0,
            classes: artifact.classes.classes().to_vec(),
            balanced_rows: balanced.y.len(),
            rows_per_class: balanced.target_size,
            train_rows: split.y_train.len(),
            test_rows: split.y_test.len(),
            selected_features,
            feature_scores,
            training,
            tuning,
            evaluation,
        };
        info!(
            accuracy = report.evaluation.accuracy,
            rejected = report.total_rejected(),
            "pipeline complete"
        );
        Ok(PipelineRun { artifact, report })
    }
}

/// Discover the label domain from the rows that survived encoding and map
/// their labels to class indices.
fn encode_labels(engineered: &Dataset, rows: &[usize]) -> FireResult<(ClassLabels, Vec<usize>)> {
    let all = engineered
        .labels()
        .ok_or_else(|| FireError::InsufficientData("training records carry no `type` labels".into()))?;
    let labels: Vec<FireType> = rows.iter().map(|&r| all[r]).collect();
    let classes = ClassLabels::from_observed(&labels)?;
    let y = classes.encode(&labels)?;
    Ok((classes, y))
}
