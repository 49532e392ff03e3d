//! # firetype
//!
//! Classifies satellite fire detections (MODIS/FIRMS style exports) into
//! vegetation, volcano, static land and offshore fires.
//!
//! ## Modules
//!
//! - **core** - Errors, feature matrix, fire type labels, the `Classifier` trait
//! - **io** - CSV ingestion with schema checks, JSON and CSV persistence
//! - **features** - Derived date/category features and categorical encoders
//! - **preprocessing** - Class balancing, stratified splits, standard scaling, SelectKBest
//! - **linear** - Multinomial logistic regression
//! - **tree** - CART trees, random forest, gradient boosting
//! - **metrics** - Accuracy, confusion matrix, per-class precision/recall/F1
//! - **datasets** - Synthetic fire detections
//! - **pipeline** - Training, grid search, evaluation and the model artifact
//!
//! ## Example
//!
//! ```no_run
//! use firetype::pipeline::{Pipeline, PipelineConfig};
//!
//! let run = Pipeline::new(PipelineConfig::default())
//!     .run_files(&["fires_2019.csv", "fires_2020.csv"])
//!     .unwrap();
//! println!("{}", run.report.evaluation.report);
//! run.artifact.save("model.json".as_ref()).unwrap();
//! ```

/// Shared types and errors.
pub use firetype_core as core;

/// Reading and writing data.
pub use firetype_io as io;

/// Feature engineering and encoding.
pub use firetype_features as features;

/// Data preprocessing.
pub use firetype_preprocessing as preprocessing;

/// Linear models.
pub use firetype_linear as linear;

/// Tree-based models.
pub use firetype_tree as tree;

/// Evaluation metrics.
pub use firetype_metrics as metrics;

/// Synthetic data.
pub use firetype_datasets as datasets;

/// End-to-end pipeline.
pub use firetype_pipeline as pipeline;

