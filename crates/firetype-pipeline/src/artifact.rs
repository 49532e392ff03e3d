use crate::family::{Hyperparams, Model};
use firetype_core::{ClassLabels, Classifier, FeatureMatrix, FireError, FireResult, FireType, RejectedRecords};
use firetype_features::{encode_features, encode_row, engineer_features, engineer_record, CategoryEncoders, FEATURE_COLUMNS};
use firetype_io::{load_json, save_json, Dataset, FireRecord};
use firetype_preprocessing::{SelectKBest, StandardScaler};

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A fitted classifier bundled with every piece of preprocessing state it
/// was trained behind. Raw records go in, fire types come out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub encoders: CategoryEncoders,
    pub scaler: StandardScaler,
    pub selector: SelectKBest,
    pub classes: ClassLabels,
    pub hyperparams: Hyperparams,
    pub model: Model,
}

/// Batch predictions, aligned with the dataset rows that could be scored.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    /// Row of the input dataset behind each prediction.
    pub rows: Vec<usize>,
    pub labels: Vec<FireType>,
    pub rejected: RejectedRecords,
}

impl ModelArtifact {
    pub fn selected_features(&self) -> Vec<String> {
        self.selector.selected_names()
    }

    /// Swap in a model refit with new hyperparameters.
    pub fn replace_model(&mut self, hyperparams: Hyperparams, model: Model) {
        self.hyperparams = hyperparams;
        self.model = model;
    }

    /// Scale and project an encoded feature matrix.
    pub fn transform(&self, encoded: &FeatureMatrix) -> FireResult<FeatureMatrix> {
        let scaled = self.scaler.transform(encoded)?;
        self.selector.transform(&scaled)
    }

    /// Predict class indices for an encoded feature matrix.
    pub fn predict_encoded(&self, encoded: &FeatureMatrix) -> FireResult<Vec<usize>> {
        self.model.predict(&self.transform(encoded)?)
    }

    /// Score a single raw record; any problem with it is returned as an error.
    pub fn predict_record(&self, record: &FireRecord) -> FireResult<FireType> {
        record.validate(0)?;
        let engineered = engineer_record(record)?;
        let row = encode_row(&engineered, &self.encoders, 0)?;
        let columns = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
        let encoded = FeatureMatrix::new(row, 1, columns)?;
        let index = self.predict_encoded(&encoded)?[0];
        self.classes
            .label(index)
            .ok_or_else(|| FireError::InvalidParameter(format!("model predicted unknown class index {}", index)))
    }

    /// Score a raw dataset. Records that fail engineering or encoding are
    /// left out and counted.
    pub fn predict_dataset(&self, dataset: &Dataset) -> FireResult<Predictions> {
        let engineered = engineer_features(dataset)?;
        let mut rejected = engineered.rejected;
        let encoded = encode_features(&engineered.dataset, &self.encoders)?;
        rejected.merge(&encoded.rejected);

        let rows: Vec<usize> = encoded.rows.iter().map(|&r| engineered.rows[r]).collect();

        let labels = if encoded.matrix.is_empty() {
            Vec::new()
        } else {
            self.classes.decode(&self.predict_encoded(&encoded.matrix)?)?
        };
        info!(scored = labels.len(), rejected = rejected.total(), "dataset scored");
        Ok(Predictions { rows, labels, rejected })
    }

    pub fn save(&self, path: &Path) -> FireResult<()> {
        save_json(self, path)
    }

    pub fn load(path: &Path) -> FireResult<Self> {
        load_json(path)
    }
}
