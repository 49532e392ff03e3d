use crate::artifact::ModelArtifact;
use firetype_core::{Classifier, FeatureMatrix, FireError, FireResult, FireType};
use firetype_metrics::{accuracy, confusion_matrix, ClassificationReport};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Held-out metrics for the final model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Class order used by `report` and `confusion_matrix`.
    pub classes: Vec<FireType>,
    pub report: ClassificationReport,
    /// Rows are true classes, columns predicted classes.
    pub confusion_matrix: Vec<Vec<usize>>,
    pub predictions: Vec<FireType>,
    /// One entry per selected feature, in selection order; `None` when the
    /// model has no notion of importance.
    pub importances: Option<Vec<FeatureImportance>>,
}

impl EvaluationReport {
    /// Importances sorted from most to least important.
    pub fn ranked_importances(&self) -> Vec<FeatureImportance> {
        let mut ranked = self.importances.clone().unwrap_or_default();
        ranked.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(Ordering::Equal));
        ranked
    }
}

/// Score the artifact's model on already scaled and selected test features.
pub fn evaluate(artifact: &ModelArtifact, x_test: &FeatureMatrix, y_test: &[usize]) -> FireResult<EvaluationReport> {
    let features = artifact.selected_features();
    if x_test.columns() != features.as_slice() {
        return Err(FireError::InvalidParameter(format!(
            "test features {:?} do not match the selected features {:?}",
            x_test.columns(),
            features
        )));
    }

    let y_pred = artifact.model.predict(x_test)?;
    let classes = artifact.classes.classes().to_vec();
    let labels: Vec<String> = classes.iter().map(|c| c.name().to_string()).collect();
    let cm = confusion_matrix(y_test, &y_pred, classes.len())?;
    let report = ClassificationReport::from_confusion(&cm, labels)?;

    let importances = match artifact.model.feature_importances() {
        Some(values) if values.len() == features.len() => Some(
            features
                .into_iter()
                .zip(values)
                .map(|(feature, importance)| FeatureImportance { feature, importance })
                .collect(),
        ),
        Some(values) => {
            return Err(FireError::ShapeMismatch {
                expected: vec![features.len()],
                got: vec![values.len()],
            })
        }
        None => None,
    };

    let accuracy = accuracy(y_test, &y_pred)?;
    info!(accuracy, classes = classes.len(), "evaluation complete");
    Ok(EvaluationReport {
        accuracy,
        predictions: artifact.classes.decode(&y_pred)?,
        classes,
        report,
        confusion_matrix: cm,
        importances,
    })
}
