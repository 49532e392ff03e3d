use firetype_core::{FireError, FireResult};

use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &[usize], y_pred: &[usize]) -> FireResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(FireError::ShapeMismatch {
            expected: vec![y_true.len()],
            got: vec![y_pred.len()],
        });
    }
    if y_true.is_empty() {
        return Err(FireError::InsufficientData("no predictions to score".into()));
    }
    Ok(())
}

/// Compute accuracy: fraction of correct predictions.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> FireResult<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Confusion matrix with true classes as rows and predicted classes as columns.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> FireResult<Vec<Vec<usize>>> {
    check_lengths(y_true, y_pred)?;
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t >= n_classes || p >= n_classes {
            return Err(FireError::InvalidParameter(format!(
                "label pair ({}, {}) outside 0..{}",
                t, p, n_classes
            )));
        }
        matrix[t][p] += 1;
    }
    Ok(matrix)
}

/// Precision, recall and F1 of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of true rows of this class.
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassScores {
    fn from_confusion(cm: &[Vec<usize>], class: usize) -> Self {
        let tp = cm[class][class];
        let predicted: usize = cm.iter().map(|row| row[class]).sum();
        let support: usize = cm[class].iter().sum();
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassScores { precision, recall, f1, support }
    }
}

/// Per-class scores plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Class display names, in class index order.
    pub labels: Vec<String>,
    pub per_class: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &[Vec<usize>], labels: Vec<String>) -> FireResult<Self> {
        if cm.len() != labels.len() || cm.iter().any(|row| row.len() != cm.len()) {
            return Err(FireError::ShapeMismatch {
                expected: vec![labels.len(), labels.len()],
                got: vec![cm.len(), cm.first().map_or(0, |r| r.len())],
            });
        }
        let total: usize = cm.iter().flatten().sum();
        if total == 0 {
            return Err(FireError::InsufficientData("empty confusion matrix".into()));
        }
        let per_class: Vec<ClassScores> = (0..cm.len()).map(|c| ClassScores::from_confusion(cm, c)).collect();
        let correct: usize = (0..cm.len()).map(|c| cm[c][c]).sum();

        let k = per_class.len() as f64;
        let macro_avg = ClassScores {
            precision: per_class.iter().map(|s| s.precision).sum::<f64>() / k,
            recall: per_class.iter().map(|s| s.recall).sum::<f64>() / k,
            f1: per_class.iter().map(|s| s.f1).sum::<f64>() / k,
            support: total,
        };
        let weight = |f: fn(&ClassScores) -> f64| {
            per_class.iter().map(|s| f(s) * s.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = ClassScores {
            precision: weight(|s| s.precision),
            recall: weight(|s| s.recall),
            f1: weight(|s| s.f1),
            support: total,
        };

        Ok(ClassificationReport {
            labels,
            per_class,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        })
    }

    pub fn new(y_true: &[usize], y_pred: &[usize], labels: Vec<String>) -> FireResult<Self> {
        let cm = confusion_matrix(y_true, y_pred, labels.len())?;
        Self::from_confusion(&cm, labels)
    }
}

fn write_scores(f: &mut std::fmt::Formatter<'_>, width: usize, name: &str, s: &ClassScores) -> std::fmt::Result {
    writeln!(
        f,
        "{:>width$} {:>9.3} {:>9.3} {:>9.3} {:>9}",
        name,
        s.precision,
        s.recall,
        s.f1,
        s.support,
        width = width
    )
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.labels.iter().map(|l| l.len()).max().unwrap_or(0).max(12);
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support",
            width = width
        )?;
        for (name, scores) in self.labels.iter().zip(&self.per_class) {
            write_scores(f, width, name, scores)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.3} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support,
            width = width
        )?;
        write_scores(f, width, "macro avg", &self.macro_avg)?;
        write_scores(f, width, "weighted avg", &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_accuracy() {
        assert_abs_diff_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap(), 0.75);
        assert!(accuracy(&[0, 1], &[0]).is_err());
        assert!(accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_confusion_matrix_rows_are_truth() {
        let cm = confusion_matrix(&[0, 0, 1, 2, 2], &[0, 1, 1, 2, 0], 3).unwrap();
        assert_eq!(cm, vec![vec![1, 1, 0], vec![0, 1, 0], vec![1, 0, 1]]);
        assert!(confusion_matrix(&[3], &[0], 3).is_err());
    }

    #[test]
    fn test_report_per_class_and_averages() {
        let y_true = [0, 0, 1, 1, 1, 2];
        let y_pred = [0, 1, 1, 1, 0, 2];
        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let report = ClassificationReport::new(&y_true, &y_pred, labels).unwrap();

        assert_abs_diff_eq!(report.accuracy, 4.0 / 6.0, epsilon = 1e-12);
        let a = &report.per_class[0];
        assert_abs_diff_eq!(a.precision, 0.5);
        assert_abs_diff_eq!(a.recall, 0.5);
        assert_eq!(a.support, 2);
        let b = &report.per_class[1];
        assert_abs_diff_eq!(b.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(b.recall, 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(report.per_class[2].f1, 1.0);

        let macro_f1 = (0.5 + 2.0 / 3.0 + 1.0) / 3.0;
        assert_abs_diff_eq!(report.macro_avg.f1, macro_f1, epsilon = 1e-12);
        let weighted_recall = (0.5 * 2.0 + 2.0 / 3.0 * 3.0 + 1.0) / 6.0;
        assert_abs_diff_eq!(report.weighted_avg.recall, weighted_recall, epsilon = 1e-12);
    }

    #[test]
    fn test_never_predicted_class_scores_zero() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let report = ClassificationReport::new(&[0, 1], &[0, 0], labels).unwrap();
        assert_eq!(report.per_class[1].precision, 0.0);
        assert_eq!(report.per_class[1].f1, 0.0);
        assert!(report.to_string().contains("weighted avg"));
    }
}
