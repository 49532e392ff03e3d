use crate::error::{FireError, FireResult};
use crate::matrix::FeatureMatrix;

/// Supervised multiclass classifier over contiguous class indices `0..n_classes`.
pub trait Classifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()>;
    fn predict(&self, x: &FeatureMatrix) -> FireResult<Vec<usize>>;

    /// Per-feature importances, normalized to sum to 1, if the model exposes them.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Validate the shapes and label range handed to `Classifier::fit`.
pub fn check_fit_input(x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
    if x.n_rows() != y.len() {
        return Err(FireError::ShapeMismatch {
            expected: vec![x.n_rows()],
            got: vec![y.len()],
        });
    }
    if x.is_empty() {
        return Err(FireError::InsufficientData("cannot fit on zero rows".into()));
    }
    if n_classes < 2 {
        return Err(FireError::InsufficientData(format!(
            "need at least 2 classes, got {}",
            n_classes
        )));
    }
    if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(FireError::InvalidParameter(format!(
            "label {} outside 0..{}",
            bad, n_classes
        )));
    }
    Ok(())
}

/// Index of the largest value; ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Scale importances so they sum to 1 (all zeros stay zeros).
pub fn normalize_importances(mut raw: Vec<f64>) -> Vec<f64> {
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        for v in raw.iter_mut() {
            *v /= total;
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[2.0]), 0);
    }

    #[test]
    fn test_check_fit_input() {
        let x = FeatureMatrix::from_rows(&[vec![0.0], vec![1.0]], vec!["a".into()]).unwrap();
        assert!(check_fit_input(&x, &[0, 1], 2).is_ok());
        assert!(check_fit_input(&x, &[0], 2).is_err());
        assert!(check_fit_input(&x, &[0, 2], 2).is_err());
        assert!(check_fit_input(&x, &[0, 0], 1).is_err());
    }

    #[test]
    fn test_normalize_importances() {
        assert_eq!(normalize_importances(vec![1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize_importances(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
