use firetype_core::{FeatureMatrix, FireError, FireResult};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Standardize features by removing the mean and scaling to unit variance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Option<Vec<f64>>,
    pub std: Option<Vec<f64>>,
    columns: Vec<String>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute per-column mean and population std from training data.
    pub fn fit(&mut self, x: &FeatureMatrix) -> FireResult<()> {
        if x.is_empty() {
            return Err(FireError::InsufficientData("cannot fit scaler on zero rows".into()));
        }
        let std = x.column_stds();
        for (name, s) in x.columns().iter().zip(&std) {
            if *s < f64::EPSILON {
                warn!(column = %name, "constant feature, leaving unscaled");
            }
        }
        self.mean = Some(x.column_means());
        self.std = Some(std);
        self.columns = x.columns().to_vec();
        Ok(())
    }

    /// Transform data using the fitted mean and std.
    pub fn transform(&self, x: &FeatureMatrix) -> FireResult<FeatureMatrix> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(FireError::NotFitted("StandardScaler")),
        };
        if x.columns() != self.columns.as_slice() {
            return Err(FireError::InvalidParameter(format!(
                "scaler fitted on columns {:?}, got {:?}",
                self.columns,
                x.columns()
            )));
        }
        // Zero-variance columns are only centered
        let safe: Vec<f64> = std.iter().map(|&s| if s < f64::EPSILON { 1.0 } else { s }).collect();
        x.standardize(mean, &safe)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, x: &FeatureMatrix) -> FireResult<FeatureMatrix> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::from_rows(
            &[vec![1.0, 200.0], vec![3.0, 180.0], vec![5.0, 420.0], vec![11.0, 310.0]],
            vec!["frp".into(), "brightness".into()],
        )
        .unwrap()
    }

    #[test]
    fn test_standard_scaler_zero_mean_unit_std() {
        let mut scaler = StandardScaler::new();
        let t = scaler.fit_transform(&matrix()).unwrap();
        for (m, s) in t.column_means().iter().zip(t.column_stds()) {
            assert_abs_diff_eq!(*m, 0.0, epsilon = 1e-10);
            assert_abs_diff_eq!(s, 1.0, epsilon = 1e-10);
        }
        assert_eq!(t.columns(), matrix().columns());
    }

    #[test]
    fn test_constant_column_is_centered() {
        let x = FeatureMatrix::from_rows(&[vec![4.0], vec![4.0]], vec!["scan".into()]).unwrap();
        let t = StandardScaler::new().fit_transform(&x).unwrap();
        assert_eq!(t.data(), &[0.0, 0.0]);
    }

    #[test]
    fn test_transform_requires_fit_and_same_columns() {
        let scaler = StandardScaler::new();
        assert_eq!(scaler.transform(&matrix()).unwrap_err().kind(), "NotFittedError");

        let mut scaler = StandardScaler::new();
        scaler.fit(&matrix()).unwrap();
        let other = matrix().select_columns(&[1, 0]).unwrap();
        assert!(scaler.transform(&other).is_err());
    }
}
