use crate::split::class_indices;
use firetype_core::{FeatureMatrix, FireError, FireResult};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// ANOVA F-statistic of each feature against the class labels.
///
/// F = (SSB / (k - 1)) / (SSW / (n - k)) over the k classes that have rows.
/// A feature with zero within-class spread scores +inf if its class means
/// differ and 0 otherwise.
pub fn f_classif(x: &FeatureMatrix, y: &[usize], n_classes: usize) -> Vec<f64> {
    let groups: Vec<Vec<usize>> = class_indices(y, n_classes)
        .into_iter()
        .filter(|g| !g.is_empty())
        .collect();
    let n = y.len();
    let k = groups.len();
    if k < 2 || n <= k {
        return vec![0.0; x.n_cols()];
    }
    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;

    (0..x.n_cols())
        .map(|j| {
            let overall = (0..n).map(|i| x.get(i, j)).sum::<f64>() / n as f64;
            let mut ssb = 0.0;
            let mut ssw = 0.0;
            for g in &groups {
                let mean = g.iter().map(|&i| x.get(i, j)).sum::<f64>() / g.len() as f64;
                ssb += g.len() as f64 * (mean - overall).powi(2);
                ssw += g.iter().map(|&i| (x.get(i, j) - mean).powi(2)).sum::<f64>();
            }
            if ssw <= f64::EPSILON * ssb.max(1.0) {
                if ssb > 0.0 { f64::INFINITY } else { 0.0 }
            } else {
                (ssb / df_between) / (ssw / df_within)
            }
        })
        .collect()
}

/// Keeps the `k` features with the highest ANOVA F score.
///
/// Selected columns keep their original relative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectKBest {
    pub k: usize,
    // Scores can be infinite, which JSON cannot carry; only the mask is persisted
    #[serde(skip)]
    scores: Option<Vec<f64>>,
    selected: Option<Vec<usize>>,
    columns_in: Vec<String>,
}

impl SelectKBest {
    pub fn new(k: usize) -> Self {
        SelectKBest {
            k,
            scores: None,
            selected: None,
            columns_in: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<()> {
        let p = x.n_cols();
        if self.k == 0 || self.k > p {
            return Err(FireError::InvalidK { k: self.k, available: p });
        }
        if x.n_rows() != y.len() {
            return Err(FireError::ShapeMismatch {
                expected: vec![x.n_rows()],
                got: vec![y.len()],
            });
        }

        let scores = f_classif(x, y, n_classes);
        let mut ranked: Vec<usize> = (0..p).collect();
        // Highest score first; ties and NaN resolved by column position
        ranked.sort_by(|&a, &b| {
            let sa = if scores[a].is_nan() { f64::NEG_INFINITY } else { scores[a] };
            let sb = if scores[b].is_nan() { f64::NEG_INFINITY } else { scores[b] };
            sb.partial_cmp(&sa).unwrap_or(Ordering::Equal).then(a.cmp(&b))
        });
        let mut selected = ranked[..self.k].to_vec();
        selected.sort_unstable();

        self.scores = Some(scores);
        self.selected = Some(selected);
        self.columns_in = x.columns().to_vec();
        Ok(())
    }

    /// Project any matrix with the fitted column layout onto the selected columns.
    pub fn transform(&self, x: &FeatureMatrix) -> FireResult<FeatureMatrix> {
        let selected = self.selected.as_ref().ok_or(FireError::NotFitted("SelectKBest"))?;
        if x.columns() != self.columns_in.as_slice() {
            return Err(FireError::InvalidParameter(format!(
                "selector fitted on columns {:?}, got {:?}",
                self.columns_in,
                x.columns()
            )));
        }
        x.select_columns(selected)
    }

    pub fn fit_transform(&mut self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<FeatureMatrix> {
        self.fit(x, y, n_classes)?;
        self.transform(x)
    }

    pub fn scores(&self) -> Option<&[f64]> {
        self.scores.as_deref()
    }

    pub fn selected_indices(&self) -> Option<&[usize]> {
        self.selected.as_deref()
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.selected
            .as_ref()
            .map(|s| s.iter().map(|&j| self.columns_in[j].clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Column 0 separates classes, column 1 is noise, column 2 is weakly informative.
    fn data() -> (FeatureMatrix, Vec<usize>) {
        let rows = vec![
            vec![0.0, 5.0, 1.0],
            vec![0.2, 1.0, 1.5],
            vec![0.1, 3.0, 0.5],
            vec![5.0, 4.0, 2.0],
            vec![5.1, 2.0, 2.5],
            vec![4.9, 3.0, 1.0],
        ];
        let cols = vec!["signal".into(), "noise".into(), "weak".into()];
        (FeatureMatrix::from_rows(&rows, cols).unwrap(), vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_f_classif_matches_hand_computation() {
        let (x, y) = data();
        let f = f_classif(&x, &y, 2);
        // noise column: class means 3 and 3, so no between-class spread
        assert_abs_diff_eq!(f[1], 0.0, epsilon = 1e-12);
        // weak column: means 1.0 / 1.833.., SSB = 1.041667, SSW = 0.5 + 1.1666667
        assert_abs_diff_eq!(f[2], (1.0416666666666667 / 1.0) / (1.6666666666666667 / 4.0), epsilon = 1e-9);
        assert!(f[0] > f[2]);
    }

    #[test]
    fn test_select_keeps_original_order() {
        let (x, y) = data();
        let mut sel = SelectKBest::new(2);
        let out = sel.fit_transform(&x, &y, 2).unwrap();
        assert_eq!(sel.selected_indices().unwrap(), &[0, 2]);
        assert_eq!(out.columns(), &["signal".to_string(), "weak".to_string()]);
        assert_eq!(sel.selected_names(), vec!["signal".to_string(), "weak".to_string()]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let (x, y) = data();
        let mut a = SelectKBest::new(2);
        let mut b = SelectKBest::new(2);
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();
        assert_eq!(a.selected_names(), b.selected_names());
    }

    #[test]
    fn test_invalid_k() {
        let (x, y) = data();
        let err = SelectKBest::new(4).fit(&x, &y, 2).unwrap_err();
        assert_eq!(err, FireError::InvalidK { k: 4, available: 3 });
        assert!(SelectKBest::new(0).fit(&x, &y, 2).is_err());
        assert_eq!(SelectKBest::new(1).transform(&x).unwrap_err().kind(), "NotFittedError");
    }
}
