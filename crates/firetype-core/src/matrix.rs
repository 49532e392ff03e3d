use crate::error::{FireError, FireResult};

use serde::{Deserialize, Serialize};

/// Dense row-major feature matrix whose columns carry their names.
///
/// Column identity travels with the values through scaling and selection so
/// that importances can be reported against the original feature names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_rows: usize,
    columns: Vec<String>,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl FeatureMatrix {
    /// Create a matrix from flat row-major data.
    pub fn new(data: Vec<f64>, n_rows: usize, columns: Vec<String>) -> FireResult<Self> {
        if data.len() != n_rows * columns.len() {
            return Err(FireError::ShapeMismatch {
                expected: vec![n_rows, columns.len()],
                got: vec![data.len()],
            });
        }
        Ok(FeatureMatrix { data, n_rows, columns })
    }

    /// Create a matrix from a list of rows.
    pub fn from_rows(rows: &[Vec<f64>], columns: Vec<String>) -> FireResult<Self> {
        let n_cols = columns.len();
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(FireError::ShapeMismatch {
                    expected: vec![n_cols],
                    got: vec![row.len()],
                });
            }
            data.extend_from_slice(row);
        }
        Ok(FeatureMatrix {
            data,
            n_rows: rows.len(),
            columns,
        })
    }

    /// Create a matrix from equally long columns.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> FireResult<Self> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let n_cols = columns.len();
        let mut data = vec![0.0; n_rows * n_cols];
        let mut names = Vec::with_capacity(n_cols);
        for (j, (name, values)) in columns.into_iter().enumerate() {
            if values.len() != n_rows {
                return Err(FireError::ShapeMismatch {
                    expected: vec![n_rows],
                    got: vec![values.len()],
                });
            }
            for (i, v) in values.into_iter().enumerate() {
                data[i * n_cols + j] = v;
            }
            names.push(name);
        }
        Ok(FeatureMatrix {
            data,
            n_rows,
            columns: names,
        })
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols() + col]
    }

    /// Borrow one row as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let p = self.n_cols();
        &self.data[i * p..(i + 1) * p]
    }

    /// Copy one column out.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.n_rows).map(|i| self.get(i, j)).collect()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    // ─── Projection ─────────────────────────────────────────────────────────

    /// Gather rows by index (duplicates allowed, order preserved).
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        let p = self.n_cols();
        let mut data = Vec::with_capacity(indices.len() * p);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        FeatureMatrix {
            data,
            n_rows: indices.len(),
            columns: self.columns.clone(),
        }
    }

    /// Gather columns by index, carrying their names along.
    pub fn select_columns(&self, indices: &[usize]) -> FireResult<FeatureMatrix> {
        let p = self.n_cols();
        if let Some(&bad) = indices.iter().find(|&&j| j >= p) {
            return Err(FireError::ShapeMismatch {
                expected: vec![p],
                got: vec![bad],
            });
        }
        let mut data = Vec::with_capacity(self.n_rows * indices.len());
        for i in 0..self.n_rows {
            let row = self.row(i);
            data.extend(indices.iter().map(|&j| row[j]));
        }
        Ok(FeatureMatrix {
            data,
            n_rows: self.n_rows,
            columns: indices.iter().map(|&j| self.columns[j].clone()).collect(),
        })
    }

    /// Apply a per-column affine map `(x - shift[j]) / scale[j]`.
    pub fn standardize(&self, shift: &[f64], scale: &[f64]) -> FireResult<FeatureMatrix> {
        let p = self.n_cols();
        if shift.len() != p || scale.len() != p {
            return Err(FireError::ShapeMismatch {
                expected: vec![p],
                got: vec![shift.len(), scale.len()],
            });
        }
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(k, &v)| {
                let j = k % p;
                (v - shift[j]) / scale[j]
            })
            .collect();
        Ok(FeatureMatrix {
            data,
            n_rows: self.n_rows,
            columns: self.columns.clone(),
        })
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    /// Per-column mean.
    pub fn column_means(&self) -> Vec<f64> {
        let p = self.n_cols();
        let mut sums = vec![0.0; p];
        for i in 0..self.n_rows {
            for (s, v) in sums.iter_mut().zip(self.row(i)) {
                *s += v;
            }
        }
        let n = self.n_rows.max(1) as f64;
        sums.into_iter().map(|s| s / n).collect()
    }

    /// Per-column population standard deviation (ddof = 0).
    pub fn column_stds(&self) -> Vec<f64> {
        let means = self.column_means();
        let mut sq = vec![0.0; self.n_cols()];
        for i in 0..self.n_rows {
            for ((s, v), m) in sq.iter_mut().zip(self.row(i)).zip(&means) {
                let d = v - m;
                *s += d * d;
            }
        }
        let n = self.n_rows.max(1) as f64;
        sq.into_iter().map(|s| (s / n).sqrt()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|j| format!("f{}", j)).collect()
    }

    #[test]
    fn test_from_rows_and_columns_agree() {
        let a = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], names(2)).unwrap();
        let b = FeatureMatrix::from_columns(vec![
            ("f0".into(), vec![1.0, 3.0]),
            ("f1".into(), vec![2.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get(1, 0), 3.0);
        assert_eq!(a.row(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]], names(2)).unwrap_err();
        assert_eq!(err.kind(), "ShapeMismatchError");
    }

    #[test]
    fn test_select_columns_keeps_names() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], names(3)).unwrap();
        let s = m.select_columns(&[2, 0]).unwrap();
        assert_eq!(s.columns(), &["f2".to_string(), "f0".to_string()]);
        assert_eq!(s.row(1), &[6.0, 4.0]);
        assert!(m.select_columns(&[3]).is_err());
    }

    #[test]
    fn test_column_statistics() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 10.0], vec![3.0, 10.0]], names(2)).unwrap();
        let means = m.column_means();
        let stds = m.column_stds();
        assert_abs_diff_eq!(means[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stds[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stds[1], 0.0, epsilon = 1e-12);
    }
}
