use crate::split::class_indices;
use firetype_core::{FeatureMatrix, FireError, FireResult};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Resamples every class with replacement to a common size.
///
/// The common size is `min(largest class, cap)`: minority classes are
/// oversampled and classes above the cap are downsampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassBalancer {
    pub cap: usize,
    pub seed: u64,
}

/// Balanced features and labels.
#[derive(Debug, Clone)]
pub struct Balanced {
    pub x: FeatureMatrix,
    pub y: Vec<usize>,
    pub target_size: usize,
}

impl ClassBalancer {
    pub fn new(cap: usize, seed: u64) -> Self {
        ClassBalancer { cap, seed }
    }

    pub fn balance(&self, x: &FeatureMatrix, y: &[usize], n_classes: usize) -> FireResult<Balanced> {
        if x.n_rows() != y.len() {
            return Err(FireError::ShapeMismatch {
                expected: vec![x.n_rows()],
                got: vec![y.len()],
            });
        }
        if self.cap == 0 {
            return Err(FireError::InvalidParameter("balance cap must be positive".into()));
        }
        if n_classes == 0 {
            return Err(FireError::InsufficientData("no classes to balance".into()));
        }

        let groups = class_indices(y, n_classes);
        if let Some(empty) = groups.iter().position(|g| g.is_empty()) {
            return Err(FireError::InsufficientData(format!(
                "class {} has no samples",
                empty
            )));
        }
        let largest = groups.iter().map(|g| g.len()).max().unwrap_or(0);
        let target_size = largest.min(self.cap);

        let mut picked = Vec::with_capacity(target_size * n_classes);
        for (class, members) in groups.iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(class as u64));
            picked.extend((0..target_size).map(|_| members[rng.gen_range(0..members.len())]));
        }
        let mut shuffle_rng = StdRng::seed_from_u64(self.seed);
        picked.shuffle(&mut shuffle_rng);

        info!(
            classes = n_classes,
            target_size,
            rows_in = y.len(),
            rows_out = picked.len(),
            "balanced classes"
        );
        Ok(Balanced {
            x: x.select_rows(&picked),
            y: picked.iter().map(|&i| y[i]).collect(),
            target_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced(counts: &[usize]) -> (FeatureMatrix, Vec<usize>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for (c, &n) in counts.iter().enumerate() {
            for i in 0..n {
                rows.push(vec![c as f64, i as f64]);
                y.push(c);
            }
        }
        (FeatureMatrix::from_rows(&rows, vec!["cls".into(), "i".into()]).unwrap(), y)
    }

    fn counts(y: &[usize], n_classes: usize) -> Vec<usize> {
        let mut c = vec![0; n_classes];
        for &v in y {
            c[v] += 1;
        }
        c
    }

    #[test]
    fn test_oversamples_to_largest_class() {
        let (x, y) = imbalanced(&[50, 3, 12]);
        let out = ClassBalancer::new(1000, 42).balance(&x, &y, 3).unwrap();
        assert_eq!(out.target_size, 50);
        assert_eq!(counts(&out.y, 3), vec![50, 50, 50]);
        assert_eq!(out.x.n_rows(), 150);
        for (i, &c) in out.y.iter().enumerate() {
            assert_eq!(out.x.get(i, 0), c as f64);
        }
    }

    #[test]
    fn test_cap_downsamples_large_classes() {
        let (x, y) = imbalanced(&[80, 5, 30]);
        let out = ClassBalancer::new(20, 42).balance(&x, &y, 3).unwrap();
        assert_eq!(counts(&out.y, 3), vec![20, 20, 20]);
    }

    #[test]
    fn test_balance_is_deterministic() {
        let (x, y) = imbalanced(&[9, 4]);
        let a = ClassBalancer::new(100, 3).balance(&x, &y, 2).unwrap();
        let b = ClassBalancer::new(100, 3).balance(&x, &y, 2).unwrap();
        assert_eq!(a.y, b.y);
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_classes_draw_independent_samples() {
        let (x, y) = imbalanced(&[10, 10]);
        let out = ClassBalancer::new(10, 42).balance(&x, &y, 2).unwrap();
        let positions = |class: usize| {
            let mut p: Vec<usize> = (0..out.y.len())
                .filter(|&i| out.y[i] == class)
                .map(|i| out.x.get(i, 1) as usize)
                .collect();
            p.sort_unstable();
            p
        };
        assert_eq!(positions(0).len(), 10);
        assert_ne!(positions(0), positions(1));
    }

    #[test]
    fn test_empty_class_is_insufficient_data() {
        let (x, y) = imbalanced(&[4, 0, 2]);
        let err = ClassBalancer::new(10, 1).balance(&x, &y, 3).unwrap_err();
        assert_eq!(err.kind(), "InsufficientDataError");
    }
}
