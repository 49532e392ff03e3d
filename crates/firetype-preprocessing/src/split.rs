use firetype_core::{FeatureMatrix, FireError, FireResult};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;

/// Train/test partition of a feature matrix and its labels.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: FeatureMatrix,
    pub x_test: FeatureMatrix,
    pub y_train: Vec<usize>,
    pub y_test: Vec<usize>,
}

/// Group row indices by class, in row order.
pub fn class_indices(y: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_classes];
    for (i, &c) in y.iter().enumerate() {
        if c < n_classes {
            groups[c].push(i);
        }
    }
    groups
}

/// Stratified split: each class contributes `round(n_c * test_ratio)` rows to
/// the test set, clamped so both sides keep at least one row of every class.
pub fn train_test_split(
    x: &FeatureMatrix,
    y: &[usize],
    n_classes: usize,
    test_ratio: f64,
    seed: u64,
) -> FireResult<TrainTestSplit> {
    if x.n_rows() != y.len() {
        return Err(FireError::ShapeMismatch {
            expected: vec![x.n_rows()],
            got: vec![y.len()],
        });
    }
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(FireError::InvalidParameter(format!(
            "test_ratio must lie in (0, 1), got {}",
            test_ratio
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();
    for (class, mut members) in class_indices(y, n_classes).into_iter().enumerate() {
        if members.len() < 2 {
            return Err(FireError::InsufficientData(format!(
                "class {} has {} rows, stratified split needs at least 2",
                class,
                members.len()
            )));
        }
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_ratio).round() as usize).clamp(1, members.len() - 1);
        test_idx.extend_from_slice(&members[..n_test]);
        train_idx.extend_from_slice(&members[n_test..]);
    }
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok(TrainTestSplit {
        x_train: x.select_rows(&train_idx),
        x_test: x.select_rows(&test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

/// One cross-validation fold as row indices into the training data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Deterministic stratified k-fold: rows of each class are dealt round-robin
/// across folds, continuing the deal from one class to the next.
pub fn stratified_k_fold(y: &[usize], n_classes: usize, n_folds: usize) -> FireResult<Vec<Fold>> {
    if n_folds < 2 {
        return Err(FireError::InvalidParameter(format!(
            "need at least 2 folds, got {}",
            n_folds
        )));
    }
    if y.len() < n_folds {
        return Err(FireError::InsufficientData(format!(
            "{} rows cannot be split into {} folds",
            y.len(),
            n_folds
        )));
    }

    let mut assignment = vec![0usize; y.len()];
    let mut deal = 0usize;
    for (class, members) in class_indices(y, n_classes).iter().enumerate() {
        if !members.is_empty() && members.len() < n_folds {
            warn!(class, rows = members.len(), n_folds, "class smaller than fold count");
        }
        for &i in members {
            assignment[i] = deal % n_folds;
            deal += 1;
        }
    }

    Ok((0..n_folds)
        .map(|f| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| assignment[i] == f);
            Fold { train, test }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(per_class: usize, n_classes: usize) -> (FeatureMatrix, Vec<usize>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for c in 0..n_classes {
            for i in 0..per_class {
                rows.push(vec![c as f64, i as f64]);
                y.push(c);
            }
        }
        (FeatureMatrix::from_rows(&rows, vec!["a".into(), "b".into()]).unwrap(), y)
    }

    #[test]
    fn test_train_test_split_stratified() {
        let (x, y) = data(100, 3);
        let s = train_test_split(&x, &y, 3, 0.2, 42).unwrap();
        assert_eq!(s.x_train.n_rows(), 240);
        assert_eq!(s.x_test.n_rows(), 60);
        for c in 0..3 {
            assert_eq!(s.y_test.iter().filter(|&&v| v == c).count(), 20);
        }
        // Labels stay aligned with their rows
        for (i, &c) in s.y_train.iter().enumerate() {
            assert_eq!(s.x_train.get(i, 0), c as f64);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = data(10, 2);
        let a = train_test_split(&x, &y, 2, 0.3, 7).unwrap();
        let b = train_test_split(&x, &y, 2, 0.3, 7).unwrap();
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.x_test, b.x_test);
    }

    #[test]
    fn test_split_rejects_tiny_class() {
        let x = FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0]], vec!["a".into()]).unwrap();
        let err = train_test_split(&x, &[0, 0, 1], 2, 0.5, 1).unwrap_err();
        assert_eq!(err.kind(), "InsufficientDataError");
        assert!(train_test_split(&x, &[0, 0, 1], 2, 1.5, 1).is_err());
    }

    #[test]
    fn test_stratified_k_fold_partitions_rows() {
        let y: Vec<usize> = (0..30).map(|i| i % 3).collect();
        let folds = stratified_k_fold(&y, 3, 5).unwrap();
        assert_eq!(folds.len(), 5);
        let mut seen = vec![0usize; y.len()];
        for f in &folds {
            assert_eq!(f.test.len(), 6);
            assert_eq!(f.train.len() + f.test.len(), y.len());
            for &i in &f.test {
                seen[i] += 1;
            }
            for c in 0..3 {
                assert_eq!(f.test.iter().filter(|&&i| y[i] == c).count(), 2);
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_k_fold_errors() {
        assert!(stratified_k_fold(&[0, 1, 0], 2, 1).is_err());
        assert_eq!(stratified_k_fold(&[0, 1], 2, 3).unwrap_err().kind(), "InsufficientDataError");
    }
}
