use crate::error::FireError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tally of records excluded by a stage, keyed by error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecords {
    by_kind: BTreeMap<String, usize>,
}

impl RejectedRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, err: &FireError) {
        *self.by_kind.entry(err.kind().to_string()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &RejectedRecords) {
        for (kind, n) in &other.by_kind {
            *self.by_kind.entry(kind.clone()).or_insert(0) += n;
        }
    }

    pub fn total(&self) -> usize {
        self.by_kind.values().sum()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.by_kind.get(kind).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    pub fn by_kind(&self) -> &BTreeMap<String, usize> {
        &self.by_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_and_merge() {
        let mut a = RejectedRecords::new();
        a.record(&FireError::Parse { row: 1, field: "acq_date".into(), message: "bad".into() });
        a.record(&FireError::Parse { row: 2, field: "frp".into(), message: "bad".into() });
        let mut b = RejectedRecords::new();
        b.record(&FireError::UnknownCategory { column: "satellite".into(), value: "X".into() });
        a.merge(&b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.count("ParseError"), 2);
        assert_eq!(a.count("UnknownCategoryError"), 1);
    }
}
