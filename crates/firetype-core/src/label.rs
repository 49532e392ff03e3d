use crate::error::{FireError, FireResult};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fire type reported with each detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FireType {
    /// Presumed vegetation fire.
    Vegetation,
    /// Active volcano.
    Volcano,
    /// Other static land source.
    StaticLand,
    /// Offshore detection.
    Offshore,
}

impl FireType {
    pub const ALL: [FireType; 4] = [
        FireType::Vegetation,
        FireType::Volcano,
        FireType::StaticLand,
        FireType::Offshore,
    ];

    pub fn code(self) -> u8 {
        match self {
            FireType::Vegetation => 0,
            FireType::Volcano => 1,
            FireType::StaticLand => 2,
            FireType::Offshore => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<FireType> {
        FireType::ALL.iter().copied().find(|t| t.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            FireType::Vegetation => "vegetation",
            FireType::Volcano => "volcano",
            FireType::StaticLand => "static_land",
            FireType::Offshore => "offshore",
        }
    }
}

impl TryFrom<u8> for FireType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FireType::from_code(code).ok_or_else(|| format!("unknown fire type code {}", code))
    }
}

impl From<FireType> for u8 {
    fn from(t: FireType) -> u8 {
        t.code()
    }
}

impl fmt::Display for FireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

/// Label domain of a fitted model: the classes observed at fit time, sorted by code.
///
/// Models work on contiguous class indices `0..len()`; this maps them back
/// to fire types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels {
    classes: Vec<FireType>,
}

impl ClassLabels {
    /// Discover the domain from observed labels. At least two classes are required.
    pub fn from_observed(labels: &[FireType]) -> FireResult<Self> {
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(FireError::InsufficientData(format!(
                "need at least 2 fire types to classify, found {}",
                classes.len()
            )));
        }
        Ok(ClassLabels { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[FireType] {
        &self.classes
    }

    pub fn index_of(&self, t: FireType) -> Option<usize> {
        self.classes.binary_search(&t).ok()
    }

    pub fn label(&self, index: usize) -> Option<FireType> {
        self.classes.get(index).copied()
    }

    /// Map fire types to class indices, failing on types outside the domain.
    pub fn encode(&self, labels: &[FireType]) -> FireResult<Vec<usize>> {
        labels
            .iter()
            .map(|&t| {
                self.index_of(t).ok_or_else(|| FireError::UnknownCategory {
                    column: "type".into(),
                    value: t.code().to_string(),
                })
            })
            .collect()
    }

    /// Map class indices back to fire types.
    pub fn decode(&self, indices: &[usize]) -> FireResult<Vec<FireType>> {
        indices
            .iter()
            .map(|&i| {
                self.label(i).ok_or_else(|| {
                    FireError::InvalidParameter(format!("class index {} outside label domain", i))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for t in FireType::ALL {
            assert_eq!(FireType::from_code(t.code()), Some(t));
        }
        assert_eq!(FireType::from_code(7), None);
        assert!(FireType::try_from(4u8).is_err());
    }

    #[test]
    fn test_domain_without_volcano() {
        let observed = vec![FireType::Offshore, FireType::Vegetation, FireType::StaticLand, FireType::Vegetation];
        let labels = ClassLabels::from_observed(&observed).unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels.classes(), &[FireType::Vegetation, FireType::StaticLand, FireType::Offshore]);

        let idx = labels.encode(&observed).unwrap();
        assert_eq!(idx, vec![2, 0, 1, 0]);
        assert_eq!(labels.decode(&idx).unwrap(), observed);

        let err = labels.encode(&[FireType::Volcano]).unwrap_err();
        assert_eq!(err.kind(), "UnknownCategoryError");
    }

    #[test]
    fn test_single_class_rejected() {
        let err = ClassLabels::from_observed(&[FireType::Vegetation; 5]).unwrap_err();
        assert_eq!(err.kind(), "InsufficientDataError");
    }
}
