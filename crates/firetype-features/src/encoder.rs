use firetype_core::{FireError, FireResult};
use firetype_io::Dataset;

use serde::{Deserialize, Serialize};

/// Maps the observed values of one categorical column to integer codes.
///
/// Codes follow the sorted order of the values seen during `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    pub column: String,
    pub classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fit the encoder on the values of one column.
    pub fn fit(column: &str, values: &[String]) -> Self {
        let mut unique: Vec<String> = values.to_vec();
        unique.sort();
        unique.dedup();
        CategoryEncoder {
            column: column.to_string(),
            classes: unique,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Code for a value; unseen values are an error, never a default.
    pub fn encode(&self, value: &str) -> FireResult<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .map_err(|_| FireError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Inverse of `encode`.
    pub fn decode(&self, code: usize) -> FireResult<&str> {
        self.classes
            .get(code)
            .map(|s| s.as_str())
            .ok_or_else(|| FireError::InvalidParameter(format!(
                "code {} outside 0..{} for column `{}`",
                code,
                self.classes.len(),
                self.column
            )))
    }
}

/// One fitted encoder per categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoders {
    encoders: Vec<CategoryEncoder>,
}

impl CategoryEncoders {
    /// Fit an encoder for each named text column of the dataset.
    pub fn fit(dataset: &Dataset, columns: &[&str]) -> FireResult<Self> {
        let encoders = columns
            .iter()
            .map(|&name| Ok(CategoryEncoder::fit(name, dataset.text(name)?)))
            .collect::<FireResult<Vec<_>>>()?;
        Ok(CategoryEncoders { encoders })
    }

    pub fn get(&self, column: &str) -> Option<&CategoryEncoder> {
        self.encoders.iter().find(|e| e.column == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryEncoder> {
        self.encoders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let seen = values(&["Terra", "Aqua", "Terra", "Aqua", "Terra"]);
        let enc = CategoryEncoder::fit("satellite", &seen);
        assert_eq!(enc.n_classes(), 2);
        assert_eq!(enc.encode("Aqua").unwrap(), 0);
        assert_eq!(enc.encode("Terra").unwrap(), 1);
        for v in &seen {
            let code = enc.encode(v).unwrap();
            assert_eq!(enc.decode(code).unwrap(), v);
        }
    }

    #[test]
    fn test_unseen_value_is_error() {
        let enc = CategoryEncoder::fit("satellite", &values(&["Terra", "Aqua"]));
        let err = enc.encode("N20").unwrap_err();
        assert_eq!(
            err,
            FireError::UnknownCategory { column: "satellite".into(), value: "N20".into() }
        );
        assert!(enc.decode(5).is_err());
    }
}
