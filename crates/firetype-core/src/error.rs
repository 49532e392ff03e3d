use thiserror::Error;

/// Error type shared by every firetype stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FireError {
    #[error("Schema mismatch in {source_name}: missing columns {missing:?}")]
    SchemaMismatch {
        source_name: String,
        missing: Vec<String>,
    },

    #[error("Parse error at row {row}, field `{field}`: {message}")]
    Parse {
        row: usize,
        field: String,
        message: String,
    },

    #[error("Unknown category `{value}` for column `{column}`")]
    UnknownCategory { column: String, value: String },

    #[error("Invalid k: requested {k} features but only {available} are available")]
    InvalidK { k: usize, available: usize },

    #[error("Tuning failed: {0}")]
    Tuning(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("{0} used before fit()")]
    NotFitted(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FireError {
    /// Stable name of the error kind, used in stage failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FireError::SchemaMismatch { .. } => "SchemaMismatchError",
            FireError::Parse { .. } => "ParseError",
            FireError::UnknownCategory { .. } => "UnknownCategoryError",
            FireError::InvalidK { .. } => "InvalidKError",
            FireError::Tuning(_) => "TuningError",
            FireError::InsufficientData(_) => "InsufficientDataError",
            FireError::ShapeMismatch { .. } => "ShapeMismatchError",
            FireError::NotFitted(_) => "NotFittedError",
            FireError::InvalidParameter(_) => "InvalidParameterError",
            FireError::Io(_) => "IoError",
            FireError::Serialization(_) => "SerializationError",
        }
    }

    /// Whether the error concerns a single record rather than the whole dataset.
    pub fn is_row_level(&self) -> bool {
        matches!(self, FireError::Parse { .. } | FireError::UnknownCategory { .. })
    }
}

impl From<std::io::Error> for FireError {
    fn from(e: std::io::Error) -> Self {
        FireError::Io(e.to_string())
    }
}

pub type FireResult<T> = Result<T, FireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let e = FireError::InvalidK { k: 12, available: 10 };
        assert_eq!(e.kind(), "InvalidKError");
        assert!(!e.is_row_level());

        let e = FireError::UnknownCategory {
            column: "satellite".into(),
            value: "NOAA-20".into(),
        };
        assert_eq!(e.kind(), "UnknownCategoryError");
        assert!(e.is_row_level());
        assert_eq!(e.to_string(), "Unknown category `NOAA-20` for column `satellite`");
    }
}
