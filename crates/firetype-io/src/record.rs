use firetype_core::{FireError, FireResult, FireType};

use serde::{Deserialize, Serialize};

/// Columns every input file must carry. `type` is only required for training input.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "latitude",
    "longitude",
    "brightness",
    "scan",
    "track",
    "acq_date",
    "satellite",
    "confidence",
    "bright_t31",
    "frp",
    "daynight",
];

pub const LABEL_COLUMN: &str = "type";

/// One satellite fire detection as read from an input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub brightness: f64,
    pub scan: f64,
    pub track: f64,
    pub acq_date: String,
    pub satellite: String,
    pub confidence: f64,
    pub bright_t31: f64,
    pub frp: f64,
    pub daynight: String,
    #[serde(rename = "type", default)]
    pub fire_type: Option<FireType>,
}

impl FireRecord {
    /// Reject non-finite numeric fields. `row` is used for error reporting only.
    pub fn validate(&self, row: usize) -> FireResult<()> {
        let numeric = [
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("brightness", self.brightness),
            ("scan", self.scan),
            ("track", self.track),
            ("confidence", self.confidence),
            ("bright_t31", self.bright_t31),
            ("frp", self.frp),
        ];
        for (field, v) in numeric {
            if !v.is_finite() {
                return Err(FireError::Parse {
                    row,
                    field: field.into(),
                    message: format!("non-finite value {}", v),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FireRecord {
        FireRecord {
            latitude: -12.5,
            longitude: 131.2,
            brightness: 320.1,
            scan: 1.1,
            track: 1.0,
            acq_date: "2019-08-01".into(),
            satellite: "Terra".into(),
            confidence: 80.0,
            bright_t31: 300.0,
            frp: 12.0,
            daynight: "D".into(),
            fire_type: Some(FireType::Vegetation),
        }
    }

    #[test]
    fn test_validate_non_finite() {
        assert!(record().validate(0).is_ok());
        let mut r = record();
        r.frp = f64::NAN;
        let err = r.validate(3).unwrap_err();
        assert_eq!(
            err,
            FireError::Parse { row: 3, field: "frp".into(), message: "non-finite value NaN".into() }
        );
    }
}
