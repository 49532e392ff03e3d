use firetype_core::{FireError, FireResult};

use chrono::{Datelike, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar fields taken from an acquisition date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcqDate {
    pub year: i32,
    pub month: u32,
    pub day_of_year: u32,
}

/// Parse an acquisition date (`YYYY-MM-DD`).
pub fn parse_acq_date(raw: &str, row: usize) -> FireResult<AcqDate> {
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| FireError::Parse {
        row,
        field: "acq_date".into(),
        message: format!("`{}`: {}", raw, e),
    })?;
    Ok(AcqDate {
        year: date.year(),
        month: date.month(),
        day_of_year: date.ordinal(),
    })
}

/// Meteorological season (northern-hemisphere month grouping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Option<Season> {
        match month {
            12 | 1 | 2 => Some(Season::Winter),
            3..=5 => Some(Season::Spring),
            6..=8 => Some(Season::Summer),
            9..=11 => Some(Season::Autumn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
        }
    }
}

/// Fire radiative power bucket. Edges are left-closed: 10.0 is Medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrpCategory {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl FrpCategory {
    /// `None` for negative power.
    pub fn from_frp(frp: f64) -> Option<FrpCategory> {
        if frp < 0.0 {
            None
        } else if frp < 10.0 {
            Some(FrpCategory::Low)
        } else if frp < 50.0 {
            Some(FrpCategory::Medium)
        } else if frp < 200.0 {
            Some(FrpCategory::High)
        } else {
            Some(FrpCategory::VeryHigh)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrpCategory::Low => "Low",
            FrpCategory::Medium => "Medium",
            FrpCategory::High => "High",
            FrpCategory::VeryHigh => "VeryHigh",
        }
    }
}

/// Detection confidence bucket over [0, 100]; the last bucket includes 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceCategory {
    Low,
    Medium,
    High,
}

impl ConfidenceCategory {
    /// `None` outside [0, 100].
    pub fn from_confidence(confidence: f64) -> Option<ConfidenceCategory> {
        if !(0.0..=100.0).contains(&confidence) {
            None
        } else if confidence < 30.0 {
            Some(ConfidenceCategory::Low)
        } else if confidence < 70.0 {
            Some(ConfidenceCategory::Medium)
        } else {
            Some(ConfidenceCategory::High)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceCategory::Low => "Low",
            ConfidenceCategory::Medium => "Medium",
            ConfidenceCategory::High => "High",
        }
    }
}
