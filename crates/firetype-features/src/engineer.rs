use crate::derive::{parse_acq_date, ConfidenceCategory, FrpCategory, Season};
use crate::encoder::CategoryEncoders;
use firetype_core::{FeatureMatrix, FireError, FireResult, RejectedRecords};
use firetype_io::{ColumnData, Dataset, FireRecord};

use tracing::{info, warn};

/// Text columns that are integer-encoded before modelling.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "satellite",
    "daynight",
    "season",
    "frp_category",
    "confidence_category",
];

/// Model input columns, in matrix order.
pub const FEATURE_COLUMNS: [&str; 18] = [
    "latitude",
    "longitude",
    "brightness",
    "scan",
    "track",
    "confidence",
    "bright_t31",
    "frp",
    "satellite",
    "daynight",
    "year",
    "month",
    "day_of_year",
    "season",
    "lat_lon_interaction",
    "temp_diff",
    "frp_category",
    "confidence_category",
];

/// Dataset augmented with derived columns, plus the rows that were dropped.
///
/// `rows[i]` is the input row behind output row `i`.
#[derive(Debug, Clone)]
pub struct Engineered {
    pub dataset: Dataset,
    pub rows: Vec<usize>,
    pub rejected: RejectedRecords,
}

struct Derived {
    year: f64,
    month: f64,
    day_of_year: f64,
    season: &'static str,
    lat_lon: f64,
    temp_diff: f64,
    frp_category: &'static str,
    confidence_category: &'static str,
}

fn derive_row(ds: &Dataset, row: usize) -> FireResult<Derived> {
    let date = parse_acq_date(&ds.text("acq_date")?[row], row)?;
    let season = Season::from_month(date.month).ok_or_else(|| FireError::Parse {
        row,
        field: "acq_date".into(),
        message: format!("month {} out of range", date.month),
    })?;
    let frp = ds.numeric("frp")?[row];
    let frp_category = FrpCategory::from_frp(frp).ok_or_else(|| FireError::Parse {
        row,
        field: "frp".into(),
        message: format!("negative fire radiative power {}", frp),
    })?;
    let confidence = ds.numeric("confidence")?[row];
    let confidence_category =
        ConfidenceCategory::from_confidence(confidence).ok_or_else(|| FireError::Parse {
            row,
            field: "confidence".into(),
            message: format!("confidence {} outside [0, 100]", confidence),
        })?;
    let lat = ds.numeric("latitude")?[row];
    let lon = ds.numeric("longitude")?[row];
    let brightness = ds.numeric("brightness")?[row];
    let bright_t31 = ds.numeric("bright_t31")?[row];

    Ok(Derived {
        year: date.year as f64,
        month: date.month as f64,
        day_of_year: date.day_of_year as f64,
        season: season.as_str(),
        lat_lon: lat * lon,
        temp_diff: brightness - bright_t31,
        frp_category: frp_category.as_str(),
        confidence_category: confidence_category.as_str(),
    })
}

/// Add temporal, spatial and bucket columns.
///
/// Rows whose date or bucketed fields cannot be interpreted are excluded
/// and counted. Missing source columns abort with `SchemaMismatch`.
pub fn engineer_features(dataset: &Dataset) -> FireResult<Engineered> {
    for name in ["acq_date", "frp", "confidence", "latitude", "longitude", "brightness", "bright_t31"] {
        dataset.column(name)?;
    }

    let mut kept = Vec::with_capacity(dataset.n_rows());
    let mut derived = Vec::with_capacity(dataset.n_rows());
    let mut rejected = RejectedRecords::new();
    for row in 0..dataset.n_rows() {
        match derive_row(dataset, row) {
            Ok(d) => {
                kept.push(row);
                derived.push(d);
            }
            Err(e) => {
                warn!(row, error = %e, "dropping record during feature engineering");
                rejected.record(&e);
            }
        }
    }

    let augmented = augment(dataset, &kept, &derived)?;
    info!(
        rows = augmented.n_rows(),
        rejected = rejected.total(),
        "feature engineering complete"
    );
    Ok(Engineered {
        dataset: augmented,
        rows: kept,
        rejected,
    })
}

/// Engineer a single record, failing instead of dropping it.
pub fn engineer_record(record: &FireRecord) -> FireResult<Dataset> {
    let dataset = Dataset::from_records(std::slice::from_ref(record));
    let derived = derive_row(&dataset, 0)?;
    augment(&dataset, &[0], &[derived])
}

fn augment(dataset: &Dataset, kept: &[usize], derived: &[Derived]) -> FireResult<Dataset> {
    let base = if kept.len() == dataset.n_rows() {
        dataset.clone()
    } else {
        dataset.take_rows(kept)
    };
    let num = |f: fn(&Derived) -> f64| ColumnData::Numeric(derived.iter().map(f).collect());
    let text = |f: fn(&Derived) -> &'static str| {
        ColumnData::Text(derived.iter().map(|d| f(d).to_string()).collect())
    };
    base.with_column("year", num(|d| d.year))?
        .with_column("month", num(|d| d.month))?
        .with_column("day_of_year", num(|d| d.day_of_year))?
        .with_column("season", text(|d| d.season))?
        .with_column("lat_lon_interaction", num(|d| d.lat_lon))?
        .with_column("temp_diff", num(|d| d.temp_diff))?
        .with_column("frp_category", text(|d| d.frp_category))?
        .with_column("confidence_category", text(|d| d.confidence_category))
}

/// Numeric feature matrix built from an engineered dataset.
///
/// `rows[i]` is the dataset row behind matrix row `i`.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub matrix: FeatureMatrix,
    pub rows: Vec<usize>,
    pub rejected: RejectedRecords,
}

/// Encode one engineered row into `FEATURE_COLUMNS` order.
pub fn encode_row(dataset: &Dataset, encoders: &CategoryEncoders, row: usize) -> FireResult<Vec<f64>> {
    FEATURE_COLUMNS
        .iter()
        .map(|&name| match encoders.get(name) {
            Some(enc) => Ok(enc.encode(&dataset.text(name)?[row])? as f64),
            None => Ok(dataset.numeric(name)?[row]),
        })
        .collect()
}

/// Encode categorical columns and assemble the feature matrix.
///
/// Rows carrying a category value the encoders never saw are excluded and
/// counted as `UnknownCategory`.
pub fn encode_features(dataset: &Dataset, encoders: &CategoryEncoders) -> FireResult<Encoded> {
    for name in FEATURE_COLUMNS {
        dataset.column(name)?;
    }
    for name in CATEGORICAL_COLUMNS {
        if encoders.get(name).is_none() {
            return Err(FireError::NotFitted("category encoder"));
        }
    }

    let mut values = Vec::with_capacity(dataset.n_rows() * FEATURE_COLUMNS.len());
    let mut rows = Vec::with_capacity(dataset.n_rows());
    let mut rejected = RejectedRecords::new();
    for row in 0..dataset.n_rows() {
        match encode_row(dataset, encoders, row) {
            Ok(v) => {
                values.extend(v);
                rows.push(row);
            }
            Err(e) if e.is_row_level() => {
                warn!(row, error = %e, "dropping record during encoding");
                rejected.record(&e);
            }
            Err(e) => return Err(e),
        }
    }

    let columns = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
    let matrix = FeatureMatrix::new(values, rows.len(), columns)?;
    Ok(Encoded {
        matrix,
        rows,
        rejected,
    })
}
