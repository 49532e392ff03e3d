use crate::record::FireRecord;
use firetype_core::{FireError, FireResult, FireType};

/// Values of one dataset column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn gather(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Ordered, columnar collection of fire detections sharing one schema.
///
/// Columns are only ever added or replaced whole; row filtering produces a
/// new dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    labels: Option<Vec<FireType>>,
    n_rows: usize,
}

impl Dataset {
    /// Build the raw columns from records. Labels are kept only if every record has one.
    pub fn from_records(records: &[FireRecord]) -> Dataset {
        let num = |f: fn(&FireRecord) -> f64| ColumnData::Numeric(records.iter().map(f).collect());
        let text = |f: fn(&FireRecord) -> &str| {
            ColumnData::Text(records.iter().map(|r| f(r).to_string()).collect())
        };
        let columns = vec![
            Column { name: "latitude".into(), data: num(|r| r.latitude) },
            Column { name: "longitude".into(), data: num(|r| r.longitude) },
            Column { name: "brightness".into(), data: num(|r| r.brightness) },
            Column { name: "scan".into(), data: num(|r| r.scan) },
            Column { name: "track".into(), data: num(|r| r.track) },
            Column { name: "acq_date".into(), data: text(|r| r.acq_date.as_str()) },
            Column { name: "satellite".into(), data: text(|r| r.satellite.as_str()) },
            Column { name: "confidence".into(), data: num(|r| r.confidence) },
            Column { name: "bright_t31".into(), data: num(|r| r.bright_t31) },
            Column { name: "frp".into(), data: num(|r| r.frp) },
            Column { name: "daynight".into(), data: text(|r| r.daynight.as_str()) },
        ];
        let labels: Option<Vec<FireType>> = records.iter().map(|r| r.fire_type).collect();
        Dataset {
            columns,
            labels,
            n_rows: records.len(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn labels(&self) -> Option<&[FireType]> {
        self.labels.as_deref()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> FireResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| FireError::SchemaMismatch {
                source_name: "dataset".into(),
                missing: vec![name.to_string()],
            })
    }

    pub fn numeric(&self, name: &str) -> FireResult<&[f64]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Ok(v),
            ColumnData::Text(_) => Err(FireError::InvalidParameter(format!(
                "column `{}` is text, expected numeric",
                name
            ))),
        }
    }

    pub fn text(&self, name: &str) -> FireResult<&[String]> {
        match &self.column(name)?.data {
            ColumnData::Text(v) => Ok(v),
            ColumnData::Numeric(_) => Err(FireError::InvalidParameter(format!(
                "column `{}` is numeric, expected text",
                name
            ))),
        }
    }

    /// Add a column, or replace an existing one of the same name.
    pub fn with_column(mut self, name: &str, data: ColumnData) -> FireResult<Dataset> {
        if data.len() != self.n_rows {
            return Err(FireError::ShapeMismatch {
                expected: vec![self.n_rows],
                got: vec![data.len()],
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data = data,
            None => self.columns.push(Column { name: name.to_string(), data }),
        }
        Ok(self)
    }

    /// New dataset holding only the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            columns: self
                .columns
                .iter()
                .map(|c| Column { name: c.name.clone(), data: c.data.gather(rows) })
                .collect(),
            labels: self
                .labels
                .as_ref()
                .map(|l| rows.iter().map(|&i| l[i]).collect()),
            n_rows: rows.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<FireRecord> {
        (0..3)
            .map(|i| FireRecord {
                latitude: i as f64,
                longitude: 10.0 + i as f64,
                brightness: 310.0,
                scan: 1.0,
                track: 1.0,
                acq_date: format!("2020-01-0{}", i + 1),
                satellite: if i % 2 == 0 { "Terra".into() } else { "Aqua".into() },
                confidence: 50.0,
                bright_t31: 290.0,
                frp: 5.0,
                daynight: "N".into(),
                fire_type: Some(FireType::Vegetation),
            })
            .collect()
    }

    #[test]
    fn test_from_records_columns() {
        let ds = Dataset::from_records(&records());
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.numeric("longitude").unwrap(), &[10.0, 11.0, 12.0]);
        assert_eq!(ds.text("satellite").unwrap()[1], "Aqua");
        assert_eq!(ds.labels().unwrap().len(), 3);
        assert!(ds.numeric("satellite").is_err());
        assert_eq!(ds.column("missing").unwrap_err().kind(), "SchemaMismatchError");
    }

    #[test]
    fn test_labels_dropped_when_any_missing() {
        let mut recs = records();
        recs[1].fire_type = None;
        assert!(Dataset::from_records(&recs).labels().is_none());
    }

    #[test]
    fn test_with_column_and_take_rows() {
        let ds = Dataset::from_records(&records())
            .with_column("double_lat", ColumnData::Numeric(vec![0.0, 2.0, 4.0]))
            .unwrap();
        assert!(ds.column_names().contains(&"double_lat"));
        assert!(ds.clone().with_column("bad", ColumnData::Numeric(vec![1.0])).is_err());

        let sub = ds.take_rows(&[2, 0]);
        assert_eq!(sub.n_rows(), 2);
        assert_eq!(sub.numeric("double_lat").unwrap(), &[4.0, 0.0]);
        assert_eq!(sub.text("acq_date").unwrap()[0], "2020-01-03");
    }
}
