use crate::dataset::Dataset;
use crate::record::{FireRecord, LABEL_COLUMN, REQUIRED_COLUMNS};
use firetype_core::{FireError, FireResult, RejectedRecords};

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Records read from one or more sources, plus the tally of rows left out.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub records: Vec<FireRecord>,
    pub rejected: RejectedRecords,
}

impl Ingested {
    pub fn dataset(&self) -> Dataset {
        Dataset::from_records(&self.records)
    }
}

/// Read delimited fire records from any reader.
///
/// Fails with `SchemaMismatch` if a required column is absent. Rows that
/// fail to parse are logged, counted and skipped.
pub fn read_records<R: Read>(reader: R, source_name: &str, require_label: bool) -> FireResult<Ingested> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| FireError::Io(format!("{}: {}", source_name, e)))?
        .clone();

    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == **c))
        .map(|c| c.to_string())
        .collect();
    if require_label && !headers.iter().any(|h| h == LABEL_COLUMN) {
        missing.push(LABEL_COLUMN.to_string());
    }
    if !missing.is_empty() {
        return Err(FireError::SchemaMismatch {
            source_name: source_name.to_string(),
            missing,
        });
    }

    let mut out = Ingested::default();
    for (row, result) in rdr.deserialize::<FireRecord>().enumerate() {
        let parsed = result
            .map_err(|e| csv_row_error(&e, row, &headers))
            .and_then(|rec| rec.validate(row).map(|_| rec))
            .and_then(|rec| {
                if require_label && rec.fire_type.is_none() {
                    Err(FireError::Parse {
                        row,
                        field: LABEL_COLUMN.into(),
                        message: "missing label".into(),
                    })
                } else {
                    Ok(rec)
                }
            });
        match parsed {
            Ok(rec) => out.records.push(rec),
            Err(e) => {
                warn!(source = source_name, error = %e, "skipping record");
                out.rejected.record(&e);
            }
        }
    }

    debug!(
        source = source_name,
        rows = out.records.len(),
        rejected = out.rejected.total(),
        "read source"
    );
    Ok(out)
}

/// Load and concatenate files in the given order.
pub fn load_sources<P: AsRef<Path>>(paths: &[P], require_label: bool) -> FireResult<Ingested> {
    if paths.is_empty() {
        return Err(FireError::InvalidParameter("no input files given".into()));
    }
    let mut all = Ingested::default();
    for path in paths {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| FireError::Io(format!("{}: {}", name, e)))?;
        let part = read_records(file, &name, require_label)?;
        all.records.extend(part.records);
        all.rejected.merge(&part.rejected);
    }
    info!(
        files = paths.len(),
        rows = all.records.len(),
        rejected = all.rejected.total(),
        "ingestion complete"
    );
    Ok(all)
}

fn csv_row_error(err: &csv::Error, row: usize, headers: &csv::StringRecord) -> FireError {
    let field = match err.kind() {
        csv::ErrorKind::Deserialize { err: de, .. } => de
            .field()
            .and_then(|i| headers.get(i as usize))
            .unwrap_or("record")
            .to_string(),
        _ => "record".to_string(),
    };
    FireError::Parse {
        row,
        field,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firetype_core::FireType;
    use std::io::Write;

    const HEADER: &str = "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight,type";

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        writeln!(f, "{}", HEADER).unwrap();
        write!(f, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_read_records_skips_bad_rows() {
        let csv = format!(
            "{}\n{}\n{}\n{}\n",
            HEADER,
            "-11.8,142.1,313.0,1.0,1.0,2019-08-01,0105,Terra,MODIS,48,6.3,297.3,6.6,D,0",
            "-11.9,142.2,not_a_number,1.0,1.0,2019-08-01,0105,Terra,MODIS,48,6.3,297.3,6.6,D,0",
            "-12.0,142.3,320.0,1.2,1.1,2019-08-02,0130,Aqua,MODIS,71,6.3,300.1,20.4,N,9",
        );
        let out = read_records(csv.as_bytes(), "inline", true).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].fire_type, Some(FireType::Vegetation));
        assert_eq!(out.rejected.count("ParseError"), 2);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let csv = "latitude,longitude\n1.0,2.0\n";
        let err = read_records(csv.as_bytes(), "inline", false).unwrap_err();
        match err {
            FireError::SchemaMismatch { missing, .. } => {
                assert!(missing.contains(&"frp".to_string()));
                assert!(!missing.contains(&"type".to_string()));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_label_column_required_for_training() {
        let header = HEADER.trim_end_matches(",type");
        let csv = format!("{}\n", header);
        assert!(read_records(csv.as_bytes(), "inline", false).is_ok());
        let err = read_records(csv.as_bytes(), "inline", true).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatchError");
    }

    #[test]
    fn test_load_sources_preserves_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(&dir, "a.csv", "1.0,1.0,300,1,1,2020-01-01,0000,Terra,MODIS,50,6,290,5,D,0\n");
        let b = write_file(
            &dir,
            "b.csv",
            "2.0,2.0,300,1,1,2020-01-02,0000,Aqua,MODIS,50,6,290,5,N,2\n3.0,3.0,300,1,1,2020-01-03,0000,Aqua,MODIS,50,6,290,5,N,3\n",
        );
        let out = load_sources(&[a, b], true).unwrap();
        let lats: Vec<f64> = out.records.iter().map(|r| r.latitude).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
        assert_eq!(out.dataset().n_rows(), 3);
    }

    #[test]
    fn test_load_sources_aborts_on_bad_schema() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "good.csv", "");
        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "latitude,longitude\n1,2\n").unwrap();
        let err = load_sources(&[good, bad], true).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatchError");
    }
}
