use firetype_core::{FireError, FireResult};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Save any serializable value as pretty JSON.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> FireResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| FireError::Serialization(e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a value previously written with `save_json`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> FireResult<T> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| FireError::Serialization(e.to_string()))
}

/// Write rows of string cells with a header line.
pub fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<String>]) -> FireResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| FireError::Io(e.to_string()))?;
    wtr.write_record(headers).map_err(|e| FireError::Io(e.to_string()))?;
    for row in rows {
        wtr.write_record(row).map_err(|e| FireError::Io(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Weights {
        name: String,
        values: Vec<f64>,
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        let w = Weights { name: "scaler".into(), values: vec![0.5, -1.25] };
        save_json(&w, &path).unwrap();
        let back: Weights = load_json(&path).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json::<Weights>(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        write_csv(&path, &["row", "type"], &[vec!["0".into(), "2".into()]]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "row,type\n0,2\n");
    }
}
