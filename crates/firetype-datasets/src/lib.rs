//! Synthetic satellite fire detections with class-dependent value ranges,
//! used by tests and demos in place of real FIRMS exports.

use firetype_core::{FireError, FireResult, FireType};
use firetype_io::FireRecord;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Value ranges a synthetic detection of one fire type is drawn from.
struct Profile {
    latitude: (f64, f64),
    longitude: (f64, f64),
    brightness: (f64, f64),
    frp: (f64, f64),
    confidence: (f64, f64),
    /// Probability that a detection is made at night.
    night: f64,
}

fn profile(fire_type: FireType) -> Profile {
    match fire_type {
        FireType::Vegetation => Profile {
            latitude: (-35.0, -12.0),
            longitude: (115.0, 150.0),
            brightness: (305.0, 340.0),
            frp: (2.0, 60.0),
            confidence: (30.0, 90.0),
            night: 0.2,
        },
        FireType::Volcano => Profile {
            latitude: (-8.0, 15.0),
            longitude: (95.0, 125.0),
            brightness: (345.0, 420.0),
            frp: (120.0, 900.0),
            confidence: (80.0, 100.0),
            night: 0.5,
        },
        FireType::StaticLand => Profile {
            latitude: (20.0, 45.0),
            longitude: (40.0, 60.0),
            brightness: (315.0, 335.0),
            frp: (15.0, 120.0),
            confidence: (60.0, 100.0),
            night: 0.8,
        },
        FireType::Offshore => Profile {
            latitude: (-5.0, 6.0),
            longitude: (0.0, 10.0),
            brightness: (295.0, 315.0),
            frp: (1.0, 25.0),
            confidence: (0.0, 60.0),
            night: 0.9,
        },
    }
}

fn draw(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    rng.gen_range(lo..hi)
}

/// Generate `n_per_class` labelled detections for each fire type in `classes`.
///
/// Records are emitted class by class, so callers that care about order
/// should shuffle. The same seed always yields the same records.
pub fn make_fire_records(classes: &[FireType], n_per_class: usize, seed: u64) -> Vec<FireRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(classes.len() * n_per_class);

    for &fire_type in classes {
        let p = profile(fire_type);
        for _ in 0..n_per_class {
            let brightness = draw(&mut rng, p.brightness);
            let month = rng.gen_range(1..=12);
            let day = rng.gen_range(1..=28);
            let daynight = if rng.gen_bool(p.night) { "N" } else { "D" };
            let satellite = if rng.gen_bool(0.5) { "Terra" } else { "Aqua" };
            records.push(FireRecord {
                latitude: draw(&mut rng, p.latitude),
                longitude: draw(&mut rng, p.longitude),
                brightness,
                scan: draw(&mut rng, (1.0, 2.5)),
                track: draw(&mut rng, (1.0, 1.6)),
                acq_date: format!("2019-{:02}-{:02}", month, day),
                satellite: satellite.to_string(),
                confidence: draw(&mut rng, p.confidence).round(),
                bright_t31: brightness - draw(&mut rng, (5.0, 30.0)),
                frp: draw(&mut rng, p.frp),
                daynight: daynight.to_string(),
                fire_type: Some(fire_type),
            });
        }
    }
    records
}

/// Render records as CSV text with a header row, as read by `firetype_io::read_records`.
pub fn to_csv_string(records: &[FireRecord]) -> FireResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| FireError::Serialization(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| FireError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| FireError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_fire_records() {
        let classes = [FireType::Vegetation, FireType::StaticLand];
        let records = make_fire_records(&classes, 25, 42);
        assert_eq!(records.len(), 50);
        assert!(records[..25].iter().all(|r| r.fire_type == Some(FireType::Vegetation)));
        for (i, r) in records.iter().enumerate() {
            r.validate(i).unwrap();
            assert!(r.frp >= 0.0);
            assert!((0.0..=100.0).contains(&r.confidence));
            assert_eq!(r.acq_date.len(), 10);
        }
        assert_eq!(records, make_fire_records(&classes, 25, 42));
    }

    #[test]
    fn test_csv_round_trips_through_ingest() {
        let records = make_fire_records(&[FireType::Volcano, FireType::Offshore], 5, 3);
        let text = to_csv_string(&records).unwrap();
        assert!(text.starts_with("latitude,longitude,brightness"));

        let ingested = firetype_io::read_records(text.as_bytes(), "synthetic", true).unwrap();
        assert!(ingested.rejected.is_empty());
        assert_eq!(ingested.records.len(), 10);
        assert_eq!(ingested.records[9].fire_type, Some(FireType::Offshore));
    }
}
