//! Field extraction and the two coordinate gates.
//!
//! The reference box rejects malformed coordinates before any state is
//! touched. The regional box is checked later, after the movement estimate,
//! and is deliberately kept as its own gate.

use model::{BBox, REFERENCE_BOX, REGIONAL_BOX};

use crate::record::{self, RawRecord};

/// Why a record was dropped.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("unresolved identifier {0:?}")]
    UnresolvedIdentity(String),
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("invalid latitude {0:?}")]
    InvalidLatitude(String),
    #[error("invalid longitude {0:?}")]
    InvalidLongitude(String),
    #[error("position {lat}, {lon} outside service region")]
    OutsideRegion { lat: f64, lon: f64 },
}

/// Typed fields of one record that passed the reference box.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub signal_strength: f64,
}

pub fn extract_fields(rec: &RawRecord<'_>) -> Result<Fields, Rejection> {
    let date = required(rec, record::DATE)?;
    let time = required(rec, record::TIME)?;
    let timestamp = format!("{date} {time}");

    let lat_raw = required(rec, record::LATITUDE)?;
    let latitude = coordinate(lat_raw, &REFERENCE_BOX, BBox::contains_lat)
        .ok_or_else(|| Rejection::InvalidLatitude(lat_raw.to_string()))?;

    let lon_raw = required(rec, record::LONGITUDE)?;
    let longitude = coordinate(lon_raw, &REFERENCE_BOX, BBox::contains_lon)
        .ok_or_else(|| Rejection::InvalidLongitude(lon_raw.to_string()))?;

    Ok(Fields {
        timestamp,
        latitude,
        longitude,
        altitude: lenient(rec, record::ALTITUDE),
        speed: lenient(rec, record::SPEED),
        signal_strength: lenient(rec, record::RSSI),
    })
}

/// Second gate, applied after the movement estimate.
pub fn check_regional(lat: f64, lon: f64) -> Result<(), Rejection> {
    if REGIONAL_BOX.contains(lat, lon) {
        Ok(())
    } else {
        Err(Rejection::OutsideRegion { lat, lon })
    }
}

fn required<'a>(rec: &RawRecord<'a>, index: usize) -> Result<&'a str, Rejection> {
    rec.field(index)
        .ok_or(Rejection::MissingField(record::column_name(index)))
}

fn coordinate(raw: &str, bbox: &BBox, inside: fn(&BBox, f64) -> bool) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| inside(bbox, *v))
}

/// Best-effort numeric field: absent or unparsable reads as 0.
fn lenient(rec: &RawRecord<'_>, index: usize) -> f64 {
    rec.field(index)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(lat: &str, lon: &str, alt: &str, spd: &str, rssi: &str) -> String {
        let mut tokens = vec![
            "NisshinEisei-OBD-12".to_string(),
            "2023-01-01".to_string(),
            "10:00:00.000000Z".to_string(),
            lat.to_string(),
            lon.to_string(),
            alt.to_string(),
            spd.to_string(),
        ];
        tokens.resize(record::RSSI, "0".to_string());
        tokens.push(rssi.to_string());
        tokens.push("OK".to_string());
        tokens.join(",")
    }

    #[test]
    fn test_extract_full_record() {
        let raw = line("35.5", "139.5", "10", "5.0", "-67");
        let f = extract_fields(&RawRecord::parse(&raw)).unwrap();
        assert_eq!(f.timestamp, "2023-01-01 10:00:00.000000Z");
        assert_eq!(f.latitude, 35.5);
        assert_eq!(f.longitude, 139.5);
        assert_eq!(f.altitude, 10.0);
        assert_eq!(f.speed, 5.0);
        assert_eq!(f.signal_strength, -67.0);
    }

    #[test]
    fn test_bad_optional_fields_default_to_zero() {
        let raw = line("35.5", "139.5", "", "fast", "n/a");
        let f = extract_fields(&RawRecord::parse(&raw)).unwrap();
        assert_eq!(f.altitude, 0.0);
        assert_eq!(f.speed, 0.0);
        assert_eq!(f.signal_strength, 0.0);
    }

    #[test]
    fn test_short_record_defaults_signal() {
        let raw = "600002,2023-01-01,10:00:00,35.5,139.5,3,1.5";
        let f = extract_fields(&RawRecord::parse(raw)).unwrap();
        assert_eq!(f.speed, 1.5);
        assert_eq!(f.signal_strength, 0.0);
    }

    #[test]
    fn test_missing_coordinates_rejected() {
        let raw = "600002,2023-01-01,10:00:00,35.5";
        assert_eq!(
            extract_fields(&RawRecord::parse(raw)),
            Err(Rejection::MissingField("LONGITUDE"))
        );
        assert_eq!(
            extract_fields(&RawRecord::parse("600002")),
            Err(Rejection::MissingField("DATE"))
        );
    }

    #[test]
    fn test_unparsable_latitude_rejected() {
        let raw = line("north", "139.5", "0", "0", "0");
        assert_eq!(
            extract_fields(&RawRecord::parse(&raw)),
            Err(Rejection::InvalidLatitude("north".into()))
        );
    }

    #[test]
    fn test_reference_box_rejections() {
        for (lat, lon) in [("19.9", "139"), ("46.1", "139"), ("nan", "139")] {
            let raw = line(lat, lon, "0", "0", "0");
            assert!(matches!(
                extract_fields(&RawRecord::parse(&raw)),
                Err(Rejection::InvalidLatitude(_))
            ));
        }
        for (lat, lon) in [("35", "121.9"), ("35", "154.1"), ("35", "inf")] {
            let raw = line(lat, lon, "0", "0", "0");
            assert!(matches!(
                extract_fields(&RawRecord::parse(&raw)),
                Err(Rejection::InvalidLongitude(_))
            ));
        }
    }

    #[test]
    fn test_reference_box_accepts_outside_region() {
        // inside the reference box but outside the service region
        let raw = line("42.0", "141.0", "0", "0", "0");
        let f = extract_fields(&RawRecord::parse(&raw)).unwrap();
        assert_eq!(
            check_regional(f.latitude, f.longitude),
            Err(Rejection::OutsideRegion { lat: 42.0, lon: 141.0 })
        );
    }

    #[test]
    fn test_regional_box() {
        assert!(check_regional(35.0, 139.0).is_ok());
        assert!(check_regional(30.0, 120.0).is_ok());
        assert!(check_regional(29.99, 139.0).is_err());
        assert!(check_regional(35.0, 150.01).is_err());
    }
}
