//! Extraction tests using an in-memory decoder and synthetic GRIB2 headers.

use std::io::Write;
use std::path::Path;

use chrono::{TimeZone, Utc};
use gfs_common::RunHour;
use grib_extract::{
    read_reference_time, ExtractError, GribDecoder, GridDecoder, GridExtractor, GridValue,
    WindComponents,
};
use test_utils::{create_u_wind_cells, create_v_wind_cells, date, grib2_header};

/// Returns fixed component series regardless of the path.
struct FixedDecoder {
    components: WindComponents,
}

impl GridDecoder for FixedDecoder {
    fn decode(&self, _path: &Path) -> grib_extract::Result<WindComponents> {
        Ok(self.components.clone())
    }
}

fn to_values(cells: Vec<(f64, f64, Option<f64>)>) -> Vec<GridValue> {
    cells
        .into_iter()
        .map(|(lat, lon, value)| GridValue::new(lat, lon, value))
        .collect()
}

fn extractor(u: Vec<GridValue>, v: Vec<GridValue>) -> GridExtractor<FixedDecoder> {
    GridExtractor::new(FixedDecoder {
        components: WindComponents {
            reference_time: Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap(),
            u,
            v,
        },
    })
}

#[test]
fn test_extract_stamps_cycle_and_lead() {
    let extractor = extractor(
        to_values(create_u_wind_cells(3, 4)),
        to_values(create_v_wind_cells(3, 4)),
    );

    let records = extractor
        .extract(Path::new("grib_20240115_06_0p25_2.grib2"), RunHour::H06, 2)
        .unwrap();

    assert_eq!(records.len(), 12);
    for record in &records {
        assert_eq!(record.observed_date, date(2024, 1, 15));
        assert_eq!(record.observed_hour, RunHour::H06);
        assert_eq!(record.lead_hour, 2);
        assert!(record.is_complete());
    }
}

#[test]
fn test_extract_normalizes_longitudes_and_sorts() {
    let u = vec![
        GridValue::new(40.0, 285.0, Some(3.0)),
        GridValue::new(40.0, 10.0, Some(1.0)),
        GridValue::new(-20.0, 359.75, Some(2.0)),
    ];
    let v = vec![
        GridValue::new(40.0, 285.0, Some(4.0)),
        GridValue::new(40.0, 10.0, Some(-1.0)),
    ];

    let records = extractor(u, v)
        .extract(Path::new("unused.grib2"), RunHour::H00, 0)
        .unwrap();

    let keys: Vec<(f64, f64)> = records.iter().map(|r| (r.latitude, r.longitude)).collect();
    assert_eq!(keys, vec![(-20.0, -0.25), (40.0, -75.0), (40.0, 10.0)]);

    assert_eq!(records[0].wind_u, Some(2.0));
    assert_eq!(records[0].wind_v, None);
    assert_eq!((records[1].wind_u, records[1].wind_v), (Some(3.0), Some(4.0)));
}

#[test]
fn test_extract_preserves_native_resolution() {
    let u = to_values(create_u_wind_cells(10, 36));
    let records = extractor(u.clone(), Vec::new())
        .extract(Path::new("unused.grib2"), RunHour::H12, 5)
        .unwrap();

    assert_eq!(records.len(), u.len());
    assert!(records.iter().all(|r| r.wind_v.is_none()));
}

#[test]
fn test_extract_rejects_out_of_range_latitude() {
    let u = vec![GridValue::new(91.0, 0.0, Some(1.0))];
    let err = extractor(u, Vec::new())
        .extract(Path::new("bad.grib2"), RunHour::H00, 0)
        .unwrap_err();

    match err {
        ExtractError::InvalidLatitude { path, latitude } => {
            assert_eq!(path, Path::new("bad.grib2"));
            assert_eq!(latitude, 91.0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_read_reference_time_from_header() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&grib2_header(2024, 1, 15, 12)).unwrap();

    let reference_time = read_reference_time(file.path()).unwrap();
    assert_eq!(
        reference_time,
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    );
}

#[test]
fn test_read_reference_time_rejects_non_grib() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"<html>404 Not Found</html> padding padding").unwrap();

    let err = read_reference_time(file.path()).unwrap_err();
    assert!(matches!(err, ExtractError::Decode { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn test_read_reference_time_rejects_truncated_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"GRIB").unwrap();

    let err = read_reference_time(file.path()).unwrap_err();
    assert!(matches!(err, ExtractError::Decode { .. }));
}

#[test]
fn test_grib_decoder_missing_file() {
    let err = GribDecoder::new()
        .decode(Path::new("/nonexistent/grib_20240101_00_0p25_0.grib2"))
        .unwrap_err();
    assert!(matches!(err, ExtractError::FileRead { .. }));
}

#[test]
fn test_grib_decoder_garbage_is_decode_error_with_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0u8; 64]).unwrap();

    let err = GribDecoder::new().decode(file.path()).unwrap_err();
    assert!(matches!(err, ExtractError::Decode { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}
