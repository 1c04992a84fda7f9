//! Decoding of a real GFS pgrb2 file, skipped when the sample is absent.

use gfs_common::RunHour;
use grib_extract::{GribDecoder, GridExtractor};
use test_utils::require_test_file;

#[test]
fn test_extract_real_gfs_file() {
    let path = require_test_file!("gfs_sample.grib2");

    let extractor = GridExtractor::new(GribDecoder::new());
    let records = extractor
        .extract(&path, RunHour::H00, 0)
        .expect("Failed to extract sample file");

    assert!(!records.is_empty());
    for record in &records {
        assert!((-90.0..=90.0).contains(&record.latitude));
        assert!((-180.0..180.0).contains(&record.longitude));
    }

    let complete = records.iter().filter(|r| r.is_complete()).count();
    println!("Extracted {} records ({} complete)", records.len(), complete);
    assert!(complete > 0);
}
