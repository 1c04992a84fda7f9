//! Normalized wind point records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cycle::RunHour;

/// One grid cell of 10 m wind for one cycle and lead hour.
///
/// Longitudes are normalized to `[-180, 180)`. A component is `None` when the
/// source grid carried no value for that cell; it is never defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_date: NaiveDate,
    pub observed_hour: RunHour,
    pub lead_hour: u16,
    /// Eastward component (m/s)
    pub wind_u: Option<f64>,
    /// Northward component (m/s)
    pub wind_v: Option<f64>,
}

impl WindRecord {
    /// True when both components were captured.
    pub fn is_complete(&self) -> bool {
        self.wind_u.is_some() && self.wind_v.is_some()
    }
}

/// Map a longitude in any convention onto `[-180, 180)`.
///
/// GFS grids use `0..360`; the warehouse geography point expects the signed
/// convention.
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can land exactly on 180.0 through rounding
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert_eq!(normalize_longitude(90.0), 90.0);
        assert_eq!(normalize_longitude(180.0), -180.0);
        assert_eq!(normalize_longitude(285.0), -75.0);
        assert_eq!(normalize_longitude(359.75), -0.25);
        assert_eq!(normalize_longitude(-75.0), -75.0);
        assert_eq!(normalize_longitude(-180.0), -180.0);
    }

    #[test]
    fn test_is_complete() {
        let mut record = WindRecord {
            latitude: 40.0,
            longitude: -75.0,
            observed_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            observed_hour: RunHour::H00,
            lead_hour: 3,
            wind_u: Some(3.0),
            wind_v: Some(4.0),
        };
        assert!(record.is_complete());
        record.wind_v = None;
        assert!(!record.is_complete());
    }
}
