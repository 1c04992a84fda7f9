//! Common fixtures for cycle and record tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gfs_common::{ForecastCycle, RunHour, WindRecord};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid fixture time")
}

/// 2024-01-01 00z, the cycle used by the load scenarios.
pub fn new_year_cycle() -> ForecastCycle {
    ForecastCycle::new(date(2024, 1, 1), RunHour::H00)
}

/// The canonical staged row: lat 40, lon -75, u=3, v=4, lead 3.
pub fn philadelphia_record() -> WindRecord {
    WindRecord {
        latitude: 40.0,
        longitude: -75.0,
        observed_date: date(2024, 1, 1),
        observed_hour: RunHour::H00,
        lead_hour: 3,
        wind_u: Some(3.0),
        wind_v: Some(4.0),
    }
}

/// A handful of records for one cycle/lead, including one half-complete cell.
pub fn sample_records(cycle: &ForecastCycle, lead_hour: u16) -> Vec<WindRecord> {
    let cells = [
        (-10.0, 20.0, Some(1.5), Some(-2.0)),
        (0.0, -180.0, Some(0.0), Some(0.0)),
        (40.0, -75.0, Some(3.0), Some(4.0)),
        (89.75, 179.75, None, Some(7.25)),
    ];

    cells
        .into_iter()
        .map(|(latitude, longitude, wind_u, wind_v)| WindRecord {
            latitude,
            longitude,
            observed_date: cycle.date,
            observed_hour: cycle.run,
            lead_hour,
            wind_u,
            wind_v,
        })
        .collect()
}
