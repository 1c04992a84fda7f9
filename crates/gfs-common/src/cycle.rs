//! Forecast cycle identification.
//!
//! A GFS cycle is one model run, identified by its issue date and one of the
//! four synoptic run hours. Stepping backwards through cycles is the core
//! transition used when probing for the latest published run.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CycleParseError, CycleParseResult};

/// One of the four daily GFS run hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RunHour {
    H00,
    H06,
    H12,
    H18,
}

impl RunHour {
    /// All run hours in ascending order.
    pub const ALL: [RunHour; 4] = [RunHour::H00, RunHour::H06, RunHour::H12, RunHour::H18];

    pub fn hour(self) -> u32 {
        match self {
            RunHour::H00 => 0,
            RunHour::H06 => 6,
            RunHour::H12 => 12,
            RunHour::H18 => 18,
        }
    }

    /// Latest run hour not later than the given hour of day.
    pub fn latest_at(hour_of_day: u32) -> Self {
        match hour_of_day {
            h if h >= 18 => RunHour::H18,
            h if h >= 12 => RunHour::H12,
            h if h >= 6 => RunHour::H06,
            _ => RunHour::H00,
        }
    }

    /// Next lower run hour, or `None` when stepping back from 00 crosses midnight.
    pub fn previous(self) -> Option<Self> {
        match self {
            RunHour::H00 => None,
            RunHour::H06 => Some(RunHour::H00),
            RunHour::H12 => Some(RunHour::H06),
            RunHour::H18 => Some(RunHour::H12),
        }
    }

    /// Two-digit form used in upstream URLs and file names.
    pub fn as_str(self) -> &'static str {
        match self {
            RunHour::H00 => "00",
            RunHour::H06 => "06",
            RunHour::H12 => "12",
            RunHour::H18 => "18",
        }
    }
}

impl fmt::Display for RunHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunHour {
    type Err = CycleParseError;

    fn from_str(s: &str) -> CycleParseResult<Self> {
        match s.trim().parse::<u32>() {
            Ok(0) => Ok(RunHour::H00),
            Ok(6) => Ok(RunHour::H06),
            Ok(12) => Ok(RunHour::H12),
            Ok(18) => Ok(RunHour::H18),
            _ => Err(CycleParseError::InvalidRunHour(s.to_string())),
        }
    }
}

impl TryFrom<u32> for RunHour {
    type Error = CycleParseError;

    fn try_from(hour: u32) -> CycleParseResult<Self> {
        match hour {
            0 => Ok(RunHour::H00),
            6 => Ok(RunHour::H06),
            12 => Ok(RunHour::H12),
            18 => Ok(RunHour::H18),
            other => Err(CycleParseError::InvalidRunHour(other.to_string())),
        }
    }
}

/// A single model run: issue date plus run hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForecastCycle {
    pub date: NaiveDate,
    pub run: RunHour,
}

impl ForecastCycle {
    pub fn new(date: NaiveDate, run: RunHour) -> Self {
        Self { date, run }
    }

    /// Latest cycle whose run time is not later than `at`.
    pub fn latest_at(at: DateTime<Utc>) -> Self {
        Self {
            date: at.date_naive(),
            run: RunHour::latest_at(at.hour()),
        }
    }

    /// Latest cycle not later than `now - lag`.
    pub fn candidate(now: DateTime<Utc>, lag: Duration) -> Self {
        Self::latest_at(now - lag)
    }

    /// The cycle immediately before this one. 00 steps to the prior day's 18.
    pub fn previous(self) -> Self {
        match self.run.previous() {
            Some(run) => Self { date: self.date, run },
            None => Self {
                date: self.date.pred_opt().unwrap_or(self.date),
                run: RunHour::H18,
            },
        }
    }

    /// UTC timestamp at which the run was issued.
    pub fn reference_time(&self) -> DateTime<Utc> {
        let midnight = self.date.and_hms_opt(0, 0, 0).unwrap_or_default();
        Utc.from_utc_datetime(&midnight) + Duration::hours(self.run.hour() as i64)
    }

    /// `YYYYMMDD` form used in upstream paths and staged object names.
    pub fn date_key(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// Every cycle of every date in `[start, end]`, ascending.
    pub fn all_between(start: NaiveDate, end: NaiveDate) -> Vec<Self> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .flat_map(|date| RunHour::ALL.into_iter().map(move |run| Self { date, run }))
            .collect()
    }
}

impl fmt::Display for ForecastCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}z", self.date_key(), self.run)
    }
}

/// Parse an issue date given as `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_issue_date(s: &str) -> CycleParseResult<NaiveDate> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
        .map_err(|_| CycleParseError::InvalidDate(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_previous_from_midnight_run_crosses_day() {
        let cycle = ForecastCycle::new(date(2024, 3, 1), RunHour::H00);
        assert_eq!(
            cycle.previous(),
            ForecastCycle::new(date(2024, 2, 29), RunHour::H18)
        );
    }

    #[test]
    fn test_previous_same_day_for_other_runs() {
        let d = date(2024, 1, 15);
        assert_eq!(
            ForecastCycle::new(d, RunHour::H06).previous(),
            ForecastCycle::new(d, RunHour::H00)
        );
        assert_eq!(
            ForecastCycle::new(d, RunHour::H12).previous(),
            ForecastCycle::new(d, RunHour::H06)
        );
        assert_eq!(
            ForecastCycle::new(d, RunHour::H18).previous(),
            ForecastCycle::new(d, RunHour::H12)
        );
    }

    #[test]
    fn test_latest_at_picks_run_not_after_hour() {
        assert_eq!(RunHour::latest_at(0), RunHour::H00);
        assert_eq!(RunHour::latest_at(5), RunHour::H00);
        assert_eq!(RunHour::latest_at(6), RunHour::H06);
        assert_eq!(RunHour::latest_at(17), RunHour::H12);
        assert_eq!(RunHour::latest_at(23), RunHour::H18);
    }

    #[test]
    fn test_candidate_applies_lag() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 5, 30, 0).unwrap();
        let cycle = ForecastCycle::candidate(now, Duration::hours(2));
        assert_eq!(cycle, ForecastCycle::new(date(2024, 1, 15), RunHour::H00));

        let now = Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap();
        let cycle = ForecastCycle::candidate(now, Duration::hours(2));
        assert_eq!(cycle, ForecastCycle::new(date(2024, 1, 14), RunHour::H18));
    }

    #[test]
    fn test_run_hour_parsing() {
        assert_eq!("00".parse::<RunHour>().unwrap(), RunHour::H00);
        assert_eq!("6".parse::<RunHour>().unwrap(), RunHour::H06);
        assert_eq!("18".parse::<RunHour>().unwrap(), RunHour::H18);
        assert!("03".parse::<RunHour>().is_err());
        assert!("noon".parse::<RunHour>().is_err());
        assert!(RunHour::try_from(24).is_err());
    }

    #[test]
    fn test_reference_time() {
        let cycle = ForecastCycle::new(date(2024, 1, 15), RunHour::H12);
        assert_eq!(
            cycle.reference_time(),
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
        );
        assert_eq!(cycle.to_string(), "20240115/12z");
    }

    #[test]
    fn test_all_between_is_ascending() {
        let cycles = ForecastCycle::all_between(date(2024, 1, 1), date(2024, 1, 2));
        assert_eq!(cycles.len(), 8);
        assert!(cycles.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(cycles[0], ForecastCycle::new(date(2024, 1, 1), RunHour::H00));
        assert_eq!(cycles[7], ForecastCycle::new(date(2024, 1, 2), RunHour::H18));
    }

    #[test]
    fn test_parse_issue_date_formats() {
        assert_eq!(parse_issue_date("2024-01-15").unwrap(), date(2024, 1, 15));
        assert_eq!(parse_issue_date("20240115").unwrap(), date(2024, 1, 15));
        assert!(parse_issue_date("15/01/2024").is_err());
    }
}
