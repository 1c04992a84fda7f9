//! Upstream GFS file locations.

use serde::{Deserialize, Serialize};

use crate::cycle::ForecastCycle;

/// Default NOMADS production root.
pub const NOMADS_BASE_URL: &str = "https://nomads.ncep.noaa.gov/pub/data/nccf/com/gfs/prod";

/// Default horizontal resolution (0.25 degree).
pub const DEFAULT_RESOLUTION: &str = "0p25";

/// Builds upstream URLs and local file names for GFS pgrb2 files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfsSource {
    /// Root URL containing the `gfs.YYYYMMDD` directories
    pub base_url: String,
    /// Resolution token, e.g. "0p25", "0p50", "1p00"
    pub resolution: String,
}

impl Default for GfsSource {
    fn default() -> Self {
        Self {
            base_url: NOMADS_BASE_URL.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
        }
    }
}

impl GfsSource {
    pub fn new(base_url: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            resolution: resolution.into(),
        }
    }

    /// Upstream filename, e.g. `gfs.t12z.pgrb2.0p25.f006`.
    pub fn filename(&self, cycle: &ForecastCycle, lead_hour: u16) -> String {
        format!(
            "gfs.t{}z.pgrb2.{}.f{:03}",
            cycle.run, self.resolution, lead_hour
        )
    }

    /// Full URL of one forecast file.
    /// Format: {base}/gfs.{date}/{run}/atmos/gfs.t{run}z.pgrb2.{res}.f{lead:03}
    pub fn url(&self, cycle: &ForecastCycle, lead_hour: u16) -> String {
        format!(
            "{}/gfs.{}/{}/atmos/{}",
            self.base_url.trim_end_matches('/'),
            cycle.date_key(),
            cycle.run,
            self.filename(cycle, lead_hour)
        )
    }

    /// Local download name for a raw grid file.
    /// Format: grib_{date}_{run}_{res}_{lead}.grib2
    pub fn local_grib_name(&self, cycle: &ForecastCycle, lead_hour: u16) -> String {
        format!(
            "grib_{}_{}_{}_{}.grib2",
            cycle.date_key(),
            cycle.run,
            self.resolution,
            lead_hour
        )
    }
}
