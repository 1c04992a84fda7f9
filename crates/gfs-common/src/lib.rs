//! Common types shared across the GFS wind loader crates.

pub mod cycle;
pub mod error;
pub mod record;
pub mod source;

pub use cycle::{parse_issue_date, ForecastCycle, RunHour};
pub use error::{CycleParseError, CycleParseResult};
pub use record::{normalize_longitude, WindRecord};
pub use source::GfsSource;
