//! Grid file → normalized wind records.

use std::path::Path;

use gfs_common::{normalize_longitude, RunHour, WindRecord};
use tracing::{debug, info};

use crate::decoder::{GridDecoder, GridValue};
use crate::error::{ExtractError, Result};
use crate::join::join_components;

/// Turns one decoded grid file into [`WindRecord`]s for a given run and lead.
///
/// Longitudes are converted from the GFS `0..360` convention to `[-180, 180)`
/// before joining, so output order and the join key both use the signed form.
pub struct GridExtractor<D> {
    decoder: D,
}

impl<D: GridDecoder> GridExtractor<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decode `path` and emit one record per grid cell.
    ///
    /// `observed_date` comes from the grid's reference time; `observed_hour`
    /// and `lead_hour` are stamped from the arguments.
    pub fn extract(&self, path: &Path, run: RunHour, lead_hour: u16) -> Result<Vec<WindRecord>> {
        let components = self.decoder.decode(path)?;
        let observed_date = components.reference_time.date_naive();

        debug!(
            path = %path.display(),
            reference_time = %components.reference_time,
            u_points = components.u.len(),
            v_points = components.v.len(),
            "Decoded wind components"
        );

        let u = normalize_cells(path, components.u)?;
        let v = normalize_cells(path, components.v)?;

        let records: Vec<WindRecord> = join_components(u, v)
            .into_iter()
            .map(|cell| WindRecord {
                latitude: cell.latitude,
                longitude: cell.longitude,
                observed_date,
                observed_hour: run,
                lead_hour,
                wind_u: cell.wind_u,
                wind_v: cell.wind_v,
            })
            .collect();

        let incomplete = records.iter().filter(|r| !r.is_complete()).count();
        info!(
            path = %path.display(),
            run = %run,
            lead_hour = lead_hour,
            records = records.len(),
            incomplete = incomplete,
            "Extracted wind records"
        );

        Ok(records)
    }
}

fn normalize_cells(path: &Path, cells: Vec<GridValue>) -> Result<Vec<GridValue>> {
    cells
        .into_iter()
        .map(|cell| {
            if !(-90.0..=90.0).contains(&cell.latitude) {
                return Err(ExtractError::InvalidLatitude {
                    path: path.to_path_buf(),
                    latitude: cell.latitude,
                });
            }
            Ok(GridValue {
                longitude: normalize_longitude(cell.longitude),
                ..cell
            })
        })
        .collect()
}
