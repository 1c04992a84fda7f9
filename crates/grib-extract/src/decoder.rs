//! GRIB2 decoding of 10 m wind components.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};

use crate::error::{ExtractError, Result};

/// GRIB2 product identifiers for the wind components we keep.
pub mod product {
    /// Discipline 0: meteorological products
    pub const DISCIPLINE_METEOROLOGICAL: u8 = 0;
    /// Parameter category 2: momentum
    pub const CATEGORY_MOMENTUM: u8 = 2;
    /// UGRD: u-component of wind
    pub const NUMBER_UGRD: u8 = 2;
    /// VGRD: v-component of wind
    pub const NUMBER_VGRD: u8 = 3;
    /// Fixed surface type 103: specified height above ground
    pub const HEIGHT_ABOVE_GROUND: u8 = 103;
    /// Level of the surface wind fields, metres
    pub const WIND_LEVEL_M: f64 = 10.0;
}

/// One decoded grid cell. `value` is `None` where the grid marks data missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridValue {
    pub latitude: f64,
    pub longitude: f64,
    pub value: Option<f64>,
}

impl GridValue {
    pub fn new(latitude: f64, longitude: f64, value: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            value,
        }
    }
}

/// Both wind component series from one grid file.
///
/// A file that carries only one component yields an empty series for the
/// other one.
#[derive(Debug, Clone, PartialEq)]
pub struct WindComponents {
    pub reference_time: DateTime<Utc>,
    pub u: Vec<GridValue>,
    pub v: Vec<GridValue>,
}

/// Decodes a raw grid file into wind component series.
pub trait GridDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<WindComponents>;
}

impl<T: GridDecoder + ?Sized> GridDecoder for Arc<T> {
    fn decode(&self, path: &Path) -> Result<WindComponents> {
        (**self).decode(path)
    }
}

#[derive(Debug, Clone, Copy)]
enum Component {
    U,
    V,
}

/// [`GridDecoder`] backed by the `grib` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GribDecoder;

impl GribDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl GridDecoder for GribDecoder {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn decode(&self, path: &Path) -> Result<WindComponents> {
        let reference_time = read_reference_time(path)?;

        let file = File::open(path).map_err(|e| ExtractError::file_read(path, e))?;
        let grib2 =
            grib::from_reader(BufReader::new(file)).map_err(|e| ExtractError::decode(path, e))?;

        let mut u: Option<Vec<GridValue>> = None;
        let mut v: Option<Vec<GridValue>> = None;

        for (index, submessage) in grib2.iter() {
            let component = {
                let discipline = submessage.indicator().discipline;
                let prod_def = submessage.prod_def();
                let surface = prod_def.fixed_surfaces().map(|(first, _)| first);
                match (
                    prod_def.parameter_category(),
                    prod_def.parameter_number(),
                    surface,
                ) {
                    (Some(category), Some(number), Some(surface)) => wind_component(
                        discipline,
                        category,
                        number,
                        surface.surface_type,
                        surface.value(),
                    ),
                    _ => None,
                }
            };

            let Some(component) = component else {
                continue;
            };

            let slot = match component {
                Component::U => &mut u,
                Component::V => &mut v,
            };
            if slot.is_some() {
                debug!(?index, ?component, "Duplicate wind message, keeping first");
                continue;
            }

            let coords: Vec<(f32, f32)> = submessage
                .latlons()
                .map_err(|e| ExtractError::decode(path, e))?
                .collect();
            let values: Vec<f32> = grib::Grib2SubmessageDecoder::from(submessage)
                .map_err(|e| ExtractError::decode(path, e))?
                .dispatch()
                .map_err(|e| ExtractError::decode(path, e))?
                .collect();

            if coords.len() != values.len() {
                return Err(ExtractError::decode(
                    path,
                    format!(
                        "{:?} grid has {} coordinates but {} values",
                        component,
                        coords.len(),
                        values.len()
                    ),
                ));
            }

            debug!(?index, ?component, points = values.len(), "Decoded wind message");

            *slot = Some(
                coords
                    .into_iter()
                    .zip(values)
                    .map(|((lat, lon), value)| {
                        GridValue::new(
                            lat as f64,
                            lon as f64,
                            if value.is_nan() {
                                None
                            } else {
                                Some(value as f64)
                            },
                        )
                    })
                    .collect(),
            );
        }

        if u.is_none() && v.is_none() {
            return Err(ExtractError::MissingComponents(path.to_path_buf()));
        }

        Ok(WindComponents {
            reference_time,
            u: u.unwrap_or_default(),
            v: v.unwrap_or_default(),
        })
    }
}

fn wind_component(
    discipline: u8,
    category: u8,
    number: u8,
    surface_type: u8,
    level: f64,
) -> Option<Component> {
    use product::*;

    if discipline != DISCIPLINE_METEOROLOGICAL
        || category != CATEGORY_MOMENTUM
        || surface_type != HEIGHT_ABOVE_GROUND
        || (level - WIND_LEVEL_M).abs() > f64::EPSILON
    {
        return None;
    }

    match number {
        NUMBER_UGRD => Some(Component::U),
        NUMBER_VGRD => Some(Component::V),
        _ => None,
    }
}

/// Read the reference time from Section 1 of the first message in the file.
///
/// All messages of a GFS pgrb2 file share one reference time, so only the
/// header of the first message is read.
pub fn read_reference_time(path: &Path) -> Result<DateTime<Utc>> {
    // Section 0 is 16 bytes; the reference time ends at octet 19 of Section 1
    const HEADER_LEN: usize = 16 + 19;

    let mut header = [0u8; HEADER_LEN];
    let mut file = File::open(path).map_err(|e| ExtractError::file_read(path, e))?;
    file.read_exact(&mut header).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            ExtractError::decode(path, "file too short for GRIB2 header")
        }
        _ => ExtractError::file_read(path, e),
    })?;

    if &header[0..4] != b"GRIB" {
        return Err(ExtractError::decode(path, "invalid GRIB magic bytes"));
    }
    if header[7] != 2 {
        return Err(ExtractError::decode(
            path,
            format!("expected GRIB edition 2, got {}", header[7]),
        ));
    }
    if header[20] != 1 {
        return Err(ExtractError::decode(
            path,
            format!("expected Section 1 after indicator, found section {}", header[20]),
        ));
    }

    // Skip section length (4 bytes) and section number (1 byte)
    let sec = &header[16 + 5..];
    let year = u16::from_be_bytes([sec[7], sec[8]]);
    let (month, day, hour, minute, second) = (sec[9], sec[10], sec[11], sec[12], sec[13]);

    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .ok_or_else(|| {
            ExtractError::decode(
                path,
                format!(
                    "invalid reference time {}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_component_selection() {
        assert!(matches!(
            wind_component(0, 2, 2, 103, 10.0),
            Some(Component::U)
        ));
        assert!(matches!(
            wind_component(0, 2, 3, 103, 10.0),
            Some(Component::V)
        ));
        // 80 m wind is not the surface level we want
        assert!(wind_component(0, 2, 2, 103, 80.0).is_none());
        // Isobaric UGRD
        assert!(wind_component(0, 2, 2, 100, 10.0).is_none());
        // Gust (category 2, number 22)
        assert!(wind_component(0, 2, 22, 103, 10.0).is_none());
        // Temperature
        assert!(wind_component(0, 0, 0, 103, 10.0).is_none());
    }
}
