//! Synthetic data generators for testing.

/// A regular lat/lon grid of `(latitude, longitude, value)` cells in GFS
/// scan order (north to south, longitudes 0..360 eastward).
///
/// `value` receives the row and column index.
pub fn regular_grid<F>(
    first_lat: f64,
    lat_step: f64,
    rows: usize,
    first_lon: f64,
    lon_step: f64,
    cols: usize,
    value: F,
) -> Vec<(f64, f64, Option<f64>)>
where
    F: Fn(usize, usize) -> Option<f64>,
{
    let mut cells = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            cells.push((
                first_lat - lat_step * row as f64,
                first_lon + lon_step * col as f64,
                value(row, col),
            ));
        }
    }
    cells
}

/// Westerly flow strengthening towards the pole.
pub fn create_u_wind_cells(rows: usize, cols: usize) -> Vec<(f64, f64, Option<f64>)> {
    regular_grid(90.0, 1.0, rows, 0.0, 1.0, cols, |row, _| {
        Some(5.0 + row as f64 * 0.5)
    })
}

/// Meridional component alternating sign by column.
pub fn create_v_wind_cells(rows: usize, cols: usize) -> Vec<(f64, f64, Option<f64>)> {
    regular_grid(90.0, 1.0, rows, 0.0, 1.0, cols, |_, col| {
        Some(if col % 2 == 0 { 2.0 } else { -2.0 })
    })
}

/// Section 0 + Section 1 of a GRIB2 message followed by the end marker.
///
/// Enough for code that only inspects the indicator and the reference time.
pub fn grib2_header(year: u16, month: u8, day: u8, hour: u8) -> Vec<u8> {
    let mut section1 = Vec::new();
    let section_length: u32 = 21;
    section1.extend_from_slice(&section_length.to_be_bytes());
    section1.push(1); // Section number
    section1.extend_from_slice(&7u16.to_be_bytes()); // NCEP
    section1.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
    section1.push(2); // Master table version
    section1.push(1); // Local table version
    section1.push(1); // Significance of reference time (start of forecast)
    section1.extend_from_slice(&year.to_be_bytes());
    section1.push(month);
    section1.push(day);
    section1.push(hour);
    section1.push(0); // Minute
    section1.push(0); // Second
    section1.push(0); // Production status (operational)
    section1.push(1); // Type of data (forecast)

    let message_length = 16 + section1.len() + 4;

    let mut message = Vec::with_capacity(message_length);
    message.extend_from_slice(b"GRIB");
    message.extend_from_slice(&[0, 0]); // Reserved
    message.push(0); // Discipline: meteorological
    message.push(2); // Edition 2
    message.extend_from_slice(&(message_length as u64).to_be_bytes());
    message.extend_from_slice(&section1);
    message.extend_from_slice(b"7777");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_grid_scan_order() {
        let cells = create_u_wind_cells(3, 4);
        assert_eq!(cells.len(), 12);
        assert_eq!((cells[0].0, cells[0].1), (90.0, 0.0));
        assert_eq!((cells[4].0, cells[4].1), (89.0, 0.0));
        assert_eq!(cells[11].2, Some(6.0));
    }

    #[test]
    fn test_grib2_header_layout() {
        let data = grib2_header(2024, 1, 15, 12);
        assert_eq!(&data[0..4], b"GRIB");
        assert_eq!(data[7], 2);
        assert_eq!(u16::from_be_bytes([data[28], data[29]]), 2024);
        assert_eq!(data[32], 12);
        assert_eq!(&data[data.len() - 4..], b"7777");
    }
}
