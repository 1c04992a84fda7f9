//! Ordered outer join of wind component series.

use std::cmp::Ordering;

use crate::decoder::GridValue;

/// A grid cell after joining the U and V series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedCell {
    pub latitude: f64,
    pub longitude: f64,
    pub wind_u: Option<f64>,
    pub wind_v: Option<f64>,
}

fn cell_order(a: &GridValue, b: &GridValue) -> Ordering {
    a.latitude
        .total_cmp(&b.latitude)
        .then_with(|| a.longitude.total_cmp(&b.longitude))
}

/// Full outer join of the U and V series on (latitude, longitude).
///
/// Output is sorted ascending by latitude then longitude. A cell present in
/// only one series appears once with the other component set to `None`.
/// Both inputs come from the same file, so they share one timestamp and the
/// time key is implied.
pub fn join_components(mut u: Vec<GridValue>, mut v: Vec<GridValue>) -> Vec<JoinedCell> {
    u.sort_by(cell_order);
    v.sort_by(cell_order);

    let mut joined = Vec::with_capacity(u.len().max(v.len()));
    let mut u_iter = u.into_iter().peekable();
    let mut v_iter = v.into_iter().peekable();

    loop {
        let order = match (u_iter.peek(), v_iter.peek()) {
            (Some(a), Some(b)) => cell_order(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        let cell = match order {
            Ordering::Less => u_iter.next().map(|a| JoinedCell {
                latitude: a.latitude,
                longitude: a.longitude,
                wind_u: a.value,
                wind_v: None,
            }),
            Ordering::Greater => v_iter.next().map(|b| JoinedCell {
                latitude: b.latitude,
                longitude: b.longitude,
                wind_u: None,
                wind_v: b.value,
            }),
            Ordering::Equal => u_iter.next().zip(v_iter.next()).map(|(a, b)| JoinedCell {
                latitude: a.latitude,
                longitude: a.longitude,
                wind_u: a.value,
                wind_v: b.value,
            }),
        };
        joined.extend(cell);
    }

    joined
}
