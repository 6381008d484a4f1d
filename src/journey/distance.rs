//! # Distance Accumulator
//!
//! Great-circle distance between consecutive fixes using the haversine
//! formula on a spherical Earth.

use super::fix::Position;

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Distance in miles to add to the running total when moving from `last`
/// to `current`.
///
/// # Examples
///
/// ```
/// use journey_logger::journey::distance::accumulate;
/// use journey_logger::journey::fix::Position;
///
/// let here = Position::new(51.5007, -0.1246);
/// assert_eq!(accumulate(here, here), 0.0);
/// ```
#[must_use]
pub fn accumulate(last: Position, current: Position) -> f64 {
    let phi1 = last.latitude.to_radians();
    let phi2 = current.latitude.to_radians();
    let delta_phi = (current.latitude - last.latitude).to_radians();
    let delta_lambda = (current.longitude - last.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}
