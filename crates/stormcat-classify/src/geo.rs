//! Great-circle geometry on a spherical Earth.

use crate::record::Position;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two `(lon, lat)` positions in degrees.
#[must_use]
pub fn geo_dist(p1: Position, p2: Position) -> f64 {
    let (lon1, lat1) = (p1.0.to_radians(), p1.1.to_radians());
    let (lon2, lat2) = (p2.0.to_radians(), p2.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Planar bearing in radians from `from` to `to`, as `atan2(dlat, dlon)`.
#[must_use]
pub fn bearing(from: Position, to: Position) -> f64 {
    (to.1 - from.1).atan2(to.0 - from.0)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn zero_distance_to_self() {
        assert_eq!(geo_dist((-70.0, 20.0), (-70.0, 20.0)), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = geo_dist((0.0, 0.0), (0.0, 1.0));
        assert!((d - 111.195).abs() < 0.01, "d = {d}");
    }

    #[test]
    fn quarter_circumference_on_equator() {
        let d = geo_dist((0.0, 0.0), (90.0, 0.0));
        assert!((d - EARTH_RADIUS_KM * FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn bearing_due_north() {
        assert!((bearing((10.0, 10.0), (10.0, 12.0)) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn bearing_due_east_is_zero() {
        assert_eq!(bearing((10.0, 10.0), (11.0, 10.0)), 0.0);
    }
}
