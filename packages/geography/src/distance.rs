//! Great-circle distance between two coordinates.

use site_engine_geography_models::GeoPoint;

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Haversine distance between two points, in miles.
#[must_use]
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_MILES * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_points_are_zero() {
        let p = GeoPoint::new(41.8781, -87.6298);
        assert!(haversine_miles(p, p).abs() < f64::EPSILON);
    }

    #[test]
    fn symmetric() {
        let a = GeoPoint::new(38.9072, -77.0369);
        let b = GeoPoint::new(39.2904, -76.6122);
        assert!((haversine_miles(a, b) - haversine_miles(b, a)).abs() < 1e-9);
    }

    #[test]
    fn washington_to_baltimore() {
        let dc = GeoPoint::new(38.9072, -77.0369);
        let baltimore = GeoPoint::new(39.2904, -76.6122);
        let d = haversine_miles(dc, baltimore);
        assert!((d - 34.92).abs() < 0.05, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_miles(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        let expected = EARTH_RADIUS_MILES * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-9);
    }
}
