//! Great-circle helpers on a spherical Earth.

/// Mean Earth radius used for great-circle distances (meters).
pub const EARTH_RADIUS_METERS: f64 = 6_367_000.0;

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );

    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine(10.0, 60.0, 10.0, 61.0);
        // 1 degree on a 6367 km sphere
        assert!((d - 111_125.0).abs() < 50.0, "got {}", d);
    }

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine(5.0, 5.0, 5.0, 5.0), 0.0);
    }
}
