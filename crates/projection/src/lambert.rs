//! Lambert Conformal Conic projection (spherical Earth).
//!
//! Used by regional NWP models such as AROME/MEPS (CF `lambert_conformal_conic`
//! grid mapping) and HRRR (GRIB2 template 3.30).
//!
//! Projected coordinates are meters relative to the projection origin
//! (`lat0`, `lon0`), matching the CF convention for `x`/`y` coordinate
//! variables.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::ProjectionError;

/// Lambert Conformal Conic projection on a sphere.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of projection origin in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Sphere radius (meters)
    pub earth_radius: f64,
    /// Cone constant
    n: f64,
    /// Scaling constant F
    f: f64,
    /// Rho at the projection origin
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection from CF-style parameters given in degrees.
    ///
    /// Pass the same value twice for a tangent cone.
    pub fn new(
        lat0_deg: f64,
        lon0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        earth_radius: f64,
    ) -> Result<Self, ProjectionError> {
        if earth_radius <= 0.0 || !earth_radius.is_finite() {
            return Err(ProjectionError::InvalidParameter {
                name: "earth_radius",
                reason: format!("must be positive, got {}", earth_radius),
            });
        }

        let lat0 = lat0_deg.to_radians();
        let lon0 = lon0_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((FRAC_PI_4 + latin2 / 2.0).tan() / (FRAC_PI_4 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        if n.abs() < 1e-12 || !n.is_finite() {
            return Err(ProjectionError::InvalidParameter {
                name: "standard_parallel",
                reason: format!(
                    "standard parallels {} / {} give a degenerate cone",
                    latin1_deg, latin2_deg
                ),
            });
        }

        let f = latin1.cos() * (FRAC_PI_4 + latin1 / 2.0).tan().powf(n) / n;
        let rho0 = earth_radius * f / (FRAC_PI_4 + lat0 / 2.0).tan().powf(n);

        Ok(Self {
            lon0,
            lat0,
            latin1,
            latin2,
            earth_radius,
            n,
            f,
            rho0,
        })
    }

    /// Cone constant `n`.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Project geographic degrees to projected meters `(x, y)`.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.earth_radius * self.f / (FRAC_PI_4 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    /// Inverse projection: projected meters to `(lon, lat)` degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let sign = self.n.signum();
        let dy = self.rho0 - y;
        let rho = sign * (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);

        let lat = if rho == 0.0 {
            sign * FRAC_PI_2
        } else {
            2.0 * (self.earth_radius * self.f / rho).powf(1.0 / self.n).atan() - FRAC_PI_2
        };
        let lon = self.lon0 + theta / self.n;

        let mut lon_deg = lon.to_degrees();
        if lon_deg > 180.0 {
            lon_deg -= 360.0;
        } else if lon_deg < -180.0 {
            lon_deg += 360.0;
        }

        (lon_deg, lat.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hrrr_like() -> LambertConformal {
        LambertConformal::new(38.5, -97.5, 38.5, 38.5, 6371229.0).unwrap()
    }

    fn arome_arctic() -> LambertConformal {
        LambertConformal::new(77.5, -25.0, 77.5, 77.5, 6371000.0).unwrap()
    }

    #[test]
    fn test_origin_projects_to_zero() {
        let proj = arome_arctic();
        let (x, y) = proj.project(-25.0, 77.5);
        assert!(x.abs() < 1e-6, "x should be 0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be 0, got {}", y);
    }

    #[test]
    fn test_roundtrip_tangent_cone() {
        let proj = hrrr_like();
        for (lon, lat) in [(-122.719528, 21.138123), (-94.5, 39.0), (-70.0, 47.0)] {
            let (x, y) = proj.project(lon, lat);
            let (lon2, lat2) = proj.unproject(x, y);
            assert!((lon - lon2).abs() < 1e-8, "lon {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-8, "lat {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_roundtrip_secant_cone() {
        let proj = LambertConformal::new(25.0, -95.0, 25.0, 50.0, 6371229.0).unwrap();
        let (x, y) = proj.project(-80.0, 40.0);
        let (lon, lat) = proj.unproject(x, y);
        assert!((lon + 80.0).abs() < 1e-8);
        assert!((lat - 40.0).abs() < 1e-8);
    }

    #[test]
    fn test_north_is_up() {
        let proj = arome_arctic();
        let (_, y_south) = proj.project(-25.0, 70.0);
        let (_, y_north) = proj.project(-25.0, 80.0);
        assert!(y_north > y_south);
    }

    #[test]
    fn test_degenerate_cone_rejected() {
        assert!(LambertConformal::new(0.0, 0.0, 0.0, 0.0, 6371000.0).is_err());
        assert!(LambertConformal::new(45.0, 0.0, 45.0, 45.0, -1.0).is_err());
    }
}
