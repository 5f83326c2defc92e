//! Geostationary satellite projection.
//!
//! Used for GOES-R series ABI imagery, where grid coordinates are scan
//! angles in radians measured from the sub-satellite point.
//!
//! Reference: GOES-R Product Definition and Users' Guide (PUG) Volume 4,
//! Section 4.2.8.

use crate::ProjectionError;

/// Geostationary view from a satellite above the equator (x-axis sweep).
#[derive(Debug, Clone)]
pub struct Geostationary {
    /// Distance from Earth centre to the satellite (meters)
    pub h: f64,
    /// Semi-major axis of the Earth ellipsoid (meters)
    pub req: f64,
    /// Semi-minor axis of the Earth ellipsoid (meters)
    pub rpol: f64,
    /// Longitude of the sub-satellite point (radians)
    pub lambda_0: f64,
}

impl Geostationary {
    /// Create the projection from GOES `goes_imager_projection` attributes.
    pub fn new(
        perspective_point_height: f64,
        semi_major_axis: f64,
        semi_minor_axis: f64,
        longitude_origin_deg: f64,
    ) -> Result<Self, ProjectionError> {
        if perspective_point_height <= 0.0 {
            return Err(ProjectionError::InvalidParameter {
                name: "perspective_point_height",
                reason: format!("must be positive, got {}", perspective_point_height),
            });
        }
        if semi_minor_axis <= 0.0 || semi_major_axis < semi_minor_axis {
            return Err(ProjectionError::InvalidParameter {
                name: "semi_major_axis",
                reason: format!(
                    "axes {} / {} do not describe an oblate ellipsoid",
                    semi_major_axis, semi_minor_axis
                ),
            });
        }

        Ok(Self {
            h: perspective_point_height + semi_major_axis,
            req: semi_major_axis,
            rpol: semi_minor_axis,
            lambda_0: longitude_origin_deg.to_radians(),
        })
    }

    /// Scan angles (radians) to `(lon, lat)` degrees.
    ///
    /// Returns `None` when the line of sight misses the Earth.
    pub fn scan_to_geo(&self, x_rad: f64, y_rad: f64) -> Option<(f64, f64)> {
        let (sin_x, cos_x) = x_rad.sin_cos();
        let (sin_y, cos_y) = y_rad.sin_cos();
        let axis_ratio = (self.req / self.rpol).powi(2);

        let a = sin_x.powi(2) + cos_x.powi(2) * (cos_y.powi(2) + axis_ratio * sin_y.powi(2));
        let b = -2.0 * self.h * cos_x * cos_y;
        let c = self.h.powi(2) - self.req.powi(2);

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let rs = (-b - discriminant.sqrt()) / (2.0 * a);
        let sx = rs * cos_x * cos_y;
        let sy = -rs * sin_x;
        let sz = rs * cos_x * sin_y;

        let lat = (axis_ratio * sz / (self.h - sx).hypot(sy)).atan();
        let lon = self.lambda_0 - sy.atan2(self.h - sx);

        Some((lon.to_degrees(), lat.to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goes_16() -> Geostationary {
        Geostationary::new(35786023.0, 6378137.0, 6356752.31414, -75.0).unwrap()
    }

    #[test]
    fn test_nadir_is_sub_satellite_point() {
        let (lon, lat) = goes_16().scan_to_geo(0.0, 0.0).expect("nadir is on Earth");
        assert!((lon + 75.0).abs() < 1e-9, "got {}", lon);
        assert!(lat.abs() < 1e-9, "got {}", lat);
    }

    #[test]
    fn test_product_guide_worked_example() {
        // GOES-R PUG Vol. 4, 4.2.8.1: scan angles to a point near Atlanta
        let (lon, lat) = goes_16()
            .scan_to_geo(-0.024052, 0.095340)
            .expect("point is on Earth");
        assert!((lon + 84.690932).abs() < 1e-3, "lon {}", lon);
        assert!((lat - 33.846162).abs() < 1e-3, "lat {}", lat);
    }

    #[test]
    fn test_x_sweep_directions() {
        let proj = goes_16();
        let (lon_east, _) = proj.scan_to_geo(0.05, 0.0).unwrap();
        let (_, lat_north) = proj.scan_to_geo(0.0, 0.05).unwrap();
        assert!(lon_east > -75.0);
        assert!(lat_north > 0.0);
    }

    #[test]
    fn test_space_is_none() {
        assert!(goes_16().scan_to_geo(0.5, 0.5).is_none());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Geostationary::new(-1.0, 6378137.0, 6356752.3, -75.0).is_err());
        assert!(Geostationary::new(35786023.0, 6356752.3, 6378137.0, -75.0).is_err());
    }
}
