//! Pixel to longitude/latitude mappings.

use projection::{Geostationary, LambertConformal, ProjectionError};
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{RasterError, RasterResult};

/// Affine transform in GDAL order:
/// `x = origin_x + col * pixel_width + row * row_rotation`,
/// `y = origin_y + col * column_rotation + row * pixel_height`.
///
/// `(col, row)` are pixel-edge coordinates, so pixel centres sit at `+0.5`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub column_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            column_rotation: c[4],
            pixel_height: c[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.column_rotation,
            self.pixel_height,
        ]
    }

    /// North-up transform covering `bbox` edge to edge.
    pub fn from_bbox(bbox: &BoundingBox, width: usize, height: usize) -> Self {
        Self {
            origin_x: bbox.min_lon,
            pixel_width: bbox.width() / width as f64,
            row_rotation: 0.0,
            origin_y: bbox.max_lat,
            column_rotation: 0.0,
            pixel_height: -bbox.height() / height as f64,
        }
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.column_rotation + row * self.pixel_height,
        )
    }
}

/// Regular grid in Lambert Conformal Conic projected meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambertGrid {
    pub latitude_of_projection_origin: f64,
    pub longitude_of_central_meridian: f64,
    pub standard_parallel: (f64, f64),
    pub earth_radius: f64,
    /// Projected x of the first column centre
    pub x0: f64,
    /// Projected y of the first row centre
    pub y0: f64,
    pub dx: f64,
    pub dy: f64,
}

impl LambertGrid {
    pub fn projection(&self) -> Result<LambertConformal, ProjectionError> {
        LambertConformal::new(
            self.latitude_of_projection_origin,
            self.longitude_of_central_meridian,
            self.standard_parallel.0,
            self.standard_parallel.1,
            self.earth_radius,
        )
    }
}

/// Geostationary fixed grid; coordinates are scan angles in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeostationaryGrid {
    pub perspective_point_height: f64,
    pub semi_major_axis: f64,
    pub semi_minor_axis: f64,
    pub longitude_of_projection_origin: f64,
    /// Scan angle of the first column centre
    pub x0: f64,
    /// Scan angle of the first row centre
    pub y0: f64,
    pub dx: f64,
    pub dy: f64,
}

impl GeostationaryGrid {
    pub fn projection(&self) -> Result<Geostationary, ProjectionError> {
        Geostationary::new(
            self.perspective_point_height,
            self.semi_major_axis,
            self.semi_minor_axis,
            self.longitude_of_projection_origin,
        )
    }
}

/// How a dataset's pixels are located on the Earth.
///
/// Equality treats NaN grid cells (limb pixels, fill values) as equal, so a
/// dataset built twice from the same file compares equal to itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geolocation {
    /// Affine transform in geographic degrees
    GeoTransform(GeoTransform),
    Lambert(LambertGrid),
    Geostationary(GeostationaryGrid),
    /// Explicit per-pixel grids, row-major
    Grids { lon: Vec<f64>, lat: Vec<f64> },
    /// No georeferencing known
    Unreferenced,
}

impl PartialEq for Geolocation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Geolocation::GeoTransform(a), Geolocation::GeoTransform(b)) => a == b,
            (Geolocation::Lambert(a), Geolocation::Lambert(b)) => a == b,
            (Geolocation::Geostationary(a), Geolocation::Geostationary(b)) => a == b,
            (
                Geolocation::Grids { lon, lat },
                Geolocation::Grids {
                    lon: other_lon,
                    lat: other_lat,
                },
            ) => same_values(lon, other_lon) && same_values(lat, other_lat),
            (Geolocation::Unreferenced, Geolocation::Unreferenced) => true,
            _ => false,
        }
    }
}

fn same_values(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
}

impl Geolocation {
    /// Expand 1-D coordinate axes into full per-pixel grids.
    pub fn from_axes(lon_axis: &[f64], lat_axis: &[f64]) -> Self {
        let mut lon = Vec::with_capacity(lon_axis.len() * lat_axis.len());
        let mut lat = Vec::with_capacity(lon.capacity());
        for &y in lat_axis {
            for &x in lon_axis {
                lon.push(x);
                lat.push(y);
            }
        }
        Geolocation::Grids { lon, lat }
    }

    pub fn is_georeferenced(&self) -> bool {
        !matches!(self, Geolocation::Unreferenced)
    }

    /// Longitude and latitude of every pixel centre, row-major.
    ///
    /// Pixels that do not see the Earth (geostationary limb) are NaN.
    pub fn grids(&self, width: usize, height: usize) -> RasterResult<(Vec<f64>, Vec<f64>)> {
        let n = width * height;
        match self {
            Geolocation::Unreferenced => Err(RasterError::NotGeoreferenced),
            Geolocation::Grids { lon, lat } => {
                for grid in [lon, lat] {
                    if grid.len() != n {
                        return Err(RasterError::GridSizeMismatch {
                            expected: n,
                            actual: grid.len(),
                        });
                    }
                }
                Ok((lon.clone(), lat.clone()))
            }
            Geolocation::GeoTransform(gt) => {
                Ok(sample(width, height, |col, row| {
                    gt.apply(col as f64 + 0.5, row as f64 + 0.5)
                }))
            }
            Geolocation::Lambert(grid) => {
                let proj = grid.projection()?;
                Ok(sample(width, height, |col, row| {
                    proj.unproject(
                        grid.x0 + col as f64 * grid.dx,
                        grid.y0 + row as f64 * grid.dy,
                    )
                }))
            }
            Geolocation::Geostationary(grid) => {
                let proj = grid.projection()?;
                Ok(sample(width, height, |col, row| {
                    proj.scan_to_geo(
                        grid.x0 + col as f64 * grid.dx,
                        grid.y0 + row as f64 * grid.dy,
                    )
                    .unwrap_or((f64::NAN, f64::NAN))
                }))
            }
        }
    }
}

fn sample<F>(width: usize, height: usize, f: F) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(usize, usize) -> (f64, f64),
{
    let mut lon = Vec::with_capacity(width * height);
    let mut lat = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let (x, y) = f(col, row);
            lon.push(x);
            lat.push(y);
        }
    }
    (lon, lat)
}
