//! Coordinate transformations for gridded geophysical data.
//!
//! Only the projections that mappers need to derive per-pixel
//! longitude/latitude grids live here. There is no general CRS engine.

pub mod geodesy;
pub mod geostationary;
pub mod lambert;

pub use geodesy::{haversine, EARTH_RADIUS_METERS};
pub use geostationary::Geostationary;
pub use lambert::LambertConformal;

use thiserror::Error;

/// Errors raised when projection parameters cannot describe a valid projection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("invalid projection parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
