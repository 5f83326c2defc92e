//! Error types for the shared raster model.

use thiserror::Error;

/// Result type alias using RasterError.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors raised while deriving information from a dataset model.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("dataset is not georeferenced")]
    NotGeoreferenced,

    #[error("geolocation grid has {actual} points, expected {expected}")]
    GridSizeMismatch { expected: usize, actual: usize },

    #[error("band not found: {0}")]
    BandNotFound(String),

    #[error("projection error: {0}")]
    Projection(#[from] projection::ProjectionError),
}
