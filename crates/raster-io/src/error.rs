//! Error types for file probing and band I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by raster backends.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Unrecognized file format: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("NetCDF support not compiled in (enable the `netcdf` feature): {}", .0.display())]
    NetCdfUnsupported(PathBuf),

    #[error("Failed to parse GRIB2 data: {0}")]
    Grib2Parse(String),

    #[error("Invalid GRIB2 section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Failed to unpack GRIB2 data: {0}")]
    Unpacking(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Zarr error: {0}")]
    Zarr(String),

    #[error("NetCDF error: {0}")]
    NetCdf(String),

    #[error("Variable '{variable}' not found in {}", path.display())]
    VariableNotFound { path: PathBuf, variable: String },

    #[error("Band {index} out of range (1..={count})")]
    BandOutOfRange { index: usize, count: usize },

    #[error("Band has {actual} values, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Raster(#[from] raster_common::RasterError),
}

/// Result type for backend operations.
pub type IoResult<T> = std::result::Result<T, IoError>;

pub(crate) fn zarr_err(e: impl std::fmt::Display) -> IoError {
    IoError::Zarr(e.to_string())
}
