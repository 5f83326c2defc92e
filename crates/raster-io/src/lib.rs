//! Raster file access for the mapper framework.
//!
//! [`RasterBackend`] is the seam between mappers and files. [`FileBackend`]
//! implements it for GRIB2 (optionally gzipped), Zarr v3 stores and, with
//! the `netcdf` feature, NetCDF files. [`export_zarr`] writes any normalized
//! dataset back out as a Zarr store.

pub mod backend;
pub mod error;
pub mod export;
pub mod grib2;
#[cfg(feature = "netcdf")]
pub mod netcdf_file;
pub mod zarr;

pub use backend::{cf_unpack, detect_format, slice_band, FileBackend, FileFormat, RasterBackend};
pub use error::{IoError, IoResult};
pub use export::{export_zarr, ExportSummary};
