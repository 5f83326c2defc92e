//! Common types shared by the raster I/O backend, the mappers and the CLI.
//!
//! - [`RawMetadata`]: what a probe learns about a file before any mapper runs
//! - [`NormalizedDataset`]: what a mapper hands back to the caller
//! - [`Geolocation`]: how pixels map to longitude/latitude

pub mod bbox;
pub mod dataset;
pub mod error;
pub mod geolocation;
pub mod metadata;
pub mod time;

pub use bbox::BoundingBox;
pub use dataset::{Band, BandDataType, BandSource, NormalizedDataset};
pub use error::{RasterError, RasterResult};
pub use geolocation::{GeoTransform, Geolocation, GeostationaryGrid, LambertGrid};
pub use metadata::{
    strip_global_prefix, sub_dataset_name, DriverKind, MetadataMap, RasterBand, RasterInfo,
    RawMetadata, SubDataset, GLOBAL_PREFIX,
};
