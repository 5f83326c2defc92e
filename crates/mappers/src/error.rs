//! Error types for probing, registration and dispatch.

use std::path::PathBuf;

use raster_common::RasterError;
use raster_io::IoError;
use thiserror::Error;

use crate::mapper::Rejection;

/// The file could not be opened or inspected at all.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: IoError,
    },
}

/// A mapper recognised the file but could not build a dataset from it.
///
/// Distinct from [`Rejection`]: this is never a reason to try the next
/// mapper.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("Invalid attribute {name}: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("Sub-dataset {index} out of range ({count} available)")]
    SubDatasetOutOfRange { index: usize, count: usize },

    #[error("Sub-dataset {index} ({variable}) is not a 2-D raster")]
    SubDatasetNotRaster { index: usize, variable: String },

    #[error("No raster variables in file")]
    NoRasterVariables,

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// A registration entry could not produce its mapper.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Mapper {name} failed to initialize: {reason}")]
    Init { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors surfaced to callers of the [`Dispatcher`](crate::Dispatcher).
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Unknown mapper: {0}")]
    UnknownMapper(String),

    #[error("Mapper {mapper} rejected {path}: {reason}")]
    MapperRejected {
        mapper: String,
        path: PathBuf,
        reason: Rejection,
    },

    #[error("No mapper accepted {path} (tried: {})", attempted.join(", "))]
    NoMapperFound {
        path: PathBuf,
        attempted: Vec<String>,
    },

    #[error("Mapper {mapper} failed on {path}: {source}")]
    Construction {
        mapper: String,
        path: PathBuf,
        #[source]
        source: MapperError,
    },

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_mapper_found_lists_attempts() {
        let err = DispatchError::NoMapperFound {
            path: "/data/x.bin".into(),
            attempted: vec!["arome".into(), "generic".into()],
        };
        assert_eq!(
            err.to_string(),
            "No mapper accepted /data/x.bin (tried: arome, generic)"
        );
    }

    #[test]
    fn test_construction_keeps_source() {
        use std::error::Error;
        let err = DispatchError::Construction {
            mapper: "arome".into(),
            path: "/data/a.nc".into(),
            source: MapperError::MissingAttribute("min_time".into()),
        };
        assert!(err.source().unwrap().to_string().contains("min_time"));
    }
}
