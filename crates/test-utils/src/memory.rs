//! In-memory [`RasterBackend`] for mapper tests that must not touch disk.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use raster_common::{
    sub_dataset_name, BandDataType, BandSource, DriverKind, GeoTransform, MetadataMap,
    RasterBand, RawMetadata, SubDataset, GLOBAL_PREFIX,
};
use raster_io::{slice_band, IoError, IoResult, RasterBackend};

/// A file held in memory: its probe result plus the values behind it.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    pub raw: RawMetadata,
    /// Whole variables keyed by name
    pub variables: BTreeMap<String, Vec<f64>>,
    /// Top-level raster bands keyed by 1-based index
    pub bands: BTreeMap<usize, Vec<f64>>,
}

impl MemoryFile {
    pub fn new(raw: RawMetadata) -> Self {
        Self {
            raw,
            variables: BTreeMap::new(),
            bands: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: &str, values: Vec<f64>) -> Self {
        self.variables.insert(name.to_string(), values);
        self
    }

    pub fn with_band(mut self, index: usize, values: Vec<f64>) -> Self {
        self.bands.insert(index, values);
        self
    }
}

/// Backend serving [`MemoryFile`]s and counting every call made to it.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: HashMap<PathBuf, MemoryFile>,
    opens: AtomicUsize,
    reads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under the path stored in its metadata.
    pub fn with_file(mut self, file: MemoryFile) -> Self {
        self.files.insert(file.raw.path.clone(), file);
        self
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `read_band` and `read_variable` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn file(&self, path: &Path) -> IoResult<&MemoryFile> {
        self.files.get(path).ok_or_else(|| {
            IoError::FileRead(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not registered", path.display()),
            ))
        })
    }
}

impl RasterBackend for MemoryBackend {
    fn open(&self, path: &Path) -> IoResult<RawMetadata> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(self.file(path)?.raw.clone())
    }

    fn read_band(&self, source: &BandSource) -> IoResult<Vec<f64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let file = self.file(&source.path)?;
        match &source.variable {
            None => file
                .bands
                .get(&source.index)
                .cloned()
                .ok_or(IoError::BandOutOfRange {
                    index: source.index,
                    count: file.bands.len(),
                }),
            Some(variable) => {
                let values = file.variables.get(variable).cloned().ok_or_else(|| {
                    IoError::VariableNotFound {
                        path: source.path.clone(),
                        variable: variable.clone(),
                    }
                })?;
                let shape = file
                    .raw
                    .sub_dataset(variable)
                    .map(|s| s.shape.clone())
                    .unwrap_or_default();
                slice_band(values, &shape, source.index)
            }
        }
    }

    fn read_variable(&self, path: &Path, variable: &str) -> IoResult<Vec<f64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.file(path)?
            .variables
            .get(variable)
            .cloned()
            .ok_or_else(|| IoError::VariableNotFound {
                path: path.to_path_buf(),
                variable: variable.to_string(),
            })
    }
}

/// Fluent construction of [`RawMetadata`] for tests.
///
/// ```
/// use raster_common::DriverKind;
/// use test_utils::RawMetadataBuilder;
///
/// let raw = RawMetadataBuilder::new("/data/t.nc", DriverKind::NetCdf)
///     .global("source", "AROME MetCoOp")
///     .variable("air_temperature_2m", &["y", "x"], &[3, 4])
///     .build();
/// assert_eq!(raw.global("source"), Some("AROME MetCoOp"));
/// assert_eq!(raw.sub_datasets.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RawMetadataBuilder {
    raw: RawMetadata,
}

impl RawMetadataBuilder {
    pub fn new(path: impl Into<PathBuf>, driver: DriverKind) -> Self {
        Self {
            raw: RawMetadata::new(path, driver),
        }
    }

    /// Dataset-level attribute, stored with the `NC_GLOBAL#` prefix.
    pub fn global(mut self, key: &str, value: &str) -> Self {
        self.raw
            .metadata
            .insert(format!("{GLOBAL_PREFIX}{key}"), value.to_string());
        self
    }

    /// Unprefixed dataset-level key, as GRIB files report them.
    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.raw.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Float32 variable exposed as a sub-dataset.
    pub fn variable(self, name: &str, dimensions: &[&str], shape: &[usize]) -> Self {
        self.typed_variable(name, dimensions, shape, BandDataType::Float32)
    }

    pub fn typed_variable(
        mut self,
        name: &str,
        dimensions: &[&str],
        shape: &[usize],
        data_type: BandDataType,
    ) -> Self {
        let sub = SubDataset {
            name: sub_dataset_name(self.raw.driver, &self.raw.path, name),
            variable: name.to_string(),
            shape: shape.to_vec(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            data_type,
            metadata: MetadataMap::new(),
        };
        self.raw.sub_datasets.push(sub);
        self
    }

    /// Attribute of a variable declared with [`variable`](Self::variable).
    ///
    /// Stored both as a `var#attr` key and on the sub-dataset itself, the
    /// way the file probes report them.
    pub fn attr(mut self, variable: &str, key: &str, value: &str) -> Self {
        self.raw
            .metadata
            .insert(format!("{variable}#{key}"), value.to_string());
        if let Some(sub) = self
            .raw
            .sub_datasets
            .iter_mut()
            .find(|s| s.variable == variable)
        {
            sub.metadata.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn raster_size(mut self, width: usize, height: usize) -> Self {
        self.raw.raster.width = width;
        self.raw.raster.height = height;
        self
    }

    pub fn geo_transform(mut self, transform: GeoTransform) -> Self {
        self.raw.raster.geo_transform = Some(transform);
        self
    }

    /// Top-level Float64 band with the given metadata pairs.
    pub fn band(mut self, metadata: &[(&str, &str)]) -> Self {
        let index = self.raw.raster.bands.len() + 1;
        self.raw.raster.bands.push(RasterBand {
            index,
            data_type: BandDataType::Float64,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    pub fn build(self) -> RawMetadata {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> MemoryFile {
        let raw = RawMetadataBuilder::new("/mem/a.nc", DriverKind::Memory)
            .variable("t", &["time", "y", "x"], &[2, 2, 2])
            .attr("t", "units", "K")
            .build();
        MemoryFile::new(raw).with_variable("t", (0..8u8).map(f64::from).collect())
    }

    #[test]
    fn test_counts_calls() {
        let backend = MemoryBackend::new().with_file(file());
        assert_eq!(backend.open_count(), 0);
        backend.open(Path::new("/mem/a.nc")).unwrap();
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.read_count(), 0);
        backend.read_variable(Path::new("/mem/a.nc"), "t").unwrap();
        assert_eq!(backend.read_count(), 1);
    }

    #[test]
    fn test_read_band_slices_variable() {
        let backend = MemoryBackend::new().with_file(file());
        let source = BandSource {
            path: "/mem/a.nc".into(),
            variable: Some("t".into()),
            index: 2,
        };
        assert_eq!(backend.read_band(&source).unwrap(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_unknown_path_is_read_error() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.open(Path::new("/nope")),
            Err(IoError::FileRead(_))
        ));
    }

    #[test]
    fn test_attr_lands_in_both_places() {
        let raw = file().raw;
        assert_eq!(raw.metadata.get("t#units").map(String::as_str), Some("K"));
        assert_eq!(raw.sub_dataset("t").unwrap().attr("units"), Some("K"));
    }
}
