//! Raw, driver-level metadata collected by a probe.
//!
//! Keys follow the GDAL conventions so that mapper logic does not depend on
//! which file format the values came from: dataset-level attributes are
//! prefixed with `NC_GLOBAL#`, per-variable attributes use `<var>#<attr>`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dataset::BandDataType;
use crate::geolocation::GeoTransform;

/// Ordered key/value metadata.
pub type MetadataMap = BTreeMap<String, String>;

/// Prefix of dataset-level attributes in a [`MetadataMap`].
pub const GLOBAL_PREFIX: &str = "NC_GLOBAL#";

/// Format driver a file was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    Grib,
    NetCdf,
    Zarr,
    Memory,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Grib => "GRIB",
            DriverKind::NetCdf => "netCDF",
            DriverKind::Zarr => "Zarr",
            DriverKind::Memory => "MEM",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A band exposed directly by the top-level raster (GRIB messages, a single
/// Zarr array).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterBand {
    /// 1-based band index
    pub index: usize,
    pub data_type: BandDataType,
    pub metadata: MetadataMap,
}

/// Top-level raster view of a file.
///
/// Container formats (NetCDF, Zarr groups) usually have zero raster bands and
/// expose their variables as [`SubDataset`]s instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<RasterBand>,
    pub geo_transform: Option<GeoTransform>,
}

/// A variable inside a container file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubDataset {
    /// Fully qualified name, `DRIVER:"path":variable`
    pub name: String,
    pub variable: String,
    /// Dimension sizes, slowest varying first
    pub shape: Vec<usize>,
    /// Dimension names, same order as `shape`
    pub dimensions: Vec<String>,
    pub data_type: BandDataType,
    pub metadata: MetadataMap,
}

impl SubDataset {
    /// `(height, width)` of the two fastest varying dimensions.
    pub fn grid_shape(&self) -> Option<(usize, usize)> {
        match self.shape.as_slice() {
            [.., h, w] => Some((*h, *w)),
            _ => None,
        }
    }

    /// Number of 2-D slices stacked along the leading dimensions.
    pub fn slice_count(&self) -> usize {
        if self.shape.len() < 2 {
            return 0;
        }
        self.shape[..self.shape.len() - 2].iter().product()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }
}

/// Everything a probe learned about a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    pub path: PathBuf,
    pub driver: DriverKind,
    pub metadata: MetadataMap,
    pub sub_datasets: Vec<SubDataset>,
    pub raster: RasterInfo,
}

impl RawMetadata {
    pub fn new(path: impl Into<PathBuf>, driver: DriverKind) -> Self {
        Self {
            path: path.into(),
            driver,
            metadata: MetadataMap::new(),
            sub_datasets: Vec::new(),
            raster: RasterInfo::default(),
        }
    }

    /// Dataset-level attribute, looked up as `NC_GLOBAL#name` then `name`.
    pub fn global(&self, name: &str) -> Option<&str> {
        self.metadata
            .get(&format!("{GLOBAL_PREFIX}{name}"))
            .or_else(|| self.metadata.get(name))
            .map(String::as_str)
    }

    /// Per-variable attribute stored as `variable#name`.
    pub fn variable_attr(&self, variable: &str, name: &str) -> Option<&str> {
        if let Some(value) = self.metadata.get(&format!("{variable}#{name}")) {
            return Some(value);
        }
        self.sub_dataset(variable).and_then(|s| s.attr(name))
    }

    pub fn sub_dataset(&self, variable: &str) -> Option<&SubDataset> {
        self.sub_datasets.iter().find(|s| s.variable == variable)
    }

    /// Dataset-level attributes with the `NC_GLOBAL#` prefix removed.
    ///
    /// Per-variable (`var#attr`) keys are left out.
    pub fn global_metadata(&self) -> MetadataMap {
        self.metadata
            .iter()
            .filter_map(|(k, v)| match k.strip_prefix(GLOBAL_PREFIX) {
                Some(bare) => Some((bare.to_string(), v.clone())),
                None if !k.contains('#') => Some((k.clone(), v.clone())),
                None => None,
            })
            .collect()
    }

    /// Whether the file exposes anything a mapper could turn into bands.
    pub fn has_content(&self) -> bool {
        !self.raster.bands.is_empty() || !self.sub_datasets.is_empty()
    }
}

/// Remove a leading `NC_GLOBAL#` if present.
pub fn strip_global_prefix(key: &str) -> &str {
    key.strip_prefix(GLOBAL_PREFIX).unwrap_or(key)
}

/// Build a sub-dataset name in the `DRIVER:"path":variable` form.
pub fn sub_dataset_name(driver: DriverKind, path: &std::path::Path, variable: &str) -> String {
    format!("{}:\"{}\":{}", driver.as_str(), path.display(), variable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawMetadata {
        let mut raw = RawMetadata::new("/data/arome.nc", DriverKind::NetCdf);
        raw.metadata
            .insert("NC_GLOBAL#source".into(), "AROME MetCoOp".into());
        raw.metadata.insert("title".into(), "bare title".into());
        raw.metadata.insert("x_wind#units".into(), "m/s".into());
        raw
    }

    #[test]
    fn test_global_prefers_prefixed_key() {
        let mut raw = sample();
        assert_eq!(raw.global("source"), Some("AROME MetCoOp"));
        assert_eq!(raw.global("title"), Some("bare title"));
        raw.metadata.insert("NC_GLOBAL#title".into(), "prefixed".into());
        assert_eq!(raw.global("title"), Some("prefixed"));
        assert_eq!(raw.global("missing"), None);
    }

    #[test]
    fn test_global_metadata_strips_prefix_and_skips_variables() {
        let globals = sample().global_metadata();
        assert_eq!(globals.get("source").map(String::as_str), Some("AROME MetCoOp"));
        assert!(globals.contains_key("title"));
        assert!(!globals.keys().any(|k| k.contains('#')));
    }

    #[test]
    fn test_variable_attr() {
        assert_eq!(sample().variable_attr("x_wind", "units"), Some("m/s"));
        assert_eq!(sample().variable_attr("y_wind", "units"), None);
    }

    #[test]
    fn test_sub_dataset_shape() {
        let sds = SubDataset {
            name: sub_dataset_name(DriverKind::NetCdf, std::path::Path::new("/a.nc"), "t"),
            variable: "t".into(),
            shape: vec![3, 2, 10, 20],
            dimensions: vec!["time".into(), "height".into(), "y".into(), "x".into()],
            data_type: BandDataType::Float32,
            metadata: MetadataMap::new(),
        };
        assert_eq!(sds.name, "netCDF:\"/a.nc\":t");
        assert_eq!(sds.grid_shape(), Some((10, 20)));
        assert_eq!(sds.slice_count(), 6);
    }
}
