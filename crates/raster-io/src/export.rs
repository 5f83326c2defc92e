//! Writing a normalized dataset to a Zarr v3 store.
//!
//! Layout:
//! - root group attributes: the dataset metadata
//! - one `float64` array per band, named after the band
//! - `longitude` / `latitude` arrays with per-pixel centres when georeferenced
//!
//! Reopening the store through the mapper registry reproduces the same
//! geolocation grids.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use raster_common::{MetadataMap, NormalizedDataset};
use tracing::{debug, info};
use zarrs::array::{ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::backend::RasterBackend;
use crate::error::{zarr_err, IoError, IoResult};

const MAX_CHUNK: usize = 512;

/// Attributes describing packing of the source values; exported values are
/// already unpacked.
const PACKING_ATTRIBUTES: &[&str] = &["scale_factor", "add_offset", "_FillValue", "missing_value"];

const COORDINATE_NAMES: &[&str] = &["longitude", "latitude"];

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub bands: Vec<String>,
    pub geolocation: bool,
}

fn json_attributes(metadata: &MetadataMap) -> serde_json::Map<String, serde_json::Value> {
    metadata
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect()
}

fn array_name(band: &str) -> String {
    let name = band.replace('/', "_");
    if COORDINATE_NAMES.contains(&name.as_str()) {
        format!("band_{}", name)
    } else {
        name
    }
}

fn write_grid(
    store: &Arc<FilesystemStore>,
    name: &str,
    values: &[f64],
    width: usize,
    height: usize,
    attributes: serde_json::Map<String, serde_json::Value>,
) -> IoResult<()> {
    if values.len() != width * height {
        return Err(IoError::SizeMismatch {
            expected: width * height,
            actual: values.len(),
        });
    }

    let chunk_grid: ChunkGrid = vec![height.min(MAX_CHUNK) as u64, width.min(MAX_CHUNK) as u64]
        .try_into()
        .map_err(|e| IoError::Zarr(format!("invalid chunk shape: {:?}", e)))?;
    let array = ArrayBuilder::new(
        vec![height as u64, width as u64],
        DataType::Float64,
        chunk_grid,
        FillValue::from(f64::NAN),
    )
    .attributes(attributes)
    .build(store.clone(), &format!("/{}", name))
    .map_err(zarr_err)?;
    array.store_metadata().map_err(zarr_err)?;

    let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![height as u64, width as u64])
        .map_err(zarr_err)?;
    array
        .store_array_subset_elements(&subset, values)
        .map_err(zarr_err)?;
    Ok(())
}

/// Export `dataset` to a new Zarr store at `out`, reading band values
/// through `backend`.
pub fn export_zarr(
    dataset: &NormalizedDataset,
    backend: &dyn RasterBackend,
    out: &Path,
) -> IoResult<ExportSummary> {
    if out.exists() && out.read_dir()?.next().is_some() {
        return Err(IoError::Export(format!(
            "{} already exists and is not empty",
            out.display()
        )));
    }
    if dataset.width == 0 || dataset.height == 0 {
        return Err(IoError::Export("dataset has an empty grid".to_string()));
    }
    std::fs::create_dir_all(out)?;
    let store = Arc::new(FilesystemStore::new(out).map_err(zarr_err)?);

    let group = GroupBuilder::new()
        .attributes(json_attributes(&dataset.metadata))
        .build(store.clone(), "/")
        .map_err(zarr_err)?;
    group.store_metadata().map_err(zarr_err)?;

    let mut written = Vec::with_capacity(dataset.bands.len());
    for band in &dataset.bands {
        let values = backend.read_band(&band.source)?;
        let mut attrs = band.metadata.clone();
        for key in PACKING_ATTRIBUTES {
            attrs.remove(*key);
        }
        if dataset.geolocation.is_georeferenced() {
            attrs.insert("coordinates".to_string(), "longitude latitude".to_string());
        }
        let name = array_name(&band.name);
        write_grid(
            &store,
            &name,
            &values,
            dataset.width,
            dataset.height,
            json_attributes(&attrs),
        )?;
        debug!(band = %band.name, array = %name, "Exported band");
        written.push(name);
    }

    let georeferenced = dataset.geolocation.is_georeferenced();
    if georeferenced {
        let (lon, lat) = dataset.geolocation_grids()?;
        for (name, values, units) in [
            ("longitude", &lon, "degrees_east"),
            ("latitude", &lat, "degrees_north"),
        ] {
            let mut attrs = serde_json::Map::new();
            attrs.insert("standard_name".into(), serde_json::json!(name));
            attrs.insert("units".into(), serde_json::json!(units));
            write_grid(&store, name, values, dataset.width, dataset.height, attrs)?;
        }
    }

    info!(
        path = %out.display(),
        bands = written.len(),
        geolocation = georeferenced,
        mapper = %dataset.mapper,
        "Exported dataset to Zarr"
    );

    Ok(ExportSummary {
        path: out.to_path_buf(),
        bands: written,
        geolocation: georeferenced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_name() {
        assert_eq!(array_name("air_temperature_2m"), "air_temperature_2m");
        assert_eq!(array_name("a/b"), "a_b");
        assert_eq!(array_name("latitude"), "band_latitude");
    }
}
