//! Zarr v3 driver.
//!
//! Node metadata comes straight from each node's `zarr.json`; array values
//! are read through `zarrs`. A store whose root is a single array carrying a
//! `bbox` attribute is read as a plain raster (the layout written by the
//! grid ingestion pipeline). Otherwise the root is a group and each array
//! below it becomes a sub-dataset.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use raster_common::{
    sub_dataset_name, BandDataType, BandSource, BoundingBox, DriverKind, GeoTransform,
    MetadataMap, RasterBand, RawMetadata, SubDataset, GLOBAL_PREFIX,
};
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::backend::cf_unpack;
use crate::error::{zarr_err, IoError, IoResult};

/// The subset of `zarr.json` we need for probing.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeMetadata {
    pub node_type: String,
    #[serde(default)]
    pub shape: Vec<u64>,
    #[serde(default)]
    pub data_type: Option<serde_json::Value>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub dimension_names: Option<Vec<Option<String>>>,
}

impl NodeMetadata {
    pub fn is_array(&self) -> bool {
        self.node_type == "array"
    }

    fn band_data_type(&self) -> Option<BandDataType> {
        self.data_type.as_ref()?.as_str()?.parse().ok()
    }

    fn shape(&self) -> Vec<usize> {
        self.shape.iter().map(|&n| n as usize).collect()
    }

    fn attribute_strings(&self) -> MetadataMap {
        self.attributes
            .iter()
            .map(|(k, v)| (k.clone(), attribute_string(v)))
            .collect()
    }
}

/// Strings are stored bare; everything else as compact JSON.
pub fn attribute_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// All nodes in the store keyed by path relative to the root (`""` is the
/// root itself).
pub fn list_nodes(root: &Path) -> IoResult<BTreeMap<String, NodeMetadata>> {
    let mut nodes = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| IoError::Zarr(e.to_string()))?;
        if entry.file_name() != "zarr.json" {
            continue;
        }
        let node_dir = entry.path().parent().unwrap_or(root);
        let relative = node_dir
            .strip_prefix(root)
            .map_err(|e| IoError::Zarr(e.to_string()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        let text = std::fs::read_to_string(entry.path())?;
        let meta: NodeMetadata = serde_json::from_str(&text)
            .map_err(|e| IoError::Zarr(format!("{}: {}", entry.path().display(), e)))?;
        nodes.insert(key, meta);
    }
    Ok(nodes)
}

pub fn probe(path: &Path) -> IoResult<RawMetadata> {
    let nodes = list_nodes(path)?;
    let root = nodes
        .get("")
        .ok_or_else(|| IoError::Zarr(format!("{} has no root zarr.json", path.display())))?;

    let mut raw = RawMetadata::new(path, DriverKind::Zarr);
    for (key, value) in root.attribute_strings() {
        raw.metadata.insert(format!("{GLOBAL_PREFIX}{key}"), value);
    }

    if root.is_array() {
        probe_single_array(path, root, &mut raw)?;
    } else {
        for (name, node) in nodes.iter().filter(|(k, n)| !k.is_empty() && n.is_array()) {
            let attrs = node.attribute_strings();
            for (key, value) in &attrs {
                raw.metadata.insert(format!("{name}#{key}"), value.clone());
            }
            let Some(data_type) = node.band_data_type() else {
                debug!(variable = %name, "Skipping Zarr array with unsupported data type");
                continue;
            };
            let shape = node.shape();
            if shape.is_empty() {
                continue;
            }
            let dimensions = match &node.dimension_names {
                Some(names) if names.len() == shape.len() => names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| n.clone().unwrap_or_else(|| format!("dim_{}", i)))
                    .collect(),
                _ => (0..shape.len()).map(|i| format!("dim_{}", i)).collect(),
            };
            raw.sub_datasets.push(SubDataset {
                name: sub_dataset_name(DriverKind::Zarr, path, name),
                variable: name.clone(),
                shape,
                dimensions,
                data_type,
                metadata: attrs,
            });
        }
    }

    debug!(
        path = %path.display(),
        sub_datasets = raw.sub_datasets.len(),
        bands = raw.raster.bands.len(),
        "Probed Zarr store"
    );
    Ok(raw)
}

fn probe_single_array(path: &Path, root: &NodeMetadata, raw: &mut RawMetadata) -> IoResult<()> {
    let shape = root.shape();
    let [lead @ .., height, width] = shape.as_slice() else {
        return Err(IoError::Zarr(format!(
            "{}: root array must be at least 2-D, got shape {:?}",
            path.display(),
            shape
        )));
    };
    let data_type = root
        .band_data_type()
        .ok_or_else(|| IoError::Zarr(format!("{}: unsupported data type", path.display())))?;

    raw.raster.width = *width;
    raw.raster.height = *height;
    raw.raster.geo_transform = root
        .attributes
        .get("bbox")
        .and_then(BoundingBox::from_json)
        .map(|bbox| GeoTransform::from_bbox(&bbox, *width, *height));

    let count: usize = lead.iter().product();
    let metadata = root.attribute_strings();
    raw.raster.bands = (1..=count)
        .map(|index| RasterBand {
            index,
            data_type,
            metadata: metadata.clone(),
        })
        .collect();
    Ok(())
}

fn open_array(root: &Path, node: &str) -> IoResult<Array<FilesystemStore>> {
    let store = Arc::new(FilesystemStore::new(root).map_err(zarr_err)?);
    Array::open(store, &format!("/{}", node)).map_err(zarr_err)
}

fn read_subset(array: &Array<FilesystemStore>, subset: &ArraySubset) -> IoResult<Vec<f64>> {
    macro_rules! read_as {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(subset)
                .map_err(zarr_err)?
                .into_iter()
                .map(|v| v as f64)
                .collect()
        };
    }

    let values: Vec<f64> = match array.data_type() {
        DataType::Float64 => read_as!(f64),
        DataType::Float32 => read_as!(f32),
        DataType::Int8 => read_as!(i8),
        DataType::Int16 => read_as!(i16),
        DataType::Int32 => read_as!(i32),
        DataType::Int64 => read_as!(i64),
        DataType::UInt8 => read_as!(u8),
        DataType::UInt16 => read_as!(u16),
        DataType::UInt32 => read_as!(u32),
        DataType::UInt64 => read_as!(u64),
        other => {
            return Err(IoError::Zarr(format!("unsupported data type {:?}", other)));
        }
    };
    Ok(values)
}

/// Read one 2-D band. `variable == None` addresses the root array.
pub fn read_band(source: &BandSource) -> IoResult<Vec<f64>> {
    let node = source.variable.as_deref().unwrap_or("");
    let array = open_array(&source.path, node)?;
    let shape: Vec<usize> = array.shape().iter().map(|&n| n as usize).collect();
    if shape.len() < 2 {
        return Err(IoError::Zarr(format!("'{}' is not a 2-D array", node)));
    }

    let (h, w) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    let count: usize = shape[..shape.len() - 2].iter().product();
    if source.index == 0 || source.index > count {
        return Err(IoError::BandOutOfRange {
            index: source.index,
            count,
        });
    }

    let mut start = unravel(source.index - 1, &shape[..shape.len() - 2]);
    start.extend([0, 0]);
    let mut extent = vec![1u64; shape.len() - 2];
    extent.extend([h as u64, w as u64]);
    let subset = ArraySubset::new_with_start_shape(start, extent).map_err(zarr_err)?;

    let mut values = read_subset(&array, &subset)?;
    apply_packing(&array, &mut values);
    Ok(values)
}

/// Read an entire array flattened in row-major order.
pub fn read_variable(path: &Path, variable: &str) -> IoResult<Vec<f64>> {
    let array = match open_array(path, variable) {
        Ok(array) => array,
        Err(_) if !path.join(variable).join("zarr.json").is_file() => {
            return Err(IoError::VariableNotFound {
                path: path.to_path_buf(),
                variable: variable.to_string(),
            })
        }
        Err(e) => return Err(e),
    };
    let mut values = read_subset(&array, &array.subset_all())?;
    apply_packing(&array, &mut values);
    Ok(values)
}

fn apply_packing(array: &Array<FilesystemStore>, values: &mut [f64]) {
    let attrs: MetadataMap = array
        .attributes()
        .iter()
        .map(|(k, v)| (k.clone(), attribute_string(v)))
        .collect();
    cf_unpack(values, &attrs);
}

/// Row-major multi-index of flat position `flat` within `dims`.
fn unravel(mut flat: usize, dims: &[usize]) -> Vec<u64> {
    let mut index = vec![0u64; dims.len()];
    for (slot, &dim) in index.iter_mut().zip(dims).rev() {
        *slot = (flat % dim) as u64;
        flat /= dim;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unravel() {
        assert_eq!(unravel(0, &[2, 3]), vec![0, 0]);
        assert_eq!(unravel(4, &[2, 3]), vec![1, 1]);
        assert_eq!(unravel(5, &[2, 3]), vec![1, 2]);
        assert!(unravel(0, &[]).is_empty());
    }

    #[test]
    fn test_attribute_string() {
        assert_eq!(attribute_string(&serde_json::json!("AROME")), "AROME");
        assert_eq!(attribute_string(&serde_json::json!(2.5)), "2.5");
        assert_eq!(attribute_string(&serde_json::json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_node_metadata_parse() {
        let meta: NodeMetadata = serde_json::from_str(
            r#"{"zarr_format":3,"node_type":"array","shape":[2,3],"data_type":"float32",
                "attributes":{"units":"K"},"dimension_names":["y",null]}"#,
        )
        .unwrap();
        assert!(meta.is_array());
        assert_eq!(meta.band_data_type(), Some(BandDataType::Float32));
        assert_eq!(meta.attribute_strings().get("units").unwrap(), "K");
    }
}
