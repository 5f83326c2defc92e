//! Small Zarr stores and in-memory files shaped like the product families
//! the built-in mappers recognise.
//!
//! The Zarr writers produce real stores on disk, so they exercise the whole
//! stack: file sniffing, probing, mapper selection and band reads.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use raster_common::{BoundingBox, DriverKind, LambertGrid};
use serde_json::{json, Map, Value};
use zarrs::array::{ArrayBuilder, ChunkGrid, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

use crate::generators::{axis, create_temperature_grid};
use crate::memory::{MemoryFile, RawMetadataBuilder};

pub type FixtureResult<T> = Result<T, Box<dyn Error>>;

pub const AROME_WIDTH: usize = 4;
pub const AROME_HEIGHT: usize = 3;
pub const GOES_WIDTH: usize = 5;
pub const GOES_HEIGHT: usize = 4;

/// Values of one fixture array in its storage type.
#[derive(Debug, Clone)]
pub enum FixtureValues {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I16(Vec<i16>),
}

impl FixtureValues {
    fn len(&self) -> usize {
        match self {
            FixtureValues::F64(v) => v.len(),
            FixtureValues::F32(v) => v.len(),
            FixtureValues::I16(v) => v.len(),
        }
    }
}

/// One array to write into a fixture store.
#[derive(Debug, Clone)]
pub struct FixtureArray {
    pub name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub values: FixtureValues,
    pub attributes: Map<String, Value>,
}

impl FixtureArray {
    pub fn new(name: &str, dimensions: &[&str], shape: &[usize], values: FixtureValues) -> Self {
        Self {
            name: name.to_string(),
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            values,
            attributes: Map::new(),
        }
    }

    pub fn f64(name: &str, dimensions: &[&str], shape: &[usize], values: Vec<f64>) -> Self {
        Self::new(name, dimensions, shape, FixtureValues::F64(values))
    }

    pub fn f32(name: &str, dimensions: &[&str], shape: &[usize], values: Vec<f32>) -> Self {
        Self::new(name, dimensions, shape, FixtureValues::F32(values))
    }

    pub fn i16(name: &str, dimensions: &[&str], shape: &[usize], values: Vec<i16>) -> Self {
        Self::new(name, dimensions, shape, FixtureValues::I16(values))
    }

    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }
}

fn write_array(store: &Arc<FilesystemStore>, fixture: &FixtureArray) -> FixtureResult<()> {
    let expected: usize = fixture.shape.iter().product();
    if fixture.values.len() != expected {
        return Err(format!(
            "{}: {} values for shape {:?}",
            fixture.name,
            fixture.values.len(),
            fixture.shape
        )
        .into());
    }

    let shape: Vec<u64> = fixture.shape.iter().map(|&n| n as u64).collect();
    let chunk_grid: ChunkGrid = shape
        .clone()
        .try_into()
        .map_err(|e| format!("invalid chunk shape: {:?}", e))?;
    let (data_type, fill_value) = match &fixture.values {
        FixtureValues::F64(_) => (DataType::Float64, FillValue::from(f64::NAN)),
        FixtureValues::F32(_) => (DataType::Float32, FillValue::from(f32::NAN)),
        FixtureValues::I16(_) => (DataType::Int16, FillValue::from(i16::MIN)),
    };

    let mut builder = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value);
    builder
        .attributes(fixture.attributes.clone())
        .dimension_names(Some(fixture.dimensions.clone()));
    let array = builder.build(store.clone(), &format!("/{}", fixture.name))?;
    array.store_metadata()?;

    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)?;
    match &fixture.values {
        FixtureValues::F64(v) => array.store_array_subset_elements(&subset, v)?,
        FixtureValues::F32(v) => array.store_array_subset_elements(&subset, v)?,
        FixtureValues::I16(v) => array.store_array_subset_elements(&subset, v)?,
    }
    Ok(())
}

/// Write a Zarr v3 store whose root group carries `attributes` and holds
/// `arrays`.
pub fn write_zarr_group(
    path: &Path,
    attributes: Map<String, Value>,
    arrays: &[FixtureArray],
) -> FixtureResult<()> {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let group = GroupBuilder::new()
        .attributes(attributes)
        .build(store.clone(), "/")?;
    group.store_metadata()?;

    for array in arrays {
        write_array(&store, array)?;
    }
    Ok(())
}

/// Write a store whose root is a single 2-D float32 array with a `bbox`
/// attribute, the layout grid ingestion pipelines produce.
pub fn write_zarr_with_data(
    path: &Path,
    data: &[f32],
    width: usize,
    height: usize,
    bbox: &BoundingBox,
) -> FixtureResult<()> {
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);

    let array = ArrayBuilder::new(
        vec![height as u64, width as u64],
        DataType::Float32,
        vec![height as u64, width as u64].try_into()?,
        FillValue::from(f32::NAN),
    )
    .attributes({
        let mut attrs = Map::new();
        attrs.insert("model".to_string(), json!("test"));
        attrs.insert("parameter".to_string(), json!("TMP"));
        attrs.insert("units".to_string(), json!("K"));
        attrs.insert("reference_time".to_string(), json!("2024-12-22T00:00:00Z"));
        attrs.insert("bbox".to_string(), bbox.to_json());
        attrs
    })
    .build(store.clone(), "/")?;
    array.store_metadata()?;

    let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![height as u64, width as u64])?;
    array.store_array_subset_elements(&subset, data)?;
    Ok(())
}

fn attributes(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Lambert grid of the AROME fixtures: 2.5 km spacing around 63.3N 15E.
pub fn arome_lambert_grid() -> LambertGrid {
    LambertGrid {
        latitude_of_projection_origin: 63.3,
        longitude_of_central_meridian: 15.0,
        standard_parallel: (63.3, 63.3),
        earth_radius: 6_371_000.0,
        x0: -3750.0,
        y0: -2500.0,
        dx: 2500.0,
        dy: 2500.0,
    }
}

/// Projected axes and per-pixel longitude/latitude of the AROME fixture grid.
fn arome_coordinates() -> FixtureResult<(Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> {
    let grid = arome_lambert_grid();
    let proj = grid.projection()?;
    let x = axis(grid.x0, grid.dx, AROME_WIDTH);
    let y = axis(grid.y0, grid.dy, AROME_HEIGHT);
    let mut lon = Vec::with_capacity(AROME_WIDTH * AROME_HEIGHT);
    let mut lat = Vec::with_capacity(AROME_WIDTH * AROME_HEIGHT);
    for &yy in &y {
        for &xx in &x {
            let (lo, la) = proj.unproject(xx, yy);
            lon.push(lo);
            lat.push(la);
        }
    }
    Ok((x, y, lon, lat))
}

/// AROME MetCoOp style store: CF variables on a Lambert grid with 2-D
/// longitude/latitude, a packed precipitation field and `min_time`/`max_time`
/// globals.
pub fn arome_store(dir: &Path) -> FixtureResult<PathBuf> {
    let path = dir.join("arome_metcoop.zarr");
    let (w, h) = (AROME_WIDTH, AROME_HEIGHT);
    let (x, y, lon, lat) = arome_coordinates()?;

    let temperature: Vec<f32> = create_temperature_grid(w, h)
        .into_iter()
        .map(|v| v as f32)
        .collect();
    let mut precipitation: Vec<i16> = (0..(w * h) as i16).map(|i| i * 25).collect();
    precipitation[0] = -32767;

    let globals = attributes(&[
        ("source", json!("AROME MetCoOp")),
        ("title", json!("MEPS 2.5 km deterministic forecast")),
        ("Conventions", json!("CF-1.6")),
        ("min_time", json!("2024-01-15 00:00:00Z")),
        ("max_time", json!("2024-01-17 18:00:00Z")),
    ]);

    let arrays = vec![
        FixtureArray::f64("time", &["time"], &[1], vec![1_705_276_800.0])
            .attr("units", json!("seconds since 1970-01-01 00:00:00 +00:00"))
            .attr("standard_name", json!("time")),
        FixtureArray::f64("x", &["x"], &[w], x)
            .attr("units", json!("m"))
            .attr("standard_name", json!("projection_x_coordinate")),
        FixtureArray::f64("y", &["y"], &[h], y)
            .attr("units", json!("m"))
            .attr("standard_name", json!("projection_y_coordinate")),
        FixtureArray::f64("projection_lambert", &["dummy"], &[1], vec![0.0])
            .attr("grid_mapping_name", json!("lambert_conformal_conic"))
            .attr("standard_parallel", json!([63.3, 63.3]))
            .attr("longitude_of_central_meridian", json!(15.0))
            .attr("latitude_of_projection_origin", json!(63.3))
            .attr("earth_radius", json!(6_371_000.0)),
        FixtureArray::f64("longitude", &["y", "x"], &[h, w], lon)
            .attr("units", json!("degrees_east"))
            .attr("standard_name", json!("longitude")),
        FixtureArray::f64("latitude", &["y", "x"], &[h, w], lat)
            .attr("units", json!("degrees_north"))
            .attr("standard_name", json!("latitude")),
        FixtureArray::f32(
            "air_temperature_2m",
            &["time", "height2", "y", "x"],
            &[1, 1, h, w],
            temperature,
        )
        .attr("units", json!("K"))
        .attr("standard_name", json!("air_temperature"))
        .attr("grid_mapping", json!("projection_lambert"))
        .attr("coordinates", json!("longitude latitude")),
        FixtureArray::i16(
            "precipitation_amount_acc",
            &["time", "y", "x"],
            &[1, h, w],
            precipitation,
        )
        .attr("units", json!("kg/m^2"))
        .attr("standard_name", json!("precipitation_amount"))
        .attr("scale_factor", json!(0.01))
        .attr("add_offset", json!(0.0))
        .attr("_FillValue", json!(-32767))
        .attr("grid_mapping", json!("projection_lambert")),
    ];

    write_zarr_group(&path, globals, &arrays)?;
    Ok(path)
}

/// Raw x/y scan angle counts of the GOES fixture and their scale factor.
const GOES_SCAN_SCALE: f64 = 5.6e-5;
const GOES_X_COUNTS: [i16; GOES_WIDTH] = [-1000, -500, 0, 500, 1000];
const GOES_Y_COUNTS: [i16; GOES_HEIGHT] = [900, 300, -300, -900];

/// GOES-16 ABI L2 CMI style store on the geostationary fixed grid.
pub fn goes_store(dir: &Path) -> FixtureResult<PathBuf> {
    let path = dir.join("OR_ABI-L2-CMIPF-M6C13_G16.zarr");
    let (w, h) = (GOES_WIDTH, GOES_HEIGHT);
    let cmi: Vec<f32> = (0..w * h).map(|i| 220.0 + i as f32).collect();

    let globals = attributes(&[
        ("platform_ID", json!("G16")),
        ("instrument_type", json!("GOES R Series Advanced Baseline Imager")),
        ("title", json!("ABI L2 Cloud and Moisture Imagery")),
        ("time_coverage_start", json!("2024-01-15T18:00:21.1Z")),
        ("time_coverage_end", json!("2024-01-15T18:09:52.4Z")),
    ]);

    let arrays = vec![
        FixtureArray::i16("x", &["x"], &[w], GOES_X_COUNTS.to_vec())
            .attr("scale_factor", json!(GOES_SCAN_SCALE))
            .attr("add_offset", json!(0.0))
            .attr("units", json!("rad"))
            .attr("standard_name", json!("projection_x_coordinate")),
        FixtureArray::i16("y", &["y"], &[h], GOES_Y_COUNTS.to_vec())
            .attr("scale_factor", json!(GOES_SCAN_SCALE))
            .attr("add_offset", json!(0.0))
            .attr("units", json!("rad"))
            .attr("standard_name", json!("projection_y_coordinate")),
        FixtureArray::f64("goes_imager_projection", &["dummy"], &[1], vec![0.0])
            .attr("grid_mapping_name", json!("geostationary"))
            .attr("perspective_point_height", json!(35_786_023.0))
            .attr("semi_major_axis", json!(6_378_137.0))
            .attr("semi_minor_axis", json!(6_356_752.31414))
            .attr("longitude_of_projection_origin", json!(-75.0))
            .attr("sweep_angle_axis", json!("x")),
        FixtureArray::f32("CMI", &["y", "x"], &[h, w], cmi)
            .attr("units", json!("K"))
            .attr("standard_name", json!("toa_brightness_temperature"))
            .attr("grid_mapping", json!("goes_imager_projection")),
    ];

    write_zarr_group(&path, globals, &arrays)?;
    Ok(path)
}

/// Scan angles (radians) of the GOES fixture columns and rows.
pub fn goes_scan_angles() -> (Vec<f64>, Vec<f64>) {
    let scale = |c: &i16| f64::from(*c) * GOES_SCAN_SCALE;
    (
        GOES_X_COUNTS.iter().map(scale).collect(),
        GOES_Y_COUNTS.iter().map(scale).collect(),
    )
}

/// Plain CF store on a regular lat/lon grid with no `source` tag.
///
/// `sst` has two time steps, so it yields two bands.
pub fn cf_latlon_store(dir: &Path) -> FixtureResult<PathBuf> {
    let path = dir.join("sst_cf.zarr");
    let lon = axis(0.5, 1.0, 4);
    let lat = axis(60.5, -1.0, 3);
    let sst: Vec<f32> = (0..24).map(|i| 270.0 + i as f32 * 0.5).collect();

    let globals = attributes(&[
        ("title", json!("Sea surface temperature")),
        ("Conventions", json!("CF-1.8")),
        ("time_coverage_start", json!("2024-03-01T00:00:00Z")),
    ]);

    let arrays = vec![
        FixtureArray::f64("time", &["time"], &[2], vec![0.0, 86400.0])
            .attr("units", json!("seconds since 2024-03-01 00:00:00")),
        FixtureArray::f64("lat", &["lat"], &[3], lat).attr("units", json!("degrees_north")),
        FixtureArray::f64("lon", &["lon"], &[4], lon).attr("units", json!("degrees_east")),
        FixtureArray::f32("sst", &["time", "lat", "lon"], &[2, 3, 4], sst)
            .attr("units", json!("K"))
            .attr("standard_name", json!("sea_surface_temperature")),
    ];

    write_zarr_group(&path, globals, &arrays)?;
    Ok(path)
}

/// In-memory AROME file: the same attributes as [`arome_store`] without
/// touching disk.
pub fn arome_memory_file(path: &str) -> FixtureResult<MemoryFile> {
    let (w, h) = (AROME_WIDTH, AROME_HEIGHT);
    let (x, y, lon, lat) = arome_coordinates()?;
    let raw = RawMetadataBuilder::new(path, DriverKind::Memory)
        .global("source", "AROME MetCoOp")
        .global("min_time", "2024-01-15 00:00:00Z")
        .global("max_time", "2024-01-17 18:00:00Z")
        .variable("x", &["x"], &[w])
        .variable("y", &["y"], &[h])
        .variable("longitude", &["y", "x"], &[h, w])
        .attr("longitude", "standard_name", "longitude")
        .variable("latitude", &["y", "x"], &[h, w])
        .attr("latitude", "standard_name", "latitude")
        .variable("air_temperature_2m", &["time", "height2", "y", "x"], &[1, 1, h, w])
        .attr("air_temperature_2m", "units", "K")
        .attr("air_temperature_2m", "grid_mapping", "projection_lambert")
        .build();

    Ok(MemoryFile::new(raw)
        .with_variable("x", x)
        .with_variable("y", y)
        .with_variable("longitude", lon)
        .with_variable("latitude", lat)
        .with_variable("air_temperature_2m", create_temperature_grid(w, h)))
}

/// In-memory plain raster: one band on a geographic transform, no globals.
pub fn plain_raster_memory_file(path: &str, width: usize, height: usize) -> MemoryFile {
    let bbox = BoundingBox::new(10.0, 50.0, 10.0 + width as f64, 50.0 + height as f64);
    let raw = RawMetadataBuilder::new(path, DriverKind::Memory)
        .raster_size(width, height)
        .geo_transform(raster_common::GeoTransform::from_bbox(&bbox, width, height))
        .band(&[("units", "K")])
        .build();
    MemoryFile::new(raw).with_band(1, crate::generators::create_test_grid(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_io::{FileBackend, RasterBackend};

    #[test]
    fn test_arome_store_probes() {
        let dir = tempfile::tempdir().unwrap();
        let path = arome_store(dir.path()).unwrap();
        let raw = FileBackend::new().open(&path).unwrap();
        assert_eq!(raw.driver, DriverKind::Zarr);
        assert_eq!(raw.global("source"), Some("AROME MetCoOp"));
        let temp = raw.sub_dataset("air_temperature_2m").unwrap();
        assert_eq!(temp.shape, vec![1, 1, AROME_HEIGHT, AROME_WIDTH]);
        assert_eq!(temp.dimensions[2], "y");
    }

    #[test]
    fn test_packed_values_unpack_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = arome_store(dir.path()).unwrap();
        let values = FileBackend::new()
            .read_variable(&path, "precipitation_amount_acc")
            .unwrap();
        assert!(values[0].is_nan());
        assert!((values[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_value_count_must_match_shape() {
        let dir = tempfile::tempdir().unwrap();
        let bad = FixtureArray::f64("v", &["y", "x"], &[2, 2], vec![1.0]);
        assert!(write_zarr_group(&dir.path().join("bad.zarr"), Map::new(), &[bad]).is_err());
    }

    #[test]
    fn test_arome_memory_file_matches_grid() {
        let file = arome_memory_file("/mem/arome.nc").unwrap();
        assert_eq!(file.variables["longitude"].len(), AROME_WIDTH * AROME_HEIGHT);
        let (lon, lat) = (&file.variables["longitude"], &file.variables["latitude"]);
        // Second row, between the two middle columns: the projection origin.
        let (lo, la) = ((lon[5] + lon[6]) / 2.0, (lat[5] + lat[6]) / 2.0);
        assert!((lo - 15.0).abs() < 0.01, "lon {}", lo);
        assert!((la - 63.3).abs() < 0.01, "lat {}", la);
    }
}
