//! Zarr probing, band reads and export through the file backend.

use raster_common::{
    Band, BandDataType, BandSource, BoundingBox, DriverKind, Geolocation, MetadataMap,
    NormalizedDataset,
};
use raster_io::{export_zarr, FileBackend, IoError, RasterBackend};
use test_utils::{
    arome_store, assert_allclose, assert_approx_eq, cf_latlon_store, create_test_grid,
    write_zarr_with_data, AROME_HEIGHT, AROME_WIDTH,
};

#[test]
fn test_probe_group_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = arome_store(dir.path()).unwrap();
    let raw = FileBackend::new().open(&path).unwrap();

    assert_eq!(raw.driver, DriverKind::Zarr);
    assert_eq!(raw.global("min_time"), Some("2024-01-15 00:00:00Z"));
    assert_eq!(
        raw.variable_attr("projection_lambert", "standard_parallel"),
        Some("[63.3,63.3]")
    );
    assert!(raw.raster.bands.is_empty());

    let names: Vec<&str> = raw.sub_datasets.iter().map(|s| s.variable.as_str()).collect();
    for expected in ["x", "y", "longitude", "latitude", "air_temperature_2m"] {
        assert!(names.contains(&expected), "missing {}", expected);
    }
    let temp = raw.sub_dataset("air_temperature_2m").unwrap();
    assert_eq!(temp.data_type, BandDataType::Float32);
    assert_eq!(temp.grid_shape(), Some((AROME_HEIGHT, AROME_WIDTH)));
    assert!(temp.name.starts_with("Zarr:\""));
    assert!(temp.name.ends_with(":air_temperature_2m"));
}

#[test]
fn test_read_band_slices_leading_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = cf_latlon_store(dir.path()).unwrap();
    let backend = FileBackend::new();

    let second = backend
        .read_band(&BandSource {
            path: path.clone(),
            variable: Some("sst".into()),
            index: 2,
        })
        .unwrap();
    assert_eq!(second.len(), 12);
    assert_approx_eq!(second[0], 276.0, 1e-6);

    let out_of_range = backend.read_band(&BandSource {
        path: path.clone(),
        variable: Some("sst".into()),
        index: 3,
    });
    assert!(matches!(
        out_of_range,
        Err(IoError::BandOutOfRange { index: 3, count: 2 })
    ));

    assert!(matches!(
        backend.read_variable(&path, "nope"),
        Err(IoError::VariableNotFound { .. })
    ));
}

#[test]
fn test_single_array_store_is_one_band_raster() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.zarr");
    let data: Vec<f32> = create_test_grid(6, 4).into_iter().map(|v| v as f32).collect();
    let bbox = BoundingBox::new(-10.0, 40.0, 2.0, 48.0);
    write_zarr_with_data(&path, &data, 6, 4, &bbox).unwrap();

    let backend = FileBackend::new();
    let raw = backend.open(&path).unwrap();
    assert_eq!((raw.raster.width, raw.raster.height), (6, 4));
    assert_eq!(raw.raster.bands.len(), 1);
    assert_eq!(raw.raster.bands[0].metadata["parameter"], "TMP");
    let gt = raw.raster.geo_transform.unwrap();
    assert_approx_eq!(gt.pixel_width, 2.0, 1e-12);
    assert_approx_eq!(gt.pixel_height, -2.0, 1e-12);

    let values = backend
        .read_band(&BandSource {
            path,
            variable: None,
            index: 1,
        })
        .unwrap();
    assert_allclose!(values, create_test_grid(6, 4), 1e-9);
}

fn dataset_from_cf_store(path: &std::path::Path) -> NormalizedDataset {
    let mut metadata = MetadataMap::new();
    metadata.insert("title".into(), "Sea surface temperature".into());
    let band = |index: usize| Band {
        name: format!("sst_{}", index),
        data_type: BandDataType::Float32,
        metadata: [("units".to_string(), "K".to_string())].into(),
        source: BandSource {
            path: path.to_path_buf(),
            variable: Some("sst".into()),
            index,
        },
    };
    NormalizedDataset {
        path: path.to_path_buf(),
        mapper: "netcdf_cf".into(),
        width: 4,
        height: 3,
        bands: vec![band(1), band(2)],
        geolocation: Geolocation::from_axes(&[0.5, 1.5, 2.5, 3.5], &[60.5, 59.5, 58.5]),
        metadata,
    }
}

#[test]
fn test_export_writes_bands_and_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let source = cf_latlon_store(dir.path()).unwrap();
    let dataset = dataset_from_cf_store(&source);
    let out = dir.path().join("export.zarr");
    let backend = FileBackend::new();

    let summary = export_zarr(&dataset, &backend, &out).unwrap();
    assert_eq!(summary.bands, vec!["sst_1", "sst_2"]);
    assert!(summary.geolocation);

    let raw = backend.open(&out).unwrap();
    assert_eq!(raw.global("title"), Some("Sea surface temperature"));
    assert_eq!(raw.variable_attr("sst_2", "coordinates"), Some("longitude latitude"));
    let (lon, lat) = dataset.geolocation_grids().unwrap();
    assert_allclose!(backend.read_variable(&out, "longitude").unwrap(), lon, 1e-12);
    assert_allclose!(backend.read_variable(&out, "latitude").unwrap(), lat, 1e-12);

    let original = backend.read_band(&dataset.bands[1].source).unwrap();
    let exported = backend.read_variable(&out, "sst_2").unwrap();
    assert_allclose!(exported, original, 1e-9);
}

#[test]
fn test_export_refuses_non_empty_target() {
    let dir = tempfile::tempdir().unwrap();
    let source = cf_latlon_store(dir.path()).unwrap();
    let dataset = dataset_from_cf_store(&source);
    let result = export_zarr(&dataset, &FileBackend::new(), dir.path());
    assert!(matches!(result, Err(IoError::Export(_))));
}
