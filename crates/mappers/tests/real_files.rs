//! Dispatch over real sample files.
//!
//! Skipped unless the files are found under `MAPPER_TEST_DATA_DIR` or
//! `TEST_DATA_DIR`. NetCDF samples also need the `netcdf` feature.

use mappers::{Dispatcher, MapperConfig};
use test_utils::require_test_file;

fn dispatcher() -> Dispatcher {
    Dispatcher::from_config(&MapperConfig::default()).unwrap()
}

#[test]
fn test_real_gfs_file() {
    let path = require_test_file!("gfs_sample.grib2");
    let d = dispatcher();
    let dataset = d.open(&path).unwrap();

    assert_eq!(dataset.mapper, "ncep_gfs");
    assert!(dataset.get_metadata("time_coverage_start").is_some());
    let first = &dataset.bands[0].name;
    let values = d.read_band(&dataset, first).unwrap();
    assert_eq!(values.len(), dataset.width * dataset.height);
}

#[cfg(feature = "netcdf")]
#[test]
fn test_real_arome_file() {
    let path = require_test_file!("arome_metcoop_sample.nc");
    let d = dispatcher();
    let dataset = d.open(&path).unwrap();

    assert_eq!(dataset.mapper, "arome");
    assert!(!dataset.get_metadata("instrument").unwrap().is_empty());
    assert!(!dataset.get_metadata("platform").unwrap().is_empty());
    assert_eq!(dataset, d.open_with(&path, "arome").unwrap());
}

#[cfg(feature = "netcdf")]
#[test]
fn test_real_goes_file_round_trip() {
    let path = require_test_file!("goes16_abi_cmi_sample.nc");
    let d = dispatcher();
    let dataset = d.open(&path).unwrap();
    assert_eq!(dataset.mapper, "goes_abi");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("goes.zarr");
    d.export(&dataset, &out).unwrap();
    let reopened = d.open(&out).unwrap();

    let (lon, lat) = dataset.geolocation_grids().unwrap();
    let (lon2, lat2) = reopened.geolocation_grids().unwrap();
    test_utils::assert_allclose!(lon2, lon, 1e-9);
    test_utils::assert_allclose!(lat2, lat, 1e-9);
}
