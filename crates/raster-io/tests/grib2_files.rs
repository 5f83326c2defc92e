//! GRIB2 probing and decoding through the file backend.

use std::io::Write;
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use raster_common::{BandSource, DriverKind};
use raster_io::{detect_format, FileBackend, FileFormat, RasterBackend};
use test_utils::{assert_approx_eq, grib2_file, Grib2Builder};

fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn source(path: &PathBuf, index: usize) -> BandSource {
    BandSource {
        path: path.clone(),
        variable: None,
        index,
    }
}

#[test]
fn test_probe_gfs_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "gfs.grib2", &Grib2Builder::new_gfs().build());

    let raw = FileBackend::new().open(&path).unwrap();
    assert_eq!(raw.driver, DriverKind::Grib);
    assert_eq!(raw.raster.width, 10);
    assert_eq!(raw.raster.height, 10);
    assert_eq!(raw.metadata["GRIB_CENTER"], "7");
    assert_eq!(raw.metadata["GRIB_CENTER_NAME"], "US-NCEP");
    assert_eq!(raw.metadata["GRIB_REF_TIME"], "2025-12-10T12:00:00");

    assert_eq!(raw.raster.bands.len(), 1);
    let band = &raw.raster.bands[0].metadata;
    assert_eq!(band["GRIB_ELEMENT"], "TMP");
    assert_eq!(band["GRIB_UNIT"], "K");
    assert_eq!(band["GRIB_LEVEL"], "2 m above ground");
    assert_eq!(band["GRIB_VALID_TIME"], "2025-12-10T12:00:00");

    let gt = raw.raster.geo_transform.unwrap();
    assert_approx_eq!(gt.origin_x, -130.5, 1e-9);
    assert_approx_eq!(gt.origin_y, 45.5, 1e-9);
    assert_approx_eq!(gt.pixel_width, 1.0, 1e-9);
    assert_approx_eq!(gt.pixel_height, -1.0, 1e-9);
}

#[test]
fn test_read_constant_and_gradient_messages() {
    let dir = tempfile::tempdir().unwrap();
    let messages = [
        Grib2Builder::new_gfs(),
        Grib2Builder::new_gfs()
            .with_parameter(2, 2)
            .with_level(103, 10)
            .with_forecast_hour(6)
            .with_gradient(-20.0, 20.0),
    ];
    let path = write_file(&dir, "multi.grib2", &grib2_file(&messages));
    let backend = FileBackend::new();

    let raw = backend.open(&path).unwrap();
    assert_eq!(raw.raster.bands.len(), 2);
    let wind = &raw.raster.bands[1].metadata;
    assert_eq!(wind["GRIB_ELEMENT"], "UGRD");
    assert_eq!(wind["GRIB_FORECAST_SECONDS"], "21600");
    assert_eq!(wind["GRIB_VALID_TIME"], "2025-12-10T18:00:00");

    let temperature = backend.read_band(&source(&path, 1)).unwrap();
    assert_eq!(temperature.len(), 100);
    assert!(temperature.iter().all(|v| (v - 288.15).abs() < 1e-3));

    let gradient = backend.read_band(&source(&path, 2)).unwrap();
    assert_approx_eq!(gradient[0], -20.0, 0.01);
    assert_approx_eq!(gradient[50], 0.0, 0.01);
    assert!(gradient.windows(2).all(|w| w[1] >= w[0]));

    assert!(backend.read_band(&source(&path, 3)).is_err());
}

#[test]
fn test_gzipped_grib2_is_transparent() {
    let dir = tempfile::tempdir().unwrap();
    let message = Grib2Builder::new_gfs().with_decimal_scale(2).build();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&message).unwrap();
    let path = write_file(&dir, "gfs.grib2.gz", &encoder.finish().unwrap());

    assert_eq!(detect_format(&path).unwrap(), FileFormat::Grib2Gzip);
    let backend = FileBackend::new();
    let raw = backend.open(&path).unwrap();
    assert_eq!(raw.raster.bands.len(), 1);
    let values = backend.read_band(&source(&path, 1)).unwrap();
    assert_approx_eq!(values[42], 288.15, 1e-3);
}

#[test]
fn test_truncated_grib2_fails() {
    let dir = tempfile::tempdir().unwrap();
    let message = Grib2Builder::new_gfs().build();
    let path = write_file(&dir, "short.grib2", &message[..message.len() / 2]);
    assert!(FileBackend::new().open(&path).is_err());
}

#[test]
fn test_grib2_has_no_variables() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "gfs.grib2", &Grib2Builder::new_gfs().build());
    assert!(FileBackend::new().read_variable(&path, "lat").is_err());
}
