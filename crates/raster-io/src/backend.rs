//! The raster backend seam and the file-based implementation.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use raster_common::{BandSource, MetadataMap, RawMetadata};
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::{grib2, zarr};

/// Reads raw metadata and pixel values from raster files.
///
/// Mappers only ever talk to files through this trait, so tests can swap in
/// an in-memory implementation.
pub trait RasterBackend: Send + Sync {
    /// Probe a file and return everything the driver can tell about it.
    fn open(&self, path: &Path) -> IoResult<RawMetadata>;

    /// Read one 2-D band as row-major `f64` values.
    fn read_band(&self, source: &BandSource) -> IoResult<Vec<f64>>;

    /// Read a whole variable (coordinate axes, lon/lat grids) flattened.
    fn read_variable(&self, path: &Path, variable: &str) -> IoResult<Vec<f64>>;
}

/// On-disk formats the file backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Grib2,
    Grib2Gzip,
    NetCdf,
    Zarr,
}

const NETCDF_CLASSIC: &[u8] = b"CDF\x01";
const NETCDF_64BIT: &[u8] = b"CDF\x02";
const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Some GRIB feeds prepend a WMO bulletin header before the first message.
const GRIB_SEARCH_WINDOW: usize = 1024;

/// Identify the format of `path` from its magic bytes.
pub fn detect_format(path: &Path) -> IoResult<FileFormat> {
    if path.is_dir() {
        if path.join("zarr.json").is_file() {
            return Ok(FileFormat::Zarr);
        }
        return Err(IoError::UnknownFormat(path.to_path_buf()));
    }

    let mut head = Vec::with_capacity(GRIB_SEARCH_WINDOW);
    File::open(path)?
        .take(GRIB_SEARCH_WINDOW as u64)
        .read_to_end(&mut head)?;

    let format = if head.starts_with(b"GRIB") {
        FileFormat::Grib2
    } else if head.starts_with(GZIP_MAGIC) {
        FileFormat::Grib2Gzip
    } else if head.starts_with(NETCDF_CLASSIC)
        || head.starts_with(NETCDF_64BIT)
        || head.starts_with(HDF5_SIGNATURE)
    {
        FileFormat::NetCdf
    } else if head.windows(4).any(|w| w == b"GRIB") {
        FileFormat::Grib2
    } else {
        return Err(IoError::UnknownFormat(path.to_path_buf()));
    };

    debug!(path = %path.display(), ?format, "Detected file format");
    Ok(format)
}

/// Backend reading real files from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileBackend;

impl FileBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RasterBackend for FileBackend {
    fn open(&self, path: &Path) -> IoResult<RawMetadata> {
        match detect_format(path)? {
            FileFormat::Grib2 => grib2::probe(path, &grib2::load(path, false)?),
            FileFormat::Grib2Gzip => grib2::probe(path, &grib2::load(path, true)?),
            FileFormat::Zarr => zarr::probe(path),
            FileFormat::NetCdf => open_netcdf(path),
        }
    }

    fn read_band(&self, source: &BandSource) -> IoResult<Vec<f64>> {
        match detect_format(&source.path)? {
            FileFormat::Grib2 => {
                grib2::read_message(&grib2::load(&source.path, false)?, source.index)
            }
            FileFormat::Grib2Gzip => {
                grib2::read_message(&grib2::load(&source.path, true)?, source.index)
            }
            FileFormat::Zarr => zarr::read_band(source),
            FileFormat::NetCdf => read_netcdf_band(source),
        }
    }

    fn read_variable(&self, path: &Path, variable: &str) -> IoResult<Vec<f64>> {
        match detect_format(path)? {
            FileFormat::Zarr => zarr::read_variable(path, variable),
            FileFormat::NetCdf => read_netcdf_variable(path, variable),
            FileFormat::Grib2 | FileFormat::Grib2Gzip => Err(IoError::VariableNotFound {
                path: path.to_path_buf(),
                variable: variable.to_string(),
            }),
        }
    }
}

#[cfg(feature = "netcdf")]
fn open_netcdf(path: &Path) -> IoResult<RawMetadata> {
    crate::netcdf_file::probe(path)
}

#[cfg(not(feature = "netcdf"))]
fn open_netcdf(path: &Path) -> IoResult<RawMetadata> {
    Err(IoError::NetCdfUnsupported(path.to_path_buf()))
}

#[cfg(feature = "netcdf")]
fn read_netcdf_band(source: &BandSource) -> IoResult<Vec<f64>> {
    crate::netcdf_file::read_band(source)
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf_band(source: &BandSource) -> IoResult<Vec<f64>> {
    Err(IoError::NetCdfUnsupported(source.path.clone()))
}

#[cfg(feature = "netcdf")]
fn read_netcdf_variable(path: &Path, variable: &str) -> IoResult<Vec<f64>> {
    crate::netcdf_file::read_variable(path, variable)
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf_variable(path: &Path, _variable: &str) -> IoResult<Vec<f64>> {
    Err(IoError::NetCdfUnsupported(path.to_path_buf()))
}

/// Apply CF packing attributes: `_FillValue`/`missing_value` become NaN,
/// then `value * scale_factor + add_offset`.
pub fn cf_unpack(values: &mut [f64], attrs: &MetadataMap) {
    let number = |key: &str| attrs.get(key).and_then(|v| v.trim().parse::<f64>().ok());
    let fill = number("_FillValue");
    let missing = number("missing_value");
    let scale = number("scale_factor").unwrap_or(1.0);
    let offset = number("add_offset").unwrap_or(0.0);

    for v in values.iter_mut() {
        if Some(*v) == fill || Some(*v) == missing {
            *v = f64::NAN;
        } else {
            *v = *v * scale + offset;
        }
    }
}

/// Copy the `index`-th (1-based) 2-D slice out of a flattened N-D array.
pub fn slice_band(
    values: Vec<f64>,
    shape: &[usize],
    index: usize,
) -> IoResult<Vec<f64>> {
    let (plane, count) = match shape {
        [] => (1, 1),
        [n] => (*n, 1),
        [lead @ .., h, w] => (h * w, lead.iter().product()),
    };
    if index == 0 || index > count {
        return Err(IoError::BandOutOfRange { index, count });
    }
    if count == 1 {
        return Ok(values);
    }
    let start = (index - 1) * plane;
    values
        .get(start..start + plane)
        .map(<[f64]>::to_vec)
        .ok_or(IoError::SizeMismatch {
            expected: plane * count,
            actual: values.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_detect_magic_bytes() {
        let grib = write_temp(b"GRIB\0\0\0\x02rest");
        assert_eq!(detect_format(grib.path()).unwrap(), FileFormat::Grib2);

        let gz = write_temp(&[0x1f, 0x8b, 8, 0]);
        assert_eq!(detect_format(gz.path()).unwrap(), FileFormat::Grib2Gzip);

        let nc = write_temp(b"CDF\x01\0\0\0\0");
        assert_eq!(detect_format(nc.path()).unwrap(), FileFormat::NetCdf);

        let h5 = write_temp(b"\x89HDF\r\n\x1a\n....");
        assert_eq!(detect_format(h5.path()).unwrap(), FileFormat::NetCdf);
    }

    #[test]
    fn test_detect_wmo_header_before_grib() {
        let file = write_temp(b"\x01\r\r\n123\r\r\nHTXA50 KWBC 101200\r\r\nGRIB\0\0\0\x02");
        assert_eq!(detect_format(file.path()).unwrap(), FileFormat::Grib2);
    }

    #[test]
    fn test_detect_unknown() {
        let file = write_temp(b"just some text");
        assert!(matches!(
            detect_format(file.path()),
            Err(IoError::UnknownFormat(_))
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            detect_format(dir.path()),
            Err(IoError::UnknownFormat(_))
        ));
        assert!(matches!(
            detect_format(&dir.path().join("missing.grib2")),
            Err(IoError::FileRead(_))
        ));
    }

    #[test]
    fn test_cf_unpack() {
        let mut attrs = MetadataMap::new();
        attrs.insert("_FillValue".into(), "-999".into());
        attrs.insert("scale_factor".into(), "0.5".into());
        attrs.insert("add_offset".into(), "10".into());
        let mut values = vec![0.0, 2.0, -999.0];
        cf_unpack(&mut values, &attrs);
        assert_eq!(values[0], 10.0);
        assert_eq!(values[1], 11.0);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_slice_band() {
        let values: Vec<f64> = (0..12).map(f64::from).collect();
        assert_eq!(
            slice_band(values.clone(), &[3, 2, 2], 2).unwrap(),
            vec![4.0, 5.0, 6.0, 7.0]
        );
        assert_eq!(slice_band(values.clone(), &[3, 4], 1).unwrap().len(), 12);
        assert!(matches!(
            slice_band(values, &[3, 2, 2], 4),
            Err(IoError::BandOutOfRange { index: 4, count: 3 })
        ));
    }
}
