//! Metadata probe: read-only inspection of a file before any mapper runs.

use std::path::Path;

use raster_common::RawMetadata;
use raster_io::RasterBackend;
use tracing::debug;

use crate::error::ProbeError;

/// Ask `backend` for everything it can tell about `path`.
///
/// Fails only when the file cannot be opened or parsed at all. Whether any
/// mapper understands the result is for dispatch to decide. Backends read
/// what they need and release the file before returning.
pub fn probe(backend: &dyn RasterBackend, path: &Path) -> Result<RawMetadata, ProbeError> {
    let raw = backend.open(path).map_err(|source| ProbeError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        path = %path.display(),
        driver = %raw.driver,
        keys = raw.metadata.len(),
        sub_datasets = raw.sub_datasets.len(),
        bands = raw.raster.bands.len(),
        "Probed file"
    );
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::DriverKind;
    use raster_io::FileBackend;
    use test_utils::{MemoryBackend, MemoryFile, RawMetadataBuilder};

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = probe(&FileBackend::new(), Path::new("/nonexistent/file.grib2")).unwrap_err();
        let ProbeError::Unreadable { path, .. } = err;
        assert_eq!(path, Path::new("/nonexistent/file.grib2"));
    }

    #[test]
    fn test_unknown_content_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text, no raster here").unwrap();
        assert!(probe(&FileBackend::new(), &path).is_err());
    }

    #[test]
    fn test_probe_returns_backend_metadata() {
        let raw = RawMetadataBuilder::new("/mem/empty.nc", DriverKind::Memory)
            .global("title", "nothing inside")
            .build();
        let backend = MemoryBackend::new().with_file(MemoryFile::new(raw.clone()));
        let probed = probe(&backend, Path::new("/mem/empty.nc")).unwrap();
        assert_eq!(probed, raw);
        assert!(!probed.has_content());
        assert_eq!(backend.open_count(), 1);
    }
}
