//! Dispatch: probe a file once, then try mappers until one accepts it.
//!
//! Per call the dispatcher moves through
//! `Init -> Probed -> Trying(i) -> {Accepted(i) | Trying(i + 1) | Exhausted}`.
//! A failed probe ends the call before any mapper runs. A mapper error
//! (as opposed to a rejection) ends it immediately as well.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use raster_common::{NormalizedDataset, RawMetadata};
use raster_io::{export_zarr, ExportSummary, FileBackend, RasterBackend};
use tracing::{debug, info, trace};

use crate::config::MapperConfig;
use crate::error::{ConfigError, DispatchError};
use crate::mapper::{BuildOutcome, MapperContext};
use crate::probe::probe;
use crate::registry::{MapperDescriptor, MapperRegistry};
use crate::vocabulary::Vocabulary;

/// Where a single dispatch call currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Init,
    Probed,
    /// Trying the registry entry at this position
    Trying(usize),
    Accepted(usize),
    Exhausted,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchState::Init => f.write_str("init"),
            DispatchState::Probed => f.write_str("probed"),
            DispatchState::Trying(i) => write!(f, "trying({})", i),
            DispatchState::Accepted(i) => write!(f, "accepted({})", i),
            DispatchState::Exhausted => f.write_str("exhausted"),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Use only this mapper instead of walking the registry
    pub mapper: Option<String>,
    /// 0-based index into the probed sub-dataset list
    pub sub_dataset: Option<usize>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapper(mut self, name: impl Into<String>) -> Self {
        self.mapper = Some(name.into());
        self
    }

    pub fn sub_dataset(mut self, index: usize) -> Self {
        self.sub_dataset = Some(index);
        self
    }
}

/// Owns the registry, the vocabulary and the raster backend.
///
/// Everything it holds is read-only after construction, so one dispatcher
/// can be shared across threads behind an `Arc`.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MapperRegistry>,
    vocabulary: Arc<dyn Vocabulary>,
    backend: Arc<dyn RasterBackend>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mappers", &self.registry.names())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        registry: MapperRegistry,
        vocabulary: Arc<dyn Vocabulary>,
        backend: Arc<dyn RasterBackend>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            vocabulary,
            backend,
        }
    }

    /// Built-in mappers over the file backend, with the configured
    /// vocabulary.
    pub fn from_config(config: &MapperConfig) -> Result<Self, ConfigError> {
        let vocabulary = config.vocabulary()?;
        let registry = MapperRegistry::discover(config);
        info!(mappers = ?registry.names(), "Dispatcher initialized");
        Ok(Self::new(
            registry,
            Arc::new(vocabulary),
            Arc::new(FileBackend::new()),
        ))
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &dyn RasterBackend {
        self.backend.as_ref()
    }

    /// Raw metadata of `path` without running any mapper.
    pub fn probe(&self, path: impl AsRef<Path>) -> Result<RawMetadata, DispatchError> {
        Ok(probe(self.backend.as_ref(), path.as_ref())?)
    }

    /// Automatic dispatch: the first mapper in registry order that accepts
    /// the file wins.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<NormalizedDataset, DispatchError> {
        self.open_with_options(path, &OpenOptions::default())
    }

    /// Named dispatch: only `mapper` is tried, and a rejection is an error.
    ///
    /// An unknown name fails before the file is touched.
    pub fn open_with(
        &self,
        path: impl AsRef<Path>,
        mapper: &str,
    ) -> Result<NormalizedDataset, DispatchError> {
        self.open_with_options(path, &OpenOptions::new().mapper(mapper))
    }

    pub fn open_with_options(
        &self,
        path: impl AsRef<Path>,
        options: &OpenOptions,
    ) -> Result<NormalizedDataset, DispatchError> {
        let path = path.as_ref();
        match &options.mapper {
            Some(name) => {
                let descriptor = self.registry.get_by_name(name)?;
                let raw = self.probe_logged(path)?;
                self.open_named(path, &raw, descriptor, options.sub_dataset)
            }
            None => {
                let raw = self.probe_logged(path)?;
                self.open_auto(path, &raw, options.sub_dataset)
            }
        }
    }

    /// Write `dataset` to a Zarr store at `out`.
    pub fn export(
        &self,
        dataset: &NormalizedDataset,
        out: impl AsRef<Path>,
    ) -> Result<ExportSummary, DispatchError> {
        Ok(export_zarr(dataset, self.backend.as_ref(), out.as_ref())?)
    }

    /// Values of one band, row-major.
    pub fn read_band(
        &self,
        dataset: &NormalizedDataset,
        name: &str,
    ) -> Result<Vec<f64>, DispatchError> {
        let band = dataset.band(name)?;
        Ok(self.backend.read_band(&band.source)?)
    }

    fn probe_logged(&self, path: &Path) -> Result<RawMetadata, DispatchError> {
        transition(path, DispatchState::Init);
        let raw = probe(self.backend.as_ref(), path)?;
        transition(path, DispatchState::Probed);
        Ok(raw)
    }

    fn context<'a>(
        &'a self,
        path: &'a Path,
        raw: &'a RawMetadata,
        sub_dataset: Option<usize>,
    ) -> MapperContext<'a> {
        MapperContext {
            path,
            raw,
            sub_dataset,
            backend: self.backend.as_ref(),
            vocabulary: self.vocabulary.as_ref(),
        }
    }

    fn open_auto(
        &self,
        path: &Path,
        raw: &RawMetadata,
        sub_dataset: Option<usize>,
    ) -> Result<NormalizedDataset, DispatchError> {
        let ctx = self.context(path, raw, sub_dataset);
        let mut attempted = Vec::with_capacity(self.registry.len());

        for (i, descriptor) in self.registry.iter().enumerate() {
            transition(path, DispatchState::Trying(i));
            attempted.push(descriptor.name.to_string());

            match descriptor.mapper.try_build(&ctx) {
                Ok(BuildOutcome::Accepted(dataset)) => {
                    transition(path, DispatchState::Accepted(i));
                    info!(
                        path = %path.display(),
                        mapper = descriptor.name,
                        bands = dataset.bands.len(),
                        "Mapper accepted file"
                    );
                    return Ok(*dataset);
                }
                Ok(BuildOutcome::Rejected(rejection)) => {
                    debug!(
                        path = %path.display(),
                        mapper = descriptor.name,
                        reason = %rejection,
                        "Mapper rejected file"
                    );
                }
                Err(source) => {
                    return Err(DispatchError::Construction {
                        mapper: descriptor.name.to_string(),
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }

        transition(path, DispatchState::Exhausted);
        Err(DispatchError::NoMapperFound {
            path: path.to_path_buf(),
            attempted,
        })
    }

    fn open_named(
        &self,
        path: &Path,
        raw: &RawMetadata,
        descriptor: &MapperDescriptor,
        sub_dataset: Option<usize>,
    ) -> Result<NormalizedDataset, DispatchError> {
        let ctx = self.context(path, raw, sub_dataset);
        transition(path, DispatchState::Trying(0));

        match descriptor.mapper.try_build(&ctx) {
            Ok(BuildOutcome::Accepted(dataset)) => {
                transition(path, DispatchState::Accepted(0));
                info!(
                    path = %path.display(),
                    mapper = descriptor.name,
                    "Requested mapper accepted file"
                );
                Ok(*dataset)
            }
            Ok(BuildOutcome::Rejected(reason)) => Err(DispatchError::MapperRejected {
                mapper: descriptor.name.to_string(),
                path: path.to_path_buf(),
                reason,
            }),
            Err(source) => Err(DispatchError::Construction {
                mapper: descriptor.name.to_string(),
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

fn transition(path: &Path, state: DispatchState) {
    trace!(path = %path.display(), %state, "Dispatch state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::GcmdVocabulary;
    use test_utils::{plain_raster_memory_file, MemoryBackend};

    fn dispatcher(backend: MemoryBackend) -> Dispatcher {
        Dispatcher::new(
            MapperRegistry::discover(&MapperConfig::default()),
            Arc::new(GcmdVocabulary::builtin()),
            Arc::new(backend),
        )
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DispatchState::Trying(2).to_string(), "trying(2)");
        assert_eq!(DispatchState::Exhausted.to_string(), "exhausted");
    }

    #[test]
    fn test_open_options_builder() {
        let options = OpenOptions::new().mapper("arome").sub_dataset(1);
        assert_eq!(options.mapper.as_deref(), Some("arome"));
        assert_eq!(options.sub_dataset, Some(1));
    }

    #[test]
    fn test_missing_file_is_probe_error() {
        let d = dispatcher(MemoryBackend::new());
        assert!(matches!(
            d.open("/mem/missing.nc"),
            Err(DispatchError::Probe(_))
        ));
    }

    #[test]
    fn test_read_band_through_dispatcher() {
        let d = dispatcher(
            MemoryBackend::new().with_file(plain_raster_memory_file("/mem/plain.tif", 3, 2)),
        );
        let dataset = d.open("/mem/plain.tif").unwrap();
        assert_eq!(dataset.mapper, "generic");
        assert_eq!(d.read_band(&dataset, "band_1").unwrap().len(), 6);
        assert!(matches!(
            d.read_band(&dataset, "band_9"),
            Err(DispatchError::Raster(_))
        ));
    }
}
