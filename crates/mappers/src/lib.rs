//! Mapper selection for gridded geophysical files.
//!
//! A file of unknown origin goes through three steps:
//!
//! 1. [`probe`] asks the raster backend for the file's raw metadata.
//! 2. The [`Dispatcher`] walks the [`MapperRegistry`] in order, specific
//!    mappers first and fallback mappers last, calling [`Mapper::try_build`].
//! 3. The first mapper that accepts returns a [`NormalizedDataset`].
//!
//! A mapper that does not recognise a file rejects it and the next one is
//! tried. A mapper that recognises the file but finds it malformed fails
//! the whole dispatch instead.
//!
//! ```no_run
//! use mappers::{Dispatcher, MapperConfig};
//!
//! let dispatcher = Dispatcher::from_config(&MapperConfig::from_env())?;
//! let dataset = dispatcher.open("arome_metcoop.nc")?;
//! println!("{} accepted {} bands", dataset.mapper, dataset.bands.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cf;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mapper;
pub mod plugins;
pub mod probe;
pub mod registry;
pub mod vocabulary;

pub use config::MapperConfig;
pub use dispatch::{DispatchState, Dispatcher, OpenOptions};
pub use error::{ConfigError, DispatchError, MapperError, ProbeError, RegistrationError};
pub use mapper::{BuildOutcome, BuildResult, Mapper, MapperContext, MapperKind, Rejection};
pub use probe::probe;
pub use registry::{builtin_registrations, MapperDescriptor, MapperRegistry, Registration};
pub use vocabulary::{GcmdVocabulary, Instrument, Platform, Vocabulary};

pub use raster_common::NormalizedDataset;
