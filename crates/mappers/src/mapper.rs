//! The contract every mapper plugin implements.

use std::fmt;
use std::path::Path;

use raster_common::{NormalizedDataset, RawMetadata};
use raster_io::RasterBackend;
use serde::Serialize;

use crate::error::MapperError;
use crate::vocabulary::Vocabulary;

/// Where a mapper sorts in automatic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapperKind {
    /// Recognises one file family by a tag in its metadata.
    Specific,
    /// Accepts anything shaped like a raster; always tried last.
    Fallback,
}

impl fmt::Display for MapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperKind::Specific => f.write_str("specific"),
            MapperKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// Why a mapper declined a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Result of one construction attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Accepted(Box<NormalizedDataset>),
    Rejected(Rejection),
}

impl BuildOutcome {
    pub fn accepted(dataset: NormalizedDataset) -> Self {
        BuildOutcome::Accepted(Box::new(dataset))
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        BuildOutcome::Rejected(Rejection::new(reason))
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, BuildOutcome::Accepted(_))
    }
}

/// `Ok(Rejected)` means "not mine"; `Err` means "mine, but broken".
pub type BuildResult = Result<BuildOutcome, MapperError>;

/// Everything a mapper may look at while deciding.
pub struct MapperContext<'a> {
    pub path: &'a Path,
    pub raw: &'a RawMetadata,
    /// Restrict container files to one sub-dataset (0-based)
    pub sub_dataset: Option<usize>,
    pub backend: &'a dyn RasterBackend,
    pub vocabulary: &'a dyn Vocabulary,
}

/// A decoder specialised to one family of files.
///
/// Implementations must check cheap metadata first and reject before reading
/// any pixel data; dispatch may call many mappers for one file. A mapper
/// either returns a complete dataset or nothing at all.
pub trait Mapper: Send + Sync {
    /// Registry name, also stored in [`NormalizedDataset::mapper`].
    fn name(&self) -> &'static str;

    fn kind(&self) -> MapperKind;

    fn try_build(&self, ctx: &MapperContext<'_>) -> BuildResult;
}
