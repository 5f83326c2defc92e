//! AROME / MEPS regional model output (MET Norway, MetCoOp).
//!
//! Recognised by a `source` global attribute mentioning AROME or MEPS. The
//! files are CF-compliant, so bands and geolocation come from the CF layout.
//! Time coverage is taken from the `min_time` / `max_time` attributes.

use std::sync::Arc;

use raster_common::time;
use tracing::debug;

use crate::cf;
use crate::config::MapperConfig;
use crate::error::{MapperError, RegistrationError};
use crate::mapper::{BuildOutcome, BuildResult, Mapper, MapperContext, MapperKind};
use crate::vocabulary::inject_instrument_platform;

pub const NAME: &str = "arome";

const SOURCE_TAGS: &[&str] = &["arome", "meps"];

#[derive(Debug, Default, Clone, Copy)]
pub struct AromeMapper;

pub fn factory(_config: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
    Ok(Arc::new(AromeMapper))
}

fn time_attribute(ctx: &MapperContext<'_>, name: &str) -> Result<String, MapperError> {
    let value = ctx
        .raw
        .global(name)
        .ok_or_else(|| MapperError::MissingAttribute(name.to_string()))?;
    time::normalize(value).map_err(|e| MapperError::InvalidAttribute {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl Mapper for AromeMapper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Specific
    }

    fn try_build(&self, ctx: &MapperContext<'_>) -> BuildResult {
        let Some(source) = ctx.raw.global("source") else {
            return Ok(BuildOutcome::rejected("no 'source' attribute"));
        };
        let source_lower = source.to_lowercase();
        if !SOURCE_TAGS.iter().any(|tag| source_lower.contains(tag)) {
            return Ok(BuildOutcome::rejected(format!(
                "source '{}' is not AROME or MEPS",
                source
            )));
        }

        let start = time_attribute(ctx, "min_time")?;
        let end = time_attribute(ctx, "max_time")?;

        let variables = cf::select_variables(ctx.raw, ctx.sub_dataset)?;
        let mut dataset = cf::build_layout(ctx, &variables)?.into_dataset(ctx, NAME);

        dataset
            .metadata
            .insert("time_coverage_start".to_string(), start);
        dataset.metadata.insert("time_coverage_end".to_string(), end);
        inject_instrument_platform(&mut dataset.metadata, ctx.vocabulary, "computer", "models");

        debug!(
            path = %ctx.path.display(),
            bands = dataset.bands.len(),
            "Built AROME dataset"
        );
        Ok(BuildOutcome::accepted(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::{DriverKind, Geolocation};
    use raster_io::RasterBackend;
    use std::path::Path;
    use test_utils::{arome_memory_file, MemoryBackend, MemoryFile, RawMetadataBuilder};

    use crate::vocabulary::GcmdVocabulary;

    fn run(backend: &MemoryBackend, path: &str) -> BuildResult {
        let raw = backend.open(Path::new(path)).unwrap();
        let vocabulary = GcmdVocabulary::builtin();
        AromeMapper.try_build(&MapperContext {
            path: Path::new(path),
            raw: &raw,
            sub_dataset: None,
            backend,
            vocabulary: &vocabulary,
        })
    }

    #[test]
    fn test_accepts_metcoop_source() {
        let backend = MemoryBackend::new().with_file(arome_memory_file("/mem/arome.nc").unwrap());
        let BuildOutcome::Accepted(dataset) = run(&backend, "/mem/arome.nc").unwrap() else {
            panic!("AROME file rejected");
        };
        assert_eq!(dataset.mapper, "arome");
        assert_eq!(dataset.band_names(), vec!["air_temperature_2m"]);
        assert_eq!(
            dataset.get_metadata("time_coverage_start"),
            Some("2024-01-15T00:00:00")
        );
        assert_eq!(
            dataset.get_metadata("time_coverage_end"),
            Some("2024-01-17T18:00:00")
        );
        assert!(!dataset.get_metadata("instrument").unwrap().is_empty());
        assert!(!dataset.get_metadata("platform").unwrap().is_empty());
        assert!(matches!(dataset.geolocation, Geolocation::Grids { .. }));
    }

    #[test]
    fn test_rejects_before_reading() {
        let raw = RawMetadataBuilder::new("/mem/other.nc", DriverKind::Memory)
            .global("source", "ECMWF IFS")
            .variable("t2m", &["y", "x"], &[2, 2])
            .build();
        let backend = MemoryBackend::new().with_file(MemoryFile::new(raw));
        let outcome = run(&backend, "/mem/other.nc").unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(backend.read_count(), 0);
    }

    #[test]
    fn test_meps_tag_is_case_insensitive() {
        let mut file = arome_memory_file("/mem/meps.nc").unwrap();
        file.raw
            .metadata
            .insert("NC_GLOBAL#source".into(), "MEPS ensemble".into());
        let backend = MemoryBackend::new().with_file(file);
        assert!(run(&backend, "/mem/meps.nc").unwrap().is_accepted());
    }

    #[test]
    fn test_bad_min_time_is_fatal() {
        let mut file = arome_memory_file("/mem/arome.nc").unwrap();
        file.raw
            .metadata
            .insert("NC_GLOBAL#min_time".into(), "soon".into());
        let backend = MemoryBackend::new().with_file(file);
        assert!(matches!(
            run(&backend, "/mem/arome.nc"),
            Err(MapperError::InvalidAttribute { name, .. }) if name == "min_time"
        ));
    }
}
