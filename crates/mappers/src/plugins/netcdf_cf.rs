//! Fallback for any CF-style container (NetCDF, Zarr) no specific mapper
//! claimed.

use std::sync::Arc;

use raster_common::DriverKind;
use tracing::debug;

use crate::cf;
use crate::config::MapperConfig;
use crate::error::RegistrationError;
use crate::mapper::{BuildOutcome, BuildResult, Mapper, MapperContext, MapperKind};

pub const NAME: &str = "netcdf_cf";

#[derive(Debug, Default, Clone, Copy)]
pub struct NetcdfCfMapper;

pub fn factory(_config: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
    Ok(Arc::new(NetcdfCfMapper))
}

impl Mapper for NetcdfCfMapper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Fallback
    }

    fn try_build(&self, ctx: &MapperContext<'_>) -> BuildResult {
        if !matches!(
            ctx.raw.driver,
            DriverKind::NetCdf | DriverKind::Zarr | DriverKind::Memory
        ) {
            return Ok(BuildOutcome::rejected(format!(
                "{} files carry no CF variables",
                ctx.raw.driver
            )));
        }
        if ctx.sub_dataset.is_none() && cf::data_variables(ctx.raw).is_empty() {
            return Ok(BuildOutcome::rejected("no gridded data variables"));
        }

        let variables = cf::select_variables(ctx.raw, ctx.sub_dataset)?;
        let dataset = cf::build_layout(ctx, &variables)?.into_dataset(ctx, NAME);

        debug!(
            path = %ctx.path.display(),
            bands = dataset.bands.len(),
            georeferenced = dataset.geolocation.is_georeferenced(),
            "Built CF dataset"
        );
        Ok(BuildOutcome::accepted(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::RawMetadata;
    use raster_io::{FileBackend, RasterBackend};
    use test_utils::{assert_approx_eq, cf_latlon_store, plain_raster_memory_file, MemoryBackend};

    use crate::error::MapperError;
    use crate::vocabulary::GcmdVocabulary;

    fn try_build(
        raw: &RawMetadata,
        backend: &dyn RasterBackend,
        sub_dataset: Option<usize>,
    ) -> BuildResult {
        let vocabulary = GcmdVocabulary::empty();
        let ctx = MapperContext {
            path: &raw.path,
            raw,
            sub_dataset,
            backend,
            vocabulary: &vocabulary,
        };
        NetcdfCfMapper.try_build(&ctx)
    }

    #[test]
    fn test_builds_latlon_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = cf_latlon_store(dir.path()).unwrap();
        let backend = FileBackend::new();
        let raw = backend.open(&path).unwrap();

        let BuildOutcome::Accepted(dataset) = try_build(&raw, &backend, None).unwrap() else {
            panic!("CF store rejected");
        };
        assert_eq!(dataset.mapper, NAME);
        assert_eq!(dataset.band_names(), vec!["sst_1", "sst_2"]);
        assert_eq!(dataset.get_metadata("title"), Some("Sea surface temperature"));

        let (lon, lat) = dataset.geolocation_grids().unwrap();
        assert_approx_eq!(lon[0], 0.5, 1e-9);
        assert_approx_eq!(lon[3], 3.5, 1e-9);
        assert_approx_eq!(lat[0], 60.5, 1e-9);
        assert_approx_eq!(lat[lat.len() - 1], 58.5, 1e-9);
    }

    #[test]
    fn test_sub_dataset_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = cf_latlon_store(dir.path()).unwrap();
        let backend = FileBackend::new();
        let raw = backend.open(&path).unwrap();

        let sst = raw
            .sub_datasets
            .iter()
            .position(|s| s.variable == "sst")
            .unwrap();
        let outcome = try_build(&raw, &backend, Some(sst)).unwrap();
        assert!(outcome.is_accepted());

        let lat = raw
            .sub_datasets
            .iter()
            .position(|s| s.variable == "lat")
            .unwrap();
        assert!(matches!(
            try_build(&raw, &backend, Some(lat)),
            Err(MapperError::SubDatasetNotRaster { .. })
        ));
        assert!(matches!(
            try_build(&raw, &backend, Some(99)),
            Err(MapperError::SubDatasetOutOfRange { index: 99, .. })
        ));
    }

    #[test]
    fn test_rejects_plain_raster() {
        let file = plain_raster_memory_file("/mem/plain.tif", 3, 2);
        let raw = file.raw.clone();
        let backend = MemoryBackend::new().with_file(file);
        assert!(!try_build(&raw, &backend, None).unwrap().is_accepted());
    }
}
