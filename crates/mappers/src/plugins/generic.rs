//! Last-resort mapper for any file exposing top-level raster bands.
//!
//! Bands are named `band_<n>` by their 1-based index. Geolocation is the
//! file's geotransform when it has one.

use std::sync::Arc;

use raster_common::{Band, BandSource, Geolocation, NormalizedDataset};
use tracing::debug;

use crate::config::MapperConfig;
use crate::error::RegistrationError;
use crate::mapper::{BuildOutcome, BuildResult, Mapper, MapperContext, MapperKind};

pub const NAME: &str = "generic";

#[derive(Debug, Default, Clone, Copy)]
pub struct GenericMapper;

pub fn factory(_config: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
    Ok(Arc::new(GenericMapper))
}

impl Mapper for GenericMapper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Fallback
    }

    fn try_build(&self, ctx: &MapperContext<'_>) -> BuildResult {
        let raster = &ctx.raw.raster;
        if raster.width == 0 || raster.height == 0 || raster.bands.is_empty() {
            return Ok(BuildOutcome::rejected("no top-level raster bands"));
        }

        let bands = raster
            .bands
            .iter()
            .map(|band| Band {
                name: format!("band_{}", band.index),
                data_type: band.data_type,
                metadata: band.metadata.clone(),
                source: BandSource {
                    path: ctx.path.to_path_buf(),
                    variable: None,
                    index: band.index,
                },
            })
            .collect::<Vec<_>>();
        let geolocation = raster
            .geo_transform
            .map_or(Geolocation::Unreferenced, Geolocation::GeoTransform);

        debug!(
            path = %ctx.path.display(),
            bands = bands.len(),
            georeferenced = geolocation.is_georeferenced(),
            "Built generic dataset"
        );
        Ok(BuildOutcome::accepted(NormalizedDataset {
            path: ctx.path.to_path_buf(),
            mapper: NAME.to_string(),
            width: raster.width,
            height: raster.height,
            bands,
            geolocation,
            metadata: ctx.raw.global_metadata(),
        }))
    }
}
