//! NCEP Global Forecast System GRIB2 output.
//!
//! Every GRIB message becomes one band, named after the CF standard name of
//! its parameter where one is known.

use std::collections::HashMap;
use std::sync::Arc;

use raster_common::{Band, BandSource, DriverKind, Geolocation, NormalizedDataset};
use tracing::debug;

use crate::config::MapperConfig;
use crate::error::RegistrationError;
use crate::mapper::{BuildOutcome, BuildResult, Mapper, MapperContext, MapperKind};
use crate::vocabulary::inject_instrument_platform;

pub const NAME: &str = "ncep_gfs";

/// WMO originating centre for NCEP.
const NCEP_CENTER: &str = "7";

const STANDARD_NAMES: &[(&str, &str)] = &[
    ("TMP", "air_temperature"),
    ("UGRD", "eastward_wind"),
    ("VGRD", "northward_wind"),
    ("RH", "relative_humidity"),
    ("PRMSL", "air_pressure_at_mean_sea_level"),
    ("HGT", "geopotential_height"),
    ("APCP", "precipitation_amount"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct NcepGfsMapper;

pub fn factory(_config: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
    Ok(Arc::new(NcepGfsMapper))
}

fn standard_name(element: &str) -> Option<&'static str> {
    STANDARD_NAMES
        .iter()
        .find(|(e, _)| e.eq_ignore_ascii_case(element))
        .map(|(_, name)| *name)
}

impl Mapper for NcepGfsMapper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Specific
    }

    fn try_build(&self, ctx: &MapperContext<'_>) -> BuildResult {
        let raw = ctx.raw;
        if raw.driver != DriverKind::Grib {
            return Ok(BuildOutcome::rejected("not a GRIB file"));
        }
        match raw.metadata.get("GRIB_CENTER").map(String::as_str) {
            Some(NCEP_CENTER) => {}
            other => {
                return Ok(BuildOutcome::rejected(format!(
                    "originating centre {:?} is not NCEP",
                    other
                )))
            }
        }
        let Some(transform) = raw.raster.geo_transform else {
            return Ok(BuildOutcome::rejected("grid is not a regular lat/lon grid"));
        };
        if raw.raster.bands.is_empty() {
            return Ok(BuildOutcome::rejected("no GRIB messages"));
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut times = Vec::new();
        let mut bands = Vec::with_capacity(raw.raster.bands.len());
        for band in &raw.raster.bands {
            let element = band
                .metadata
                .get("GRIB_ELEMENT")
                .map(String::as_str)
                .unwrap_or("unknown");
            let standard = standard_name(element);
            let base = standard
                .map(String::from)
                .unwrap_or_else(|| element.to_lowercase());

            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let name = if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            };

            let mut metadata = band.metadata.clone();
            if let Some(standard) = standard {
                metadata.insert("standard_name".to_string(), standard.to_string());
            }
            if let Some(unit) = band.metadata.get("GRIB_UNIT") {
                metadata.insert("units".to_string(), unit.clone());
            }
            if let Some(valid) = band
                .metadata
                .get("GRIB_VALID_TIME")
                .or_else(|| band.metadata.get("GRIB_REF_TIME"))
                .or_else(|| raw.metadata.get("GRIB_REF_TIME"))
            {
                times.push(valid.clone());
            }

            bands.push(Band {
                name,
                data_type: band.data_type,
                metadata,
                source: BandSource {
                    path: ctx.path.to_path_buf(),
                    variable: None,
                    index: band.index,
                },
            });
        }

        let mut metadata = raw.global_metadata();
        // Canonical timestamps sort chronologically as strings
        if let Some(start) = times.iter().min() {
            metadata.insert("time_coverage_start".to_string(), start.clone());
        }
        if let Some(end) = times.iter().max() {
            metadata.insert("time_coverage_end".to_string(), end.clone());
        }
        inject_instrument_platform(&mut metadata, ctx.vocabulary, "computer", "NCEP-GFS");

        debug!(
            path = %ctx.path.display(),
            bands = bands.len(),
            "Built GFS dataset"
        );
        Ok(BuildOutcome::accepted(NormalizedDataset {
            path: ctx.path.to_path_buf(),
            mapper: NAME.to_string(),
            width: raw.raster.width,
            height: raw.raster.height,
            bands,
            geolocation: Geolocation::GeoTransform(transform),
            metadata,
        }))
    }
}
