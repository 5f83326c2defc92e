//! GOES-R series Advanced Baseline Imager products (GOES-16 to GOES-19).
//!
//! Recognised by `platform_ID` (`G16`..`G19`) or an ABI `instrument_type`.
//! Geolocation comes from the `goes_imager_projection` grid mapping and the
//! `x`/`y` scan angle coordinates, or from explicit longitude/latitude grids
//! in re-exported files.

use std::sync::Arc;

use raster_common::time;
use tracing::debug;

use crate::cf;
use crate::config::MapperConfig;
use crate::error::{MapperError, RegistrationError};
use crate::mapper::{BuildOutcome, BuildResult, Mapper, MapperContext, MapperKind};
use crate::vocabulary::{inject_instrument, inject_platform};

pub const NAME: &str = "goes_abi";

const PROJECTION_VARIABLE: &str = "goes_imager_projection";

/// Bands preferred over the quality flags and auxiliary fields.
const PRIMARY_VARIABLES: &[&str] = &["CMI", "Rad"];

#[derive(Debug, Default, Clone, Copy)]
pub struct GoesAbiMapper;

pub fn factory(_config: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
    Ok(Arc::new(GoesAbiMapper))
}

/// `G16` -> `16`, for the GOES-R series satellites only.
fn goes_number(platform_id: &str) -> Option<u8> {
    platform_id
        .trim()
        .strip_prefix('G')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (16..=19).contains(n))
}

fn is_abi(instrument_type: &str) -> bool {
    let lower = instrument_type.to_lowercase();
    lower.contains("advanced baseline imager")
        || lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == "abi")
}

fn coverage_time(ctx: &MapperContext<'_>, name: &str) -> Result<Option<String>, MapperError> {
    ctx.raw
        .global(name)
        .map(|value| {
            time::normalize(value).map_err(|e| MapperError::InvalidAttribute {
                name: name.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl Mapper for GoesAbiMapper {
    fn name(&self) -> &'static str {
        NAME
    }

    fn kind(&self) -> MapperKind {
        MapperKind::Specific
    }

    fn try_build(&self, ctx: &MapperContext<'_>) -> BuildResult {
        let number = ctx.raw.global("platform_ID").and_then(goes_number);
        let abi = ctx.raw.global("instrument_type").is_some_and(is_abi);
        if number.is_none() && !abi {
            return Ok(BuildOutcome::rejected(
                "no GOES-R platform_ID or ABI instrument_type",
            ));
        }
        if let Some(sweep) = ctx.raw.variable_attr(PROJECTION_VARIABLE, "sweep_angle_axis") {
            if sweep != "x" {
                return Ok(BuildOutcome::rejected(format!(
                    "sweep angle axis '{}' is not supported",
                    sweep
                )));
            }
        }

        let start = coverage_time(ctx, "time_coverage_start")?;
        let end = coverage_time(ctx, "time_coverage_end")?;

        let variables = match ctx.sub_dataset {
            Some(_) => cf::select_variables(ctx.raw, ctx.sub_dataset)?,
            None => {
                let all = cf::data_variables(ctx.raw);
                let primary: Vec<_> = all
                    .iter()
                    .copied()
                    .filter(|s| PRIMARY_VARIABLES.contains(&s.variable.as_str()))
                    .collect();
                if primary.is_empty() {
                    all
                } else {
                    primary
                }
            }
        };

        let layout = cf::build_layout(ctx, &variables)?;
        if !layout.geolocation.is_georeferenced() {
            return Err(MapperError::MissingAttribute(format!(
                "{} or longitude/latitude grids",
                PROJECTION_VARIABLE
            )));
        }
        let mut dataset = layout.into_dataset(ctx, NAME);

        if let Some(start) = start {
            dataset
                .metadata
                .insert("time_coverage_start".to_string(), start);
        }
        if let Some(end) = end {
            dataset.metadata.insert("time_coverage_end".to_string(), end);
        }
        inject_instrument(&mut dataset.metadata, ctx.vocabulary, "ABI");
        if let Some(n) = number {
            inject_platform(&mut dataset.metadata, ctx.vocabulary, &format!("GOES-{}", n));
        }

        debug!(
            path = %ctx.path.display(),
            platform = ?number,
            bands = dataset.bands.len(),
            "Built GOES ABI dataset"
        );
        Ok(BuildOutcome::accepted(dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::Geolocation;
    use raster_io::{FileBackend, RasterBackend};
    use test_utils::{assert_approx_eq, goes_scan_angles, goes_store, GOES_HEIGHT, GOES_WIDTH};

    use crate::vocabulary::{GcmdVocabulary, Platform, Vocabulary};

    #[test]
    fn test_goes_number() {
        assert_eq!(goes_number("G16"), Some(16));
        assert_eq!(goes_number("G19"), Some(19));
        assert_eq!(goes_number("G13"), None);
        assert_eq!(goes_number("H08"), None);
    }

    #[test]
    fn test_is_abi() {
        assert!(is_abi("GOES R Series Advanced Baseline Imager"));
        assert!(is_abi("ABI"));
        assert!(is_abi("abi"));
        assert!(is_abi("GOES-R ABI L1b"));
        assert!(is_abi("advanced BASELINE imager"));
        assert!(!is_abi("AHI"));
        assert!(!is_abi("Cabinet"));
    }

    #[test]
    fn test_builds_geostationary_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = goes_store(dir.path()).unwrap();
        let backend = FileBackend::new();
        let raw = backend.open(&path).unwrap();
        let vocabulary = GcmdVocabulary::builtin();
        let ctx = MapperContext {
            path: &path,
            raw: &raw,
            sub_dataset: None,
            backend: &backend,
            vocabulary: &vocabulary,
        };

        let BuildOutcome::Accepted(dataset) = GoesAbiMapper.try_build(&ctx).unwrap() else {
            panic!("GOES file rejected");
        };
        assert_eq!(dataset.band_names(), vec!["CMI"]);
        assert_eq!((dataset.width, dataset.height), (GOES_WIDTH, GOES_HEIGHT));
        assert_eq!(
            dataset.get_metadata("time_coverage_start"),
            Some("2024-01-15T18:00:21.100000")
        );

        let platform: Platform =
            serde_json::from_str(dataset.get_metadata("platform").unwrap()).unwrap();
        assert_eq!(platform, vocabulary.platform("GOES-16").unwrap());

        let Geolocation::Geostationary(grid) = &dataset.geolocation else {
            panic!("expected geostationary geolocation");
        };
        let (x, y) = goes_scan_angles();
        assert_approx_eq!(grid.x0, x[0], 1e-12);
        assert_approx_eq!(grid.dx, x[1] - x[0], 1e-12);
        assert_approx_eq!(grid.y0, y[0], 1e-12);
        assert_approx_eq!(grid.longitude_of_projection_origin, -75.0, 1e-12);

        let (lon, lat) = dataset.geolocation_grids().unwrap();
        assert!(lon.iter().chain(&lat).all(|v| v.is_finite()));
        // Centre column and a row north of the equator
        assert!((lon[2] + 75.0).abs() < 1e-6);
        assert!(lat[2] > 0.0);
    }

    #[test]
    fn test_rejects_other_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let path = goes_store(dir.path()).unwrap();
        let backend = FileBackend::new();
        let mut raw = backend.open(&path).unwrap();
        raw.metadata.insert(
            format!("{}#sweep_angle_axis", PROJECTION_VARIABLE),
            "y".into(),
        );
        let vocabulary = GcmdVocabulary::builtin();
        let ctx = MapperContext {
            path: &path,
            raw: &raw,
            sub_dataset: None,
            backend: &backend,
            vocabulary: &vocabulary,
        };
        assert!(!GoesAbiMapper.try_build(&ctx).unwrap().is_accepted());
    }
}
