//! Dataset construction shared by the mappers for CF-style container files.
//!
//! Data variables are sub-datasets with at least two dimensions that are not
//! coordinates. Every 2-D slice of a data variable becomes one band.
//! Geolocation is resolved in this order:
//!
//! 1. 2-D longitude/latitude variables on the data grid
//! 2. 1-D longitude/latitude axes
//! 3. the data variable's `grid_mapping` (Lambert conformal conic or
//!    geostationary) together with its `x`/`y` coordinates
//!
//! A file that matches none of these is returned unreferenced.

use raster_common::{
    Band, BandDataType, BandSource, GeostationaryGrid, Geolocation, LambertGrid, NormalizedDataset,
    RasterError, RawMetadata, SubDataset,
};
use tracing::{debug, warn};

use crate::error::MapperError;
use crate::mapper::MapperContext;

pub const LONGITUDE_NAMES: &[&str] = &["longitude", "lon"];
pub const LATITUDE_NAMES: &[&str] = &["latitude", "lat"];

const COORDINATE_STANDARD_NAMES: &[&str] = &[
    "longitude",
    "latitude",
    "grid_longitude",
    "grid_latitude",
    "projection_x_coordinate",
    "projection_y_coordinate",
];

/// Sphere radius used when a Lambert grid mapping gives none.
const DEFAULT_EARTH_RADIUS: f64 = 6_371_000.0;

/// Whether `sub` describes coordinates rather than data.
pub fn is_coordinate(sub: &SubDataset) -> bool {
    let name = sub.variable.to_lowercase();
    sub.shape.len() < 2
        || LONGITUDE_NAMES.contains(&name.as_str())
        || LATITUDE_NAMES.contains(&name.as_str())
        || sub.attr("grid_mapping_name").is_some()
        || sub
            .attr("standard_name")
            .is_some_and(|s| COORDINATE_STANDARD_NAMES.contains(&s))
}

/// Sub-datasets that hold raster data, in file order.
pub fn data_variables(raw: &RawMetadata) -> Vec<&SubDataset> {
    raw.sub_datasets
        .iter()
        .filter(|s| !is_coordinate(s))
        .filter(|s| matches!(s.grid_shape(), Some((h, w)) if h > 0 && w > 0))
        .collect()
}

/// The data variables to turn into bands, honouring an explicit
/// sub-dataset choice (0-based index into `raw.sub_datasets`).
pub fn select_variables(
    raw: &RawMetadata,
    sub_dataset: Option<usize>,
) -> Result<Vec<&SubDataset>, MapperError> {
    let Some(index) = sub_dataset else {
        return Ok(data_variables(raw));
    };
    let sub = raw
        .sub_datasets
        .get(index)
        .ok_or(MapperError::SubDatasetOutOfRange {
            index,
            count: raw.sub_datasets.len(),
        })?;
    if is_coordinate(sub) || sub.grid_shape().is_none() {
        return Err(MapperError::SubDatasetNotRaster {
            index,
            variable: sub.variable.clone(),
        });
    }
    Ok(vec![sub])
}

/// Parse `"63.3"`, `"63.3,63.3"`, `"[63.3, 63.3]"`, `"{63.3 63.3}"`.
pub fn parse_number_list(s: &str) -> Option<Vec<f64>> {
    let inner = s
        .trim()
        .trim_start_matches(['[', '{', '('])
        .trim_end_matches([']', '}', ')']);
    let values: Option<Vec<f64>> = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().ok())
        .collect();
    values.filter(|v| !v.is_empty())
}

/// Numeric attribute `variable#name`; `None` when absent.
pub fn number_attr(
    raw: &RawMetadata,
    variable: &str,
    name: &str,
) -> Result<Option<f64>, MapperError> {
    let Some(value) = raw.variable_attr(variable, name) else {
        return Ok(None);
    };
    parse_number_list(value)
        .map(|v| Some(v[0]))
        .ok_or_else(|| MapperError::InvalidAttribute {
            name: format!("{}#{}", variable, name),
            reason: format!("'{}' is not a number", value),
        })
}

fn required_number(raw: &RawMetadata, variable: &str, name: &str) -> Result<f64, MapperError> {
    number_attr(raw, variable, name)?
        .ok_or_else(|| MapperError::MissingAttribute(format!("{}#{}", variable, name)))
}

/// Bands, grid size and geolocation of a CF-style file.
#[derive(Debug, Clone)]
pub struct CfLayout {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Band>,
    pub geolocation: Geolocation,
}

impl CfLayout {
    /// Wrap the layout into a dataset carrying the file's global metadata.
    pub fn into_dataset(self, ctx: &MapperContext<'_>, mapper: &str) -> NormalizedDataset {
        NormalizedDataset {
            path: ctx.path.to_path_buf(),
            mapper: mapper.to_string(),
            width: self.width,
            height: self.height,
            bands: self.bands,
            geolocation: self.geolocation,
            metadata: ctx.raw.global_metadata(),
        }
    }
}

fn is_packed(sub: &SubDataset) -> bool {
    sub.attr("scale_factor").is_some() || sub.attr("add_offset").is_some()
}

/// Lay out `variables` as bands on the grid of the first one.
///
/// Variables on a different grid are left out.
pub fn build_layout(
    ctx: &MapperContext<'_>,
    variables: &[&SubDataset],
) -> Result<CfLayout, MapperError> {
    let first = variables.first().ok_or(MapperError::NoRasterVariables)?;
    let (height, width) = first.grid_shape().ok_or(MapperError::NoRasterVariables)?;

    let mut bands = Vec::new();
    for var in variables {
        if var.grid_shape() != Some((height, width)) {
            debug!(
                variable = %var.variable,
                shape = ?var.shape,
                "Skipping variable on a different grid"
            );
            continue;
        }
        let count = var.slice_count();
        let data_type = if is_packed(var) {
            BandDataType::Float64
        } else {
            var.data_type
        };
        for index in 1..=count {
            let name = if count == 1 {
                var.variable.clone()
            } else {
                format!("{}_{}", var.variable, index)
            };
            bands.push(Band {
                name,
                data_type,
                metadata: var.metadata.clone(),
                source: BandSource {
                    path: ctx.path.to_path_buf(),
                    variable: Some(var.variable.clone()),
                    index,
                },
            });
        }
    }

    let geolocation = resolve_geolocation(ctx, first, height, width)?;
    Ok(CfLayout {
        width,
        height,
        bands,
        geolocation,
    })
}

fn find_coordinate<'a>(
    raw: &'a RawMetadata,
    names: &[&str],
    standard_name: &str,
    shape: &[usize],
) -> Option<&'a SubDataset> {
    raw.sub_datasets.iter().find(|s| {
        s.shape == shape
            && (names.contains(&s.variable.to_lowercase().as_str())
                || s.attr("standard_name") == Some(standard_name))
    })
}

fn read(ctx: &MapperContext<'_>, sub: &SubDataset) -> Result<Vec<f64>, MapperError> {
    Ok(ctx.backend.read_variable(ctx.path, &sub.variable)?)
}

fn resolve_geolocation(
    ctx: &MapperContext<'_>,
    var: &SubDataset,
    height: usize,
    width: usize,
) -> Result<Geolocation, MapperError> {
    let raw = ctx.raw;

    let lon = find_coordinate(raw, LONGITUDE_NAMES, "longitude", &[height, width]);
    let lat = find_coordinate(raw, LATITUDE_NAMES, "latitude", &[height, width]);
    if let (Some(lon), Some(lat)) = (lon, lat) {
        debug!(lon = %lon.variable, lat = %lat.variable, "Using 2-D geolocation grids");
        return Ok(Geolocation::Grids {
            lon: read(ctx, lon)?,
            lat: read(ctx, lat)?,
        });
    }

    let lon = find_coordinate(raw, LONGITUDE_NAMES, "longitude", &[width]);
    let lat = find_coordinate(raw, LATITUDE_NAMES, "latitude", &[height]);
    if let (Some(lon), Some(lat)) = (lon, lat) {
        debug!(lon = %lon.variable, lat = %lat.variable, "Using 1-D coordinate axes");
        return Ok(Geolocation::from_axes(&read(ctx, lon)?, &read(ctx, lat)?));
    }

    if let Some(mapping) = var.attr("grid_mapping") {
        let grid_mapping_name = raw.variable_attr(mapping, "grid_mapping_name");
        match grid_mapping_name {
            Some("lambert_conformal_conic") => {
                return lambert(ctx, mapping, height, width).map(Geolocation::Lambert);
            }
            Some("geostationary") => {
                if let Some(grid) = geostationary(ctx, mapping, height, width)? {
                    return Ok(Geolocation::Geostationary(grid));
                }
            }
            other => {
                debug!(mapping, grid_mapping_name = ?other, "Unsupported grid mapping");
            }
        }
    }

    debug!(variable = %var.variable, "No geolocation found");
    Ok(Geolocation::Unreferenced)
}

/// Start and step of a projected coordinate axis.
fn projected_axis(
    ctx: &MapperContext<'_>,
    name: &str,
    standard_name: &str,
    len: usize,
) -> Result<(f64, f64, Option<String>), MapperError> {
    let sub = find_coordinate(ctx.raw, &[name], standard_name, &[len])
        .ok_or_else(|| MapperError::MissingAttribute(format!("{} coordinate", name)))?;
    let values = read(ctx, sub)?;
    let start = *values
        .first()
        .ok_or_else(|| MapperError::MissingAttribute(format!("{} coordinate values", name)))?;
    let step = values.get(1).map_or(0.0, |v| v - start);
    Ok((start, step, sub.attr("units").map(String::from)))
}

fn lambert(
    ctx: &MapperContext<'_>,
    mapping: &str,
    height: usize,
    width: usize,
) -> Result<LambertGrid, MapperError> {
    let raw = ctx.raw;
    let parallels = raw
        .variable_attr(mapping, "standard_parallel")
        .ok_or_else(|| MapperError::MissingAttribute(format!("{}#standard_parallel", mapping)))?;
    let standard_parallel = match parse_number_list(parallels).as_deref() {
        Some([a]) => (*a, *a),
        Some([a, b]) => (*a, *b),
        _ => {
            return Err(MapperError::InvalidAttribute {
                name: format!("{}#standard_parallel", mapping),
                reason: format!("expected one or two numbers, got '{}'", parallels),
            })
        }
    };

    let (x0, dx, _) = projected_axis(ctx, "x", "projection_x_coordinate", width)?;
    let (y0, dy, _) = projected_axis(ctx, "y", "projection_y_coordinate", height)?;

    let grid = LambertGrid {
        latitude_of_projection_origin: number_attr(raw, mapping, "latitude_of_projection_origin")?
            .unwrap_or(standard_parallel.0),
        longitude_of_central_meridian: required_number(
            raw,
            mapping,
            "longitude_of_central_meridian",
        )?,
        standard_parallel,
        earth_radius: match number_attr(raw, mapping, "earth_radius")? {
            Some(r) => r,
            None => number_attr(raw, mapping, "semi_major_axis")?.unwrap_or(DEFAULT_EARTH_RADIUS),
        },
        x0,
        y0,
        dx,
        dy,
    };
    grid.projection().map_err(RasterError::from)?;
    debug!(mapping, "Using Lambert conformal conic grid mapping");
    Ok(grid)
}

fn geostationary(
    ctx: &MapperContext<'_>,
    mapping: &str,
    height: usize,
    width: usize,
) -> Result<Option<GeostationaryGrid>, MapperError> {
    let raw = ctx.raw;
    if let Some(sweep) = raw.variable_attr(mapping, "sweep_angle_axis") {
        if sweep != "x" {
            warn!(mapping, sweep, "Only x sweep geostationary grids are supported");
            return Ok(None);
        }
    }

    let perspective_point_height = required_number(raw, mapping, "perspective_point_height")?;
    let semi_major_axis = required_number(raw, mapping, "semi_major_axis")?;
    let semi_minor_axis = number_attr(raw, mapping, "semi_minor_axis")?.unwrap_or(semi_major_axis);
    let longitude_of_projection_origin =
        required_number(raw, mapping, "longitude_of_projection_origin")?;

    // Scan angles may be given in radians or as meters at satellite height.
    let to_radians = |(start, step, units): (f64, f64, Option<String>)| match units.as_deref() {
        Some("m") | Some("meters") => (
            start / perspective_point_height,
            step / perspective_point_height,
        ),
        _ => (start, step),
    };
    let (x0, dx) = to_radians(projected_axis(ctx, "x", "projection_x_coordinate", width)?);
    let (y0, dy) = to_radians(projected_axis(ctx, "y", "projection_y_coordinate", height)?);

    let grid = GeostationaryGrid {
        perspective_point_height,
        semi_major_axis,
        semi_minor_axis,
        longitude_of_projection_origin,
        x0,
        y0,
        dx,
        dy,
    };
    grid.projection().map_err(RasterError::from)?;
    debug!(mapping, "Using geostationary grid mapping");
    Ok(Some(grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::DriverKind;
    use test_utils::RawMetadataBuilder;

    #[test]
    fn test_parse_number_list() {
        assert_eq!(parse_number_list("63.3"), Some(vec![63.3]));
        assert_eq!(parse_number_list("63.3,63.3"), Some(vec![63.3, 63.3]));
        assert_eq!(parse_number_list("[63.3, 60]"), Some(vec![63.3, 60.0]));
        assert_eq!(parse_number_list("{25 50}"), Some(vec![25.0, 50.0]));
        assert_eq!(parse_number_list("[]"), None);
        assert_eq!(parse_number_list("north"), None);
    }

    fn raw() -> RawMetadata {
        RawMetadataBuilder::new("/mem/f.nc", DriverKind::Memory)
            .variable("time", &["time"], &[2])
            .variable("lat", &["lat"], &[3])
            .variable("lon", &["lon"], &[4])
            .variable("sst", &["time", "lat", "lon"], &[2, 3, 4])
            .variable("mask", &["lat", "lon"], &[3, 4])
            .attr("mask", "scale_factor", "1")
            .variable("crs", &["dummy"], &[1])
            .attr("crs", "grid_mapping_name", "latitude_longitude")
            .build()
    }

    #[test]
    fn test_data_variables_skip_coordinates() {
        let raw = raw();
        let names: Vec<&str> = data_variables(&raw)
            .iter()
            .map(|s| s.variable.as_str())
            .collect();
        assert_eq!(names, vec!["sst", "mask"]);
    }

    #[test]
    fn test_select_variables() {
        let raw = raw();
        assert_eq!(select_variables(&raw, Some(4)).unwrap()[0].variable, "mask");
        assert!(matches!(
            select_variables(&raw, Some(9)),
            Err(MapperError::SubDatasetOutOfRange { index: 9, count: 6 })
        ));
        assert!(matches!(
            select_variables(&raw, Some(1)),
            Err(MapperError::SubDatasetNotRaster { index: 1, .. })
        ));
    }

    #[test]
    fn test_number_attr() {
        let raw = RawMetadataBuilder::new("/mem/f.nc", DriverKind::Memory)
            .variable("p", &["d"], &[1])
            .attr("p", "good", "[1.5, 2]")
            .attr("p", "bad", "abc")
            .build();
        assert_eq!(number_attr(&raw, "p", "good").unwrap(), Some(1.5));
        assert_eq!(number_attr(&raw, "p", "missing").unwrap(), None);
        assert!(matches!(
            number_attr(&raw, "p", "bad"),
            Err(MapperError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            required_number(&raw, "p", "missing"),
            Err(MapperError::MissingAttribute(name)) if name == "p#missing"
        ));
    }
}
