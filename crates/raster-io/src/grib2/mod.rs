//! GRIB2 driver.
//!
//! Every message becomes one raster band. The grid of the first message
//! defines the raster; messages on a different grid are skipped. Values are
//! decoded with our own simple-packing reader and handed to the `grib` crate
//! for every other packing.

mod sections;
pub mod tables;
mod unpack;

use std::io::{Cursor, Read};
use std::path::Path;

use bytes::Bytes;
use chrono::Duration;
use raster_common::{
    time::isoformat, BandDataType, DriverKind, GeoTransform, MetadataMap, RasterBand, RawMetadata,
};
use tracing::{debug, warn};

use crate::error::{IoError, IoResult};
use sections::{Bitmap, GridDefinition, LatLonGrid};

pub use sections::split_messages;

/// Read a GRIB2 file into memory, gunzipping when asked.
pub fn load(path: &Path, gzip: bool) -> IoResult<Bytes> {
    let raw = std::fs::read(path)?;
    if gzip {
        decompress_gzip(&raw)
    } else {
        Ok(Bytes::from(raw))
    }
}

/// Decompress gzip-compressed GRIB2 data.
pub fn decompress_gzip(data: &[u8]) -> IoResult<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| IoError::Decompression(e.to_string()))?;
    Ok(Bytes::from(decompressed))
}

/// Build raw metadata from the sections of every message.
pub fn probe(path: &Path, data: &[u8]) -> IoResult<RawMetadata> {
    let messages = split_messages(data)?;
    let first = messages[0];
    let ident = sections::parse_identification(first)?;
    let grid = sections::parse_grid_definition(first)?;

    let mut raw = RawMetadata::new(path, DriverKind::Grib);
    raw.raster.width = grid.ni as usize;
    raw.raster.height = grid.nj as usize;
    raw.raster.geo_transform = grid.latlon.as_ref().map(latlon_transform);

    let globals = [
        ("GRIB_DISCIPLINE", ident.discipline.to_string()),
        ("GRIB_CENTER", ident.center.to_string()),
        ("GRIB_CENTER_NAME", tables::center_name(ident.center).to_string()),
        ("GRIB_SUBCENTER", ident.sub_center.to_string()),
        ("GRIB_MASTER_TABLE", ident.table_version.to_string()),
        ("GRIB_PRODUCTION_STATUS", ident.production_status.to_string()),
        ("GRIB_DATA_TYPE", ident.data_type.to_string()),
        ("GRIB_REF_TIME", isoformat(&ident.reference_time)),
        ("GRIB_GRID_TEMPLATE", grid.template.to_string()),
    ];
    for (key, value) in globals {
        raw.metadata.insert(key.to_string(), value);
    }

    for (i, msg) in messages.iter().enumerate() {
        let index = i + 1;
        match band_metadata(msg, &grid) {
            Ok(metadata) => raw.raster.bands.push(RasterBand {
                index,
                data_type: BandDataType::Float64,
                metadata,
            }),
            Err(e) => warn!(
                path = %path.display(),
                message = index,
                error = %e,
                "Skipping GRIB2 message"
            ),
        }
    }

    debug!(
        path = %path.display(),
        messages = messages.len(),
        bands = raw.raster.bands.len(),
        width = raw.raster.width,
        height = raw.raster.height,
        "Probed GRIB2 file"
    );
    Ok(raw)
}

fn band_metadata(msg: &[u8], grid: &GridDefinition) -> IoResult<MetadataMap> {
    let ident = sections::parse_identification(msg)?;
    let this_grid = sections::parse_grid_definition(msg)?;
    if (this_grid.ni, this_grid.nj) != (grid.ni, grid.nj) {
        return Err(IoError::Grib2Parse(format!(
            "grid {}x{} differs from first message grid {}x{}",
            this_grid.ni, this_grid.nj, grid.ni, grid.nj
        )));
    }
    let product = sections::parse_product_definition(msg)?;
    let repr = sections::parse_data_representation(msg)?;
    let param = tables::parameter(
        ident.discipline,
        product.parameter_category,
        product.parameter_number,
    );

    let mut md = MetadataMap::new();
    md.insert("GRIB_ELEMENT".into(), param.short_name.clone());
    md.insert("GRIB_COMMENT".into(), param.description.to_string());
    md.insert("GRIB_UNIT".into(), param.units.to_string());
    md.insert("GRIB_DISCIPLINE".into(), ident.discipline.to_string());
    md.insert("GRIB_CATEGORY".into(), product.parameter_category.to_string());
    md.insert("GRIB_NUMBER".into(), product.parameter_number.to_string());
    md.insert("GRIB_PDS_TEMPLATE".into(), product.template.to_string());
    md.insert("GRIB_PACKING".into(), repr.template.to_string());
    md.insert("GRIB_LEVEL_TYPE".into(), product.level_type.to_string());
    md.insert("GRIB_LEVEL_VALUE".into(), product.level_value.to_string());
    md.insert(
        "GRIB_LEVEL".into(),
        tables::level_description(product.level_type, product.level_value),
    );
    md.insert("GRIB_REF_TIME".into(), isoformat(&ident.reference_time));

    if let Some(unit) = tables::time_unit_seconds(product.time_unit) {
        let seconds = unit * product.forecast_time as i64;
        md.insert("GRIB_FORECAST_SECONDS".into(), seconds.to_string());
        let valid = ident.reference_time + Duration::seconds(seconds);
        md.insert("GRIB_VALID_TIME".into(), isoformat(&valid));
    }
    Ok(md)
}

/// Pixel-edge geotransform for a template 3.0 grid.
///
/// Longitudes past 180 are shifted into `[-180, 180)`. The row direction
/// follows La1/La2 rather than the scanning flag, which producers get wrong.
fn latlon_transform(grid: &LatLonGrid) -> GeoTransform {
    let lon1 = if grid.lo1 >= 180.0 { grid.lo1 - 360.0 } else { grid.lo1 };
    let di = if grid.scanning_mode & 0x80 != 0 { -grid.di } else { grid.di };
    let dj = if grid.la2 < grid.la1 { -grid.dj } else { grid.dj };

    GeoTransform {
        origin_x: lon1 - di / 2.0,
        pixel_width: di,
        row_rotation: 0.0,
        origin_y: grid.la1 - dj / 2.0,
        column_rotation: 0.0,
        pixel_height: dj,
    }
}

/// Decode the values of message `index` (1-based).
pub fn read_message(data: &[u8], index: usize) -> IoResult<Vec<f64>> {
    let messages = split_messages(data)?;
    let msg = index
        .checked_sub(1)
        .and_then(|i| messages.get(i))
        .ok_or(IoError::BandOutOfRange {
            index,
            count: messages.len(),
        })?;

    let grid = sections::parse_grid_definition(msg)?;
    let repr = sections::parse_data_representation(msg)?;
    if repr.template != 0 {
        return decode_with_grib_crate(msg);
    }
    let bitmap = match sections::parse_bitmap(msg)? {
        Bitmap::None => None,
        Bitmap::Present(bm) => Some(bm),
        Bitmap::Previous => return decode_with_grib_crate(msg),
    };

    unpack::unpack_simple(
        sections::parse_data_section(msg)?,
        grid.num_points as usize,
        repr.bits_per_value,
        repr.reference_value,
        repr.binary_scale_factor,
        repr.decimal_scale_factor,
        bitmap,
    )
}

fn decode_with_grib_crate(msg: &[u8]) -> IoResult<Vec<f64>> {
    let grib2 = grib::from_reader(Cursor::new(msg))
        .map_err(|e| IoError::Grib2Parse(e.to_string()))?;
    let (_, submsg) = grib2
        .iter()
        .next()
        .ok_or_else(|| IoError::Grib2Parse("message has no fields".to_string()))?;
    let decoder = grib::Grib2SubmessageDecoder::from(submsg)
        .map_err(|e| IoError::Unpacking(e.to_string()))?;
    let values = decoder
        .dispatch()
        .map_err(|e| IoError::Unpacking(e.to_string()))?;
    Ok(values.map(f64::from).collect())
}
