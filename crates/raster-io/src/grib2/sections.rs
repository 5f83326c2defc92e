//! GRIB2 section parsing (WMO FM 92 GRIB Edition 2).
//!
//! Only what the probe and the simple-packing reader need is decoded; the
//! rest of each section is skipped.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{IoError, IoResult};

/// Section 0 plus the identification fields of Section 1.
#[derive(Debug, Clone)]
pub struct Identification {
    pub discipline: u8,
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub reference_time: NaiveDateTime,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3, template 3.0 (regular latitude/longitude).
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    pub ni: u32,
    pub nj: u32,
    /// Degrees, first grid point
    pub la1: f64,
    pub lo1: f64,
    pub la2: f64,
    pub lo2: f64,
    /// Degrees, always positive
    pub di: f64,
    pub dj: f64,
    pub scanning_mode: u8,
}

#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template: u16,
    pub num_points: u32,
    pub ni: u32,
    pub nj: u32,
    pub latlon: Option<LatLonGrid>,
}

/// Section 4, template 4.0 fields.
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub time_unit: u8,
    pub forecast_time: u32,
    pub level_type: u8,
    pub level_value: f64,
}

/// Section 5; the packing fields are those of template 5.0.
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_packed: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
}

/// Section 6 bitmap indicator.
#[derive(Debug, Clone)]
pub enum Bitmap<'a> {
    None,
    Present(&'a [u8]),
    /// Indicator 254: reuse a bitmap from an earlier field
    Previous,
}

fn be_u16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

fn be_u32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// GRIB2 sign-magnitude integers: the top bit is the sign.
fn be_i32_sm(b: &[u8], at: usize) -> i32 {
    let raw = be_u32(b, at);
    let magnitude = (raw & 0x7fff_ffff) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn be_i16_sm(b: &[u8], at: usize) -> i16 {
    let raw = be_u16(b, at);
    let magnitude = (raw & 0x7fff) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn short(section: u8, what: &str) -> IoError {
    IoError::InvalidSection {
        section,
        reason: format!("not enough data for {}", what),
    }
}

/// Split a buffer into complete GRIB2 messages.
///
/// Bytes between messages (WMO headers, padding) are skipped.
pub fn split_messages(data: &[u8]) -> IoResult<Vec<&[u8]>> {
    let mut messages = Vec::new();
    let mut offset = 0;

    while let Some(pos) = data[offset..].windows(4).position(|w| w == b"GRIB") {
        let start = offset + pos;
        let msg = &data[start..];
        if msg.len() < 16 {
            return Err(short(0, "indicator"));
        }
        let edition = msg[7];
        if edition != 2 {
            return Err(IoError::Grib2Parse(format!(
                "Expected GRIB edition 2, got {}",
                edition
            )));
        }
        let length = u64::from_be_bytes([
            msg[8], msg[9], msg[10], msg[11], msg[12], msg[13], msg[14], msg[15],
        ]) as usize;
        if length < 16 + 4 || length > msg.len() {
            return Err(IoError::Grib2Parse(format!(
                "Message at byte {} declares length {} but {} bytes remain",
                start,
                length,
                msg.len()
            )));
        }
        if &msg[length - 4..length] != b"7777" {
            return Err(IoError::Grib2Parse(format!(
                "Message at byte {} is missing its end marker",
                start
            )));
        }
        messages.push(&msg[..length]);
        offset = start + length;
    }

    if messages.is_empty() {
        return Err(IoError::Grib2Parse("no GRIB2 messages found".to_string()));
    }
    Ok(messages)
}

/// Offset of the first occurrence of `section_num` after Section 0.
pub fn find_section(msg: &[u8], section_num: u8) -> IoResult<usize> {
    let mut offset = 16;
    loop {
        if offset + 5 > msg.len() || &msg[offset..offset + 4] == b"7777" {
            return Err(IoError::InvalidSection {
                section: section_num,
                reason: "section not found".to_string(),
            });
        }
        let length = be_u32(msg, offset) as usize;
        if length < 5 || offset + length > msg.len() {
            return Err(IoError::InvalidSection {
                section: section_num,
                reason: format!("invalid section length {}", length),
            });
        }
        if msg[offset + 4] == section_num {
            return Ok(offset);
        }
        offset += length;
    }
}

fn section(msg: &[u8], section_num: u8) -> IoResult<&[u8]> {
    let offset = find_section(msg, section_num)?;
    let length = be_u32(msg, offset) as usize;
    Ok(&msg[offset..offset + length])
}

pub fn parse_identification(msg: &[u8]) -> IoResult<Identification> {
    let s = section(msg, 1)?;
    if s.len() < 21 {
        return Err(short(1, "identification"));
    }

    let year = be_u16(s, 12);
    let (month, day, hour, minute, second) = (s[14], s[15], s[16], s[17], s[18]);
    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| IoError::InvalidSection {
            section: 1,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        discipline: msg[6],
        center: be_u16(s, 5),
        sub_center: be_u16(s, 7),
        table_version: s[9],
        reference_time,
        production_status: s[19],
        data_type: s[20],
    })
}

pub fn parse_grid_definition(msg: &[u8]) -> IoResult<GridDefinition> {
    let s = section(msg, 3)?;
    if s.len() < 14 {
        return Err(short(3, "grid definition header"));
    }
    let num_points = be_u32(s, 6);
    let template = be_u16(s, 12);
    let gd = &s[14..];

    // Ni/Nj sit at the same offset in templates 3.0, 3.1, 3.10 and 3.40
    let (ni, nj) = if gd.len() >= 24 {
        (be_u32(gd, 16), be_u32(gd, 20))
    } else {
        (0, 0)
    };

    let latlon = if template == 0 {
        if gd.len() < 58 {
            return Err(IoError::InvalidSection {
                section: 3,
                reason: format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
            });
        }
        let basic_angle = be_u32(gd, 24);
        let subdivisions = be_u32(gd, 28);
        let unit = if basic_angle == 0 || subdivisions == 0 || subdivisions == u32::MAX {
            1e-6
        } else {
            basic_angle as f64 / subdivisions as f64
        };
        Some(LatLonGrid {
            ni,
            nj,
            la1: be_i32_sm(gd, 32) as f64 * unit,
            lo1: be_i32_sm(gd, 36) as f64 * unit,
            la2: be_i32_sm(gd, 41) as f64 * unit,
            lo2: be_i32_sm(gd, 45) as f64 * unit,
            di: be_u32(gd, 49) as f64 * unit,
            dj: be_u32(gd, 53) as f64 * unit,
            scanning_mode: gd[57],
        })
    } else {
        None
    };

    Ok(GridDefinition {
        template,
        num_points,
        ni,
        nj,
        latlon,
    })
}

pub fn parse_product_definition(msg: &[u8]) -> IoResult<ProductDefinition> {
    let s = section(msg, 4)?;
    if s.len() < 28 {
        return Err(short(4, "product definition"));
    }

    let level_type = s[22];
    let scale_factor = s[23] as i8;
    let scaled_value = be_u32(s, 24);
    let level_value = if scaled_value == u32::MAX {
        0.0
    } else {
        scaled_value as f64 / 10f64.powi(scale_factor as i32)
    };

    Ok(ProductDefinition {
        template: be_u16(s, 7),
        parameter_category: s[9],
        parameter_number: s[10],
        time_unit: s[17],
        forecast_time: be_u32(s, 18),
        level_type,
        level_value,
    })
}

pub fn parse_data_representation(msg: &[u8]) -> IoResult<DataRepresentation> {
    let s = section(msg, 5)?;
    if s.len() < 20 {
        return Err(short(5, "data representation"));
    }
    Ok(DataRepresentation {
        num_packed: be_u32(s, 5),
        template: be_u16(s, 9),
        reference_value: f32::from_be_bytes([s[11], s[12], s[13], s[14]]),
        binary_scale_factor: be_i16_sm(s, 15),
        decimal_scale_factor: be_i16_sm(s, 17),
        bits_per_value: s[19],
    })
}

pub fn parse_bitmap(msg: &[u8]) -> IoResult<Bitmap<'_>> {
    let s = match section(msg, 6) {
        Ok(s) => s,
        Err(_) => return Ok(Bitmap::None),
    };
    if s.len() < 6 {
        return Err(short(6, "bitmap indicator"));
    }
    match s[5] {
        0 => Ok(Bitmap::Present(&s[6..])),
        254 => Ok(Bitmap::Previous),
        255 => Ok(Bitmap::None),
        other => Err(IoError::InvalidSection {
            section: 6,
            reason: format!("predefined bitmap {} not supported", other),
        }),
    }
}

pub fn parse_data_section(msg: &[u8]) -> IoResult<&[u8]> {
    Ok(&section(msg, 7)?[5..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(be_i32_sm(&[0x80, 0, 0, 5], 0), -5);
        assert_eq!(be_i32_sm(&[0, 0, 0, 5], 0), 5);
        assert_eq!(be_i16_sm(&[0x80, 3], 0), -3);
    }

    #[test]
    fn test_split_rejects_truncated_message() {
        let mut msg = b"GRIB\0\0\0\x02".to_vec();
        msg.extend_from_slice(&100u64.to_be_bytes());
        msg.extend_from_slice(b"7777");
        assert!(matches!(split_messages(&msg), Err(IoError::Grib2Parse(_))));
    }

    #[test]
    fn test_split_rejects_edition_1() {
        let mut msg = b"GRIB\0\0\x18\x01".to_vec();
        msg.extend_from_slice(&[0; 20]);
        assert!(split_messages(&msg).is_err());
    }

    #[test]
    fn test_split_requires_a_message() {
        assert!(split_messages(b"nothing here").is_err());
    }
}
