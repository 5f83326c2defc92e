//! The normalized dataset returned to callers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{RasterError, RasterResult};
use crate::geolocation::Geolocation;
use crate::metadata::MetadataMap;

/// Element type of a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandDataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl BandDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BandDataType::Int8 => "int8",
            BandDataType::UInt8 => "uint8",
            BandDataType::Int16 => "int16",
            BandDataType::UInt16 => "uint16",
            BandDataType::Int32 => "int32",
            BandDataType::UInt32 => "uint32",
            BandDataType::Int64 => "int64",
            BandDataType::UInt64 => "uint64",
            BandDataType::Float32 => "float32",
            BandDataType::Float64 => "float64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, BandDataType::Float32 | BandDataType::Float64)
    }
}

impl fmt::Display for BandDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int8" | "byte" | "i1" => Ok(BandDataType::Int8),
            "uint8" | "ubyte" | "u1" => Ok(BandDataType::UInt8),
            "int16" | "short" | "i2" => Ok(BandDataType::Int16),
            "uint16" | "ushort" | "u2" => Ok(BandDataType::UInt16),
            "int32" | "int" | "i4" => Ok(BandDataType::Int32),
            "uint32" | "uint" | "u4" => Ok(BandDataType::UInt32),
            "int64" | "i8" => Ok(BandDataType::Int64),
            "uint64" | "u8" => Ok(BandDataType::UInt64),
            "float32" | "float" | "f4" => Ok(BandDataType::Float32),
            "float64" | "double" | "f8" => Ok(BandDataType::Float64),
            other => Err(format!("unsupported data type: {}", other)),
        }
    }
}

/// Where a band's values live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSource {
    pub path: PathBuf,
    /// Variable inside a container file; `None` for top-level raster bands
    pub variable: Option<String>,
    /// 1-based band index within the source
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub data_type: BandDataType,
    pub metadata: MetadataMap,
    pub source: BandSource,
}

/// A dataset after a mapper has normalized it.
///
/// Two datasets built from the same file by the same mapper compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDataset {
    pub path: PathBuf,
    /// Name of the mapper that built this dataset
    pub mapper: String,
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Band>,
    pub geolocation: Geolocation,
    pub metadata: MetadataMap,
}

impl NormalizedDataset {
    pub fn band(&self, name: &str) -> RasterResult<&Band> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| RasterError::BandNotFound(name.to_string()))
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Longitude and latitude of every pixel centre, row-major.
    pub fn geolocation_grids(&self) -> RasterResult<(Vec<f64>, Vec<f64>)> {
        self.geolocation.grids(self.width, self.height)
    }

    pub fn bounding_box(&self) -> RasterResult<Option<BoundingBox>> {
        let (lon, lat) = self.geolocation_grids()?;
        Ok(BoundingBox::from_points(&lon, &lat))
    }

    /// Approximate pixel size in meters `(x, y)` measured at the image centre.
    pub fn pixel_size_meters(&self) -> RasterResult<Option<(f64, f64)>> {
        if self.width < 2 || self.height < 2 {
            return Ok(None);
        }
        let (lon, lat) = self.geolocation_grids()?;
        let row = self.height / 2;
        let col = (self.width / 2).min(self.width - 2);
        let row = row.min(self.height - 2);
        let at = |c: usize, r: usize| {
            let i = r * self.width + c;
            (lon[i], lat[i])
        };

        let (x0, y0) = at(col, row);
        let (x1, y1) = at(col + 1, row);
        let (x2, y2) = at(col, row + 1);
        let dx = projection::haversine(x0, y0, x1, y1);
        let dy = projection::haversine(x0, y0, x2, y2);
        if dx.is_finite() && dy.is_finite() {
            Ok(Some((dx, dy)))
        } else {
            Ok(None)
        }
    }
}
