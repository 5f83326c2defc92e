//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

/// A longitude/latitude bounding box in degrees.
///
/// Edges are pixel edges, not pixel centres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Read a `[min_lon, min_lat, max_lon, max_lat]` JSON attribute.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let values: Vec<f64> = value
            .as_array()?
            .iter()
            .map(|v| v.as_f64())
            .collect::<Option<_>>()?;
        match values.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] if min_lon < max_lon && min_lat < max_lat => {
                Some(Self::new(*min_lon, *min_lat, *max_lon, *max_lat))
            }
            _ => None,
        }
    }

    /// Smallest box enclosing all finite points. `None` when there are none.
    pub fn from_points(lon: &[f64], lat: &[f64]) -> Option<Self> {
        let mut bbox: Option<Self> = None;
        for (&x, &y) in lon.iter().zip(lat) {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            bbox = Some(match bbox {
                None => Self::new(x, y, x, y),
                Some(b) => Self::new(b.min_lon.min(x), b.min_lat.min(y), b.max_lon.max(x), b.max_lat.max(y)),
            });
        }
        bbox
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_lon < other.min_lon
            || self.min_lon > other.max_lon
            || self.max_lat < other.min_lat
            || self.min_lat > other.max_lat)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!([self.min_lon, self.min_lat, self.max_lon, self.max_lat])
    }
}
