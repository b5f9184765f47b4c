//! Region-of-interest bounding box.

use geo::{coord, Rect};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// Inclusive lat/lon bounding box that every facility must fall inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl RegionBounds {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// The whole globe; accepts every valid coordinate
    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// State of Missouri
    pub fn missouri() -> Self {
        Self::new(35.99, -95.78, 40.62, -89.09)
    }

    /// Look up a named preset ("world", "missouri")
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "world" | "global" => Some(Self::world()),
            "missouri" | "mo" => Some(Self::missouri()),
            _ => None,
        }
    }

    /// Boundary points count as inside
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }

    /// As a `geo` rectangle (x = lon, y = lat)
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_lon, y: self.min_lat },
            coord! { x: self.max_lon, y: self.max_lat },
        )
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::world()
    }
}

impl From<Rect<f64>> for RegionBounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().y, rect.min().x, rect.max().y, rect.max().x)
    }
}
