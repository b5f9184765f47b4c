//! Facility record and its identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Unique facility identifier (CCN, NPI, enrollment id, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(String);

impl FacilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FacilityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FacilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Kind of healthcare facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    /// General acute-care hospital
    Hospital,
    /// Rural Health Clinic (RHC)
    RuralHealthClinic,
    /// Federally Qualified Health Center (FQHC)
    FederallyQualifiedHealthCenter,
}

impl FacilityType {
    /// All facility types in reporting order
    pub fn all() -> &'static [FacilityType] {
        &[
            FacilityType::Hospital,
            FacilityType::RuralHealthClinic,
            FacilityType::FederallyQualifiedHealthCenter,
        ]
    }

    /// Short label used in summaries ("Hospital", "RHC", "FQHC")
    pub fn label(&self) -> &'static str {
        match self {
            FacilityType::Hospital => "Hospital",
            FacilityType::RuralHealthClinic => "RHC",
            FacilityType::FederallyQualifiedHealthCenter => "FQHC",
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityType::Hospital => write!(f, "hospital"),
            FacilityType::RuralHealthClinic => write!(f, "rural_health_clinic"),
            FacilityType::FederallyQualifiedHealthCenter => {
                write!(f, "federally_qualified_health_center")
            }
        }
    }
}

impl FromStr for FacilityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "hospital" => Ok(FacilityType::Hospital),
            "rural_health_clinic" | "rhc" => Ok(FacilityType::RuralHealthClinic),
            "federally_qualified_health_center" | "fqhc" => {
                Ok(FacilityType::FederallyQualifiedHealthCenter)
            }
            _ => Err(format!("unknown facility type '{}'", s.trim())),
        }
    }
}

/// Geographic point (lat/lon, degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check the point against the global coordinate ranges
    pub fn check_range(&self) -> std::result::Result<(), String> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(format!(
                "coordinates ({}, {}) are not finite",
                self.lat, self.lon
            ));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} outside [-90, 90]", self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("longitude {} outside [-180, 180]", self.lon));
        }
        Ok(())
    }

    /// Convert to a `geo` point (x = lon, y = lat)
    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A geocoded healthcare facility.
///
/// Built through [`Facility::new`], which rejects out-of-range coordinates.
/// Fields stay public for reading; records are not modified after loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Facility {
    /// Create a facility, validating its coordinates
    pub fn new(
        id: impl Into<FacilityId>,
        name: impl Into<String>,
        facility_type: FacilityType,
        lat: f64,
        lon: f64,
    ) -> Result<Self> {
        let id = id.into();
        let location = GeoPoint::new(lat, lon);
        location
            .check_range()
            .map_err(|reason| Error::invalid(id.as_str(), reason))?;

        Ok(Self {
            id,
            name: name.into(),
            facility_type,
            location,
            affiliation: None,
            city: None,
        })
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}
