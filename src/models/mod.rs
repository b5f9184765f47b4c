//! Core data models for the overlap analysis.

pub mod facility;
pub mod region;

pub use facility::{Facility, FacilityId, FacilityType, GeoPoint};
pub use region::RegionBounds;
