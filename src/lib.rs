//! Service Area - healthcare facility overlap and redundancy analysis
//!
//! This library computes which facilities fall inside each other's service
//! radius, groups them into proximity clusters and derives the redundancy
//! metrics used by the `analyze` binary.

pub mod analysis;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod overlap;
pub mod report;
pub mod spatial;

pub use error::{Error, Result};
pub use models::{Facility, FacilityId, FacilityType, GeoPoint, RegionBounds};
pub use overlap::{compute_overlaps, find_clusters, Cluster, OverlapCalculator, OverlapResult};
