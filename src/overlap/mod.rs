//! Service-area overlap and redundancy calculator.
//!
//! Compares every facility pair with the haversine distance, records the
//! neighbours inside the service radius and groups facilities into
//! connected components of the resulting proximity graph.

mod calculator;
mod cluster;
mod distance;

pub use calculator::{
    compute_overlaps, find_clusters, Neighbor, OverlapAnalysis, OverlapCalculator, OverlapResult,
    DEFAULT_SERVICE_RADIUS_MILES,
};
pub use cluster::{clusters_from_overlaps, Cluster, UnionFind, HOTSPOT_MIN_SIZE};
pub use distance::{haversine_miles, EARTH_RADIUS_MILES};
