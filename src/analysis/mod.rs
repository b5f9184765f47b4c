//! Redundancy analysis built on top of the overlap calculator.

mod colocation;
mod consolidation;
mod metrics;
mod sweep;

pub use colocation::{check_colocated, find_colocated, ColocatedGroup};
pub use consolidation::{
    consolidation_clusters, ConsolidationGroup, CONSOLIDATION_MIN_OVERLAPS, CONSOLIDATION_MIN_SIZE,
};
pub use metrics::{
    affiliation_breakdown, city_breakdown, isolated_facilities, neighbor_type_breakdown,
    redundancy_score, top_redundant, type_metrics, AffiliationBreakdown, CityBreakdown, CostModel,
    InefficiencyEstimate, RankedFacility, TypeMetrics, INDEPENDENT,
};
pub use sweep::{radius_sweep, SweepPoint, DEFAULT_SWEEP_RADII};
