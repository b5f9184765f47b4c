//! Overlap statistics across several service radii.

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::{Facility, RegionBounds};
use crate::overlap::OverlapCalculator;

/// 10/20/30 miles (about 15/30/45 minute drive times)
pub const DEFAULT_SWEEP_RADII: [f64; 3] = [10.0, 20.0, 30.0];

/// Summary of one radius in a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub radius_miles: f64,
    pub overlapping_pairs: usize,
    pub isolated: usize,
    pub clusters: usize,
    pub hotspots: usize,
    pub largest_cluster: usize,
}

/// Run the calculator once per radius, in ascending radius order
pub fn radius_sweep(
    facilities: &[Facility],
    radii: &[f64],
    bounds: RegionBounds,
    hotspot_min_size: usize,
) -> Result<Vec<SweepPoint>> {
    let mut radii = radii.to_vec();
    radii.sort_by(|a, b| a.total_cmp(b));
    radii.dedup();

    radii
        .into_iter()
        .map(|radius| -> Result<SweepPoint> {
            let analysis = OverlapCalculator::new(radius)?
                .with_bounds(bounds)
                .with_hotspot_min_size(hotspot_min_size)
                .analyze(facilities)?;

            let point = SweepPoint {
                radius_miles: radius,
                overlapping_pairs: analysis.overlapping_pairs(),
                isolated: analysis.results.values().filter(|r| r.is_isolated()).count(),
                clusters: analysis.clusters.len(),
                hotspots: analysis.hotspots().count(),
                largest_cluster: analysis.clusters.first().map(|c| c.len()).unwrap_or(0),
            };
            debug!("Sweep at {} miles: {:?}", radius, point);
            Ok(point)
        })
        .collect()
}
