//! Pairwise service-area overlap computation.

use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::cluster::{clusters_from_overlaps, Cluster, HOTSPOT_MIN_SIZE, MIN_CLUSTER_SIZE};
use super::distance::haversine_miles;
use crate::error::{Error, Result};
use crate::models::{Facility, FacilityId, RegionBounds};

/// 30-minute drive time in rural areas is roughly 20 miles
pub const DEFAULT_SERVICE_RADIUS_MILES: f64 = 20.0;

/// A facility inside another facility's service radius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: FacilityId,
    pub distance_miles: f64,
}

/// Overlaps for a single facility
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlapResult {
    /// Ordered by distance, then id
    pub neighbors: Vec<Neighbor>,
    pub overlap_count: usize,
}

impl OverlapResult {
    pub fn distance_to(&self, id: &FacilityId) -> Option<f64> {
        self.neighbors
            .iter()
            .find(|n| &n.id == id)
            .map(|n| n.distance_miles)
    }

    pub fn is_isolated(&self) -> bool {
        self.overlap_count == 0
    }
}

/// Overlaps and clusters for one radius
#[derive(Debug, Clone, Serialize)]
pub struct OverlapAnalysis {
    pub radius_miles: f64,
    pub results: BTreeMap<FacilityId, OverlapResult>,
    pub clusters: Vec<Cluster>,
}

impl OverlapAnalysis {
    /// Map each clustered facility to its cluster id
    pub fn cluster_membership(&self) -> HashMap<&FacilityId, usize> {
        self.clusters
            .iter()
            .flat_map(|c| c.members.iter().map(move |m| (m, c.id)))
            .collect()
    }

    /// Number of unordered facility pairs within the radius
    pub fn overlapping_pairs(&self) -> usize {
        self.results.values().map(|r| r.overlap_count).sum::<usize>() / 2
    }

    pub fn hotspots(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.is_hotspot)
    }
}

/// Computes which facilities fall inside each other's service radius.
#[derive(Debug, Clone)]
pub struct OverlapCalculator {
    radius_miles: f64,
    bounds: RegionBounds,
    hotspot_min_size: usize,
}

impl OverlapCalculator {
    pub fn new(radius_miles: f64) -> Result<Self> {
        if !radius_miles.is_finite() || radius_miles <= 0.0 {
            return Err(Error::InvalidRadius(radius_miles));
        }
        Ok(Self {
            radius_miles,
            bounds: RegionBounds::world(),
            hotspot_min_size: HOTSPOT_MIN_SIZE,
        })
    }

    /// Restrict accepted facilities to a region of interest
    pub fn with_bounds(mut self, bounds: RegionBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Smallest cluster flagged as a hotspot. Values below 2 are raised to 2,
    /// the size of the smallest cluster.
    pub fn with_hotspot_min_size(mut self, size: usize) -> Self {
        self.hotspot_min_size = size.max(MIN_CLUSTER_SIZE);
        self
    }

    pub fn radius_miles(&self) -> f64 {
        self.radius_miles
    }

    pub fn hotspot_min_size(&self) -> usize {
        self.hotspot_min_size
    }

    pub fn bounds(&self) -> &RegionBounds {
        &self.bounds
    }

    /// Check the collection before any distance is computed.
    ///
    /// The first offending facility aborts the whole run.
    pub fn validate(&self, facilities: &[Facility]) -> Result<()> {
        if facilities.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let mut seen = HashSet::with_capacity(facilities.len());
        for facility in facilities {
            facility
                .location
                .check_range()
                .map_err(|reason| Error::invalid(facility.id.as_str(), reason))?;

            if !self.bounds.contains(&facility.location) {
                return Err(Error::invalid(
                    facility.id.as_str(),
                    format!(
                        "location {} outside region bounds [{}, {}] x [{}, {}]",
                        facility.location,
                        self.bounds.min_lat,
                        self.bounds.max_lat,
                        self.bounds.min_lon,
                        self.bounds.max_lon
                    ),
                ));
            }

            if !seen.insert(&facility.id) {
                return Err(Error::invalid(facility.id.as_str(), "duplicate facility id"));
            }
        }

        Ok(())
    }

    /// Compute neighbours within the radius for every facility.
    pub fn compute(&self, facilities: &[Facility]) -> Result<BTreeMap<FacilityId, OverlapResult>> {
        self.validate(facilities)?;

        // Visit pairs in id order so the result does not depend on input order
        let mut sorted: Vec<&Facility> = facilities.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut neighbors: Vec<Vec<Neighbor>> = vec![Vec::new(); sorted.len()];
        let mut comparisons = 0usize;

        for i in 0..sorted.len() {
            for j in (i + 1)..sorted.len() {
                let (a, b) = (sorted[i], sorted[j]);
                let distance = haversine_miles(&a.location, &b.location);
                comparisons += 1;

                if distance <= self.radius_miles {
                    neighbors[i].push(Neighbor {
                        id: b.id.clone(),
                        distance_miles: distance,
                    });
                    neighbors[j].push(Neighbor {
                        id: a.id.clone(),
                        distance_miles: distance,
                    });
                }
            }
        }

        debug!(
            "Compared {} facility pairs at {} mile radius",
            comparisons, self.radius_miles
        );

        let results: BTreeMap<FacilityId, OverlapResult> = sorted
            .iter()
            .zip(neighbors)
            .map(|(facility, mut list)| {
                list.sort_by(|x, y| {
                    x.distance_miles
                        .total_cmp(&y.distance_miles)
                        .then_with(|| x.id.cmp(&y.id))
                });
                let result = OverlapResult {
                    overlap_count: list.len(),
                    neighbors: list,
                };
                (facility.id.clone(), result)
            })
            .collect();

        Ok(results)
    }

    /// Overlaps plus proximity clusters
    pub fn analyze(&self, facilities: &[Facility]) -> Result<OverlapAnalysis> {
        let results = self.compute(facilities)?;
        let clusters = clusters_from_overlaps(&results, self.hotspot_min_size);

        let analysis = OverlapAnalysis {
            radius_miles: self.radius_miles,
            results,
            clusters,
        };

        info!(
            "{} facilities, {} overlapping pairs, {} clusters ({} hotspots) at {} miles",
            facilities.len(),
            analysis.overlapping_pairs(),
            analysis.clusters.len(),
            analysis.hotspots().count(),
            self.radius_miles
        );

        Ok(analysis)
    }
}

/// Neighbours within `radius_miles` for every facility, keyed by id
pub fn compute_overlaps(
    facilities: &[Facility],
    radius_miles: f64,
) -> Result<BTreeMap<FacilityId, OverlapResult>> {
    OverlapCalculator::new(radius_miles)?.compute(facilities)
}

/// Connected components of the proximity graph at `radius_miles`
pub fn find_clusters(facilities: &[Facility], radius_miles: f64) -> Result<Vec<Cluster>> {
    Ok(OverlapCalculator::new(radius_miles)?
        .analyze(facilities)?
        .clusters)
}
