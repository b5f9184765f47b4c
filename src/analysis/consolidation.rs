//! Consolidation candidates around high-overlap facilities.
//!
//! Unlike proximity clusters, these groups are built greedily: each
//! high-overlap facility (in id order) claims every unclaimed facility within
//! a tighter radius, and a facility belongs to at most one group.

use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{Facility, FacilityId, FacilityType};
use crate::overlap::{haversine_miles, OverlapAnalysis};

/// Overlap count a facility needs to seed a group
pub const CONSOLIDATION_MIN_OVERLAPS: usize = 5;

/// Groups smaller than this are not reported
pub const CONSOLIDATION_MIN_SIZE: usize = 3;

/// Facilities that could be served from fewer sites
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationGroup {
    /// 1-based, in seed order
    pub id: usize,
    pub seed: FacilityId,
    /// Sorted by id, seed included
    pub members: Vec<FacilityId>,
    /// Most common city among members (uppercased, ties by name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub by_type: BTreeMap<FacilityType, usize>,
}

impl ConsolidationGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Greedy grouping of facilities within `radius_miles` of a seed.
///
/// Seeds are facilities with at least `min_overlaps` overlaps in `analysis`,
/// visited in id order. Facilities claimed by a dropped (too small) group
/// stay claimed.
pub fn consolidation_clusters(
    facilities: &[Facility],
    analysis: &OverlapAnalysis,
    min_overlaps: usize,
    radius_miles: f64,
) -> Vec<ConsolidationGroup> {
    let mut sorted: Vec<&Facility> = facilities.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut claimed: HashSet<&FacilityId> = HashSet::new();
    let mut groups = Vec::new();

    for &seed in &sorted {
        let overlaps = analysis
            .results
            .get(&seed.id)
            .map(|r| r.overlap_count)
            .unwrap_or(0);
        if overlaps < min_overlaps || claimed.contains(&seed.id) {
            continue;
        }
        claimed.insert(&seed.id);

        let mut members: Vec<&Facility> = vec![seed];
        for &other in &sorted {
            if other.id == seed.id || claimed.contains(&other.id) {
                continue;
            }
            if haversine_miles(&seed.location, &other.location) <= radius_miles {
                claimed.insert(&other.id);
                members.push(other);
            }
        }

        if members.len() < CONSOLIDATION_MIN_SIZE {
            debug!(
                "Seed {} claimed only {} facilities within {} miles",
                seed.id,
                members.len(),
                radius_miles
            );
            continue;
        }

        groups.push(group(groups.len() + 1, seed, members));
    }

    groups
}

fn group(id: usize, seed: &Facility, mut members: Vec<&Facility>) -> ConsolidationGroup {
    members.sort_by(|a, b| a.id.cmp(&b.id));

    let mut by_type = BTreeMap::new();
    let mut cities: HashMap<String, usize> = HashMap::new();
    for member in &members {
        *by_type.entry(member.facility_type).or_insert(0) += 1;
        if let Some(city) = member.city.as_deref().map(str::trim) {
            if !city.is_empty() {
                *cities.entry(city.to_uppercase()).or_insert(0) += 1;
            }
        }
    }

    let city = cities
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(city, _)| city);

    ConsolidationGroup {
        id,
        seed: seed.id.clone(),
        members: members.iter().map(|m| m.id.clone()).collect(),
        city,
        by_type,
    }
}
