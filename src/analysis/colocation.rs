//! Detection of facilities sharing identical coordinates.
//!
//! Two records at the exact same point usually mean a geocoder fell back to
//! a city or ZIP centroid. They are only accepted when listed as verified
//! co-located (e.g. two clinics in the same building).

use hashbrown::HashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{Facility, FacilityId, GeoPoint};

/// Facilities found at one shared location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColocatedGroup {
    pub location: GeoPoint,
    /// Sorted by id
    pub facilities: Vec<FacilityId>,
}

/// Group facilities whose coordinates are bit-identical.
/// Groups are ordered by their first facility id.
pub fn find_colocated(facilities: &[Facility]) -> Vec<ColocatedGroup> {
    let mut by_location: BTreeMap<(u64, u64), ColocatedGroup> = BTreeMap::new();

    for facility in facilities {
        // +0.0 and -0.0 are the same place
        let key = (
            (facility.location.lat + 0.0).to_bits(),
            (facility.location.lon + 0.0).to_bits(),
        );
        by_location
            .entry(key)
            .or_insert_with(|| ColocatedGroup {
                location: facility.location,
                facilities: Vec::new(),
            })
            .facilities
            .push(facility.id.clone());
    }

    let mut groups: Vec<ColocatedGroup> = by_location
        .into_values()
        .filter(|g| g.facilities.len() > 1)
        .map(|mut g| {
            g.facilities.sort();
            g
        })
        .collect();
    groups.sort_by(|a, b| a.facilities[0].cmp(&b.facilities[0]));
    groups
}

/// Fail on the first co-located group containing an unverified facility
pub fn check_colocated(facilities: &[Facility], verified: &HashSet<FacilityId>) -> Result<()> {
    for group in find_colocated(facilities) {
        let unverified: Vec<&FacilityId> = group
            .facilities
            .iter()
            .filter(|id| !verified.contains(*id))
            .collect();

        if unverified.is_empty() {
            continue;
        }

        warn!(
            "{} facilities share location {}, unverified: {:?}",
            group.facilities.len(),
            group.location,
            unverified
        );
        return Err(Error::UnverifiedColocation {
            location: group.location.to_string(),
            facilities: group.facilities.iter().map(|id| id.to_string()).collect(),
        });
    }

    Ok(())
}
