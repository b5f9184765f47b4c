//! Spatial index for nearest-facility lookups.
//!
//! Facilities are stored as points on the unit sphere, where straight-line
//! (chord) distance grows monotonically with great-circle distance. Nearest
//! neighbour queries on the R-tree therefore return the same facility a full
//! haversine scan would.

use hashbrown::HashMap;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use tracing::debug;

use crate::models::{Facility, FacilityId, GeoPoint};
use crate::overlap::haversine_miles;

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Closest facility to a point, with its haversine distance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestFacility {
    pub id: FacilityId,
    pub distance_miles: f64,
}

/// R-tree over facility locations
pub struct FacilityIndex {
    tree: RTree<IndexedPoint>,
    entries: Vec<(FacilityId, GeoPoint)>,
    by_id: HashMap<FacilityId, usize>,
}

fn unit_vector(point: &GeoPoint) -> [f64; 3] {
    let (lat, lon) = (point.lat.to_radians(), point.lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

impl FacilityIndex {
    pub fn build(facilities: &[Facility]) -> Self {
        let entries: Vec<(FacilityId, GeoPoint)> = facilities
            .iter()
            .map(|f| (f.id.clone(), f.location))
            .collect();

        let by_id: HashMap<FacilityId, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.clone(), i))
            .collect();

        let points: Vec<IndexedPoint> = entries
            .iter()
            .enumerate()
            .map(|(i, (_, location))| GeomWithData::new(unit_vector(location), i))
            .collect();

        let tree = RTree::bulk_load(points);
        debug!("Facility index built with {} entries", tree.size());

        Self {
            tree,
            entries,
            by_id,
        }
    }

    /// Closest facility to an arbitrary point
    pub fn nearest_to(&self, point: &GeoPoint) -> Option<NearestFacility> {
        self.nearest_excluding(point, None)
    }

    /// Closest facility other than `id` itself
    pub fn nearest_other(&self, id: &FacilityId) -> Option<NearestFacility> {
        let &index = self.by_id.get(id)?;
        let (_, location) = &self.entries[index];
        self.nearest_excluding(location, Some(index))
    }

    fn nearest_excluding(&self, point: &GeoPoint, exclude: Option<usize>) -> Option<NearestFacility> {
        let query = unit_vector(point);
        let mut best: Option<(f64, usize)> = None;

        for (candidate, distance_2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if Some(candidate.data) == exclude {
                continue;
            }
            match best {
                None => best = Some((distance_2, candidate.data)),
                // Exact ties resolve to the smaller id
                Some((best_d2, best_idx)) if distance_2 == best_d2 => {
                    if self.entries[candidate.data].0 < self.entries[best_idx].0 {
                        best = Some((best_d2, candidate.data));
                    }
                }
                Some(_) => break,
            }
        }

        best.map(|(_, index)| {
            let (id, location) = &self.entries[index];
            NearestFacility {
                id: id.clone(),
                distance_miles: haversine_miles(point, location),
            }
        })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
