//! Proximity clustering over the overlap graph.

use hashbrown::HashMap;
use serde::Serialize;
use std::collections::BTreeMap;

use super::OverlapResult;
use crate::models::FacilityId;

/// Minimum cluster size flagged as a redundancy hotspot
pub const HOTSPOT_MIN_SIZE: usize = 3;

/// Components smaller than this are isolated facilities, not clusters
pub const MIN_CLUSTER_SIZE: usize = 2;

/// Disjoint-set forest with path compression and union by rank
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]); // Path compression
        }
        self.parent[x]
    }

    pub fn union(&mut self, x: usize, y: usize) {
        let px = self.find(x);
        let py = self.find(y);
        if px == py {
            return;
        }
        if self.rank[px] < self.rank[py] {
            self.parent[px] = py;
        } else if self.rank[px] > self.rank[py] {
            self.parent[py] = px;
        } else {
            self.parent[py] = px;
            self.rank[px] += 1;
        }
    }
}

/// A connected component of the proximity graph with at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    /// 1-based, assigned after ordering by size (largest first)
    pub id: usize,
    /// Sorted by facility id
    pub members: Vec<FacilityId>,
    pub is_hotspot: bool,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &FacilityId) -> bool {
        self.members.binary_search(id).is_ok()
    }
}

/// Group facilities into connected components of the overlap graph.
///
/// Singletons are dropped: an isolated facility belongs to no cluster.
/// Output order is size descending, then first member id.
pub fn clusters_from_overlaps(
    results: &BTreeMap<FacilityId, OverlapResult>,
    hotspot_min_size: usize,
) -> Vec<Cluster> {
    let index: HashMap<&FacilityId, usize> =
        results.keys().enumerate().map(|(i, id)| (id, i)).collect();
    let ids: Vec<&FacilityId> = results.keys().collect();

    let mut uf = UnionFind::new(ids.len());
    for (id, result) in results {
        let a = index[id];
        for neighbor in &result.neighbors {
            if let Some(&b) = index.get(&neighbor.id) {
                uf.union(a, b);
            }
        }
    }

    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..ids.len() {
        let root = uf.find(i);
        components.entry(root).or_default().push(i);
    }

    // Indices follow BTreeMap key order, so members come out sorted by id
    let mut groups: Vec<Vec<FacilityId>> = components
        .into_values()
        .filter(|members| members.len() >= MIN_CLUSTER_SIZE)
        .map(|members| members.into_iter().map(|i| ids[i].clone()).collect())
        .collect();

    groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));

    groups
        .into_iter()
        .enumerate()
        .map(|(i, members)| Cluster {
            id: i + 1,
            is_hotspot: members.len() >= hotspot_min_size,
            members,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::Neighbor;

    fn graph(edges: &[(&str, &str)], nodes: &[&str]) -> BTreeMap<FacilityId, OverlapResult> {
        let mut results: BTreeMap<FacilityId, OverlapResult> = nodes
            .iter()
            .map(|n| (FacilityId::from(*n), OverlapResult::default()))
            .collect();
        for (a, b) in edges {
            for (from, to) in [(a, b), (b, a)] {
                let entry = results.get_mut(&FacilityId::from(*from)).unwrap();
                entry.neighbors.push(Neighbor {
                    id: FacilityId::from(*to),
                    distance_miles: 1.0,
                });
                entry.overlap_count += 1;
            }
        }
        results
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(3, 4);
        uf.union(1, 4);
        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(0), uf.find(2));
    }

    #[test]
    fn test_chain_forms_one_cluster() {
        // a-b and b-c overlap, a-c do not: still one component
        let results = graph(&[("a", "b"), ("b", "c")], &["a", "b", "c", "d"]);
        let clusters = clusters_from_overlaps(&results, HOTSPOT_MIN_SIZE);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, 1);
        assert_eq!(clusters[0].len(), 3);
        assert!(clusters[0].is_hotspot);
        assert!(!clusters[0].contains(&FacilityId::from("d")));
    }

    #[test]
    fn test_cluster_ordering() {
        let results = graph(
            &[("x", "y"), ("a", "b"), ("m", "n"), ("n", "o")],
            &["a", "b", "m", "n", "o", "x", "y", "z"],
        );
        let clusters = clusters_from_overlaps(&results, HOTSPOT_MIN_SIZE);

        let members: Vec<Vec<&str>> = clusters
            .iter()
            .map(|c| c.members.iter().map(|m| m.as_str()).collect())
            .collect();
        assert_eq!(
            members,
            vec![vec!["m", "n", "o"], vec!["a", "b"], vec!["x", "y"]]
        );
        assert_eq!(
            clusters.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(clusters[0].is_hotspot);
        assert!(!clusters[1].is_hotspot);
    }

    #[test]
    fn test_no_edges_no_clusters() {
        let results = graph(&[], &["a", "b"]);
        assert!(clusters_from_overlaps(&results, HOTSPOT_MIN_SIZE).is_empty());
    }
}
