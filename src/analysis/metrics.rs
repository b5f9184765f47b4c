//! Redundancy metrics derived from an overlap analysis.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Facility, FacilityId, FacilityType};
use crate::overlap::OverlapAnalysis;

/// Overlap statistics for one facility type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMetrics {
    pub facility_type: FacilityType,
    pub count: usize,
    pub mean_overlaps: f64,
    pub max_overlaps: usize,
    /// Share of facilities with at least one overlap, 0-100
    pub pct_with_overlap: f64,
}

/// One line of the "most redundant" ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFacility {
    pub id: FacilityId,
    pub name: String,
    pub facility_type: FacilityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub overlap_count: usize,
}

/// Facilities grouped by city
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityBreakdown {
    pub city: String,
    pub total: usize,
    pub by_type: BTreeMap<FacilityType, usize>,
}

/// Facilities grouped by health system affiliation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliationBreakdown {
    pub affiliation: String,
    pub total: usize,
    /// Share of all facilities, 0-100
    pub pct: f64,
    pub by_type: BTreeMap<FacilityType, usize>,
}

/// Label for facilities without an affiliation
pub const INDEPENDENT: &str = "Independent";

/// Annual operating cost assumptions for the inefficiency estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Annual cost per facility type; types without an entry are not costed
    pub annual_cost: BTreeMap<FacilityType, f64>,
    /// Fraction of cost assumed recoverable through consolidation
    pub savings_fraction: f64,
    /// A facility is redundant when its overlap count is above this
    pub redundant_overlap_threshold: usize,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            annual_cost: BTreeMap::from([
                (FacilityType::RuralHealthClinic, 2_000_000.0),
                (FacilityType::FederallyQualifiedHealthCenter, 5_000_000.0),
            ]),
            savings_fraction: 0.3,
            redundant_overlap_threshold: 3,
        }
    }
}

/// Output of [`CostModel::estimate`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InefficiencyEstimate {
    pub redundant_by_type: BTreeMap<FacilityType, usize>,
    pub annual_savings: f64,
}

impl CostModel {
    pub fn estimate(&self, facilities: &[Facility], analysis: &OverlapAnalysis) -> InefficiencyEstimate {
        let mut redundant_by_type = BTreeMap::new();
        let mut annual_savings = 0.0;

        for facility in facilities {
            let Some(&cost) = self.annual_cost.get(&facility.facility_type) else {
                continue;
            };
            let overlaps = overlap_count(analysis, &facility.id);
            if overlaps > self.redundant_overlap_threshold {
                *redundant_by_type.entry(facility.facility_type).or_insert(0) += 1;
                annual_savings += cost * self.savings_fraction;
            }
        }

        InefficiencyEstimate {
            redundant_by_type,
            annual_savings,
        }
    }
}

fn overlap_count(analysis: &OverlapAnalysis, id: &FacilityId) -> usize {
    analysis
        .results
        .get(id)
        .map(|r| r.overlap_count)
        .unwrap_or(0)
}

/// Per-type overlap statistics, in [`FacilityType::all`] order.
/// Types with no facilities are left out.
pub fn type_metrics(facilities: &[Facility], analysis: &OverlapAnalysis) -> Vec<TypeMetrics> {
    FacilityType::all()
        .iter()
        .filter_map(|&kind| {
            let counts: Vec<usize> = facilities
                .iter()
                .filter(|f| f.facility_type == kind)
                .map(|f| overlap_count(analysis, &f.id))
                .collect();
            if counts.is_empty() {
                return None;
            }

            let n = counts.len() as f64;
            let with_overlap = counts.iter().filter(|&&c| c > 0).count();
            Some(TypeMetrics {
                facility_type: kind,
                count: counts.len(),
                mean_overlaps: counts.iter().sum::<usize>() as f64 / n,
                max_overlaps: counts.iter().copied().max().unwrap_or(0),
                pct_with_overlap: with_overlap as f64 / n * 100.0,
            })
        })
        .collect()
}

/// Count of neighbours by facility type, for each facility
pub fn neighbor_type_breakdown(
    facilities: &[Facility],
    analysis: &OverlapAnalysis,
) -> BTreeMap<FacilityId, BTreeMap<FacilityType, usize>> {
    let kinds: HashMap<&FacilityId, FacilityType> = facilities
        .iter()
        .map(|f| (&f.id, f.facility_type))
        .collect();

    analysis
        .results
        .iter()
        .map(|(id, result)| {
            let mut tally = BTreeMap::new();
            for neighbor in &result.neighbors {
                if let Some(&kind) = kinds.get(&neighbor.id) {
                    *tally.entry(kind).or_insert(0) += 1;
                }
            }
            (id.clone(), tally)
        })
        .collect()
}

/// Facilities with no other facility inside their service radius, sorted by id
pub fn isolated_facilities(analysis: &OverlapAnalysis) -> Vec<FacilityId> {
    analysis
        .results
        .iter()
        .filter(|(_, r)| r.is_isolated())
        .map(|(id, _)| id.clone())
        .collect()
}

/// Mean number of overlapping pairs per facility
pub fn redundancy_score(analysis: &OverlapAnalysis) -> f64 {
    if analysis.results.is_empty() {
        return 0.0;
    }
    analysis.overlapping_pairs() as f64 / analysis.results.len() as f64
}

/// The `limit` facilities with the most overlaps (ties by id)
pub fn top_redundant(
    facilities: &[Facility],
    analysis: &OverlapAnalysis,
    limit: usize,
) -> Vec<RankedFacility> {
    let mut ranked: Vec<RankedFacility> = facilities
        .iter()
        .map(|f| RankedFacility {
            id: f.id.clone(),
            name: f.name.clone(),
            facility_type: f.facility_type,
            city: f.city.clone(),
            overlap_count: overlap_count(analysis, &f.id),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.overlap_count
            .cmp(&a.overlap_count)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(limit);
    ranked
}

/// The `limit` cities with the most facilities (ties by city name).
/// Facilities without a city are skipped; names compare case-insensitively.
pub fn city_breakdown(facilities: &[Facility], limit: usize) -> Vec<CityBreakdown> {
    let mut cities: HashMap<String, CityBreakdown> = HashMap::new();

    for facility in facilities {
        let Some(city) = facility.city.as_deref().map(str::trim) else {
            continue;
        };
        if city.is_empty() {
            continue;
        }
        let entry = cities
            .entry(city.to_uppercase())
            .or_insert_with(|| CityBreakdown {
                city: city.to_uppercase(),
                total: 0,
                by_type: BTreeMap::new(),
            });
        entry.total += 1;
        *entry.by_type.entry(facility.facility_type).or_insert(0) += 1;
    }

    let mut sorted: Vec<CityBreakdown> = cities.into_values().collect();
    sorted.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.city.cmp(&b.city)));
    sorted.truncate(limit);
    sorted
}

/// Facility counts per health system, largest first (ties by name).
/// Unaffiliated facilities are grouped under [`INDEPENDENT`].
pub fn affiliation_breakdown(facilities: &[Facility]) -> Vec<AffiliationBreakdown> {
    let mut systems: HashMap<&str, AffiliationBreakdown> = HashMap::new();

    for facility in facilities {
        let name = facility
            .affiliation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(INDEPENDENT);
        let entry = systems.entry(name).or_insert_with(|| AffiliationBreakdown {
            affiliation: name.to_string(),
            total: 0,
            pct: 0.0,
            by_type: BTreeMap::new(),
        });
        entry.total += 1;
        *entry.by_type.entry(facility.facility_type).or_insert(0) += 1;
    }

    let n = facilities.len().max(1) as f64;
    let mut sorted: Vec<AffiliationBreakdown> = systems
        .into_values()
        .map(|mut b| {
            b.pct = b.total as f64 / n * 100.0;
            b
        })
        .collect();
    sorted.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.affiliation.cmp(&b.affiliation))
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::OverlapCalculator;

    fn dataset() -> Vec<Facility> {
        use FacilityType::*;
        vec![
            Facility::new("h1", "Hannibal Regional", Hospital, 39.70, -91.40)
                .unwrap()
                .with_city("Hannibal"),
            Facility::new("r1", "Clinic One", RuralHealthClinic, 39.71, -91.40)
                .unwrap()
                .with_city("HANNIBAL"),
            Facility::new("r2", "Clinic Two", RuralHealthClinic, 39.72, -91.41)
                .unwrap()
                .with_city("Hannibal"),
            Facility::new("f1", "Health Center", FederallyQualifiedHealthCenter, 39.70, -91.42)
                .unwrap()
                .with_city("Palmyra"),
            Facility::new("r3", "Remote Clinic", RuralHealthClinic, 36.60, -89.90).unwrap(),
        ]
    }

    fn analysis(facilities: &[Facility]) -> OverlapAnalysis {
        OverlapCalculator::new(20.0).unwrap().analyze(facilities).unwrap()
    }

    #[test]
    fn test_type_metrics() {
        let facilities = dataset();
        let metrics = type_metrics(&facilities, &analysis(&facilities));

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0].facility_type, FacilityType::Hospital);
        assert_eq!(metrics[0].max_overlaps, 3);

        let rhc = &metrics[1];
        assert_eq!(rhc.count, 3);
        assert_eq!(rhc.max_overlaps, 3);
        assert!((rhc.mean_overlaps - 2.0).abs() < 1e-12);
        assert!((rhc.pct_with_overlap - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_type_metrics_skips_absent_types() {
        let facilities = vec![
            Facility::new("r1", "A", FacilityType::RuralHealthClinic, 38.0, -92.0).unwrap(),
        ];
        let metrics = type_metrics(&facilities, &analysis(&facilities));
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].pct_with_overlap, 0.0);
    }

    #[test]
    fn test_neighbor_breakdown() {
        let facilities = dataset();
        let breakdown = neighbor_type_breakdown(&facilities, &analysis(&facilities));
        let h1 = &breakdown[&FacilityId::from("h1")];
        assert_eq!(h1.get(&FacilityType::RuralHealthClinic), Some(&2));
        assert_eq!(h1.get(&FacilityType::FederallyQualifiedHealthCenter), Some(&1));
        assert!(breakdown[&FacilityId::from("r3")].is_empty());
    }

    #[test]
    fn test_isolated_and_score() {
        let facilities = dataset();
        let analysis = analysis(&facilities);
        assert_eq!(isolated_facilities(&analysis), vec![FacilityId::from("r3")]);
        // 4 facilities fully connected: 6 pairs over 5 facilities
        assert!((redundancy_score(&analysis) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_top_redundant() {
        let facilities = dataset();
        let top = top_redundant(&facilities, &analysis(&facilities), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, FacilityId::from("f1"));
        assert_eq!(top[1].id, FacilityId::from("h1"));
        assert_eq!(top[0].overlap_count, 3);
    }

    #[test]
    fn test_city_breakdown() {
        let cities = city_breakdown(&dataset(), 10);
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].city, "HANNIBAL");
        assert_eq!(cities[0].total, 3);
        assert_eq!(cities[0].by_type.get(&FacilityType::RuralHealthClinic), Some(&2));
        assert_eq!(cities[1].city, "PALMYRA");
    }

    #[test]
    fn test_affiliation_breakdown() {
        let mut facilities = dataset();
        facilities[0].affiliation = Some("Hannibal Regional".to_string());
        facilities[1].affiliation = Some("Hannibal Regional".to_string());
        facilities[2].affiliation = Some("  ".to_string());

        let systems = affiliation_breakdown(&facilities);
        assert_eq!(systems.len(), 2);

        // r2 (blank), f1 and r3 have no affiliation
        assert_eq!(systems[0].affiliation, INDEPENDENT);
        assert_eq!(systems[0].total, 3);
        assert!((systems[0].pct - 60.0).abs() < 1e-9);
        assert_eq!(systems[0].by_type.get(&FacilityType::RuralHealthClinic), Some(&2));

        assert_eq!(systems[1].affiliation, "Hannibal Regional");
        assert_eq!(systems[1].total, 2);
        assert_eq!(systems[1].by_type.get(&FacilityType::Hospital), Some(&1));
        assert!((systems[1].pct - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_affiliation_breakdown_ties_by_name() {
        let facilities = vec![
            Facility::new("a", "A", FacilityType::RuralHealthClinic, 38.0, -92.0)
                .unwrap()
                .with_affiliation("Mosaic"),
            Facility::new("b", "B", FacilityType::RuralHealthClinic, 38.5, -92.0)
                .unwrap()
                .with_affiliation("BJC"),
        ];
        let names: Vec<String> = affiliation_breakdown(&facilities)
            .into_iter()
            .map(|b| b.affiliation)
            .collect();
        assert_eq!(names, vec!["BJC", "Mosaic"]);
        assert!(affiliation_breakdown(&[]).is_empty());
    }

    #[test]
    fn test_inefficiency_estimate() {
        let facilities = dataset();
        let analysis = analysis(&facilities);

        // Nobody has more than 3 overlaps with the default threshold
        let default = CostModel::default().estimate(&facilities, &analysis);
        assert_eq!(default.annual_savings, 0.0);

        let model = CostModel {
            redundant_overlap_threshold: 2,
            ..CostModel::default()
        };
        let estimate = model.estimate(&facilities, &analysis);
        // r1, r2 (RHC) and f1 (FQHC) have 3 overlaps; h1 is not costed
        assert_eq!(
            estimate.redundant_by_type.get(&FacilityType::RuralHealthClinic),
            Some(&2)
        );
        let expected = 2.0 * 2_000_000.0 * 0.3 + 5_000_000.0 * 0.3;
        assert!((estimate.annual_savings - expected).abs() < 1e-6);
    }
}
