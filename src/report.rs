//! Report assembly and serialization.
//!
//! The report is the only artifact of a run: a JSON document for downstream
//! map rendering plus a flat per-facility CSV for spreadsheets.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::analysis::{
    affiliation_breakdown, city_breakdown, consolidation_clusters, isolated_facilities,
    neighbor_type_breakdown, radius_sweep, redundancy_score, top_redundant, type_metrics,
    AffiliationBreakdown, CityBreakdown, ConsolidationGroup, InefficiencyEstimate, RankedFacility,
    SweepPoint, TypeMetrics,
};
use crate::config::AnalysisConfig;
use crate::loader::Dataset;
use crate::models::{Facility, FacilityId, FacilityType, RegionBounds};
use crate::overlap::{Cluster, Neighbor, OverlapAnalysis, OverlapCalculator};
use crate::spatial::{FacilityIndex, NearestFacility};

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub dataset: String,
    /// Hex xxh64 of the input file
    pub dataset_xxh64: String,
    pub radius_miles: f64,
    pub region: RegionBounds,
    pub hotspot_min_size: usize,
    pub consolidation_radius_miles: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_facilities: usize,
    pub by_type: BTreeMap<FacilityType, usize>,
    pub overlapping_pairs: usize,
    pub redundancy_score: f64,
    pub isolated_facilities: usize,
    pub clusters: usize,
    pub hotspots: usize,
    pub consolidation_clusters: usize,
    pub type_metrics: Vec<TypeMetrics>,
    pub top_redundant: Vec<RankedFacility>,
    pub cities: Vec<CityBreakdown>,
    pub affiliations: Vec<AffiliationBreakdown>,
    pub inefficiency: InefficiencyEstimate,
}

/// Per-facility entry of the report
#[derive(Debug, Clone, Serialize)]
pub struct FacilityReport {
    #[serde(flatten)]
    pub facility: Facility,
    pub overlap_count: usize,
    pub neighbors: Vec<Neighbor>,
    pub neighbor_types: BTreeMap<FacilityType, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest: Option<NearestFacility>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: Summary,
    pub facilities: Vec<FacilityReport>,
    pub clusters: Vec<Cluster>,
    pub consolidation: Vec<ConsolidationGroup>,
    pub isolated: Vec<FacilityId>,
    pub sweep: Vec<SweepPoint>,
}

/// Flat row of `facilities.csv`
#[derive(Debug, Serialize)]
struct FacilityRow<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    facility_type: String,
    latitude: f64,
    longitude: f64,
    overlap_count: usize,
    cluster_id: Option<usize>,
    nearest_id: Option<&'a str>,
    nearest_miles: Option<f64>,
    neighbor_ids: String,
}

/// Run the full analysis for a loaded dataset
pub fn build_report(dataset: &Dataset, config: &AnalysisConfig) -> Result<Report> {
    let bounds = config.resolve_bounds()?;
    let consolidation_radius = config.consolidation_radius()?;
    let facilities = &dataset.facilities;

    let analysis = OverlapCalculator::new(config.radius_miles)?
        .with_bounds(bounds)
        .with_hotspot_min_size(config.hotspot_min_size)
        .analyze(facilities)
        .context("Overlap computation failed")?;

    let sweep = radius_sweep(facilities, &config.sweep_radii, bounds, config.hotspot_min_size)
        .context("Radius sweep failed")?;

    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        dataset: dataset.path.display().to_string(),
        dataset_xxh64: format!("{:016x}", dataset.source_hash),
        radius_miles: config.radius_miles,
        region: bounds,
        hotspot_min_size: config.hotspot_min_size,
        consolidation_radius_miles: consolidation_radius,
    };

    Ok(assemble(metadata, facilities, &analysis, sweep, config))
}

fn assemble(
    metadata: ReportMetadata,
    facilities: &[Facility],
    analysis: &OverlapAnalysis,
    sweep: Vec<SweepPoint>,
    config: &AnalysisConfig,
) -> Report {
    let index = FacilityIndex::build(facilities);
    let membership = analysis.cluster_membership();
    let mut neighbor_types = neighbor_type_breakdown(facilities, analysis);

    let mut by_type = BTreeMap::new();
    for facility in facilities {
        *by_type.entry(facility.facility_type).or_insert(0) += 1;
    }

    let isolated = isolated_facilities(analysis);
    let consolidation = consolidation_clusters(
        facilities,
        analysis,
        config.consolidation_min_overlaps,
        metadata.consolidation_radius_miles,
    );

    let summary = Summary {
        total_facilities: facilities.len(),
        by_type,
        overlapping_pairs: analysis.overlapping_pairs(),
        redundancy_score: redundancy_score(analysis),
        isolated_facilities: isolated.len(),
        clusters: analysis.clusters.len(),
        hotspots: analysis.hotspots().count(),
        consolidation_clusters: consolidation.len(),
        type_metrics: type_metrics(facilities, analysis),
        top_redundant: top_redundant(facilities, analysis, config.top_n),
        cities: city_breakdown(facilities, config.top_n),
        affiliations: affiliation_breakdown(facilities),
        inefficiency: config.cost.estimate(facilities, analysis),
    };

    let mut entries: Vec<FacilityReport> = facilities
        .iter()
        .map(|facility| {
            let result = analysis.results.get(&facility.id);
            FacilityReport {
                facility: facility.clone(),
                overlap_count: result.map(|r| r.overlap_count).unwrap_or(0),
                neighbors: result.map(|r| r.neighbors.clone()).unwrap_or_default(),
                neighbor_types: neighbor_types.remove(&facility.id).unwrap_or_default(),
                cluster_id: membership.get(&facility.id).copied(),
                nearest: index.nearest_other(&facility.id),
            }
        })
        .collect();
    entries.sort_by(|a, b| a.facility.id.cmp(&b.facility.id));

    Report {
        metadata,
        summary,
        facilities: entries,
        clusters: analysis.clusters.clone(),
        consolidation,
        isolated,
        sweep,
    }
}

impl Report {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).context("Failed to serialize report")?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        info!("Wrote report to {}", path.display());
        Ok(())
    }

    pub fn write_facility_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        for entry in &self.facilities {
            let neighbor_ids: Vec<&str> = entry.neighbors.iter().map(|n| n.id.as_str()).collect();
            writer.serialize(FacilityRow {
                id: entry.facility.id.as_str(),
                name: &entry.facility.name,
                facility_type: entry.facility.facility_type.to_string(),
                latitude: entry.facility.location.lat,
                longitude: entry.facility.location.lon,
                overlap_count: entry.overlap_count,
                cluster_id: entry.cluster_id,
                nearest_id: entry.nearest.as_ref().map(|n| n.id.as_str()),
                nearest_miles: entry.nearest.as_ref().map(|n| n.distance_miles),
                neighbor_ids: neighbor_ids.join(";"),
            })?;
        }

        writer.flush()?;
        info!(
            "Wrote {} facility rows to {}",
            self.facilities.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dataset() -> Dataset {
        use FacilityType::*;
        let facilities = vec![
            Facility::new("a", "Alpha Hospital", Hospital, 38.00, -92.00)
                .unwrap()
                .with_city("Fulton"),
            Facility::new("b", "Beta Clinic", RuralHealthClinic, 38.01, -92.00)
                .unwrap()
                .with_city("Fulton"),
            Facility::new("c", "Gamma Center", FederallyQualifiedHealthCenter, 40.00, -92.00)
                .unwrap(),
        ];
        Dataset {
            path: PathBuf::from("facilities.csv"),
            source_hash: 0xabcdef,
            facilities,
        }
    }

    #[test]
    fn test_build_report() {
        let report = build_report(&dataset(), &AnalysisConfig::default()).unwrap();

        assert_eq!(report.metadata.dataset_xxh64, "0000000000abcdef");
        assert_eq!(report.summary.total_facilities, 3);
        assert_eq!(report.summary.overlapping_pairs, 1);
        assert_eq!(report.summary.clusters, 1);
        assert_eq!(report.summary.hotspots, 0);
        assert_eq!(report.summary.consolidation_clusters, 0);
        assert_eq!(report.metadata.consolidation_radius_miles, 10.0);
        assert_eq!(report.summary.affiliations.len(), 1);
        assert_eq!(report.summary.affiliations[0].affiliation, "Independent");
        assert_eq!(report.summary.affiliations[0].total, 3);
        assert_eq!(report.isolated, vec![FacilityId::from("c")]);
        assert_eq!(report.sweep.len(), 3);

        let a = &report.facilities[0];
        assert_eq!(a.facility.id, FacilityId::from("a"));
        assert_eq!(a.overlap_count, 1);
        assert_eq!(a.cluster_id, Some(1));
        assert_eq!(a.neighbor_types.get(&FacilityType::RuralHealthClinic), Some(&1));

        let c = &report.facilities[2];
        assert_eq!(c.cluster_id, None);
        assert_eq!(c.nearest.as_ref().unwrap().id, FacilityId::from("b"));
        assert!(c.nearest.as_ref().unwrap().distance_miles > 130.0);
    }

    #[test]
    fn test_report_consolidation() {
        let config = AnalysisConfig {
            consolidation_min_overlaps: 1,
            consolidation_radius_miles: Some(5.0),
            ..AnalysisConfig::default()
        };
        let mut dataset = dataset();
        dataset.facilities.push(
            Facility::new("d", "Delta Clinic", FacilityType::RuralHealthClinic, 38.02, -92.00)
                .unwrap()
                .with_affiliation("Capital Region"),
        );

        let report = build_report(&dataset, &config).unwrap();
        assert_eq!(report.summary.consolidation_clusters, 1);
        assert_eq!(report.consolidation[0].seed, FacilityId::from("a"));
        assert_eq!(report.consolidation[0].city.as_deref(), Some("FULTON"));
        assert_eq!(report.summary.affiliations[0].total, 3);
        assert_eq!(report.summary.affiliations[1].affiliation, "Capital Region");
    }

    #[test]
    fn test_build_report_rejects_out_of_region() {
        let config = AnalysisConfig {
            bounds: Some(RegionBounds::new(37.0, -93.0, 39.0, -91.0)),
            ..AnalysisConfig::default()
        };
        assert!(build_report(&dataset(), &config).is_err());
    }

    #[test]
    fn test_json_shape() {
        let report = build_report(&dataset(), &AnalysisConfig::default()).unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["summary"]["by_type"]["hospital"], 1);
        assert_eq!(value["facilities"][0]["type"], "hospital");
        assert_eq!(value["facilities"][0]["location"]["lat"], 38.0);
        assert_eq!(value["facilities"][0]["neighbors"][0]["id"], "b");
        assert!(value["facilities"][2].get("cluster_id").is_none());
        assert_eq!(value["clusters"][0]["members"][1], "b");
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let report = build_report(&dataset(), &AnalysisConfig::default()).unwrap();

        let json_path = dir.path().join("report.json");
        report.write_json(&json_path).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed["summary"]["total_facilities"], 3);

        let csv_path = dir.path().join("facilities.csv");
        report.write_facility_csv(&csv_path).unwrap();
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "id");
        assert_eq!(&headers[2], "type");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][9], "b");
        assert_eq!(&rows[2][6], "");
        assert_eq!(&rows[2][7], "b");
    }
}
