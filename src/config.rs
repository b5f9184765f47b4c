use anyhow::{bail, Context, Result};
use hashbrown::HashSet;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::analysis::{CostModel, CONSOLIDATION_MIN_OVERLAPS, DEFAULT_SWEEP_RADII};
use crate::models::{FacilityId, RegionBounds};
use crate::overlap::{DEFAULT_SERVICE_RADIUS_MILES, HOTSPOT_MIN_SIZE};

/// Analysis settings, usually read from a TOML file.
///
/// ```toml
/// radius_miles = 20.0
/// region = "missouri"
/// sweep_radii = [10.0, 20.0, 30.0]
/// consolidation_min_overlaps = 5
/// verified_colocated = ["rhc-0113", "rhc-0114"]
///
/// [cost]
/// savings_fraction = 0.3
/// redundant_overlap_threshold = 3
///
/// [cost.annual_cost]
/// rural_health_clinic = 2000000.0
/// federally_qualified_health_center = 5000000.0
/// ```
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub radius_miles: f64,
    /// Named region preset ("world", "missouri")
    pub region: Option<String>,
    /// Explicit bounds; takes precedence over `region`
    pub bounds: Option<RegionBounds>,
    pub hotspot_min_size: usize,
    /// Length of the top-redundant and city rankings
    pub top_n: usize,
    pub sweep_radii: Vec<f64>,
    /// Overlap count a facility needs to seed a consolidation group
    pub consolidation_min_overlaps: usize,
    /// Grouping radius for consolidation; half of `radius_miles` when unset
    pub consolidation_radius_miles: Option<f64>,
    /// Facility ids confirmed to share a building with another facility
    pub verified_colocated: Vec<String>,
    pub cost: CostModel,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            radius_miles: DEFAULT_SERVICE_RADIUS_MILES,
            region: None,
            bounds: None,
            hotspot_min_size: HOTSPOT_MIN_SIZE,
            top_n: 15,
            sweep_radii: DEFAULT_SWEEP_RADII.to_vec(),
            consolidation_min_overlaps: CONSOLIDATION_MIN_OVERLAPS,
            consolidation_radius_miles: None,
            verified_colocated: Vec::new(),
            cost: CostModel::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: AnalysisConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Region of interest: explicit bounds, then preset, then the whole world
    pub fn resolve_bounds(&self) -> Result<RegionBounds> {
        if let Some(bounds) = self.bounds {
            if bounds.min_lat > bounds.max_lat || bounds.min_lon > bounds.max_lon {
                bail!("Region bounds are inverted: {:?}", bounds);
            }
            return Ok(bounds);
        }
        match &self.region {
            Some(name) => match RegionBounds::preset(name) {
                Some(bounds) => Ok(bounds),
                None => bail!("Unknown region preset '{}'", name),
            },
            None => Ok(RegionBounds::world()),
        }
    }

    pub fn consolidation_radius(&self) -> Result<f64> {
        let radius = self
            .consolidation_radius_miles
            .unwrap_or(self.radius_miles / 2.0);
        if !radius.is_finite() || radius <= 0.0 {
            bail!("Consolidation radius must be positive, got {}", radius);
        }
        Ok(radius)
    }

    pub fn verified_set(&self) -> HashSet<FacilityId> {
        self.verified_colocated
            .iter()
            .map(|id| FacilityId::new(id.trim()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FacilityType;

    #[test]
    fn test_defaults() {
        let config: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(config.radius_miles, 20.0);
        assert_eq!(config.hotspot_min_size, 3);
        assert_eq!(config.sweep_radii, vec![10.0, 20.0, 30.0]);
        assert_eq!(config.resolve_bounds().unwrap(), RegionBounds::world());
    }

    #[test]
    fn test_full_file() {
        let text = r#"
            radius_miles = 15.0
            region = "missouri"
            top_n = 5
            verified_colocated = ["a", " b "]

            [cost]
            savings_fraction = 0.25

            [cost.annual_cost]
            hospital = 10000000.0
        "#;
        let config: AnalysisConfig = toml::from_str(text).unwrap();
        assert_eq!(config.radius_miles, 15.0);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.resolve_bounds().unwrap(), RegionBounds::missouri());
        assert!(config.verified_set().contains(&FacilityId::from("b")));

        assert_eq!(config.cost.savings_fraction, 0.25);
        assert_eq!(config.cost.redundant_overlap_threshold, 3);
        assert_eq!(
            config.cost.annual_cost.get(&FacilityType::Hospital),
            Some(&10_000_000.0)
        );
        assert!(config
            .cost
            .annual_cost
            .get(&FacilityType::RuralHealthClinic)
            .is_none());
    }

    #[test]
    fn test_explicit_bounds_win() {
        let text = r#"
            region = "missouri"
            [bounds]
            min_lat = 30.0
            min_lon = -100.0
            max_lat = 45.0
            max_lon = -80.0
        "#;
        let config: AnalysisConfig = toml::from_str(text).unwrap();
        assert_eq!(
            config.resolve_bounds().unwrap(),
            RegionBounds::new(30.0, -100.0, 45.0, -80.0)
        );
    }

    #[test]
    fn test_bad_region() {
        let config = AnalysisConfig {
            region: Some("narnia".to_string()),
            ..AnalysisConfig::default()
        };
        assert!(config.resolve_bounds().is_err());

        let config = AnalysisConfig {
            bounds: Some(RegionBounds::new(40.0, -90.0, 35.0, -95.0)),
            ..AnalysisConfig::default()
        };
        assert!(config.resolve_bounds().is_err());
    }

    #[test]
    fn test_consolidation_radius() {
        let config = AnalysisConfig {
            radius_miles: 30.0,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.consolidation_min_overlaps, 5);
        assert_eq!(config.consolidation_radius().unwrap(), 15.0);

        let config: AnalysisConfig = toml::from_str("consolidation_radius_miles = 8.0").unwrap();
        assert_eq!(config.consolidation_radius().unwrap(), 8.0);

        let config: AnalysisConfig = toml::from_str("consolidation_radius_miles = 0.0").unwrap();
        assert!(config.consolidation_radius().is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<AnalysisConfig>("radius = 20.0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, "radius_miles = 30.0\n").unwrap();
        assert_eq!(AnalysisConfig::load_from_file(&path).unwrap().radius_miles, 30.0);
        assert!(AnalysisConfig::load_from_file(dir.path().join("missing.toml")).is_err());
    }
}
