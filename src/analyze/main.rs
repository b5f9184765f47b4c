//! Facility overlap analysis CLI.
//!
//! Loads a facility CSV, computes service-area overlaps and clusters,
//! and writes `report.json` and `facilities.csv` to the output directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use service_area::analysis::check_colocated;
use service_area::config::AnalysisConfig;
use service_area::loader::load_dataset;
use service_area::report::{build_report, Report};

#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(about = "Compute service-area overlaps and redundancy hotspots for healthcare facilities")]
struct Args {
    /// Facility CSV file (.csv or .csv.gz)
    #[arg(short, long)]
    input: PathBuf,

    /// Service radius in miles (overrides config)
    #[arg(short, long)]
    radius: Option<f64>,

    /// Output directory for report files
    #[arg(short, long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Optional TOML analysis config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Region preset facilities must fall inside: world, missouri
    #[arg(long)]
    region: Option<String>,

    /// Length of the top-redundant and city rankings
    #[arg(long)]
    top: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(args) {
        error!("Analysis failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    info!("Service Area Overlap Analysis");
    info!("Input: {}", args.input.display());

    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load_from_file(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(radius) = args.radius {
        config.radius_miles = radius;
    }
    if let Some(region) = args.region {
        config.region = Some(region);
        config.bounds = None;
    }
    if let Some(top) = args.top {
        config.top_n = top;
    }
    info!("Service radius: {} miles", config.radius_miles);

    let dataset = load_dataset(&args.input)
        .with_context(|| format!("Loading facilities from {}", args.input.display()))?;

    check_colocated(&dataset.facilities, &config.verified_set())
        .context("Co-location check failed")?;

    let report = build_report(&dataset, &config)?;
    log_summary(&report);

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output dir {}", args.output_dir.display())
    })?;
    report.write_json(&args.output_dir.join("report.json"))?;
    report.write_facility_csv(&args.output_dir.join("facilities.csv"))?;

    info!("Analysis complete, results in {}", args.output_dir.display());
    Ok(())
}

fn log_summary(report: &Report) {
    let summary = &report.summary;
    info!(
        "{} facilities, {} overlapping pairs, redundancy score {:.2}",
        summary.total_facilities, summary.overlapping_pairs, summary.redundancy_score
    );

    for metrics in &summary.type_metrics {
        info!(
            "  {}: {} facilities, mean overlaps {:.1}, max {}, {:.1}% with overlap",
            metrics.facility_type.label(),
            metrics.count,
            metrics.mean_overlaps,
            metrics.max_overlaps,
            metrics.pct_with_overlap
        );
    }

    info!(
        "{} clusters, {} redundancy hotspots",
        summary.clusters, summary.hotspots
    );
    for ranked in summary.top_redundant.iter().take(5) {
        info!(
            "  {} ({}) overlaps with {} facilities",
            ranked.name,
            ranked.facility_type.label(),
            ranked.overlap_count
        );
    }

    info!(
        "{} consolidation candidates (3+ facilities within {} miles of a high-overlap site)",
        summary.consolidation_clusters, report.metadata.consolidation_radius_miles
    );
    for group in report.consolidation.iter().take(5) {
        info!(
            "  Group {} - {} area: {} facilities",
            group.id,
            group.city.as_deref().unwrap_or("Multiple"),
            group.len()
        );
    }

    info!("Facilities by health system:");
    for system in &summary.affiliations {
        info!(
            "  {}: {} facilities ({:.1}%)",
            system.affiliation, system.total, system.pct
        );
    }

    if summary.isolated_facilities > 0 {
        warn!(
            "{} facilities have no other facility within {} miles",
            summary.isolated_facilities, report.metadata.radius_miles
        );
    }

    info!(
        "Estimated annual inefficiency: ${:.0}",
        summary.inefficiency.annual_savings
    );
}
