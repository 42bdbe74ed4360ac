//! Command-line runner: loads one region's inputs, runs the risk pipeline and
//! writes the risk raster (JSON and GeoTIFF) plus a run report.

mod geotiff;
mod points;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use inundation_core::coords::centroid;
use inundation_core::pipeline::PipelineResult;
use inundation_core::sea_level::SeaLevelTrendGrid;
use inundation_core::{run_pipeline, ElevationGrid, LatLon, PipelineConfig, PipelineReport, PointEstimate};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "inundation", about = "Coastal inundation risk from ground motion, sea level and a DEM")]
struct Args {
    /// Ground-motion points (GeoJSON FeatureCollection, YYYYMMDD properties).
    #[arg(short, long)]
    points: PathBuf,

    /// DEM as GeoTIFF (.tif/.tiff) or serialised ElevationGrid JSON.
    #[arg(short, long)]
    dem: PathBuf,

    /// Region sea-level rise over the 10-year horizon, metres.
    #[arg(long, conflicts_with = "slr_grid", required_unless_present = "slr_grid")]
    slr: Option<f64>,

    /// Gridded sea-level trend (mm/yr) JSON, resolved at the points' centroid.
    #[arg(long)]
    slr_grid: Option<PathBuf>,

    /// Pipeline configuration JSON; omitted fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Date the projection horizon is counted from (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Output directory.
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Add the latitude-dependent reference-frame correction to velocities.
    #[arg(long)]
    correct_reference_frame: bool,

    /// Override the coastal elevation threshold (m).
    #[arg(long)]
    coastal_threshold: Option<f64>,

    /// Override the IDW neighbour count.
    #[arg(long)]
    neighbours: Option<usize>,

    /// Override the minimum positive cells needed to repair a negative cell.
    #[arg(long)]
    min_valid: Option<usize>,

    /// Override the largest repair window side (odd).
    #[arg(long)]
    max_window: Option<usize>,

    /// Verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,
}

/// Contents of `report.json`.
#[derive(Serialize)]
struct RunReport<'a> {
    today: NaiveDate,
    config: &'a PipelineConfig,
    summary: &'a PipelineReport,
    points: &'a [PointEstimate],
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };

    if args.correct_reference_frame {
        config.trend.apply_reference_frame_correction = true;
    }
    if let Some(v) = args.coastal_threshold {
        config.idw.coastal_threshold_m = v;
    }
    if let Some(v) = args.neighbours {
        config.idw.neighbours = v;
    }
    if let Some(v) = args.min_valid {
        config.repair.min_valid = v;
    }
    if let Some(v) = args.max_window {
        config.repair.max_window = v;
    }
    config.validate()?;
    Ok(config)
}

fn load_dem(path: &Path) -> Result<ElevationGrid> {
    let is_tiff = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"));
    if is_tiff {
        return geotiff::read_dem(path);
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn region_sea_level(args: &Args, locations: &[LatLon]) -> Result<f64> {
    if let Some(v) = args.slr {
        return Ok(v);
    }
    let path = args.slr_grid.as_ref().context("either --slr or --slr-grid is required")?;
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let grid: SeaLevelTrendGrid = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let centre = centroid(locations).context("no points to locate the region")?;
    let slr = grid.resolve(centre)?;
    info!(lat = centre.lat, lon = centre.lon, slr_m = slr, "region sea-level rise resolved");
    Ok(slr)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn write_outputs(result: &PipelineResult, config: &PipelineConfig, today: NaiveDate, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    write_json(&result.risk_grid, &dir.join("risk.json"))?;
    geotiff::write_risk(&result.risk_grid, &dir.join("risk.tif"))?;
    let report = RunReport { today, config, summary: &result.report, points: &result.estimates };
    write_json(&report, &dir.join("report.json"))?;

    info!(dir = %dir.display(), "outputs written");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose)?;

    let config = load_config(&args)?;
    let today = args.today.unwrap_or_else(|| chrono::Local::now().date_naive());

    let (epochs, points) = points::load_points(&args.points)?;
    info!(points = points.len(), epochs = epochs.len(), "points loaded");

    let dem = load_dem(&args.dem)?;
    info!(width = dem.width(), height = dem.height(), crs = ?dem.grid.crs, "DEM loaded");

    let locations: Vec<LatLon> = points.iter().map(|p| p.location).collect();
    let slr = region_sea_level(&args, &locations)?;

    let result = run_pipeline(&epochs, &points, slr, &dem, &config, today)?;
    write_outputs(&result, &config, today, &args.output)?;

    let r = &result.report;
    println!(
        "{} of {} points fitted, {} of {} cells determined",
        r.points_fitted, r.points_total, r.determined_cells, r.total_cells
    );
    Ok(())
}
