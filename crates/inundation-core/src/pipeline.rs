//! Pipeline orchestrator: runs every stage for one region in order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::coords::{centroid, LatLon};
use crate::epochs::{EpochSet, MeasurementPoint};
use crate::error::{Error, Result};
use crate::idw::interpolate;
use crate::kdtree::SamplePoint;
use crate::projection::{ensure_region_value, project_displacement, projection_years, relative_sea_level_rise};
use crate::raster::{ElevationGrid, RiskGrid, RslrGrid};
use crate::risk::{compute_risk, RepairStats};
use crate::trend::TrendExtractor;

// ── Public structs ────────────────────────────────────────────────────────────

/// Per-point result of trend fitting and projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointEstimate {
    /// Position in the input point slice.
    pub index: usize,
    pub location: LatLon,
    /// Point height from the input, passed through to the report.
    pub elevation_m: Option<f64>,
    pub velocity_mm_per_year: f64,
    pub correction_mm_per_year: f64,
    pub extrapolated_correction: bool,
    pub epochs_used: usize,
    pub displacement_m: f64,
    pub rslr_m: f64,
}

/// A point left out of interpolation, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPoint {
    pub index: usize,
    pub location: LatLon,
    pub reason: String,
}

/// Stage counts for logging and the CLI report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub points_total: usize,
    pub points_fitted: usize,
    pub points_skipped: Vec<SkippedPoint>,
    pub extrapolated_corrections: usize,
    /// Days since the first epoch at which every velocity is evaluated.
    pub regression_midpoint_days: f64,
    pub projection_years: i32,
    pub region_sea_level_rise_m: f64,
    pub total_cells: usize,
    pub coastal_cells: usize,
    pub repair: RepairStats,
    pub determined_cells: usize,
    pub undetermined_cells: usize,
}

/// Full output of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub estimates: Vec<PointEstimate>,
    pub rslr_grid: RslrGrid,
    pub risk_grid: RiskGrid,
    pub report: PipelineReport,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

/// Run the full risk pipeline for one region.
///
/// Stage order:
///   1. Trend extraction (per point, shared midpoint)
///   2. Displacement projection and RSLR
///   3. IDW onto the DEM's coastal cells
///   4. Risk ratio, negative-cell repair, percentage scaling
///
/// Points with too little data are skipped and reported; every other error
/// aborts the run. `today` fixes the projection horizon.
pub fn run_pipeline(
    epochs: &EpochSet,
    points: &[MeasurementPoint],
    region_sea_level_rise_m: f64,
    dem: &ElevationGrid,
    config: &PipelineConfig,
    today: NaiveDate,
) -> Result<PipelineResult> {
    config.validate()?;
    let locations: Vec<LatLon> = points.iter().map(|p| p.location).collect();
    let Some(region_centre) = centroid(&locations) else {
        return Err(Error::EmptyPointSet);
    };
    let slr = ensure_region_value(region_sea_level_rise_m, region_centre.lat, region_centre.lon)?;
    let years = projection_years(&config.projection, today);

    // ── 1–2. Trend fit and projection ───────────────────────────────────────
    let extractor = TrendExtractor::new(epochs, &config.trend);
    let mut estimates = Vec::with_capacity(points.len());
    let mut skipped = Vec::new();

    for (index, point) in points.iter().enumerate() {
        let fit = match extractor.extract(point) {
            Ok(fit) => fit,
            Err(e @ Error::InsufficientData { .. }) => {
                warn!(index, lat = point.location.lat, lon = point.location.lon, "skipping point: {e}");
                skipped.push(SkippedPoint { index, location: point.location, reason: e.to_string() });
                continue;
            }
            Err(e) => return Err(e),
        };

        let displacement_m = project_displacement(fit.velocity_mm_per_year, years);
        estimates.push(PointEstimate {
            index,
            location: point.location,
            elevation_m: point.elevation,
            velocity_mm_per_year: fit.velocity_mm_per_year,
            correction_mm_per_year: fit.correction_mm_per_year,
            extrapolated_correction: fit.extrapolated_correction,
            epochs_used: fit.epochs_used,
            displacement_m,
            rslr_m: relative_sea_level_rise(slr, displacement_m),
        });
    }
    info!(
        fitted = estimates.len(),
        skipped = skipped.len(),
        midpoint_days = extractor.midpoint(),
        projection_years = years,
        "trend extraction finished"
    );

    if estimates.is_empty() {
        return Err(Error::EmptyPointSet);
    }

    // ── 3. Interpolation ────────────────────────────────────────────────────
    let samples: Vec<SamplePoint> = estimates
        .iter()
        .map(|e| {
            let (x, y) = e.location.xy();
            SamplePoint::new(x, y, e.rslr_m)
        })
        .collect();
    let rslr_grid = interpolate(&samples, dem, &config.idw)?;
    let coastal_cells = rslr_grid.determined_count();

    // ── 4. Risk ─────────────────────────────────────────────────────────────
    let outcome = compute_risk(&rslr_grid, dem, &config.repair)?;
    let total_cells = outcome.risk.data.len();
    let determined_cells = outcome.risk.determined_count();
    info!(
        coastal = coastal_cells,
        repaired = outcome.repair.repaired_cells,
        determined = determined_cells,
        cells = total_cells,
        "risk raster ready"
    );

    let report = PipelineReport {
        points_total: points.len(),
        points_fitted: estimates.len(),
        extrapolated_corrections: estimates.iter().filter(|e| e.extrapolated_correction).count(),
        points_skipped: skipped,
        regression_midpoint_days: extractor.midpoint(),
        projection_years: years,
        region_sea_level_rise_m: slr,
        total_cells,
        coastal_cells,
        repair: outcome.repair,
        determined_cells,
        undetermined_cells: total_cells - determined_cells,
    };

    Ok(PipelineResult { estimates, rslr_grid, risk_grid: outcome.risk, report })
}
