//! Inundation risk raster: ratio, negative-cell repair, percentage scaling.
//!
//! raw = rslr / elevation on cells where both are known and elevation ≠ 0.
//! Negative raw values are replaced by the mean of the strictly positive raw
//! values in the smallest odd window (3×3, 5×5, … up to the maximum) that
//! holds at least `min_valid` of them; if no window qualifies the cell becomes
//! undetermined. Every window is read from the raw snapshot, never from
//! already repaired cells, so the result does not depend on scan order.
//! Finally values are clipped to [0, 1], scaled by 100 and rounded
//! (ties to even).

#[cfg(feature = "threading")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RepairParams;
use crate::error::Result;
use crate::raster::{ElevationGrid, Grid, RiskGrid, RslrGrid};

/// Ratio grid before repair; `None` = undetermined.
pub type RatioGrid = Grid<Option<f64>>;

/// Cell counts from one repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairStats {
    pub negative_cells: usize,
    pub repaired_cells: usize,
    /// Negative cells with no qualifying window, now undetermined.
    pub unrecovered_cells: usize,
}

/// Risk raster plus the repair statistics that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskOutcome {
    pub risk: RiskGrid,
    pub repair: RepairStats,
}

/// rslr / elevation per cell. Fails fast on misaligned grids.
pub fn raw_ratio(rslr: &RslrGrid, dem: &ElevationGrid) -> Result<RatioGrid> {
    rslr.ensure_aligned(&dem.grid)?;

    let mut out: RatioGrid = rslr.map(|_| None);
    for row in 0..rslr.height {
        for col in 0..rslr.width {
            let ratio = match (rslr.get(row, col), dem.elevation(row, col)) {
                (Some(r), Some(z)) if z != 0.0 && r.is_finite() => Some(r / z),
                _ => None,
            };
            out.set(row, col, ratio);
        }
    }
    Ok(out)
}

/// Replacement for the negative cell at (row, col), read from `raw` only.
fn repair_cell(raw: &RatioGrid, row: usize, col: usize, params: &RepairParams) -> Option<f64> {
    for side in params.window_sizes() {
        let half = side / 2;
        let r0 = row.saturating_sub(half);
        let r1 = (row + half + 1).min(raw.height);
        let c0 = col.saturating_sub(half);
        let c1 = (col + half + 1).min(raw.width);

        let mut sum = 0.0;
        let mut count = 0usize;
        for r in r0..r1 {
            for c in c0..c1 {
                if let Some(v) = raw.get(r, c) {
                    if v > 0.0 {
                        sum += v;
                        count += 1;
                    }
                }
            }
        }
        if count >= params.min_valid {
            return Some(sum / count as f64);
        }
    }
    None
}

/// Repair negative cells of `raw` into a new grid.
///
/// Non-negative and undetermined cells are copied unchanged.
pub fn repair_negative(raw: &RatioGrid, params: &RepairParams) -> Result<(RatioGrid, RepairStats)> {
    params.validate()?;

    let row_values = |row: usize| -> Vec<Option<f64>> {
        (0..raw.width)
            .map(|col| match raw.get(row, col) {
                Some(v) if v < 0.0 => repair_cell(raw, row, col, params),
                other => other,
            })
            .collect()
    };

    #[cfg(feature = "threading")]
    let data: Vec<Option<f64>> = (0..raw.height).into_par_iter().flat_map_iter(row_values).collect();
    #[cfg(not(feature = "threading"))]
    let data: Vec<Option<f64>> = (0..raw.height).flat_map(row_values).collect();

    let mut stats = RepairStats::default();
    for (before, after) in raw.data.iter().zip(&data) {
        if matches!(before, Some(v) if *v < 0.0) {
            stats.negative_cells += 1;
            if after.is_some() {
                stats.repaired_cells += 1;
            } else {
                stats.unrecovered_cells += 1;
            }
        }
    }

    let out = Grid::from_vec(data, raw.width, raw.height, raw.transform)?.with_crs(raw.crs.clone());
    Ok((out, stats))
}

/// Clip a ratio to [0, 1] and express it as a whole percentage.
pub fn ratio_to_percent(ratio: f64) -> f32 {
    (ratio.clamp(0.0, 1.0) * 100.0).round_ties_even() as f32
}

/// Full risk computation for one region.
pub fn compute_risk(rslr: &RslrGrid, dem: &ElevationGrid, params: &RepairParams) -> Result<RiskOutcome> {
    params.validate()?;
    let raw = raw_ratio(rslr, dem)?;
    let (repaired, stats) = repair_negative(&raw, params)?;
    let risk = repaired.map(|v| v.map(ratio_to_percent));

    debug!(
        negative = stats.negative_cells,
        repaired = stats.repaired_cells,
        unrecovered = stats.unrecovered_cells,
        determined = risk.determined_count(),
        "risk raster computed"
    );
    Ok(RiskOutcome { risk, repair: stats })
}
