//! Long-term velocity from a multi-epoch displacement series.
//!
//! A quadratic y = a·t² + b·t + c is fit by ordinary least squares and its
//! slope 2·a·m + b is taken at the dataset-wide mean day offset m. The fit is
//! done on the re-centred, re-scaled abscissa u = (t − m) / s, so the slope at
//! m is the linear coefficient divided by s.
use tracing::warn;

use crate::config::TrendParams;
use crate::epochs::{EpochSet, MeasurementPoint};
use crate::error::{Error, Result};

/// Slope (units/day) → velocity (units/year).
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Minimum distinct epochs for a quadratic fit.
pub const MIN_EPOCHS: usize = 3;

// ── Reference-frame correction ────────────────────────────────────────────────

/// correction = C1·lat + C2·lat + C3 (mm/yr).
const CORRECTION_C1: f64 = -2e-4;
const CORRECTION_C2: f64 = 0.04;
const CORRECTION_C3: f64 = -0.87;

/// Latitude band (degrees north) the correction constants were calibrated on.
pub const CORRECTION_LATITUDE_RANGE: (f64, f64) = (34.0, 72.0);

/// Additive velocity correction (mm/yr) for the given latitude.
pub fn reference_frame_correction(lat: f64) -> f64 {
    CORRECTION_C1 * lat + CORRECTION_C2 * lat + CORRECTION_C3
}

pub fn correction_is_calibrated(lat: f64) -> bool {
    let (lo, hi) = CORRECTION_LATITUDE_RANGE;
    (lo..=hi).contains(&lat)
}

// ── Fitting ───────────────────────────────────────────────────────────────────

/// Velocity estimate for one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityFit {
    /// Final velocity, correction included, in mm/yr.
    pub velocity_mm_per_year: f64,
    /// Correction that was added (0 when disabled).
    pub correction_mm_per_year: f64,
    /// The correction was applied outside its calibrated latitude band.
    pub extrapolated_correction: bool,
    pub epochs_used: usize,
}

/// Slope (units/day) at `midpoint` of the least-squares quadratic through
/// `samples` (day offset, value).
pub fn quadratic_slope_at(samples: &[(f64, f64)], midpoint: f64) -> Result<f64> {
    let mut distinct: Vec<f64> = samples.iter().map(|&(t, _)| t).collect();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    let insufficient = Error::InsufficientData { usable: distinct.len(), required: MIN_EPOCHS };
    if distinct.len() < MIN_EPOCHS {
        return Err(insufficient);
    }

    let scale = samples
        .iter()
        .map(|&(t, _)| (t - midpoint).abs())
        .fold(0.0f64, f64::max)
        .max(1.0);

    // Normal equations for y = β₀ + β₁·u + β₂·u²:
    // [n    Σu   Σu² ] [β₀]   [Σy  ]
    // [Σu   Σu²  Σu³ ] [β₁] = [Σuy ]
    // [Σu²  Σu³  Σu⁴ ] [β₂]   [Σu²y]
    let mut su = [0.0f64; 5];
    let mut sy = [0.0f64; 3];
    for &(t, y) in samples {
        let u = (t - midpoint) / scale;
        let mut p = 1.0;
        for (k, s) in su.iter_mut().enumerate() {
            *s += p;
            if k < 3 {
                sy[k] += p * y;
            }
            p *= u;
        }
    }

    let mut mat = [
        su[0], su[1], su[2],
        su[1], su[2], su[3],
        su[2], su[3], su[4],
    ];
    let beta = solve3(&mut mat, &mut sy).ok_or(insufficient)?;
    Ok(beta[1] / scale)
}

/// Gaussian elimination with partial pivoting on a 3×3 system.
fn solve3(mat: &mut [f64; 9], rhs: &mut [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let mut max_val = mat[col * 3 + col].abs();
        let mut max_row = col;
        for row in (col + 1)..3 {
            let val = mat[row * 3 + col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }
        if max_val < 1e-12 {
            return None;
        }
        if max_row != col {
            for j in 0..3 {
                mat.swap(col * 3 + j, max_row * 3 + j);
            }
            rhs.swap(col, max_row);
        }
        let pivot = mat[col * 3 + col];
        for row in (col + 1)..3 {
            let factor = mat[row * 3 + col] / pivot;
            mat[row * 3 + col] = 0.0;
            for j in (col + 1)..3 {
                mat[row * 3 + j] -= factor * mat[col * 3 + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = [0.0f64; 3];
    for col in (0..3).rev() {
        let mut sum = rhs[col];
        for j in (col + 1)..3 {
            sum -= mat[col * 3 + j] * x[j];
        }
        x[col] = sum / mat[col * 3 + col];
    }
    Some(x)
}

/// Per-dataset velocity extractor.
///
/// Holds the day offsets and the shared midpoint so they are computed once
/// and identical for every point.
#[derive(Debug, Clone)]
pub struct TrendExtractor {
    day_offsets: Vec<f64>,
    midpoint: f64,
    params: TrendParams,
}

impl TrendExtractor {
    pub fn new(epochs: &EpochSet, params: &TrendParams) -> Self {
        Self {
            day_offsets: epochs.day_offsets(),
            midpoint: epochs.mean_day_offset(),
            params: params.clone(),
        }
    }

    /// Shared regression midpoint (days since the first epoch).
    pub fn midpoint(&self) -> f64 {
        self.midpoint
    }

    pub fn extract(&self, point: &MeasurementPoint) -> Result<VelocityFit> {
        let samples = point.usable_samples(&self.day_offsets)?;
        let slope = quadratic_slope_at(&samples, self.midpoint)?;
        let mut velocity = slope * DAYS_PER_YEAR;

        let (correction, extrapolated) = if self.params.apply_reference_frame_correction {
            let lat = point.correction_latitude();
            let extrapolated = !correction_is_calibrated(lat);
            if extrapolated {
                warn!(lat, "reference-frame correction applied outside its calibrated latitude band");
            }
            (reference_frame_correction(lat), extrapolated)
        } else {
            (0.0, false)
        };
        velocity += correction;

        Ok(VelocityFit {
            velocity_mm_per_year: velocity,
            correction_mm_per_year: correction,
            extrapolated_correction: extrapolated,
            epochs_used: samples.len(),
        })
    }
}
