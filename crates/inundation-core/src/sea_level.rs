//! Region sea-level trend lookup on a regular lat/lon grid.
//!
//! Nearest grid node first; when that node has no value, the mean of every
//! valid node within ±0.4° is used instead. Trends are stored in mm/yr and
//! returned as metres over the 10-year projection horizon.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coords::LatLon;
use crate::error::{Error, Result};

/// Half-width (degrees) of the fallback averaging box.
pub const FALLBACK_BUFFER_DEG: f64 = 0.4;

/// Projection horizon the returned value covers.
pub const HORIZON_YEARS: f64 = 10.0;

/// Gridded sea-level trend, one row per latitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaLevelTrendGrid {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// `trend_mm_per_year[i][j]` belongs to (`latitudes[i]`, `longitudes[j]`).
    pub trend_mm_per_year: Vec<Vec<Option<f64>>>,
}

/// mm/yr → metres over [`HORIZON_YEARS`].
pub fn mm_per_year_to_horizon_m(trend_mm_per_year: f64) -> f64 {
    trend_mm_per_year * HORIZON_YEARS / 1000.0
}

fn nearest_index(axis: &[f64], v: f64) -> Option<usize> {
    axis.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - v).abs().total_cmp(&(*b - v).abs()))
        .map(|(i, _)| i)
}

impl SeaLevelTrendGrid {
    pub fn validate(&self) -> Result<()> {
        let shape_ok = self.trend_mm_per_year.len() == self.latitudes.len()
            && self.trend_mm_per_year.iter().all(|row| row.len() == self.longitudes.len());
        if shape_ok {
            Ok(())
        } else {
            Err(Error::GridMismatch(format!(
                "sea-level trend rows do not match {} latitudes × {} longitudes",
                self.latitudes.len(),
                self.longitudes.len()
            )))
        }
    }

    fn value(&self, i: usize, j: usize) -> Option<f64> {
        self.trend_mm_per_year[i][j].filter(|v| v.is_finite())
    }

    /// Sea-level rise (m per 10 years) for a region centred on `at`.
    pub fn resolve(&self, at: LatLon) -> Result<f64> {
        self.validate()?;
        let missing = Error::MissingRegionTrend { lat: at.lat, lon: at.lon };

        let (Some(i), Some(j)) = (nearest_index(&self.latitudes, at.lat), nearest_index(&self.longitudes, at.lon))
        else {
            return Err(missing);
        };
        if let Some(v) = self.value(i, j) {
            debug!(lat = self.latitudes[i], lon = self.longitudes[j], trend_mm_per_year = v, "nearest sea-level node");
            return Ok(mm_per_year_to_horizon_m(v));
        }

        let in_box = |axis_v: f64, centre: f64| (axis_v - centre).abs() <= FALLBACK_BUFFER_DEG;
        let mut sum = 0.0;
        let mut count = 0usize;
        for (i, &lat) in self.latitudes.iter().enumerate() {
            if !in_box(lat, at.lat) {
                continue;
            }
            for (j, &lon) in self.longitudes.iter().enumerate() {
                if !in_box(lon, at.lon) {
                    continue;
                }
                if let Some(v) = self.value(i, j) {
                    sum += v;
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Err(missing);
        }
        let mean = sum / count as f64;
        debug!(nodes = count, trend_mm_per_year = mean, "sea-level trend from spatial-mean fallback");
        Ok(mm_per_year_to_horizon_m(mean))
    }
}
