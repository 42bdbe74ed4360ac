//! Pipeline parameters with calibrated defaults.
//!
//! Every struct deserialises with `#[serde(default)]`, so a JSON config only
//! needs the fields it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Trend extraction options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    /// Add the latitude-dependent reference-frame correction to every velocity.
    pub apply_reference_frame_correction: bool,
}

/// Displacement projection horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    /// Year the displacement is accumulated from.
    pub reference_year: i32,
    /// Years past the current year to project to.
    pub future_offset_years: i32,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self { reference_year: 2011, future_offset_years: 10 }
    }
}

/// Inverse-distance-weighting options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdwParams {
    /// Nearest neighbours per cell (fewer are used when fewer points exist).
    pub neighbours: usize,
    /// Added to every distance so coincident points do not divide by zero.
    pub epsilon: f64,
    /// Cells at or above this elevation (m) are left undetermined.
    pub coastal_threshold_m: f64,
}

impl Default for IdwParams {
    fn default() -> Self {
        Self { neighbours: 8, epsilon: 1e-8, coastal_threshold_m: 5.0 }
    }
}

impl IdwParams {
    pub fn validate(&self) -> Result<()> {
        if self.neighbours == 0 {
            return Err(Error::InvalidParameter {
                name: "neighbours",
                value: self.neighbours.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                value: self.epsilon.to_string(),
                reason: "must be finite and positive".into(),
            });
        }
        if !self.coastal_threshold_m.is_finite() {
            return Err(Error::InvalidParameter {
                name: "coastal_threshold_m",
                value: self.coastal_threshold_m.to_string(),
                reason: "must be finite".into(),
            });
        }
        Ok(())
    }
}

/// Negative-cell repair options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairParams {
    /// Positive neighbours required before a window is accepted.
    pub min_valid: usize,
    /// First (smallest) window side, odd.
    pub initial_window: usize,
    /// Largest window side tried, odd.
    pub max_window: usize,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self { min_valid: 5, initial_window: 3, max_window: 9 }
    }
}

impl RepairParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_valid == 0 {
            return Err(Error::InvalidParameter {
                name: "min_valid",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        for (name, w) in [("initial_window", self.initial_window), ("max_window", self.max_window)] {
            if w < 3 || w % 2 == 0 {
                return Err(Error::InvalidParameter {
                    name,
                    value: w.to_string(),
                    reason: "must be an odd size of at least 3".into(),
                });
            }
        }
        if self.max_window < self.initial_window {
            return Err(Error::InvalidParameter {
                name: "max_window",
                value: self.max_window.to_string(),
                reason: format!("smaller than initial_window {}", self.initial_window),
            });
        }
        Ok(())
    }

    /// Window sides tried in order: initial, initial + 2, …, max.
    pub fn window_sizes(&self) -> impl Iterator<Item = usize> {
        (self.initial_window..=self.max_window).step_by(2)
    }
}

/// All stage parameters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub trend: TrendParams,
    pub projection: ProjectionParams,
    pub idw: IdwParams,
    pub repair: RepairParams,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.idw.validate()?;
        self.repair.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_calibration() {
        let c = PipelineConfig::default();
        assert_eq!(c.projection.reference_year, 2011);
        assert_eq!(c.projection.future_offset_years, 10);
        assert_eq!(c.idw.neighbours, 8);
        assert_eq!(c.idw.coastal_threshold_m, 5.0);
        assert_eq!(c.repair.window_sizes().collect::<Vec<_>>(), vec![3, 5, 7, 9]);
        assert!(!c.trend.apply_reference_frame_correction);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c: PipelineConfig =
            serde_json::from_str(r#"{ "repair": { "max_window": 5 }, "trend": { "apply_reference_frame_correction": true } }"#)
                .unwrap();
        assert_eq!(c.repair.max_window, 5);
        assert_eq!(c.repair.min_valid, 5);
        assert!(c.trend.apply_reference_frame_correction);
        assert_eq!(c.idw, IdwParams::default());
    }

    #[test]
    fn repair_params_reject_even_or_tiny_windows() {
        let even = RepairParams { max_window: 8, ..Default::default() };
        assert!(even.validate().is_err());
        let tiny = RepairParams { initial_window: 1, ..Default::default() };
        assert!(tiny.validate().is_err());
        let zero = RepairParams { min_valid: 0, ..Default::default() };
        assert!(zero.validate().is_err());
        let inverted = RepairParams { initial_window: 7, max_window: 5, ..Default::default() };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn idw_params_reject_zero_neighbours() {
        let p = IdwParams { neighbours: 0, ..Default::default() };
        assert!(p.validate().is_err());
    }

    #[test]
    fn idw_params_reject_non_finite_threshold() {
        for t in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let p = IdwParams { coastal_threshold_m: t, ..Default::default() };
            assert!(matches!(p.validate(), Err(Error::InvalidParameter { name: "coastal_threshold_m", .. })));
        }
        let below_sea_level = IdwParams { coastal_threshold_m: -2.0, ..Default::default() };
        assert!(below_sea_level.validate().is_ok());
    }
}
