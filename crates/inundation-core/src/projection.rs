//! Displacement projection and relative sea-level rise.
use chrono::{Datelike, NaiveDate};

use crate::config::ProjectionParams;
use crate::error::{Error, Result};

/// Years of accumulated motion: (current year + offset) − reference year.
/// `today` is injected; nothing here reads the clock.
pub fn projection_years(params: &ProjectionParams, today: NaiveDate) -> i32 {
    today.year() + params.future_offset_years - params.reference_year
}

/// Projected cumulative displacement in metres.
pub fn project_displacement(velocity_mm_per_year: f64, total_years: i32) -> f64 {
    velocity_mm_per_year * total_years as f64 / 1000.0
}

/// Relative sea-level rise (m): region sea-level rise net of land displacement.
pub fn relative_sea_level_rise(region_sea_level_rise_m: f64, displacement_m: f64) -> f64 {
    region_sea_level_rise_m - displacement_m
}

/// Checks the region value before it is combined with any point.
pub fn ensure_region_value(region_sea_level_rise_m: f64, lat: f64, lon: f64) -> Result<f64> {
    if region_sea_level_rise_m.is_finite() {
        Ok(region_sea_level_rise_m)
    } else {
        Err(Error::MissingRegionTrend { lat, lon })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 6, 15).unwrap()
    }

    #[test]
    fn years_use_injected_date() {
        let p = ProjectionParams::default();
        assert_eq!(projection_years(&p, day(2025)), 2025 + 10 - 2011);
        assert_eq!(projection_years(&p, day(2011)), 10);
    }

    #[test]
    fn displacement_is_linear_in_velocity() {
        let years = 24;
        for v in [-7.5, -0.3, 0.0, 1.25, 12.0] {
            assert_relative_eq!(project_displacement(2.0 * v, years), 2.0 * project_displacement(v, years));
        }
        assert_relative_eq!(project_displacement(-3.0, 24), -0.072);
    }

    #[test]
    fn rslr_subtracts_land_displacement() {
        // Uplift of 0.02 m offsets part of a 0.05 m rise; subsidence adds to it.
        assert_relative_eq!(relative_sea_level_rise(0.05, 0.02), 0.03);
        assert_relative_eq!(relative_sea_level_rise(0.05, -0.02), 0.07);
    }

    #[test]
    fn non_finite_region_value_is_missing_trend() {
        assert!(ensure_region_value(0.04, 0.0, 0.0).is_ok());
        assert!(matches!(
            ensure_region_value(f64::NAN, 52.0, 4.0),
            Err(Error::MissingRegionTrend { .. })
        ));
    }
}
