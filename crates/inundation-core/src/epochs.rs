//! Acquisition epochs and per-point measurement series.
//!
//! Every point of a dataset shares one [`EpochSet`]; day offsets are measured
//! from the first epoch of the whole dataset, not of the individual point.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::coords::LatLon;
use crate::error::{Error, Result};

/// Compact date format used for epoch column names, e.g. "20180131".
pub const EPOCH_KEY_FORMAT: &str = "%Y%m%d";

/// Dataset-wide, strictly increasing list of acquisition dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSet {
    dates: Vec<NaiveDate>,
}

impl EpochSet {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.is_empty() {
            return Err(Error::InvalidEpochs("epoch set is empty".into()));
        }
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::InvalidEpochs(format!(
                "epochs must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { dates })
    }

    /// Parse `YYYYMMDD` keys, e.g. `["20180106", "20180112"]`.
    pub fn parse_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self> {
        let dates = keys
            .iter()
            .map(|k| {
                NaiveDate::parse_from_str(k.as_ref(), EPOCH_KEY_FORMAT)
                    .map_err(|e| Error::InvalidEpochs(format!("bad epoch key {:?}: {e}", k.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(dates)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Days since the first epoch, one per epoch.
    pub fn day_offsets(&self) -> Vec<f64> {
        let first = self.dates[0];
        self.dates
            .iter()
            .map(|d| (*d - first).num_days() as f64)
            .collect()
    }

    /// Mean day offset over the whole epoch set.
    ///
    /// This is the shared regression midpoint: every point's velocity is the
    /// trend slope evaluated here, which keeps velocities comparable.
    pub fn mean_day_offset(&self) -> f64 {
        let offsets = self.day_offsets();
        offsets.iter().sum::<f64>() / offsets.len() as f64
    }
}

/// One ground-motion measurement point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub location: LatLon,
    /// One entry per epoch of the dataset's [`EpochSet`]; `None` = missing.
    pub measurements: Vec<Option<f64>>,
    /// Point height above the reference surface, if supplied.
    pub elevation: Option<f64>,
    /// Explicit latitude attribute; overrides `location.lat` for the
    /// reference-frame correction when present.
    pub latitude: Option<f64>,
}

impl MeasurementPoint {
    pub fn new(location: LatLon, measurements: Vec<Option<f64>>) -> Self {
        Self { location, measurements, elevation: None, latitude: None }
    }

    /// Latitude used for the reference-frame correction.
    pub fn correction_latitude(&self) -> f64 {
        self.latitude.unwrap_or(self.location.lat)
    }

    /// (day offset, value) pairs with missing and non-finite values dropped.
    pub fn usable_samples(&self, day_offsets: &[f64]) -> Result<Vec<(f64, f64)>> {
        if self.measurements.len() != day_offsets.len() {
            return Err(Error::InvalidEpochs(format!(
                "series has {} values but the dataset has {} epochs",
                self.measurements.len(),
                day_offsets.len()
            )));
        }
        Ok(day_offsets
            .iter()
            .zip(&self.measurements)
            .filter_map(|(&t, v)| v.filter(|v| v.is_finite()).map(|v| (t, v)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_keys_and_offsets() {
        let set = EpochSet::parse_keys(&["20200101", "20200111", "20200131"]).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.day_offsets(), vec![0.0, 10.0, 30.0]);
        assert!((set.mean_day_offset() - 40.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_unordered_or_duplicate_epochs() {
        assert!(EpochSet::new(vec![date(2020, 1, 2), date(2020, 1, 1)]).is_err());
        assert!(EpochSet::new(vec![date(2020, 1, 1), date(2020, 1, 1)]).is_err());
        assert!(EpochSet::new(vec![]).is_err());
        assert!(EpochSet::parse_keys(&["2020-01-01"]).is_err());
    }

    #[test]
    fn usable_samples_drop_missing_and_nan() {
        let p = MeasurementPoint::new(
            LatLon::new(50.0, 3.0),
            vec![Some(1.0), None, Some(f64::NAN), Some(4.0)],
        );
        let s = p.usable_samples(&[0.0, 6.0, 12.0, 18.0]).unwrap();
        assert_eq!(s, vec![(0.0, 1.0), (18.0, 4.0)]);
        assert!(p.usable_samples(&[0.0, 6.0]).is_err());
    }

    #[test]
    fn correction_latitude_prefers_explicit_attribute() {
        let mut p = MeasurementPoint::new(LatLon::new(50.0, 3.0), vec![]);
        assert_eq!(p.correction_latitude(), 50.0);
        p.latitude = Some(51.5);
        assert_eq!(p.correction_latitude(), 51.5);
    }
}
