//! Geographic coordinate types.
//! All coordinate math uses f64 for precision.

use serde::{Deserialize, Serialize};

/// A location in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Planar (x, y) pair as used by the raster geotransform: (lon, lat).
    pub fn xy(self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Centroid of a set of locations, or `None` when the set is empty.
///
/// Used to pick the lookup position of a region's sea-level trend.
pub fn centroid(points: &[LatLon]) -> Option<LatLon> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
    Some(LatLon { lat, lon })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xy_is_lon_lat_order() {
        let p = LatLon::new(52.1, 4.3);
        assert_eq!(p.xy(), (4.3, 52.1));
    }

    #[test]
    fn centroid_of_square_is_its_middle() {
        let pts = [
            LatLon::new(0.0, 0.0),
            LatLon::new(0.0, 2.0),
            LatLon::new(2.0, 0.0),
            LatLon::new(2.0, 2.0),
        ];
        let c = centroid(&pts).unwrap();
        assert!((c.lat - 1.0).abs() < 1e-12);
        assert!((c.lon - 1.0).abs() < 1e-12);
        assert!(centroid(&[]).is_none());
    }
}
