//! Byte encoding and colour palette for risk rasters.

use crate::raster::RiskGrid;

/// Byte written for undetermined cells.
pub const NODATA_BYTE: u8 = 255;

/// Colour stops (percent, RGB): white → yellow → orange → red → dark red.
const RISK_STOPS: [(u8, [u8; 3]); 5] = [
    (0, [255, 255, 255]),
    (25, [255, 255, 0]),
    (50, [255, 165, 0]),
    (75, [255, 0, 0]),
    (100, [128, 0, 0]),
];

/// Risk percentage → byte; `None` and non-finite values become [`NODATA_BYTE`].
pub fn risk_to_byte(value: Option<f32>) -> u8 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 100.0).round() as u8,
        _ => NODATA_BYTE,
    }
}

/// Row-major byte raster for GeoTIFF output.
pub fn risk_bytes(grid: &RiskGrid) -> Vec<u8> {
    grid.data.iter().map(|v| risk_to_byte(*v)).collect()
}

/// RGB for a risk percentage, linear between stops. Channels truncate.
pub fn risk_color(percent: u8) -> [u8; 3] {
    let p = percent.min(100);
    for pair in RISK_STOPS.windows(2) {
        let (lo, c0) = pair[0];
        let (hi, c1) = pair[1];
        if p <= hi {
            let t = (p - lo) as f64 / (hi - lo) as f64;
            return std::array::from_fn(|ch| (c0[ch] as f64 + t * (c1[ch] as f64 - c0[ch] as f64)) as u8);
        }
    }
    RISK_STOPS[RISK_STOPS.len() - 1].1
}

/// 101-entry palette indexed by risk percentage.
pub fn risk_palette() -> Vec<[u8; 3]> {
    (0..=100).map(risk_color).collect()
}

/// RGBA for one cell; undetermined cells are fully transparent.
pub fn risk_rgba(value: Option<f32>) -> [u8; 4] {
    match risk_to_byte(value) {
        NODATA_BYTE => [0, 0, 0, 0],
        b => {
            let [r, g, b] = risk_color(b);
            [r, g, b, 255]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, Grid};

    #[test]
    fn palette_hits_every_stop() {
        let palette = risk_palette();
        assert_eq!(palette.len(), 101);
        for (p, rgb) in RISK_STOPS {
            assert_eq!(palette[p as usize], rgb, "stop {p}");
        }
    }

    #[test]
    fn palette_interpolates_and_truncates() {
        // White → yellow at t = 0.48: blue 255 − 122.4 = 132.6.
        assert_eq!(risk_color(12), [255, 255, 132]);
        // Orange → red at t = 0.08: green 165 − 13.2 = 151.8.
        assert_eq!(risk_color(52), [255, 151, 0]);
    }

    #[test]
    fn undetermined_cells_encode_as_nodata() {
        let mut g: RiskGrid = Grid::new(2, 2, GeoTransform::default(), Some(42.0));
        g.set(0, 1, None);
        g.set(1, 0, Some(100.0));
        assert_eq!(risk_bytes(&g), vec![42, NODATA_BYTE, 100, 42]);
        assert_eq!(risk_rgba(None)[3], 0);
        assert_eq!(risk_rgba(Some(0.0)), [255, 255, 255, 255]);
    }
}
