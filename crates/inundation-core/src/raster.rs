use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Affine transformation for a north-up grid.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is usually negative (rows run southward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Geographic coordinates of the centre of cell (row, col).
    pub fn pixel_to_geo(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Equality up to a relative tolerance of 1e-9 on every coefficient.
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        fn close(a: f64, b: f64) -> bool {
            (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
        }
        close(self.origin_x, other.origin_x)
            && close(self.origin_y, other.origin_y)
            && close(self.pixel_width, other.pixel_width)
            && close(self.pixel_height, other.pixel_height)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// A georeferenced 2D grid, row-major.
///
/// Deserialisation goes through [`Grid::from_vec`], so a decoded grid always
/// holds exactly `width * height` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid<T>", bound(deserialize = "T: Deserialize<'de> + Copy"))]
pub struct Grid<T> {
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    /// Free-form CRS label (e.g. "EPSG:4326"). Carried, never interpreted.
    pub crs: Option<String>,
}

/// Unchecked wire form of [`Grid`].
#[derive(Deserialize)]
struct RawGrid<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    #[serde(default)]
    crs: Option<String>,
}

impl<T: Copy> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = Error;

    fn try_from(raw: RawGrid<T>) -> Result<Self> {
        Ok(Grid::from_vec(raw.data, raw.width, raw.height, raw.transform)?.with_crs(raw.crs))
    }
}

/// Interpolated relative sea-level rise in metres; `None` = undetermined.
pub type RslrGrid = Grid<Option<f64>>;

/// Inundation risk in percent (0–100); `None` = undetermined.
pub type RiskGrid = Grid<Option<f32>>;

impl<T: Copy> Grid<T> {
    /// Create a grid filled with `fill`.
    pub fn new(width: usize, height: usize, transform: GeoTransform, fill: T) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
            transform,
            crs: None,
        }
    }

    /// Wrap existing row-major data.
    pub fn from_vec(data: Vec<T>, width: usize, height: usize, transform: GeoTransform) -> Result<Self> {
        let grid = Self { data, width, height, transform, crs: None };
        grid.validate()?;
        Ok(grid)
    }

    /// Fail unless `data` holds exactly `width * height` values.
    pub fn validate(&self) -> Result<()> {
        if self.width.checked_mul(self.height) != Some(self.data.len()) {
            return Err(Error::GridMismatch(format!(
                "{} values cannot fill a {}x{} grid",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    pub fn with_crs(mut self, crs: Option<String>) -> Self {
        self.crs = crs;
        self
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    /// Centre of cell (row, col) in grid coordinates.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(row, col)
    }

    /// New grid with the same georeferencing and `f` applied to every cell.
    pub fn map<U, F: Fn(T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    /// Fail unless both grids are well formed and `other` has the same
    /// shape, geotransform and CRS.
    pub fn ensure_aligned<U: Copy>(&self, other: &Grid<U>) -> Result<()> {
        self.validate()?;
        other.validate()?;
        if self.width != other.width || self.height != other.height {
            return Err(Error::GridMismatch(format!(
                "shape {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        if !self.transform.approx_eq(&other.transform) {
            return Err(Error::GridMismatch(format!(
                "geotransform {:?} vs {:?}",
                self.transform, other.transform
            )));
        }
        if let (Some(a), Some(b)) = (&self.crs, &other.crs) {
            if a != b {
                return Err(Error::GridMismatch(format!("crs {a} vs {b}")));
            }
        }
        Ok(())
    }
}

impl<T: Copy> Grid<Option<T>> {
    /// Number of determined (`Some`) cells.
    pub fn determined_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_some()).count()
    }
}

/// Digital elevation model in metres with an optional no-data marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationGrid {
    pub grid: Grid<f32>,
    pub nodata: Option<f32>,
}

impl ElevationGrid {
    pub fn new(grid: Grid<f32>, nodata: Option<f32>) -> Self {
        Self { grid, nodata }
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Elevation at (row, col), or `None` for no-data and non-finite cells.
    /// Zero cells are returned as `Some(0.0)`; callers that divide must check.
    pub fn elevation(&self, row: usize, col: usize) -> Option<f64> {
        let v = self.grid.get(row, col);
        if !v.is_finite() || self.nodata == Some(v) {
            None
        } else {
            Some(v as f64)
        }
    }
}
