//! Inverse Distance Weighting of sparse RSLR points onto the DEM grid.
//!
//! For each coastal cell centre the k nearest points are weighted by
//! 1 / (d + ε), the weights are normalised to sum to 1, and the weighted sum
//! of their values is taken. Cells whose elevation is missing or not below
//! the coastal threshold stay undetermined.
//!
//! Reference:
//! Shepard, D. (1968). A two-dimensional interpolation function for
//! irregularly-spaced data. ACM National Conference.

#[cfg(feature = "threading")]
use rayon::prelude::*;
use tracing::debug;

use crate::config::IdwParams;
use crate::error::{Error, Result};
use crate::kdtree::{KdTree, SamplePoint};
use crate::raster::{ElevationGrid, Grid, RslrGrid};

/// Weighted value at (qx, qy) from the tree's k nearest points.
fn estimate(tree: &KdTree, qx: f64, qy: f64, params: &IdwParams) -> Option<f64> {
    let neighbours = tree.k_nearest(qx, qy, params.neighbours);
    if neighbours.is_empty() {
        return None;
    }

    let mut sum_w = 0.0;
    let mut sum_wz = 0.0;
    for n in &neighbours {
        let w = 1.0 / (n.distance_sq.sqrt() + params.epsilon);
        sum_w += w;
        sum_wz += w * n.point.value;
    }
    Some(sum_wz / sum_w)
}

/// Coastal-mask test: elevation known and strictly below the threshold.
pub fn is_coastal(dem: &ElevationGrid, row: usize, col: usize, threshold_m: f64) -> bool {
    dem.elevation(row, col).is_some_and(|z| z < threshold_m)
}

/// Interpolate `points` onto the grid of `dem`.
///
/// The output shares the DEM's shape, geotransform and CRS.
pub fn interpolate(points: &[SamplePoint], dem: &ElevationGrid, params: &IdwParams) -> Result<RslrGrid> {
    params.validate()?;
    dem.grid.validate()?;
    if points.is_empty() {
        return Err(Error::EmptyPointSet);
    }

    let tree = KdTree::build(points);
    let width = dem.width();
    let height = dem.height();

    let row_values = |row: usize| -> Vec<Option<f64>> {
        (0..width)
            .map(|col| {
                if !is_coastal(dem, row, col, params.coastal_threshold_m) {
                    return None;
                }
                let (x, y) = dem.grid.cell_center(row, col);
                estimate(&tree, x, y, params)
            })
            .collect()
    };

    #[cfg(feature = "threading")]
    let data: Vec<Option<f64>> = (0..height).into_par_iter().flat_map_iter(row_values).collect();
    #[cfg(not(feature = "threading"))]
    let data: Vec<Option<f64>> = (0..height).flat_map(row_values).collect();

    let out = Grid::from_vec(data, width, height, dem.grid.transform)?.with_crs(dem.grid.crs.clone());
    debug!(
        points = points.len(),
        coastal_cells = out.determined_count(),
        cells = width * height,
        "IDW interpolation finished"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// 10×10 DEM on [0, 10]², cell centres at x.5 / y.5, flat at `z`.
    fn flat_dem(z: f32) -> ElevationGrid {
        ElevationGrid::new(Grid::new(10, 10, GeoTransform::new(0.0, 10.0, 1.0, -1.0), z), None)
    }

    fn corner_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(0.5, 9.5, 10.0),
            SamplePoint::new(9.5, 9.5, 20.0),
            SamplePoint::new(0.5, 0.5, 30.0),
            SamplePoint::new(9.5, 0.5, 40.0),
        ]
    }

    #[test]
    fn coincident_point_dominates() {
        let out = interpolate(&corner_points(), &flat_dem(1.0), &IdwParams::default()).unwrap();
        // Cell (0, 0) has centre (0.5, 9.5), exactly on the first point.
        assert_relative_eq!(out.get(0, 0).unwrap(), 10.0, epsilon = 1e-6);
        assert_relative_eq!(out.get(9, 9).unwrap(), 40.0, epsilon = 1e-6);
    }

    #[test]
    fn fewer_points_than_k_is_handled() {
        let out = interpolate(&corner_points(), &flat_dem(1.0), &IdwParams::default()).unwrap();
        assert_eq!(out.determined_count(), 100);
        // Symmetric centre → plain average of the four corners.
        let tree = KdTree::build(&corner_points());
        let v = estimate(&tree, 5.0, 5.0, &IdwParams::default()).unwrap();
        assert_relative_eq!(v, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn single_point_fills_every_coastal_cell() {
        let pts = [SamplePoint::new(5.0, 5.0, 0.042)];
        let out = interpolate(&pts, &flat_dem(2.0), &IdwParams::default()).unwrap();
        assert!(out.data.iter().all(|v| (v.unwrap() - 0.042).abs() < 1e-12));
    }

    #[test]
    fn output_stays_within_known_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let pts: Vec<SamplePoint> = (0..40)
            .map(|_| SamplePoint::new(rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), rng.gen_range(-0.2..0.3)))
            .collect();
        let lo = pts.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let hi = pts.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);

        let out = interpolate(&pts, &flat_dem(0.5), &IdwParams::default()).unwrap();
        for v in out.data.iter().flatten() {
            assert!(*v >= lo - 1e-12 && *v <= hi + 1e-12, "{v} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn inland_and_nodata_cells_are_undetermined() {
        let mut dem = flat_dem(1.0);
        dem.nodata = Some(-9999.0);
        dem.grid.set(0, 0, 5.0); // at threshold → inland
        dem.grid.set(0, 1, 12.0);
        dem.grid.set(0, 2, -9999.0);
        dem.grid.set(0, 3, f32::NAN);
        dem.grid.set(0, 4, 4.99);

        let out = interpolate(&corner_points(), &dem, &IdwParams::default()).unwrap();
        assert_eq!(out.get(0, 0), None);
        assert_eq!(out.get(0, 1), None);
        assert_eq!(out.get(0, 2), None);
        assert_eq!(out.get(0, 3), None);
        assert!(out.get(0, 4).is_some());
        assert_eq!(out.determined_count(), 96);
    }

    #[test]
    fn output_is_reproducible_and_georeferenced_like_dem() {
        let mut dem = flat_dem(1.0);
        dem.grid.crs = Some("EPSG:4326".into());
        let a = interpolate(&corner_points(), &dem, &IdwParams::default()).unwrap();
        let b = interpolate(&corner_points(), &dem, &IdwParams::default()).unwrap();
        assert_eq!(a, b);
        assert!(a.ensure_aligned(&dem.grid).is_ok());
    }

    #[test]
    fn empty_point_set_is_an_error() {
        let err = interpolate(&[], &flat_dem(1.0), &IdwParams::default()).unwrap_err();
        assert_eq!(err, Error::EmptyPointSet);
    }
}
