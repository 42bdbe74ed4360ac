//! 2D k-d tree for k-nearest-neighbour queries over sparse sample points.
//!
//! Neighbour order is total and deterministic: ascending squared distance,
//! then ascending input index. When several points are equidistant from the
//! query, the ones that came first in the input are returned.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;

/// A sample point with planar coordinates and a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }

    #[inline]
    pub fn dist_sq(&self, qx: f64, qy: f64) -> f64 {
        let dx = self.x - qx;
        let dy = self.y - qy;
        dx * dx + dy * dy
    }
}

#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<SamplePoint>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points` (= input index)
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// One neighbour returned by [`KdTree::k_nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub point: SamplePoint,
    pub distance_sq: f64,
    /// Position of the point in the slice the tree was built from.
    pub index: usize,
}

/// (distance², index) ordering used for both ranking and tie-breaking.
#[inline]
fn rank(a: (f64, usize), b: (f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

impl KdTree {
    /// Build from sample points. O(n log² n) with median splits.
    pub fn build(points: &[SamplePoint]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(points, &mut indices, 0, &mut nodes);
        }
        Self { nodes, points: points.to_vec() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `k` nearest points to (qx, qy), nearest first.
    ///
    /// Returns `min(k, len)` results.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<Neighbour> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Ascending by rank; the last entry is the current k-th best.
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, &mut best);

        best.into_iter()
            .map(|(distance_sq, index)| Neighbour {
                point: self.points[index],
                distance_sq,
                index,
            })
            .collect()
    }

    fn knn_recursive(&self, node_idx: usize, qx: f64, qy: f64, k: usize, best: &mut Vec<(f64, usize)>) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = qx - p.x;
        let dy = qy - p.y;
        let candidate = (dx * dx + dy * dy, node.point_idx);

        let full = best.len() >= k;
        if !full || rank(candidate, best[best.len() - 1]) == Ordering::Less {
            let pos = best
                .binary_search_by(|entry| rank(*entry, candidate))
                .unwrap_or_else(|e| e);
            best.insert(pos, candidate);
            best.truncate(k);
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, qx, qy, k, best);
        }

        // `<=` keeps equidistant points on the far side in play for the
        // index tie-break.
        let threshold = if best.len() >= k { best[best.len() - 1].0 } else { f64::INFINITY };
        if diff * diff <= threshold {
            if let Some(child) = second {
                self.knn_recursive(child, qx, qy, k, best);
            }
        }
    }
}

fn build_recursive(points: &[SamplePoint], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> usize {
    let n = indices.len();
    let split_dim = (depth % 2) as u8;

    let coord = |i: usize| if split_dim == 0 { points[i].x } else { points[i].y };
    indices.sort_by(|&a, &b| coord(a).total_cmp(&coord(b)).then(a.cmp(&b)));

    let median = n / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];
    if !left.is_empty() {
        let left_idx = build_recursive(points, left, depth + 1, nodes);
        nodes[node_idx].left = Some(left_idx);
    }
    if !right.is_empty() {
        let right_idx = build_recursive(points, right, depth + 1, nodes);
        nodes[node_idx].right = Some(right_idx);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(2.0, 3.0, 10.0),
            SamplePoint::new(5.0, 4.0, 20.0),
            SamplePoint::new(9.0, 6.0, 30.0),
            SamplePoint::new(4.0, 7.0, 40.0),
            SamplePoint::new(8.0, 1.0, 50.0),
            SamplePoint::new(7.0, 2.0, 60.0),
            SamplePoint::new(1.0, 8.0, 70.0),
            SamplePoint::new(6.0, 5.0, 80.0),
        ]
    }

    fn brute_force(pts: &[SamplePoint], qx: f64, qy: f64, k: usize) -> Vec<(f64, usize)> {
        let mut all: Vec<(f64, usize)> = pts.iter().enumerate().map(|(i, p)| (p.dist_sq(qx, qy), i)).collect();
        all.sort_by(|a, b| rank(*a, *b));
        all.truncate(k);
        all
    }

    #[test]
    fn empty_tree_returns_nothing() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.k_nearest(0.0, 0.0, 3).is_empty());
    }

    #[test]
    fn k_nearest_matches_brute_force() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.len(), 8);
        for qx in 0..10 {
            for qy in 0..10 {
                let (qx, qy) = (qx as f64 + 0.3, qy as f64 + 0.7);
                for k in [1, 3, 8] {
                    let got: Vec<(f64, usize)> =
                        tree.k_nearest(qx, qy, k).iter().map(|n| (n.distance_sq, n.index)).collect();
                    assert_eq!(got, brute_force(&pts, qx, qy, k), "query ({qx}, {qy}) k={k}");
                }
            }
        }
    }

    #[test]
    fn k_larger_than_point_count_returns_all() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.k_nearest(5.0, 5.0, 100).len(), pts.len());
    }

    #[test]
    fn equidistant_ties_prefer_lower_input_index() {
        // Nine points at distance exactly 1 from the origin.
        let ring = [
            SamplePoint::new(1.0, 0.0, 0.0),
            SamplePoint::new(0.0, 1.0, 1.0),
            SamplePoint::new(-1.0, 0.0, 2.0),
            SamplePoint::new(0.0, -1.0, 3.0),
            SamplePoint::new(1.0, 0.0, 4.0),
            SamplePoint::new(0.0, 1.0, 5.0),
            SamplePoint::new(-1.0, 0.0, 6.0),
            SamplePoint::new(0.0, -1.0, 7.0),
            SamplePoint::new(1.0, 0.0, 8.0),
        ];
        let tree = KdTree::build(&ring);
        let idx: Vec<usize> = tree.k_nearest(0.0, 0.0, 8).iter().map(|n| n.index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn duplicate_locations_are_all_reachable() {
        let pts = vec![SamplePoint::new(3.0, 3.0, 1.0); 5];
        let tree = KdTree::build(&pts);
        let idx: Vec<usize> = tree.k_nearest(3.0, 3.0, 5).iter().map(|n| n.index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
    }
}
