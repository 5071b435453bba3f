//! Static k-d tree over point positions.
//!
//! Nodes are stored in a flat vector with the root pushed last. Each node
//! keeps the bounding box of its subtree so both radius and nearest queries
//! can prune on box distance. Leaves hold up to [`LEAF_SIZE`] point indices.

use std::cmp::Ordering;

use super::Point;

/// Maximum number of points held by a leaf.
pub const LEAF_SIZE: usize = 16;

const NO_CHILD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct KdNode {
    min: [f64; 3],
    max: [f64; 3],
    left: u32,
    right: u32,
    start: u32,
    end: u32,
    split: f64,
    axis: u8,
}

impl KdNode {
    fn is_leaf(&self) -> bool {
        self.left == NO_CHILD
    }

    /// Squared distance from `p` to this node's bounding box.
    fn box_distance_sq(&self, p: [f64; 3]) -> f64 {
        let mut d2 = 0.0;
        for axis in 0..3 {
            let v = p[axis];
            if v < self.min[axis] {
                d2 += (self.min[axis] - v).powi(2);
            } else if v > self.max[axis] {
                d2 += (v - self.max[axis]).powi(2);
            }
        }
        d2
    }
}

/// A k-d tree over a prefix of a point slice.
#[derive(Debug, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    indices: Vec<usize>,
}

impl KdTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points covered by the tree.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Rebuild the tree over all of `points`.
    pub fn build(&mut self, points: &[Point]) {
        self.indices = (0..points.len()).collect();
        self.nodes.clear();
        if points.is_empty() {
            return;
        }
        self.nodes.reserve(2 * points.len() / LEAF_SIZE + 1);
        self.build_range(0, points.len(), points);
    }

    fn build_range(&mut self, start: usize, end: usize, points: &[Point]) -> u32 {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for &idx in &self.indices[start..end] {
            let p = points[idx].position();
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        let count = end - start;
        if count <= LEAF_SIZE {
            let node = self.nodes.len() as u32;
            self.nodes.push(KdNode {
                min,
                max,
                left: NO_CHILD,
                right: NO_CHILD,
                start: start as u32,
                end: end as u32,
                split: 0.0,
                axis: 0,
            });
            return node;
        }

        // Widest axis of the bounding box.
        let extent = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
        let axis = if extent[0] >= extent[1] && extent[0] >= extent[2] {
            0
        } else if extent[1] >= extent[2] {
            1
        } else {
            2
        };

        let half = count / 2;
        self.indices[start..end].select_nth_unstable_by(half, |&a, &b| {
            points[a].position()[axis]
                .partial_cmp(&points[b].position()[axis])
                .unwrap_or(Ordering::Equal)
        });
        let mid = start + half;
        let split = points[self.indices[mid]].position()[axis];

        let left = self.build_range(start, mid, points);
        let right = self.build_range(mid, end, points);

        let node = self.nodes.len() as u32;
        self.nodes.push(KdNode {
            min,
            max,
            left,
            right,
            start: 0,
            end: 0,
            split,
            axis: axis as u8,
        });
        node
    }

    fn root(&self) -> Option<u32> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(self.nodes.len() as u32 - 1)
        }
    }

    /// Invoke `visit(index, squared_distance)` for every point within
    /// squared distance `radius_sq` of `center`.
    pub fn within<F>(&self, points: &[Point], center: [f64; 3], radius_sq: f64, visit: &mut F)
    where
        F: FnMut(usize, f64),
    {
        if let Some(root) = self.root() {
            self.within_node(root, points, center, radius_sq, visit);
        }
    }

    fn within_node<F>(
        &self,
        node_idx: u32,
        points: &[Point],
        center: [f64; 3],
        radius_sq: f64,
        visit: &mut F,
    ) where
        F: FnMut(usize, f64),
    {
        let node = &self.nodes[node_idx as usize];
        if node.box_distance_sq(center) > radius_sq {
            return;
        }
        if node.is_leaf() {
            for &idx in &self.indices[node.start as usize..node.end as usize] {
                let d2 = points[idx].distance_sq(center);
                if d2 <= radius_sq {
                    visit(idx, d2);
                }
            }
            return;
        }
        self.within_node(node.left, points, center, radius_sq, visit);
        self.within_node(node.right, points, center, radius_sq, visit);
    }

    /// Nearest point to `center` accepted by `accept`.
    pub fn nearest<F>(&self, points: &[Point], center: [f64; 3], accept: &F) -> Option<(usize, f64)>
    where
        F: Fn(&Point) -> bool,
    {
        let root = self.root()?;
        let mut best: Option<(usize, f64)> = None;
        self.nearest_node(root, points, center, accept, &mut best);
        best
    }

    fn nearest_node<F>(
        &self,
        node_idx: u32,
        points: &[Point],
        center: [f64; 3],
        accept: &F,
        best: &mut Option<(usize, f64)>,
    ) where
        F: Fn(&Point) -> bool,
    {
        let node = &self.nodes[node_idx as usize];
        let bound = best.map_or(f64::INFINITY, |(_, d2)| d2);
        if node.box_distance_sq(center) > bound {
            return;
        }

        if node.is_leaf() {
            for &idx in &self.indices[node.start as usize..node.end as usize] {
                let point = &points[idx];
                if !accept(point) {
                    continue;
                }
                let d2 = point.distance_sq(center);
                if best.map_or(true, |(_, b)| d2 < b) {
                    *best = Some((idx, d2));
                }
            }
            return;
        }

        // Near side first so the far side is usually pruned.
        let diff = center[node.axis as usize] - node.split;
        let (first, second) = if diff <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        self.nearest_node(first, points, center, accept, best);
        self.nearest_node(second, points, center, accept, best);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<Point> {
        let mut points = Vec::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    points.push(Point::new(x as f64, y as f64, z as f64, (x % 3) as u8));
                }
            }
        }
        points
    }

    fn brute_nearest(points: &[Point], c: [f64; 3], class: Option<u8>) -> f64 {
        points
            .iter()
            .filter(|p| class.map_or(true, |k| p.classification == k))
            .map(|p| p.distance_sq(c))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new();
        assert!(tree.is_empty());
        assert!(tree.nearest(&[], [0.0; 3], &|_| true).is_none());
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points = grid(8);
        let mut tree = KdTree::new();
        tree.build(&points);
        assert_eq!(tree.len(), points.len());

        for c in [[0.2, 0.1, 7.9], [3.5, 3.5, 3.5], [-4.0, 10.0, 2.2]] {
            let (_, d2) = tree.nearest(&points, c, &|_| true).unwrap();
            assert!((d2 - brute_nearest(&points, c, None)).abs() < 1e-9);

            let (idx, d2) = tree.nearest(&points, c, &|p| p.classification == 2).unwrap();
            assert_eq!(points[idx].classification, 2);
            assert!((d2 - brute_nearest(&points, c, Some(2))).abs() < 1e-9);
        }
    }

    #[test]
    fn test_within_counts() {
        let points = grid(6);
        let mut tree = KdTree::new();
        tree.build(&points);

        let mut found = Vec::new();
        tree.within(&points, [2.0, 2.0, 2.0], 1.0, &mut |idx, d2| found.push((idx, d2)));
        // Centre plus its six face neighbours.
        assert_eq!(found.len(), 7);
        assert!(found.iter().all(|&(_, d2)| d2 <= 1.0));
    }
}
