//! Append-only point collection with a rebuildable k-d tree.

use super::{KdTree, Point};

/// Points loaded for one box computation plus a spatial index over them.
///
/// The tree is built explicitly. Points appended after the last
/// [`build`](PointIndex::build) are stored but invisible to queries until
/// the next build. Points are never removed; classification passes relabel
/// them in place, which does not invalidate the tree.
#[derive(Debug, Default)]
pub struct PointIndex {
    points: Vec<Point>,
    tree: KdTree,
}

impl PointIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            tree: KdTree::new(),
        }
    }

    pub fn insert(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn extend<I: IntoIterator<Item = Point>>(&mut self, points: I) {
        self.points.extend(points);
    }

    /// Rebuild the tree over every stored point.
    pub fn build(&mut self) {
        self.tree.build(&self.points);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points visible to queries.
    pub fn indexed_len(&self) -> usize {
        self.tree.len()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    /// All indexed points within `radius` of `center`, nearest first, as
    /// `(index, squared_distance)` pairs.
    pub fn radius(&self, center: [f64; 3], radius: f64) -> Vec<(usize, f64)> {
        let mut found = Vec::new();
        self.tree
            .within(&self.points, center, radius * radius, &mut |idx, d2| {
                found.push((idx, d2))
            });
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }

    /// Nearest indexed point to `center`.
    pub fn nearest(&self, center: [f64; 3]) -> Option<(usize, f64)> {
        self.tree.nearest(&self.points, center, &|_| true)
    }

    /// Nearest indexed point to `center` whose current state satisfies `accept`.
    pub fn nearest_matching<F>(&self, center: [f64; 3], accept: F) -> Option<(usize, f64)>
    where
        F: Fn(&Point) -> bool,
    {
        self.tree.nearest(&self.points, center, &accept)
    }

    /// Set the classification of one point.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn relabel(&mut self, index: usize, classification: u8) {
        self.points[index].classification = classification;
    }

    /// Relabel every indexed point of class `from` within `radius` of
    /// `center` to class `to`. Returns the number of points changed.
    pub fn relabel_within(&mut self, center: [f64; 3], radius: f64, from: u8, to: u8) -> usize {
        let hits = self.radius(center, radius);
        let mut changed = 0;
        for (idx, _) in hits {
            let point = &mut self.points[idx];
            if point.classification == from {
                point.classification = to;
                changed += 1;
            }
        }
        changed
    }
}
