//! Axis-aligned 2D bounding boxes in fixed-point map space.

use serde::{Serialize, Deserialize};

use super::fixed::Fixed;
use super::vec2::FixedVec2;

/// A box following the cartesian coordinate system: `min` is the bottom left
/// corner, `max` the top right. Bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Bottom left corner
    pub min: FixedVec2,
    /// Top right corner
    pub max: FixedVec2,
}

impl BoundingBox {
    /// Create from two corners in any order.
    pub fn new(a: FixedVec2, b: FixedVec2) -> Self {
        Self {
            min: FixedVec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: FixedVec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Box around a center with a half-extent (an entity's radius).
    pub fn around(center: FixedVec2, radius: Fixed) -> Self {
        Self {
            min: FixedVec2::new(center.x.saturating_sub(radius), center.y.saturating_sub(radius)),
            max: FixedVec2::new(center.x.saturating_add(radius), center.y.saturating_add(radius)),
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = FixedVec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self { min: first, max: first };
        for point in iter {
            bbox.add_point(point);
        }
        Some(bbox)
    }

    /// Grow to include a point.
    pub fn add_point(&mut self, point: FixedVec2) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Smallest box containing both boxes.
    pub fn combine(self, other: Self) -> Self {
        let mut bbox = self;
        bbox.add_point(other.min);
        bbox.add_point(other.max);
        bbox
    }

    /// Grow every side by `amount`.
    pub fn expand(self, amount: Fixed) -> Self {
        Self {
            min: FixedVec2::new(self.min.x.saturating_sub(amount), self.min.y.saturating_sub(amount)),
            max: FixedVec2::new(self.max.x.saturating_add(amount), self.max.y.saturating_add(amount)),
        }
    }

    /// Whether the point lies inside or on the border.
    pub fn contains(&self, point: FixedVec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Whether the boxes overlap with positive area.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x
            && self.min.y < other.max.y && self.max.y > other.min.y
    }

    /// The four corners, counter-clockwise from the bottom left.
    pub fn corners(&self) -> [FixedVec2; 4] {
        [
            self.min,
            FixedVec2::new(self.max.x, self.min.y),
            self.max,
            FixedVec2::new(self.min.x, self.max.y),
        ]
    }

    /// Width along X.
    pub fn width(&self) -> Fixed {
        self.max.x.wrapping_sub(self.min.x)
    }

    /// Height along Y.
    pub fn height(&self) -> Fixed {
        self.max.y.wrapping_sub(self.min.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_and_contains() {
        let bbox = BoundingBox::from_points([
            FixedVec2::from_ints(5, -3),
            FixedVec2::from_ints(-2, 8),
            FixedVec2::from_ints(1, 1),
        ])
        .unwrap();

        assert_eq!(bbox.min, FixedVec2::from_ints(-2, -3));
        assert_eq!(bbox.max, FixedVec2::from_ints(5, 8));
        assert!(bbox.contains(FixedVec2::from_ints(5, 8)));
        assert!(!bbox.contains(FixedVec2::from_ints(6, 0)));
        assert!(BoundingBox::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_intersects_excludes_touching_edges() {
        let a = BoundingBox::new(FixedVec2::from_ints(0, 0), FixedVec2::from_ints(10, 10));
        let b = BoundingBox::new(FixedVec2::from_ints(10, 0), FixedVec2::from_ints(20, 10));
        let c = BoundingBox::new(FixedVec2::from_ints(9, 9), FixedVec2::from_ints(20, 20));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
    }

    #[test]
    fn test_around_and_combine() {
        let a = BoundingBox::around(FixedVec2::from_ints(0, 0), 16 << 16);
        assert_eq!(a.width(), 32 << 16);
        let b = a.combine(BoundingBox::around(FixedVec2::from_ints(100, 0), 16 << 16));
        assert_eq!(b.max.x, 116 << 16);
        assert_eq!(b.expand(1 << 16).min.y, -17 << 16);
    }
}
