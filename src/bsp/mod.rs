//! Spatial Index (BSP Tree)
//!
//! A static binary partition of the map into convex leaves (subsectors).
//!
//! ```text
//!            node: splitter line
//!           /                   \
//!     right half-plane     left half-plane
//!        /      \               |
//!     node    subsector      subsector
//! ```
//!
//! Point location descends by testing which side of each splitter the point
//! falls on. The same tree drives front-to-back traversal for draw order,
//! optionally pruned by a caller-supplied occlusion test.

pub mod builder;

pub use builder::{BspBuilder, BspError};

use serde::{Serialize, Deserialize};

use crate::core::bbox::BoundingBox;
use crate::core::vec2::FixedVec2;
use crate::geometry::SectorId;

/// Index into [`BspTree::subsectors`].
pub type SubsectorId = usize;

/// A child link of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BspChild {
    /// Another partition node
    Node(usize),
    /// A convex leaf
    Subsector(SubsectorId),
}

/// An interior node splitting space along a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BspNode {
    /// A point on the splitter
    pub start: FixedVec2,
    /// Splitter direction
    pub delta: FixedVec2,
    /// Child on the right of the splitter (points on the line go here too)
    pub right: BspChild,
    /// Child on the left of the splitter
    pub left: BspChild,
    /// Bounds of everything under `right`
    pub right_bbox: BoundingBox,
    /// Bounds of everything under `left`
    pub left_bbox: BoundingBox,
}

impl BspNode {
    /// True if `point` lies on the right of the splitter or on it.
    #[inline]
    pub fn on_right(&self, point: FixedVec2) -> bool {
        self.delta.cross_wide(point - self.start) <= 0
    }

    /// The child on the same side as `point`, then the other one.
    #[inline]
    fn near_far(&self, point: FixedVec2) -> ((BspChild, BoundingBox), (BspChild, BoundingBox)) {
        let right = (self.right, self.right_bbox);
        let left = (self.left, self.left_bbox);
        if self.on_right(point) { (right, left) } else { (left, right) }
    }
}

/// A convex leaf of the partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subsector {
    /// Index in the subsector arena
    pub id: SubsectorId,
    /// Sector every segment of this leaf faces into
    pub sector: SectorId,
    /// Segment indices bounding the leaf
    pub segments: Vec<usize>,
    /// Bounds of the convex region owned by the leaf
    pub bbox: BoundingBox,
}

/// Caller hooks for [`BspTree::traverse`].
pub trait BspVisitor {
    /// Whether anything inside `bbox` can still be seen. Returning false
    /// skips the whole subtree.
    fn is_visible(&mut self, _bbox: &BoundingBox) -> bool {
        true
    }

    /// Called for each reached leaf, nearest first.
    fn visit_subsector(&mut self, subsector: &Subsector);

    /// Stop the traversal early (e.g. once the screen is full).
    fn is_done(&self) -> bool {
        false
    }
}

/// The built partition tree. Immutable after map load.
#[derive(Clone, Debug)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    subsectors: Vec<Subsector>,
    root: BspChild,
    bounds: BoundingBox,
}

impl BspTree {
    pub(crate) fn new(
        nodes: Vec<BspNode>,
        subsectors: Vec<Subsector>,
        root: BspChild,
        bounds: BoundingBox,
    ) -> Self {
        Self { nodes, subsectors, root, bounds }
    }

    /// Root of the tree.
    pub fn root(&self) -> BspChild {
        self.root
    }

    /// All interior nodes.
    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    /// All leaves.
    pub fn subsectors(&self) -> &[Subsector] {
        &self.subsectors
    }

    /// A single leaf.
    pub fn subsector(&self, id: SubsectorId) -> Option<&Subsector> {
        self.subsectors.get(id)
    }

    /// Leaf containing `point`. Never consults occlusion.
    pub fn to_subsector(&self, point: FixedVec2) -> SubsectorId {
        let mut child = self.root;
        loop {
            match child {
                BspChild::Subsector(id) => return id,
                BspChild::Node(index) => {
                    let node = &self.nodes[index];
                    child = if node.on_right(point) { node.right } else { node.left };
                }
            }
        }
    }

    /// Sector containing `point`.
    pub fn to_sector(&self, point: FixedVec2) -> SectorId {
        self.subsectors[self.to_subsector(point)].sector
    }

    /// Visit leaves front to back as seen from `view`.
    pub fn traverse<V: BspVisitor>(&self, view: FixedVec2, visitor: &mut V) {
        let mut stack = vec![(self.root, self.bounds)];

        while let Some((child, bbox)) = stack.pop() {
            if visitor.is_done() {
                return;
            }
            if !visitor.is_visible(&bbox) {
                continue;
            }
            match child {
                BspChild::Subsector(id) => visitor.visit_subsector(&self.subsectors[id]),
                BspChild::Node(index) => {
                    let (near, far) = self.nodes[index].near_far(view);
                    // Far side first so the near side pops next
                    stack.push(far);
                    stack.push(near);
                }
            }
        }
    }

    /// Leaf order for front-to-back drawing from `view`, without occlusion.
    pub fn traversal_order(&self, view: FixedVec2) -> Vec<SubsectorId> {
        struct Collect(Vec<SubsectorId>);

        impl BspVisitor for Collect {
            fn visit_subsector(&mut self, subsector: &Subsector) {
                self.0.push(subsector.id);
            }
        }

        let mut collect = Collect(Vec::with_capacity(self.subsectors.len()));
        self.traverse(view, &mut collect);
        collect.0
    }
}
