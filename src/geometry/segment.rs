//! BSP segments.

use crate::core::vec2::FixedVec2;
use crate::bsp::SubsectorId;
use super::{LineId, SideId};

/// A directed piece of a side bound to one subsector. Minisegs have no side
/// and only close off a subsector for partitioning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Index in the segment arena
    pub id: usize,
    /// Start point
    pub start: FixedVec2,
    /// End point
    pub end: FixedVec2,
    /// Side this segment was cut from; `None` for minisegs
    pub side: Option<SideId>,
    /// Line of that side
    pub line: Option<LineId>,
    /// Leaf containing the segment
    pub subsector: SubsectorId,
}

impl Segment {
    /// True for partition-only segments.
    #[inline]
    pub fn is_miniseg(&self) -> bool {
        self.side.is_none()
    }

    /// Direction vector.
    #[inline]
    pub fn delta(&self) -> FixedVec2 {
        self.end - self.start
    }
}
