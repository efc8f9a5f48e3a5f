//! BSP construction.
//!
//! Every line side becomes a segment. The segment set is split recursively
//! until each subset is convex:
//!
//! 1. Convex set (every segment on the right of, or collinear and facing the
//!    same way as, every other segment's line): emit a leaf.
//! 2. Otherwise score each segment's line as a splitter with
//!    `splits * 8 + |right - left|`, keeping the first lowest score among
//!    splitters that leave something on the left.
//! 3. Segments straddling the splitter are cut at the intersection.
//!
//! Each node records the bounds of both child regions, obtained by clipping
//! the map bounds with the splitter half-planes along the path.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::core::bbox::BoundingBox;
use crate::core::fixed::Fixed;
use crate::core::vec2::FixedVec2;
use crate::geometry::{Line, LineId, SectorId, Segment, Side, SideId};
use super::{BspChild, BspNode, BspTree, Subsector};

/// Deepest partition accepted before the map is considered malformed.
pub const MAX_DEPTH: usize = 128;

/// Outward padding of region bounds, absorbing intersection rounding.
const REGION_MARGIN: Fixed = 256;

/// Score weight of each segment cut by a splitter.
const SPLIT_COST: usize = 8;

/// BSP build failures. The map load is aborted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BspError {
    /// The map has no lines.
    #[error("map has no segments to partition")]
    NoSegments,
    /// Recursion exceeded [`MAX_DEPTH`].
    #[error("partition deeper than {} levels", MAX_DEPTH)]
    DepthLimit,
    /// No line could split a non-convex set.
    #[error("no usable splitter among {segments} segments")]
    NoSplitter {
        /// Segments in the stuck set
        segments: usize,
    },
    /// A convex leaf touches more than one sector.
    #[error("leaf {subsector} touches several sectors: {sectors:?}")]
    NonManifold {
        /// Leaf index
        subsector: usize,
        /// Sectors found in the leaf
        sectors: Vec<SectorId>,
    },
}

#[derive(Clone, Copy, Debug)]
struct BuildSeg {
    start: FixedVec2,
    end: FixedVec2,
    side: Option<SideId>,
    line: Option<LineId>,
    sector: Option<SectorId>,
}

impl BuildSeg {
    #[inline]
    fn delta(&self) -> FixedVec2 {
        self.end - self.start
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SegSide {
    Right,
    Left,
    Split,
}

/// Builds a [`BspTree`] and its segments from line geometry.
pub struct BspBuilder<'a> {
    lines: &'a [Line],
    sides: &'a [Side],
    bounds: BoundingBox,
    nodes: Vec<BspNode>,
    subsectors: Vec<Subsector>,
    segments: Vec<Segment>,
}

impl<'a> BspBuilder<'a> {
    /// Prepare a build over the given arenas.
    pub fn new(lines: &'a [Line], sides: &'a [Side], bounds: BoundingBox) -> Self {
        Self {
            lines,
            sides,
            bounds,
            nodes: Vec::new(),
            subsectors: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// Run the build.
    pub fn build(mut self) -> Result<(BspTree, Vec<Segment>), BspError> {
        let mut segs = Vec::with_capacity(self.lines.len() * 2);
        for line in self.lines {
            segs.push(self.seg_for(line.start, line.end, line.front, line.id));
            if let Some(back) = line.back {
                segs.push(self.seg_for(line.end, line.start, back, line.id));
            }
        }
        if segs.is_empty() {
            return Err(BspError::NoSegments);
        }

        let region = self.bounds.corners().to_vec();
        let (root, _) = self.build_child(segs, region, 0)?;
        let tree = BspTree::new(self.nodes, self.subsectors, root, self.bounds);
        Ok((tree, self.segments))
    }

    fn seg_for(&self, start: FixedVec2, end: FixedVec2, side: SideId, line: LineId) -> BuildSeg {
        BuildSeg {
            start,
            end,
            side: Some(side),
            line: Some(line),
            sector: self.sides.get(side).map(|s| s.sector),
        }
    }

    fn build_child(
        &mut self,
        segs: Vec<BuildSeg>,
        region: Vec<FixedVec2>,
        depth: usize,
    ) -> Result<(BspChild, BoundingBox), BspError> {
        if depth > MAX_DEPTH {
            return Err(BspError::DepthLimit);
        }

        let bbox = region_bbox(&region, &segs);
        if is_convex(&segs) {
            let id = self.make_leaf(segs, bbox)?;
            return Ok((BspChild::Subsector(id), bbox));
        }

        let splitter = pick_splitter(&segs).ok_or(BspError::NoSplitter { segments: segs.len() })?;
        let (right, left) = partition(&segs, &splitter);

        let right_region = clip_region(&region, splitter.start, splitter.delta(), true);
        let left_region = clip_region(&region, splitter.start, splitter.delta(), false);

        let (right_child, right_bbox) = self.build_child(right, right_region, depth + 1)?;
        let (left_child, left_bbox) = self.build_child(left, left_region, depth + 1)?;

        self.nodes.push(BspNode {
            start: splitter.start,
            delta: splitter.delta(),
            right: right_child,
            left: left_child,
            right_bbox,
            left_bbox,
        });
        Ok((BspChild::Node(self.nodes.len() - 1), bbox))
    }

    fn make_leaf(&mut self, segs: Vec<BuildSeg>, bbox: BoundingBox) -> Result<usize, BspError> {
        let id = self.subsectors.len();
        let sectors: BTreeSet<SectorId> = segs.iter().filter_map(|s| s.sector).collect();
        if sectors.len() != 1 {
            return Err(BspError::NonManifold { subsector: id, sectors: sectors.into_iter().collect() });
        }
        let sector = sectors.into_iter().next().unwrap_or_default();

        let mut indices = Vec::with_capacity(segs.len());
        for seg in segs {
            indices.push(self.segments.len());
            self.segments.push(Segment {
                id: self.segments.len(),
                start: seg.start,
                end: seg.end,
                side: seg.side,
                line: seg.line,
                subsector: id,
            });
        }

        self.subsectors.push(Subsector { id, sector, segments: indices, bbox });
        Ok(id)
    }
}

/// Which side of the line through `start` along `delta` the point lies:
/// `Less` for right, `Greater` for left, `Equal` when on the line.
fn point_side(start: FixedVec2, delta: FixedVec2, point: FixedVec2) -> Ordering {
    delta.cross_wide(point - start).cmp(&0)
}

fn classify(splitter: &BuildSeg, seg: &BuildSeg) -> SegSide {
    let delta = splitter.delta();
    let a = point_side(splitter.start, delta, seg.start);
    let b = point_side(splitter.start, delta, seg.end);

    match (a, b) {
        (Ordering::Equal, Ordering::Equal) => {
            // Collinear: facing the same way keeps it with the splitter
            if delta.dot_wide(seg.delta()) > 0 { SegSide::Right } else { SegSide::Left }
        }
        (Ordering::Greater, Ordering::Less) | (Ordering::Less, Ordering::Greater) => SegSide::Split,
        (Ordering::Greater, _) | (_, Ordering::Greater) => SegSide::Left,
        _ => SegSide::Right,
    }
}

fn is_convex(segs: &[BuildSeg]) -> bool {
    segs.iter()
        .all(|a| segs.iter().all(|b| classify(a, b) == SegSide::Right))
}

fn pick_splitter(segs: &[BuildSeg]) -> Option<BuildSeg> {
    let mut best: Option<(usize, BuildSeg)> = None;

    for candidate in segs {
        let (mut right, mut left, mut splits) = (0usize, 0usize, 0usize);
        for seg in segs {
            match classify(candidate, seg) {
                SegSide::Right => right += 1,
                SegSide::Left => left += 1,
                SegSide::Split => {
                    splits += 1;
                    right += 1;
                    left += 1;
                }
            }
        }
        if left == 0 {
            continue;
        }

        let score = splits * SPLIT_COST + right.abs_diff(left);
        if best.map_or(true, |(best_score, _)| score < best_score) {
            best = Some((score, *candidate));
        }
    }

    best.map(|(_, seg)| seg)
}

fn partition(segs: &[BuildSeg], splitter: &BuildSeg) -> (Vec<BuildSeg>, Vec<BuildSeg>) {
    let mut right = Vec::new();
    let mut left = Vec::new();

    for seg in segs {
        match classify(splitter, seg) {
            SegSide::Right => right.push(*seg),
            SegSide::Left => left.push(*seg),
            SegSide::Split => {
                let delta = splitter.delta();
                let point = intersect(splitter.start, delta, seg.start, seg.end);
                let start_right = point_side(splitter.start, delta, seg.start) == Ordering::Less;

                if point == seg.start || point == seg.end {
                    // Cut collapsed to an endpoint, keep the segment whole on
                    // the side of its far end
                    let far = if point == seg.start { seg.end } else { seg.start };
                    if point_side(splitter.start, delta, far) == Ordering::Less {
                        right.push(*seg);
                    } else {
                        left.push(*seg);
                    }
                    continue;
                }

                let first = BuildSeg { end: point, ..*seg };
                let second = BuildSeg { start: point, ..*seg };
                if start_right {
                    right.push(first);
                    left.push(second);
                } else {
                    left.push(first);
                    right.push(second);
                }
            }
        }
    }

    (right, left)
}

/// Intersection of segment `a -> b` with the infinite line through `start`
/// along `delta`. Caller guarantees `a` and `b` lie on different sides.
fn intersect(start: FixedVec2, delta: FixedVec2, a: FixedVec2, b: FixedVec2) -> FixedVec2 {
    let ca = delta.cross_wide(a - start);
    let cb = delta.cross_wide(b - start);
    let denom = ca - cb;
    if denom == 0 {
        return a;
    }
    let d = b - a;
    FixedVec2::new(
        a.x + ((d.x as i128 * ca) / denom) as Fixed,
        a.y + ((d.y as i128 * ca) / denom) as Fixed,
    )
}

/// Clip a convex polygon to one side of a line (Sutherland-Hodgman).
fn clip_region(
    polygon: &[FixedVec2],
    start: FixedVec2,
    delta: FixedVec2,
    keep_right: bool,
) -> Vec<FixedVec2> {
    let inside = |p: FixedVec2| {
        let side = point_side(start, delta, p);
        if keep_right { side != Ordering::Greater } else { side != Ordering::Less }
    };

    let mut out = Vec::with_capacity(polygon.len() + 1);
    for (i, &current) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        let current_in = inside(current);
        if current_in {
            out.push(current);
        }
        if current_in != inside(next) {
            out.push(intersect(start, delta, current, next));
        }
    }
    out
}

fn region_bbox(region: &[FixedVec2], segs: &[BuildSeg]) -> BoundingBox {
    let from_segs = || {
        BoundingBox::from_points(segs.iter().flat_map(|s| [s.start, s.end]))
            .unwrap_or_else(|| BoundingBox::new(FixedVec2::ZERO, FixedVec2::ZERO))
    };
    BoundingBox::from_points(region.iter().copied())
        .unwrap_or_else(from_segs)
        .expand(REGION_MARGIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;

    fn seg(x1: i32, y1: i32, x2: i32, y2: i32, sector: SectorId) -> BuildSeg {
        BuildSeg {
            start: FixedVec2::from_ints(x1, y1),
            end: FixedVec2::from_ints(x2, y2),
            side: Some(0),
            line: Some(0),
            sector: Some(sector),
        }
    }

    #[test]
    fn test_classify() {
        let splitter = seg(0, 0, 0, 64, 0);
        assert_eq!(classify(&splitter, &seg(10, 0, 10, 64, 0)), SegSide::Right);
        assert_eq!(classify(&splitter, &seg(-10, 0, -10, 64, 0)), SegSide::Left);
        assert_eq!(classify(&splitter, &seg(-10, 5, 10, 5, 0)), SegSide::Split);
        assert_eq!(classify(&splitter, &seg(0, 100, 0, 200, 0)), SegSide::Right);
        assert_eq!(classify(&splitter, &seg(0, 200, 0, 100, 0)), SegSide::Left);
        // Touching the splitter with one endpoint is not a split
        assert_eq!(classify(&splitter, &seg(0, 10, 20, 10, 0)), SegSide::Right);
    }

    #[test]
    fn test_square_is_convex() {
        let square = [
            seg(0, 0, 0, 64, 0),
            seg(0, 64, 64, 64, 0),
            seg(64, 64, 64, 0, 0),
            seg(64, 0, 0, 0, 0),
        ];
        assert!(is_convex(&square));

        // Reversed winding faces outward
        let inverted: Vec<BuildSeg> = square
            .iter()
            .map(|s| BuildSeg { start: s.end, end: s.start, ..*s })
            .collect();
        assert!(!is_convex(&inverted));
    }

    #[test]
    fn test_partition_splits_straddlers() {
        let splitter = seg(0, 0, 0, 64, 0);
        let straddler = seg(-16, 32, 16, 32, 0);
        let (right, left) = partition(&[splitter, straddler], &splitter);

        assert_eq!(right.len(), 2);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].start, FixedVec2::from_ints(-16, 32));
        assert_eq!(left[0].end, FixedVec2::from_ints(0, 32));
        assert_eq!(right[1].start, FixedVec2::from_ints(0, 32));
    }

    #[test]
    fn test_clip_region_halves_box() {
        let square = BoundingBox::new(FixedVec2::from_ints(-64, -64), FixedVec2::from_ints(64, 64));
        let right = clip_region(&square.corners(), FixedVec2::ZERO, FixedVec2::NORTH, true);
        let bbox = BoundingBox::from_points(right).unwrap();
        assert_eq!(bbox.min.x, 0);
        assert_eq!(bbox.max.x, from_int(64));
        assert_eq!(bbox.height(), from_int(128));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let builder = BspBuilder::new(&[], &[], BoundingBox::new(FixedVec2::ZERO, FixedVec2::ZERO));
        assert_eq!(builder.build().err(), Some(BspError::NoSegments));
    }
}
