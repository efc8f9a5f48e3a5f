//! Geometry Model
//!
//! The static map graph: sectors, sides, lines and segments, each stored in
//! an index arena. Cross references (side to line, segment to side, sector to
//! lines) are plain indices into these arenas, so the whole map is freed as a
//! unit.
//!
//! Topology never changes after [`GeometryBuilder::build`]. Sector plane
//! heights are driven by sector movers, `Line::activated` by the special
//! manager, and side textures by switches.

pub mod builder;
pub mod line;
pub mod sector;
pub mod segment;
pub mod side;

pub use builder::{GeometryBuilder, GeometryError};
pub use line::{ActivationContext, Line, LineFlags, SpecialArgs};
pub use sector::{Sector, SectorPlane, SectorPlaneFace};
pub use segment::Segment;
pub use side::{Side, SideTextures};

use crate::bsp::BspTree;
use crate::core::bbox::BoundingBox;
use crate::core::vec2::FixedVec2;

/// Index into [`MapGeometry::sectors`].
pub type SectorId = usize;
/// Index into [`MapGeometry::sides`].
pub type SideId = usize;
/// Index into [`MapGeometry::lines`].
pub type LineId = usize;

/// The loaded map: geometry arenas plus the BSP tree built from them.
#[derive(Clone, Debug)]
pub struct MapGeometry {
    /// Map name
    pub name: String,
    /// Vertex positions
    pub vertices: Vec<FixedVec2>,
    /// Sectors
    pub sectors: Vec<Sector>,
    /// Sides
    pub sides: Vec<Side>,
    /// Lines
    pub lines: Vec<Line>,
    /// Segments produced by the BSP build
    pub segments: Vec<Segment>,
    /// Spatial index
    pub bsp: BspTree,
    /// Bounds of every vertex
    pub bounds: BoundingBox,
}

impl MapGeometry {
    /// Sector containing `point`.
    #[inline]
    pub fn sector_at(&self, point: FixedVec2) -> SectorId {
        self.bsp.to_sector(point)
    }

    /// Sector the line's front side faces into.
    #[inline]
    pub fn front_sector(&self, line: &Line) -> SectorId {
        self.sides[line.front].sector
    }

    /// Sector the line's back side faces into, for two-sided lines.
    #[inline]
    pub fn back_sector(&self, line: &Line) -> Option<SectorId> {
        line.back.map(|side| self.sides[side].sector)
    }

    /// Sector on the other side of `line` as seen from `sector`.
    pub fn opposite_sector(&self, line: &Line, sector: SectorId) -> Option<SectorId> {
        let back = self.back_sector(line)?;
        let front = self.front_sector(line);
        Some(if front == sector { back } else { front })
    }

    /// Sectors carrying `tag`, in index order. Tag 0 matches nothing.
    pub fn sectors_with_tag(&self, tag: i32) -> impl Iterator<Item = SectorId> + '_ {
        self.sectors
            .iter()
            .filter(move |sector| tag != 0 && sector.tag == tag)
            .map(|sector| sector.id)
    }

    /// Neighbouring sectors across every two-sided line of `sector`, in the
    /// sector's line order. A neighbour bordering on several lines appears
    /// once per line.
    pub fn adjacent_sectors(&self, sector: SectorId) -> impl Iterator<Item = SectorId> + '_ {
        self.sectors
            .get(sector)
            .into_iter()
            .flat_map(|s| s.lines.iter())
            .filter_map(move |&line| self.opposite_sector(&self.lines[line], sector))
    }

    /// Adjacent sector with the lowest floor. Ties keep the first in line order.
    pub fn lowest_adjacent_floor(&self, sector: SectorId) -> Option<&Sector> {
        self.adjacent_extreme(sector, |s| s.floor.z, |candidate, best| candidate < best)
    }

    /// Adjacent sector with the highest floor. Ties keep the first in line order.
    pub fn highest_adjacent_floor(&self, sector: SectorId) -> Option<&Sector> {
        self.adjacent_extreme(sector, |s| s.floor.z, |candidate, best| candidate > best)
    }

    /// Adjacent sector with the lowest ceiling. Ties keep the first in line order.
    pub fn lowest_adjacent_ceiling(&self, sector: SectorId) -> Option<&Sector> {
        self.adjacent_extreme(sector, |s| s.ceiling.z, |candidate, best| candidate < best)
    }

    /// Adjacent sector with the highest ceiling. Ties keep the first in line order.
    pub fn highest_adjacent_ceiling(&self, sector: SectorId) -> Option<&Sector> {
        self.adjacent_extreme(sector, |s| s.ceiling.z, |candidate, best| candidate > best)
    }

    /// Bounds of every line of `sector`.
    pub fn sector_bbox(&self, sector: SectorId) -> Option<BoundingBox> {
        let sector = self.sectors.get(sector)?;
        sector
            .lines
            .iter()
            .map(|&line| self.lines[line].bbox)
            .reduce(BoundingBox::combine)
    }

    fn adjacent_extreme<K, B>(&self, sector: SectorId, key: K, better: B) -> Option<&Sector>
    where
        K: Fn(&Sector) -> i32,
        B: Fn(i32, i32) -> bool,
    {
        let mut best: Option<&Sector> = None;
        for id in self.adjacent_sectors(sector) {
            let candidate = &self.sectors[id];
            // Strict comparison keeps the earliest sector on ties
            if best.map_or(true, |b| better(key(candidate), key(b))) {
                best = Some(candidate);
            }
        }
        best
    }
}
