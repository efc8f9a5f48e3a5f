//! Geometry construction from raw map data.

use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::bsp::{BspBuilder, BspError};
use crate::core::bbox::BoundingBox;
use crate::core::fixed::from_int;
use crate::core::vec2::FixedVec2;
use crate::map::MapData;
use crate::special::line_special::LineSpecialType;
use super::{
    Line, LineFlags, MapGeometry, Sector, SectorPlane, Side, SideTextures, SpecialArgs,
};

/// Largest coordinate magnitude representable in Q16.16.
const MAX_COORDINATE: i32 = 32767;

/// Reasons a map cannot be turned into geometry. All of them abort the load.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A line references a vertex that does not exist.
    #[error("line {line} references missing vertex {vertex}")]
    InvalidVertex {
        /// Offending line
        line: usize,
        /// Missing vertex index
        vertex: usize,
    },
    /// A coordinate or height does not fit in fixed-point.
    #[error("value {value} out of range in {what} {index}")]
    OutOfRange {
        /// Kind of element
        what: &'static str,
        /// Element index
        index: usize,
        /// Offending value
        value: i32,
    },
    /// A line references a side that does not exist.
    #[error("line {line} references missing side {side}")]
    InvalidSide {
        /// Offending line
        line: usize,
        /// Missing side index
        side: usize,
    },
    /// A side references a sector that does not exist.
    #[error("side {side} references missing sector {sector}")]
    InvalidSector {
        /// Offending side
        side: usize,
        /// Missing sector index
        sector: usize,
    },
    /// A side is used by more than one line face.
    #[error("side {side} is shared by more than one line")]
    SharedSide {
        /// Offending side
        side: usize,
    },
    /// Start and end vertex coincide.
    #[error("line {line} has zero length")]
    ZeroLengthLine {
        /// Offending line
        line: usize,
    },
    /// Every line needs a front side.
    #[error("line {line} has no front side")]
    MissingFrontSide {
        /// Offending line
        line: usize,
    },
    /// The BSP build failed (malformed or non-manifold geometry).
    #[error("BSP build failed: {0}")]
    Bsp(#[from] BspError),
}

/// Builds [`MapGeometry`] from [`MapData`].
pub struct GeometryBuilder;

impl GeometryBuilder {
    /// Validate the map, build the arenas and the BSP tree.
    pub fn build(map: &MapData) -> Result<MapGeometry, GeometryError> {
        let vertices = Self::build_vertices(map)?;
        let mut sectors = Self::build_sectors(map)?;
        let (sides, lines) = Self::build_lines(map, &vertices)?;

        for line in &lines {
            let mut touched = BTreeSet::new();
            for side_id in line.sides() {
                let side = &sides[side_id];
                sectors[side.sector].sides.push(side_id);
                touched.insert(side.sector);
            }
            // A line whose sides face the same sector is listed once
            for sector in touched {
                sectors[sector].lines.push(line.id);
            }
        }

        let bounds = BoundingBox::from_points(vertices.iter().copied())
            .unwrap_or_else(|| BoundingBox::new(FixedVec2::ZERO, FixedVec2::ZERO));
        let (bsp, segments) = BspBuilder::new(&lines, &sides, bounds).build()?;

        debug!(
            map = %map.name,
            sectors = sectors.len(),
            lines = lines.len(),
            segments = segments.len(),
            subsectors = bsp.subsectors().len(),
            "Built map geometry"
        );

        Ok(MapGeometry {
            name: map.name.clone(),
            vertices,
            sectors,
            sides,
            lines,
            segments,
            bsp,
            bounds,
        })
    }

    fn build_vertices(map: &MapData) -> Result<Vec<FixedVec2>, GeometryError> {
        map.vertices
            .iter()
            .enumerate()
            .map(|(index, v)| {
                check_range("vertex", index, v.x)?;
                check_range("vertex", index, v.y)?;
                Ok(FixedVec2::from_ints(v.x, v.y))
            })
            .collect()
    }

    fn build_sectors(map: &MapData) -> Result<Vec<Sector>, GeometryError> {
        map.sectors
            .iter()
            .enumerate()
            .map(|(id, s)| {
                check_range("sector", id, s.floor_height)?;
                check_range("sector", id, s.ceiling_height)?;
                Ok(Sector {
                    id,
                    floor: SectorPlane::new(from_int(s.floor_height), s.floor_texture.clone()),
                    ceiling: SectorPlane::new(from_int(s.ceiling_height), s.ceiling_texture.clone()),
                    light_level: s.light_level,
                    tag: s.tag,
                    special: s.special,
                    is_moving: false,
                    lines: Vec::new(),
                    sides: Vec::new(),
                    entities: BTreeSet::new(),
                })
            })
            .collect()
    }

    fn build_lines(
        map: &MapData,
        vertices: &[FixedVec2],
    ) -> Result<(Vec<Side>, Vec<Line>), GeometryError> {
        let mut sides: Vec<Option<Side>> = vec![None; map.sides.len()];
        let mut lines = Vec::with_capacity(map.lines.len());

        for (id, raw) in map.lines.iter().enumerate() {
            let start = *vertices
                .get(raw.start)
                .ok_or(GeometryError::InvalidVertex { line: id, vertex: raw.start })?;
            let end = *vertices
                .get(raw.end)
                .ok_or(GeometryError::InvalidVertex { line: id, vertex: raw.end })?;
            if start == end {
                return Err(GeometryError::ZeroLengthLine { line: id });
            }

            let front = raw.front.ok_or(GeometryError::MissingFrontSide { line: id })?;
            let faces = std::iter::once((front, true)).chain(raw.back.map(|b| (b, false)));
            for (side_id, is_front) in faces {
                let side = Self::build_side(map, side_id, id, is_front)?;
                let slot = sides
                    .get_mut(side_id)
                    .ok_or(GeometryError::InvalidSide { line: id, side: side_id })?;
                if slot.is_some() {
                    return Err(GeometryError::SharedSide { side: side_id });
                }
                *slot = Some(side);
            }

            if let Some(back) = raw.back {
                if let Some(side) = sides[front].as_mut() {
                    side.partner = Some(back);
                }
                if let Some(side) = sides[back].as_mut() {
                    side.partner = Some(front);
                }
            }

            let special = LineSpecialType::from_number(raw.special).unwrap_or_else(|| {
                warn!(line = id, special = raw.special, "Unknown line special, ignoring");
                LineSpecialType::None
            });

            lines.push(Line {
                id,
                start,
                end,
                front,
                back: raw.back,
                flags: LineFlags::from_map(&raw.flags, raw.back.is_some()),
                special,
                args: SpecialArgs(raw.args),
                activated: false,
                data_changes: 0,
                bbox: BoundingBox::new(start, end),
            });
        }

        // Unreferenced sides keep their slot so side indices stay stable
        let sides = sides
            .into_iter()
            .enumerate()
            .map(|(id, side)| {
                side.unwrap_or_else(|| {
                    warn!(side = id, "Side is not used by any line");
                    Side {
                        id,
                        line: usize::MAX,
                        sector: 0,
                        is_front: false,
                        partner: None,
                        offset: FixedVec2::ZERO,
                        textures: SideTextures::default(),
                    }
                })
            })
            .collect();

        Ok((sides, lines))
    }

    fn build_side(
        map: &MapData,
        side_id: usize,
        line: usize,
        is_front: bool,
    ) -> Result<Side, GeometryError> {
        let raw = map
            .sides
            .get(side_id)
            .ok_or(GeometryError::InvalidSide { line, side: side_id })?;
        if raw.sector >= map.sectors.len() {
            return Err(GeometryError::InvalidSector { side: side_id, sector: raw.sector });
        }
        Ok(Side {
            id: side_id,
            line,
            sector: raw.sector,
            is_front,
            partner: None,
            offset: FixedVec2::from_ints(raw.offset_x, raw.offset_y),
            textures: SideTextures {
                upper: raw.upper_texture.clone(),
                middle: raw.middle_texture.clone(),
                lower: raw.lower_texture.clone(),
            },
        })
    }
}

fn check_range(what: &'static str, index: usize, value: i32) -> Result<(), GeometryError> {
    if value.abs() > MAX_COORDINATE {
        return Err(GeometryError::OutOfRange { what, index, value });
    }
    Ok(())
}
