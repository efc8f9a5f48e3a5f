//! Uniform grid over the map bounding lines and entity links, so collision
//! queries only look at what is nearby.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::bbox::BoundingBox;
use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::core::vec2::FixedVec2;
use crate::entity::EntityId;
use crate::geometry::{LineId, MapGeometry};

/// Cell edge length: 128 map units.
pub const BLOCK_SIZE: Fixed = 128 * FIXED_ONE;

#[derive(Clone, Debug, Default)]
struct Block {
    lines: Vec<LineId>,
    entities: BTreeSet<EntityId>,
}

/// Grid of blocks covering the map bounds.
///
/// Boxes reaching outside the grid are clamped to the border blocks, so
/// queries never miss anything linked there.
#[derive(Clone, Debug)]
pub struct Blockmap {
    origin: FixedVec2,
    width: usize,
    height: usize,
    blocks: Vec<Block>,
    entity_blocks: BTreeMap<EntityId, Vec<usize>>,
}

impl Blockmap {
    /// Build the grid and insert every line into the blocks its bounds touch.
    pub fn new(geometry: &MapGeometry) -> Self {
        let bounds = geometry.bounds;
        let width = (bounds.width() as i64 / BLOCK_SIZE as i64) as usize + 1;
        let height = (bounds.height() as i64 / BLOCK_SIZE as i64) as usize + 1;

        let mut blockmap = Self {
            origin: bounds.min,
            width,
            height,
            blocks: vec![Block::default(); width * height],
            entity_blocks: BTreeMap::new(),
        };

        for line in &geometry.lines {
            for index in blockmap.block_indices(&line.bbox) {
                blockmap.blocks[index].lines.push(line.id);
            }
        }
        blockmap
    }

    /// Grid size in blocks (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn column(&self, x: Fixed) -> usize {
        let offset = (x as i64 - self.origin.x as i64).max(0) / BLOCK_SIZE as i64;
        (offset as usize).min(self.width - 1)
    }

    fn row(&self, y: Fixed) -> usize {
        let offset = (y as i64 - self.origin.y as i64).max(0) / BLOCK_SIZE as i64;
        (offset as usize).min(self.height - 1)
    }

    fn block_indices(&self, bbox: &BoundingBox) -> Vec<usize> {
        let (x0, x1) = (self.column(bbox.min.x), self.column(bbox.max.x));
        let (y0, y1) = (self.row(bbox.min.y), self.row(bbox.max.y));
        let mut indices = Vec::with_capacity((x1 - x0 + 1) * (y1 - y0 + 1));
        for row in y0..=y1 {
            for column in x0..=x1 {
                indices.push(row * self.width + column);
            }
        }
        indices
    }

    /// Lines in every block `bbox` touches, in id order.
    pub fn lines_in(&self, bbox: &BoundingBox) -> BTreeSet<LineId> {
        self.block_indices(bbox)
            .into_iter()
            .flat_map(|index| self.blocks[index].lines.iter().copied())
            .collect()
    }

    /// Entities linked in every block `bbox` touches, in id order.
    pub fn entities_in(&self, bbox: &BoundingBox) -> BTreeSet<EntityId> {
        self.block_indices(bbox)
            .into_iter()
            .flat_map(|index| self.blocks[index].entities.iter().copied())
            .collect()
    }

    /// Link an entity into every block its box touches. Relinking moves it.
    pub fn link(&mut self, entity: EntityId, bbox: &BoundingBox) {
        self.unlink(entity);
        let indices = self.block_indices(bbox);
        for &index in &indices {
            self.blocks[index].entities.insert(entity);
        }
        self.entity_blocks.insert(entity, indices);
    }

    /// Remove an entity from the blocks it was linked into.
    pub fn unlink(&mut self, entity: EntityId) -> bool {
        let Some(indices) = self.entity_blocks.remove(&entity) else {
            return false;
        };
        for index in indices {
            self.blocks[index].entities.remove(&entity);
        }
        true
    }

    /// Whether an entity is linked.
    pub fn is_linked(&self, entity: EntityId) -> bool {
        self.entity_blocks.contains_key(&entity)
    }
}
