//! Line faces.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use super::{LineId, SectorId, SideId};

/// Upper, middle and lower wall textures of a side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideTextures {
    /// Drawn above the partner sector's ceiling
    pub upper: String,
    /// Drawn between the planes (walls, grates)
    pub middle: String,
    /// Drawn below the partner sector's floor
    pub lower: String,
}

impl SideTextures {
    /// Swap every `SW1` switch texture for its `SW2` counterpart (and back).
    ///
    /// Returns true if anything changed.
    pub fn toggle_switch(&mut self) -> bool {
        let mut changed = false;
        for texture in [&mut self.upper, &mut self.middle, &mut self.lower] {
            if let Some(toggled) = switch_partner(texture) {
                *texture = toggled;
                changed = true;
            }
        }
        changed
    }
}

fn switch_partner(texture: &str) -> Option<String> {
    let upper = texture.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("SW1") {
        Some(format!("SW2{}", rest))
    } else {
        upper.strip_prefix("SW2").map(|rest| format!("SW1{}", rest))
    }
}

/// One face of a line, looking into a sector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Side {
    /// Index in the side arena
    pub id: SideId,
    /// Owning line
    pub line: LineId,
    /// Sector this side faces into
    pub sector: SectorId,
    /// True for the line's front side
    pub is_front: bool,
    /// The opposite side on a two-sided line
    pub partner: Option<SideId>,
    /// Texture offset in fixed-point units
    pub offset: FixedVec2,
    /// Wall textures
    pub textures: SideTextures,
}

impl Side {
    /// The opposite face, if the line is two-sided.
    #[inline]
    pub fn partner_side(&self) -> Option<SideId> {
        self.partner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_switch_textures() {
        let mut textures = SideTextures {
            upper: String::new(),
            middle: "sw1comp".to_string(),
            lower: "STEP1".to_string(),
        };

        assert!(textures.toggle_switch());
        assert_eq!(textures.middle, "SW2COMP");
        assert_eq!(textures.lower, "STEP1");

        assert!(textures.toggle_switch());
        assert_eq!(textures.middle, "SW1COMP");

        let mut plain = SideTextures::default();
        assert!(!plain.toggle_switch());
    }
}
