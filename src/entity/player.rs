//! Players: the entity a tick command drives, plus what it carries and how
//! the camera follows it.

use serde::{Serialize, Deserialize};

use crate::core::angle::Angle;
use crate::core::fixed::{Fixed, FIXED_ONE, VIEW_HEIGHT, fixed_approach};
use crate::core::vec2::{FixedVec2, FixedVec3};
use super::inventory::Inventory;
use super::{Entity, EntityId};

/// Thrust per unit of forward/side move (Doom scale: 50 is a full run).
pub const MOVE_SCALE: Fixed = 2048;

/// Largest forward or side move accepted.
pub const MAX_MOVE_INPUT: i32 = 50;

/// Pitch limit in either direction.
pub const MAX_PITCH: i32 = 32 * FIXED_ONE;

/// One tick of player intent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickCommand {
    /// Forward move, -50..=50
    pub forward_move: i32,
    /// Strafe move (positive is right), -50..=50
    pub side_move: i32,
    /// Yaw change this tick, in binary angle units
    pub angle_turn: i32,
    /// Pitch change this tick
    pub pitch_turn: i32,
    /// Button bits
    pub buttons: u8,
}

impl TickCommand {
    /// Use button
    pub const USE: u8 = 0x01;
    /// Attack button
    pub const ATTACK: u8 = 0x02;

    /// Whether every bit of `button` is held.
    #[inline]
    pub fn has(&self, button: u8) -> bool {
        self.buttons & button == button
    }

    /// Command walking forward at `speed` (clamped to the input range).
    pub fn forward(speed: i32) -> Self {
        Self { forward_move: speed, ..Self::default() }
    }

    /// Command pressing use.
    pub fn use_press() -> Self {
        Self { buttons: Self::USE, ..Self::default() }
    }

    /// Horizontal thrust for a body facing `angle`.
    pub fn thrust(&self, angle: Angle) -> FixedVec2 {
        let forward = self.forward_move.clamp(-MAX_MOVE_INPUT, MAX_MOVE_INPUT) * MOVE_SCALE;
        let side = self.side_move.clamp(-MAX_MOVE_INPUT, MAX_MOVE_INPUT) * MOVE_SCALE;
        let right = Angle(angle.0.wrapping_sub(crate::core::angle::ANG90));
        angle.to_vector(forward) + right.to_vector(side)
    }
}

/// Where a renderer should place the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Camera {
    /// Eye position
    pub position: FixedVec3,
    /// Yaw
    pub angle: Angle,
    /// Pitch
    pub pitch: Fixed,
}

/// A player: owns a body entity, an inventory and per-tick input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Zero-based player number
    pub index: usize,
    /// Body entity
    pub entity: EntityId,
    /// Carried items, weapons, keys and powerups
    pub inventory: Inventory,
    /// Input for the coming tick
    pub command: TickCommand,
    /// Use was held last tick (use fires on press, not while held)
    pub use_held: bool,
    /// Eye height above the body's feet
    pub view_height: Fixed,
    /// Eye height at the previous tick, for interpolation
    pub prev_view_height: Fixed,
    /// Look pitch
    pub pitch: Fixed,
}

impl Player {
    /// Create a player bound to a body.
    pub fn new(index: usize, entity: EntityId) -> Self {
        Self {
            index,
            entity,
            inventory: Inventory::new(),
            command: TickCommand::default(),
            use_held: false,
            view_height: VIEW_HEIGHT,
            prev_view_height: VIEW_HEIGHT,
            pitch: 0,
        }
    }

    /// Whether use was pressed this tick.
    pub fn use_pressed(&self) -> bool {
        self.command.has(TickCommand::USE) && !self.use_held
    }

    /// Turn the body and pitch the view by the current command.
    pub fn apply_look(&mut self, body: &mut Entity) {
        body.angle = Angle(body.angle.0.wrapping_add(self.command.angle_turn as u32));
        self.pitch = self
            .pitch
            .saturating_add(self.command.pitch_turn)
            .clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Absorb a sudden change of the body's height (steps), so the eye
    /// glides to the new height instead of snapping.
    pub fn absorb_step(&mut self, delta_z: Fixed) {
        self.view_height = self.view_height.saturating_sub(delta_z).max(VIEW_HEIGHT / 2);
    }

    /// Move the eye back toward its resting height.
    pub fn tick_view(&mut self) {
        self.prev_view_height = self.view_height;
        self.view_height = fixed_approach(self.view_height, VIEW_HEIGHT, FIXED_ONE);
    }

    /// Camera for rendering at `fraction` of the way into the next tick.
    pub fn camera(&self, body: &Entity, fraction: Fixed) -> Camera {
        let position = body.interpolated_position(fraction);
        let view = crate::core::fixed::fixed_lerp(self.prev_view_height, self.view_height, fraction);
        Camera {
            position: FixedVec3::new(position.x, position.y, position.z.saturating_add(view)),
            angle: body.angle,
            pitch: self.pitch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrust_direction() {
        let east = TickCommand::forward(50).thrust(Angle::EAST);
        assert_eq!(east, FixedVec2::new(50 * MOVE_SCALE, 0));

        let north = TickCommand::forward(50).thrust(Angle::NORTH);
        assert_eq!(north, FixedVec2::new(0, 50 * MOVE_SCALE));

        // Strafing right while facing north moves east
        let strafe = TickCommand { side_move: 50, ..TickCommand::default() }.thrust(Angle::NORTH);
        assert_eq!(strafe, FixedVec2::new(50 * MOVE_SCALE, 0));

        // Input is clamped
        assert_eq!(TickCommand::forward(500).thrust(Angle::EAST), east);
    }

    #[test]
    fn test_use_fires_on_press_only() {
        let mut player = Player::new(0, EntityId(0));
        player.command = TickCommand::use_press();
        assert!(player.use_pressed());
        player.use_held = true;
        assert!(!player.use_pressed());
    }

    #[test]
    fn test_view_recovers_after_step() {
        let mut player = Player::new(0, EntityId(0));
        player.absorb_step(8 * FIXED_ONE);
        assert_eq!(player.view_height, VIEW_HEIGHT - 8 * FIXED_ONE);
        for _ in 0..8 {
            player.tick_view();
        }
        assert_eq!(player.view_height, VIEW_HEIGHT);
        assert_eq!(player.prev_view_height, VIEW_HEIGHT - FIXED_ONE);
    }
}
