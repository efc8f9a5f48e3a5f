//! World configuration.
//!
//! Plain structs with defaults. The binary may override a few values from
//! the environment; config files are the caller's business.

use std::str::FromStr;
use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::core::fixed::{
    Fixed, FRICTION, GRAVITY, MAX_MOVE, MAX_STEP_HEIGHT, STOP_SPEED, USE_RANGE,
};

/// Difficulty, 1 (easiest) to 5.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    /// I'm too young to die
    VeryEasy,
    /// Hey, not too rough
    Easy,
    /// Hurt me plenty
    #[default]
    Medium,
    /// Ultra-violence
    Hard,
    /// Nightmare
    Nightmare,
}

impl SkillLevel {
    /// Skill from its 1-based number.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::VeryEasy),
            2 => Some(Self::Easy),
            3 => Some(Self::Medium),
            4 => Some(Self::Hard),
            5 => Some(Self::Nightmare),
            _ => None,
        }
    }

    /// 1-based number.
    pub fn number(self) -> u8 {
        match self {
            Self::VeryEasy => 1,
            Self::Easy => 2,
            Self::Medium => 3,
            Self::Hard => 4,
            Self::Nightmare => 5,
        }
    }
}

impl FromStr for SkillLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(skill) = s.parse::<u8>().ok().and_then(Self::from_number) {
            return Ok(skill);
        }
        match s.to_ascii_lowercase().as_str() {
            "veryeasy" | "baby" => Ok(Self::VeryEasy),
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "nightmare" => Ok(Self::Nightmare),
            _ => Err(format!("unknown skill level: {}", s)),
        }
    }
}

/// Movement tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Downward acceleration per tick
    pub gravity: Fixed,
    /// Highest floor difference an entity climbs without being blocked
    pub max_step_height: Fixed,
    /// How many times a blocked move may slide along walls
    pub max_slide_iterations: u32,
    /// Halvings used to find the furthest position before an obstruction
    pub bisect_steps: u32,
    /// Horizontal velocity kept per grounded tick
    pub friction: Fixed,
    /// Speed below which a grounded entity stops
    pub stop_speed: Fixed,
    /// Largest horizontal speed per axis
    pub max_move: Fixed,
    /// Reach of the use action
    pub use_range: Fixed,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            max_step_height: MAX_STEP_HEIGHT,
            max_slide_iterations: 3,
            bisect_steps: 8,
            friction: FRICTION,
            stop_speed: STOP_SPEED,
            max_move: MAX_MOVE,
            use_range: USE_RANGE,
        }
    }
}

/// Everything [`crate::world::World::load`] needs besides the map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Skill used for map population
    pub skill: SkillLevel,
    /// RNG seed
    pub seed: u64,
    /// Players to create after population
    pub player_count: usize,
    /// Pending ticks above which the runner drops the backlog (10 s)
    pub tick_overflow_threshold: u32,
    /// Movement tunables
    pub physics: PhysicsConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            skill: SkillLevel::Medium,
            seed: 0,
            player_count: 1,
            tick_overflow_threshold: 10 * crate::TICK_RATE,
            physics: PhysicsConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Defaults overridden by `DOOMSIM_SKILL`, `DOOMSIM_SEED` and
    /// `DOOMSIM_TICK_OVERFLOW`. Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(skill) = env_value::<SkillLevel>("DOOMSIM_SKILL") {
            config.skill = skill;
        }
        if let Some(seed) = env_value::<u64>("DOOMSIM_SEED") {
            config.seed = seed;
        }
        if let Some(threshold) = env_value::<u32>("DOOMSIM_TICK_OVERFLOW") {
            config.tick_overflow_threshold = threshold;
        }
        config
    }
}

fn env_value<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid environment value");
            None
        }
    }
}
