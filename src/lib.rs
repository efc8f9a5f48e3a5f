//! # doomsim
//!
//! Deterministic Doom-compatible world simulation: BSP geometry, entities,
//! collision and movement, and line specials, ticked at a fixed 35 Hz.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          DOOMSIM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/       - Deterministic primitives                      │
//! │  ├── fixed.rs  - Q16.16 fixed-point arithmetic               │
//! │  ├── vec2.rs   - 2D/3D fixed-point vectors                   │
//! │  ├── angle.rs  - Binary angles and lookup trigonometry       │
//! │  ├── bbox.rs   - Axis-aligned bounding boxes                 │
//! │  ├── rng.rs    - Deterministic Xorshift128+ PRNG             │
//! │  └── hash.rs   - State hashing for verification              │
//! │                                                              │
//! │  map/        - Raw map input (serde) and demo maps           │
//! │  geometry/   - Sectors, sides, lines, segments               │
//! │  bsp/        - Node builder, point location, traversal       │
//! │  entity/     - Entities, definitions, players, inventory     │
//! │  physics/    - Blockmap, clipping, sliding, plane movers     │
//! │  special/    - Doors, lifts, crushers, teleporters           │
//! │  world/      - Tick driver, events, runner, snapshots        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The simulation is **100% deterministic**:
//! - No floating-point arithmetic in gameplay
//! - Ordered containers wherever iteration order matters
//! - No system time dependencies (the runner converts time to ticks)
//! - All randomness from the world's seeded Xorshift128+
//!
//! Given the same map, definitions, config and tick commands, two worlds
//! produce **identical state hashes** after every tick.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod map;
pub mod geometry;
pub mod bsp;
pub mod entity;
pub mod physics;
pub mod special;
pub mod world;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::{FixedVec2, FixedVec3};
pub use core::angle::Angle;
pub use core::rng::DeterministicRng;
pub use entity::{DefinitionRegistry, EntityId, TickCommand};
pub use map::MapData;
pub use world::{World, WorldConfig, WorldError, WorldEvent, WorldRunner, WorldSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 35;
