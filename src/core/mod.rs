//! Integer-only building blocks shared by every simulation module.
//!
//! Nothing here reads the clock, allocates hash-ordered containers or
//! touches floats on the tick path, so identical inputs give bit-identical
//! worlds on every platform.

pub mod fixed;
pub mod vec2;
pub mod angle;
pub mod bbox;
pub mod rng;
pub mod hash;

pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::{FixedVec2, FixedVec3};
pub use angle::Angle;
pub use bbox::BoundingBox;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
