//! World state digests.
//!
//! Two worlds fed the same map, seed and tick commands must agree on
//! [`World::compute_hash`](crate::world::World::compute_hash) after every
//! tick, and a world restored from a snapshot must agree with the one the
//! snapshot was taken from. Both checks compare SHA-256 digests built
//! with [`StateHasher`].

use sha2::{Sha256, Digest};

use super::fixed::Fixed;
use super::vec2::FixedVec3;

/// SHA-256 digest of a world.
pub type StateHash = [u8; 32];

/// Prefix that separates world digests from any other SHA-256 use.
const WORLD_DOMAIN: &[u8] = b"DOOMSIM_WORLD_STATE_V1";

/// Feeds simulation values into SHA-256 in a fixed byte layout.
///
/// Integers go in little-endian; strings are length-prefixed so adjacent
/// names cannot run together. Callers are responsible for visiting state
/// in a stable order.
pub struct StateHasher {
    inner: Sha256,
}

impl StateHasher {
    fn with_domain(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update(domain);
        Self { inner }
    }

    /// Single byte.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.inner.update([value]);
    }

    /// Flag, as one byte.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(u8::from(value));
    }

    /// Unsigned 32-bit value.
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.inner.update(value.to_le_bytes());
    }

    /// Signed 32-bit value.
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.inner.update(value.to_le_bytes());
    }

    /// Unsigned 64-bit value.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.inner.update(value.to_le_bytes());
    }

    /// Fixed-point value, by its raw bits.
    #[inline]
    pub fn update_fixed(&mut self, value: Fixed) {
        self.update_i32(value);
    }

    /// Position or velocity, x then y then z.
    #[inline]
    pub fn update_vec3(&mut self, value: FixedVec3) {
        for component in [value.x, value.y, value.z] {
            self.update_fixed(component);
        }
    }

    /// Name such as a texture or definition, length-prefixed.
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.inner.update(value.as_bytes());
    }

    /// Consume the hasher.
    pub fn finalize(self) -> StateHash {
        self.inner.finalize().into()
    }
}

/// Digest of a world at `gametick` started from `seed`.
///
/// The tick and seed are always hashed first; `add_state` appends the rest.
pub fn compute_state_hash<F>(gametick: u32, seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::with_domain(WORLD_DOMAIN);
    hasher.update_u32(gametick);
    hasher.update_u64(seed);
    add_state(&mut hasher);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;

    fn door_state(ceiling: i32, moving: bool) -> StateHash {
        compute_state_hash(35, 0x0D00, |h| {
            h.update_fixed(from_int(ceiling));
            h.update_bool(moving);
            h.update_str("BIGDOOR2");
        })
    }

    #[test]
    fn test_same_state_same_digest() {
        assert_eq!(door_state(64, true), door_state(64, true));
    }

    #[test]
    fn test_every_input_changes_digest() {
        let base = door_state(64, true);
        assert_ne!(base, door_state(65, true));
        assert_ne!(base, door_state(64, false));
        assert_ne!(base, compute_state_hash(36, 0x0D00, |h| {
            h.update_fixed(from_int(64));
            h.update_bool(true);
            h.update_str("BIGDOOR2");
        }));
        assert_ne!(base, compute_state_hash(35, 1, |h| {
            h.update_fixed(from_int(64));
            h.update_bool(true);
            h.update_str("BIGDOOR2");
        }));
    }

    #[test]
    fn test_strings_do_not_run_together() {
        let split = |a: &str, b: &str| {
            compute_state_hash(0, 0, |h| {
                h.update_str(a);
                h.update_str(b);
            })
        };
        assert_ne!(split("SW1", "COMP"), split("SW1COMP", ""));
    }

    #[test]
    fn test_vec3_order_matters() {
        let at = |v: FixedVec3| compute_state_hash(0, 0, |h| h.update_vec3(v));
        assert_ne!(at(FixedVec3::from_ints(1, 2, 3)), at(FixedVec3::from_ints(3, 2, 1)));
    }
}
