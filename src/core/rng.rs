//! Seeded randomness for the simulation.
//!
//! Every random decision a world makes (monster wander headings, how long
//! they keep walking, missile damage rolls) is drawn from a single
//! [`DeterministicRng`] owned by the world. Its state is part of the state
//! hash and is carried verbatim in snapshots, so a restored world keeps
//! rolling the same numbers.
//!
//! The generator is Xorshift128+ seeded through SplitMix64.

use serde::{Serialize, Deserialize};

/// Xorshift128+ generator.
///
/// ```
/// use doomsim::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(0x0D00);
/// let mut b = a.clone();
/// assert_eq!(a.roll(8), b.roll(8));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Generator for a world seed.
    pub fn new(seed: u64) -> Self {
        let mut mix = seed;
        let state = [splitmix64(&mut mix), splitmix64(&mut mix)];
        // All-zero state would be stuck at zero forever
        if state == [0, 0] {
            return Self { state: [1, 1] };
        }
        Self { state }
    }

    /// Next raw 64-bit output.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let [s0, mut s1] = self.state;
        let out = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state = [s0.rotate_left(24) ^ s1 ^ (s1 << 16), s1.rotate_left(37)];

        out
    }

    /// Uniform value in `[0, bound)`. A zero bound yields zero.
    #[inline]
    pub fn next_int(&mut self, bound: u32) -> u32 {
        match bound {
            0 => 0,
            _ => (self.next_u64() % u64::from(bound)) as u32,
        }
    }

    /// Die roll in `[1, sides]`.
    #[inline]
    pub fn roll(&mut self, sides: u32) -> u32 {
        self.next_int(sides.max(1)) + 1
    }

    /// Raw generator state, fed into the world hash.
    pub fn state(&self) -> [u64; 2] {
        self.state
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_pinned() {
        // Recorded command streams replay against these exact outputs
        let mut rng = DeterministicRng::new(0x0D00);
        assert_eq!(rng.next_u64(), 3201881905259488690);
        assert_eq!(rng.next_u64(), 17745131142480288107);
        assert_eq!(rng.next_u64(), 10589132341440204445);
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let rng = DeterministicRng::new(0);
        assert_ne!(rng.state(), [0, 0]);
        assert_eq!(rng, DeterministicRng::default());
    }

    #[test]
    fn test_wander_headings_cover_all_directions() {
        let mut rng = DeterministicRng::new(7);
        let mut seen = [0u32; 8];
        for _ in 0..800 {
            seen[rng.next_int(8) as usize] += 1;
        }
        assert!(seen.iter().all(|&count| count > 50), "{seen:?}");
        assert_eq!(rng.next_int(0), 0);
    }

    #[test]
    fn test_roll_stays_on_the_die() {
        let mut rng = DeterministicRng::new(99);
        let rolls: Vec<u32> = (0..500).map(|_| rng.roll(8)).collect();
        assert!(rolls.iter().all(|r| (1..=8).contains(r)));
        assert!(rolls.contains(&1) && rolls.contains(&8));
        assert_eq!(rng.roll(0), 1);
    }

    #[test]
    fn test_clone_continues_identically() {
        let mut rng = DeterministicRng::new(2024);
        for _ in 0..37 {
            rng.next_u64();
        }
        let mut resumed = rng.clone();
        for _ in 0..64 {
            assert_eq!(rng.next_int(256), resumed.next_int(256));
        }
    }

    #[test]
    fn test_serde_keeps_position() {
        let mut rng = DeterministicRng::new(5);
        rng.roll(6);
        let bytes = bincode::serialize(&rng).unwrap();
        let mut decoded: DeterministicRng = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.next_u64(), rng.next_u64());
    }
}
