//! Binary Angle Measurement
//!
//! Angles are stored as a `u32` where the full circle is 2^32, so wrapping
//! arithmetic is rotation. Sine and cosine are evaluated with integer-only
//! polynomials so every platform produces the same bits.

use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

use super::fixed::{Fixed, FIXED_ONE, fixed_mul};
use super::vec2::FixedVec2;

/// A binary angle. 0 faces east (+X), angles grow counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Angle(pub u32);

/// 45 degrees
pub const ANG45: u32 = 0x2000_0000;
/// 90 degrees
pub const ANG90: u32 = 0x4000_0000;
/// 180 degrees
pub const ANG180: u32 = 0x8000_0000;
/// 270 degrees
pub const ANG270: u32 = 0xC000_0000;

/// π/2 in Q30
const HALF_PI_Q30: i64 = 1_686_629_713;
const Q30: i64 = 1 << 30;

impl Angle {
    /// East
    pub const EAST: Self = Self(0);
    /// North
    pub const NORTH: Self = Self(ANG90);
    /// West
    pub const WEST: Self = Self(ANG180);
    /// South
    pub const SOUTH: Self = Self(ANG270);

    /// Create from whole degrees (map things store angles this way).
    pub const fn from_degrees(degrees: i32) -> Self {
        let wrapped = degrees.rem_euclid(360) as u64;
        Self(((wrapped << 32) / 360) as u32)
    }

    /// Whole degrees, truncated.
    pub const fn to_degrees(self) -> u32 {
        ((self.0 as u64 * 360) >> 32) as u32
    }

    /// Radians for rendering output only.
    pub fn to_radians(self) -> f64 {
        self.0 as f64 / 4_294_967_296.0 * std::f64::consts::TAU
    }

    /// Sine in Q16.16.
    pub fn sin(self) -> Fixed {
        let quadrant = self.0 >> 30;
        let within = (self.0 & (ANG90 - 1)) as i64;
        match quadrant {
            0 => quarter_sine(within),
            1 => quarter_sine(Q30 - within),
            2 => -quarter_sine(within),
            _ => -quarter_sine(Q30 - within),
        }
    }

    /// Cosine in Q16.16.
    pub fn cos(self) -> Fixed {
        Self(self.0.wrapping_add(ANG90)).sin()
    }

    /// Unit direction vector for this angle.
    pub fn to_unit_vector(self) -> FixedVec2 {
        FixedVec2::new(self.cos(), self.sin())
    }

    /// Direction vector of the given length.
    pub fn to_vector(self, length: Fixed) -> FixedVec2 {
        FixedVec2::new(fixed_mul(self.cos(), length), fixed_mul(self.sin(), length))
    }
}

impl Add for Angle {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

/// sin(π/2 · t) for t in [0, 1] given as Q30, returned in Q16.16.
fn quarter_sine(t_q30: i64) -> Fixed {
    let x = (t_q30 * HALF_PI_Q30) >> 30;
    let x2 = (x * x) >> 30;

    // Taylor series to x^9, Horner form
    let mut acc = Q30 - x2 / 72;
    acc = Q30 - ((x2 * acc) >> 30) / 42;
    acc = Q30 - ((x2 * acc) >> 30) / 20;
    acc = Q30 - ((x2 * acc) >> 30) / 6;
    let sine = (x * acc) >> 30;

    let rounded = ((sine + (1 << 13)) >> 14) as Fixed;
    rounded.clamp(0, FIXED_ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_cardinal_directions_are_exact() {
        assert_eq!(Angle::EAST.cos(), FIXED_ONE);
        assert_eq!(Angle::EAST.sin(), 0);
        assert_eq!(Angle::NORTH.sin(), FIXED_ONE);
        assert_eq!(Angle::NORTH.cos(), 0);
        assert_eq!(Angle::WEST.cos(), -FIXED_ONE);
        assert_eq!(Angle::SOUTH.sin(), -FIXED_ONE);
    }

    #[test]
    fn test_sine_accuracy() {
        let diag = Angle(ANG45).sin();
        assert!((diag - to_fixed(std::f64::consts::FRAC_1_SQRT_2)).abs() <= 2);

        for degrees in (0..360).step_by(7) {
            let angle = Angle::from_degrees(degrees);
            let expected = to_fixed(angle.to_radians().sin());
            assert!((angle.sin() - expected).abs() <= 2, "sin({}) off", degrees);
        }
    }

    #[test]
    fn test_degrees_round_trip() {
        assert_eq!(Angle::from_degrees(90), Angle::NORTH);
        assert_eq!(Angle::from_degrees(-90), Angle::SOUTH);
        assert_eq!(Angle::from_degrees(450), Angle::NORTH);
        assert_eq!(Angle::from_degrees(180).to_degrees(), 180);
    }

    #[test]
    fn test_wrapping_rotation() {
        let a = Angle::from_degrees(270) + Angle::from_degrees(180);
        assert_eq!(a, Angle::from_degrees(90));
        assert_eq!(Angle::EAST - Angle::NORTH, Angle::SOUTH);
    }
}
