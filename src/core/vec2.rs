//! Fixed-point vectors.
//!
//! [`FixedVec2`] is a point or direction on the map plane; [`FixedVec3`]
//! adds height (Z is up). Component arithmetic wraps like the underlying
//! `i32`. Dot and cross products of map-sized vectors overflow Q16.16, so
//! the exact variants widen to `i128` and stay in Q32.32.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

use super::fixed::{
    Fixed, FIXED_ONE, FIXED_SCALE,
    fixed_div, fixed_lerp, fixed_mul, isqrt_u64, to_float,
};

/// Point or direction on the map plane.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// East-west coordinate
    pub x: Fixed,
    /// North-south coordinate
    pub y: Fixed,
}

impl FixedVec2 {
    /// Origin
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// One unit east.
    pub const EAST: Self = Self { x: FIXED_ONE, y: 0 };

    /// One unit north.
    pub const NORTH: Self = Self { x: 0, y: FIXED_ONE };

    /// From raw fixed components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Vertex-style whole map units.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self::new(x << FIXED_SCALE, y << FIXED_SCALE)
    }

    /// Both components multiplied by a fixed scalar.
    #[inline]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(fixed_mul(self.x, factor), fixed_mul(self.y, factor))
    }

    /// `x² + y²` in Q32.32.
    #[inline]
    pub fn length_squared_wide(self) -> i128 {
        self.dot_wide(self)
    }

    /// Euclidean length, floored.
    pub fn length(self) -> Fixed {
        let squared = self.length_squared_wide().clamp(0, u64::MAX as i128) as u64;
        isqrt_u64(squared) as Fixed
    }

    /// Unit-length direction, or [`FixedVec2::ZERO`] for a zero vector.
    pub fn normalize(self) -> Self {
        match self.length() {
            0 => Self::ZERO,
            len => Self::new(fixed_div(self.x, len), fixed_div(self.y, len)),
        }
    }

    /// Exact dot product in Q32.32.
    #[inline]
    pub fn dot_wide(self, other: Self) -> i128 {
        i128::from(self.x) * i128::from(other.x) + i128::from(self.y) * i128::from(other.y)
    }

    /// Exact cross product in Q32.32; positive when `other` turns left of `self`.
    #[inline]
    pub fn cross_wide(self, other: Self) -> i128 {
        i128::from(self.x) * i128::from(other.y) - i128::from(self.y) * i128::from(other.x)
    }

    /// Component of `self` along `direction`, used to slide along walls.
    ///
    /// A zero `direction` projects to zero.
    pub fn project_onto(self, direction: Self) -> Self {
        let denom = direction.length_squared_wide();
        if denom == 0 {
            return Self::ZERO;
        }
        let along = self.dot_wide(direction);
        Self::new(
            (i128::from(direction.x) * along / denom) as Fixed,
            (i128::from(direction.y) * along / denom) as Fixed,
        )
    }

    /// Point `t` of the way to `other`.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self::new(fixed_lerp(self.x, other.x, t), fixed_lerp(self.y, other.y, t))
    }

    /// Lift onto height `z`.
    #[inline]
    pub const fn with_z(self, z: Fixed) -> FixedVec3 {
        FixedVec3 { x: self.x, y: self.y, z }
    }
}

impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.wrapping_sub(rhs.x), self.y.wrapping_sub(rhs.y))
    }
}

impl Neg for FixedVec2 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(self.x.wrapping_neg(), self.y.wrapping_neg())
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec2({:.3}, {:.3})", to_float(self.x), to_float(self.y))
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", to_float(self.x), to_float(self.y))
    }
}

/// Position or velocity in the world.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec3 {
    /// East-west coordinate
    pub x: Fixed,
    /// North-south coordinate
    pub y: Fixed,
    /// Height
    pub z: Fixed,
}

impl FixedVec3 {
    /// Origin
    pub const ZERO: Self = Self { x: 0, y: 0, z: 0 };

    /// From raw fixed components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Whole map units.
    #[inline]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        FixedVec2::from_ints(x, y).with_z(z << FIXED_SCALE)
    }

    /// Map-plane part.
    #[inline]
    pub const fn xy(self) -> FixedVec2 {
        FixedVec2 { x: self.x, y: self.y }
    }

    /// Render interpolation between the previous and current tick.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self.xy().lerp(other.xy(), t).with_z(fixed_lerp(self.z, other.z, t))
    }

    /// Float triple for log output.
    pub fn to_floats(self) -> (f32, f32, f32) {
        (to_float(self.x), to_float(self.y), to_float(self.z))
    }
}

impl fmt::Debug for FixedVec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y, z) = self.to_floats();
        write!(f, "Vec3({x:.3}, {y:.3}, {z:.3})")
    }
}
