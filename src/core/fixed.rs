//! Q16.16 fixed-point numbers.
//!
//! Map coordinates, heights, speeds and fractions are all [`Fixed`]: an
//! `i32` whose low 16 bits are the fraction. This is the unit classic maps
//! were authored in, so vertex coordinates up to ±32767 load unscaled and
//! `0x10000` is exactly one map unit.
//!
//! Tick logic never touches floats. [`to_fixed`] exists for constants and
//! tests; floats only come back out for logging.

/// Q16.16 value.
pub type Fixed = i32;

/// Fractional bits.
pub const FIXED_SCALE: i32 = 16;

/// One map unit.
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// Half a map unit.
pub const FIXED_HALF: Fixed = FIXED_ONE / 2;

/// Smallest representable value, used as an "unset" marker.
pub const FIXED_MIN: Fixed = i32::MIN;

// =============================================================================
// MOVEMENT CONSTANTS
// =============================================================================

/// Falling speed gained per tick.
pub const GRAVITY: Fixed = FIXED_ONE;

/// Tallest ledge an entity walks up without being blocked.
pub const MAX_STEP_HEIGHT: Fixed = 24 * FIXED_ONE;

/// Multiplier applied to grounded horizontal velocity each tick (0.90625).
pub const FRICTION: Fixed = 0xE800;

/// Grounded speed under which both axes snap to zero.
pub const STOP_SPEED: Fixed = 0x1000;

/// Per-axis speed cap.
pub const MAX_MOVE: Fixed = 30 * FIXED_ONE;

/// How far in front of the player a use press reaches.
pub const USE_RANGE: Fixed = 64 * FIXED_ONE;

/// Eye height above the floor at rest.
pub const VIEW_HEIGHT: Fixed = 41 * FIXED_ONE;

// =============================================================================
// ARITHMETIC
// =============================================================================

/// Float to fixed, truncating. Constants and tests only.
///
/// ```
/// use doomsim::core::fixed::{to_fixed, FIXED_ONE};
/// const STEP: i32 = to_fixed(1.5);
/// assert_eq!(STEP, FIXED_ONE + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * FIXED_ONE as f64) as Fixed
}

/// Whole map units to fixed.
#[inline]
pub const fn from_int(units: i32) -> Fixed {
    units << FIXED_SCALE
}

/// Fixed to float, for log output.
#[inline]
pub fn to_float(value: Fixed) -> f32 {
    value as f32 / FIXED_ONE as f32
}

/// Product, truncated toward negative infinity.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    ((i64::from(a) * i64::from(b)) >> FIXED_SCALE) as Fixed
}

/// Quotient; zero when `b` is zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    match b {
        0 => 0,
        _ => ((i64::from(a) << FIXED_SCALE) / i64::from(b)) as Fixed,
    }
}

/// Floor of the square root.
pub fn isqrt_u64(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    // Start above the root and walk down with Newton steps
    let mut root = 1u64 << (64 - n.leading_zeros()).div_ceil(2);
    loop {
        let next = (root + n / root) / 2;
        if next >= root {
            return root;
        }
        root = next;
    }
}

/// Absolute value; `i32::MIN` stays put.
#[inline]
pub fn fixed_abs(value: Fixed) -> Fixed {
    value.wrapping_abs()
}

/// `a` at `t == 0` through `b` at `t == FIXED_ONE`.
#[inline]
pub fn fixed_lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    let span = i64::from(b) - i64::from(a);
    (i64::from(a) + ((span * i64::from(t)) >> FIXED_SCALE)) as Fixed
}

/// Step `current` toward `target`, stopping on it.
#[inline]
pub fn fixed_approach(current: Fixed, target: Fixed, step: Fixed) -> Fixed {
    if current < target {
        current.saturating_add(step).min(target)
    } else {
        current.saturating_sub(step).max(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_units() {
        assert_eq!(from_int(1), 0x10000);
        assert_eq!(from_int(-32768), i32::MIN);
        assert_eq!(to_fixed(0.90625), FRICTION);
        assert_eq!(to_float(from_int(-24)), -24.0);
    }

    #[test]
    fn test_mul_div() {
        assert_eq!(fixed_mul(from_int(64), FRICTION), to_fixed(58.0));
        assert_eq!(fixed_mul(from_int(-3), FIXED_HALF), to_fixed(-1.5));
        assert_eq!(fixed_div(from_int(128), from_int(4)), from_int(32));
        assert_eq!(fixed_div(FIXED_ONE, 0), 0);
    }

    #[test]
    fn test_isqrt_is_floor() {
        for n in [0u64, 1, 2, 3, 4, 24, 25, 26, 1 << 33, u64::MAX] {
            let root = isqrt_u64(n);
            assert!(root * root <= n);
            assert!((root + 1).checked_mul(root + 1).map_or(true, |sq| sq > n));
        }
    }

    #[test]
    fn test_abs_saturates_nowhere() {
        assert_eq!(fixed_abs(from_int(-8)), from_int(8));
        assert_eq!(fixed_abs(i32::MIN), i32::MIN);
    }

    #[test]
    fn test_door_style_approach() {
        // A door ceiling climbing at 2 units per tick stops on its target
        let speed = from_int(2);
        assert_eq!(fixed_approach(from_int(0), from_int(72), speed), from_int(2));
        assert_eq!(fixed_approach(from_int(71), from_int(72), speed), from_int(72));
        assert_eq!(fixed_approach(from_int(1), from_int(0), speed), 0);
        assert_eq!(fixed_approach(i32::MAX - 1, i32::MAX, speed), i32::MAX);
    }

    #[test]
    fn test_view_height_lerp() {
        assert_eq!(fixed_lerp(from_int(33), VIEW_HEIGHT, FIXED_HALF), from_int(37));
        assert_eq!(fixed_lerp(from_int(-100), from_int(100), 0), from_int(-100));
        assert_eq!(fixed_lerp(from_int(-100), from_int(100), FIXED_ONE), from_int(100));
    }
}
