//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the range [0, 1].
pub fn clamp01<T>(value: T) -> T
where
    T: Float
{
    let zero = T::from(0).unwrap();
    let one = T::from(1).unwrap();

    if value < zero {
        zero
    }
    else if value > one {
        one
    }
    else {
        value
    }
}

/// Wrap an angle in radians into the range [-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + std::ops::Rem
{
    let pi = T::from(std::f64::consts::PI).unwrap();
    let tau = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(angle + pi, tau) - pi;

    wrapped
}

/// Get the shortest signed angular step from `from` to `to`, in radians.
///
/// The result is in [-pi, pi], positive if the shortest turn from `from` to
/// `to` is anticlockwise (right hand rule about the up axis).
pub fn ang_delta<T>(from: T, to: T) -> T
where
    T: Float + std::ops::Rem
{
    wrap_pi(to - from)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float + std::ops::Rem
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}
