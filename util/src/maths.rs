//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// True if `a` and `b` are within `epsilon` of each other.
pub fn epsilon_equals<T>(a: T, b: T, epsilon: T) -> bool
where
    T: Float,
{
    (a - epsilon <= b) && (a + epsilon >= b)
}

/// Linearly interpolate between `a` and `b`, with `x` clamped to `[0, 1]`.
pub fn interpolate<T>(a: T, b: T, x: T) -> T
where
    T: Float,
{
    let x = clamp(x, T::zero(), T::one());
    a + (b - a) * x
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    value.max(min).min(max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_epsilon_equals() {
        assert!(epsilon_equals(1.0, 1.0 + 1e-10, 1e-9));
        assert!(!epsilon_equals(1.0, 1.0 + 1e-8, 1e-9));
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate(2.0, 4.0, 0.5), 3.0);
        assert_eq!(interpolate(2.0, 4.0, -1.0), 2.0);
        assert_eq!(interpolate(2.0, 4.0, 3.0), 4.0);
    }
}
