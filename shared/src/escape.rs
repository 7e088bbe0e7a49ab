//! Escape-time iteration for `z -> z² + c`.

use num_traits::Float;

use crate::Complex;

/// How the orbit is compared against the escape threshold.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum EscapeMetric {
    /// `|z| > threshold`
    #[default]
    Magnitude = 0,
    /// `|z|² > threshold`, skips the square root.
    SquaredMagnitude = 1,
}

impl EscapeMetric {
    /// Decodes the value stored in [`crate::Params`]. Unknown values fall
    /// back to the default.
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::SquaredMagnitude,
            _ => Self::Magnitude,
        }
    }

    #[inline]
    pub fn escaped<T: Float>(self, z: Complex<T>, threshold: T) -> bool {
        match self {
            Self::Magnitude => z.magnitude() > threshold,
            Self::SquaredMagnitude => z.magnitude_squared() > threshold,
        }
    }
}

/// Number of iterations before the orbit of `c` escapes, or
/// `max_iterations` when it never does.
///
/// Returning `n` means the `n`-th iterate (zero based) was the first one past
/// the threshold. The loop is bounded by `max_iterations`, so every
/// invocation terminates regardless of the input, NaN included.
#[inline]
pub fn escape_time<T: Float>(
    c: Complex<T>,
    max_iterations: u32,
    threshold: T,
    metric: EscapeMetric,
) -> u32 {
    let mut z = Complex::zero();
    for n in 0..max_iterations {
        z = z * z + c;
        if metric.escaped(z, threshold) {
            return n;
        }
    }
    max_iterations
}

/// [`escape_time`] with the magnitude metric.
#[inline]
pub fn iterate<T: Float>(c: Complex<T>, max_iterations: u32, threshold: T) -> u32 {
    escape_time(c, max_iterations, threshold, EscapeMetric::Magnitude)
}
