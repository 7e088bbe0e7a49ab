use core::ops::{Add, Mul};

use glam::{DVec2, Vec2};
use num_traits::Float;

/// A complex number `re + im·i` over any floating point scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl Complex<f32> {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 0.0);
}

impl<T: Float> Complex<T> {
    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero())
    }

    pub fn magnitude_squared(self) -> T {
        self.re * self.re + self.im * self.im
    }

    pub fn magnitude(self) -> T {
        Float::sqrt(self.magnitude_squared())
    }
}

impl<T: Float> Add for Complex<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl<T: Float> Mul for Complex<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl<T> From<[T; 2]> for Complex<T> {
    fn from([re, im]: [T; 2]) -> Self {
        Self::new(re, im)
    }
}

impl<T> From<(T, T)> for Complex<T> {
    fn from((re, im): (T, T)) -> Self {
        Self::new(re, im)
    }
}

impl From<Vec2> for Complex<f32> {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<DVec2> for Complex<f64> {
    fn from(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Complex<f32>> for Vec2 {
    fn from(c: Complex<f32>) -> Self {
        Vec2::new(c.re, c.im)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLES: [Complex<f32>; 6] = [
        Complex::new(0.0, 0.0),
        Complex::new(1.5, -2.25),
        Complex::new(-0.75, 0.1),
        Complex::new(3.0e4, 1.0e-3),
        Complex::new(-1.0e-7, -8.0),
        Complex::new(0.3, 0.3),
    ];

    #[test]
    fn addition_commutes() {
        for a in SAMPLES {
            for b in SAMPLES {
                assert_eq!(a + b, b + a);
            }
        }
    }

    #[test]
    fn one_is_the_multiplicative_identity() {
        for a in SAMPLES {
            assert_eq!(a * Complex::ONE, a);
        }
    }

    #[test]
    fn multiplication_follows_the_textbook_formula() {
        let a = Complex::new(1.0f32, 2.0);
        let b = Complex::new(3.0f32, -1.0);
        assert_eq!(a * b, Complex::new(5.0, 5.0));

        let i = Complex::new(0.0f32, 1.0);
        assert_eq!(i * i, Complex::new(-1.0, 0.0));
    }

    #[test]
    fn magnitude_of_a_pythagorean_triple() {
        assert_eq!(Complex::new(3.0f32, 4.0).magnitude(), 5.0);
        assert_eq!(Complex::new(-3.0f64, -4.0).magnitude_squared(), 25.0);
    }

    #[test]
    fn precision_does_not_change_the_arithmetic() {
        let single = Complex::new(0.25f32, -0.5) * Complex::new(1.5f32, 0.75);
        let double = Complex::new(0.25f64, -0.5) * Complex::new(1.5f64, 0.75);
        assert_relative_eq!(single.re as f64, double.re);
        assert_relative_eq!(single.im as f64, double.im);
    }

    #[test]
    fn nan_propagates() {
        let nan = Complex::new(f32::NAN, 0.0);
        let product = nan * Complex::ONE;
        assert!(product.re.is_nan());
        assert!((nan + Complex::ONE).magnitude().is_nan());
    }

    #[test]
    fn conversions() {
        assert_eq!(Complex::from([1.0f32, 2.0]), Complex::new(1.0, 2.0));
        assert_eq!(Complex::from((1.0f64, 2.0)), Complex::new(1.0, 2.0));
        assert_eq!(Complex::from(Vec2::new(-1.0, 0.5)), Complex::new(-1.0, 0.5));
        assert_eq!(Complex::from(DVec2::new(-1.0, 0.5)), Complex::new(-1.0, 0.5));
        assert_eq!(Vec2::from(Complex::new(4.0, 2.0)), Vec2::new(4.0, 2.0));
    }
}
