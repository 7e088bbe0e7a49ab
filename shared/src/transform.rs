//! Mapping from normalized device coordinates onto the complex plane.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::Complex;

/// A 4x4 matrix taking normalized device coordinates to plane coordinates.
///
/// Pan and zoom are expressed in plane units and post-composed, so a chain
/// of operations is equal to the product of their matrices.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewportTransform(pub Mat4);

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewportTransform {
    /// Maps `[-1, 1]²` onto itself.
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    /// Uniform scale about the origin followed by a translation to `center`.
    pub fn from_center_scale(center: Complex<f32>, scale: f32) -> Self {
        Self(
            Mat4::from_translation(Vec3::new(center.re, center.im, 0.0))
                * Mat4::from_scale(Vec3::new(scale, scale, 1.0)),
        )
    }

    pub fn matrix(&self) -> Mat4 {
        self.0
    }

    pub fn apply(&self, ndc: Vec2) -> Complex<f32> {
        let p = self.0 * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        Complex::new(p.x, p.y)
    }

    /// Inverse of [`Self::apply`]. Undefined for singular matrices.
    pub fn unapply(&self, c: Complex<f32>) -> Vec2 {
        let p = self.0.inverse() * Vec4::new(c.re, c.im, 0.0, 1.0);
        Vec2::new(p.x, p.y)
    }

    /// `other` applied after `self`.
    #[must_use]
    pub fn then(self, other: Self) -> Self {
        Self(other.0 * self.0)
    }

    #[must_use]
    pub fn pan(self, dx: f32, dy: f32) -> Self {
        self.then(Self(Mat4::from_translation(Vec3::new(dx, dy, 0.0))))
    }

    /// Scales the visible region by `factor` about the plane point `pivot`,
    /// which stays where it is. `factor < 1` zooms in.
    #[must_use]
    pub fn zoom(self, factor: f32, pivot: Complex<f32>) -> Self {
        let to_pivot = Vec3::new(pivot.re, pivot.im, 0.0);
        self.then(Self(
            Mat4::from_translation(to_pivot)
                * Mat4::from_scale(Vec3::new(factor, factor, 1.0))
                * Mat4::from_translation(-to_pivot),
        ))
    }

    #[must_use]
    pub fn inverse(self) -> Self {
        Self(self.0.inverse())
    }

    /// The plane point under the middle of the surface.
    pub fn center(&self) -> Complex<f32> {
        self.apply(Vec2::ZERO)
    }

    /// Plane units per NDC unit along x.
    pub fn scale(&self) -> f32 {
        self.0.x_axis.truncate().length()
    }

    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.0.abs_diff_eq(other.0, max_abs_diff)
    }
}
