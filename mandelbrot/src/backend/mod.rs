//! Compute resources an engine can be bound to.

mod cpu;
mod gpu;

pub use cpu::{CpuCompute, PixelSurface};
#[cfg(feature = "spirv")]
pub use gpu::embedded_shader;
pub use gpu::{spirv_shader, GpuCompute, GpuOptions, WindowSurface};

use crate::error::ResourceError;
use crate::params::Extent;

/// Runs the escape-time kernel over every pixel of a surface and presents
/// the colored result.
pub trait ComputeBackend {
    /// Where finished frames end up.
    type Surface;

    /// Checks the extent against the backend limits without allocating.
    fn supports(&self, extent: Extent) -> Result<(), ResourceError>;

    /// (Re)creates everything that depends on the surface size. On failure
    /// the previous allocation must still be usable.
    fn allocate(&mut self, surface: &mut Self::Surface, extent: Extent)
        -> Result<(), ResourceError>;

    /// Dispatches the kernel for one frame and presents it. Blocks until the
    /// dispatch has completed.
    fn dispatch(
        &mut self,
        surface: &mut Self::Surface,
        params: &shared::Params,
    ) -> Result<(), ResourceError>;
}

/// One frame produced by a CPU dispatch, in row-major order.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub extent: Extent,
    pub counts: &'a [u32],
    pub pixels: &'a [[u8; 4]],
}

/// A presentable surface fed by [`CpuCompute`].
pub trait PresentTarget {
    fn configure(&mut self, extent: Extent) -> Result<(), ResourceError>;

    fn present(&mut self, frame: Frame<'_>) -> Result<(), ResourceError>;
}
