//! The mutable property bag an engine renders from.

use std::fmt;

use shared::{Complex, EscapeMetric, Palette, ViewportTransform};

pub const DEFAULT_ITERATIONS: u32 = 100;
pub const MAX_ITERATIONS: u32 = 1 << 16;
pub const DEFAULT_THRESHOLD: f32 = 2.0;
pub const MIN_DIMENSION: f32 = 1.0;

/// Size of the surface in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `None` when the pixel count does not fit in memory indices.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Surface dimensions in device independent units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl Viewport {
    /// Clamps every component to something a kernel can be dispatched over.
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            width: sanitize_dimension(width),
            height: sanitize_dimension(height),
            scale_factor: if scale_factor.is_finite() && scale_factor > 0.0 {
                scale_factor
            } else {
                1.0
            },
        }
    }

    pub fn extent(&self) -> Extent {
        let device = |dim: f32| ((dim * self.scale_factor).round() as u32).max(1);
        Extent::new(device(self.width), device(self.height))
    }
}

fn sanitize_dimension(dim: f32) -> f32 {
    if dim.is_finite() && dim >= MIN_DIMENSION {
        dim
    } else {
        log::warn!("clamping surface dimension {dim} to {MIN_DIMENSION}");
        MIN_DIMENSION
    }
}

/// Iteration cap, escape threshold, policies and transform of one engine.
///
/// Setters clamp instead of failing so a frame hook can drive them from
/// input without error handling. The kernel never sees a zero iteration cap
/// or a non-positive threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameParams {
    iterations: u32,
    threshold: f32,
    metric: EscapeMetric,
    palette: Palette,
    transform: ViewportTransform,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            metric: EscapeMetric::default(),
            palette: Palette::default(),
            transform: ViewportTransform::from_center_scale(Complex::new(-0.5, 0.0), 1.5),
        }
    }
}

impl FrameParams {
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        let clamped = iterations.clamp(1, MAX_ITERATIONS);
        if clamped != iterations {
            log::warn!("clamping iteration cap {iterations} to {clamped}");
        }
        self.iterations = clamped;
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        if threshold.is_nan() {
            log::warn!("ignoring NaN escape threshold, keeping {}", self.threshold);
            return;
        }
        let clamped = threshold.clamp(f32::EPSILON, f32::MAX);
        if clamped != threshold {
            log::warn!("clamping escape threshold {threshold} to {clamped}");
        }
        self.threshold = clamped;
    }

    pub fn metric(&self) -> EscapeMetric {
        self.metric
    }

    pub fn set_metric(&mut self, metric: EscapeMetric) {
        self.metric = metric;
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: ViewportTransform) {
        self.transform = transform;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform.pan(dx, dy);
    }

    pub fn zoom(&mut self, factor: f32, pivot: Complex<f32>) {
        self.transform = self.transform.zoom(factor, pivot);
    }

    /// Kernel input for a surface of the given size.
    pub fn uniforms(&self, extent: Extent) -> shared::Params {
        shared::Params::new(extent.width, extent.height, self.iterations, self.threshold)
            .with_transform(self.transform)
            .with_metric(self.metric)
            .with_palette(self.palette)
    }
}

impl fmt::Display for FrameParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let center = self.transform.center();
        write!(
            f,
            "x: {} y: {} scale: {} iterations: {} threshold: {} ({:?}, {:?})",
            center.re,
            center.im,
            self.transform.scale(),
            self.iterations,
            self.threshold,
            self.metric,
            self.palette,
        )
    }
}
