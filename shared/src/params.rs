use glam::{Vec2, Vec4};

use crate::{escape_time, Complex, EscapeMetric, Palette, ViewportTransform};

/// Side length of the square compute workgroup used by the shader.
pub const WORKGROUP_SIZE: u32 = 8;

/// Per-frame input of the escape-time kernel. Handed to the GPU as push
/// constants, so the layout is fixed and must stay within 128 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Params {
    pub transform: ViewportTransform,
    pub width: u32,
    pub height: u32,
    pub iterations: u32,
    pub threshold: f32,
    pub metric: u32,
    pub palette: u32,
    _pad0: [u32; 2],
}

impl Params {
    pub fn new(width: u32, height: u32, iterations: u32, threshold: f32) -> Self {
        Self {
            transform: ViewportTransform::IDENTITY,
            width,
            height,
            iterations,
            threshold,
            metric: EscapeMetric::Magnitude as u32,
            palette: Palette::Spectral as u32,
            _pad0: [0; 2],
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: ViewportTransform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: EscapeMetric) -> Self {
        self.metric = metric as u32;
        self
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette as u32;
        self
    }

    pub fn metric(&self) -> EscapeMetric {
        EscapeMetric::from_u32(self.metric)
    }

    pub fn palette(&self) -> Palette {
        Palette::from_u32(self.palette)
    }

    /// Converts a position on the surface (pixel units, origin top left) to
    /// normalized device coordinates. `y` points up and `x` is stretched by
    /// the aspect ratio so that pixels stay square on the plane.
    pub fn surface_to_ndc(&self, position: Vec2) -> Vec2 {
        let width = self.width as f32;
        let height = self.height as f32;
        Vec2::new(
            (2.0 * position.x / width - 1.0) * (width / height),
            1.0 - 2.0 * position.y / height,
        )
    }

    /// NDC of the lower left corner of pixel `(x, y)`. The bottom left pixel
    /// samples the corner of the surface and the pixel right above the middle
    /// samples the NDC origin.
    pub fn pixel_to_ndc(&self, x: u32, y: u32) -> Vec2 {
        self.surface_to_ndc(Vec2::new(x as f32, y as f32 + 1.0))
    }

    pub fn pixel_to_complex(&self, x: u32, y: u32) -> Complex<f32> {
        self.transform.apply(self.pixel_to_ndc(x, y))
    }

    /// Runs the kernel for a single pixel.
    pub fn escape_time_at(&self, x: u32, y: u32) -> u32 {
        escape_time(
            self.pixel_to_complex(x, y),
            self.iterations,
            self.threshold,
            self.metric(),
        )
    }

    pub fn shade(&self, count: u32) -> Vec4 {
        self.palette().shade(count, self.iterations)
    }
}
