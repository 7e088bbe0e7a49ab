use std::marker::PhantomData;

use rayon::prelude::*;
use shared::glam::Vec4;

use super::{ComputeBackend, Frame, PresentTarget};
use crate::error::ResourceError;
use crate::params::Extent;

/// Upper bound on the number of pixels a CPU dispatch will allocate for.
pub const DEFAULT_MAX_PIXELS: usize = 1 << 26;

/// Runs the kernel on a dedicated rayon pool, one task per pixel index.
pub struct CpuCompute<S = PixelSurface> {
    pool: rayon::ThreadPool,
    max_pixels: usize,
    extent: Option<Extent>,
    counts: Vec<u32>,
    pixels: Vec<[u8; 4]>,
    _surface: PhantomData<fn(&mut S)>,
}

impl<S> CpuCompute<S> {
    /// `threads` defaults to rayon's choice (one per logical core).
    pub fn new(threads: Option<usize>) -> Result<Self, ResourceError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|index| format!("escape-time-{index}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| ResourceError::ThreadPool(e.to_string()))?;
        log::debug!(
            "escape-time pool running on {} threads",
            pool.current_num_threads()
        );

        Ok(Self {
            pool,
            max_pixels: DEFAULT_MAX_PIXELS,
            extent: None,
            counts: Vec::new(),
            pixels: Vec::new(),
            _surface: PhantomData,
        })
    }

    #[must_use]
    pub fn with_max_pixels(mut self, max_pixels: usize) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Escape counts of the last dispatch, row-major.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    fn pixel_budget(&self, extent: Extent) -> Result<usize, ResourceError> {
        match extent.pixel_count() {
            Some(len) if len <= self.max_pixels => Ok(len),
            _ => Err(ResourceError::Unsupported {
                extent,
                reason: format!("more than {} pixels", self.max_pixels),
            }),
        }
    }
}

fn reserve<T>(buffer: &mut Vec<T>, len: usize) -> Result<(), ResourceError> {
    buffer
        .try_reserve(len.saturating_sub(buffer.len()))
        .map_err(|e| ResourceError::Allocation(e.to_string()))
}

pub(crate) fn to_rgba8(color: Vec4) -> [u8; 4] {
    color
        .to_array()
        .map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
}

impl<S: PresentTarget> ComputeBackend for CpuCompute<S> {
    type Surface = S;

    fn supports(&self, extent: Extent) -> Result<(), ResourceError> {
        self.pixel_budget(extent).map(|_| ())
    }

    fn allocate(&mut self, surface: &mut S, extent: Extent) -> Result<(), ResourceError> {
        let len = self.pixel_budget(extent)?;
        reserve(&mut self.counts, len)?;
        reserve(&mut self.pixels, len)?;
        surface.configure(extent)?;

        self.counts.resize(len, 0);
        self.pixels.resize(len, [0, 0, 0, 0xFF]);
        self.extent = Some(extent);
        log::debug!("allocated CPU frame buffers for {extent}");
        Ok(())
    }

    fn dispatch(&mut self, surface: &mut S, params: &shared::Params) -> Result<(), ResourceError> {
        let extent = self
            .extent
            .ok_or_else(|| ResourceError::Allocation("dispatch before allocation".into()))?;
        if (params.width, params.height) != (extent.width, extent.height) {
            return Err(ResourceError::Allocation(format!(
                "frame of {}x{} does not match buffers sized for {extent}",
                params.width, params.height
            )));
        }

        let width = extent.width as usize;
        let counts = &mut self.counts;
        let pixels = &mut self.pixels;
        self.pool.install(|| {
            counts
                .par_iter_mut()
                .zip(pixels.par_iter_mut())
                .enumerate()
                .for_each(|(index, (count, pixel))| {
                    let x = (index % width) as u32;
                    let y = (index / width) as u32;
                    *count = params.escape_time_at(x, y);
                    *pixel = to_rgba8(params.shade(*count));
                });
        });

        surface.present(Frame {
            extent,
            counts: &self.counts,
            pixels: &self.pixels,
        })
    }
}

/// An in-memory surface keeping the last presented frame.
#[derive(Debug, Default)]
pub struct PixelSurface {
    extent: Option<Extent>,
    pixels: Vec<[u8; 4]>,
    counts: Vec<u32>,
    writes: u64,
}

impl PixelSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Number of frames presented so far.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.index(x, y).and_then(|i| self.pixels.get(i).copied())
    }

    pub fn count(&self, x: u32, y: u32) -> Option<u32> {
        self.index(x, y).and_then(|i| self.counts.get(i).copied())
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        let extent = self.extent?;
        (x < extent.width && y < extent.height)
            .then(|| y as usize * extent.width as usize + x as usize)
    }
}

impl PresentTarget for PixelSurface {
    fn configure(&mut self, extent: Extent) -> Result<(), ResourceError> {
        self.extent = Some(extent);
        self.pixels.clear();
        self.counts.clear();
        Ok(())
    }

    fn present(&mut self, frame: Frame<'_>) -> Result<(), ResourceError> {
        if self.extent != Some(frame.extent) {
            return Err(ResourceError::Surface(format!(
                "frame of {} presented to an unconfigured surface",
                frame.extent
            )));
        }

        self.pixels.clear();
        self.pixels.extend_from_slice(frame.pixels);
        self.counts.clear();
        self.counts.extend_from_slice(frame.counts);
        self.writes += 1;
        Ok(())
    }
}
