//! The render engine: owns the compute resources of one surface and turns
//! frame ticks into kernel dispatches.

use shared::glam::Vec2;
use shared::Complex;

use crate::backend::ComputeBackend;
use crate::error::{EngineError, EngineResult};
use crate::params::{Extent, FrameParams, Viewport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, no surface bound.
    Idle,
    /// Bound, no frame presented yet.
    Ready,
    Running,
    Paused,
    /// Resources released. Terminal.
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The engine is paused; nothing was dispatched and the surface keeps
    /// its last frame.
    Skipped,
}

/// Called on the control thread right before each dispatch.
pub type FrameHook<C> = Box<dyn FnMut(&mut RenderEngine<C>)>;

struct Binding<C: ComputeBackend> {
    surface: C::Surface,
    compute: C,
}

/// Drives one kernel dispatch and present per frame tick.
///
/// Ticks, resizes and parameter changes must all come from the same control
/// thread; the engine is not meant to be shared.
pub struct RenderEngine<C: ComputeBackend> {
    /// Dimensions the current resources are allocated for.
    viewport: Viewport,
    /// Requested dimensions waiting for reallocation on the next tick.
    pending: Option<Viewport>,
    params: FrameParams,
    paused: bool,
    hook: Option<FrameHook<C>>,
    hook_changed: bool,
    binding: Option<Binding<C>>,
    frames: u64,
    ticking: bool,
    disposed: bool,
}

impl<C: ComputeBackend> RenderEngine<C> {
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_params(width, height, FrameParams::default())
    }

    pub fn with_params(width: f32, height: f32, params: FrameParams) -> Self {
        Self {
            viewport: Viewport::new(width, height, 1.0),
            pending: None,
            params,
            paused: false,
            hook: None,
            hook_changed: false,
            binding: None,
            frames: 0,
            ticking: false,
            disposed: false,
        }
    }

    pub fn state(&self) -> EngineState {
        if self.disposed {
            EngineState::Disposed
        } else if self.binding.is_none() {
            EngineState::Idle
        } else if self.paused {
            EngineState::Paused
        } else if self.frames == 0 {
            EngineState::Ready
        } else {
            EngineState::Running
        }
    }

    fn invalid(&self, operation: &'static str) -> EngineError {
        EngineError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    fn ensure_live(&self, operation: &'static str) -> EngineResult<()> {
        if self.disposed {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    /// Takes ownership of the surface and the compute resources feeding it
    /// and allocates everything the current dimensions need.
    pub fn bind(&mut self, mut surface: C::Surface, mut compute: C) -> EngineResult<()> {
        if self.state() != EngineState::Idle {
            return Err(self.invalid("bind a surface"));
        }

        let extent = self.viewport.extent();
        compute.supports(extent)?;
        compute.allocate(&mut surface, extent)?;
        self.binding = Some(Binding { surface, compute });
        log::info!("render engine bound to a {extent} surface");
        Ok(())
    }

    /// Renders one frame unless paused.
    pub fn on_frame_tick(&mut self) -> EngineResult<FrameOutcome> {
        if self.ticking {
            return Err(self.invalid("start a frame from inside a frame hook"));
        }
        match self.state() {
            EngineState::Idle | EngineState::Disposed => {
                return Err(self.invalid("render a frame"));
            }
            EngineState::Paused => {
                log::trace!("paused, skipping frame");
                return Ok(FrameOutcome::Skipped);
            }
            EngineState::Ready | EngineState::Running => {}
        }

        self.ticking = true;
        self.run_hook();
        let outcome = self.render();
        self.ticking = false;
        outcome
    }

    fn run_hook(&mut self) {
        let Some(mut hook) = self.hook.take() else {
            return;
        };
        self.hook_changed = false;
        hook(self);
        if !self.hook_changed {
            self.hook = Some(hook);
        }
    }

    fn render(&mut self) -> EngineResult<FrameOutcome> {
        let Some(binding) = self.binding.as_mut() else {
            return Err(self.invalid("render a frame"));
        };

        if let Some(viewport) = self.pending.take() {
            let extent = viewport.extent();
            if let Err(error) = binding.compute.allocate(&mut binding.surface, extent) {
                log::warn!(
                    "reallocating for {extent} failed, staying at {}: {error}",
                    self.viewport.extent()
                );
                return Err(error.into());
            }
            self.viewport = viewport;
        }

        let uniforms = self.params.uniforms(self.viewport.extent());
        binding.compute.dispatch(&mut binding.surface, &uniforms)?;
        self.frames += 1;
        log::trace!("presented frame {}", self.frames);
        Ok(FrameOutcome::Presented)
    }

    /// Idempotent. Takes effect at the next tick.
    pub fn set_paused(&mut self, paused: bool) -> EngineResult<()> {
        self.ensure_live("change the pause flag")?;
        if self.paused != paused {
            log::debug!("{}", if paused { "pausing" } else { "resuming" });
        }
        self.paused = paused;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Updates the surface size in device independent units. Sizes below
    /// one unit are clamped. Resources are reallocated before the next
    /// frame.
    pub fn resize(&mut self, width: f32, height: f32) -> EngineResult<()> {
        let scale_factor = self.requested_viewport().scale_factor;
        self.request_viewport(Viewport::new(width, height, scale_factor), "resize")
    }

    pub fn set_scale_factor(&mut self, scale_factor: f32) -> EngineResult<()> {
        let current = self.requested_viewport();
        self.request_viewport(
            Viewport::new(current.width, current.height, scale_factor),
            "change the scale factor",
        )
    }

    fn requested_viewport(&self) -> Viewport {
        self.pending.unwrap_or(self.viewport)
    }

    fn request_viewport(&mut self, viewport: Viewport, operation: &'static str) -> EngineResult<()> {
        self.ensure_live(operation)?;

        let extent = viewport.extent();
        let Some(binding) = &self.binding else {
            self.viewport = viewport;
            return Ok(());
        };
        binding.compute.supports(extent)?;

        if extent == self.viewport.extent() {
            self.viewport = viewport;
            self.pending = None;
        } else {
            log::debug!("resizing {} -> {extent}", self.viewport.extent());
            self.pending = Some(viewport);
        }
        Ok(())
    }

    /// Releases the surface and compute resources. Calling it again is a
    /// no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.binding = None;
        self.pending = None;
        self.hook = None;
        self.hook_changed = true;
        self.disposed = true;
        log::info!("render engine disposed after {} frames", self.frames);
    }

    /// Replaces the frame hook. Allowed from inside the hook itself.
    pub fn set_frame_hook(&mut self, hook: impl FnMut(&mut Self) + 'static) {
        self.hook = Some(Box::new(hook));
        self.hook_changed = true;
    }

    pub fn clear_frame_hook(&mut self) {
        self.hook = None;
        self.hook_changed = true;
    }

    pub fn params(&self) -> &FrameParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut FrameParams {
        &mut self.params
    }

    /// Requested width in device independent units.
    pub fn width(&self) -> f32 {
        self.requested_viewport().width
    }

    pub fn height(&self) -> f32 {
        self.requested_viewport().height
    }

    pub fn scale_factor(&self) -> f32 {
        self.requested_viewport().scale_factor
    }

    /// Device pixels the resources are currently allocated for.
    pub fn extent(&self) -> Extent {
        self.viewport.extent()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Kernel input for the next frame.
    pub fn uniforms(&self) -> shared::Params {
        self.params.uniforms(self.viewport.extent())
    }

    /// Plane coordinate under a surface position given in device pixels.
    pub fn complex_at(&self, position: Vec2) -> Complex<f32> {
        let uniforms = self.uniforms();
        uniforms.transform.apply(uniforms.surface_to_ndc(position))
    }

    pub fn surface(&self) -> Option<&C::Surface> {
        self.binding.as_ref().map(|binding| &binding.surface)
    }

    pub fn compute(&self) -> Option<&C> {
        self.binding.as_ref().map(|binding| &binding.compute)
    }
}
