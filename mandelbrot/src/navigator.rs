//! Keyboard driven camera with momentum, meant to run as a frame hook.

use shared::glam::Vec3;
use shared::Complex;

use crate::params::{FrameParams, MAX_ITERATIONS};

const PAN_ACCELERATION: f32 = 0.005;
const ZOOM_ACCELERATION: f32 = 0.0025;
const FRICTION: f32 = 0.85;
const ITERATION_STEP: f32 = 0.45;
const THRESHOLD_GROWTH: f32 = 1.01;
const THRESHOLD_DECAY: f32 = 0.99;
const REST_EPSILON: f32 = 1e-5;

/// Scale bounds the autopilot bounces between. Below the lower one single
/// precision runs out of mantissa.
const AUTOPILOT_MIN_SCALE: f32 = 1e-4;
const AUTOPILOT_MAX_SCALE: f32 = 2.0;

/// A point on the boundary with detail at every depth the kernel can reach.
pub const SEAHORSE_VALLEY: Complex<f32> = Complex::new(-0.743_643_9, 0.131_825_9);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    PanUp,
    PanDown,
    PanLeft,
    PanRight,
    Zoom,
    MoreIterations,
    FewerIterations,
    RaiseThreshold,
    LowerThreshold,
}

impl Action {
    const ALL: [Action; 9] = [
        Action::PanUp,
        Action::PanDown,
        Action::PanLeft,
        Action::PanRight,
        Action::Zoom,
        Action::MoreIterations,
        Action::FewerIterations,
        Action::RaiseThreshold,
        Action::LowerThreshold,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

#[derive(Clone, Debug)]
pub struct Navigator {
    held: u16,
    /// Pan in x/y and zoom in z, in fractions of the current scale.
    velocity: Vec3,
    /// `-1.0` zooms in, `1.0` zooms out.
    zoom_direction: f32,
    iteration_carry: f32,
    autopilot: bool,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            held: 0,
            velocity: Vec3::ZERO,
            zoom_direction: -1.0,
            iteration_carry: 0.0,
            autopilot: false,
        }
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zooms on its own forever, turning around at the precision limit and
    /// when the whole set is in view.
    pub fn autopilot() -> Self {
        Self {
            autopilot: true,
            ..Self::default()
        }
    }

    pub fn is_autopilot(&self) -> bool {
        self.autopilot
    }

    pub fn press(&mut self, action: Action) {
        self.held |= action.bit();
    }

    pub fn release(&mut self, action: Action) {
        self.held &= !action.bit();
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held & action.bit() != 0
    }

    pub fn held(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|action| self.is_held(*action))
    }

    pub fn toggle_zoom_direction(&mut self) {
        self.zoom_direction = -self.zoom_direction;
    }

    pub fn zooming_in(&self) -> bool {
        self.zoom_direction < 0.0
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Whether a step would change anything.
    pub fn is_moving(&self) -> bool {
        self.held != 0 || self.autopilot || self.velocity.abs().max_element() > REST_EPSILON
    }

    /// Advances one frame and applies the result to `params`. Returns whether
    /// anything was changed.
    pub fn step(&mut self, params: &mut FrameParams) -> bool {
        if !self.is_moving() {
            self.velocity = Vec3::ZERO;
            return false;
        }

        if self.autopilot {
            let scale = params.transform().scale();
            if (self.zooming_in() && scale < AUTOPILOT_MIN_SCALE)
                || (!self.zooming_in() && scale > AUTOPILOT_MAX_SCALE)
            {
                log::debug!("autopilot turning around at scale {scale}");
                self.toggle_zoom_direction();
            }
        }

        self.step_parameters(params);

        if self.is_held(Action::PanUp) {
            self.velocity.y += PAN_ACCELERATION;
        }
        if self.is_held(Action::PanDown) {
            self.velocity.y -= PAN_ACCELERATION;
        }
        if self.is_held(Action::PanLeft) {
            self.velocity.x -= PAN_ACCELERATION;
        }
        if self.is_held(Action::PanRight) {
            self.velocity.x += PAN_ACCELERATION;
        }
        if self.autopilot || self.is_held(Action::Zoom) {
            self.velocity.z += ZOOM_ACCELERATION * self.zoom_direction;
        }
        self.velocity *= FRICTION;

        let scale = params.transform().scale();
        params.pan(self.velocity.x * scale, self.velocity.y * scale);
        params.zoom(1.0 + self.velocity.z, params.transform().center());
        true
    }

    fn step_parameters(&mut self, params: &mut FrameParams) {
        if self.is_held(Action::MoreIterations) {
            self.iteration_carry += ITERATION_STEP;
        }
        if self.is_held(Action::FewerIterations) {
            self.iteration_carry -= ITERATION_STEP;
        }
        let whole = self.iteration_carry.trunc();
        if whole != 0.0 {
            self.iteration_carry -= whole;
            let iterations = offset_iterations(params.iterations(), whole as i64);
            if iterations != params.iterations() {
                params.set_iterations(iterations);
            }
        }

        if self.is_held(Action::RaiseThreshold) {
            params.set_threshold(params.threshold() * THRESHOLD_GROWTH);
        }
        if self.is_held(Action::LowerThreshold) {
            params.set_threshold(params.threshold() * THRESHOLD_DECAY);
        }
    }
}

/// Saturates inside the range `FrameParams` accepts, so holding a key at
/// either end leaves the parameters alone.
fn offset_iterations(iterations: u32, delta: i64) -> u32 {
    (iterations as i64 + delta).clamp(1, MAX_ITERATIONS as i64) as u32
}
