//! Real-time Mandelbrot rendering.
//!
//! A [`RenderEngine`] owns the compute resources of one presentable surface.
//! The presentation layer feeds it resize and pause requests and calls
//! [`RenderEngine::on_frame_tick`] once per display refresh; each tick runs
//! the escape-time kernel from [`shared`] over every pixel, either on the
//! GPU ([`GpuCompute`]) or on a rayon pool ([`CpuCompute`]).

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod navigator;
pub mod params;

pub use shared;

pub use backend::{ComputeBackend, CpuCompute, GpuCompute, GpuOptions, PixelSurface, WindowSurface};
pub use config::EngineConfig;
pub use engine::{EngineState, FrameHook, FrameOutcome, RenderEngine};
pub use error::{ConfigError, EngineError, ResourceError};
pub use navigator::{Action, Navigator};
pub use params::{Extent, FrameParams, Viewport};
