#![cfg_attr(not(test), no_std)]

//! Numeric core shared between the host and the rust-gpu shader.
//!
//! Everything in here must compile for `spirv-unknown-*` targets: no
//! allocation, no `std`, no panicking paths in the hot loop.

pub use bytemuck;
pub use glam;

pub mod complex;
pub mod escape;
pub mod palette;
pub mod params;
pub mod transform;

pub use complex::Complex;
pub use escape::{escape_time, iterate, EscapeMetric};
pub use palette::Palette;
pub use params::{Params, WORKGROUP_SIZE};
pub use transform::ViewportTransform;
