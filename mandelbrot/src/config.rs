//! TOML configuration. Every key is optional.
//!
//! ```toml
//! [render]
//! iterations = 100
//! threshold = 2.0
//! metric = "magnitude"       # or "squared-magnitude"
//! palette = "spectral"       # or "grayscale"
//!
//! [view]
//! center = [-0.5, 0.0]
//! scale = 1.5
//!
//! [gpu]
//! power-preference = "high-performance"
//! vsync = true
//!
//! [cpu]
//! threads = 4
//! ```

use std::path::Path;

use serde::Deserialize;
use shared::{Complex, EscapeMetric, Palette, ViewportTransform};

use crate::backend::GpuOptions;
use crate::error::ConfigError;
use crate::params::{FrameParams, DEFAULT_ITERATIONS, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub render: RenderConfig,
    pub view: ViewConfig,
    pub gpu: GpuConfig,
    pub cpu: CpuConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub iterations: u32,
    pub threshold: f32,
    pub metric: EscapeMetric,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            metric: EscapeMetric::default(),
            palette: Palette::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    /// Plane point shown in the middle of the surface.
    pub center: [f32; 2],
    /// Plane units from the middle to the top edge.
    pub scale: f32,
}

const DEFAULT_SCALE: f32 = 1.5;

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: [-0.5, 0.0],
            scale: DEFAULT_SCALE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GpuConfig {
    pub power_preference: PowerPreference,
    pub vsync: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power_preference: PowerPreference::default(),
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CpuConfig {
    /// Kernel threads, rayon's default when absent.
    pub threads: Option<usize>,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Initial parameters of an engine. Out of range values are clamped the
    /// same way runtime changes are.
    pub fn frame_params(&self) -> FrameParams {
        let mut params = FrameParams::default();
        params.set_iterations(self.render.iterations);
        params.set_threshold(self.render.threshold);
        params.set_metric(self.render.metric);
        params.set_palette(self.render.palette);

        let scale = if self.view.scale.is_finite() && self.view.scale > 0.0 {
            self.view.scale
        } else {
            log::warn!("ignoring view scale {}, using {DEFAULT_SCALE}", self.view.scale);
            DEFAULT_SCALE
        };
        params.set_transform(ViewportTransform::from_center_scale(
            Complex::from(self.view.center),
            scale,
        ));
        params
    }

    pub fn gpu_options(&self) -> GpuOptions {
        GpuOptions {
            power_preference: match self.gpu.power_preference {
                PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
                PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            },
            vsync: self.gpu.vsync,
        }
    }
}
