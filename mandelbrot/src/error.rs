use std::path::PathBuf;

use crate::engine::EngineState;
use crate::params::Extent;

/// Failures of the compute/graphics backend to provide what a frame needs.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("no compatible GPU adapter is available")]
    DeviceUnavailable,
    #[error("failed to open the GPU device: {0}")]
    RequestDevice(String),
    #[error("failed to allocate frame resources: {0}")]
    Allocation(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("invalid shader module: {0}")]
    Shader(String),
    #[error("{extent} is not supported: {reason}")]
    Unsupported { extent: Extent, reason: String },
    #[error("failed to start the kernel thread pool: {0}")]
    ThreadPool(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("cannot {operation} while the engine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
