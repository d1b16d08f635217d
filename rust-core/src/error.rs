//! Error types for the DSP core

use thiserror::Error;

/// Errors reported by transforms, the spectrum estimator and the FIR filters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DspError {
    /// Transform size is not a power of two >= 2
    #[error("transform size {0} is not a power of two (minimum 2)")]
    InvalidSize(usize),

    /// Filter cutoff/length rejected, or coefficient quantization overflowed
    #[error("invalid filter configuration: {0}")]
    Configuration(String),

    /// Caller contract violation (unconfigured filter, not enough data)
    #[error("usage error: {0}")]
    Usage(String),

    /// Buffer lengths do not agree with each other or with the requested size
    #[error("input shape mismatch: {0}")]
    InputShape(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, DspError>;
