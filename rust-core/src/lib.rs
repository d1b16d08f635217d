//! Waveform DSP core
//!
//! Offline analysis and resampling-preparation primitives for a waveform editor:
//! power-of-two FFTs, analysis windows, averaged spectrum / pitch estimation,
//! and an integer-scaled anti-alias FIR filter.

pub mod error;
pub mod filters;
pub mod spectrum;

pub use error::{DspError, Result};
pub use filters::{AntiAliasFilter, FirFilter};
pub use spectrum::{ComplexBuffer, FftEngine, SpectrumConfig, SpectrumEstimator, WindowFunction};
