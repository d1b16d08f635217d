//! Spectral analysis with FFT

pub mod analysis;
pub mod bit_reverse;
pub mod complex;
pub mod fft;
pub mod windowing;

pub use analysis::{compute_spectrum, SpectrumConfig, SpectrumEstimator};
pub use bit_reverse::BitReverseCache;
pub use complex::ComplexBuffer;
pub use fft::FftEngine;
pub use windowing::{apply_window, WindowFunction};
