//! Anti-alias FIR design and block filtering

pub mod design;
pub mod fir;

pub use design::{design_lowpass_coefficients, AntiAliasFilter};
pub use fir::FirFilter;
