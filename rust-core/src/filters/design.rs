//! Anti-alias low-pass FIR design using the windowing method
//!
//! Hamming-windowed sinc taps, scaled so they sum to 2^14 and rounded to
//! 16-bit integers. The filter is applied before sample-rate reduction.

use super::fir::FirFilter;
use crate::error::{DspError, Result};
use std::f64::consts::PI;

/// Coefficients are scaled so their sum is 2^RESULT_DIV_FACTOR
pub const RESULT_DIV_FACTOR: u32 = 14;

/// Default tap count
pub const DEFAULT_LENGTH: usize = 32;

/// Default cutoff (normalized, see [`design_lowpass_coefficients`])
pub const DEFAULT_CUTOFF: f64 = 0.9;

/// Highest accepted cutoff
pub const MAX_CUTOFF: f64 = 1.5;

/// Design quantized low-pass coefficients
///
/// # Algorithm
/// For each tap `c = i - length/2`:
/// 1. Ideal low-pass `h = fc2·sin(wc·c)/(wc·c)` with `fc2 = 2·cutoff`,
///    `wc = π·fc2`, and `h = fc2` at `c = 0`
/// 2. Hamming window `w = 0.54 + 0.46·cos(2π·c/length)`
/// 3. Scale all `w·h` so they sum to 16384 and round to the nearest integer
///
/// # Arguments
/// * `length` - Number of taps, positive and divisible by 4
/// * `cutoff` - Normalized cutoff in `[0, 1.5]`
///
/// # Errors
/// `Configuration` for out-of-range arguments, a non-positive tap sum, or a
/// tap that does not fit a signed 16-bit integer
pub fn design_lowpass_coefficients(length: usize, cutoff: f64) -> Result<Vec<f32>> {
    if length == 0 || length % 4 != 0 {
        return Err(DspError::Configuration(format!(
            "filter length {length} must be a positive multiple of 4"
        )));
    }
    if !(0.0..=MAX_CUTOFF).contains(&cutoff) {
        return Err(DspError::Configuration(format!(
            "cutoff {cutoff} outside [0, {MAX_CUTOFF}]"
        )));
    }

    let fc2 = 2.0 * cutoff;
    let wc = PI * fc2;
    let window_step = 2.0 * PI / length as f64;
    let center = (length / 2) as f64;

    let work: Vec<f64> = (0..length)
        .map(|i| {
            let c = i as f64 - center;
            let arg = c * wc;
            let h = if arg != 0.0 { fc2 * arg.sin() / arg } else { fc2 };
            let w = 0.54 + 0.46 * (window_step * c).cos();
            w * h
        })
        .collect();

    let sum: f64 = work.iter().sum();
    if sum.is_nan() || sum <= 0.0 {
        return Err(DspError::Configuration(format!(
            "degenerate design: coefficient sum {sum} for cutoff {cutoff}, length {length}"
        )));
    }

    let scale = f64::from(1u32 << RESULT_DIV_FACTOR) / sum;
    work.iter()
        .map(|&value| {
            // round() goes half away from zero; + 0.0 turns -0.0 into 0.0
            let tap = (value * scale).round() + 0.0;
            if tap < f64::from(i16::MIN) || tap > f64::from(i16::MAX) {
                Err(DspError::Configuration(format!(
                    "coefficient {tap} overflows 16 bits (cutoff {cutoff}, length {length})"
                )))
            } else {
                Ok(tap as f32)
            }
        })
        .collect()
}

/// Anti-alias low-pass filter
///
/// Keeps the designed [`FirFilter`] in sync with its cutoff and length.
/// Every setter redesigns the taps; a rejected change leaves the previous
/// design in place.
#[derive(Debug, Clone, PartialEq)]
pub struct AntiAliasFilter {
    fir: FirFilter,
    cutoff: f64,
}

impl AntiAliasFilter {
    /// Create a filter with `length` taps and the default cutoff
    pub fn new(length: usize) -> Result<Self> {
        Self::with_cutoff(length, DEFAULT_CUTOFF)
    }

    pub fn with_cutoff(length: usize, cutoff: f64) -> Result<Self> {
        let mut filter = Self {
            fir: FirFilter::new(),
            cutoff,
        };
        filter.redesign(length, cutoff)?;
        Ok(filter)
    }

    /// Change the cutoff and recompute the coefficients
    pub fn set_cutoff_freq(&mut self, cutoff: f64) -> Result<()> {
        self.redesign(self.length(), cutoff)
    }

    /// Change the tap count and recompute the coefficients
    pub fn set_length(&mut self, length: usize) -> Result<()> {
        self.redesign(length, self.cutoff)
    }

    fn redesign(&mut self, length: usize, cutoff: f64) -> Result<()> {
        let coefficients = design_lowpass_coefficients(length, cutoff)?;

        let mut fir = FirFilter::new();
        fir.set_coefficients(&coefficients, RESULT_DIV_FACTOR)?;

        tracing::debug!(length, cutoff, "anti-alias filter designed");
        self.fir = fir;
        self.cutoff = cutoff;
        Ok(())
    }

    /// Filter `src` into `dest`, see [`FirFilter::evaluate`]
    pub fn evaluate(&self, dest: &mut [f32], src: &[f32], num_samples: usize) -> Result<usize> {
        self.fir.evaluate(dest, src, num_samples)
    }

    pub fn filter(&self, src: &[f32]) -> Result<Vec<f32>> {
        self.fir.filter(src)
    }

    pub fn cutoff_freq(&self) -> f64 {
        self.cutoff
    }

    pub fn length(&self) -> usize {
        self.fir.length()
    }

    pub fn coefficients(&self) -> &[f32] {
        self.fir.coefficients()
    }

    pub fn result_div_factor(&self) -> u32 {
        self.fir.result_div_factor()
    }

    pub fn fir(&self) -> &FirFilter {
        &self.fir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coefficient_sum(coeffs: &[f32]) -> f32 {
        coeffs.iter().sum()
    }

    #[test]
    fn test_default_design() {
        let mut filter = AntiAliasFilter::new(DEFAULT_LENGTH).unwrap();
        filter.set_cutoff_freq(0.9).unwrap();
        filter.set_length(32).unwrap();

        assert_eq!(filter.coefficients().len(), 32);
        assert_eq!(filter.result_div_factor(), 14);
        assert_eq!(filter.cutoff_freq(), 0.9);
        assert!(filter.coefficients().iter().all(|c| c.fract() == 0.0));
    }

    #[test]
    fn test_no_negative_zero_taps() {
        for cutoff in [0.25, 0.5, 0.9, 1.5] {
            let coeffs = design_lowpass_coefficients(32, cutoff).unwrap();
            for (i, c) in coeffs.iter().enumerate() {
                assert!(*c != 0.0 || c.is_sign_positive(), "cutoff {} tap {} is -0", cutoff, i);
            }
        }
    }

    #[test]
    fn test_coefficient_sum_is_preserved() {
        for length in [8usize, 16, 32, 64, 128] {
            for cutoff in [0.1, 0.25, 0.45, 0.5, 0.7, 0.9, 1.2, 1.5] {
                let coeffs = design_lowpass_coefficients(length, cutoff).unwrap();
                assert_eq!(coeffs.len(), length);

                let error = (coefficient_sum(&coeffs) - 16384.0).abs();
                assert!(
                    error <= length as f32 / 2.0,
                    "length {} cutoff {} sum {}",
                    length,
                    cutoff,
                    coefficient_sum(&coeffs)
                );
            }
        }
    }

    #[test]
    fn test_half_band_is_pure_delay() {
        // At cutoff 0.5 every sinc zero lands on a tap
        let coeffs = design_lowpass_coefficients(16, 0.5).unwrap();
        assert_eq!(coeffs[8], 16384.0);
        assert!(coeffs.iter().enumerate().all(|(i, &c)| i == 8 || c == 0.0));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(matches!(
            design_lowpass_coefficients(30, 0.5),
            Err(DspError::Configuration(_))
        ));
        assert!(design_lowpass_coefficients(0, 0.5).is_err());
        assert!(design_lowpass_coefficients(32, -0.1).is_err());
        assert!(design_lowpass_coefficients(32, 1.6).is_err());
        assert!(design_lowpass_coefficients(32, f64::NAN).is_err());
        // Zero cutoff has no passband at all
        assert!(design_lowpass_coefficients(32, 0.0).is_err());
    }

    #[test]
    fn test_failed_update_keeps_previous_design() {
        let mut filter = AntiAliasFilter::new(32).unwrap();
        let before = filter.clone();

        assert!(filter.set_length(30).is_err());
        assert!(filter.set_cutoff_freq(2.0).is_err());
        // Divisible by 4 but not by 8: designable, not installable
        assert!(matches!(filter.set_length(12), Err(DspError::Configuration(_))));

        assert_eq!(filter, before);
    }

    #[test]
    fn test_passes_dc_and_removes_nyquist() {
        let filter = AntiAliasFilter::with_cutoff(64, 0.25).unwrap();

        let dc = vec![1.0f32; 256];
        let out = filter.filter(&dc).unwrap();
        assert_eq!(out.len(), 192);
        for &y in &out {
            assert!((y - 1.0).abs() < 0.01, "dc gain {}", y);
        }

        let nyquist: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let out = filter.filter(&nyquist).unwrap();
        for &y in &out {
            assert!(y.abs() < 0.05, "nyquist leak {}", y);
        }
    }
}
