//! Block FIR filter with integer-scaled coefficients
//!
//! Coefficients are whole numbers stored as floats; each output is the
//! weighted sum divided by a power of two, `y[j] = Σ x[j+k]·h[k] / 2^div`.

use crate::error::{DspError, Result};

/// Evaluator processes taps in groups of this many
const TAP_GROUP: usize = 4;

/// Filter length must be a multiple of this
pub const LENGTH_MULTIPLE: usize = 8;

/// FIR filter over whole sample blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirFilter {
    /// Filter coefficients h[k], integer valued
    coefficients: Vec<f32>,

    /// Output is divided by 2^result_div_factor
    result_div_factor: u32,
}

impl FirFilter {
    /// Create an unconfigured filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Install new coefficients
    ///
    /// # Arguments
    /// * `coefficients` - Filter taps, length a non-zero multiple of 8
    /// * `result_div_factor` - Results are divided by 2^result_div_factor
    ///
    /// # Errors
    /// `Configuration` for an empty or wrongly sized tap set; the current
    /// coefficients are kept in that case
    pub fn set_coefficients(&mut self, coefficients: &[f32], result_div_factor: u32) -> Result<()> {
        if coefficients.is_empty() {
            return Err(DspError::Configuration("FIR filter length is zero".into()));
        }
        if coefficients.len() % LENGTH_MULTIPLE != 0 {
            return Err(DspError::Configuration(format!(
                "FIR filter length {} not divisible by {LENGTH_MULTIPLE}",
                coefficients.len()
            )));
        }
        if result_div_factor >= 64 {
            return Err(DspError::Configuration(format!(
                "result divide factor {result_div_factor} is out of range"
            )));
        }

        self.coefficients = coefficients.to_vec();
        self.result_div_factor = result_div_factor;
        Ok(())
    }

    /// Filter `src` into `dest`
    ///
    /// Writes `dest[j]` for `j` in `0..num_samples - length` (nothing when
    /// `num_samples <= length`).
    ///
    /// # Returns
    /// Number of samples written
    ///
    /// # Errors
    /// `Usage` when no coefficients are installed, `InputShape` when `src`
    /// holds fewer than `num_samples` samples or `dest` is too short
    pub fn evaluate(&self, dest: &mut [f32], src: &[f32], num_samples: usize) -> Result<usize> {
        let length = self.coefficients.len();
        if length == 0 {
            return Err(DspError::Usage("FIR filter evaluated before coefficients were set".into()));
        }
        if src.len() < num_samples {
            return Err(DspError::InputShape(format!(
                "source holds {} samples, {num_samples} requested",
                src.len()
            )));
        }

        let end = num_samples.saturating_sub(length);
        if dest.len() < end {
            return Err(DspError::InputShape(format!(
                "destination holds {} samples, {end} needed",
                dest.len()
            )));
        }

        let scaler = 1.0 / self.result_divider();
        for (j, out) in dest[..end].iter_mut().enumerate() {
            let window = &src[j..j + length];
            let mut sum = 0.0f64;
            for (x, h) in window
                .chunks_exact(TAP_GROUP)
                .zip(self.coefficients.chunks_exact(TAP_GROUP))
            {
                sum += x[0] as f64 * h[0] as f64
                    + x[1] as f64 * h[1] as f64
                    + x[2] as f64 * h[2] as f64
                    + x[3] as f64 * h[3] as f64;
            }
            *out = (sum * scaler) as f32;
        }

        Ok(end)
    }

    /// Filter a whole block into a new buffer of `src.len() - length` samples
    pub fn filter(&self, src: &[f32]) -> Result<Vec<f32>> {
        let mut dest = vec![0.0; src.len().saturating_sub(self.length())];
        let written = self.evaluate(&mut dest, src, src.len())?;
        dest.truncate(written);
        Ok(dest)
    }

    /// Get filter coefficients
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Get filter length (0 while unconfigured)
    pub fn length(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_configured(&self) -> bool {
        !self.coefficients.is_empty()
    }

    pub fn result_div_factor(&self) -> u32 {
        self.result_div_factor
    }

    /// 2^result_div_factor
    pub fn result_divider(&self) -> f64 {
        (1u64 << self.result_div_factor) as f64
    }
}
