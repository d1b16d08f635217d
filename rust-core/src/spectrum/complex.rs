//! Split real/imaginary sample storage

use crate::error::{DspError, Result};
use num_complex::Complex32;

/// Pair of equal-length real and imaginary sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplexBuffer {
    real: Vec<f32>,
    imag: Vec<f32>,
}

impl ComplexBuffer {
    /// Build from separate parts
    ///
    /// # Errors
    /// `InputShape` if the parts differ in length
    pub fn new(real: Vec<f32>, imag: Vec<f32>) -> Result<Self> {
        if real.len() != imag.len() {
            return Err(DspError::InputShape(format!(
                "real part has {} samples, imaginary part has {}",
                real.len(),
                imag.len()
            )));
        }
        Ok(Self { real, imag })
    }

    /// All-zero buffer of `len` samples
    pub fn zeros(len: usize) -> Self {
        Self {
            real: vec![0.0; len],
            imag: vec![0.0; len],
        }
    }

    /// Number of complex samples
    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    pub fn real(&self) -> &[f32] {
        &self.real
    }

    pub fn imag(&self) -> &[f32] {
        &self.imag
    }

    /// Mutable access to both parts at once
    pub fn parts_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.real, &mut self.imag)
    }

    pub fn into_parts(self) -> (Vec<f32>, Vec<f32>) {
        (self.real, self.imag)
    }

    /// Squared magnitude per sample
    pub fn power(&self) -> Vec<f32> {
        self.real
            .iter()
            .zip(&self.imag)
            .map(|(&re, &im)| re * re + im * im)
            .collect()
    }

    /// Interleaved `Complex32` copy
    pub fn to_complex(&self) -> Vec<Complex32> {
        self.real
            .iter()
            .zip(&self.imag)
            .map(|(&re, &im)| Complex32::new(re, im))
            .collect()
    }

    pub fn from_complex(values: &[Complex32]) -> Self {
        let (real, imag) = values.iter().map(|c| (c.re, c.im)).unzip();
        Self { real, imag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_lengths_rejected() {
        let err = ComplexBuffer::new(vec![0.0; 4], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, DspError::InputShape(_)));
    }

    #[test]
    fn test_complex_conversion() {
        let buffer = ComplexBuffer::new(vec![1.0, 3.0], vec![2.0, -4.0]).unwrap();
        let values = buffer.to_complex();
        assert_eq!(values[1], Complex32::new(3.0, -4.0));
        assert_eq!(ComplexBuffer::from_complex(&values), buffer);
        assert_eq!(buffer.power(), vec![5.0, 25.0]);
    }
}
