//! Power-of-two FFT engine
//!
//! Iterative radix-2 complex transform with a shared bit-reversal cache,
//! plus a real-input transform and a fused power spectrum that both run
//! a half-length complex FFT and unfold the result.

use super::bit_reverse::BitReverseCache;
use super::complex::ComplexBuffer;
use crate::error::{DspError, Result};
use std::f64::consts::PI;
use std::sync::Arc;

/// True if `n` is a power of two and at least 2
pub fn is_power_of_two(n: usize) -> bool {
    n >= 2 && n & (n - 1) == 0
}

fn check_size(n: usize) -> Result<()> {
    if is_power_of_two(n) {
        Ok(())
    } else {
        tracing::warn!(size = n, "FFT size is not a power of two");
        Err(DspError::InvalidSize(n))
    }
}

fn check_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(DspError::InputShape(format!(
            "{name} has {actual} samples, expected {expected}"
        )))
    }
}

/// Twiddle factors `e^{-iπk/half}` for k = 1, 2, ... by complex recurrence
struct Twiddles {
    wr: f64,
    wi: f64,
    wpr: f64,
    wpi: f64,
}

impl Twiddles {
    fn new(half: usize) -> Self {
        let theta = PI / half as f64;
        let wtemp = (0.5 * theta).sin();
        let wpr = -2.0 * wtemp * wtemp;
        let wpi = -theta.sin();
        Self {
            wr: 1.0 + wpr,
            wi: wpi,
            wpr,
            wpi,
        }
    }
}

impl Iterator for Twiddles {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<(f64, f64)> {
        let current = (self.wr, self.wi);
        let wtemp = self.wr;
        self.wr = wtemp * self.wpr - self.wi * self.wpi + wtemp;
        self.wi = self.wi * self.wpr + wtemp * self.wpi + self.wi;
        Some(current)
    }
}

/// Recover real-FFT bins `i` and `half - i` from the packed half-length
/// transform. Returns `((re_i, im_i), (re_i3, im_i3))`.
#[inline]
fn unfold_pair(
    real: &[f32],
    imag: &[f32],
    i: usize,
    i3: usize,
    (wr, wi): (f64, f64),
) -> ((f64, f64), (f64, f64)) {
    let (ri, r3) = (real[i] as f64, real[i3] as f64);
    let (ii, i3v) = (imag[i] as f64, imag[i3] as f64);

    let h1r = 0.5 * (ri + r3);
    let h1i = 0.5 * (ii - i3v);
    let h2r = 0.5 * (ii + i3v);
    let h2i = -0.5 * (ri - r3);

    (
        (h1r + wr * h2r - wi * h2i, h1i + wr * h2i + wi * h2r),
        (h1r - wr * h2r + wi * h2i, -h1i + wr * h2i + wi * h2r),
    )
}

/// FFT engine for power-of-two sizes
///
/// Stateless apart from the bit-reversal cache, so one engine can serve
/// any number of sizes. Engines built with [`FftEngine::with_cache`] share
/// their tables.
#[derive(Debug, Clone, Default)]
pub struct FftEngine {
    cache: Arc<BitReverseCache>,
}

impl FftEngine {
    /// Create an engine with its own (not yet built) cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine sharing an existing cache
    pub fn with_cache(cache: Arc<BitReverseCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<BitReverseCache> {
        &self.cache
    }

    /// Release the bit-reversal tables
    ///
    /// Only possible while this engine is the sole owner of the cache;
    /// returns false (and keeps the tables) otherwise.
    pub fn release_cache(&mut self) -> bool {
        match Arc::get_mut(&mut self.cache) {
            Some(cache) => {
                cache.clear();
                true
            }
            None => false,
        }
    }

    /// Complex FFT (or inverse FFT) of `real_in` + i·`imag_in`
    ///
    /// # Arguments
    /// * `inverse` - Compute the inverse transform (normalized by 1/n)
    /// * `real_in` - Real part; its length is the transform size n
    /// * `imag_in` - Imaginary part, or `None` for an all-zero imaginary part
    /// * `real_out`, `imag_out` - Output spectrum, length n each
    ///
    /// # Errors
    /// `InvalidSize` when n is not a power of two >= 2, `InputShape` when
    /// any other buffer differs in length from n
    pub fn complex_fft(
        &self,
        inverse: bool,
        real_in: &[f32],
        imag_in: Option<&[f32]>,
        real_out: &mut [f32],
        imag_out: &mut [f32],
    ) -> Result<()> {
        let n = real_in.len();
        check_size(n)?;
        if let Some(imag) = imag_in {
            check_len("imaginary input", imag.len(), n)?;
        }
        check_len("real output", real_out.len(), n)?;
        check_len("imaginary output", imag_out.len(), n)?;

        self.transform(inverse, real_in, imag_in, real_out, imag_out);
        Ok(())
    }

    /// Real-input FFT packed into n/2 complex bins
    ///
    /// Bins 1..n/2 are the non-redundant half of the full transform. Bin 0
    /// packs the two purely real bins: the sum of the packed even/odd parts
    /// (the DC bin) goes to `real_out[0]`, their difference (the Nyquist
    /// bin) to `imag_out[0]`.
    ///
    /// # Arguments
    /// * `real_in` - Input signal, length n
    /// * `real_out`, `imag_out` - Output bins, length n/2 each
    pub fn real_fft(
        &self,
        real_in: &[f32],
        real_out: &mut [f32],
        imag_out: &mut [f32],
    ) -> Result<()> {
        let n = real_in.len();
        check_size(n)?;
        let half = n / 2;
        check_len("real output", real_out.len(), half)?;
        check_len("imaginary output", imag_out.len(), half)?;

        let (tmp_real, tmp_imag): (Vec<f32>, Vec<f32>) =
            real_in.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();

        self.transform(false, &tmp_real, Some(&tmp_imag), real_out, imag_out);

        for (i, w) in (1..half / 2).zip(Twiddles::new(half)) {
            let i3 = half - i;
            let ((re, im), (re3, im3)) = unfold_pair(real_out, imag_out, i, i3, w);
            real_out[i] = re as f32;
            imag_out[i] = im as f32;
            real_out[i3] = re3 as f32;
            imag_out[i3] = im3 as f32;
        }

        // The middle bin comes out of the packed transform conjugated
        if half >= 2 {
            imag_out[half / 2] = -imag_out[half / 2];
        }

        let (even_sum, odd_sum) = (real_out[0], imag_out[0]);
        real_out[0] = even_sum + odd_sum;
        imag_out[0] = even_sum - odd_sum;
        Ok(())
    }

    /// Power spectrum |X[k]|² of a real signal for k in 0..=n/2
    ///
    /// Same derivation as [`FftEngine::real_fft`] but keeps only the
    /// squared magnitude, and unfolds DC and Nyquist into their own bins.
    ///
    /// # Arguments
    /// * `input` - Input signal, length n
    /// * `out` - Output power, length n/2 + 1
    pub fn power_spectrum(&self, input: &[f32], out: &mut [f32]) -> Result<()> {
        let n = input.len();
        check_size(n)?;
        let half = n / 2;
        check_len("power output", out.len(), half + 1)?;

        let (tmp_real, tmp_imag): (Vec<f32>, Vec<f32>) =
            input.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();
        let mut real = vec![0.0; half];
        let mut imag = vec![0.0; half];

        self.transform(false, &tmp_real, Some(&tmp_imag), &mut real, &mut imag);

        for (i, w) in (1..half / 2).zip(Twiddles::new(half)) {
            let i3 = half - i;
            let ((re, im), (re3, im3)) = unfold_pair(&real, &imag, i, i3, w);
            out[i] = (re * re + im * im) as f32;
            out[i3] = (re3 * re3 + im3 * im3) as f32;
        }

        if half >= 2 {
            let (re, im) = (real[half / 2] as f64, imag[half / 2] as f64);
            out[half / 2] = (re * re + im * im) as f32;
        }

        let dc = real[0] as f64 + imag[0] as f64;
        let nyquist = real[0] as f64 - imag[0] as f64;
        out[0] = (dc * dc) as f32;
        out[half] = (nyquist * nyquist) as f32;
        Ok(())
    }

    /// Forward transform of `real[start..start + len]` (+ optional imaginary part)
    pub fn to_frequency_domain(
        &self,
        real: &[f32],
        imag: Option<&[f32]>,
        start: usize,
        len: usize,
    ) -> Result<ComplexBuffer> {
        let end = start
            .checked_add(len)
            .filter(|&end| end <= real.len())
            .ok_or_else(|| {
                DspError::InputShape(format!(
                    "range {start}+{len} exceeds input of {} samples",
                    real.len()
                ))
            })?;
        check_size(len)?;

        let imag = match imag {
            Some(imag) if imag.len() < end => {
                return Err(DspError::InputShape(format!(
                    "imaginary input has {} samples, range ends at {end}",
                    imag.len()
                )))
            }
            Some(imag) => Some(&imag[start..end]),
            None => None,
        };

        let mut spectrum = ComplexBuffer::zeros(len);
        let (real_out, imag_out) = spectrum.parts_mut();
        self.transform(false, &real[start..end], imag, real_out, imag_out);
        Ok(spectrum)
    }

    /// Normalized inverse transform of a full complex spectrum
    pub fn from_frequency_domain(&self, spectrum: &ComplexBuffer) -> Result<ComplexBuffer> {
        check_size(spectrum.len())?;

        let mut signal = ComplexBuffer::zeros(spectrum.len());
        let (real_out, imag_out) = signal.parts_mut();
        self.transform(true, spectrum.real(), Some(spectrum.imag()), real_out, imag_out);
        Ok(signal)
    }

    /// Unchecked transform; `real_out.len()` is the size and must be a
    /// power of two (1 is allowed and copies the input)
    fn transform(
        &self,
        inverse: bool,
        real_in: &[f32],
        imag_in: Option<&[f32]>,
        real_out: &mut [f32],
        imag_out: &mut [f32],
    ) {
        let n = real_out.len();
        let num_bits = n.trailing_zeros();

        // Copy into bit-reversed order
        let table = self.cache.table(num_bits);
        for i in 0..n {
            let j = match table {
                Some(table) => table[i] as usize,
                None => super::bit_reverse::reverse_bits(i, num_bits),
            };
            real_out[j] = real_in[i];
            imag_out[j] = imag_in.map_or(0.0, |imag| imag[i]);
        }

        let angle_numerator = if inverse { 2.0 * PI } else { -2.0 * PI };

        let mut block_end = 1;
        let mut block_size = 2;
        while block_size <= n {
            let delta_angle = angle_numerator / block_size as f64;

            let sm2 = (-2.0 * delta_angle).sin();
            let sm1 = (-delta_angle).sin();
            let cm2 = (-2.0 * delta_angle).cos();
            let cm1 = (-delta_angle).cos();
            let w = 2.0 * cm1;

            for block_start in (0..n).step_by(block_size) {
                let (mut ar1, mut ar2) = (cm1, cm2);
                let (mut ai1, mut ai2) = (sm1, sm2);

                for j in block_start..block_start + block_end {
                    // cos/sin of (j - block_start) * delta_angle
                    let ar0 = w * ar1 - ar2;
                    ar2 = ar1;
                    ar1 = ar0;

                    let ai0 = w * ai1 - ai2;
                    ai2 = ai1;
                    ai1 = ai0;

                    let k = j + block_end;
                    let (rk, ik) = (real_out[k] as f64, imag_out[k] as f64);
                    let tr = ar0 * rk - ai0 * ik;
                    let ti = ar0 * ik + ai0 * rk;

                    let (rj, ij) = (real_out[j] as f64, imag_out[j] as f64);
                    real_out[k] = (rj - tr) as f32;
                    imag_out[k] = (ij - ti) as f32;
                    real_out[j] = (rj + tr) as f32;
                    imag_out[j] = (ij + ti) as f32;
                }
            }

            block_end = block_size;
            block_size <<= 1;
        }

        if inverse {
            let denom = n as f32;
            for (re, im) in real_out.iter_mut().zip(imag_out.iter_mut()) {
                *re /= denom;
                *im /= denom;
            }
        }
    }
}
