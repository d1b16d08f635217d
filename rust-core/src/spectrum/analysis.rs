//! Averaged spectrum and pitch estimation over long buffers
//!
//! Slides a window across the input with 50% overlap, transforms each frame
//! and accumulates the result. Two outputs are available: a decibel power
//! spectrum, or a peak-pruned pseudo-autocorrelation (Tolonen & Karjalainen)
//! suited to pitch estimation.

use super::fft::{is_power_of_two, FftEngine};
use super::windowing::WindowFunction;
use crate::error::{DspError, Result};

/// Spectrum estimator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumConfig {
    /// Frame length in samples (power of two)
    pub window_size: usize,

    /// Window applied to each frame
    pub window: WindowFunction,

    /// Produce a pruned autocorrelation instead of a dB spectrum
    pub autocorrelation: bool,

    /// Sample rate in Hz; only used to label bins
    pub sample_rate: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            window_size: 1024,
            window: WindowFunction::Blackman,
            autocorrelation: false,
            sample_rate: 44100.0,
        }
    }
}

impl SpectrumConfig {
    /// Check the window size and sample rate
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.window_size) {
            return Err(DspError::InvalidSize(self.window_size));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(DspError::Usage(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Number of output values (window_size / 2)
    pub fn num_bins(&self) -> usize {
        self.window_size / 2
    }
}

/// Compute an averaged spectrum of `data[..width]`
///
/// # Arguments
/// * `engine` - FFT engine to run the transforms on
/// * `data` - Input samples; `None` makes the call a successful no-op
/// * `width` - Number of samples of `data` to analyze
/// * `config` - Window size, window function and mode
/// * `output` - Receives `window_size / 2` values; `None` makes the call a no-op
///
/// # Errors
/// * `InvalidSize` - window size is not a power of two
/// * `Usage` - `width` is smaller than one window
/// * `InputShape` - `width` exceeds `data`, or `output` is too short
pub fn compute_spectrum(
    engine: &FftEngine,
    data: Option<&[f32]>,
    width: usize,
    config: &SpectrumConfig,
    output: Option<&mut [f32]>,
) -> Result<()> {
    let window_size = config.window_size;
    if !is_power_of_two(window_size) {
        return Err(DspError::InvalidSize(window_size));
    }
    if width < window_size {
        return Err(DspError::Usage(format!(
            "not enough data: {width} samples, window size is {window_size}"
        )));
    }

    let (Some(data), Some(output)) = (data, output) else {
        return Ok(());
    };

    let half = window_size / 2;
    if width > data.len() {
        return Err(DspError::InputShape(format!(
            "width {width} exceeds input of {} samples",
            data.len()
        )));
    }
    if output.len() < half {
        return Err(DspError::InputShape(format!(
            "output holds {} values, need {half}",
            output.len()
        )));
    }

    let mut processed = vec![0.0f64; half];
    let mut in_data = vec![0.0f32; window_size];
    let mut out = vec![0.0f32; window_size];
    let mut out2 = vec![0.0f32; window_size];
    let mut power = vec![0.0f32; half + 1];

    let mut start = 0;
    let mut windows = 0usize;
    while start + window_size <= width {
        in_data.copy_from_slice(&data[start..start + window_size]);
        config.window.apply(&mut in_data);

        if config.autocorrelation {
            engine.complex_fft(false, &in_data, None, &mut out, &mut out2)?;

            // Cube root of the power rather than the square root
            for ((x, &re), &im) in in_data.iter_mut().zip(&out).zip(&out2) {
                *x = (re * re + im * im).cbrt();
            }

            engine.complex_fft(false, &in_data, None, &mut out, &mut out2)?;

            for (acc, &re) in processed.iter_mut().zip(&out[..half]) {
                *acc += re as f64;
            }
        } else {
            engine.power_spectrum(&in_data, &mut power)?;

            for (acc, &p) in processed.iter_mut().zip(&power[..half]) {
                *acc += p as f64;
            }
        }

        start += half;
        windows += 1;
    }

    tracing::trace!(
        windows,
        window_size,
        window = config.window.name(),
        autocorrelation = config.autocorrelation,
        "spectrum accumulated"
    );

    if config.autocorrelation {
        prune_peaks(&mut processed);

        let scale = window_size as f64 / 4.0;
        for (dst, &value) in output[..half].iter_mut().zip(processed.iter().rev()) {
            *dst = (value / scale) as f32;
        }
    } else {
        let norm = window_size as f64 * windows as f64;
        for (dst, &value) in output[..half].iter_mut().zip(&processed) {
            let mean = value / norm;
            // Silent bins stay at 0 dB instead of -inf
            *dst = if mean > 0.0 {
                (10.0 * mean.log10()) as f32
            } else {
                0.0
            };
        }
    }

    Ok(())
}

/// Clip at zero and subtract a time-doubled copy of the clipped signal,
/// which removes the peaks at multiples of the true period
fn prune_peaks(processed: &mut [f64]) {
    let mut clipped = vec![0.0f64; processed.len()];

    // clipped[i / 2] and clipped[i / 2 + 1] are never ahead of i
    for i in 0..processed.len() {
        processed[i] = processed[i].max(0.0);
        clipped[i] = processed[i];

        let doubled = if i % 2 == 0 {
            clipped[i / 2]
        } else {
            (clipped[i / 2] + clipped[i / 2 + 1]) / 2.0
        };
        processed[i] = (processed[i] - doubled).max(0.0);
    }
}

/// Spectrum estimator bound to a configuration and FFT engine
#[derive(Debug, Clone)]
pub struct SpectrumEstimator {
    config: SpectrumConfig,
    engine: FftEngine,
}

impl SpectrumEstimator {
    /// Create new spectrum estimator with its own FFT engine
    pub fn new(config: SpectrumConfig) -> Result<Self> {
        Self::with_engine(config, FftEngine::new())
    }

    /// Create an estimator running on an existing engine
    pub fn with_engine(config: SpectrumConfig, engine: FftEngine) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    pub fn engine(&self) -> &FftEngine {
        &self.engine
    }

    /// Replace the configuration; the old one is kept if the new one is invalid
    pub fn update_config(&mut self, config: SpectrumConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Number of output values per call
    pub fn num_bins(&self) -> usize {
        self.config.num_bins()
    }

    /// Analyze the whole buffer
    ///
    /// # Returns
    /// `window_size / 2` dB values (spectral mode) or reversed, pruned
    /// autocorrelation values (autocorrelation mode)
    pub fn compute(&self, data: &[f32]) -> Result<Vec<f32>> {
        let mut output = vec![0.0; self.num_bins()];
        compute_spectrum(&self.engine, Some(data), data.len(), &self.config, Some(&mut output))?;
        Ok(output)
    }

    /// Analyze into a caller-provided buffer; absent buffers make this a no-op
    pub fn compute_into(&self, data: Option<&[f32]>, output: Option<&mut [f32]>) -> Result<()> {
        let width = data.map_or(self.config.window_size, <[f32]>::len);
        compute_spectrum(&self.engine, data, width, &self.config, output)
    }

    /// Analyze `data[start..start + len]`
    ///
    /// # Errors
    /// `Usage` when `data` or `len` is shorter than one window, `InputShape`
    /// when the range falls outside `data`
    pub fn amplitude_spectrum(&self, data: &[f32], start: usize, len: usize) -> Result<Vec<f32>> {
        let window_size = self.config.window_size;
        if data.len() < window_size || len < window_size {
            return Err(DspError::Usage(format!(
                "not enough data: minimum is the window size {window_size}"
            )));
        }
        if start >= data.len() {
            return Err(DspError::InputShape(format!("start {start} is out of range")));
        }
        let end = start
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                DspError::InputShape(format!(
                    "range {start}+{len} exceeds input of {} samples",
                    data.len()
                ))
            })?;

        self.compute(&data[start..end])
    }

    /// Center frequency in Hz of each spectral bin
    pub fn frequency_bins_hz(&self) -> Vec<f32> {
        let bin_width = self.config.sample_rate / self.config.window_size as f32;
        (0..self.num_bins()).map(|k| k as f32 * bin_width).collect()
    }

    /// Estimate the fundamental frequency from the pruned autocorrelation
    ///
    /// Runs the autocorrelation variant regardless of the configured mode.
    /// Returns `None` when every lag was pruned away.
    pub fn estimate_pitch(&self, data: &[f32]) -> Result<Option<f32>> {
        let config = SpectrumConfig {
            autocorrelation: true,
            ..self.config.clone()
        };
        let half = config.num_bins();
        let mut output = vec![0.0; half];
        compute_spectrum(&self.engine, Some(data), data.len(), &config, Some(&mut output))?;

        // Output is reversed: index j holds lag half - 1 - j
        let best = output
            .iter()
            .enumerate()
            .map(|(j, &value)| (half - 1 - j, value))
            .filter(|&(lag, value)| lag > 0 && value > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1));

        Ok(best.map(|(lag, _)| config.sample_rate / lag as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(len: usize, cycles_per_sample: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * cycles_per_sample * i as f32).sin())
            .collect()
    }

    fn rectangular(window_size: usize) -> SpectrumConfig {
        SpectrumConfig {
            window_size,
            window: WindowFunction::Rectangular,
            ..SpectrumConfig::default()
        }
    }

    #[test]
    fn test_single_peak_at_tone_bin() {
        let estimator = SpectrumEstimator::new(rectangular(1024)).unwrap();
        let signal = sine(4096, 64.0 / 1024.0);

        let spectrum = estimator.compute(&signal).unwrap();
        assert_eq!(spectrum.len(), 512);

        let (peak_bin, &peak_db) = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap();
        assert_eq!(peak_bin, 64);

        // (N/2)² / N = 256 -> ~24 dB
        assert!((peak_db - 24.08).abs() < 0.1, "peak {}", peak_db);
        for (bin, &db) in spectrum.iter().enumerate() {
            if bin != 64 {
                assert!(db < peak_db - 20.0, "bin {} at {} dB", bin, db);
            }
        }
    }

    #[test]
    fn test_silence_maps_to_zero_db() {
        let estimator = SpectrumEstimator::new(SpectrumConfig::default()).unwrap();
        let spectrum = estimator.compute(&vec![0.0; 2048]).unwrap();
        assert!(spectrum.iter().all(|&db| db == 0.0));
    }

    #[test]
    fn test_not_enough_data() {
        let estimator = SpectrumEstimator::new(SpectrumConfig::default()).unwrap();
        let err = estimator.compute(&[0.0; 512]).unwrap_err();
        assert!(matches!(err, DspError::Usage(_)));
    }

    #[test]
    fn test_absent_buffers_are_noop() {
        let engine = FftEngine::new();
        let config = SpectrumConfig::default();
        let data = vec![1.0; 2048];

        assert!(compute_spectrum(&engine, None, 2048, &config, None).is_ok());
        assert!(compute_spectrum(&engine, Some(&data), 2048, &config, None).is_ok());

        let mut output = vec![7.0; 512];
        compute_spectrum(&engine, None, 2048, &config, Some(&mut output)).unwrap();
        assert!(output.iter().all(|&v| v == 7.0));

        // Width is still checked first
        let err = compute_spectrum(&engine, None, 100, &config, None).unwrap_err();
        assert!(matches!(err, DspError::Usage(_)));
    }

    #[test]
    fn test_shape_errors() {
        let engine = FftEngine::new();
        let config = SpectrumConfig::default();
        let data = vec![0.0; 1024];
        let mut short = vec![0.0; 100];

        let err =
            compute_spectrum(&engine, Some(&data), 2048, &config, Some(&mut short)).unwrap_err();
        assert!(matches!(err, DspError::InputShape(_)));

        let err =
            compute_spectrum(&engine, Some(&data), 1024, &config, Some(&mut short)).unwrap_err();
        assert!(matches!(err, DspError::InputShape(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SpectrumConfig {
            window_size: 1000,
            ..SpectrumConfig::default()
        };
        assert_eq!(SpectrumEstimator::new(config).unwrap_err(), DspError::InvalidSize(1000));

        let mut estimator = SpectrumEstimator::new(SpectrumConfig::default()).unwrap();
        let bad_rate = SpectrumConfig {
            sample_rate: 0.0,
            ..SpectrumConfig::default()
        };
        assert!(estimator.update_config(bad_rate).is_err());
        assert_eq!(estimator.config().sample_rate, 44100.0);
    }

    #[test]
    fn test_autocorrelation_output_shape() {
        let config = SpectrumConfig {
            window_size: 512,
            window: WindowFunction::Hanning,
            autocorrelation: true,
            ..SpectrumConfig::default()
        };
        let estimator = SpectrumEstimator::new(config).unwrap();
        let signal = sine(2048, 0.01);

        let acf = estimator.compute(&signal).unwrap();
        assert_eq!(acf.len(), 256);
        assert!(acf.iter().all(|&v| v >= 0.0 && v.is_finite()));
        // Lag 0 is always pruned, and it sits at the end after reversal
        assert_eq!(acf[255], 0.0);
        assert!(acf.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn test_prune_peaks() {
        let mut values = vec![4.0, 3.0, -1.0, 2.0, 5.0];
        prune_peaks(&mut values);
        // i=0: 4 - 4; i=1: 3 - (4+3)/2 < 0; i=2: clipped to 0;
        // i=3: 2 - (3+0)/2 = 0.5; i=4: 5 - 0 = 5
        assert_eq!(values, vec![0.0, 0.0, 0.0, 0.5, 5.0]);
    }

    #[test]
    fn test_estimate_pitch() {
        let config = SpectrumConfig {
            window_size: 4096,
            window: WindowFunction::Hanning,
            ..SpectrumConfig::default()
        };
        let estimator = SpectrumEstimator::new(config).unwrap();
        let signal = sine(16384, 441.0 / 44100.0);

        let pitch = estimator.estimate_pitch(&signal).unwrap().unwrap();
        assert!((pitch - 441.0).abs() < 10.0, "pitch {}", pitch);
    }

    #[test]
    fn test_amplitude_spectrum_range_checks() {
        let estimator = SpectrumEstimator::new(rectangular(256)).unwrap();
        let data = sine(1024, 0.125);

        assert_eq!(estimator.amplitude_spectrum(&data, 0, 1024).unwrap().len(), 128);
        assert!(matches!(
            estimator.amplitude_spectrum(&data, 0, 100),
            Err(DspError::Usage(_))
        ));
        assert!(matches!(
            estimator.amplitude_spectrum(&data, 1024, 256),
            Err(DspError::InputShape(_))
        ));
        assert!(matches!(
            estimator.amplitude_spectrum(&data, 800, 256),
            Err(DspError::InputShape(_))
        ));
        // Range end past usize::MAX
        assert!(matches!(
            estimator.amplitude_spectrum(&data, 1, usize::MAX),
            Err(DspError::InputShape(_))
        ));
    }

    #[test]
    fn test_frequency_bins() {
        let estimator = SpectrumEstimator::new(SpectrumConfig::default()).unwrap();
        let bins = estimator.frequency_bins_hz();
        assert_eq!(bins.len(), 512);
        assert_eq!(bins[0], 0.0);
        assert!((bins[1] - 44100.0 / 1024.0).abs() < 1e-3);
    }
}
