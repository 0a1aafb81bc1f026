//! Windowed discrete Fourier transform
//!
//! Provides the one-sided amplitude spectrum (or power spectral density) of a
//! real 1-D signal, as used by the sine estimators:
//! - Optional baseline correction (mean removal)
//! - Window catalog with amplitude normalization (scipy.signal conventions)
//! - Zero-padding for sinc interpolation between bins
//!
//! Zero-padding does not add information to the spectrum, it only
//! interpolates between the bins of the unpadded transform.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function applied to the signal before the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    /// Rectangular window (no windowing)
    #[default]
    None,
    Hamming,
    Hann,
    Blackman,
    /// Triangular window without zero end points
    Triang,
    /// Flat-top window (accurate amplitude measurement)
    FlatTop,
    /// Triangular window with zero end points
    Bartlett,
    Parzen,
    Bohman,
    BlackmanHarris,
    Nuttall,
    /// Modified Bartlett-Hann window
    BartHann,
}

impl WindowFunction {
    /// Identifier used to select the window by name
    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::None => "none",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Hann => "hann",
            WindowFunction::Blackman => "blackman",
            WindowFunction::Triang => "triang",
            WindowFunction::FlatTop => "flattop",
            WindowFunction::Bartlett => "bartlett",
            WindowFunction::Parzen => "parzen",
            WindowFunction::Bohman => "bohman",
            WindowFunction::BlackmanHarris => "blackmanharris",
            WindowFunction::Nuttall => "nuttall",
            WindowFunction::BartHann => "barthann",
        }
    }

    /// Look up a window by its identifier. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|w| w.name() == name)
    }

    /// Get all window functions
    pub fn all() -> &'static [WindowFunction] {
        &[
            WindowFunction::None,
            WindowFunction::Hamming,
            WindowFunction::Hann,
            WindowFunction::Blackman,
            WindowFunction::Triang,
            WindowFunction::FlatTop,
            WindowFunction::Bartlett,
            WindowFunction::Parzen,
            WindowFunction::Bohman,
            WindowFunction::BlackmanHarris,
            WindowFunction::Nuttall,
            WindowFunction::BartHann,
        ]
    }

    /// Factor compensating the DC attenuation of the window, i.e. the
    /// inverse of the window's mean value for large N.
    pub fn amplitude_norm(&self) -> f64 {
        match self {
            WindowFunction::None => 1.0,
            WindowFunction::Hamming => 1.0 / 0.54,
            WindowFunction::Hann => 1.0 / 0.5,
            WindowFunction::Blackman => 1.0 / 0.42,
            WindowFunction::Triang => 1.0 / 0.5,
            WindowFunction::FlatTop => 1.0 / 0.2156,
            WindowFunction::Bartlett => 1.0 / 0.5,
            WindowFunction::Parzen => 1.0 / 0.375,
            WindowFunction::Bohman => 1.0 / 0.4052847,
            WindowFunction::BlackmanHarris => 1.0 / 0.35875,
            WindowFunction::Nuttall => 1.0 / 0.3635819,
            WindowFunction::BartHann => 1.0 / 0.5,
        }
    }

    /// Compute the symmetric window coefficient at position i out of n samples
    pub fn coefficient(&self, i: usize, n: usize) -> f64 {
        if n <= 1 {
            return 1.0;
        }

        let m = (n - 1) as f64;
        let i_f = i as f64;
        let theta = 2.0 * PI * i_f / m;

        match self {
            WindowFunction::None => 1.0,
            WindowFunction::Hamming => general_cosine(theta, &[0.54, 0.46]),
            WindowFunction::Hann => general_cosine(theta, &[0.5, 0.5]),
            // The formula is exactly 0 at the end points, rounding of 0.42
            // and 0.08 can push it to -eps.
            WindowFunction::Blackman => general_cosine(theta, &[0.42, 0.50, 0.08]).max(0.0),
            WindowFunction::FlatTop => general_cosine(
                theta,
                &[0.21557895, 0.41663158, 0.277263158, 0.083578947, 0.006947368],
            ),
            WindowFunction::BlackmanHarris => {
                general_cosine(theta, &[0.35875, 0.48829, 0.14128, 0.01168])
            }
            WindowFunction::Nuttall => {
                general_cosine(theta, &[0.3635819, 0.4891775, 0.1365995, 0.0106411])
            }
            WindowFunction::Triang => {
                let j = i.min(n - 1 - i) as f64;
                if n % 2 == 0 {
                    (2.0 * j + 1.0) / n as f64
                } else {
                    2.0 * (j + 1.0) / (n as f64 + 1.0)
                }
            }
            WindowFunction::Bartlett => {
                if i_f <= m / 2.0 {
                    2.0 * i_f / m
                } else {
                    2.0 - 2.0 * i_f / m
                }
            }
            WindowFunction::Parzen => {
                let k = (i_f - m / 2.0).abs();
                let half = n as f64 / 2.0;
                if k <= m / 4.0 {
                    1.0 - 6.0 * (k / half).powi(2) + 6.0 * (k / half).powi(3)
                } else {
                    2.0 * (1.0 - k / half).powi(3)
                }
            }
            WindowFunction::Bohman => {
                if i == 0 || i == n - 1 {
                    0.0
                } else {
                    let fac = (2.0 * i_f / m - 1.0).abs();
                    (1.0 - fac) * (PI * fac).cos() + (PI * fac).sin() / PI
                }
            }
            WindowFunction::BartHann => {
                let fac = (i_f / m - 0.5).abs();
                0.62 - 0.48 * fac + 0.38 * (2.0 * PI * fac).cos()
            }
        }
    }

    /// Generate window coefficients for n samples
    pub fn generate(&self, n: usize) -> Vec<f64> {
        (0..n).map(|i| self.coefficient(i, n)).collect()
    }
}

impl std::fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sum of cosines with alternating signs, `a0 - a1 cos(t) + a2 cos(2t) - ...`
fn general_cosine(theta: f64, coefficients: &[f64]) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .map(|(k, &a)| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sign * a * (k as f64 * theta).cos()
        })
        .sum()
}

/// Options for [`compute_ft`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FtOptions {
    /// Number of signal lengths of zeros appended before the transform
    pub zeropad_num: usize,
    /// Window identifier, see [`WindowFunction::name`]. Unknown identifiers
    /// are treated as no window.
    pub window: String,
    /// Subtract the mean of the signal before the transform
    pub base_corr: bool,
    /// Return the power spectral density instead of the amplitude spectrum
    pub psd: bool,
}

impl Default for FtOptions {
    fn default() -> Self {
        Self {
            zeropad_num: 0,
            window: WindowFunction::None.name().to_string(),
            base_corr: true,
            psd: false,
        }
    }
}

impl FtOptions {
    /// Options with a given zero-padding factor and defaults otherwise
    pub fn with_zeropad(zeropad_num: usize) -> Self {
        Self {
            zeropad_num,
            ..Default::default()
        }
    }

    /// Set the window by identifier
    pub fn window(mut self, window: impl Into<String>) -> Self {
        self.window = window.into();
        self
    }

    /// Enable or disable baseline correction
    pub fn base_corr(mut self, base_corr: bool) -> Self {
        self.base_corr = base_corr;
        self
    }

    /// Enable or disable PSD output
    pub fn psd(mut self, psd: bool) -> Self {
        self.psd = psd;
        self
    }
}

/// One-sided spectrum of a real signal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spectrum {
    /// Frequency bins, in inverse x-units
    pub frequencies: Vec<f64>,
    /// Normalized amplitude (or PSD) per bin
    pub magnitudes: Vec<f64>,
}

impl Spectrum {
    /// Compute the spectrum of `y` sampled at `x`
    pub fn compute(x: &[f64], y: &[f64], options: &FtOptions) -> Self {
        let (frequencies, magnitudes) = compute_ft(x, y, options);
        Self {
            frequencies,
            magnitudes,
        }
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Whether the spectrum has no bins
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Spacing of the frequency axis
    pub fn bin_width(&self) -> f64 {
        match self.frequencies.as_slice() {
            [f0, f1, ..] => (f1 - f0).abs(),
            _ => 0.0,
        }
    }

    /// Find the peak frequency and its magnitude
    pub fn peak(&self) -> Option<(f64, f64)> {
        let idx = argmax(&self.magnitudes)?;
        Some((self.frequencies[idx], self.magnitudes[idx]))
    }
}

/// Index of the first maximum, skipping NaN entries
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Round to a number of decimals, ties to even
fn round_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Compute the one-sided discrete Fourier transform of `y` sampled at `x`
///
/// # Arguments
/// * `x` - Sample positions; only the spacing of the last two samples is used
/// * `y` - Signal values, same length as `x`
/// * `options` - Zero-padding, window, baseline correction and PSD selection
///
/// # Returns
/// `(frequencies, magnitudes)`, both of length `ceil(padded_len / 2)` where
/// `padded_len = len(y) * (zeropad_num + 1)`.
///
/// The magnitudes are scaled by `2 / len(y)` and by the window's amplitude
/// normalization, so a pure sine of amplitude A yields a peak of height A.
/// With `psd` the already scaled magnitude is squared.
pub fn compute_ft(x: &[f64], y: &[f64], options: &FtOptions) -> (Vec<f64>, Vec<f64>) {
    let n = y.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut corrected: Vec<f64> = if options.base_corr {
        let mean = y.iter().sum::<f64>() / n as f64;
        y.iter().map(|&v| v - mean).collect()
    } else {
        y.to_vec()
    };

    let mut ampl_norm = 1.0;
    if let Some(window) = WindowFunction::from_name(&options.window) {
        for (v, w) in corrected.iter_mut().zip(window.generate(n)) {
            *v *= w;
        }
        ampl_norm = window.amplitude_norm();
    }

    let padded_len = n * (options.zeropad_num + 1);
    let mut buffer: Vec<Complex<f64>> = corrected
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect();
    buffer.resize(padded_len, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded_len);
    fft.process(&mut buffer);

    let scale = 2.0 / n as f64 * ampl_norm;
    let middle = (padded_len + 1) / 2;

    let magnitudes: Vec<f64> = buffer
        .iter()
        .take(middle)
        .map(|c| {
            let mag = c.norm() * scale;
            if options.psd {
                mag * mag
            } else {
                mag
            }
        })
        .collect();

    // Spacing from the last two samples only, not the mean spacing.
    let spacing = match x {
        [.., a, b] => round_decimals(b - a, 12),
        _ => f64::NAN,
    };
    let step = 1.0 / (padded_len as f64 * spacing);
    let frequencies: Vec<f64> = (0..middle).map(|k| (k as f64 * step).abs()).collect();

    (frequencies, magnitudes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(n: usize, dt: f64, freq: f64, amplitude: f64) -> (Vec<f64>, Vec<f64>) {
        let x: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let y = x
            .iter()
            .map(|&t| amplitude * (2.0 * PI * freq * t).sin())
            .collect();
        (x, y)
    }

    #[test]
    fn test_window_functions() {
        let n = 100;
        for window in WindowFunction::all() {
            let coeffs = window.generate(n);
            assert_eq!(coeffs.len(), n);

            // Flat-top has small negative side lobes.
            for &c in &coeffs {
                assert!(
                    (-0.1..=1.0 + 1e-9).contains(&c),
                    "Window {} coefficient {} out of range",
                    window,
                    c
                );
            }

            // Symmetric windows
            for i in 0..n / 2 {
                assert_relative_eq!(coeffs[i], coeffs[n - 1 - i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_known_window_values() {
        let hann = WindowFunction::Hann.generate(5);
        for (a, b) in hann.iter().zip([0.0, 0.5, 1.0, 0.5, 0.0]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }

        let triang = WindowFunction::Triang.generate(4);
        for (a, b) in triang.iter().zip([0.25, 0.75, 0.75, 0.25]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }

        let triang_odd = WindowFunction::Triang.generate(5);
        for (a, b) in triang_odd.iter().zip([1.0 / 3.0, 2.0 / 3.0, 1.0, 2.0 / 3.0, 1.0 / 3.0]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }

        let bartlett = WindowFunction::Bartlett.generate(5);
        for (a, b) in bartlett.iter().zip([0.0, 0.5, 1.0, 0.5, 0.0]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }

        let hamming = WindowFunction::Hamming.generate(3);
        for (a, b) in hamming.iter().zip([0.08, 1.0, 0.08]) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }

        assert_eq!(WindowFunction::Bohman.generate(7)[0], 0.0);
        assert_eq!(WindowFunction::Parzen.generate(1), vec![1.0]);
    }

    #[test]
    fn test_window_names_round_trip() {
        for window in WindowFunction::all() {
            assert_eq!(WindowFunction::from_name(window.name()), Some(*window));
        }
        assert_eq!(WindowFunction::from_name("kaiser"), None);
    }

    #[test]
    fn test_sine_peak_and_amplitude() {
        let (x, y) = sine(1000, 1e-3, 50.0, 3.0);
        let options = FtOptions::default().base_corr(false);
        let spectrum = Spectrum::compute(&x, &y, &options);

        assert_eq!(spectrum.len(), 500);
        assert_relative_eq!(spectrum.bin_width(), 1.0, epsilon = 1e-9);

        let (peak_freq, peak_mag) = spectrum.peak().expect("Should find peak");
        assert!((peak_freq - 50.0).abs() <= spectrum.bin_width());
        assert_relative_eq!(peak_mag, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_psd_squares_normalized_magnitude() {
        let (x, y) = sine(256, 0.01, 12.5, 2.0);
        let (_, amp) = compute_ft(&x, &y, &FtOptions::default().window("hann"));
        let (_, psd) = compute_ft(&x, &y, &FtOptions::default().window("hann").psd(true));
        for (a, p) in amp.iter().zip(psd.iter()) {
            assert_relative_eq!(a * a, *p, epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_zeropad_lengths() {
        let (x, y) = sine(100, 0.1, 1.0, 1.0);
        let (f, m) = compute_ft(&x, &y, &FtOptions::with_zeropad(1));
        assert_eq!(f.len(), 100);
        assert_eq!(m.len(), 100);

        let (x, y) = sine(101, 0.1, 1.0, 1.0);
        let (f, _) = compute_ft(&x, &y, &FtOptions::default());
        assert_eq!(f.len(), 51);
        assert!(f.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_unknown_window_is_no_window() {
        let (x, y) = sine(128, 0.01, 5.0, 1.0);
        let plain = compute_ft(&x, &y, &FtOptions::default());
        let unknown = compute_ft(&x, &y, &FtOptions::default().window("does-not-exist"));
        assert_eq!(plain, unknown);
    }

    #[test]
    fn test_baseline_correction_removes_dc() {
        let x: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let y = vec![5.0; 64];
        let (_, corrected) = compute_ft(&x, &y, &FtOptions::default());
        assert!(corrected[0].abs() < 1e-12);

        let (_, raw) = compute_ft(&x, &y, &FtOptions::default().base_corr(false));
        assert_relative_eq!(raw[0], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_frequency_axis_uses_last_spacing() {
        let x = vec![0.0, 0.5, 1.0, 1.1];
        let y = vec![0.0, 1.0, 0.0, -1.0];
        let (f, _) = compute_ft(&x, &y, &FtOptions::default());
        assert_eq!(f.len(), 2);
        assert_relative_eq!(f[1], 1.0 / (4.0 * 0.1), epsilon = 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let (f, m) = compute_ft(&[], &[], &FtOptions::default());
        assert!(f.is_empty());
        assert!(m.is_empty());
        assert!(Spectrum::default().peak().is_none());
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(argmax(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_window_keeps_peak_frequency(bin in 10usize..200, amplitude in 0.5f64..5.0) {
            let (x, y) = sine(1000, 1e-3, bin as f64, amplitude);
            for window in WindowFunction::all() {
                let options = FtOptions::default().window(window.name());
                let spectrum = Spectrum::compute(&x, &y, &options);
                let (peak, _) = spectrum.peak().unwrap();
                prop_assert!(
                    (peak - bin as f64).abs() <= spectrum.bin_width() + 1e-9,
                    "window {} peak {} expected {}", window, peak, bin
                );
            }
        }
    }
}
