//! Pulsed-measurement signal extraction
//!
//! Each laser pulse is a histogram of photon counts over time bins. These
//! functions reduce every pulse to one signal value plus a counting error,
//! optionally referenced against a normalization window later in the pulse.

/// Default start of the signal window in seconds
pub const DEFAULT_SIGNAL_START: f64 = 100e-9;
/// Default end of the signal window in seconds
pub const DEFAULT_SIGNAL_END: f64 = 300e-9;
/// Default start of the normalization window in seconds
pub const DEFAULT_NORM_START: f64 = 1000e-9;
/// Default end of the normalization window in seconds
pub const DEFAULT_NORM_END: f64 = 2000e-9;
/// Default histogram bin width in seconds
pub const DEFAULT_BIN_WIDTH: f64 = 1e-9;

/// Time windows used to extract the signal from each laser pulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseWindows {
    pub signal_start: f64,
    pub signal_end: f64,
    pub norm_start: f64,
    pub norm_end: f64,
    pub bin_width: f64,
}

impl Default for PulseWindows {
    fn default() -> Self {
        Self {
            signal_start: DEFAULT_SIGNAL_START,
            signal_end: DEFAULT_SIGNAL_END,
            norm_start: DEFAULT_NORM_START,
            norm_end: DEFAULT_NORM_END,
            bin_width: DEFAULT_BIN_WIDTH,
        }
    }
}

impl PulseWindows {
    fn valid_bin_width(&self) -> bool {
        self.bin_width.is_finite() && self.bin_width > 0.0
    }

    fn to_bin(&self, time: f64) -> i64 {
        (time / self.bin_width).round_ties_even() as i64
    }

    fn signal_bins(&self) -> (i64, i64) {
        (self.to_bin(self.signal_start), self.to_bin(self.signal_end))
    }

    fn norm_bins(&self) -> (i64, i64) {
        (self.to_bin(self.norm_start), self.to_bin(self.norm_end))
    }
}

/// Slice with Python semantics: negative indices count from the end, out of
/// range indices clamp, and an inverted range is empty.
fn window(data: &[f64], start: i64, end: i64) -> &[f64] {
    let len = data.len() as i64;
    let resolve = |idx: i64| -> usize {
        let idx = if idx < 0 { idx + len } else { idx };
        idx.clamp(0, len) as usize
    };
    let (start, end) = (resolve(start), resolve(end));
    if start >= end {
        &[]
    } else {
        &data[start..end]
    }
}

fn sum_and_mean(data: &[f64]) -> (f64, f64) {
    let sum: f64 = data.iter().sum();
    let mean = if data.is_empty() {
        0.0
    } else {
        sum / data.len() as f64
    };
    (sum, mean)
}

/// Mean counts in the signal window of every pulse
///
/// Returns `(signal, error)` with the Poissonian error `sqrt(sum) / bins`.
/// Negative or NaN means are reported as zero signal with zero error.
pub fn analyse_mean(laser_data: &[Vec<f64>], windows: &PulseWindows) -> (Vec<f64>, Vec<f64>) {
    let num_lasers = laser_data.len();
    if !windows.valid_bin_width() {
        return (vec![0.0; num_lasers], vec![0.0; num_lasers]);
    }

    let (start, end) = windows.signal_bins();
    let mut signal_data = Vec::with_capacity(num_lasers);
    let mut error_data = Vec::with_capacity(num_lasers);

    for laser in laser_data {
        let slice = window(laser, start, end);
        let sum: f64 = slice.iter().sum();
        // Empty windows give NaN, like the mean of an empty array.
        let signal = sum / slice.len() as f64;
        let error = sum.sqrt() / (end - start) as f64;

        if signal < 0.0 || signal.is_nan() {
            signal_data.push(0.0);
            error_data.push(0.0);
        } else {
            signal_data.push(signal);
            error_data.push(error);
        }
    }

    (signal_data, error_data)
}

/// Signal window mean minus normalization window mean
///
/// The error follows Gaussian propagation of the two counting errors,
/// `signal * sqrt(1/|signal_sum| + 1/|reference_sum|)`.
pub fn analyse_mean_reference(
    laser_data: &[Vec<f64>],
    windows: &PulseWindows,
) -> (Vec<f64>, Vec<f64>) {
    let num_lasers = laser_data.len();
    if !windows.valid_bin_width() {
        return (vec![0.0; num_lasers], vec![0.0; num_lasers]);
    }

    let (signal_start, signal_end) = windows.signal_bins();
    let (norm_start, norm_end) = windows.norm_bins();

    laser_data
        .iter()
        .map(|laser| {
            let (reference_sum, reference_mean) =
                sum_and_mean(window(laser, norm_start, norm_end));
            let (signal_sum, signal_mean) = sum_and_mean(window(laser, signal_start, signal_end));

            let signal = signal_mean - reference_mean;
            let error = signal * (1.0 / signal_sum.abs() + 1.0 / reference_sum.abs()).sqrt();
            (signal, error)
        })
        .unzip()
}

/// Signal window mean divided by normalization window mean
///
/// Non-positive references or negative signals give zero signal, and the
/// error is only computed when both sums are positive.
pub fn analyse_mean_norm(laser_data: &[Vec<f64>], windows: &PulseWindows) -> (Vec<f64>, Vec<f64>) {
    let num_lasers = laser_data.len();
    if !windows.valid_bin_width() {
        return (vec![0.0; num_lasers], vec![0.0; num_lasers]);
    }

    let (signal_start, signal_end) = windows.signal_bins();
    let (norm_start, norm_end) = windows.norm_bins();

    laser_data
        .iter()
        .map(|laser| {
            let (reference_sum, reference_mean) =
                sum_and_mean(window(laser, norm_start, norm_end));
            let (signal_sum, signal_mean) = sum_and_mean(window(laser, signal_start, signal_end));

            let signal = if reference_mean > 0.0 && signal_mean >= 0.0 {
                signal_mean / reference_mean
            } else {
                0.0
            };

            let error = if reference_sum > 0.0 && signal_sum > 0.0 {
                signal * (1.0 / signal_sum + 1.0 / reference_sum).sqrt()
            } else {
                0.0
            };

            (signal, error)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn windows() -> PulseWindows {
        PulseWindows {
            signal_start: 2.0,
            signal_end: 6.0,
            norm_start: 10.0,
            norm_end: 20.0,
            bin_width: 1.0,
        }
    }

    fn pulse(signal_level: f64, reference_level: f64) -> Vec<f64> {
        (0..30)
            .map(|i| match i {
                2..=5 => signal_level,
                10..=19 => reference_level,
                _ => 0.0,
            })
            .collect()
    }

    #[test]
    fn test_analyse_mean() {
        let data = vec![pulse(4.0, 1.0), pulse(9.0, 1.0)];
        let (signal, error) = analyse_mean(&data, &windows());
        assert_eq!(signal, vec![4.0, 9.0]);
        assert_relative_eq!(error[0], 16f64.sqrt() / 4.0);
        assert_relative_eq!(error[1], 36f64.sqrt() / 4.0);
    }

    #[test]
    fn test_analyse_mean_negative_is_zeroed() {
        let data = vec![pulse(-3.0, 1.0)];
        let (signal, error) = analyse_mean(&data, &windows());
        assert_eq!(signal, vec![0.0]);
        assert_eq!(error, vec![0.0]);
    }

    #[test]
    fn test_analyse_mean_empty_window_is_zeroed() {
        let data = vec![vec![1.0; 4]];
        let mut w = windows();
        w.signal_start = 10.0;
        w.signal_end = 20.0;
        let (signal, error) = analyse_mean(&data, &w);
        assert_eq!(signal, vec![0.0]);
        assert_eq!(error, vec![0.0]);
    }

    #[test]
    fn test_analyse_mean_reference() {
        let data = vec![pulse(5.0, 2.0)];
        let (signal, error) = analyse_mean_reference(&data, &windows());
        assert_relative_eq!(signal[0], 3.0);
        assert_relative_eq!(error[0], 3.0 * (1.0 / 20.0 + 1.0 / 20.0f64).sqrt());
    }

    #[test]
    fn test_analyse_mean_norm() {
        let data = vec![pulse(6.0, 2.0), pulse(6.0, 0.0)];
        let (signal, error) = analyse_mean_norm(&data, &windows());
        assert_relative_eq!(signal[0], 3.0);
        assert_relative_eq!(error[0], 3.0 * (1.0 / 24.0 + 1.0 / 20.0f64).sqrt());
        assert_eq!(signal[1], 0.0);
        assert_eq!(error[1], 0.0);
    }

    #[test]
    fn test_invalid_bin_width_gives_zeros() {
        let data = vec![pulse(6.0, 2.0); 3];
        let mut w = windows();
        w.bin_width = 0.0;
        assert_eq!(analyse_mean(&data, &w), (vec![0.0; 3], vec![0.0; 3]));
        assert_eq!(analyse_mean_norm(&data, &w), (vec![0.0; 3], vec![0.0; 3]));
        assert_eq!(analyse_mean_reference(&data, &w), (vec![0.0; 3], vec![0.0; 3]));
    }

    #[test]
    fn test_python_slice_semantics() {
        let data = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(window(&data, 1, 10), &[1.0, 2.0, 3.0]);
        assert_eq!(window(&data, -2, 4), &[2.0, 3.0]);
        assert!(window(&data, 3, 1).is_empty());
    }

    #[test]
    fn test_default_windows_in_bins() {
        let w = PulseWindows::default();
        assert_eq!(w.signal_bins(), (100, 300));
        assert_eq!(w.norm_bins(), (1000, 2000));
    }
}
