//! Initial-value estimators for the sine family
//!
//! Frequencies come from the peak of a zero-padded spectrum. Phases come
//! from a brute-force scan: trial sines at evenly spaced phases are compared
//! against the data, the worst-matching phase is taken and rotated by π.
//! Multi-component estimators fit one sine at a time and subtract it.
//!
//! An estimator either fills in values and bounds and returns `Ok(())`, or
//! returns [`AnalysisError::DegenerateInput`] and leaves the parameter set as
//! it was.

use super::logic::{FitLogic, FitResult};
use super::params::Parameters;
use crate::analysis::fft::{argmax, compute_ft, FtOptions};
use crate::error::{AnalysisError, Result, ResultExt};
use std::f64::consts::PI;

/// Signature shared by every estimator
pub type Estimator = fn(&FitLogic, &[f64], &[f64], &mut Parameters) -> Result<()>;

/// Differences within this distance of zero count as duplicate x-values
const DUPLICATE_ATOL: f64 = 1e-12;

/// Upper limit on trial phases, reached only for near-duplicate x-values
const MAX_PHASE_STEPS: usize = 1 << 20;

/// Integer status of an estimate: 0 for success, -1 for a failed estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateStatus {
    Ok = 0,
    Failed = -1,
}

impl EstimateStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&Result<()>> for EstimateStatus {
    fn from(result: &Result<()>) -> Self {
        match result {
            Ok(()) => EstimateStatus::Ok,
            Err(_) => EstimateStatus::Failed,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// `max(|min(y)|, |max(y)|)`
fn amplitude_estimate(y: &[f64]) -> f64 {
    let min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    min.abs().max(max.abs())
}

fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some(b) if values[b] <= *v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Smallest consecutive x difference that is not a duplicate
///
/// While the smallest difference is within 1e-12 of zero it is dropped and
/// the next smallest taken. `None` when every difference was dropped.
pub(crate) fn min_x_spacing(x: &[f64]) -> Option<f64> {
    let mut diffs: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    while let Some(idx) = argmin(&diffs) {
        if diffs[idx].abs() > DUPLICATE_ATOL {
            return Some(diffs[idx]);
        }
        diffs.remove(idx);
    }
    None
}

/// Number of trial phases for a frequency sampled at the given spacing
fn phase_steps(frequency: f64, min_x_diff: f64) -> usize {
    let raw = 1.0 / (frequency * min_x_diff);
    if raw.is_finite() && raw >= 1.0 {
        (raw as usize).min(MAX_PHASE_STEPS)
    } else {
        1
    }
}

/// Brute-force phase estimate in `[-π, π)`
///
/// Scans `amplitude·sin(2π·f·x + 2π·s/steps)` and takes the step with the
/// largest absolute deviation from the data, shifted by π.
pub(crate) fn phase_scan(
    x: &[f64],
    y: &[f64],
    frequency: f64,
    amplitude: f64,
    min_x_diff: f64,
) -> f64 {
    let steps = phase_steps(frequency, min_x_diff);
    let deviations: Vec<f64> = (0..steps)
        .map(|s| {
            let shift = s as f64 / steps as f64 * 2.0 * PI;
            x.iter()
                .zip(y)
                .map(|(t, v)| (v - amplitude * (2.0 * PI * frequency * t + shift).sin()).abs())
                .sum()
        })
        .collect();
    let worst = argmax(&deviations).unwrap_or(0);
    worst as f64 / steps as f64 * 2.0 * PI - PI
}

/// Frequency of the strongest bin after a logarithmic filter
fn log_peak_frequency(frequencies: &[f64], magnitudes: &[f64]) -> Option<f64> {
    let logs: Vec<f64> = magnitudes.iter().map(|m| m.ln()).collect();
    argmax(&logs).map(|i| frequencies[i].abs())
}

fn set(
    params: &mut Parameters,
    name: &str,
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<()> {
    params.param_mut(name)?.set(value, min, max);
    Ok(())
}

/// Every name must be present before anything is written
fn require(params: &Parameters, names: &[&str]) -> Result<()> {
    names.iter().try_for_each(|n| params.param(n).map(|_| ()))
}

impl FitLogic {
    /// Reject inputs no estimator can work with
    pub(crate) fn check_1d_input(&self, x: &[f64], y: &[f64]) -> Result<()> {
        if x.len() != y.len() {
            let msg = format!(
                "x-axis and data have different lengths ({} and {})",
                x.len(),
                y.len()
            );
            self.log().error(&msg);
            return Err(AnalysisError::InvalidInput(msg));
        }
        if x.len() < 2 {
            let msg = format!("at least 2 data points are needed, got {}", x.len());
            self.log().error(&msg);
            return Err(AnalysisError::DegenerateInput(msg));
        }
        Ok(())
    }

    fn degenerate_x_axis(&self) -> AnalysisError {
        let msg = "The passed x_axis for the sinus estimation contains the same values! \
                   Cannot do the fit!";
        self.log().error(msg);
        AnalysisError::DegenerateInput(msg.to_string())
    }

    /// Frequency and phase of a unit-amplitude sine
    pub fn estimate_baresine(&self, x: &[f64], y: &[f64], params: &mut Parameters) -> Result<()> {
        self.check_1d_input(x, y)?;
        require(params, &["frequency", "phase"])?;

        let (freq, mag) = compute_ft(x, y, &FtOptions::with_zeropad(1));
        let stepsize = x[1] - x[0];
        let frequency = log_peak_frequency(&freq, &mag)
            .ok_or_else(|| AnalysisError::DegenerateInput("empty spectrum".to_string()))?;
        let min_x_diff = min_x_spacing(x).ok_or_else(|| self.degenerate_x_axis())?;

        let phase = phase_scan(x, y, frequency, 1.0, min_x_diff);
        tracing::debug!(frequency, phase, "baresine estimate");

        set(params, "frequency", frequency, Some(0.0), Some(3.0 / stepsize))?;
        set(params, "phase", phase, Some(-PI), Some(PI))
    }

    /// Amplitude, frequency and phase of a sine around zero
    pub fn estimate_sinewithoutoffset(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        self.check_1d_input(x, y)?;
        require(params, &["amplitude", "frequency", "phase"])?;

        let mut order: Vec<usize> = (0..x.len()).collect();
        order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
        let x: Vec<f64> = order.iter().map(|&i| x[i]).collect();
        let y: Vec<f64> = order.iter().map(|&i| y[i]).collect();

        let amplitude = amplitude_estimate(&y);
        let (freq, mag) = compute_ft(&x, &y, &FtOptions::with_zeropad(1));
        let stepsize = x[1] - x[0];

        // ln needs strictly positive magnitudes
        let (freq_red, mag_red): (Vec<f64>, Vec<f64>) = freq
            .iter()
            .zip(&mag)
            .filter(|(_, m)| **m > 0.0)
            .map(|(f, m)| (*f, *m))
            .unzip();
        let Some(frequency) = log_peak_frequency(&freq_red, &mag_red) else {
            let msg = "The spectrum of the passed data is zero everywhere. Cannot do the fit!";
            self.log().error(msg);
            return Err(AnalysisError::DegenerateInput(msg.to_string()));
        };

        let min_x_diff = min_x_spacing(&x).ok_or_else(|| self.degenerate_x_axis())?;
        let phase = phase_scan(&x, &y, frequency, amplitude, min_x_diff);
        tracing::debug!(amplitude, frequency, phase, "sine estimate");

        set(params, "amplitude", amplitude, None, None)?;
        set(params, "frequency", frequency, Some(0.0), Some(3.0 / stepsize))?;
        set(params, "phase", phase, Some(-PI), Some(PI))
    }

    /// Sine estimate on mean-levelled data, offset from the mean
    pub fn estimate_sine(&self, x: &[f64], y: &[f64], params: &mut Parameters) -> Result<()> {
        self.check_1d_input(x, y)?;
        require(params, &["offset"])?;

        let offset = mean(y);
        let levelled: Vec<f64> = y.iter().map(|v| v - offset).collect();
        self.estimate_sinewithoutoffset(x, &levelled, params)?;
        set(params, "offset", offset, None, None)
    }

    /// Sine with exponential decay: lifetime from the width of the spectral
    /// peak, phase wrapped into `[0, 2π)`
    pub fn estimate_sineexponentialdecay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        self.check_1d_input(x, y)?;
        require(params, &["amplitude", "frequency", "phase", "offset", "lifetime"])?;

        let offset = mean(y);
        let levelled: Vec<f64> = y.iter().map(|v| v - offset).collect();
        let amplitude = amplitude_estimate(&levelled);

        let (freq, mut mag) = compute_ft(x, &levelled, &FtOptions::with_zeropad(1));
        if freq.len() < 4 {
            let msg = format!(
                "{} data points are too few to estimate a decaying sine",
                x.len()
            );
            self.log().error(&msg);
            return Err(AnalysisError::DegenerateInput(msg));
        }
        let stepsize = x[1] - x[0];
        let frequency = argmax(&mag)
            .map(|i| freq[i].abs())
            .ok_or_else(|| AnalysisError::DegenerateInput("empty spectrum".to_string()))?;

        // Keep only bins above the noise floor and measure the peak width.
        let noise = std_dev(&mag);
        mag.iter_mut().filter(|m| **m <= noise).for_each(|m| *m = 0.0);
        let peak = mag.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bin = (freq[1] - freq[0]).abs();
        let width: f64 = mag.iter().map(|m| m * bin / peak).sum();
        let lifetime = 0.5 / width;

        let min_x_diff = min_x_spacing(x).ok_or_else(|| self.degenerate_x_axis())?;
        let phase = phase_scan(x, &levelled, frequency, amplitude, min_x_diff).rem_euclid(2.0 * PI);
        tracing::debug!(amplitude, frequency, phase, lifetime, "decaying sine estimate");

        let freq_top = freq.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let freq_min = (0.1 / (x[x.len() - 1] - x[0])).min(freq[3]);
        let freq_max = (0.5 / stepsize).min(freq_top - (freq[2] - freq[0]).abs());

        set(params, "frequency", frequency, Some(freq_min), Some(freq_max))?;
        set(params, "phase", phase, Some(-2.0 * PI), Some(2.0 * PI))?;
        set(params, "amplitude", amplitude, Some(0.0), None)?;
        set(params, "offset", offset, None, None)?;
        set(
            params,
            "lifetime",
            lifetime,
            Some(2.0 * stepsize),
            Some(1.0 / (bin * 0.5)),
        )
    }

    /// Decaying sine estimate with the stretch exponent starting at 2
    pub fn estimate_sinestretchedexponentialdecay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        require(params, &["beta"])?;
        self.estimate_sineexponentialdecay(x, y, params)?;
        set(params, "beta", 2.0, Some(0.0), Some(10.0))
    }

    /// Fit one component at a time, subtracting each best fit before the
    /// next stage
    fn staged_fits(
        &self,
        y: &[f64],
        stages: usize,
        fit: impl Fn(&[f64]) -> Result<FitResult>,
    ) -> Result<Vec<FitResult>> {
        let mut remaining = y.to_vec();
        let mut results = Vec::with_capacity(stages);
        for stage in 1..=stages {
            let result =
                fit(&remaining).with_context(|| format!("fitting component {stage} of {stages}"))?;
            remaining
                .iter_mut()
                .zip(&result.best_fit)
                .for_each(|(r, b)| *r -= b);
            results.push(result);
        }
        Ok(results)
    }

    fn sine_stages(&self, x: &[f64], y: &[f64], stages: usize) -> Result<Vec<FitResult>> {
        self.staged_fits(y, stages, |data| {
            self.make_sine_fit(x, data, FitLogic::estimate_sine, None, None)
        })
    }

    fn decaying_sine_stages(&self, x: &[f64], y: &[f64], stages: usize) -> Result<Vec<FitResult>> {
        self.staged_fits(y, stages, |data| {
            self.make_sineexponentialdecay_fit(
                x,
                data,
                FitLogic::estimate_sineexponentialdecay,
                None,
                None,
            )
        })
    }

    /// Copy amplitude, frequency and phase of every stage into `{tag}{k}_*`
    fn seed_components(params: &mut Parameters, tag: &str, stages: &[FitResult]) -> Result<()> {
        for (k, stage) in stages.iter().enumerate() {
            for base in ["amplitude", "frequency", "phase"] {
                let value = stage.params.value(base)?;
                params
                    .param_mut(&format!("{tag}{}_{base}", k + 1))?
                    .set_value(value);
            }
        }
        Ok(())
    }

    fn component_names(tag: &str, count: usize, with_lifetime: bool) -> Vec<String> {
        let mut bases = vec!["amplitude", "frequency", "phase"];
        if with_lifetime {
            bases.push("lifetime");
        }
        (1..=count)
            .flat_map(|k| bases.iter().map(move |b| format!("{tag}{k}_{b}")))
            .collect()
    }

    fn estimate_multi_sine(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
        count: usize,
    ) -> Result<()> {
        self.check_1d_input(x, y)?;
        let mut names = Self::component_names("s", count, false);
        names.push("offset".to_string());
        require(params, &names.iter().map(String::as_str).collect::<Vec<_>>())?;

        let stages = self.sine_stages(x, y, count)?;
        Self::seed_components(params, "s", &stages)?;
        set(params, "offset", mean(y), None, None)
    }

    fn estimate_multi_sine_shared_decay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
        count: usize,
    ) -> Result<()> {
        self.check_1d_input(x, y)?;
        let mut names = Self::component_names("s", count, false);
        names.extend(["offset".to_string(), "lifetime".to_string()]);
        require(params, &names.iter().map(String::as_str).collect::<Vec<_>>())?;

        let stages = self.decaying_sine_stages(x, y, count)?;
        Self::seed_components(params, "s", &stages)?;

        let lifetimes = stages
            .iter()
            .map(|s| s.params.value("lifetime"))
            .collect::<Result<Vec<f64>>>()?;
        let stepsize = x[1] - x[0];
        set(params, "offset", mean(y), None, None)?;
        set(params, "lifetime", mean(&lifetimes), Some(2.0 * stepsize), None)
    }

    fn estimate_multi_sine_own_decay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
        count: usize,
    ) -> Result<()> {
        self.check_1d_input(x, y)?;
        let mut names = Self::component_names("e", count, true);
        names.push("offset".to_string());
        require(params, &names.iter().map(String::as_str).collect::<Vec<_>>())?;

        let stages = self.decaying_sine_stages(x, y, count)?;
        Self::seed_components(params, "e", &stages)?;

        let stepsize = x[1] - x[0];
        for (k, stage) in stages.iter().enumerate() {
            let lifetime = stage.params.value("lifetime")?;
            set(
                params,
                &format!("e{}_lifetime", k + 1),
                lifetime,
                Some(2.0 * stepsize),
                None,
            )?;
        }
        set(params, "offset", mean(y), None, None)
    }

    /// Two sines, found by fit-and-subtract
    pub fn estimate_sinedouble(&self, x: &[f64], y: &[f64], params: &mut Parameters) -> Result<()> {
        self.estimate_multi_sine(x, y, params, 2)
    }

    /// Two sines under one decay; the lifetime is the mean of both stages
    pub fn estimate_sinedoublewithexpdecay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        self.estimate_multi_sine_shared_decay(x, y, params, 2)
    }

    /// Two sines, each keeping the lifetime of its own stage
    pub fn estimate_sinedoublewithtwoexpdecay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        self.estimate_multi_sine_own_decay(x, y, params, 2)
    }

    /// Three sines, found by fit-and-subtract
    pub fn estimate_sinetriple(&self, x: &[f64], y: &[f64], params: &mut Parameters) -> Result<()> {
        self.estimate_multi_sine(x, y, params, 3)
    }

    /// Three sines under one decay; the lifetime is the mean of all stages
    pub fn estimate_sinetriplewithexpdecay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        self.estimate_multi_sine_shared_decay(x, y, params, 3)
    }

    /// Three sines, each keeping the lifetime of its own stage
    pub fn estimate_sinetriplewiththreeexpdecay(
        &self,
        x: &[f64],
        y: &[f64],
        params: &mut Parameters,
    ) -> Result<()> {
        self.estimate_multi_sine_own_decay(x, y, params, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::log::MockFitLog;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect()
    }

    fn sine(x: &[f64], amplitude: f64, frequency: f64, phase: f64, offset: f64) -> Vec<f64> {
        x.iter()
            .map(|t| amplitude * (2.0 * PI * frequency * t + phase).sin() + offset)
            .collect()
    }

    #[test]
    fn test_min_x_spacing_skips_duplicates() {
        assert_eq!(min_x_spacing(&[0.0, 0.0, 0.5, 0.7, 0.7, 1.0]), Some(0.19999999999999996));
        assert_relative_eq!(min_x_spacing(&[0.0, 1.0, 3.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_min_x_spacing_all_equal() {
        assert_eq!(min_x_spacing(&[1.0; 10]), None);
        assert_eq!(min_x_spacing(&[1.0]), None);
    }

    #[test]
    fn test_phase_steps() {
        assert_eq!(phase_steps(4.0, 0.125), 2);
        assert_eq!(phase_steps(1.0, 0.3), 3);
        assert_eq!(phase_steps(0.0, 0.002), 1);
        assert_eq!(phase_steps(1e3, 1.0), 1);
        assert_eq!(phase_steps(f64::NAN, 1.0), 1);
        assert_eq!(phase_steps(1e-30, 1e-12), MAX_PHASE_STEPS);
    }

    #[test]
    fn test_estimate_status_codes() {
        assert_eq!(EstimateStatus::from(&Ok(())).code(), 0);
        let failed: Result<()> = Err(AnalysisError::DegenerateInput("x".into()));
        assert_eq!(EstimateStatus::from(&failed).code(), -1);
    }

    #[test]
    fn test_estimate_sine_values() {
        let logic = FitLogic::new();
        let x = linspace(0.0, 2.0, 1000);
        let y = sine(&x, 2.0, 5.0, 0.3, 10.0);
        let (_, mut params) = logic.make_sine_model(None);

        logic.estimate_sine(&x, &y, &mut params).unwrap();

        assert_relative_eq!(params.value("offset").unwrap(), 10.0, epsilon = 0.05);
        assert_relative_eq!(params.value("frequency").unwrap(), 5.0, epsilon = 0.3);
        assert_relative_eq!(params.value("amplitude").unwrap(), 2.0, epsilon = 0.1);
        let phase = params.get("phase").unwrap();
        assert!((-PI..PI).contains(&phase.value()));
        assert_eq!((phase.min(), phase.max()), (-PI, PI));
        assert_eq!(params.get("frequency").unwrap().min(), 0.0);
    }

    #[test]
    fn test_estimate_sinewithoutoffset_sorts_input() {
        let logic = FitLogic::new();
        let x = linspace(0.0, 1.0, 200);
        let y = sine(&x, 1.5, 4.0, 0.0, 0.0);
        let mut reversed: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        reversed.reverse();
        let (rx, ry): (Vec<f64>, Vec<f64>) = reversed.into_iter().unzip();

        let (_, mut sorted_params) = logic.make_sinewithoutoffset_model(None);
        let (_, mut reversed_params) = logic.make_sinewithoutoffset_model(None);
        logic.estimate_sinewithoutoffset(&x, &y, &mut sorted_params).unwrap();
        logic.estimate_sinewithoutoffset(&rx, &ry, &mut reversed_params).unwrap();

        assert_eq!(sorted_params, reversed_params);
    }

    #[test]
    fn test_degenerate_x_axis_is_rejected() {
        let mut log = MockFitLog::new();
        log.expect_error()
            .withf(|msg| msg.contains("same values"))
            .times(1)
            .return_const(());
        let logic = FitLogic::new().with_log(Arc::new(log));

        let x = vec![1.0; 50];
        let y: Vec<f64> = (0..50).map(|i| (i as f64 * 0.37).sin()).collect();
        let (_, mut params) = logic.make_sine_model(None);
        let before = params.clone();

        let err = logic.estimate_sine(&x, &y, &mut params).unwrap_err();
        assert!(err.is_degenerate());
        assert_eq!(EstimateStatus::from(&Err(err)).code(), -1);
        assert_eq!(params, before);
    }

    #[test]
    fn test_mismatched_lengths() {
        let logic = FitLogic::new();
        let (_, mut params) = logic.make_sine_model(None);
        let err = logic
            .estimate_sine(&[0.0, 1.0, 2.0], &[0.0, 1.0], &mut params)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn test_baresine_bounds() {
        let logic = FitLogic::new();
        let x = linspace(0.0, 1.0, 101);
        let y = sine(&x, 1.0, 3.0, -1.0, 0.0);
        let (_, mut params) = logic.make_baresine_model(None);

        logic.estimate_baresine(&x, &y, &mut params).unwrap();
        let frequency = params.get("frequency").unwrap();
        assert_relative_eq!(frequency.max(), 3.0 / 0.01, epsilon = 1e-9);
        assert_relative_eq!(frequency.value(), 3.0, epsilon = 0.5);
        let phase = params.get("phase").unwrap();
        assert!((-PI..PI).contains(&phase.value()));
        assert_eq!((phase.min(), phase.max()), (-PI, PI));
    }

    #[test]
    fn test_exponential_decay_estimate() {
        let logic = FitLogic::new();
        let x = linspace(0.0, 4.0, 800);
        let y: Vec<f64> = x
            .iter()
            .map(|t| 1.5 * (2.0 * PI * 3.0 * t + 1.0).sin() * (-t / 1.2).exp() + 0.5)
            .collect();
        let (_, mut params) = logic.make_sineexponentialdecay_model(None);

        logic.estimate_sineexponentialdecay(&x, &y, &mut params).unwrap();

        let phase = params.get("phase").unwrap();
        assert!((0.0..2.0 * PI).contains(&phase.value()));
        assert_eq!((phase.min(), phase.max()), (-2.0 * PI, 2.0 * PI));
        assert_eq!(params.get("amplitude").unwrap().min(), 0.0);
        let lifetime = params.get("lifetime").unwrap();
        assert!(lifetime.value().is_finite() && lifetime.value() > 0.0);
        assert_relative_eq!(lifetime.min(), 2.0 * (x[1] - x[0]));
        assert_relative_eq!(params.value("frequency").unwrap(), 3.0, epsilon = 0.3);
    }

    #[test]
    fn test_stretched_sets_beta() {
        let logic = FitLogic::new();
        let x = linspace(0.0, 4.0, 400);
        let y = sine(&x, 1.0, 2.0, 0.0, 0.0);
        let (_, mut params) = logic.make_sinestretchedexponentialdecay_model(None);

        logic
            .estimate_sinestretchedexponentialdecay(&x, &y, &mut params)
            .unwrap();
        let beta = params.get("beta").unwrap();
        assert_eq!((beta.value(), beta.min(), beta.max()), (2.0, 0.0, 10.0));
    }

    #[test]
    fn test_missing_parameter_leaves_set_untouched() {
        let logic = FitLogic::new();
        let x = linspace(0.0, 1.0, 50);
        let y = sine(&x, 1.0, 3.0, 0.0, 0.0);
        let (_, mut params) = logic.make_sinewithoutoffset_model(None);
        let before = params.clone();

        let err = logic.estimate_sine(&x, &y, &mut params).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingParameter(_)));
        assert_eq!(params, before);
    }

    proptest! {
        #[test]
        fn prop_phase_wraps(
            amplitude in 0.5f64..5.0,
            frequency in 0.5f64..20.0,
            phase in -PI..PI,
            offset in -10.0f64..10.0,
        ) {
            let logic = FitLogic::new();
            let x = linspace(0.0, 2.0, 256);
            let y = sine(&x, amplitude, frequency, phase, offset);

            let (_, mut params) = logic.make_baresine_model(None);
            let bare = sine(&x, 1.0, frequency, phase, 0.0);
            logic.estimate_baresine(&x, &bare, &mut params).unwrap();
            let estimated = params.value("phase").unwrap();
            prop_assert!((-PI..PI).contains(&estimated));

            let (_, mut params) = logic.make_sine_model(None);
            logic.estimate_sine(&x, &y, &mut params).unwrap();
            let estimated = params.value("phase").unwrap();
            prop_assert!((-PI..PI).contains(&estimated));

            let (_, mut params) = logic.make_sineexponentialdecay_model(None);
            logic.estimate_sineexponentialdecay(&x, &y, &mut params).unwrap();
            let estimated = params.value("phase").unwrap();
            prop_assert!((0.0..2.0 * PI).contains(&estimated));
        }
    }
}
