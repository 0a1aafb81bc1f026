//! Human-readable fit summaries
//!
//! Every fit ends with a [`FitReport`]: an ordered list of labelled values
//! with errors and units, derived from the best-fit parameters. Period and
//! contrast are computed here, phases are converted to degrees.

use super::params::{Parameter, Parameters};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis units of a data set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub x: String,
    pub y: String,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            x: "arb. unit".to_string(),
            y: "arb. unit".to_string(),
        }
    }
}

impl Units {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// `Hz` for data over seconds, otherwise the inverse x-unit
    pub fn frequency_unit(&self) -> String {
        if self.x == "s" {
            "Hz".to_string()
        } else {
            format!("1/{}", self.x)
        }
    }
}

/// One labelled line of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub label: String,
    pub value: f64,
    /// Absent when the solver could not estimate an error
    pub error: Option<f64>,
    pub unit: String,
}

/// Ordered summary of a fit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    entries: Vec<ReportEntry>,
}

impl FitReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: f64, error: Option<f64>, unit: &str) {
        self.entries.push(ReportEntry {
            label: label.into(),
            value,
            error,
            unit: unit.to_string(),
        });
    }

    pub fn get(&self, label: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|e| e.label.len())
            .max()
            .unwrap_or(0);
        for entry in &self.entries {
            write!(f, "{:<width$}  {:>14.6e}", entry.label, entry.value)?;
            match entry.error {
                Some(err) => write!(f, " ± {:<12.4e}", err)?,
                None => write!(f, " ± {:<12}", "n/a")?,
            }
            writeln!(f, " {}", entry.unit)?;
        }
        Ok(())
    }
}

/// Period and its error from a frequency parameter
///
/// A zero frequency reports period 0 with infinite error. A missing or zero
/// standard error reports a zero period error.
pub fn period(frequency: &Parameter) -> (f64, f64) {
    let f = frequency.value();
    if f == 0.0 {
        return (0.0, f64::INFINITY);
    }
    let error = match frequency.stderr() {
        Some(stderr) if stderr != 0.0 => stderr / (f * f),
        _ => 0.0,
    };
    (1.0 / f, error)
}

/// Contrast `2A/(O+A)` in percent and its propagated error
///
/// The error is only available when both standard errors are.
pub fn contrast(amplitude: &Parameter, offset: &Parameter) -> (f64, Option<f64>) {
    let a = amplitude.value();
    let o = offset.value();
    let sum = o + a;
    let value = 2.0 * a / sum * 100.0;

    let error = match (amplitude.stderr(), offset.stderr()) {
        (Some(sigma_a), Some(sigma_o)) => {
            let d_offset = 2.0 * a / (sum * sum) * sigma_o;
            let d_amplitude = (2.0 / sum + 2.0 * a / (sum * sum)) * sigma_a;
            Some((d_offset.abs() + d_amplitude.abs()) * 100.0)
        }
        _ => None,
    };
    (value, error)
}

/// Label for the k-th component, plain when there is only one
fn numbered(label: &str, k: usize, count: usize) -> String {
    if count == 1 {
        label.to_string()
    } else {
        format!("{label} {k}")
    }
}

/// Accumulates report entries from a parameter set
struct ReportBuilder<'a> {
    params: &'a Parameters,
    units: &'a Units,
    report: FitReport,
}

impl<'a> ReportBuilder<'a> {
    fn new(params: &'a Parameters, units: &'a Units) -> Self {
        Self {
            params,
            units,
            report: FitReport::new(),
        }
    }

    fn period(&mut self, label: String, frequency: &str) -> Result<&mut Self> {
        let (value, error) = period(self.params.param(frequency)?);
        self.report.push(label, value, Some(error), &self.units.x);
        Ok(self)
    }

    fn frequency(&mut self, label: String, name: &str) -> Result<&mut Self> {
        let p = self.params.param(name)?;
        let unit = self.units.frequency_unit();
        self.report.push(label, p.value(), p.stderr(), &unit);
        Ok(self)
    }

    fn phase(&mut self, label: String, name: &str) -> Result<&mut Self> {
        let p = self.params.param(name)?;
        self.report.push(
            label,
            p.value().to_degrees(),
            p.stderr().map(f64::to_degrees),
            "deg",
        );
        Ok(self)
    }

    fn y_value(&mut self, label: String, name: &str) -> Result<&mut Self> {
        let p = self.params.param(name)?;
        self.report.push(label, p.value(), p.stderr(), &self.units.y);
        Ok(self)
    }

    fn x_value(&mut self, label: String, name: &str) -> Result<&mut Self> {
        let p = self.params.param(name)?;
        self.report.push(label, p.value(), p.stderr(), &self.units.x);
        Ok(self)
    }

    fn unitless(&mut self, label: String, name: &str) -> Result<&mut Self> {
        let p = self.params.param(name)?;
        self.report.push(label, p.value(), p.stderr(), "");
        Ok(self)
    }

    fn contrast(&mut self, label: String, amplitude: &str, offset: &str) -> Result<&mut Self> {
        let (value, error) = contrast(self.params.param(amplitude)?, self.params.param(offset)?);
        self.report.push(label, value, error, "%");
        Ok(self)
    }

    fn finish(self) -> FitReport {
        self.report
    }
}

/// Summary of `sine`
pub fn sine_report(params: &Parameters, units: &Units) -> Result<FitReport> {
    let mut b = ReportBuilder::new(params, units);
    b.period("Period".into(), "frequency")?
        .frequency("Frequency".into(), "frequency")?
        .phase("Phase".into(), "phase")?
        .y_value("Offset".into(), "offset")?
        .y_value("Amplitude".into(), "amplitude")?
        .contrast("Contrast".into(), "amplitude", "offset")?;
    Ok(b.finish())
}

fn decaying_sine(b: &mut ReportBuilder<'_>) -> Result<()> {
    b.period("Period".into(), "frequency")?
        .frequency("Frequency".into(), "frequency")?
        .y_value("Amplitude".into(), "amplitude")?
        .contrast("Contrast".into(), "amplitude", "offset")?
        .phase("Phase".into(), "phase")?
        .y_value("Offset".into(), "offset")?
        .x_value("Lifetime".into(), "lifetime")?;
    Ok(())
}

/// Summary of `sineexponentialdecay`
pub fn sineexponentialdecay_report(params: &Parameters, units: &Units) -> Result<FitReport> {
    let mut b = ReportBuilder::new(params, units);
    decaying_sine(&mut b)?;
    Ok(b.finish())
}

/// Summary of `sinestretchedexponentialdecay`
pub fn sinestretchedexponentialdecay_report(
    params: &Parameters,
    units: &Units,
) -> Result<FitReport> {
    let mut b = ReportBuilder::new(params, units);
    decaying_sine(&mut b)?;
    b.unitless("Beta".into(), "beta")?;
    Ok(b.finish())
}

/// Per-component block shared by every multi-sine summary: periods,
/// frequencies, amplitudes, contrasts then phases, each numbered.
fn components(b: &mut ReportBuilder<'_>, tag: &str, count: usize) -> Result<()> {
    let name = |k: usize, base: &str| format!("{tag}{k}_{base}");
    for k in 1..=count {
        b.period(numbered("Period", k, count), &name(k, "frequency"))?;
    }
    for k in 1..=count {
        b.frequency(numbered("Frequency", k, count), &name(k, "frequency"))?;
    }
    for k in 1..=count {
        b.y_value(numbered("Amplitude", k, count), &name(k, "amplitude"))?;
    }
    for k in 1..=count {
        b.contrast(numbered("Contrast", k, count), &name(k, "amplitude"), "offset")?;
    }
    for k in 1..=count {
        b.phase(numbered("Phase", k, count), &name(k, "phase"))?;
    }
    Ok(())
}

/// Summary of `sinedouble` and `sinetriple`
pub fn multi_sine_report(params: &Parameters, units: &Units, count: usize) -> Result<FitReport> {
    let mut b = ReportBuilder::new(params, units);
    components(&mut b, "s", count)?;
    b.y_value("Offset".into(), "offset")?;
    Ok(b.finish())
}

/// Summary of `sinedoublewithexpdecay` and `sinetriplewithexpdecay`
pub fn multi_sine_shared_decay_report(
    params: &Parameters,
    units: &Units,
    count: usize,
) -> Result<FitReport> {
    let mut b = ReportBuilder::new(params, units);
    components(&mut b, "s", count)?;
    // The double variant lists the offset first.
    if count == 2 {
        b.y_value("Offset".into(), "offset")?
            .x_value("Lifetime".into(), "lifetime")?;
    } else {
        b.x_value("Lifetime".into(), "lifetime")?
            .y_value("Offset".into(), "offset")?;
    }
    Ok(b.finish())
}

/// Summary of `sinedoublewithtwoexpdecay` and `sinetriplewiththreeexpdecay`
pub fn multi_sine_own_decay_report(
    params: &Parameters,
    units: &Units,
    count: usize,
) -> Result<FitReport> {
    let mut b = ReportBuilder::new(params, units);
    components(&mut b, "e", count)?;
    for k in 1..=count {
        b.x_value(numbered("Lifetime", k, count), &format!("e{k}_lifetime"))?;
    }
    b.y_value("Offset".into(), "offset")?;
    Ok(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn with_stderr(name: &str, value: f64, stderr: Option<f64>) -> Parameter {
        let mut p = Parameter::new(name, value);
        p.set_stderr(stderr);
        p
    }

    #[test]
    fn test_frequency_unit() {
        assert_eq!(Units::new("s", "V").frequency_unit(), "Hz");
        assert_eq!(Units::new("ns", "V").frequency_unit(), "1/ns");
        assert_eq!(Units::default().frequency_unit(), "1/arb. unit");
    }

    #[test]
    fn test_period() {
        let (value, error) = period(&with_stderr("frequency", 4.0, Some(0.2)));
        assert_relative_eq!(value, 0.25);
        assert_relative_eq!(error, 0.2 / 16.0);

        assert_eq!(period(&with_stderr("frequency", 4.0, None)).1, 0.0);
        assert_eq!(period(&with_stderr("frequency", 4.0, Some(0.0))).1, 0.0);
    }

    #[test]
    fn test_period_of_zero_frequency() {
        let (value, error) = period(&with_stderr("frequency", 0.0, Some(0.1)));
        assert_eq!(value, 0.0);
        assert!(error.is_infinite());
    }

    #[test]
    fn test_contrast_formula() {
        let (a, o, sa, so) = (2.0, 10.0, 0.05, 0.01);
        let (value, error) = contrast(
            &with_stderr("amplitude", a, Some(sa)),
            &with_stderr("offset", o, Some(so)),
        );
        let expected_error = ((2.0 * a / (o + a).powi(2) * so).abs()
            + ((2.0 / (o + a) + 2.0 * a / (o + a).powi(2)) * sa).abs())
            * 100.0;
        assert_relative_eq!(value, 2.0 * a / (o + a) * 100.0);
        assert_relative_eq!(error.unwrap(), expected_error);
    }

    #[test]
    fn test_contrast_without_errors() {
        let (_, error) = contrast(
            &with_stderr("amplitude", 1.0, Some(0.1)),
            &with_stderr("offset", 1.0, None),
        );
        assert!(error.is_none());
    }

    #[test]
    fn test_sine_report_layout() {
        let params: Parameters = [
            with_stderr("amplitude", 2.0, Some(0.1)),
            with_stderr("frequency", 5.0, Some(0.01)),
            with_stderr("phase", std::f64::consts::FRAC_PI_2, Some(0.02)),
            with_stderr("offset", 10.0, Some(0.05)),
        ]
        .into_iter()
        .collect();

        let report = sine_report(&params, &Units::new("s", "counts")).unwrap();
        assert_eq!(
            report.labels(),
            vec!["Period", "Frequency", "Phase", "Offset", "Amplitude", "Contrast"]
        );
        assert_relative_eq!(report.get("Phase").unwrap().value, 90.0);
        assert_eq!(report.get("Frequency").unwrap().unit, "Hz");
        assert_eq!(report.get("Period").unwrap().unit, "s");
        assert_eq!(report.get("Contrast").unwrap().unit, "%");
    }

    #[test]
    fn test_triple_report_numbering() {
        let mut params = Parameters::new();
        for k in 1..=3 {
            params.add(format!("s{k}_amplitude"), 1.0);
            params.add(format!("s{k}_frequency"), k as f64);
            params.add(format!("s{k}_phase"), 0.0);
        }
        params.add("offset", 3.0);
        params.add("lifetime", 2.0);

        let report = multi_sine_shared_decay_report(&params, &Units::default(), 3).unwrap();
        assert_eq!(report.len(), 17);
        assert_eq!(report.labels()[0], "Period 1");
        assert_eq!(report.labels()[15..], ["Lifetime", "Offset"]);
        assert_relative_eq!(report.get("Period 2").unwrap().value, 0.5);
    }

    #[test]
    fn test_report_missing_parameter() {
        let params = Parameters::new();
        assert!(sine_report(&params, &Units::default()).is_err());
    }

    #[test]
    fn test_display_lists_every_entry() {
        let mut report = FitReport::new();
        report.push("Frequency", 5.0, Some(0.1), "Hz");
        report.push("Phase", 30.0, None, "deg");
        let text = report.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("n/a"));
    }
}
