//! Fit orchestration
//!
//! [`FitLogic`] owns the solver and the log sink. Every `make_*_fit` runs the
//! same sequence: build the model, estimate, apply caller overrides, solve
//! (retrying once), summarize.

use super::estimators::Estimator;
use super::log::{FitLog, TracingLog};
use super::model::Model;
use super::params::Parameters;
use super::report::{self, FitReport, Units};
use super::solver::{LevenbergMarquardt, Solver, SolverOutput};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Outcome of one fit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub model: Model,
    pub success: bool,
    pub message: String,
    /// Parameters after estimation and overrides, before solving
    pub init_params: Parameters,
    /// Best-fit parameters with standard errors
    pub params: Parameters,
    /// Model evaluated at the input x
    pub best_fit: Vec<f64>,
    pub chisqr: f64,
    pub redchi: f64,
    pub nfev: usize,
    pub report: FitReport,
}

impl FitResult {
    /// Best-fit model evaluated at arbitrary x
    pub fn eval(&self, x: &[f64]) -> Result<Vec<f64>> {
        self.model.eval(x, &self.params)
    }

    /// Best-fit value of one parameter
    pub fn value(&self, name: &str) -> Result<f64> {
        self.params.value(name)
    }
}

/// The fits available by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitKind {
    Sine,
    SineExponentialDecay,
    SineStretchedExponentialDecay,
    SineDouble,
    SineDoubleWithExpDecay,
    SineDoubleWithTwoExpDecay,
    SineTriple,
    SineTripleWithExpDecay,
    SineTripleWithThreeExpDecay,
}

impl FitKind {
    /// Every fit in catalog order
    pub fn all() -> &'static [FitKind] {
        &[
            FitKind::Sine,
            FitKind::SineExponentialDecay,
            FitKind::SineStretchedExponentialDecay,
            FitKind::SineDouble,
            FitKind::SineDoubleWithExpDecay,
            FitKind::SineDoubleWithTwoExpDecay,
            FitKind::SineTriple,
            FitKind::SineTripleWithExpDecay,
            FitKind::SineTripleWithThreeExpDecay,
        ]
    }

    /// Model name, also used to look the fit up
    pub fn name(&self) -> &'static str {
        match self {
            FitKind::Sine => "sine",
            FitKind::SineExponentialDecay => "sineexponentialdecay",
            FitKind::SineStretchedExponentialDecay => "sinestretchedexponentialdecay",
            FitKind::SineDouble => "sinedouble",
            FitKind::SineDoubleWithExpDecay => "sinedoublewithexpdecay",
            FitKind::SineDoubleWithTwoExpDecay => "sinedoublewithtwoexpdecay",
            FitKind::SineTriple => "sinetriple",
            FitKind::SineTripleWithExpDecay => "sinetriplewithexpdecay",
            FitKind::SineTripleWithThreeExpDecay => "sinetriplewiththreeexpdecay",
        }
    }

    /// The estimator this fit uses by default
    pub fn estimator(&self) -> Estimator {
        match self {
            FitKind::Sine => FitLogic::estimate_sine,
            FitKind::SineExponentialDecay => FitLogic::estimate_sineexponentialdecay,
            FitKind::SineStretchedExponentialDecay => {
                FitLogic::estimate_sinestretchedexponentialdecay
            }
            FitKind::SineDouble => FitLogic::estimate_sinedouble,
            FitKind::SineDoubleWithExpDecay => FitLogic::estimate_sinedoublewithexpdecay,
            FitKind::SineDoubleWithTwoExpDecay => FitLogic::estimate_sinedoublewithtwoexpdecay,
            FitKind::SineTriple => FitLogic::estimate_sinetriple,
            FitKind::SineTripleWithExpDecay => FitLogic::estimate_sinetriplewithexpdecay,
            FitKind::SineTripleWithThreeExpDecay => {
                FitLogic::estimate_sinetriplewiththreeexpdecay
            }
        }
    }
}

impl fmt::Display for FitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        FitKind::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AnalysisError::UnknownFit(s.to_string()))
    }
}

/// Summarizes a parameter set into a report
type Summarize = fn(&Parameters, &Units) -> Result<FitReport>;

/// Sine-family fitting front end
pub struct FitLogic {
    solver: Box<dyn Solver>,
    log: Arc<dyn FitLog>,
    config: AnalysisConfig,
}

impl Default for FitLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FitLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitLogic")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FitLogic {
    /// Levenberg-Marquardt solver with default settings, logging to `tracing`
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            solver: Box::new(LevenbergMarquardt::new(config.solver.clone())),
            log: Arc::new(TracingLog),
            config,
        }
    }

    /// Replace the solver
    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the log sink
    pub fn with_log(mut self, log: Arc<dyn FitLog>) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub(crate) fn log(&self) -> &dyn FitLog {
        self.log.as_ref()
    }

    /// Solve once, and once more if the first attempt fails
    fn solve_with_retry(
        &self,
        model: &Model,
        x: &[f64],
        y: &[f64],
        params: &Parameters,
    ) -> Result<SolverOutput> {
        match self.solver.solve(model, x, y, params) {
            Ok(output) => Ok(output),
            Err(first) => {
                self.log.warn(&format!(
                    "The {} fit did not work. Error message: {}",
                    model.name(),
                    first
                ));
                self.solver.solve(model, x, y, params).map_err(|second| {
                    self.log.error(&format!(
                        "The {} fit did not work after a second attempt. Error message: {}",
                        model.name(),
                        second
                    ));
                    second
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_fit(
        &self,
        (model, mut params): (Model, Parameters),
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
        summarize: Summarize,
    ) -> Result<FitResult> {
        estimator(self, x, y, &mut params)?;

        if let Some(extra) = extra_params {
            for name in params.substitute(extra) {
                self.log.warn(&format!(
                    "Parameter '{}' is not part of the {} model and is ignored",
                    name,
                    model.name()
                ));
            }
        }

        let output = self.solve_with_retry(&model, x, y, &params)?;
        if !output.success {
            self.log.warn(&format!(
                "The {} fit did not converge: {}",
                model.name(),
                output.message
            ));
        }

        let units = units.unwrap_or(&self.config.units);
        let report = summarize(&output.params, units)?;
        tracing::debug!(model = model.name(), nfev = output.nfev, "fit finished");

        Ok(FitResult {
            model,
            success: output.success,
            message: output.message,
            init_params: params,
            params: output.params,
            best_fit: output.best_fit,
            chisqr: output.chisqr,
            redchi: output.redchi,
            nfev: output.nfev,
            report,
        })
    }

    /// Sine with offset
    pub fn make_sine_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sine_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            report::sine_report,
        )
    }

    /// Sine with exponential decay and offset
    pub fn make_sineexponentialdecay_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sineexponentialdecay_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            report::sineexponentialdecay_report,
        )
    }

    /// Sine with stretched exponential decay and offset
    pub fn make_sinestretchedexponentialdecay_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinestretchedexponentialdecay_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            report::sinestretchedexponentialdecay_report,
        )
    }

    pub fn make_sinedouble_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinedouble_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            |p, u| report::multi_sine_report(p, u, 2),
        )
    }

    pub fn make_sinedoublewithexpdecay_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinedoublewithexpdecay_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            |p, u| report::multi_sine_shared_decay_report(p, u, 2),
        )
    }

    pub fn make_sinedoublewithtwoexpdecay_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinedoublewithtwoexpdecay_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            |p, u| report::multi_sine_own_decay_report(p, u, 2),
        )
    }

    pub fn make_sinetriple_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinetriple_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            |p, u| report::multi_sine_report(p, u, 3),
        )
    }

    pub fn make_sinetriplewithexpdecay_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinetriplewithexpdecay_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            |p, u| report::multi_sine_shared_decay_report(p, u, 3),
        )
    }

    pub fn make_sinetriplewiththreeexpdecay_fit(
        &self,
        x: &[f64],
        y: &[f64],
        estimator: Estimator,
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.run_fit(
            self.make_sinetriplewiththreeexpdecay_model(None),
            x,
            y,
            estimator,
            units,
            extra_params,
            |p, u| report::multi_sine_own_decay_report(p, u, 3),
        )
    }

    /// Model and fresh parameters of a catalog fit
    pub fn make_model(&self, kind: FitKind, prefix: Option<&str>) -> (Model, Parameters) {
        match kind {
            FitKind::Sine => self.make_sine_model(prefix),
            FitKind::SineExponentialDecay => self.make_sineexponentialdecay_model(prefix),
            FitKind::SineStretchedExponentialDecay => {
                self.make_sinestretchedexponentialdecay_model(prefix)
            }
            FitKind::SineDouble => self.make_sinedouble_model(prefix),
            FitKind::SineDoubleWithExpDecay => self.make_sinedoublewithexpdecay_model(prefix),
            FitKind::SineDoubleWithTwoExpDecay => {
                self.make_sinedoublewithtwoexpdecay_model(prefix)
            }
            FitKind::SineTriple => self.make_sinetriple_model(prefix),
            FitKind::SineTripleWithExpDecay => self.make_sinetriplewithexpdecay_model(prefix),
            FitKind::SineTripleWithThreeExpDecay => {
                self.make_sinetriplewiththreeexpdecay_model(prefix)
            }
        }
    }

    /// Run a catalog fit with its default estimator
    pub fn fit(
        &self,
        kind: FitKind,
        x: &[f64],
        y: &[f64],
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        let estimator = kind.estimator();
        match kind {
            FitKind::Sine => self.make_sine_fit(x, y, estimator, units, extra_params),
            FitKind::SineExponentialDecay => {
                self.make_sineexponentialdecay_fit(x, y, estimator, units, extra_params)
            }
            FitKind::SineStretchedExponentialDecay => {
                self.make_sinestretchedexponentialdecay_fit(x, y, estimator, units, extra_params)
            }
            FitKind::SineDouble => self.make_sinedouble_fit(x, y, estimator, units, extra_params),
            FitKind::SineDoubleWithExpDecay => {
                self.make_sinedoublewithexpdecay_fit(x, y, estimator, units, extra_params)
            }
            FitKind::SineDoubleWithTwoExpDecay => {
                self.make_sinedoublewithtwoexpdecay_fit(x, y, estimator, units, extra_params)
            }
            FitKind::SineTriple => self.make_sinetriple_fit(x, y, estimator, units, extra_params),
            FitKind::SineTripleWithExpDecay => {
                self.make_sinetriplewithexpdecay_fit(x, y, estimator, units, extra_params)
            }
            FitKind::SineTripleWithThreeExpDecay => {
                self.make_sinetriplewiththreeexpdecay_fit(x, y, estimator, units, extra_params)
            }
        }
    }

    /// Run a catalog fit looked up by name
    pub fn fit_by_name(
        &self,
        name: &str,
        x: &[f64],
        y: &[f64],
        units: Option<&Units>,
        extra_params: Option<&Parameters>,
    ) -> Result<FitResult> {
        self.fit(name.parse()?, x, y, units, extra_params)
    }

    /// Run only the estimator of a catalog fit on its fresh parameter set
    pub fn estimate_by_name(&self, name: &str, x: &[f64], y: &[f64]) -> Result<Parameters> {
        let kind: FitKind = name.parse()?;
        let (_, mut params) = self.make_model(kind, None);
        (kind.estimator())(self, x, y, &mut params)?;
        Ok(params)
    }

    /// Fit by name and evaluate the result on a finer grid
    ///
    /// Returns `(fit_x, fit_y, result)` where `fit_x` spans `x[0]..=x[last]`
    /// with `fit_oversampling` points per input sample.
    pub fn perform_fit(
        &self,
        name: &str,
        x: &[f64],
        y: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>, FitResult)> {
        let result = self.fit_by_name(name, x, y, None, None)?;
        let (first, last) = match (x.first(), x.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(AnalysisError::InvalidInput("empty x-axis".to_string())),
        };
        let fit_x = linspace(first, last, self.config.fit_points(x.len()));
        let fit_y = result.eval(&fit_x)?;
        Ok((fit_x, fit_y, result))
    }
}

/// `n` evenly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
