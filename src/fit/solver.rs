//! Bounded non-linear least squares
//!
//! The [`Solver`] trait is the seam between fit orchestration and the
//! minimizer. [`LevenbergMarquardt`] is the default implementation: bounded
//! parameters are mapped into an unbounded internal space with the MINUIT
//! transforms, steps come from damped normal equations, and standard errors
//! are taken from the covariance at the solution.

use super::model::Model;
use super::params::{Parameter, Parameters};
use crate::config::SolverSettings;
use crate::error::{AnalysisError, Result};
use nalgebra::{DMatrix, DVector};

/// Everything the solver reports back about a finished minimization
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    /// Best-fit parameters, standard errors filled in where available
    pub params: Parameters,
    /// Model evaluated at the input x with the best-fit parameters
    pub best_fit: Vec<f64>,
    pub success: bool,
    pub message: String,
    pub nfev: usize,
    pub chisqr: f64,
    pub redchi: f64,
}

/// Least-squares minimizer
#[cfg_attr(test, mockall::automock)]
pub trait Solver: Send + Sync {
    /// Minimize `sum((model(x) - y)^2)` starting from `params`
    fn solve(&self, model: &Model, x: &[f64], y: &[f64], params: &Parameters)
        -> Result<SolverOutput>;
}

/// Mapping of one varying parameter between bounded and internal space
#[derive(Debug, Clone, Copy)]
enum Bound {
    Free,
    Lower(f64),
    Upper(f64),
    Both(f64, f64),
}

impl Bound {
    fn of(param: &Parameter) -> Self {
        match (param.min().is_finite(), param.max().is_finite()) {
            (true, true) => Bound::Both(param.min(), param.max()),
            (true, false) => Bound::Lower(param.min()),
            (false, true) => Bound::Upper(param.max()),
            (false, false) => Bound::Free,
        }
    }

    fn to_internal(self, value: f64) -> f64 {
        match self {
            Bound::Free => value,
            Bound::Lower(min) => ((value - min + 1.0).powi(2) - 1.0).sqrt(),
            Bound::Upper(max) => ((max - value + 1.0).powi(2) - 1.0).sqrt(),
            Bound::Both(min, max) => (2.0 * (value - min) / (max - min) - 1.0).asin(),
        }
    }

    fn to_external(self, internal: f64) -> f64 {
        match self {
            Bound::Free => internal,
            Bound::Lower(min) => min - 1.0 + (internal * internal + 1.0).sqrt(),
            Bound::Upper(max) => max + 1.0 - (internal * internal + 1.0).sqrt(),
            Bound::Both(min, max) => min + (internal.sin() + 1.0) * (max - min) / 2.0,
        }
    }
}

/// Varying parameters of one problem and how to move them
struct Problem<'a> {
    model: &'a Model,
    x: &'a [f64],
    y: &'a [f64],
    base: Parameters,
    varying: Vec<(String, Bound)>,
}

impl<'a> Problem<'a> {
    fn new(model: &'a Model, x: &'a [f64], y: &'a [f64], params: &Parameters) -> Result<Self> {
        let mut base = params.clone();
        let mut varying = Vec::new();

        for param in base.iter_mut() {
            if !param.vary() {
                continue;
            }
            if param.min() > param.max() {
                return Err(AnalysisError::Solver(format!(
                    "parameter '{}' has lower bound {} above upper bound {}",
                    param.name(),
                    param.min(),
                    param.max()
                )));
            }
            let clipped = param.clipped_value();
            param.set_value(clipped);
            // Collapsed bounds leave nothing to vary.
            if param.min() == param.max() {
                continue;
            }
            varying.push((param.name().to_string(), Bound::of(param)));
        }

        Ok(Self {
            model,
            x,
            y,
            base,
            varying,
        })
    }

    fn initial_internal(&self) -> Result<DVector<f64>> {
        let values = self
            .varying
            .iter()
            .map(|(name, bound)| Ok(bound.to_internal(self.base.value(name)?)))
            .collect::<Result<Vec<f64>>>()?;
        Ok(DVector::from_vec(values))
    }

    /// Full parameter set for a point in internal space
    fn external(&self, internal: &DVector<f64>) -> Result<Parameters> {
        let mut params = self.base.clone();
        for ((name, bound), u) in self.varying.iter().zip(internal.iter()) {
            params.param_mut(name)?.set_value(bound.to_external(*u));
        }
        Ok(params)
    }

    fn residual_of(&self, params: &Parameters) -> Result<DVector<f64>> {
        let model_y = self.model.eval(self.x, params)?;
        Ok(DVector::from_iterator(
            self.y.len(),
            model_y.iter().zip(self.y).map(|(m, d)| m - d),
        ))
    }

    fn residual(&self, internal: &DVector<f64>) -> Result<DVector<f64>> {
        self.residual_of(&self.external(internal)?)
    }

    /// Forward-difference Jacobian in internal space
    fn jacobian(
        &self,
        internal: &DVector<f64>,
        residual: &DVector<f64>,
        step: f64,
    ) -> Result<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(residual.len(), internal.len());
        let mut probe = internal.clone();
        for j in 0..internal.len() {
            let h = step * internal[j].abs().max(1.0);
            probe[j] = internal[j] + h;
            let shifted = self.residual(&probe)?;
            probe[j] = internal[j];
            for i in 0..residual.len() {
                jac[(i, j)] = (shifted[i] - residual[i]) / h;
            }
        }
        Ok(jac)
    }

    /// Central-difference Jacobian of the model in external space
    fn external_jacobian(&self, params: &Parameters) -> Result<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(self.y.len(), self.varying.len());
        for (j, (name, _)) in self.varying.iter().enumerate() {
            let value = params.value(name)?;
            let h = CENTRAL_STEP * value.abs().max(1.0);

            let mut forward = params.clone();
            forward.param_mut(name)?.set_value(value + h);
            let mut backward = params.clone();
            backward.param_mut(name)?.set_value(value - h);

            let upper = self.model.eval(self.x, &forward)?;
            let lower = self.model.eval(self.x, &backward)?;
            for (i, (u, l)) in upper.iter().zip(&lower).enumerate() {
                jac[(i, j)] = (u - l) / (2.0 * h);
            }
        }
        Ok(jac)
    }
}

/// Why the iteration stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Ftol,
    Xtol,
    Gtol,
    Stalled,
    Budget,
}

impl Stop {
    fn converged(self) -> bool {
        !matches!(self, Stop::Budget)
    }

    fn message(self, max_nfev: usize) -> String {
        match self {
            Stop::Ftol => {
                "Fit succeeded: relative reduction in the sum of squares is at most ftol".into()
            }
            Stop::Xtol => {
                "Fit succeeded: relative change between two iterates is at most xtol".into()
            }
            Stop::Gtol => "Fit succeeded: gradient is at most gtol".into(),
            Stop::Stalled => "Fit succeeded: no further improvement of the sum of squares".into(),
            Stop::Budget => format!(
                "Fit aborted: number of function evaluations > {}",
                max_nfev
            ),
        }
    }
}

const LAMBDA_INIT: f64 = 1e-3;
/// Relative step of the central differences used for the covariance
const CENTRAL_STEP: f64 = 6e-6;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// Levenberg-Marquardt minimizer with box constraints
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    settings: SolverSettings,
}

impl LevenbergMarquardt {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    fn solve_step(a: &DMatrix<f64>, g: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
        let mut damped = a.clone();
        for j in 0..damped.ncols() {
            damped[(j, j)] += lambda * a[(j, j)].max(1e-12);
        }
        let rhs = -g;
        match damped.clone().cholesky() {
            Some(chol) => Some(chol.solve(&rhs)),
            None => damped.lu().solve(&rhs),
        }
    }
}

fn sum_of_squares(r: &DVector<f64>) -> f64 {
    r.norm_squared()
}

impl Solver for LevenbergMarquardt {
    fn solve(
        &self,
        model: &Model,
        x: &[f64],
        y: &[f64],
        params: &Parameters,
    ) -> Result<SolverOutput> {
        if x.len() != y.len() {
            return Err(AnalysisError::Solver(format!(
                "x has {} points but y has {}",
                x.len(),
                y.len()
            )));
        }

        let problem = Problem::new(model, x, y, params)?;
        let nvary = problem.varying.len();
        if nvary == 0 {
            return Err(AnalysisError::Solver(
                "no parameters are allowed to vary".to_string(),
            ));
        }
        if y.len() < nvary {
            return Err(AnalysisError::Solver(format!(
                "{} data points cannot determine {} varying parameters",
                y.len(),
                nvary
            )));
        }

        let max_nfev = self.settings.max_nfev.unwrap_or(2000 * (nvary + 1));
        let step = self.settings.diff_step;

        let mut u = problem.initial_internal()?;
        let mut r = problem.residual(&u)?;
        let mut nfev = 1;
        if r.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Solver(
                "the model returned non-finite values at the initial parameters".to_string(),
            ));
        }
        let mut chisqr = sum_of_squares(&r);
        let mut lambda = LAMBDA_INIT;

        let stop = 'outer: loop {
            if chisqr == 0.0 {
                break Stop::Ftol;
            }
            if nfev >= max_nfev {
                break Stop::Budget;
            }

            let jac = problem.jacobian(&u, &r, step)?;
            nfev += nvary;
            let a = jac.transpose() * &jac;
            let g = jac.transpose() * &r;
            if g.amax() <= self.settings.gtol {
                break Stop::Gtol;
            }

            loop {
                if nfev >= max_nfev {
                    break 'outer Stop::Budget;
                }
                let Some(delta) = Self::solve_step(&a, &g, lambda) else {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        break 'outer Stop::Stalled;
                    }
                    continue;
                };

                let candidate = &u + &delta;
                let r_new = problem.residual(&candidate)?;
                nfev += 1;
                let chisqr_new = sum_of_squares(&r_new);

                let small_step =
                    delta.norm() <= self.settings.xtol * (u.norm() + self.settings.xtol);

                if chisqr_new.is_finite() && chisqr_new < chisqr {
                    let reduction = (chisqr - chisqr_new) / chisqr;
                    u = candidate;
                    r = r_new;
                    chisqr = chisqr_new;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);

                    if reduction <= self.settings.ftol {
                        break 'outer Stop::Ftol;
                    }
                    if small_step {
                        break 'outer Stop::Xtol;
                    }
                    break;
                }

                if small_step {
                    break 'outer Stop::Xtol;
                }
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break 'outer Stop::Stalled;
                }
            }
        };

        let mut best = problem.external(&u)?;
        let best_fit = model.eval(x, &best)?;
        let dof = y.len() - nvary;
        let redchi = if dof > 0 {
            chisqr / dof as f64
        } else {
            f64::NAN
        };

        let stderrs = standard_errors(&problem, &best, redchi)?;
        for ((name, _), stderr) in problem.varying.iter().zip(stderrs) {
            best.param_mut(name)?.set_stderr(stderr);
        }

        tracing::debug!(
            model = model.name(),
            nfev,
            chisqr,
            "Levenberg-Marquardt finished: {:?}",
            stop
        );

        Ok(SolverOutput {
            params: best,
            best_fit,
            success: stop.converged(),
            message: stop.message(max_nfev),
            nfev,
            chisqr,
            redchi,
        })
    }
}

/// `sqrt(diag(inv(JᵀJ)) * redchi)` in external space, `None` where the
/// covariance cannot be formed
fn standard_errors(
    problem: &Problem<'_>,
    best: &Parameters,
    redchi: f64,
) -> Result<Vec<Option<f64>>> {
    let nvary = problem.varying.len();
    if !redchi.is_finite() {
        return Ok(vec![None; nvary]);
    }

    let jac = problem.external_jacobian(best)?;
    let Some(cov) = (jac.transpose() * &jac).try_inverse() else {
        return Ok(vec![None; nvary]);
    };

    Ok((0..nvary)
        .map(|j| {
            let var = cov[(j, j)] * redchi;
            (var.is_finite() && var >= 0.0).then(|| var.sqrt())
        })
        .collect())
}
