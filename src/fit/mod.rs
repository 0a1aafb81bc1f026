//! Sine-family curve fitting
//!
//! This module provides:
//! - Composable models over sine, amplitude, constant and decay terms
//! - Estimators that derive starting values from the data
//! - A bounded Levenberg-Marquardt solver behind the [`Solver`] seam
//! - Fit orchestration with retry and summarized reports
//!
//! # Example
//!
//! ```ignore
//! use qudi_analysis::fit::{FitLogic, Units};
//!
//! let logic = FitLogic::new();
//! let result = logic.make_sine_fit(&x, &y, FitLogic::estimate_sine, Some(&Units::new("s", "V")), None)?;
//! println!("{}", result.report);
//! ```

pub mod estimators;
pub mod log;
pub mod logic;
pub mod model;
pub mod params;
pub mod report;
pub mod sine;
pub mod solver;

pub use estimators::{EstimateStatus, Estimator};
pub use log::{FitLog, LogLevel, MemoryLog, TracingLog};
pub use logic::{linspace, FitKind, FitLogic, FitResult};
pub use model::{Model, ModelExpr, Primitive};
pub use params::{Parameter, Parameters};
pub use report::{FitReport, ReportEntry, Units};
pub use solver::{LevenbergMarquardt, Solver, SolverOutput};
