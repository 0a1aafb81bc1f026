//! # qudi-analysis: sine-family curve fitting
//!
//! Fits oscillating measurement data (Rabi, Ramsey, echo traces) with plain,
//! decaying, double and triple sine models. Starting values come from a
//! windowed, zero-padded spectrum and a brute-force phase scan; the bounded
//! least-squares solve then refines them.
//!
//! ## Architecture
//!
//! - **Analysis**: Windowed FFT with amplitude normalization, pulsed-signal extraction
//! - **Fit**: Models, estimators, solver seam, orchestration and reports
//! - **Config**: Solver tolerances, default units and fit-curve oversampling
//! - **Data**: Two-column measurement file reading
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `org.qudi.analysis`:
//!
//! - **Linux**: `~/.config/org.qudi.analysis/`
//! - **macOS**: `~/Library/Application Support/org.qudi.analysis/`
//! - **Windows**: `%APPDATA%\org.qudi.analysis\`
//!
//! ## Example
//!
//! ```ignore
//! use qudi_analysis::{FitLogic, Units};
//!
//! let logic = FitLogic::new();
//! let result = logic.fit_by_name("sineexponentialdecay", &x, &y, Some(&Units::new("s", "counts")), None)?;
//! for entry in result.report.entries() {
//!     println!("{}: {} {}", entry.label, entry.value, entry.unit);
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod fit;

// Re-export commonly used types
pub use analysis::{compute_ft, FtOptions, Spectrum, WindowFunction};
pub use config::{AnalysisConfig, SolverSettings};
pub use error::{AnalysisError, Result, ResultExt};
pub use fit::{FitKind, FitLogic, FitReport, FitResult, Parameter, Parameters, Units};
