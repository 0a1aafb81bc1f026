//! Configuration for qudi-analysis
//!
//! This module holds the settings that tune fitting without touching code:
//! - Solver tolerances and evaluation budget
//! - Default axis units used in fit reports
//! - Oversampling of the smooth fit curves returned by `perform_fit`
//!
//! # Location
//!
//! The default configuration file lives in the platform config directory:
//! - **Linux**: `~/.config/org.qudi.analysis/config.toml`
//! - **macOS**: `~/Library/Application Support/org.qudi.analysis/config.toml`
//! - **Windows**: `%APPDATA%\org.qudi.analysis\config.toml`
//!
//! Files ending in `.json` are read and written as JSON, everything else as
//! TOML.
//!
//! # Example
//!
//! ```ignore
//! use qudi_analysis::config::AnalysisConfig;
//!
//! let mut config = AnalysisConfig::load_or_default(AnalysisConfig::default_path());
//! config.fit_oversampling = 20;
//! config.save("analysis.toml")?;
//! ```

use crate::error::{AnalysisError, Result};
use crate::fit::Units;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "org.qudi.analysis";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default number of fit-curve points per input sample
pub const DEFAULT_FIT_OVERSAMPLING: usize = 10;

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Serialization format picked from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

// ==================== Solver Settings ====================

/// Tolerances and budget of the least-squares solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Maximum number of model evaluations, `2000·(n_vary+1)` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nfev: Option<usize>,

    /// Relative reduction of the sum of squares that counts as converged
    #[serde(default = "default_tolerance")]
    pub ftol: f64,

    /// Relative step size that counts as converged
    #[serde(default = "default_tolerance")]
    pub xtol: f64,

    /// Gradient magnitude that counts as converged
    #[serde(default)]
    pub gtol: f64,

    /// Relative forward-difference step for the Jacobian
    #[serde(default = "default_diff_step")]
    pub diff_step: f64,
}

fn default_tolerance() -> f64 {
    1.5e-8
}

fn default_diff_step() -> f64 {
    f64::EPSILON.sqrt()
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_nfev: None,
            ftol: default_tolerance(),
            xtol: default_tolerance(),
            gtol: 0.0,
            diff_step: default_diff_step(),
        }
    }
}

impl SolverSettings {
    /// Reject settings the solver cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.diff_step.is_finite() && self.diff_step > 0.0) {
            return Err(AnalysisError::Config(format!(
                "diff_step must be positive, got {}",
                self.diff_step
            )));
        }
        for (name, value) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(AnalysisError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.max_nfev == Some(0) {
            return Err(AnalysisError::Config(
                "max_nfev must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Analysis Config ====================

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Version for future migration support
    #[serde(default = "default_config_version")]
    pub version: u32,

    #[serde(default)]
    pub solver: SolverSettings,

    /// Units used when a fit is run without explicit units
    #[serde(default)]
    pub units: Units,

    /// Fit-curve points per input sample
    #[serde(default = "default_fit_oversampling")]
    pub fit_oversampling: usize,
}

fn default_config_version() -> u32 {
    1
}

fn default_fit_oversampling() -> usize {
    DEFAULT_FIT_OVERSAMPLING
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: 1,
            solver: SolverSettings::default(),
            units: Units::default(),
            fit_oversampling: DEFAULT_FIT_OVERSAMPLING,
        }
    }
}

impl AnalysisConfig {
    /// Path of the per-user config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        default_config_path()
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = match Format::of(path) {
            Format::Json => serde_json::from_str(&content).map_err(|e| {
                AnalysisError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Format::Toml => toml::from_str(&content).map_err(|e| {
                AnalysisError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?,
        };

        config.solver.validate()?;
        Ok(config)
    }

    /// Load a config file, returning defaults on any error
    ///
    /// A missing path (no platform config dir) or a missing file silently
    /// yields the defaults; unreadable or invalid files are logged.
    pub fn load_or_default(path: Option<impl AsRef<Path>>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AnalysisError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = match Format::of(path) {
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| AnalysisError::Config(format!("Failed to serialize config: {}", e)))?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| AnalysisError::Config(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content)
            .map_err(|e| AnalysisError::Config(format!("Failed to write config: {}", e)))
    }

    /// Number of points for a fit curve over `n` input samples
    pub fn fit_points(&self, n: usize) -> usize {
        n.saturating_mul(self.fit_oversampling.max(1))
    }
}
