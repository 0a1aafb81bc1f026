//! Named model parameters
//!
//! A [`Parameters`] set is an insertion-ordered mapping from parameter name
//! to [`Parameter`]. Estimators adjust values and bounds through the setters,
//! the solver fills in standard errors.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// A single named scalar parameter with optional bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    value: f64,
    min: f64,
    max: f64,
    vary: bool,
    stderr: Option<f64>,
}

impl Parameter {
    /// Create an unbounded, varying parameter
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            vary: true,
            stderr: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Lower bound, `-inf` when unbounded
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound, `inf` when unbounded
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether the solver may change this parameter
    pub fn vary(&self) -> bool {
        self.vary
    }

    /// Standard error estimated by the solver
    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    /// Set the value and optionally the bounds. `None` leaves a bound as it is.
    pub fn set(&mut self, value: f64, min: Option<f64>, max: Option<f64>) {
        self.value = value;
        if let Some(min) = min {
            self.min = min;
        }
        if let Some(max) = max {
            self.max = max;
        }
    }

    /// Set only the value
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Set both bounds
    pub fn set_bounds(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    /// Fix or release the parameter
    pub fn set_vary(&mut self, vary: bool) {
        self.vary = vary;
    }

    pub(crate) fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    /// Value clipped into the bounds
    pub fn clipped_value(&self) -> f64 {
        if self.min > self.max {
            return self.value;
        }
        self.value.clamp(self.min, self.max)
    }

    /// Builder-style bound setter, used for overrides
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.set_bounds(min, max);
        self
    }

    /// Builder-style vary setter, used for overrides
    pub fn fixed(mut self) -> Self {
        self.vary = false;
        self
    }
}

/// Insertion-ordered set of parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    entries: Vec<Parameter>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing any existing parameter of the same name
    /// while keeping its position
    pub fn insert(&mut self, parameter: Parameter) {
        match self.entries.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => *existing = parameter,
            None => self.entries.push(parameter),
        }
    }

    /// Add a parameter by name and value
    pub fn add(&mut self, name: impl Into<String>, value: f64) {
        self.insert(Parameter::new(name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.entries.iter_mut().find(|p| p.name == name)
    }

    /// Look up a parameter, failing with [`AnalysisError::MissingParameter`]
    pub fn param(&self, name: &str) -> Result<&Parameter> {
        self.get(name)
            .ok_or_else(|| AnalysisError::MissingParameter(name.to_string()))
    }

    /// Mutable lookup, failing with [`AnalysisError::MissingParameter`]
    pub fn param_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        self.get_mut(name)
            .ok_or_else(|| AnalysisError::MissingParameter(name.to_string()))
    }

    /// Current value of a parameter
    pub fn value(&self, name: &str) -> Result<f64> {
        self.param(name).map(Parameter::value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.entries.iter_mut()
    }

    /// Parameter names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.name.as_str()).collect()
    }

    /// Replace value, bounds and vary flag of every parameter that also
    /// appears in `overrides`. Returns the names in `overrides` that are not
    /// part of this set; those are left out.
    pub fn substitute(&mut self, overrides: &Parameters) -> Vec<String> {
        let mut unknown = Vec::new();
        for update in overrides.iter() {
            match self.get_mut(&update.name) {
                Some(target) => {
                    target.value = update.value;
                    target.min = update.min;
                    target.max = update.max;
                    target.vary = update.vary;
                }
                None => unknown.push(update.name.clone()),
            }
        }
        unknown
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for p in iter {
            params.insert(p);
        }
        params
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
