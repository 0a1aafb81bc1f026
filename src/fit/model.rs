//! Composable analytical models
//!
//! Models are tagged expression trees over a handful of primitive terms.
//! Every leaf carries the prefix that namespaces its parameters, so a sum of
//! two prefixed sines keeps `s1_frequency` and `s2_frequency` apart while
//! terms with the same prefix share parameters.

use super::params::{Parameter, Parameters};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Primitive model terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    /// `sin(2π·frequency·x + phase)`
    BareSine,
    /// `amplitude`
    Amplitude,
    /// `offset`
    Constant,
    /// `exp(-x/lifetime)`
    BareExponentialDecay,
    /// `exp(-(x/lifetime)^beta)`
    BareStretchedExponentialDecay,
}

impl Primitive {
    /// Unprefixed parameter names in signature order
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Primitive::BareSine => &["frequency", "phase"],
            Primitive::Amplitude => &["amplitude"],
            Primitive::Constant => &["offset"],
            Primitive::BareExponentialDecay => &["lifetime"],
            Primitive::BareStretchedExponentialDecay => &["beta", "lifetime"],
        }
    }

    /// Value a freshly registered parameter starts from
    fn default_value(name: &str) -> f64 {
        match name {
            "amplitude" | "lifetime" | "beta" | "frequency" => 1.0,
            _ => 0.0,
        }
    }

    fn eval_into(&self, x: &[f64], values: &[f64], out: &mut Vec<f64>) {
        out.clear();
        match self {
            Primitive::BareSine => {
                let (frequency, phase) = (values[0], values[1]);
                out.extend(x.iter().map(|&t| (2.0 * PI * frequency * t + phase).sin()));
            }
            Primitive::Amplitude | Primitive::Constant => {
                out.extend(std::iter::repeat(values[0]).take(x.len()));
            }
            Primitive::BareExponentialDecay => {
                let lifetime = values[0];
                out.extend(x.iter().map(|&t| (-t / lifetime).exp()));
            }
            Primitive::BareStretchedExponentialDecay => {
                let (beta, lifetime) = (values[0], values[1]);
                out.extend(x.iter().map(|&t| (-(t / lifetime).powf(beta)).exp()));
            }
        }
    }
}

/// Expression tree of a composite model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelExpr {
    Leaf { primitive: Primitive, prefix: String },
    Product(Box<ModelExpr>, Box<ModelExpr>),
    Sum(Box<ModelExpr>, Box<ModelExpr>),
}

impl ModelExpr {
    pub fn leaf(primitive: Primitive, prefix: &str) -> Self {
        ModelExpr::Leaf {
            primitive,
            prefix: prefix.to_string(),
        }
    }

    pub fn times(self, other: ModelExpr) -> Self {
        ModelExpr::Product(Box::new(self), Box::new(other))
    }

    pub fn plus(self, other: ModelExpr) -> Self {
        ModelExpr::Sum(Box::new(self), Box::new(other))
    }

    /// Prefixed parameter names, first-seen order, shared names once
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameter_specs()
            .into_iter()
            .map(|(full, _)| full)
            .collect()
    }

    /// Pairs of (prefixed name, unprefixed name)
    fn parameter_specs(&self) -> Vec<(String, &'static str)> {
        let mut specs = Vec::new();
        self.collect_specs(&mut specs);
        specs
    }

    fn collect_specs(&self, specs: &mut Vec<(String, &'static str)>) {
        match self {
            ModelExpr::Leaf { primitive, prefix } => {
                for &name in primitive.parameter_names() {
                    let full = format!("{prefix}{name}");
                    if !specs.iter().any(|(existing, _)| *existing == full) {
                        specs.push((full, name));
                    }
                }
            }
            ModelExpr::Product(l, r) | ModelExpr::Sum(l, r) => {
                l.collect_specs(specs);
                r.collect_specs(specs);
            }
        }
    }

    /// Evaluate the expression at every x
    pub fn eval(&self, x: &[f64], params: &Parameters) -> Result<Vec<f64>> {
        match self {
            ModelExpr::Leaf { primitive, prefix } => {
                let values = primitive
                    .parameter_names()
                    .iter()
                    .map(|name| params.value(&format!("{prefix}{name}")))
                    .collect::<Result<Vec<f64>>>()?;
                let mut out = Vec::with_capacity(x.len());
                primitive.eval_into(x, &values, &mut out);
                Ok(out)
            }
            ModelExpr::Product(l, r) => {
                let mut left = l.eval(x, params)?;
                let right = r.eval(x, params)?;
                left.iter_mut().zip(right).for_each(|(a, b)| *a *= b);
                Ok(left)
            }
            ModelExpr::Sum(l, r) => {
                let mut left = l.eval(x, params)?;
                let right = r.eval(x, params)?;
                left.iter_mut().zip(right).for_each(|(a, b)| *a += b);
                Ok(left)
            }
        }
    }
}

/// A named composite model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    expr: ModelExpr,
}

impl Model {
    pub fn new(name: impl Into<String>, expr: ModelExpr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expr(&self) -> &ModelExpr {
        &self.expr
    }

    /// Fresh parameter set holding every parameter of the model
    pub fn make_params(&self) -> Parameters {
        self.expr
            .parameter_specs()
            .into_iter()
            .map(|(name, base)| Parameter::new(name, Primitive::default_value(base)))
            .collect()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.expr.parameter_names()
    }

    /// Evaluate the model at every x with the given parameters
    pub fn eval(&self, x: &[f64], params: &Parameters) -> Result<Vec<f64>> {
        self.expr.eval(x, params)
    }
}
