//! Sine-family model constructors
//!
//! Each constructor returns the model together with a fresh parameter set at
//! default values. Bounds are left to the estimators.
//!
//! Multi-component models namespace their components with `s1_`, `s2_`, ...
//! (or `e1_`, ... when every component decays on its own); the shared decay
//! and the constant carry only the caller's prefix.

use super::logic::FitLogic;
use super::model::{Model, ModelExpr, Primitive};
use super::params::Parameters;

fn leaf(primitive: Primitive, prefix: &str) -> ModelExpr {
    ModelExpr::leaf(primitive, prefix)
}

fn with_params(name: &str, expr: ModelExpr) -> (Model, Parameters) {
    let model = Model::new(name, expr);
    let params = model.make_params();
    (model, params)
}

fn is_valid_prefix(prefix: &str) -> bool {
    prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sum of the expressions, `None` for an empty list
fn sum(terms: impl IntoIterator<Item = ModelExpr>) -> Option<ModelExpr> {
    terms.into_iter().reduce(ModelExpr::plus)
}

impl FitLogic {
    /// The prefix to build with, or an empty one if it is unusable
    pub(crate) fn checked_prefix(&self, prefix: Option<&str>) -> String {
        match prefix {
            None => String::new(),
            Some(p) if is_valid_prefix(p) => p.to_string(),
            Some(p) => {
                self.log().error(&format!(
                    "The passed prefix <{}> is not a valid parameter name prefix. \
                     Only ASCII letters, digits and '_' are allowed. \
                     The model will be built without a prefix.",
                    p
                ));
                String::new()
            }
        }
    }

    fn sine_term(prefix: &str) -> ModelExpr {
        leaf(Primitive::Amplitude, prefix).times(leaf(Primitive::BareSine, prefix))
    }

    fn decaying_sine_term(prefix: &str) -> ModelExpr {
        Self::sine_term(prefix).times(leaf(Primitive::BareExponentialDecay, prefix))
    }

    /// `sin(2π·frequency·x + phase)`
    pub fn make_baresine_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params("baresine", leaf(Primitive::BareSine, &prefix))
    }

    /// `amplitude·sin(2π·frequency·x + phase)`
    pub fn make_sinewithoutoffset_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params("sinewithoutoffset", Self::sine_term(&prefix))
    }

    /// `amplitude·sin(2π·frequency·x + phase) + offset`
    pub fn make_sine_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            "sine",
            Self::sine_term(&prefix).plus(leaf(Primitive::Constant, &prefix)),
        )
    }

    /// `amplitude·sin(2π·frequency·x + phase)·exp(-x/lifetime)`
    pub fn make_sineexpdecaywithoutoffset_model(
        &self,
        prefix: Option<&str>,
    ) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            "sineexpdecaywithoutoffset",
            Self::decaying_sine_term(&prefix),
        )
    }

    /// `amplitude·sin(2π·frequency·x + phase)·exp(-x/lifetime) + offset`
    pub fn make_sineexponentialdecay_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            "sineexponentialdecay",
            Self::decaying_sine_term(&prefix).plus(leaf(Primitive::Constant, &prefix)),
        )
    }

    /// `amplitude·sin(2π·frequency·x + phase)·exp(-(x/lifetime)^beta) + offset`
    pub fn make_sinestretchedexponentialdecay_model(
        &self,
        prefix: Option<&str>,
    ) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            "sinestretchedexponentialdecay",
            Self::sine_term(&prefix)
                .times(leaf(Primitive::BareStretchedExponentialDecay, &prefix))
                .plus(leaf(Primitive::Constant, &prefix)),
        )
    }

    fn sines(prefix: &str, tag: &str, count: usize, decaying: bool) -> ModelExpr {
        let term = |k: usize| {
            let p = format!("{tag}{k}_{prefix}");
            if decaying {
                Self::decaying_sine_term(&p)
            } else {
                Self::sine_term(&p)
            }
        };
        // count is never zero for the variants below
        sum((1..=count).map(term)).unwrap_or_else(|| Self::sine_term(prefix))
    }

    fn multi_sine(&self, name: &str, prefix: Option<&str>, count: usize) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            name,
            Self::sines(&prefix, "s", count, false).plus(leaf(Primitive::Constant, &prefix)),
        )
    }

    fn multi_sine_shared_decay(
        &self,
        name: &str,
        prefix: Option<&str>,
        count: usize,
    ) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            name,
            Self::sines(&prefix, "s", count, false)
                .times(leaf(Primitive::BareExponentialDecay, &prefix))
                .plus(leaf(Primitive::Constant, &prefix)),
        )
    }

    fn multi_sine_own_decay(
        &self,
        name: &str,
        prefix: Option<&str>,
        count: usize,
    ) -> (Model, Parameters) {
        let prefix = self.checked_prefix(prefix);
        with_params(
            name,
            Self::sines(&prefix, "e", count, true).plus(leaf(Primitive::Constant, &prefix)),
        )
    }

    /// Two sines plus a constant
    pub fn make_sinedouble_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        self.multi_sine("sinedouble", prefix, 2)
    }

    /// Two sines under one exponential decay, plus a constant
    pub fn make_sinedoublewithexpdecay_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        self.multi_sine_shared_decay("sinedoublewithexpdecay", prefix, 2)
    }

    /// Two sines, each with its own exponential decay, plus a constant
    pub fn make_sinedoublewithtwoexpdecay_model(
        &self,
        prefix: Option<&str>,
    ) -> (Model, Parameters) {
        self.multi_sine_own_decay("sinedoublewithtwoexpdecay", prefix, 2)
    }

    /// Three sines plus a constant
    pub fn make_sinetriple_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        self.multi_sine("sinetriple", prefix, 3)
    }

    /// Three sines under one exponential decay, plus a constant
    pub fn make_sinetriplewithexpdecay_model(&self, prefix: Option<&str>) -> (Model, Parameters) {
        self.multi_sine_shared_decay("sinetriplewithexpdecay", prefix, 3)
    }

    /// Three sines, each with its own exponential decay, plus a constant
    pub fn make_sinetriplewiththreeexpdecay_model(
        &self,
        prefix: Option<&str>,
    ) -> (Model, Parameters) {
        self.multi_sine_own_decay("sinetriplewiththreeexpdecay", prefix, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::log::MockFitLog;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn logic() -> FitLogic {
        FitLogic::new()
    }

    #[test]
    fn test_sine_parameter_names() {
        let (model, params) = logic().make_sine_model(None);
        assert_eq!(model.name(), "sine");
        assert_eq!(params.names(), vec!["amplitude", "frequency", "phase", "offset"]);
    }

    #[test]
    fn test_prefix_is_applied_everywhere() {
        let (_, params) = logic().make_sineexponentialdecay_model(Some("nv_"));
        assert_eq!(
            params.names(),
            vec!["nv_amplitude", "nv_frequency", "nv_phase", "nv_lifetime", "nv_offset"]
        );
    }

    #[test]
    fn test_double_with_shared_decay_names() {
        let (_, params) = logic().make_sinedoublewithexpdecay_model(Some("a_"));
        assert_eq!(
            params.names(),
            vec![
                "s1_a_amplitude",
                "s1_a_frequency",
                "s1_a_phase",
                "s2_a_amplitude",
                "s2_a_frequency",
                "s2_a_phase",
                "a_lifetime",
                "a_offset",
            ]
        );
    }

    #[test]
    fn test_triple_with_own_decays_names() {
        let (_, params) = logic().make_sinetriplewiththreeexpdecay_model(None);
        for k in 1..=3 {
            for base in ["amplitude", "frequency", "phase", "lifetime"] {
                assert!(params.contains(&format!("e{k}_{base}")));
            }
        }
        assert!(params.contains("offset"));
        assert_eq!(params.len(), 13);
    }

    #[test]
    fn test_construction_is_idempotent() {
        let logic = logic();
        let (m1, mut p1) = logic.make_sinetriplewithexpdecay_model(Some("x"));
        let (m2, p2) = logic.make_sinetriplewithexpdecay_model(Some("x"));
        assert_eq!(m1, m2);
        assert_eq!(p1, p2);

        for param in p1.iter_mut() {
            param.set(7.0, Some(-1.0), Some(9.0));
            param.set_vary(false);
        }
        assert_ne!(p1, p2);
        let (_, fresh) = logic.make_sinetriplewithexpdecay_model(Some("x"));
        assert_eq!(p2, fresh);
        assert!(p2.iter().all(|p| p.vary()));
    }

    #[test]
    fn test_stretched_model_evaluates() {
        let (model, mut params) = logic().make_sinestretchedexponentialdecay_model(None);
        params.param_mut("amplitude").unwrap().set_value(2.0);
        params.param_mut("frequency").unwrap().set_value(0.25);
        params.param_mut("phase").unwrap().set_value(0.0);
        params.param_mut("lifetime").unwrap().set_value(1.0);
        params.param_mut("beta").unwrap().set_value(2.0);
        params.param_mut("offset").unwrap().set_value(1.0);

        let y = model.eval(&[1.0], &params).unwrap();
        assert_relative_eq!(y[0], 2.0 * (-1.0f64).exp() + 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_prefix_is_logged_and_dropped() {
        let mut log = MockFitLog::new();
        log.expect_error()
            .withf(|msg| msg.contains("my-prefix"))
            .times(1)
            .return_const(());
        log.expect_warn().never();

        let logic = FitLogic::new().with_log(Arc::new(log));
        let (_, params) = logic.make_sine_model(Some("my-prefix"));
        assert_eq!(params.names(), vec!["amplitude", "frequency", "phase", "offset"]);
    }

    #[test]
    fn test_valid_prefix_is_not_logged() {
        let mut log = MockFitLog::new();
        log.expect_error().never();
        let logic = FitLogic::new().with_log(Arc::new(log));
        let _ = logic.make_sinedouble_model(Some("ok_1"));
    }
}
