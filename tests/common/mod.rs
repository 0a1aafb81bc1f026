//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Wrap a phase into `[-π, π)`
pub fn wrap_phase(phase: f64) -> f64 {
    use std::f64::consts::PI;
    (phase + PI).rem_euclid(2.0 * PI) - PI
}
