//! Signal processing utilities
//!
//! This module provides the signal analysis tools the fitting code builds on:
//! - Windowed, zero-padded discrete Fourier transform
//! - Power spectral density computation
//! - Pulsed-measurement signal/reference extraction

pub mod fft;
pub mod pulsed;

pub use fft::{compute_ft, FtOptions, Spectrum, WindowFunction};
pub use pulsed::{analyse_mean, analyse_mean_norm, analyse_mean_reference, PulseWindows};
