//! # lib-types
//!
//! Core type definitions for the seisflow trace processing workspace.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Units (milliseconds, Hertz) with compile-time safety
//! - Wavelet representation anchored to a zero time
//! - Trace, gather and layout types for per-trace processing

pub mod units;
pub mod wavelet;
pub mod trace;

pub use units::*;
pub use wavelet::*;
pub use trace::*;
