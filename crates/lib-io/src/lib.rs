//! # lib-io
//!
//! Text readers and writers for seisflow.
//!
//! This crate provides:
//! - Wavelet files (`time_ms amplitude` pairs or a single amplitude column)
//! - Trace gather files (one row per sample, one column per trace)
//!
//! Lines are parsed with the `nom` parser combinator library; errors carry
//! the 1-based line number of the offending input.

pub mod error;
mod text;
pub mod wavelet;
pub mod gather;

pub use error::ParseError;
pub use wavelet::{parse_wavelet, read_wavelet_file, WaveletDefaults};
pub use gather::{parse_gather, read_gather_file, write_gather, write_gather_file};
