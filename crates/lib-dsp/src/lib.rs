//! # lib-dsp
//!
//! Numerical core for seismic trace processing.
//!
//! This crate provides the signal processing used by the flow steps:
//!
//! - **Spectral transform**: real FFT with Hermitian half-spectrum storage
//! - **Designature**: regularised spectral division of a signature wavelet,
//!   with optional band-pass corners and notch suppression
//! - **Filter application**: in-place frequency-domain filtering of traces
//! - **Resampling**: quadratic-interpolation upsampling and anti-aliased
//!   power-of-two decimation
//! - **Convolution**: direct time-domain convolution with a short wavelet
//!
//! Every filter, descriptor and engine is immutable once built and can be
//! shared between threads processing different traces.

pub mod error;
pub mod fft;
pub mod taper;
pub mod filter;
pub mod designature;
pub mod resample;
pub mod convolution;

pub use error::{DspError, DspResult};
pub use fft::{SpectralTransform, Spectrum};
pub use taper::Corner;
pub use filter::{Notch, SpectralFilter};
pub use designature::{DesignOptions, FilterDesigner, FilterType};
pub use resample::{ResampleConfig, ResampleDescriptor, ResampleMode};
pub use convolution::ConvolutionEngine;
