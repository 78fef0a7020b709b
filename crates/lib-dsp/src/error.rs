//! Error types for DSP operations.

use thiserror::Error;

/// Errors that can occur during DSP operations.
#[derive(Debug, Error)]
pub enum DspError {
    /// FFT size is not a power of 2.
    #[error("FFT size must be power of 2, got {0}")]
    InvalidFftSize(usize),

    /// Input length mismatch.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Insufficient data for operation.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid setup parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wavelet and trace sample intervals disagree.
    #[error("Sample interval mismatch: trace {trace_ms} ms, wavelet {wavelet_ms} ms")]
    IntervalMismatch { trace_ms: f64, wavelet_ms: f64 },

    /// Numerical instability detected.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Writing a diagnostic dump failed.
    #[error("Dump failed: {0}")]
    Io(#[from] std::io::Error),
}

impl DspError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error was raised while setting up a filter or descriptor.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::IntervalMismatch { .. }
                | Self::InsufficientData { .. }
                | Self::InvalidFftSize(_)
        )
    }
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;
