//! Error types for flow setup and trace processing.

use crate::step::StepState;
use lib_dsp::DspError;
use thiserror::Error;

/// Errors that can occur while building or running a flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Numerical core rejected a setup parameter or a trace.
    #[error(transparent)]
    Dsp(#[from] DspError),

    /// Invalid step state for operation.
    #[error("Invalid step state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: StepState,
        actual: StepState,
    },

    /// No factory registered under this name.
    #[error("Unknown step '{0}'")]
    UnknownStep(String),

    /// Invalid step parameter.
    #[error("Invalid parameter for step '{step}': {reason}")]
    InvalidParameter { step: String, reason: String },

    /// Gather does not have the layout the flow was configured for.
    #[error("Layout mismatch: flow expects {expected_samples} samples at {expected_ms} ms, got {actual_samples} samples at {actual_ms} ms")]
    LayoutMismatch {
        expected_samples: usize,
        expected_ms: f64,
        actual_samples: usize,
        actual_ms: f64,
    },

    /// Processing one trace of a gather failed.
    #[error("Trace {index} failed: {source}")]
    TraceFailed {
        index: usize,
        #[source]
        source: Box<FlowError>,
    },
}

impl FlowError {
    /// Create an invalid state error.
    pub fn invalid_state(expected: StepState, actual: StepState) -> Self {
        Self::InvalidState { expected, actual }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error was raised while building or configuring the flow.
    pub fn is_setup_error(&self) -> bool {
        match self {
            Self::Dsp(e) => e.is_setup_error(),
            Self::UnknownStep(_) | Self::InvalidParameter { .. } => true,
            _ => false,
        }
    }
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
