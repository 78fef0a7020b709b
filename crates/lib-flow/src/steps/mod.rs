//! Built-in processing steps.

pub mod convolution;
pub mod designature;
pub mod resample;

pub use convolution::{ConvolutionParams, ConvolutionStep};
pub use designature::{CornerParams, DesignatureParams, DesignatureStep, FilterKind, NotchParams};
pub use resample::{ResampleParams, ResampleStep};

use crate::error::FlowError;
use crate::step::StepState;

/// Error for a step used before `configure`.
pub(crate) fn not_configured() -> FlowError {
    FlowError::invalid_state(StepState::Configured, StepState::Uninitialized)
}
