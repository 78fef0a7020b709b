//! Convolution step: convolves every trace with a wavelet.

use super::not_configured;
use crate::error::FlowResult;
use crate::step::TraceStep;
use lib_dsp::ConvolutionEngine;
use lib_types::trace::{Trace, TraceLayout};
use lib_types::wavelet::Wavelet;
use serde::{Deserialize, Serialize};

/// Registry name.
pub const NAME: &str = "convolution";

/// Convolution parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvolutionParams {
    /// Wavelet to convolve with, its zero time lands on each input sample.
    pub wavelet: Wavelet,
}

pub struct ConvolutionStep {
    params: ConvolutionParams,
    engine: Option<ConvolutionEngine>,
}

impl ConvolutionStep {
    pub fn new(params: ConvolutionParams) -> Self {
        Self {
            params,
            engine: None,
        }
    }

    pub fn params(&self) -> &ConvolutionParams {
        &self.params
    }
}

impl TraceStep for ConvolutionStep {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, input: TraceLayout) -> FlowResult<TraceLayout> {
        self.engine = Some(ConvolutionEngine::from_wavelet(input, &self.params.wavelet)?);
        Ok(input)
    }

    fn process_trace(&self, trace: &mut Trace) -> FlowResult<()> {
        let engine = self.engine.as_ref().ok_or_else(not_configured)?;
        engine.convolve_in_place(&mut trace.samples)?;
        Ok(())
    }

    fn teardown(&mut self) -> FlowResult<()> {
        self.engine = None;
        Ok(())
    }
}
