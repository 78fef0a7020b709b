//! Resample step: changes the sample interval of every trace.

use super::not_configured;
use crate::error::FlowResult;
use crate::step::TraceStep;
use lib_dsp::resample::{plan, DEFAULT_CUTOFF_RATIO, DEFAULT_ORDER};
use lib_dsp::{ResampleConfig, ResampleDescriptor};
use lib_types::trace::{Trace, TraceLayout};
use lib_types::units::Milliseconds;
use serde::{Deserialize, Serialize};

/// Registry name.
pub const NAME: &str = "resample";

/// Resample parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResampleParams {
    /// Requested output sample interval.
    pub sample_interval_ms: f64,

    #[serde(default = "default_cutoff_ratio")]
    pub cutoff_ratio: f64,

    #[serde(default = "default_order")]
    pub order: u32,

    #[serde(default)]
    pub debias: bool,
}

fn default_cutoff_ratio() -> f64 {
    DEFAULT_CUTOFF_RATIO
}

fn default_order() -> u32 {
    DEFAULT_ORDER
}

impl ResampleParams {
    pub fn new(sample_interval_ms: f64) -> Self {
        Self {
            sample_interval_ms,
            cutoff_ratio: DEFAULT_CUTOFF_RATIO,
            order: DEFAULT_ORDER,
            debias: false,
        }
    }

    /// Resampling of traces with layout `input`.
    pub fn config(&self, input: TraceLayout) -> ResampleConfig {
        ResampleConfig {
            input,
            output_interval: Milliseconds(self.sample_interval_ms),
            cutoff_ratio: self.cutoff_ratio,
            order: self.order,
            debias: self.debias,
        }
    }

    /// Layout of the traces this step emits for `input`.
    pub fn output_layout(&self, input: TraceLayout) -> FlowResult<TraceLayout> {
        let (_, output) = plan(&self.config(input))?;
        Ok(output)
    }
}

/// Replaces every trace with its resampled version.
pub struct ResampleStep {
    params: ResampleParams,
    descriptor: Option<ResampleDescriptor>,
}

impl ResampleStep {
    pub fn new(params: ResampleParams) -> Self {
        Self {
            params,
            descriptor: None,
        }
    }

    pub fn params(&self) -> &ResampleParams {
        &self.params
    }
}

impl TraceStep for ResampleStep {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, input: TraceLayout) -> FlowResult<TraceLayout> {
        let descriptor = ResampleDescriptor::new(self.params.config(input))?;
        let output = descriptor.output_layout();
        self.descriptor = Some(descriptor);
        Ok(output)
    }

    fn process_trace(&self, trace: &mut Trace) -> FlowResult<()> {
        let descriptor = self.descriptor.as_ref().ok_or_else(not_configured)?;
        trace.samples = descriptor.resample_vec(&trace.samples)?;
        Ok(())
    }

    fn teardown(&mut self) -> FlowResult<()> {
        self.descriptor = None;
        Ok(())
    }
}
