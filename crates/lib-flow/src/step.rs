//! Processing step lifecycle.
//!
//! Every step goes through the same sequence:
//! - `configure` once, with the layout of the traces it will receive
//! - `process_trace` for every trace, possibly from several threads at once
//! - `teardown` once
//!
//! [`StepSession`] owns a step and enforces that order.

use crate::error::{FlowError, FlowResult};
use lib_types::trace::{Trace, TraceLayout};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// Step created but not configured.
    Uninitialized,
    /// Layout accepted, filters and descriptors built.
    Configured,
    /// Accepting traces.
    Active,
    /// Teardown completed.
    Closed,
    /// Configuration or processing failed.
    Faulted,
}

/// A trace processing step.
///
/// `configure` receives the layout of incoming traces and returns the layout
/// of the traces the step produces. After that the step is immutable and
/// `process_trace` may run concurrently for different traces.
pub trait TraceStep: Send + Sync {
    /// Registry name of the step.
    fn name(&self) -> &str;

    fn configure(&mut self, input: TraceLayout) -> FlowResult<TraceLayout>;

    fn process_trace(&self, trace: &mut Trace) -> FlowResult<()>;

    fn teardown(&mut self) -> FlowResult<()> {
        Ok(())
    }
}

/// A step together with its lifecycle state.
pub struct StepSession {
    step: Box<dyn TraceStep>,
    state: StepState,
    input: Option<TraceLayout>,
    output: Option<TraceLayout>,
    traces_processed: AtomicU64,
}

impl StepSession {
    /// Wrap an unconfigured step.
    pub fn new(step: Box<dyn TraceStep>) -> Self {
        Self {
            step,
            state: StepState::Uninitialized,
            input: None,
            output: None,
            traces_processed: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        self.step.name()
    }

    /// Get the current state.
    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn input_layout(&self) -> Option<TraceLayout> {
        self.input
    }

    pub fn output_layout(&self) -> Option<TraceLayout> {
        self.output
    }

    /// Number of traces processed so far.
    pub fn traces_processed(&self) -> u64 {
        self.traces_processed.load(Ordering::Relaxed)
    }

    /// Configure the step for `input` traces.
    pub fn configure(&mut self, input: TraceLayout) -> FlowResult<TraceLayout> {
        if self.state != StepState::Uninitialized {
            return Err(FlowError::invalid_state(StepState::Uninitialized, self.state));
        }

        match self.step.configure(input) {
            Ok(output) => {
                tracing::debug!(
                    step = self.step.name(),
                    input_samples = input.num_samples,
                    output_samples = output.num_samples,
                    output_interval_ms = output.sample_interval.0,
                    "step configured"
                );
                self.input = Some(input);
                self.output = Some(output);
                self.state = StepState::Configured;
                Ok(output)
            }
            Err(e) => {
                self.state = StepState::Faulted;
                Err(e)
            }
        }
    }

    /// Start accepting traces.
    pub fn start(&mut self) -> FlowResult<()> {
        if self.state != StepState::Configured {
            return Err(FlowError::invalid_state(StepState::Configured, self.state));
        }
        self.state = StepState::Active;
        Ok(())
    }

    /// Process one trace.
    pub fn process(&self, trace: &mut Trace) -> FlowResult<()> {
        if self.state != StepState::Active {
            return Err(FlowError::invalid_state(StepState::Active, self.state));
        }
        self.step.process_trace(trace)?;
        self.traces_processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Mark the step unusable after a processing failure.
    pub fn fault(&mut self) {
        if self.state != StepState::Closed {
            self.state = StepState::Faulted;
        }
    }

    /// Tear the step down.
    ///
    /// Faulted steps are torn down too, closing an already closed step is
    /// an error.
    pub fn close(&mut self) -> FlowResult<()> {
        if self.state == StepState::Closed {
            return Err(FlowError::invalid_state(StepState::Active, self.state));
        }

        let result = self.step.teardown();
        tracing::debug!(
            step = self.step.name(),
            traces = self.traces_processed(),
            "step closed"
        );
        self.state = StepState::Closed;
        result
    }
}

impl Drop for StepSession {
    fn drop(&mut self) {
        if matches!(self.state, StepState::Configured | StepState::Active) {
            // Best-effort teardown, log but don't propagate errors
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "Error during step teardown");
            }
        }
    }
}
