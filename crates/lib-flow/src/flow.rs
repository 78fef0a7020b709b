//! Flow runner.
//!
//! A flow is an ordered list of steps. Configuring the flow passes the
//! layout of the input gather through every step in turn, so a resample
//! step changes the layout seen by the steps after it. Traces are then
//! pushed through all steps, independently of each other.

use crate::error::{FlowError, FlowResult};
use crate::registry::StepRegistry;
use crate::step::{StepSession, StepState, TraceStep};
use lib_types::trace::{Gather, Trace, TraceLayout};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Outcome of processing one gather.
#[derive(Clone, Debug, Serialize)]
pub struct FlowSummary {
    pub flow: String,
    pub steps: Vec<String>,
    pub traces: usize,
    pub input: TraceLayout,
    pub output: TraceLayout,
    pub elapsed: Duration,
}

/// An ordered list of processing steps.
pub struct Flow {
    name: String,
    sessions: Vec<StepSession>,
    input: Option<TraceLayout>,
    output: Option<TraceLayout>,
    parallel: bool,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sessions: Vec::new(),
            input: None,
            output: None,
            parallel: true,
        }
    }

    /// Process the traces of a gather on the rayon pool (default) or in order.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a step. Only allowed before the flow is configured.
    pub fn push(&mut self, step: Box<dyn TraceStep>) -> FlowResult<()> {
        if self.input.is_some() {
            return Err(FlowError::invalid_state(StepState::Uninitialized, StepState::Configured));
        }
        self.sessions.push(StepSession::new(step));
        Ok(())
    }

    /// Create a step from the registry and append it.
    pub fn push_named(&mut self, registry: &StepRegistry, name: &str, params: &serde_json::Value) -> FlowResult<()> {
        let step = registry.create(name, params)?;
        self.push(step)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn step_names(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.name().to_string()).collect()
    }

    /// Step states in flow order.
    pub fn states(&self) -> Vec<StepState> {
        self.sessions.iter().map(StepSession::state).collect()
    }

    /// Layout delivered by the last step, once configured.
    pub fn output_layout(&self) -> Option<TraceLayout> {
        self.output
    }

    /// Configure every step for `input` traces and start them.
    ///
    /// Returns the layout of the traces the flow delivers.
    pub fn configure(&mut self, input: TraceLayout) -> FlowResult<TraceLayout> {
        if self.input.is_some() {
            return Err(FlowError::invalid_state(StepState::Uninitialized, StepState::Configured));
        }

        let mut layout = input;
        for session in self.sessions.iter_mut() {
            layout = session.configure(layout)?;
        }
        for session in self.sessions.iter_mut() {
            session.start()?;
        }

        tracing::info!(
            flow = %self.name,
            steps = self.sessions.len(),
            input_samples = input.num_samples,
            output_samples = layout.num_samples,
            output_interval_ms = layout.sample_interval.0,
            "flow configured"
        );

        self.input = Some(input);
        self.output = Some(layout);
        Ok(layout)
    }

    /// Push one trace through every step.
    pub fn process_trace(&self, trace: &mut Trace) -> FlowResult<()> {
        for session in &self.sessions {
            session.process(trace)?;
        }
        Ok(())
    }

    /// Process every trace of a gather in place.
    ///
    /// The first failing trace faults every step; the gather is left
    /// partially processed.
    pub fn process_gather(&mut self, gather: &mut Gather) -> FlowResult<FlowSummary> {
        let (input, output) = match (self.input, self.output) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                return Err(FlowError::invalid_state(StepState::Active, StepState::Uninitialized));
            }
        };
        if gather.layout != input {
            return Err(FlowError::LayoutMismatch {
                expected_samples: input.num_samples,
                expected_ms: input.sample_interval.0,
                actual_samples: gather.layout.num_samples,
                actual_ms: gather.layout.sample_interval.0,
            });
        }

        let start = Instant::now();
        let result = if self.parallel {
            gather
                .traces
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(index, trace)| self.process_indexed(index, trace))
        } else {
            gather
                .traces
                .iter_mut()
                .enumerate()
                .try_for_each(|(index, trace)| self.process_indexed(index, trace))
        };

        if let Err(e) = result {
            tracing::warn!(flow = %self.name, error = %e, "flow faulted");
            for session in self.sessions.iter_mut() {
                session.fault();
            }
            return Err(e);
        }

        gather.layout = output;
        let elapsed = start.elapsed();
        tracing::info!(
            flow = %self.name,
            traces = gather.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "gather processed"
        );

        Ok(FlowSummary {
            flow: self.name.clone(),
            steps: self.step_names(),
            traces: gather.len(),
            input,
            output,
            elapsed,
        })
    }

    /// Tear down every step, reporting the first error.
    pub fn close(&mut self) -> FlowResult<()> {
        let mut first = None;
        for session in self.sessions.iter_mut() {
            if session.state() == StepState::Closed {
                continue;
            }
            if let Err(e) = session.close() {
                tracing::warn!(step = session.name(), error = %e, "step teardown failed");
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn process_indexed(&self, index: usize, trace: &mut Trace) -> FlowResult<()> {
        self.process_trace(trace).map_err(|e| FlowError::TraceFailed {
            index,
            source: Box::new(e),
        })
    }
}
