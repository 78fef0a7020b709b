//! Seismic trace and gather representation.
//!
//! The processing steps only ever see the sample buffer of a trace. The
//! shape of that buffer is described by a [`TraceLayout`] which is fixed when
//! a step is configured and checked again every time a trace is processed.

use crate::units::Milliseconds;
use serde::{Deserialize, Serialize};

/// Number of samples and sample interval shared by every trace in a flow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceLayout {
    /// Samples per trace.
    pub num_samples: usize,

    /// Spacing between samples.
    pub sample_interval: Milliseconds,
}

impl TraceLayout {
    pub fn new(num_samples: usize, sample_interval: Milliseconds) -> Self {
        Self {
            num_samples,
            sample_interval,
        }
    }

    /// Smallest power of two that holds one trace.
    #[inline]
    pub fn fft_len(&self) -> usize {
        self.num_samples.max(1).next_power_of_two()
    }
}

/// A single seismic trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Sample values.
    pub samples: Vec<f32>,
}

impl Trace {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn zeros(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A collection of traces sharing one layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gather {
    pub layout: TraceLayout,
    pub traces: Vec<Trace>,
}

impl Gather {
    pub fn new(layout: TraceLayout, traces: Vec<Trace>) -> Self {
        Self { layout, traces }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Index of the first trace whose length disagrees with the layout.
    pub fn first_inconsistent(&self) -> Option<usize> {
        self.traces
            .iter()
            .position(|t| t.len() != self.layout.num_samples)
    }
}
