//! Reference wavelet representation.
//!
//! A wavelet is a short, uniformly sampled signal whose sample times are
//!
//! ```text
//! t[i] = time_first_sample + i * sample_interval,  for i = 0, 1, ..., M-1
//! ```
//!
//! `time_first_sample` may be negative, which is the usual case for
//! zero-phase or acausal signatures where time zero sits in the middle of the
//! buffer.

use crate::units::Milliseconds;
use serde::{Deserialize, Serialize};

/// A uniformly-sampled wavelet anchored to a nominal zero time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wavelet {
    /// Sample values.
    pub samples: Vec<f32>,

    /// Spacing between consecutive samples.
    pub sample_interval: Milliseconds,

    /// Time of the first sample relative to zero time.
    pub time_first_sample: Milliseconds,
}

impl Wavelet {
    /// Create a new wavelet.
    pub fn new(samples: Vec<f32>, sample_interval: Milliseconds, time_first_sample: Milliseconds) -> Self {
        Self {
            samples,
            sample_interval,
            time_first_sample,
        }
    }

    /// A single unit spike at time zero.
    pub fn spike(sample_interval: Milliseconds) -> Self {
        Self::new(vec![1.0], sample_interval, Milliseconds::ZERO)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the zero-time sample.
    ///
    /// May be negative or past the last sample when time zero lies outside
    /// the recorded span.
    #[inline]
    pub fn zero_time_index(&self) -> isize {
        (-self.time_first_sample.0 / self.sample_interval.0).round() as isize
    }

    /// Time of the last sample.
    pub fn time_last_sample(&self) -> Milliseconds {
        if self.samples.is_empty() {
            return self.time_first_sample;
        }
        Milliseconds(self.time_first_sample.0 + (self.samples.len() - 1) as f64 * self.sample_interval.0)
    }

    /// Index of the sample with the largest absolute value.
    pub fn peak_index(&self) -> Option<usize> {
        self.samples
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
    }

    /// Check that every sample is finite.
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|v| v.is_finite())
    }
}
