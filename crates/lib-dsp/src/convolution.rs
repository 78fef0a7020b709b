//! Direct time-domain convolution with a short wavelet.
//!
//! The output keeps the length of the input trace. The wavelet's zero-time
//! sample is placed on the output sample being computed, so convolving a
//! unit impulse at index `k` reproduces the wavelet with its time zero at `k`.

use crate::error::{DspError, DspResult};
use crate::filter::validate_layout;
use lib_types::trace::TraceLayout;
use lib_types::wavelet::Wavelet;

/// Convolution of fixed-layout traces with one wavelet.
pub struct ConvolutionEngine {
    layout: TraceLayout,
    wavelet: Vec<f32>,
    zero_time_offset: isize,
}

impl ConvolutionEngine {
    /// Create an engine for `wavelet` whose zero-time sample is at index
    /// `zero_time_offset`.
    pub fn new(layout: TraceLayout, wavelet: &[f32], zero_time_offset: isize) -> DspResult<Self> {
        validate_layout(&layout)?;
        if wavelet.is_empty() {
            return Err(DspError::InsufficientData { needed: 1, got: 0 });
        }
        if wavelet.iter().any(|x| !x.is_finite()) {
            return Err(DspError::invalid_config("convolution wavelet contains non-finite samples"));
        }

        tracing::debug!(
            num_samples = layout.num_samples,
            wavelet_len = wavelet.len(),
            zero_time_offset,
            "convolution engine created"
        );

        Ok(Self {
            layout,
            wavelet: wavelet.to_vec(),
            zero_time_offset,
        })
    }

    /// Create an engine from a wavelet with a time axis.
    ///
    /// The wavelet must be sampled at the trace interval.
    pub fn from_wavelet(layout: TraceLayout, wavelet: &Wavelet) -> DspResult<Self> {
        if !wavelet.sample_interval.approx_eq(layout.sample_interval, 1e-6) {
            return Err(DspError::IntervalMismatch {
                trace_ms: layout.sample_interval.0,
                wavelet_ms: wavelet.sample_interval.0,
            });
        }
        Self::new(layout, &wavelet.samples, wavelet.zero_time_index())
    }

    #[inline]
    pub fn layout(&self) -> TraceLayout {
        self.layout
    }

    #[inline]
    pub fn wavelet(&self) -> &[f32] {
        &self.wavelet
    }

    #[inline]
    pub fn zero_time_offset(&self) -> isize {
        self.zero_time_offset
    }

    /// Convolve `input` into `output`.
    ///
    /// `output[i] = sum_j input[j] * wavelet[i + offset - j]`, terms with a
    /// wavelet index outside the wavelet contribute nothing.
    pub fn convolve(&self, input: &[f32], output: &mut [f32]) -> DspResult<()> {
        let n = self.layout.num_samples;
        if input.len() != n {
            return Err(DspError::LengthMismatch {
                expected: n,
                actual: input.len(),
            });
        }
        if output.len() != n {
            return Err(DspError::LengthMismatch {
                expected: n,
                actual: output.len(),
            });
        }

        let m = self.wavelet.len() as isize;
        for (i, out) in output.iter_mut().enumerate() {
            // Wavelet index i + offset - j must lie in [0, m)
            let shift = i as isize + self.zero_time_offset;
            let j_start = (shift - m + 1).max(0);
            let j_end = (shift + 1).min(n as isize);

            let mut acc = 0.0f64;
            for j in j_start..j_end {
                acc += input[j as usize] as f64 * self.wavelet[(shift - j) as usize] as f64;
            }
            *out = acc as f32;
        }
        Ok(())
    }

    /// Convolve a trace in place.
    pub fn convolve_in_place(&self, trace: &mut [f32]) -> DspResult<()> {
        let input = trace.to_vec();
        self.convolve(&input, trace)
    }
}

/// Full linear convolution, output length `signal.len() + kernel.len() - 1`.
pub fn direct_convolve(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let out_len = signal.len() + kernel.len() - 1;
    let mut output = vec![0.0; out_len];

    for (i, &s) in signal.iter().enumerate() {
        for (j, &k) in kernel.iter().enumerate() {
            output[i + j] += s * k;
        }
    }

    output
}
