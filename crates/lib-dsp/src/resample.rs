//! Trace resampling to a new sample interval.
//!
//! Upsampling interpolates each output sample from the three input samples
//! around it. Downsampling first removes everything above the new Nyquist
//! frequency with a Butterworth low-pass [`SpectralFilter`] and then keeps
//! every `ratio`-th sample, where `ratio` is always a power of two.

use crate::error::{DspError, DspResult};
use crate::filter::{validate_layout, SpectralFilter};
use crate::taper::{Corner, MAX_ORDER};
use lib_types::trace::TraceLayout;
use lib_types::units::Milliseconds;

/// Default anti-alias corner as a fraction of the output Nyquist frequency.
pub const DEFAULT_CUTOFF_RATIO: f64 = 0.8;

/// Default Butterworth order of the anti-alias filter.
pub const DEFAULT_ORDER: u32 = 10;

/// Relative tolerance below which two sample intervals count as equal.
const INTERVAL_TOLERANCE: f64 = 1e-6;

/// Requested resampling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResampleConfig {
    /// Layout of the incoming traces.
    pub input: TraceLayout,

    /// Requested output sample interval.
    pub output_interval: Milliseconds,

    /// Anti-alias corner relative to the output Nyquist frequency, in `(0, 1]`.
    pub cutoff_ratio: f64,

    /// Anti-alias Butterworth order.
    pub order: u32,

    /// Remove the mean of the non-zero samples before anti-alias filtering.
    pub debias: bool,
}

impl ResampleConfig {
    pub fn new(input: TraceLayout, output_interval: Milliseconds) -> Self {
        Self {
            input,
            output_interval,
            cutoff_ratio: DEFAULT_CUTOFF_RATIO,
            order: DEFAULT_ORDER,
            debias: false,
        }
    }
}

/// What a descriptor does to each trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResampleMode {
    /// Intervals are equal, samples are copied.
    Unchanged,
    /// Finer output interval, quadratic interpolation.
    Upsample,
    /// Coarser output interval, anti-alias filter then decimation.
    Downsample { ratio: usize },
}

/// Immutable resampling plan for one input layout.
pub struct ResampleDescriptor {
    config: ResampleConfig,
    output: TraceLayout,
    mode: ResampleMode,
    anti_alias: Option<SpectralFilter>,
}

impl ResampleDescriptor {
    pub fn new(config: ResampleConfig) -> DspResult<Self> {
        let (mode, output) = plan(&config)?;
        let dt_in = config.input.sample_interval;
        let dt_out = config.output_interval;

        let anti_alias = match mode {
            ResampleMode::Unchanged => {
                tracing::warn!(
                    sample_interval_ms = dt_in.0,
                    "input and output sample intervals are equal, traces pass through unchanged"
                );
                None
            }
            ResampleMode::Upsample => {
                tracing::debug!(
                    n_in = config.input.num_samples,
                    n_out = output.num_samples,
                    dt_in = dt_in.0,
                    dt_out = dt_out.0,
                    "upsampling"
                );
                None
            }
            ResampleMode::Downsample { ratio } => {
                if !output.sample_interval.approx_eq(dt_out, INTERVAL_TOLERANCE) {
                    tracing::warn!(
                        requested_ms = dt_out.0,
                        delivered_ms = output.sample_interval.0,
                        ratio,
                        "decimation ratio rounded up to a power of two, output interval differs from request"
                    );
                }
                let cutoff = dt_in.nyquist().0 / ratio as f64 * config.cutoff_ratio;
                let filter = SpectralFilter::identity(config.input)?
                    .with_low_pass(Corner::new(cutoff, config.order))?;
                tracing::debug!(
                    n_in = config.input.num_samples,
                    n_out = output.num_samples,
                    ratio,
                    cutoff_hz = cutoff,
                    "downsampling"
                );
                Some(filter)
            }
        };

        Ok(Self {
            config,
            output,
            mode,
            anti_alias,
        })
    }

    #[inline]
    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    #[inline]
    pub fn input_layout(&self) -> TraceLayout {
        self.config.input
    }

    /// Layout of the traces this descriptor delivers.
    #[inline]
    pub fn output_layout(&self) -> TraceLayout {
        self.output
    }

    #[inline]
    pub fn mode(&self) -> ResampleMode {
        self.mode
    }

    /// Resample `input` into `output`.
    ///
    /// Both buffers must match the input and output layouts exactly.
    pub fn resample(&self, input: &[f32], output: &mut [f32]) -> DspResult<()> {
        if input.len() != self.config.input.num_samples {
            return Err(DspError::LengthMismatch {
                expected: self.config.input.num_samples,
                actual: input.len(),
            });
        }
        if output.len() != self.output.num_samples {
            return Err(DspError::LengthMismatch {
                expected: self.output.num_samples,
                actual: output.len(),
            });
        }

        match self.mode {
            ResampleMode::Unchanged => output.copy_from_slice(input),
            ResampleMode::Upsample => {
                let step = self.output.sample_interval.0 / self.config.input.sample_interval.0;
                for (i, out) in output.iter_mut().enumerate() {
                    *out = quadratic_at(input, i as f64 * step) as f32;
                }
            }
            ResampleMode::Downsample { ratio } => {
                let mut staging = input.to_vec();
                let bias = if self.config.debias {
                    non_zero_mean(&staging)
                } else {
                    0.0
                };
                if bias != 0.0 {
                    for x in staging.iter_mut() {
                        *x -= bias;
                    }
                }

                if let Some(filter) = &self.anti_alias {
                    filter.apply(&mut staging)?;
                }

                for (i, out) in output.iter_mut().enumerate() {
                    *out = staging[i * ratio] + bias;
                }
            }
        }
        Ok(())
    }

    /// Resample into a newly allocated buffer.
    pub fn resample_vec(&self, input: &[f32]) -> DspResult<Vec<f32>> {
        let mut output = vec![0.0; self.output.num_samples];
        self.resample(input, &mut output)?;
        Ok(output)
    }
}

/// Smallest power of two at least `dt_out / dt_in`.
/// Validate `config` and work out the mode and output layout it yields,
/// without designing the anti-alias filter.
pub fn plan(config: &ResampleConfig) -> DspResult<(ResampleMode, TraceLayout)> {
    validate_layout(&config.input)?;
    let dt_in = config.input.sample_interval;
    let dt_out = config.output_interval;
    if !dt_out.0.is_finite() || dt_out.0 <= 0.0 {
        return Err(DspError::invalid_config(format!(
            "output sample interval must be positive, got {} ms",
            dt_out.0
        )));
    }
    if !(config.cutoff_ratio > 0.0 && config.cutoff_ratio <= 1.0) {
        return Err(DspError::invalid_config(format!(
            "cutoff ratio must be in (0, 1], got {}",
            config.cutoff_ratio
        )));
    }
    if config.order == 0 || config.order > MAX_ORDER {
        return Err(DspError::invalid_config(format!(
            "anti-alias order must be in [1, {}], got {}",
            MAX_ORDER, config.order
        )));
    }

    let n_in = config.input.num_samples;

    if dt_out.approx_eq(dt_in, INTERVAL_TOLERANCE) {
        return Ok((ResampleMode::Unchanged, config.input));
    }

    if dt_out.0 < dt_in.0 {
        let n_out = (n_in as f64 * dt_in.0 / dt_out.0).round() as usize;
        return Ok((ResampleMode::Upsample, TraceLayout::new(n_out, dt_out)));
    }

    let ratio = decimation_ratio(dt_in, dt_out);
    let n_out = (n_in as f64 / ratio as f64).round() as usize;
    if n_out == 0 {
        return Err(DspError::InsufficientData {
            needed: ratio,
            got: n_in,
        });
    }
    Ok((
        ResampleMode::Downsample { ratio },
        TraceLayout::new(n_out, dt_in * ratio as f64),
    ))
}

fn decimation_ratio(dt_in: Milliseconds, dt_out: Milliseconds) -> usize {
    let exact = dt_out.0 / dt_in.0;
    // Treat ratios within rounding noise of an integer as that integer
    let whole = (exact - INTERVAL_TOLERANCE).ceil().max(1.0) as usize;
    whole.next_power_of_two()
}

/// Mean of the non-zero samples, 0 if there are none.
fn non_zero_mean(samples: &[f32]) -> f32 {
    let (sum, count) = samples
        .iter()
        .filter(|&&x| x != 0.0)
        .fold((0.0f64, 0usize), |(s, c), &x| (s + x as f64, c + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

/// Three-point quadratic interpolation at fractional index `x`.
///
/// `x` is clamped to the sampled range; the parabola passes through the
/// nearest sample and its two neighbours.
pub fn quadratic_at(samples: &[f32], x: f64) -> f64 {
    let n = samples.len();
    match n {
        0 => return 0.0,
        1 => return samples[0] as f64,
        2 => {
            let u = x.clamp(0.0, 1.0);
            return samples[0] as f64 + u * (samples[1] as f64 - samples[0] as f64);
        }
        _ => {}
    }

    let x = x.clamp(0.0, (n - 1) as f64);
    let k = (x.round() as usize).clamp(1, n - 2);
    let u = x - k as f64;

    let y_prev = samples[k - 1] as f64;
    let y0 = samples[k] as f64;
    let y_next = samples[k + 1] as f64;

    y0 + 0.5 * u * (y_next - y_prev) + 0.5 * u * u * (y_next - 2.0 * y0 + y_prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, layout: &TraceLayout) -> Vec<f32> {
        (0..layout.num_samples)
            .map(|i| {
                let t = i as f64 * layout.sample_interval.as_seconds();
                (2.0 * PI * freq_hz * t).sin() as f32
            })
            .collect()
    }

    #[test]
    fn test_quadratic_is_exact_for_parabola() {
        let samples: Vec<f32> = (0..6).map(|i| (i * i) as f32 - 2.0 * i as f32).collect();
        for &x in &[0.0, 0.5, 1.25, 2.7, 4.5, 5.0] {
            let expected = x * x - 2.0 * x;
            assert!((quadratic_at(&samples, x) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_quadratic_short_inputs() {
        assert_eq!(quadratic_at(&[], 0.3), 0.0);
        assert_eq!(quadratic_at(&[2.0], 0.3), 2.0);
        assert!((quadratic_at(&[0.0, 1.0], 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_upsample_sample_count() {
        let input = TraceLayout::new(1001, Milliseconds(4.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(1.0))).unwrap();

        assert_eq!(descriptor.mode(), ResampleMode::Upsample);
        assert_eq!(descriptor.output_layout().num_samples, 4004);
        assert_eq!(descriptor.output_layout().sample_interval, Milliseconds(1.0));
    }

    #[test]
    fn test_upsample_preserves_samples_on_grid() {
        let input = TraceLayout::new(250, Milliseconds(4.0));
        let trace = sine(10.0, &input);
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(2.0))).unwrap();
        let out = descriptor.resample_vec(&trace).unwrap();

        assert_eq!(out.len(), 500);
        for i in 0..trace.len() {
            assert!((out[2 * i] - trace[i]).abs() < 1e-6);
        }
        // Midpoints of a slow sine are close to the true value
        let t = 3.0 * 0.002;
        let truth = (2.0 * PI * 10.0 * t).sin() as f32;
        assert!((out[3] - truth).abs() < 5e-3);
    }

    #[test]
    fn test_downsample_sample_count() {
        let input = TraceLayout::new(1001, Milliseconds(1.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(4.0))).unwrap();

        assert_eq!(descriptor.mode(), ResampleMode::Downsample { ratio: 4 });
        // round(1001 * 1 / 4)
        assert_eq!(descriptor.output_layout().num_samples, 250);
    }

    #[test]
    fn test_downsample_ratio_rounds_to_power_of_two() {
        let input = TraceLayout::new(600, Milliseconds(1.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(3.0))).unwrap();

        assert_eq!(descriptor.mode(), ResampleMode::Downsample { ratio: 4 });
        let out = descriptor.output_layout();
        assert_eq!(out.sample_interval, Milliseconds(4.0));
        assert_eq!(out.num_samples, 150);
    }

    #[test]
    fn test_downsample_keeps_low_frequencies() {
        let input = TraceLayout::new(1024, Milliseconds(1.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(2.0))).unwrap();

        // 20 Hz is far below the 200 Hz anti-alias corner
        let trace = sine(20.0, &input);
        let out = descriptor.resample_vec(&trace).unwrap();
        for i in 50..450 {
            assert!((out[i] - trace[2 * i]).abs() < 0.02, "sample {}", i);
        }
    }

    #[test]
    fn test_downsample_removes_aliasing_frequencies() {
        let input = TraceLayout::new(1024, Milliseconds(1.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(4.0))).unwrap();

        // 200 Hz would alias to 50 Hz at 4 ms
        let trace = sine(200.0, &input);
        let out = descriptor.resample_vec(&trace).unwrap();
        let peak = out[20..236].iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!(peak < 0.05, "aliased energy {}", peak);
    }

    #[test]
    fn test_debias_restores_offset() {
        let input = TraceLayout::new(512, Milliseconds(2.0));
        let mut config = ResampleConfig::new(input, Milliseconds(4.0));
        config.debias = true;
        let descriptor = ResampleDescriptor::new(config).unwrap();

        let trace = vec![3.0f32; 512];
        let out = descriptor.resample_vec(&trace).unwrap();
        for x in out {
            assert!((x - 3.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_equal_intervals_copy() {
        let input = TraceLayout::new(64, Milliseconds(2.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(2.0))).unwrap();
        assert_eq!(descriptor.mode(), ResampleMode::Unchanged);

        let trace: Vec<f32> = (0..64).map(|i| i as f32).collect();
        assert_eq!(descriptor.resample_vec(&trace).unwrap(), trace);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let input = TraceLayout::new(64, Milliseconds(2.0));

        let mut config = ResampleConfig::new(input, Milliseconds(4.0));
        config.cutoff_ratio = 1.5;
        assert!(ResampleDescriptor::new(config).is_err());

        let mut config = ResampleConfig::new(input, Milliseconds(4.0));
        config.order = 0;
        assert!(ResampleDescriptor::new(config).is_err());

        config.order = MAX_ORDER + 1;
        assert!(matches!(ResampleDescriptor::new(config), Err(DspError::InvalidConfig(_))));
        assert!(plan(&config).is_err());

        config.order = MAX_ORDER;
        let descriptor = ResampleDescriptor::new(config).unwrap();
        assert_eq!(descriptor.mode(), ResampleMode::Downsample { ratio: 2 });

        let config = ResampleConfig::new(input, Milliseconds(0.0));
        assert!(matches!(ResampleDescriptor::new(config), Err(DspError::InvalidConfig(_))));
    }

    #[test]
    fn test_plan_matches_descriptor() {
        let input = TraceLayout::new(1000, Milliseconds(2.0));
        for dt_out in [1.0, 2.0, 3.0, 4.0, 8.0] {
            let config = ResampleConfig::new(input, Milliseconds(dt_out));
            let (mode, output) = plan(&config).unwrap();
            let descriptor = ResampleDescriptor::new(config).unwrap();
            assert_eq!(mode, descriptor.mode());
            assert_eq!(output, descriptor.output_layout());
        }
    }

    #[test]
    fn test_buffer_length_checked() {
        let input = TraceLayout::new(64, Milliseconds(2.0));
        let descriptor = ResampleDescriptor::new(ResampleConfig::new(input, Milliseconds(4.0))).unwrap();
        let mut out = vec![0.0; 32];
        assert!(matches!(
            descriptor.resample(&[0.0; 10], &mut out),
            Err(DspError::LengthMismatch { expected: 64, actual: 10 })
        ));
        let mut wrong = vec![0.0; 31];
        assert!(descriptor.resample(&[0.0; 64], &mut wrong).is_err());
    }
}
