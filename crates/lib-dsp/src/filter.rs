//! Zero-phase spectral filters applied by FFT.
//!
//! A [`SpectralFilter`] stores the half-spectrum transfer function `H[k]`,
//! `k = 0..=N/2`, for one trace layout. Applying it pads the trace to the
//! power-of-two FFT length, multiplies the spectrum bin by bin and transforms
//! back. The mirror bins are implied by the real-signal inverse transform.
//!
//! The band-shaping helpers in this module are shared by the designature
//! designer and by the anti-alias filter of the resampler.

use crate::error::{DspError, DspResult};
use crate::fft::{amplitude_phase, SpectralTransform, Spectrum};
use crate::taper::{butterworth_highpass, butterworth_lowpass, cosine_weight, Corner, MAX_ORDER};
use lib_types::trace::TraceLayout;
use lib_types::units::Hertz;
use num_complex::Complex64;
use std::io::Write;

/// A notch-suppression window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Notch {
    /// Centre frequency in Hz.
    pub freq_hz: f64,

    /// Half-width of the window in Hz.
    pub width_hz: f64,
}

impl Notch {
    pub fn new(freq_hz: f64, width_hz: f64) -> Self {
        Self { freq_hz, width_hz }
    }
}

/// Immutable frequency-domain filter for one trace layout.
pub struct SpectralFilter {
    layout: TraceLayout,
    transform: SpectralTransform,
    response: Spectrum,
}

impl SpectralFilter {
    /// All-pass filter (`H[k] = 1`).
    pub fn identity(layout: TraceLayout) -> DspResult<Self> {
        validate_layout(&layout)?;
        let transform = SpectralTransform::new(layout.fft_len())?;
        let bins = vec![Complex64::new(1.0, 0.0); transform.num_bins()];
        Self::from_parts(layout, transform, bins)
    }

    pub(crate) fn from_parts(
        layout: TraceLayout,
        transform: SpectralTransform,
        bins: Vec<Complex64>,
    ) -> DspResult<Self> {
        let response = Spectrum::from_bins(bins, transform.len())?;
        if response.bins().iter().any(|c| !c.re.is_finite() || !c.im.is_finite()) {
            return Err(DspError::NumericalInstability(
                "filter response contains non-finite coefficients".into(),
            ));
        }
        Ok(Self {
            layout,
            transform,
            response,
        })
    }

    /// Add a Butterworth low-pass corner.
    pub fn with_low_pass(mut self, corner: Corner) -> DspResult<Self> {
        shape_low_pass(self.response.bins_mut(), &self.transform, &self.layout, corner)?;
        Ok(self)
    }

    /// Add a Butterworth high-pass corner.
    pub fn with_high_pass(mut self, corner: Corner) -> DspResult<Self> {
        shape_high_pass(self.response.bins_mut(), &self.transform, &self.layout, corner)?;
        Ok(self)
    }

    /// Layout the filter was designed for.
    #[inline]
    pub fn layout(&self) -> TraceLayout {
        self.layout
    }

    /// FFT length used when applying the filter.
    #[inline]
    pub fn fft_len(&self) -> usize {
        self.transform.len()
    }

    /// Operative coefficients `H[k]`, `k = 0..=N/2`.
    #[inline]
    pub fn coefficients(&self) -> &[Complex64] {
        self.response.bins()
    }

    /// Magnitude of `H[k]`.
    pub fn gain(&self, k: usize) -> Option<f64> {
        self.response.bins().get(k).map(|c| c.norm())
    }

    /// Frequency of bin `k`.
    #[inline]
    pub fn bin_frequency(&self, k: usize) -> Hertz {
        self.transform.bin_frequency(k, self.layout.sample_interval)
    }

    /// Bin nearest to frequency `f`, clamped to Nyquist.
    pub fn nearest_bin(&self, f: Hertz) -> usize {
        let df = self.transform.bin_spacing(self.layout.sample_interval).0;
        let k = (f.0 / df).round().max(0.0) as usize;
        k.min(self.transform.num_bins() - 1)
    }

    /// Filter a trace in place.
    ///
    /// The trace must have exactly `layout().num_samples` samples.
    pub fn apply(&self, trace: &mut [f32]) -> DspResult<()> {
        if trace.len() != self.layout.num_samples {
            return Err(DspError::LengthMismatch {
                expected: self.layout.num_samples,
                actual: trace.len(),
            });
        }

        let mut spectrum = self.transform.forward_padded(trace)?;
        spectrum.multiply(self.response.bins())?;
        let filtered = self.transform.inverse(&spectrum)?;

        for (dst, &src) in trace.iter_mut().zip(filtered.iter()) {
            *dst = src as f32;
        }
        Ok(())
    }

    /// Time-domain equivalent of the filter, zero time at index 0.
    pub fn impulse_response(&self) -> DspResult<Vec<f64>> {
        self.transform.inverse(&self.response)
    }

    /// Write `index amplitude phase` for every bin.
    pub fn dump<W: Write>(&self, out: &mut W) -> DspResult<()> {
        let (amp, phase) = amplitude_phase(&self.response);
        for (k, (a, p)) in amp.iter().zip(phase.iter()).enumerate() {
            writeln!(out, "{} {} {}", k, a, p)?;
        }
        Ok(())
    }

    /// Write the time-domain filter as `index amplitude` lines.
    ///
    /// Zero time is moved to the middle of the output; indices are relative
    /// to it, so the first line has index `-N/2`.
    pub fn dump_wavelet<W: Write>(&self, out: &mut W) -> DspResult<()> {
        let impulse = self.impulse_response()?;
        let n = impulse.len();
        let half = n / 2;
        for i in 0..n {
            let value = impulse[(i + n - half) % n];
            writeln!(out, "{} {}", i as isize - half as isize, value)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_layout(layout: &TraceLayout) -> DspResult<()> {
    if layout.num_samples == 0 {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    let dt = layout.sample_interval.0;
    if !dt.is_finite() || dt <= 0.0 {
        return Err(DspError::invalid_config(format!(
            "sample interval must be positive, got {} ms",
            dt
        )));
    }
    Ok(())
}

fn validate_corner(layout: &TraceLayout, corner: Corner, label: &str) -> DspResult<()> {
    let nyquist = layout.sample_interval.nyquist().0;
    if !corner.freq_hz.is_finite() || corner.freq_hz < 0.0 || corner.freq_hz > nyquist {
        return Err(DspError::invalid_config(format!(
            "{} corner {} Hz outside [0, {}] Hz",
            label, corner.freq_hz, nyquist
        )));
    }
    if corner.order == 0 || corner.order > MAX_ORDER {
        return Err(DspError::invalid_config(format!(
            "{} order must be in [1, {}], got {}",
            label, MAX_ORDER, corner.order
        )));
    }
    Ok(())
}

pub(crate) fn shape_low_pass(
    bins: &mut [Complex64],
    transform: &SpectralTransform,
    layout: &TraceLayout,
    corner: Corner,
) -> DspResult<()> {
    validate_corner(layout, corner, "low-pass")?;
    for (k, c) in bins.iter_mut().enumerate() {
        let f = transform.bin_frequency(k, layout.sample_interval).0;
        *c *= butterworth_lowpass(f, corner);
    }
    Ok(())
}

pub(crate) fn shape_high_pass(
    bins: &mut [Complex64],
    transform: &SpectralTransform,
    layout: &TraceLayout,
    corner: Corner,
) -> DspResult<()> {
    validate_corner(layout, corner, "high-pass")?;
    for (k, c) in bins.iter_mut().enumerate() {
        let f = transform.bin_frequency(k, layout.sample_interval).0;
        *c *= butterworth_highpass(f, corner);
    }
    Ok(())
}

pub(crate) fn validate_notch(layout: &TraceLayout, notch: Notch) -> DspResult<()> {
    let nyquist = layout.sample_interval.nyquist().0;
    if !notch.freq_hz.is_finite() || notch.freq_hz < 0.0 || notch.freq_hz > nyquist {
        return Err(DspError::invalid_config(format!(
            "notch frequency {} Hz outside [0, {}] Hz",
            notch.freq_hz, nyquist
        )));
    }
    if !notch.width_hz.is_finite() || notch.width_hz <= 0.0 {
        return Err(DspError::invalid_config(format!(
            "notch width must be positive, got {} Hz",
            notch.width_hz
        )));
    }
    Ok(())
}

/// Limit the gain inside `[f0 - width, f0 + width]`.
///
/// The ceiling is a raised-cosine blend between the current gain (at the
/// window edges) and the smaller gain found just outside the window (at the
/// bin nearest the centre). Gains are only ever lowered and phase is
/// untouched.
pub(crate) fn suppress_notch(
    bins: &mut [Complex64],
    transform: &SpectralTransform,
    layout: &TraceLayout,
    notch: Notch,
) -> DspResult<()> {
    validate_notch(layout, notch)?;
    if bins.is_empty() {
        return Ok(());
    }

    let df = transform.bin_spacing(layout.sample_interval).0;
    let last = bins.len() - 1;
    let first_inside = ((notch.freq_hz - notch.width_hz) / df).ceil().max(0.0) as usize;
    let last_inside = (((notch.freq_hz + notch.width_hz) / df).floor() as usize).min(last);
    if first_inside > last_inside {
        tracing::debug!(
            freq_hz = notch.freq_hz,
            width_hz = notch.width_hz,
            "notch narrower than one frequency bin, skipped"
        );
        return Ok(());
    }

    let below = first_inside.checked_sub(1).map(|k| bins[k].norm());
    let above = (last_inside < last).then(|| bins[last_inside + 1].norm());
    let reference = match (below, above) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => bins.iter().map(|c| c.norm()).fold(f64::INFINITY, f64::min),
    };

    // Nearest bin to f0 always takes the full ceiling
    let centre = ((notch.freq_hz / df).round().max(0.0) as usize)
        .clamp(first_inside, last_inside);
    let centre_freq = transform.bin_frequency(centre, layout.sample_interval).0;

    for (k, c) in bins
        .iter_mut()
        .enumerate()
        .take(last_inside + 1)
        .skip(first_inside)
    {
        let gain = c.norm();
        if gain <= 0.0 {
            continue;
        }
        let f = transform.bin_frequency(k, layout.sample_interval).0;
        let w = cosine_weight(f - centre_freq, notch.width_hz);
        let ceiling = w * reference + (1.0 - w) * gain;
        if ceiling < gain {
            *c *= ceiling / gain;
        }
    }

    Ok(())
}
