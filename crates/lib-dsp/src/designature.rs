//! Designature filter design by regularised spectral division.
//!
//! The signature wavelet is aligned so that its zero-time sample lands on
//! index 0, padded to the FFT length and transformed. The transfer function
//!
//! ```text
//! H[k] = target[k] / signature[k]
//! ```
//!
//! is evaluated per bin with a white-noise floor added to the signature
//! amplitude, restricted by [`FilterType`], and finally shaped by optional
//! Butterworth corners and notch suppression windows.
//!
//! When no output wavelet is given the target is a zero-phase unit spike.

use crate::error::{DspError, DspResult};
use crate::fft::{amplitude_phase, from_amplitude_phase, SpectralTransform};
use crate::filter::{
    shape_high_pass, shape_low_pass, suppress_notch, validate_layout, validate_notch, Notch,
    SpectralFilter,
};
use crate::taper::Corner;
use lib_types::trace::TraceLayout;
use lib_types::units::Hertz;
use lib_types::wavelet::Wavelet;
use num_complex::Complex64;

/// Relative tolerance when comparing wavelet and trace sample intervals.
const INTERVAL_TOLERANCE: f64 = 1e-6;

/// Which part of the signature the filter removes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    /// Remove both amplitude and phase of the signature.
    #[default]
    AmpPhase,
    /// Remove the amplitude spectrum only, zero phase shift.
    AmpOnly,
    /// Remove the phase spectrum only, unit amplitude.
    PhaseOnly,
}

/// Options fixed when the designer is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesignOptions {
    /// White-noise level in percent of the peak signature amplitude.
    pub white_noise_percent: f64,

    /// Filter restriction.
    pub filter_type: FilterType,

    /// Accept a wavelet sampled at a different interval than the trace.
    pub allow_interval_mismatch: bool,
}

impl Default for DesignOptions {
    fn default() -> Self {
        Self {
            white_noise_percent: 1.0,
            filter_type: FilterType::AmpPhase,
            allow_interval_mismatch: false,
        }
    }
}

/// Amplitude and phase of an aligned wavelet.
#[derive(Clone, Debug)]
struct WaveletSpectrum {
    amp: Vec<f64>,
    phase: Vec<f64>,
}

/// Setup-time builder for a designature [`SpectralFilter`].
pub struct FilterDesigner {
    layout: TraceLayout,
    transform: SpectralTransform,
    signature: WaveletSpectrum,
    target: Option<WaveletSpectrum>,
    options: DesignOptions,
    high_pass: Option<Corner>,
    low_pass: Option<Corner>,
    notches: Vec<Notch>,
}

impl FilterDesigner {
    /// Analyse the signature wavelet for traces of the given layout.
    pub fn new(layout: TraceLayout, signature: &Wavelet, options: DesignOptions) -> DspResult<Self> {
        validate_layout(&layout)?;
        validate_white_noise(options.white_noise_percent)?;

        let transform = SpectralTransform::new(layout.fft_len())?;
        let signature = wavelet_spectrum(&transform, &layout, signature, options.allow_interval_mismatch, "signature")?;

        let peak = signature.amp.iter().copied().fold(0.0, f64::max);
        if peak <= 0.0 {
            return Err(DspError::invalid_config("signature wavelet has no energy"));
        }

        tracing::debug!(
            num_samples = layout.num_samples,
            fft_len = transform.len(),
            white_noise_percent = options.white_noise_percent,
            "designature filter designer created"
        );

        Ok(Self {
            layout,
            transform,
            signature,
            target: None,
            options,
            high_pass: None,
            low_pass: None,
            notches: Vec::new(),
        })
    }

    /// Shape the output towards `wavelet` instead of a zero-phase spike.
    pub fn with_output_wavelet(mut self, wavelet: &Wavelet) -> DspResult<Self> {
        self.set_output_wavelet(wavelet)?;
        Ok(self)
    }

    pub fn set_output_wavelet(&mut self, wavelet: &Wavelet) -> DspResult<()> {
        let spectrum = wavelet_spectrum(
            &self.transform,
            &self.layout,
            wavelet,
            self.options.allow_interval_mismatch,
            "output",
        )?;
        self.target = Some(spectrum);
        Ok(())
    }

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.options.filter_type = filter_type;
    }

    pub fn set_white_noise(&mut self, percent: f64) -> DspResult<()> {
        validate_white_noise(percent)?;
        self.options.white_noise_percent = percent;
        Ok(())
    }

    pub fn set_high_pass(&mut self, freq: Hertz, order: u32) -> DspResult<()> {
        let corner = Corner::new(freq.0, order);
        // Validate now so that setup errors surface at the call site
        let mut scratch = [Complex64::new(1.0, 0.0)];
        shape_high_pass(&mut scratch, &self.transform, &self.layout, corner)?;
        self.high_pass = Some(corner);
        Ok(())
    }

    pub fn set_low_pass(&mut self, freq: Hertz, order: u32) -> DspResult<()> {
        let corner = Corner::new(freq.0, order);
        let mut scratch = [Complex64::new(1.0, 0.0)];
        shape_low_pass(&mut scratch, &self.transform, &self.layout, corner)?;
        self.low_pass = Some(corner);
        Ok(())
    }

    /// Add a notch-suppression window centred at `freq` with half-width `width`.
    pub fn add_notch_suppression(&mut self, freq: Hertz, width: Hertz) -> DspResult<()> {
        let notch = Notch::new(freq.0, width.0);
        validate_notch(&self.layout, notch)?;
        self.notches.push(notch);
        Ok(())
    }

    #[inline]
    pub fn options(&self) -> DesignOptions {
        self.options
    }

    #[inline]
    pub fn layout(&self) -> TraceLayout {
        self.layout
    }

    /// Amplitude spectrum of the aligned signature.
    pub fn signature_amplitude(&self) -> &[f64] {
        &self.signature.amp
    }

    /// Transfer function before band shaping and notch suppression.
    pub fn transfer_function(&self) -> Vec<Complex64> {
        let wn = self.options.white_noise_percent / 100.0;
        let peak = self.signature.amp.iter().copied().fold(0.0, f64::max);
        let floor = wn * peak;

        let n_bins = self.signature.amp.len();
        let mut amp = Vec::with_capacity(n_bins);
        let mut phase = Vec::with_capacity(n_bins);

        for k in 0..n_bins {
            let (target_amp, target_phase) = match &self.target {
                Some(t) => (t.amp[k], t.phase[k]),
                None => (1.0, 0.0),
            };
            let regularized = self.signature.amp[k] + floor;
            // (1 + wn) keeps the gain at the signature peak unregularised
            let ratio = if regularized > f64::MIN_POSITIVE {
                target_amp * (1.0 + wn) / regularized
            } else {
                0.0
            };
            let shift = target_phase - self.signature.phase[k];

            let (a, p) = match self.options.filter_type {
                FilterType::AmpPhase => (ratio, shift),
                FilterType::AmpOnly => (ratio, 0.0),
                FilterType::PhaseOnly => (1.0, shift),
            };
            amp.push(a);
            phase.push(p);
        }

        from_amplitude_phase(&amp, &phase)
    }

    /// Produce the immutable filter.
    pub fn build(&self) -> DspResult<SpectralFilter> {
        let mut bins = self.transfer_function();

        if let Some(corner) = self.high_pass {
            shape_high_pass(&mut bins, &self.transform, &self.layout, corner)?;
        }
        if let Some(corner) = self.low_pass {
            shape_low_pass(&mut bins, &self.transform, &self.layout, corner)?;
        }
        for notch in &self.notches {
            suppress_notch(&mut bins, &self.transform, &self.layout, *notch)?;
        }

        let transform = SpectralTransform::new(self.transform.len())?;
        SpectralFilter::from_parts(self.layout, transform, bins)
    }
}

fn validate_white_noise(percent: f64) -> DspResult<()> {
    if !percent.is_finite() || percent < 0.0 {
        return Err(DspError::invalid_config(format!(
            "white noise must be a non-negative percentage, got {}",
            percent
        )));
    }
    Ok(())
}

/// Check, align, pad and transform a wavelet.
fn wavelet_spectrum(
    transform: &SpectralTransform,
    layout: &TraceLayout,
    wavelet: &Wavelet,
    allow_interval_mismatch: bool,
    label: &str,
) -> DspResult<WaveletSpectrum> {
    if wavelet.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    let dt = wavelet.sample_interval.0;
    if !dt.is_finite() || dt <= 0.0 {
        return Err(DspError::invalid_config(format!(
            "{} wavelet sample interval must be positive, got {} ms",
            label, dt
        )));
    }
    if !wavelet.is_finite() {
        return Err(DspError::invalid_config(format!(
            "{} wavelet contains non-finite samples",
            label
        )));
    }
    if !wavelet.sample_interval.approx_eq(layout.sample_interval, INTERVAL_TOLERANCE) {
        if !allow_interval_mismatch {
            return Err(DspError::IntervalMismatch {
                trace_ms: layout.sample_interval.0,
                wavelet_ms: dt,
            });
        }
        tracing::warn!(
            trace_ms = layout.sample_interval.0,
            wavelet_ms = dt,
            "{} wavelet sample interval differs from trace, using it as if it matched",
            label
        );
    }
    if wavelet.len() > layout.num_samples {
        return Err(DspError::invalid_config(format!(
            "{} wavelet has {} samples, longer than the {}-sample trace",
            label,
            wavelet.len(),
            layout.num_samples
        )));
    }

    let n = transform.len() as isize;
    let zero = wavelet.zero_time_index();
    let mut buffer = vec![0.0f64; transform.len()];
    for (i, &v) in wavelet.samples.iter().enumerate() {
        let idx = (i as isize - zero).rem_euclid(n) as usize;
        buffer[idx] += v as f64;
    }

    let spectrum = transform.forward_f64(buffer)?;
    let (amp, phase) = amplitude_phase(&spectrum);
    Ok(WaveletSpectrum { amp, phase })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::units::Milliseconds;

    fn scenario_layout() -> TraceLayout {
        TraceLayout::new(1024, Milliseconds(2.0))
    }

    fn test_trace(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 * 0.002;
                (t * 90.0).sin() * (-t).exp() + 0.2 * (t * 311.0).cos()
            })
            .collect()
    }

    /// Ricker-like wavelet centred at time zero.
    fn ricker(freq_hz: f64, dt: Milliseconds, half_len: usize) -> Wavelet {
        let samples = (0..=2 * half_len)
            .map(|i| {
                let t = (i as f64 - half_len as f64) * dt.as_seconds();
                let a = (std::f64::consts::PI * freq_hz * t).powi(2);
                ((1.0 - 2.0 * a) * (-a).exp()) as f32
            })
            .collect();
        Wavelet::new(samples, dt, Milliseconds(-(half_len as f64) * dt.0))
    }

    #[test]
    fn test_spike_signature_gives_unit_filter() {
        let layout = scenario_layout();
        let designer = FilterDesigner::new(
            layout,
            &Wavelet::spike(Milliseconds(2.0)),
            DesignOptions::default(),
        )
        .unwrap();
        let filter = designer.build().unwrap();

        for h in filter.coefficients() {
            assert!((h.re - 1.0).abs() < 1e-3);
            assert!(h.im.abs() < 1e-3);
        }

        let original = test_trace(1024);
        let mut trace = original.clone();
        filter.apply(&mut trace).unwrap();
        for (a, b) in original.iter().zip(trace.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_designature_recovers_spike() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(512, dt);
        let signature = Wavelet::new(vec![1.0, 0.5, 0.25], dt, Milliseconds::ZERO);

        let designer = FilterDesigner::new(
            layout,
            &signature,
            DesignOptions {
                white_noise_percent: 0.0,
                ..Default::default()
            },
        )
        .unwrap();
        let filter = designer.build().unwrap();

        // Trace = signature placed at sample 100
        let mut trace = vec![0.0f32; 512];
        trace[100] = 1.0;
        trace[101] = 0.5;
        trace[102] = 0.25;
        filter.apply(&mut trace).unwrap();

        assert!((trace[100] - 1.0).abs() < 1e-3);
        let off_peak = trace
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 100)
            .map(|(_, v)| v.abs())
            .fold(0.0f32, f32::max);
        assert!(off_peak < 1e-3);
    }

    #[test]
    fn test_delayed_signature_removes_delay() {
        let dt = Milliseconds(4.0);
        let layout = TraceLayout::new(256, dt);
        // Spike 4 samples after time zero
        let signature = Wavelet::new(vec![0.0, 0.0, 0.0, 0.0, 1.0], dt, Milliseconds::ZERO);
        let filter = FilterDesigner::new(layout, &signature, DesignOptions::default())
            .unwrap()
            .build()
            .unwrap();

        let mut trace = vec![0.0f32; 256];
        trace[50] = 1.0;
        filter.apply(&mut trace).unwrap();

        assert!((trace[46] - 1.0).abs() < 1e-3);
        assert!(trace[50].abs() < 1e-3);
    }

    #[test]
    fn test_negative_first_sample_time_is_zero_aligned() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(128, dt);
        // Unit spike at time zero, recorded from -4 ms
        let signature = Wavelet::new(vec![0.0, 0.0, 1.0, 0.0], dt, Milliseconds(-4.0));
        let designer = FilterDesigner::new(layout, &signature, DesignOptions::default()).unwrap();

        for h in designer.transfer_function() {
            assert!((h - Complex64::new(1.0, 0.0)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_white_noise_reduces_peak_gain() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(256, dt);
        // Two-sample boxcar has a spectral null at Nyquist
        let signature = Wavelet::new(vec![1.0, 1.0], dt, Milliseconds::ZERO);

        let mut last_peak = f64::INFINITY;
        for percent in [0.5, 1.0, 5.0, 20.0] {
            let designer = FilterDesigner::new(
                layout,
                &signature,
                DesignOptions {
                    white_noise_percent: percent,
                    ..Default::default()
                },
            )
            .unwrap();
            let peak = designer
                .transfer_function()
                .iter()
                .map(|h| h.norm())
                .fold(0.0, f64::max);
            assert!(peak < last_peak, "peak {} did not drop below {}", peak, last_peak);
            last_peak = peak;
        }
    }

    #[test]
    fn test_amp_only_has_zero_phase() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(256, dt);
        let signature = Wavelet::new(vec![0.2, 1.0, -0.4, 0.1], dt, Milliseconds::ZERO);
        let mut designer = FilterDesigner::new(layout, &signature, DesignOptions::default()).unwrap();
        designer.set_filter_type(FilterType::AmpOnly);

        for h in designer.transfer_function() {
            assert!(h.im.abs() < 1e-12);
            assert!(h.re >= 0.0);
        }
    }

    #[test]
    fn test_phase_only_has_unit_gain() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(256, dt);
        let signature = Wavelet::new(vec![0.2, 1.0, -0.4, 0.1], dt, Milliseconds::ZERO);
        let mut designer = FilterDesigner::new(layout, &signature, DesignOptions::default()).unwrap();
        designer.set_filter_type(FilterType::PhaseOnly);

        for h in designer.transfer_function() {
            assert!((h.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_output_wavelet_equal_to_signature_is_identity() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(512, dt);
        let signature = ricker(30.0, dt, 20);

        let designer = FilterDesigner::new(
            layout,
            &signature,
            DesignOptions {
                white_noise_percent: 0.0,
                ..Default::default()
            },
        )
        .unwrap()
        .with_output_wavelet(&signature)
        .unwrap();

        let filter = designer.build().unwrap();
        let original = test_trace(512);
        let mut trace = original.clone();
        filter.apply(&mut trace).unwrap();

        for (a, b) in original.iter().zip(trace.iter()) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_band_pass_corners_applied() {
        let layout = scenario_layout();
        let mut designer = FilterDesigner::new(
            layout,
            &Wavelet::spike(Milliseconds(2.0)),
            DesignOptions::default(),
        )
        .unwrap();
        designer.set_high_pass(Hertz(10.0), 4).unwrap();
        designer.set_low_pass(Hertz(80.0), 6).unwrap();
        let filter = designer.build().unwrap();

        let k_low = filter.nearest_bin(Hertz(10.0));
        let k_high = filter.nearest_bin(Hertz(80.0));
        let g_low = filter.gain(k_low).unwrap();
        let g_high = filter.gain(k_high).unwrap();
        assert!((g_low - crate::taper::CORNER_GAIN).abs() < 0.05);
        assert!((g_high - crate::taper::CORNER_GAIN).abs() < 0.05);
        assert!(filter.gain(0).unwrap() < 1e-9);
        assert!(filter.gain(filter.nearest_bin(Hertz(40.0))).unwrap() > 0.99);
    }

    #[test]
    fn test_corner_out_of_range_is_setup_error() {
        let mut designer = FilterDesigner::new(
            scenario_layout(),
            &Wavelet::spike(Milliseconds(2.0)),
            DesignOptions::default(),
        )
        .unwrap();
        let err = designer.set_low_pass(Hertz(251.0), 4).unwrap_err();
        assert!(err.is_setup_error());
        assert!(designer.set_high_pass(Hertz(-5.0), 4).is_err());
        assert!(designer.add_notch_suppression(Hertz(50.0), Hertz(0.0)).is_err());
        assert!(designer.set_low_pass(Hertz(80.0), crate::taper::MAX_ORDER + 1).is_err());
        assert!(designer.set_high_pass(Hertz(10.0), u32::MAX).is_err());
    }

    #[test]
    fn test_notch_bounds_gain_at_spectral_null() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(1024, dt);
        // Samples one period of 50 Hz apart: nulls at 25 Hz, 75 Hz, ...
        let signature = Wavelet::new(
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.9],
            dt,
            Milliseconds::ZERO,
        );
        let mut designer = FilterDesigner::new(layout, &signature, DesignOptions::default()).unwrap();
        let raw = designer.build().unwrap();
        let k0 = raw.nearest_bin(Hertz(25.0));
        let f0 = raw.bin_frequency(k0);

        let width = Hertz(4.0);
        designer.add_notch_suppression(f0, width).unwrap();
        let filter = designer.build().unwrap();

        let df = filter.bin_frequency(1).0;
        let k_below = ((f0.0 - width.0) / df).ceil() as usize - 1;
        let k_above = ((f0.0 + width.0) / df).floor() as usize + 1;

        let g0 = filter.gain(k0).unwrap();
        assert!(g0 <= filter.gain(k_below).unwrap() + 1e-9);
        assert!(g0 <= filter.gain(k_above).unwrap() + 1e-9);
        assert!(g0 < raw.gain(k0).unwrap());
    }

    #[test]
    fn test_notch_centred_between_bins() {
        let dt = Milliseconds(2.0);
        let layout = TraceLayout::new(1024, dt);
        let signature = Wavelet::new(
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.9],
            dt,
            Milliseconds::ZERO,
        );
        let options = DesignOptions {
            white_noise_percent: 0.1,
            ..Default::default()
        };
        let mut designer = FilterDesigner::new(layout, &signature, options).unwrap();
        let raw = designer.build().unwrap();

        // 25 Hz is 51.2 bins at 0.488 Hz spacing
        let (f0, width) = (25.0, 4.0);
        designer.add_notch_suppression(Hertz(f0), Hertz(width)).unwrap();
        let filter = designer.build().unwrap();

        let df = filter.bin_frequency(1).0;
        let k0 = filter.nearest_bin(Hertz(f0));
        let k_below = ((f0 - width) / df).ceil() as usize - 1;
        let k_above = ((f0 + width) / df).floor() as usize + 1;

        let g0 = filter.gain(k0).unwrap();
        assert!(g0 <= filter.gain(k_below).unwrap() + 1e-9);
        assert!(g0 <= filter.gain(k_above).unwrap() + 1e-9);
        assert!(g0 < raw.gain(k0).unwrap());
    }

    #[test]
    fn test_interval_mismatch() {
        let layout = scenario_layout();
        let wavelet = Wavelet::spike(Milliseconds(4.0));

        let result = FilterDesigner::new(layout, &wavelet, DesignOptions::default());
        assert!(matches!(result, Err(DspError::IntervalMismatch { .. })));

        let result = FilterDesigner::new(
            layout,
            &wavelet,
            DesignOptions {
                allow_interval_mismatch: true,
                ..Default::default()
            },
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_wavelets_rejected() {
        let layout = TraceLayout::new(4, Milliseconds(2.0));
        let empty = Wavelet::new(Vec::new(), Milliseconds(2.0), Milliseconds::ZERO);
        assert!(matches!(
            FilterDesigner::new(layout, &empty, DesignOptions::default()),
            Err(DspError::InsufficientData { .. })
        ));

        let long = Wavelet::new(vec![1.0; 5], Milliseconds(2.0), Milliseconds::ZERO);
        assert!(FilterDesigner::new(layout, &long, DesignOptions::default()).is_err());

        let silent = Wavelet::new(vec![0.0; 3], Milliseconds(2.0), Milliseconds::ZERO);
        assert!(FilterDesigner::new(layout, &silent, DesignOptions::default()).is_err());

        let spike = Wavelet::spike(Milliseconds(2.0));
        let mut designer = FilterDesigner::new(layout, &spike, DesignOptions::default()).unwrap();
        assert!(designer.set_output_wavelet(&long).is_err());
        assert!(designer.set_white_noise(-1.0).is_err());
    }

    #[test]
    fn test_filter_shared_across_threads() {
        let filter = FilterDesigner::new(
            scenario_layout(),
            &Wavelet::spike(Milliseconds(2.0)),
            DesignOptions::default(),
        )
        .unwrap()
        .build()
        .unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let mut trace = test_trace(1024);
                    filter.apply(&mut trace).unwrap();
                });
            }
        });
    }
}
