//! Real-signal FFT wrapper using realfft.
//!
//! This module provides a high-level wrapper around realfft with:
//! - Plan caching for one transform length per instance
//! - Hermitian half-spectrum storage (N/2 + 1 bins)
//! - Amplitude/phase conversion in the seismic sign convention

use crate::error::{DspError, DspResult};
use lib_types::units::{Hertz, Milliseconds};
use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Half spectrum of a real signal.
///
/// Bin 0 is DC and bin `len / 2` is Nyquist. The imaginary parts of both are
/// always zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    bins: Vec<Complex64>,
    len: usize,
}

impl Spectrum {
    /// Wrap half-spectrum bins for a time signal of `len` samples.
    pub fn from_bins(bins: Vec<Complex64>, len: usize) -> DspResult<Self> {
        if bins.len() != len / 2 + 1 {
            return Err(DspError::LengthMismatch {
                expected: len / 2 + 1,
                actual: bins.len(),
            });
        }
        let mut spectrum = Self { bins, len };
        spectrum.clear_edge_imag();
        Ok(spectrum)
    }

    /// Length of the time signal this spectrum belongs to.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored bins (`len / 2 + 1`).
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub fn bins(&self) -> &[Complex64] {
        &self.bins
    }

    #[inline]
    pub fn bins_mut(&mut self) -> &mut [Complex64] {
        &mut self.bins
    }

    pub fn into_bins(self) -> Vec<Complex64> {
        self.bins
    }

    /// Real parts of the stored bins.
    pub fn real(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.re).collect()
    }

    /// Imaginary parts of the stored bins.
    pub fn imag(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.im).collect()
    }

    /// Reconstruct all `len` coefficients from Hermitian symmetry.
    pub fn to_full(&self) -> Vec<Complex64> {
        let mut full = Vec::with_capacity(self.len);
        full.extend_from_slice(&self.bins);
        for k in self.bins.len()..self.len {
            full.push(self.bins[self.len - k].conj());
        }
        full
    }

    /// Multiply bin by bin with another spectrum of the same length.
    pub fn multiply(&mut self, other: &[Complex64]) -> DspResult<()> {
        if other.len() != self.bins.len() {
            return Err(DspError::LengthMismatch {
                expected: self.bins.len(),
                actual: other.len(),
            });
        }
        for (c, h) in self.bins.iter_mut().zip(other.iter()) {
            *c *= *h;
        }
        self.clear_edge_imag();
        Ok(())
    }

    fn clear_edge_imag(&mut self) {
        if let Some(dc) = self.bins.first_mut() {
            dc.im = 0.0;
        }
        if self.len % 2 == 0 {
            if let Some(nyq) = self.bins.last_mut() {
                nyq.im = 0.0;
            }
        }
    }
}

/// Forward/inverse real FFT of one fixed power-of-two length.
///
/// The plans are shared, so a transform can be used from several threads at
/// once; scratch buffers are allocated per call.
pub struct SpectralTransform {
    len: usize,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
}

impl SpectralTransform {
    /// Plan transforms of length `len`.
    pub fn new(len: usize) -> DspResult<Self> {
        if !len.is_power_of_two() || len < 2 {
            return Err(DspError::InvalidFftSize(len));
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);

        Ok(Self {
            len,
            forward,
            inverse,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of half-spectrum bins.
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.len / 2 + 1
    }

    /// Frequency of bin `k` for sample interval `dt`.
    #[inline]
    pub fn bin_frequency(&self, k: usize, dt: Milliseconds) -> Hertz {
        Hertz(k as f64 * 1000.0 / (self.len as f64 * dt.0))
    }

    /// Frequency spacing between bins for sample interval `dt`.
    #[inline]
    pub fn bin_spacing(&self, dt: Milliseconds) -> Hertz {
        self.bin_frequency(1, dt)
    }

    /// Forward transform of exactly `len` samples.
    pub fn forward(&self, samples: &[f32]) -> DspResult<Spectrum> {
        if samples.len() != self.len {
            return Err(DspError::LengthMismatch {
                expected: self.len,
                actual: samples.len(),
            });
        }
        self.forward_padded(samples)
    }

    /// Forward transform of up to `len` samples, zero-padding the remainder.
    pub fn forward_padded(&self, samples: &[f32]) -> DspResult<Spectrum> {
        if samples.len() > self.len {
            return Err(DspError::LengthMismatch {
                expected: self.len,
                actual: samples.len(),
            });
        }

        let mut input = self.forward.make_input_vec();
        for (dst, &src) in input.iter_mut().zip(samples.iter()) {
            *dst = src as f64;
        }
        self.forward_f64(input)
    }

    /// Forward transform of an owned double-precision buffer of length `len`.
    pub fn forward_f64(&self, mut input: Vec<f64>) -> DspResult<Spectrum> {
        if input.len() != self.len {
            return Err(DspError::LengthMismatch {
                expected: self.len,
                actual: input.len(),
            });
        }

        let mut output = self.forward.make_output_vec();
        self.forward
            .process(&mut input, &mut output)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;

        Spectrum::from_bins(output, self.len)
    }

    /// Inverse transform back to `len` time samples.
    pub fn inverse(&self, spectrum: &Spectrum) -> DspResult<Vec<f64>> {
        if spectrum.len() != self.len {
            return Err(DspError::LengthMismatch {
                expected: self.len,
                actual: spectrum.len(),
            });
        }

        let mut input = spectrum.bins().to_vec();
        let mut output = self.inverse.make_output_vec();
        self.inverse
            .process(&mut input, &mut output)
            .map_err(|e| DspError::NumericalInstability(e.to_string()))?;

        // Normalize
        let scale = 1.0 / self.len as f64;
        for x in output.iter_mut() {
            *x *= scale;
        }

        Ok(output)
    }
}

/// Amplitude and phase of a half spectrum.
///
/// Phase follows the seismic convention `atan2(-im, re)`, so a pure delay
/// has positive phase. DC and Nyquist phases are forced to zero.
pub fn amplitude_phase(spectrum: &Spectrum) -> (Vec<f64>, Vec<f64>) {
    let n_bins = spectrum.num_bins();
    let mut amp = Vec::with_capacity(n_bins);
    let mut phase = Vec::with_capacity(n_bins);

    for c in spectrum.bins() {
        amp.push(c.norm());
        phase.push((-c.im).atan2(c.re));
    }

    if n_bins > 0 {
        amp[0] = spectrum.bins()[0].re.abs();
        phase[0] = 0.0;
        if spectrum.len() % 2 == 0 {
            phase[n_bins - 1] = 0.0;
        }
    }

    (amp, phase)
}

/// Build half-spectrum bins from amplitude and seismic-convention phase.
pub fn from_amplitude_phase(amp: &[f64], phase: &[f64]) -> Vec<Complex64> {
    amp.iter()
        .zip(phase.iter())
        .map(|(&a, &p)| Complex64::new(a * p.cos(), -a * p.sin()))
        .collect()
}

/// Magnitude spectrum of a signal zero-padded to the next power of two.
pub fn magnitude_spectrum(signal: &[f32]) -> DspResult<Vec<f64>> {
    let padded = zero_pad_to_pow2(signal);
    let transform = SpectralTransform::new(padded.len())?;
    let spectrum = transform.forward(&padded)?;
    Ok(spectrum.bins().iter().map(|c| c.norm()).collect())
}

/// Zero-pad a signal to the next power of 2 (at least 2).
pub fn zero_pad_to_pow2(signal: &[f32]) -> Vec<f32> {
    zero_pad(signal, signal.len().max(2).next_power_of_two())
}

/// Zero-pad a signal to a specific length.
pub fn zero_pad(signal: &[f32], new_len: usize) -> Vec<f32> {
    let mut result = signal.to_vec();
    if new_len > signal.len() {
        result.resize(new_len, 0.0);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_forward_inverse_roundtrip() {
        let transform = SpectralTransform::new(256).unwrap();

        let signal: Vec<f32> = (0..256)
            .map(|i| {
                let t = i as f64 / 256.0;
                ((2.0 * PI * 7.0 * t).sin() + 0.3 * (2.0 * PI * 31.0 * t).cos()) as f32
            })
            .collect();

        let spectrum = transform.forward(&signal).unwrap();
        assert_eq!(spectrum.num_bins(), 129);

        let recovered = transform.inverse(&spectrum).unwrap();
        for (orig, rec) in signal.iter().zip(recovered.iter()) {
            assert!((*orig as f64 - rec).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dc_and_nyquist_are_real() {
        let transform = SpectralTransform::new(8).unwrap();
        let spectrum = transform
            .forward(&[1.0, -2.0, 3.0, 0.5, 0.0, 1.0, -1.0, 2.0])
            .unwrap();

        assert_eq!(spectrum.imag()[0], 0.0);
        assert_eq!(spectrum.imag()[4], 0.0);
        assert!((spectrum.real()[0] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_full_spectrum_is_hermitian() {
        let transform = SpectralTransform::new(16).unwrap();
        let signal: Vec<f32> = (0..16).map(|i| (i as f32 * 0.37).sin()).collect();
        let full = transform.forward(&signal).unwrap().to_full();

        assert_eq!(full.len(), 16);
        for k in 1..8 {
            assert!((full[k] - full[16 - k].conj()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_delay_has_positive_phase() {
        let transform = SpectralTransform::new(64).unwrap();
        let mut spike = vec![0.0f32; 64];
        spike[2] = 1.0;

        let (amp, phase) = amplitude_phase(&transform.forward(&spike).unwrap());

        assert!(amp.iter().all(|a| (a - 1.0).abs() < 1e-12));
        assert_eq!(phase[0], 0.0);
        assert_eq!(phase[32], 0.0);
        // Delay of two samples: phase = 2 * pi * k * 2 / N
        let expected = 2.0 * PI * 3.0 * 2.0 / 64.0;
        assert!((phase[3] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_amplitude_phase_inverse() {
        let transform = SpectralTransform::new(32).unwrap();
        let signal: Vec<f32> = (0..32).map(|i| ((i * i) % 7) as f32 - 3.0).collect();
        let spectrum = transform.forward(&signal).unwrap();

        let (amp, phase) = amplitude_phase(&spectrum);
        let rebuilt = from_amplitude_phase(&amp, &phase);

        // DC and Nyquist lose their sign; every other bin is exact
        for k in 1..16 {
            assert!((rebuilt[k] - spectrum.bins()[k]).norm() < 1e-9);
        }
        assert!((rebuilt[0].re - spectrum.bins()[0].re.abs()).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_fft_size() {
        assert!(matches!(
            SpectralTransform::new(100),
            Err(DspError::InvalidFftSize(100))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let transform = SpectralTransform::new(16).unwrap();
        let result = transform.forward(&[0.0; 10]);
        assert!(matches!(
            result,
            Err(DspError::LengthMismatch { expected: 16, actual: 10 })
        ));

        // Padded variant accepts shorter input
        assert!(transform.forward_padded(&[0.0; 10]).is_ok());
    }

    #[test]
    fn test_bin_frequency() {
        let transform = SpectralTransform::new(1024).unwrap();
        let dt = Milliseconds(2.0);
        assert!((transform.bin_frequency(512, dt).0 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad(&[1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(zero_pad(&[1.0, 2.0, 3.0], 2).len(), 3);
        assert_eq!(zero_pad_to_pow2(&[1.0; 5]).len(), 8);
        assert_eq!(zero_pad_to_pow2(&[1.0]).len(), 2);
    }

    #[test]
    fn test_magnitude_spectrum_of_spike() {
        let mags = magnitude_spectrum(&[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(mags.len(), 3);
        assert!(mags.iter().all(|m| (m - 1.0).abs() < 1e-12));
    }
}
