//! Frequency-domain gain shapes.
//!
//! Band-limiting corners use Butterworth magnitude responses so that the
//! corner frequency is always the -3 dB point and the order controls the
//! steepness of the roll-off. Notch suppression uses a raised-cosine weight.

use std::f64::consts::PI;

/// Amplitude at the corner frequency of every shape in this module.
pub const CORNER_GAIN: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Highest accepted Butterworth order.
pub const MAX_ORDER: u32 = 64;

/// A band-limiting corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    /// -3 dB frequency in Hz.
    pub freq_hz: f64,

    /// Butterworth order (number of poles).
    pub order: u32,
}

impl Corner {
    pub fn new(freq_hz: f64, order: u32) -> Self {
        Self { freq_hz, order }
    }
}

/// Butterworth low-pass magnitude at frequency `f`.
#[inline]
pub fn butterworth_lowpass(f: f64, corner: Corner) -> f64 {
    if corner.freq_hz <= 0.0 {
        return if f <= 0.0 { CORNER_GAIN } else { 0.0 };
    }
    let ratio = (f / corner.freq_hz).abs();
    1.0 / (1.0 + ratio.powi(2 * corner.order as i32)).sqrt()
}

/// Butterworth high-pass magnitude at frequency `f`.
#[inline]
pub fn butterworth_highpass(f: f64, corner: Corner) -> f64 {
    if corner.freq_hz <= 0.0 {
        return 1.0;
    }
    if f <= 0.0 {
        return 0.0;
    }
    let ratio = corner.freq_hz / f.abs();
    1.0 / (1.0 + ratio.powi(2 * corner.order as i32)).sqrt()
}

/// Raised-cosine weight: 1 at the centre, falling to 0 at `half_width`.
///
/// Zero outside `[-half_width, half_width]`.
#[inline]
pub fn cosine_weight(offset: f64, half_width: f64) -> f64 {
    if half_width <= 0.0 || offset.abs() >= half_width {
        return 0.0;
    }
    0.5 * (1.0 + (PI * offset / half_width).cos())
}
