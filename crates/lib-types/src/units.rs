//! Physical units with type safety.
//!
//! Seismic traces are sampled in milliseconds while filter corners are
//! specified in Hertz. These newtypes keep the two from being mixed up.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Time in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Milliseconds(pub f64);

impl Milliseconds {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn as_seconds(&self) -> f64 {
        self.0 * 1e-3
    }

    /// Nyquist frequency for a sample interval of this length.
    #[inline]
    pub fn nyquist(&self) -> Hertz {
        Hertz(500.0 / self.0)
    }

    /// Sampling rate for a sample interval of this length.
    #[inline]
    pub fn sample_rate(&self) -> Hertz {
        Hertz(1000.0 / self.0)
    }

    /// Check if two intervals agree within a relative tolerance.
    #[inline]
    pub fn approx_eq(&self, other: Milliseconds, relative_tolerance: f64) -> bool {
        let max = self.0.abs().max(other.0.abs());
        if max == 0.0 {
            return self.0 == other.0;
        }
        (self.0 - other.0).abs() / max < relative_tolerance
    }
}

impl Add for Milliseconds {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Milliseconds {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Milliseconds {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Milliseconds {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}

impl Div<Milliseconds> for Milliseconds {
    type Output = f64;
    fn div(self, rhs: Milliseconds) -> f64 {
        self.0 / rhs.0
    }
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Add for Hertz {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Hertz {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Hertz {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Hertz {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self(self.0 / rhs)
    }
}
