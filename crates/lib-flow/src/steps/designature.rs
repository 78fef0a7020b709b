//! Designature step: removes a signature wavelet from every trace.

use super::not_configured;
use crate::error::FlowResult;
use crate::step::TraceStep;
use lib_dsp::{DesignOptions, FilterDesigner, FilterType, SpectralFilter};
use lib_types::trace::{Trace, TraceLayout};
use lib_types::units::Hertz;
use lib_types::wavelet::Wavelet;
use serde::{Deserialize, Serialize};

/// Registry name.
pub const NAME: &str = "designature";

/// Filter restriction as written in parameter files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    AmpPhase,
    AmpOnly,
    PhaseOnly,
}

impl From<FilterKind> for FilterType {
    fn from(kind: FilterKind) -> Self {
        match kind {
            FilterKind::AmpPhase => FilterType::AmpPhase,
            FilterKind::AmpOnly => FilterType::AmpOnly,
            FilterKind::PhaseOnly => FilterType::PhaseOnly,
        }
    }
}

/// Butterworth corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerParams {
    pub freq_hz: f64,
    pub order: u32,
}

/// Notch suppression window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotchParams {
    pub freq_hz: f64,
    pub width_hz: f64,
}

/// Designature parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignatureParams {
    /// Wavelet to remove.
    pub signature: Wavelet,

    /// Wavelet to shape towards, zero-phase spike when absent.
    #[serde(default)]
    pub output_wavelet: Option<Wavelet>,

    #[serde(default = "default_white_noise")]
    pub white_noise_percent: f64,

    #[serde(default)]
    pub filter_type: FilterKind,

    #[serde(default)]
    pub high_pass: Option<CornerParams>,

    #[serde(default)]
    pub low_pass: Option<CornerParams>,

    #[serde(default)]
    pub notches: Vec<NotchParams>,

    #[serde(default)]
    pub allow_interval_mismatch: bool,
}

fn default_white_noise() -> f64 {
    DesignOptions::default().white_noise_percent
}

impl DesignatureParams {
    /// Parameters with defaults for everything but the signature.
    pub fn new(signature: Wavelet) -> Self {
        Self {
            signature,
            output_wavelet: None,
            white_noise_percent: default_white_noise(),
            filter_type: FilterKind::default(),
            high_pass: None,
            low_pass: None,
            notches: Vec::new(),
            allow_interval_mismatch: false,
        }
    }

    /// Build the designature filter for traces of `layout`.
    pub fn design(&self, layout: TraceLayout) -> FlowResult<SpectralFilter> {
        let options = DesignOptions {
            white_noise_percent: self.white_noise_percent,
            filter_type: self.filter_type.into(),
            allow_interval_mismatch: self.allow_interval_mismatch,
        };

        let mut designer = FilterDesigner::new(layout, &self.signature, options)?;
        if let Some(output) = &self.output_wavelet {
            designer.set_output_wavelet(output)?;
        }
        if let Some(c) = self.high_pass {
            designer.set_high_pass(Hertz(c.freq_hz), c.order)?;
        }
        if let Some(c) = self.low_pass {
            designer.set_low_pass(Hertz(c.freq_hz), c.order)?;
        }
        for n in &self.notches {
            designer.add_notch_suppression(Hertz(n.freq_hz), Hertz(n.width_hz))?;
        }

        Ok(designer.build()?)
    }
}

/// Applies a designature filter in place.
pub struct DesignatureStep {
    params: DesignatureParams,
    filter: Option<SpectralFilter>,
}

impl DesignatureStep {
    pub fn new(params: DesignatureParams) -> Self {
        Self {
            params,
            filter: None,
        }
    }

    pub fn params(&self) -> &DesignatureParams {
        &self.params
    }

    /// The designed filter, once configured.
    pub fn filter(&self) -> Option<&SpectralFilter> {
        self.filter.as_ref()
    }
}

impl TraceStep for DesignatureStep {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, input: TraceLayout) -> FlowResult<TraceLayout> {
        let filter = self.params.design(input)?;
        tracing::info!(
            fft_len = filter.fft_len(),
            white_noise_percent = self.params.white_noise_percent,
            filter_type = ?self.params.filter_type,
            "designature filter designed"
        );
        self.filter = Some(filter);
        Ok(input)
    }

    fn process_trace(&self, trace: &mut Trace) -> FlowResult<()> {
        let filter = self.filter.as_ref().ok_or_else(not_configured)?;
        filter.apply(&mut trace.samples)?;
        Ok(())
    }

    fn teardown(&mut self) -> FlowResult<()> {
        self.filter = None;
        Ok(())
    }
}
