//! Result output formatting and writing.

use crate::OutputFormat;
use anyhow::Result;
use lib_flow::FlowSummary;
use serde::Serialize;
use std::io::Write;

/// Summary of a wavelet file.
#[derive(Clone, Debug, Serialize)]
pub struct WaveletInfo {
    pub samples: usize,
    pub sample_interval_ms: f64,
    pub time_first_sample_ms: f64,
    pub time_last_sample_ms: f64,
    pub zero_time_index: isize,
    pub peak_index: Option<usize>,
    pub peak_amplitude: f32,
    pub dominant_frequency_hz: f64,
}

/// Summary of a designed filter.
#[derive(Clone, Debug, Serialize)]
pub struct DesignInfo {
    pub samples: usize,
    pub sample_interval_ms: f64,
    pub fft_len: usize,
    pub min_gain: f64,
    pub max_gain: f64,
}

/// Print a flow summary.
pub fn write_summary<W: Write>(out: &mut W, summary: &FlowSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Flow Summary")?;
            writeln!(out, "============")?;
            writeln!(out, "Flow:     {}", summary.flow)?;
            writeln!(out, "Steps:    {}", summary.steps.join(" -> "))?;
            writeln!(out, "Traces:   {}", summary.traces)?;
            writeln!(
                out,
                "Input:    {} samples @ {} ms",
                summary.input.num_samples, summary.input.sample_interval.0
            )?;
            writeln!(
                out,
                "Output:   {} samples @ {} ms",
                summary.output.num_samples, summary.output.sample_interval.0
            )?;
            writeln!(out, "Elapsed:  {:.3} s", summary.elapsed.as_secs_f64())?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(summary)?)?;
        }
    }
    Ok(())
}

/// Print a wavelet summary.
pub fn write_wavelet_info<W: Write>(out: &mut W, info: &WaveletInfo, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Wavelet")?;
            writeln!(out, "=======")?;
            writeln!(out, "Samples:            {}", info.samples)?;
            writeln!(out, "Sample interval:    {} ms", info.sample_interval_ms)?;
            writeln!(
                out,
                "Time span:          {} .. {} ms",
                info.time_first_sample_ms, info.time_last_sample_ms
            )?;
            writeln!(out, "Zero-time index:    {}", info.zero_time_index)?;
            if let Some(peak) = info.peak_index {
                writeln!(out, "Peak:               {:.6} at index {}", info.peak_amplitude, peak)?;
            }
            writeln!(out, "Dominant frequency: {:.2} Hz", info.dominant_frequency_hz)?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(info)?)?;
        }
    }
    Ok(())
}

/// Print a filter design summary.
pub fn write_design_info<W: Write>(out: &mut W, info: &DesignInfo, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Designature Filter")?;
            writeln!(out, "==================")?;
            writeln!(out, "Trace samples:   {}", info.samples)?;
            writeln!(out, "Sample interval: {} ms", info.sample_interval_ms)?;
            writeln!(out, "FFT length:      {}", info.fft_len)?;
            writeln!(out, "Gain range:      {:.6} .. {:.6}", info.min_gain, info.max_gain)?;
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(info)?)?;
        }
    }
    Ok(())
}
