//! Flow orchestration.

use crate::config::{FlowConfig, StepConfig, WaveletSource};
use anyhow::{Context, Result};
use lib_flow::steps::{ConvolutionParams, DesignatureParams};
use lib_flow::{Flow, FlowSummary, StepRegistry};
use lib_io::WaveletDefaults;
use lib_types::trace::{Gather, TraceLayout};
use lib_types::units::Milliseconds;
use lib_types::wavelet::Wavelet;
use std::path::Path;

/// Flow orchestrator.
pub struct Orchestrator {
    config: FlowConfig,
    registry: StepRegistry,
}

impl Orchestrator {
    /// Create a new orchestrator with the built-in steps.
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            registry: StepRegistry::with_builtin(),
        }
    }

    /// Read `input`, run the flow over it and write the result to `output`.
    pub fn run(&self, input: &Path, output: &Path) -> Result<FlowSummary> {
        tracing::info!("Starting flow: {}", self.config.name);

        let mut gather = self.read_gather(input)?;
        let summary = self.process(&mut gather)?;

        lib_io::write_gather_file(output, &gather)
            .with_context(|| format!("Failed to write gather: {:?}", output))?;
        tracing::info!("Wrote {} traces to {:?}", gather.len(), output);

        Ok(summary)
    }

    /// Run the flow over a gather in memory.
    pub fn process(&self, gather: &mut Gather) -> Result<FlowSummary> {
        let mut flow = self.build_flow(gather.layout)?;
        flow.configure(gather.layout)
            .with_context(|| format!("Failed to configure flow '{}'", self.config.name))?;

        let summary = flow.process_gather(gather);
        let closed = flow.close();
        let summary = summary.context("Flow processing failed")?;
        closed.context("Flow teardown failed")?;

        Ok(summary)
    }

    /// Build an unconfigured flow for traces of `layout`.
    ///
    /// Single-column wavelets take the sample interval of the traces as they
    /// reach their step, so a wavelet after a resample step uses the new
    /// interval.
    pub fn build_flow(&self, layout: TraceLayout) -> Result<Flow> {
        let mut flow = Flow::new(self.config.name.clone()).with_parallel(self.config.parallel);
        let mut current = layout;

        for (i, step) in self.config.steps.iter().enumerate() {
            let params = self
                .step_params(step, current.sample_interval)
                .with_context(|| format!("Step {} ({})", i, step.kind()))?;
            flow.push_named(&self.registry, step.kind(), &params)
                .with_context(|| format!("Failed to create step {} ({})", i, step.kind()))?;
            if let StepConfig::Resample(r) = step {
                current = r
                    .output_layout(current)
                    .with_context(|| format!("Step {} ({})", i, step.kind()))?;
            }
            tracing::debug!(
                step = i,
                kind = step.kind(),
                interval_ms = current.sample_interval.0,
                "step added"
            );
        }

        Ok(flow)
    }

    fn read_gather(&self, input: &Path) -> Result<Gather> {
        let interval = self.config.sample_interval_ms.map(Milliseconds);
        let gather = lib_io::read_gather_file(input, interval)
            .with_context(|| format!("Failed to read gather: {:?}", input))?;

        tracing::info!(
            traces = gather.len(),
            samples = gather.layout.num_samples,
            interval_ms = gather.layout.sample_interval.0,
            "gather loaded"
        );
        Ok(gather)
    }

    /// Registry parameters for one configured step.
    fn step_params(&self, step: &StepConfig, trace_interval: Milliseconds) -> Result<serde_json::Value> {
        let value = match step {
            StepConfig::Designature(d) => {
                let params = DesignatureParams {
                    signature: load_wavelet(&d.wavelet, trace_interval)?,
                    output_wavelet: d
                        .output_wavelet
                        .as_ref()
                        .map(|w| load_wavelet(w, trace_interval))
                        .transpose()?,
                    white_noise_percent: d.white_noise_percent,
                    filter_type: d.filter_type,
                    high_pass: d.high_pass,
                    low_pass: d.low_pass,
                    notches: d.notches.clone(),
                    allow_interval_mismatch: d.allow_interval_mismatch,
                };
                serde_json::to_value(params)?
            }
            StepConfig::Resample(r) => serde_json::to_value(r)?,
            StepConfig::Convolution(c) => serde_json::to_value(ConvolutionParams {
                wavelet: load_wavelet(&c.wavelet, trace_interval)?,
            })?,
        };
        Ok(value)
    }
}

/// Load a wavelet file, single-column files default to the trace interval.
pub fn load_wavelet(source: &WaveletSource, trace_interval: Milliseconds) -> Result<Wavelet> {
    let defaults = match source {
        WaveletSource::Path(_) => WaveletDefaults {
            sample_interval: Some(trace_interval),
            time_first_sample: Milliseconds::ZERO,
        },
        WaveletSource::Detailed {
            sample_interval_ms,
            time_first_sample_ms,
            ..
        } => WaveletDefaults {
            sample_interval: Some(sample_interval_ms.map_or(trace_interval, Milliseconds)),
            time_first_sample: Milliseconds(*time_first_sample_ms),
        },
    };

    let wavelet = lib_io::read_wavelet_file(source.path(), defaults)
        .with_context(|| format!("Failed to read wavelet: {:?}", source.path()))?;

    tracing::debug!(
        path = ?source.path(),
        samples = wavelet.len(),
        interval_ms = wavelet.sample_interval.0,
        zero_index = wavelet.zero_time_index(),
        "wavelet loaded"
    );
    Ok(wavelet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, ConvolutionConfig};
    use lib_flow::steps::ResampleParams;
    use lib_types::trace::Trace;

    #[test]
    fn test_resample_only_flow() {
        let config = parse_config(
            "name = \"decimate\"\n[[steps]]\ntype = \"resample\"\nsample_interval_ms = 4.0\n",
            false,
        )
        .unwrap();
        let orchestrator = Orchestrator::new(config);

        let layout = TraceLayout::new(400, Milliseconds(2.0));
        let traces = (0..3)
            .map(|t| Trace::new((0..400).map(|i| ((i + t) as f32 * 0.02).sin()).collect()))
            .collect();
        let mut gather = Gather::new(layout, traces);

        let summary = orchestrator.process(&mut gather).unwrap();
        assert_eq!(summary.flow, "decimate");
        assert_eq!(summary.traces, 3);
        assert_eq!(summary.output, TraceLayout::new(200, Milliseconds(4.0)));
        assert_eq!(gather.layout, summary.output);
    }

    #[test]
    fn test_missing_wavelet_reported() {
        let config = parse_config(
            "[[steps]]\ntype = \"convolution\"\nwavelet = \"/nonexistent/w.txt\"\n",
            false,
        )
        .unwrap();
        let orchestrator = Orchestrator::new(config);
        assert!(orchestrator
            .build_flow(TraceLayout::new(100, Milliseconds(2.0)))
            .is_err());
    }

    #[test]
    fn test_single_column_wavelet_after_resample() {
        let path = std::env::temp_dir().join("seisflow_wavelet_after_resample.txt");
        std::fs::write(&path, "1.0\n").unwrap();

        let config = FlowConfig {
            name: "decimate then convolve".to_string(),
            sample_interval_ms: None,
            parallel: true,
            steps: vec![
                StepConfig::Resample(ResampleParams::new(4.0)),
                StepConfig::Convolution(ConvolutionConfig {
                    wavelet: WaveletSource::Path(path.clone()),
                }),
            ],
        };
        let orchestrator = Orchestrator::new(config);

        let layout = TraceLayout::new(400, Milliseconds(2.0));
        let traces = (0..3)
            .map(|t| Trace::new((0..400).map(|i| ((i + t) as f32 * 0.02).sin()).collect()))
            .collect();
        let mut gather = Gather::new(layout, traces);

        let summary = orchestrator.process(&mut gather);
        std::fs::remove_file(&path).ok();
        let summary = summary.unwrap();

        assert_eq!(summary.output, TraceLayout::new(200, Milliseconds(4.0)));
        assert_eq!(summary.steps, vec!["resample".to_string(), "convolution".to_string()]);
        assert_eq!(gather.len(), 3);
    }
}
