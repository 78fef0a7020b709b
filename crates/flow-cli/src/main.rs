//! seisflow CLI: spectral designature and resampling of seismic traces.
//!
//! This is the main entry point for the seisflow processing tool.

mod config;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_dsp::{DesignOptions, FilterDesigner, FilterType};
use lib_io::WaveletDefaults;
use lib_types::trace::TraceLayout;
use lib_types::units::{Hertz, Milliseconds};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "seisflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum FilterTypeArg {
    #[default]
    AmpPhase,
    AmpOnly,
    PhaseOnly,
}

impl From<FilterTypeArg> for FilterType {
    fn from(arg: FilterTypeArg) -> Self {
        match arg {
            FilterTypeArg::AmpPhase => FilterType::AmpPhase,
            FilterTypeArg::AmpOnly => FilterType::AmpOnly,
            FilterTypeArg::PhaseOnly => FilterType::PhaseOnly,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a processing flow over a trace gather
    Run {
        /// Path to the flow configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Input gather file
        #[arg(short, long)]
        input: PathBuf,

        /// Output gather file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Design a designature filter and dump it
    Design {
        /// Signature wavelet file
        #[arg(short, long)]
        wavelet: PathBuf,

        /// Trace length in samples
        #[arg(short, long)]
        samples: usize,

        /// Trace sample interval (ms)
        #[arg(long, default_value = "2.0")]
        sample_interval_ms: f64,

        /// White noise in percent of the peak signature amplitude
        #[arg(long, default_value = "1.0")]
        white_noise: f64,

        /// Which part of the signature to remove
        #[arg(long, value_enum, default_value = "amp-phase")]
        filter_type: FilterTypeArg,

        /// Desired output wavelet file
        #[arg(long)]
        output_wavelet: Option<PathBuf>,

        /// High-pass corner (Hz)
        #[arg(long)]
        high_pass: Option<f64>,

        /// Low-pass corner (Hz)
        #[arg(long)]
        low_pass: Option<f64>,

        /// Butterworth order of the corners
        #[arg(long, default_value = "4")]
        corner_order: u32,

        /// Write the frequency response here
        #[arg(long)]
        spectrum: Option<PathBuf>,

        /// Write the time-domain filter here
        #[arg(long)]
        filter_wavelet: Option<PathBuf>,
    },

    /// Parse a wavelet file and summarise it
    InspectWavelet {
        /// Path to the wavelet file
        file: PathBuf,

        /// Sample interval for single-column files (ms)
        #[arg(long)]
        sample_interval_ms: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Run { config, input, output } => {
            run_flow(&config, &input, &output, cli.format)?;
        }
        Commands::Design {
            wavelet,
            samples,
            sample_interval_ms,
            white_noise,
            filter_type,
            output_wavelet,
            high_pass,
            low_pass,
            corner_order,
            spectrum,
            filter_wavelet,
        } => {
            let request = DesignRequest {
                wavelet,
                layout: TraceLayout::new(samples, Milliseconds(sample_interval_ms)),
                white_noise,
                filter_type: filter_type.into(),
                output_wavelet,
                high_pass,
                low_pass,
                corner_order,
                spectrum,
                filter_wavelet,
            };
            design_filter(&request, cli.format)?;
        }
        Commands::InspectWavelet { file, sample_interval_ms } => {
            inspect_wavelet(&file, sample_interval_ms, cli.format)?;
        }
    }

    Ok(())
}

fn run_flow(config_path: &Path, input: &Path, output: &Path, format: OutputFormat) -> Result<()> {
    let config = config::load_config(config_path)?;
    tracing::info!("Loaded flow '{}' with {} steps", config.name, config.steps.len());

    let orchestrator = orchestrator::Orchestrator::new(config);
    let summary = orchestrator.run(input, output)?;

    output::write_summary(&mut std::io::stdout().lock(), &summary, format)
}

struct DesignRequest {
    wavelet: PathBuf,
    layout: TraceLayout,
    white_noise: f64,
    filter_type: FilterType,
    output_wavelet: Option<PathBuf>,
    high_pass: Option<f64>,
    low_pass: Option<f64>,
    corner_order: u32,
    spectrum: Option<PathBuf>,
    filter_wavelet: Option<PathBuf>,
}

fn design_filter(request: &DesignRequest, format: OutputFormat) -> Result<()> {
    let defaults = WaveletDefaults {
        sample_interval: Some(request.layout.sample_interval),
        time_first_sample: Milliseconds::ZERO,
    };
    let signature = lib_io::read_wavelet_file(&request.wavelet, defaults)
        .with_context(|| format!("Failed to read wavelet: {:?}", request.wavelet))?;

    let options = DesignOptions {
        white_noise_percent: request.white_noise,
        filter_type: request.filter_type,
        allow_interval_mismatch: false,
    };
    let mut designer = FilterDesigner::new(request.layout, &signature, options)?;

    if let Some(path) = &request.output_wavelet {
        let wavelet = lib_io::read_wavelet_file(path, defaults)
            .with_context(|| format!("Failed to read output wavelet: {:?}", path))?;
        designer.set_output_wavelet(&wavelet)?;
    }
    if let Some(hz) = request.high_pass {
        designer.set_high_pass(Hertz(hz), request.corner_order)?;
    }
    if let Some(hz) = request.low_pass {
        designer.set_low_pass(Hertz(hz), request.corner_order)?;
    }

    let filter = designer.build()?;

    if let Some(path) = &request.spectrum {
        let mut f = BufWriter::new(File::create(path)?);
        filter.dump(&mut f)?;
        f.flush()?;
        tracing::info!("Wrote filter spectrum to {:?}", path);
    }
    if let Some(path) = &request.filter_wavelet {
        let mut f = BufWriter::new(File::create(path)?);
        filter.dump_wavelet(&mut f)?;
        f.flush()?;
        tracing::info!("Wrote filter wavelet to {:?}", path);
    }

    let gains: Vec<f64> = (0..filter.fft_len() / 2 + 1)
        .filter_map(|k| filter.gain(k))
        .collect();
    let info = output::DesignInfo {
        samples: request.layout.num_samples,
        sample_interval_ms: request.layout.sample_interval.0,
        fft_len: filter.fft_len(),
        min_gain: gains.iter().copied().fold(f64::INFINITY, f64::min),
        max_gain: gains.iter().copied().fold(0.0, f64::max),
    };

    output::write_design_info(&mut std::io::stdout().lock(), &info, format)
}

fn inspect_wavelet(path: &Path, sample_interval_ms: Option<f64>, format: OutputFormat) -> Result<()> {
    let defaults = WaveletDefaults {
        sample_interval: sample_interval_ms.map(Milliseconds),
        time_first_sample: Milliseconds::ZERO,
    };
    let wavelet = lib_io::read_wavelet_file(path, defaults)
        .with_context(|| format!("Failed to read wavelet: {:?}", path))?;

    let magnitudes = lib_dsp::fft::magnitude_spectrum(&wavelet.samples)?;
    let fft_len = (magnitudes.len() - 1) * 2;
    let dominant_bin = magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(k, _)| k);

    let info = output::WaveletInfo {
        samples: wavelet.len(),
        sample_interval_ms: wavelet.sample_interval.0,
        time_first_sample_ms: wavelet.time_first_sample.0,
        time_last_sample_ms: wavelet.time_last_sample().0,
        zero_time_index: wavelet.zero_time_index(),
        peak_index: wavelet.peak_index(),
        peak_amplitude: wavelet.peak_index().map_or(0.0, |i| wavelet.samples[i]),
        dominant_frequency_hz: dominant_bin as f64 * wavelet.sample_interval.sample_rate().0 / fft_len as f64,
    };

    output::write_wavelet_info(&mut std::io::stdout().lock(), &info, format)
}
