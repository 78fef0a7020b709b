//! Flow configuration loading and validation.

use anyhow::{Context, Result};
use lib_flow::steps::{CornerParams, FilterKind, NotchParams, ResampleParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level flow configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow name/description.
    #[serde(default = "default_name")]
    pub name: String,

    /// Sample interval of the input gather, overrides its `dt_ms` header.
    #[serde(default)]
    pub sample_interval_ms: Option<f64>,

    /// Process traces on all cores.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Processing steps in order.
    pub steps: Vec<StepConfig>,
}

fn default_name() -> String {
    "flow".to_string()
}

fn default_true() -> bool {
    true
}

/// One processing step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    Designature(DesignatureConfig),
    Resample(ResampleParams),
    Convolution(ConvolutionConfig),
}

impl StepConfig {
    /// Registry name of the step.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Designature(_) => "designature",
            Self::Resample(_) => "resample",
            Self::Convolution(_) => "convolution",
        }
    }
}

/// Wavelet file reference.
///
/// Either a bare path or a table that also supplies the sampling of a
/// single-column file:
///
/// ```toml
/// wavelet = { path = "sig.txt", sample_interval_ms = 2.0, time_first_sample_ms = -20.0 }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaveletSource {
    Path(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        sample_interval_ms: Option<f64>,
        #[serde(default)]
        time_first_sample_ms: f64,
    },
}

impl WaveletSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(p) => p,
            Self::Detailed { path, .. } => path,
        }
    }

    fn path_mut(&mut self) -> &mut PathBuf {
        match self {
            Self::Path(p) => p,
            Self::Detailed { path, .. } => path,
        }
    }
}

/// Designature step configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignatureConfig {
    /// Signature wavelet file.
    pub wavelet: WaveletSource,

    /// Desired output wavelet file.
    #[serde(default)]
    pub output_wavelet: Option<WaveletSource>,

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
    1.0
}

/// Convolution step configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvolutionConfig {
    /// Wavelet file.
    pub wavelet: WaveletSource,
}

impl FlowConfig {
    /// Every wavelet reference in the flow.
    pub fn wavelet_sources(&self) -> Vec<&WaveletSource> {
        let mut sources = Vec::new();
        for step in &self.steps {
            match step {
                StepConfig::Designature(d) => {
                    sources.push(&d.wavelet);
                    if let Some(out) = &d.output_wavelet {
                        sources.push(out);
                    }
                }
                StepConfig::Convolution(c) => sources.push(&c.wavelet),
                StepConfig::Resample(_) => {}
            }
        }
        sources
    }

    /// Make relative wavelet paths relative to `base`.
    fn resolve_paths(&mut self, base: &Path) {
        for step in self.steps.iter_mut() {
            let sources: Vec<&mut WaveletSource> = match step {
                StepConfig::Designature(d) => {
                    let mut v = vec![&mut d.wavelet];
                    if let Some(out) = d.output_wavelet.as_mut() {
                        v.push(out);
                    }
                    v
                }
                StepConfig::Convolution(c) => vec![&mut c.wavelet],
                StepConfig::Resample(_) => Vec::new(),
            };
            for source in sources {
                let path = source.path_mut();
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

/// Load configuration from a file.
pub fn load_config(path: &Path) -> Result<FlowConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config = parse_config(&content, path.extension().map_or(false, |e| e == "json"))?;

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }

    validate_config(&config)?;

    Ok(config)
}

/// Parse configuration text, TOML unless `json` is set.
pub fn parse_config(content: &str, json: bool) -> Result<FlowConfig> {
    let config = if json {
        serde_json::from_str(content).with_context(|| "Failed to parse config as JSON")?
    } else {
        toml::from_str(content).with_context(|| "Failed to parse config as TOML")?
    };
    Ok(config)
}

/// Validate configuration.
pub fn validate_config(config: &FlowConfig) -> Result<()> {
    if config.steps.is_empty() {
        anyhow::bail!("Flow '{}' has no steps", config.name);
    }

    if let Some(dt) = config.sample_interval_ms {
        if !(dt > 0.0) {
            anyhow::bail!("sample_interval_ms must be positive, got {}", dt);
        }
    }

    for source in config.wavelet_sources() {
        if !source.path().exists() {
            anyhow::bail!("Wavelet file not found: {:?}", source.path());
        }
    }

    for (i, step) in config.steps.iter().enumerate() {
        match step {
            StepConfig::Designature(d) => {
                if !(d.white_noise_percent >= 0.0) {
                    anyhow::bail!(
                        "Step {} ({}): white_noise_percent must be non-negative, got {}",
                        i,
                        step.kind(),
                        d.white_noise_percent
                    );
                }
                if d.white_noise_percent > 100.0 {
                    tracing::warn!(
                        step = i,
                        white_noise_percent = d.white_noise_percent,
                        "white noise above 100% flattens the designature filter"
                    );
                }
            }
            StepConfig::Resample(r) => {
                if !(r.sample_interval_ms > 0.0) {
                    anyhow::bail!(
                        "Step {} ({}): sample_interval_ms must be positive, got {}",
                        i,
                        step.kind(),
                        r.sample_interval_ms
                    );
                }
            }
            StepConfig::Convolution(_) => {}
        }
    }

    Ok(())
}
