//! ASCII trace gather reader and writer.
//!
//! Each row is one time sample and each column one trace:
//!
//! ```text
//! # traces=3 samples=4 dt_ms=2
//! 0.0   0.1  -0.2
//! 1.0   0.4   0.3
//! 0.5  -0.2   0.1
//! 0.0   0.0   0.0
//! ```
//!
//! The `traces` and `samples` header fields are optional but checked when
//! present.

use crate::error::ParseError;
use crate::text::{classify, field, Line};
use lib_types::trace::{Gather, Trace, TraceLayout};
use lib_types::units::Milliseconds;
use std::io::Write;
use std::path::Path;

/// Parse a gather from a string.
///
/// `sample_interval` takes precedence over a `dt_ms` header field.
pub fn parse_gather(content: &str, sample_interval: Option<Milliseconds>) -> Result<Gather, ParseError> {
    let mut fields = Vec::new();
    let mut traces: Vec<Vec<f32>> = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        match classify(raw, line_no)? {
            Line::Blank => {}
            Line::Comment(f) => fields.extend(f),
            Line::Values(values) => {
                if traces.is_empty() {
                    traces = vec![Vec::new(); values.len()];
                } else if values.len() != traces.len() {
                    return Err(ParseError::syntax(
                        line_no,
                        format!("expected {} traces, got {} columns", traces.len(), values.len()),
                    ));
                }
                for (trace, v) in traces.iter_mut().zip(values) {
                    trace.push(v as f32);
                }
            }
        }
    }

    if traces.is_empty() {
        return Err(ParseError::invalid_format("gather", "no samples"));
    }

    let dt = sample_interval
        .or_else(|| field(&fields, "dt_ms").map(Milliseconds))
        .ok_or_else(|| ParseError::missing_field("dt_ms"))?;
    if !(dt.0.is_finite() && dt.0 > 0.0) {
        return Err(ParseError::invalid_value(
            "dt_ms",
            format!("sample interval must be positive, got {}", dt.0),
        ));
    }

    let num_samples = traces[0].len();
    check_header_count(&fields, "traces", traces.len())?;
    check_header_count(&fields, "samples", num_samples)?;

    tracing::debug!(traces = traces.len(), samples = num_samples, dt_ms = dt.0, "parsed gather");

    let layout = TraceLayout::new(num_samples, dt);
    Ok(Gather::new(layout, traces.into_iter().map(Trace::new).collect()))
}

/// Read a gather file from disk.
pub fn read_gather_file(path: &Path, sample_interval: Option<Milliseconds>) -> Result<Gather, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_gather(&content, sample_interval)
}

/// Write a gather in the row-per-sample format.
pub fn write_gather<W: Write>(out: &mut W, gather: &Gather) -> Result<(), ParseError> {
    if let Some(idx) = gather.first_inconsistent() {
        return Err(ParseError::invalid_format(
            "gather",
            format!(
                "trace {} has {} samples, layout has {}",
                idx,
                gather.traces[idx].len(),
                gather.layout.num_samples
            ),
        ));
    }

    writeln!(
        out,
        "# traces={} samples={} dt_ms={}",
        gather.len(),
        gather.layout.num_samples,
        gather.layout.sample_interval.0
    )?;

    let mut row = String::new();
    for i in 0..gather.layout.num_samples {
        row.clear();
        for (t, trace) in gather.traces.iter().enumerate() {
            if t > 0 {
                row.push(' ');
            }
            row.push_str(&trace.samples[i].to_string());
        }
        writeln!(out, "{}", row)?;
    }
    Ok(())
}

/// Write a gather file to disk.
pub fn write_gather_file(path: &Path, gather: &Gather) -> Result<(), ParseError> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    write_gather(&mut out, gather)?;
    out.flush()?;
    Ok(())
}

fn check_header_count(fields: &[(String, f64)], name: &str, actual: usize) -> Result<(), ParseError> {
    if let Some(declared) = field(fields, name) {
        if declared != actual as f64 {
            return Err(ParseError::invalid_value(
                name,
                format!("header declares {}, data has {}", declared, actual),
            ));
        }
    }
    Ok(())
}
