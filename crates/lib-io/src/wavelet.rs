//! ASCII wavelet reader.
//!
//! Two layouts are accepted:
//!
//! ```text
//! # time_ms amplitude
//! -4.0  0.1
//! -2.0  0.6
//!  0.0  1.0
//! ```
//!
//! or a single amplitude column, in which case the sample interval and the
//! time of the first sample come from `dt_ms=` / `t0_ms=` comment fields or
//! from the caller's [`WaveletDefaults`].

use crate::error::ParseError;
use crate::text::{classify, field, Line};
use lib_types::units::Milliseconds;
use lib_types::wavelet::Wavelet;
use std::path::Path;

/// Relative tolerance on the spacing of the time column.
const SPACING_TOLERANCE: f64 = 1e-3;

/// Fallbacks for single-column files.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WaveletDefaults {
    /// Sample interval when the file has no time column and no `dt_ms` field.
    pub sample_interval: Option<Milliseconds>,

    /// First-sample time when the file has no time column and no `t0_ms` field.
    pub time_first_sample: Milliseconds,
}

/// Parse a wavelet from a string.
pub fn parse_wavelet(content: &str, defaults: WaveletDefaults) -> Result<Wavelet, ParseError> {
    let mut fields = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut columns = 0;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        match classify(raw, line_no)? {
            Line::Blank => {}
            Line::Comment(f) => fields.extend(f),
            Line::Values(values) => {
                if values.len() > 2 {
                    return Err(ParseError::syntax(
                        line_no,
                        format!("expected 1 or 2 columns, got {}", values.len()),
                    ));
                }
                if columns == 0 {
                    columns = values.len();
                } else if values.len() != columns {
                    return Err(ParseError::syntax(
                        line_no,
                        format!("expected {} columns, got {}", columns, values.len()),
                    ));
                }
                rows.push(values);
            }
        }
    }

    if rows.is_empty() {
        return Err(ParseError::invalid_format("wavelet", "no samples"));
    }

    let wavelet = if columns == 2 {
        from_time_amplitude(&rows)?
    } else {
        let dt = field(&fields, "dt_ms")
            .map(Milliseconds)
            .or(defaults.sample_interval)
            .ok_or_else(|| ParseError::missing_field("dt_ms"))?;
        let t0 = field(&fields, "t0_ms")
            .map(Milliseconds)
            .unwrap_or(defaults.time_first_sample);
        let samples = rows.iter().map(|r| r[0] as f32).collect();
        Wavelet::new(samples, dt, t0)
    };

    if !(wavelet.sample_interval.0 > 0.0) {
        return Err(ParseError::invalid_value(
            "dt_ms",
            format!("sample interval must be positive, got {}", wavelet.sample_interval.0),
        ));
    }

    tracing::debug!(
        samples = wavelet.len(),
        dt_ms = wavelet.sample_interval.0,
        t0_ms = wavelet.time_first_sample.0,
        "parsed wavelet"
    );

    Ok(wavelet)
}

/// Read a wavelet file from disk.
pub fn read_wavelet_file(path: &Path, defaults: WaveletDefaults) -> Result<Wavelet, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_wavelet(&content, defaults)
}

fn from_time_amplitude(rows: &[Vec<f64>]) -> Result<Wavelet, ParseError> {
    if rows.len() < 2 {
        return Err(ParseError::invalid_format(
            "wavelet",
            "a time column needs at least two samples to define the interval",
        ));
    }

    let t0 = rows[0][0];
    let dt = rows[1][0] - t0;
    if dt <= 0.0 {
        return Err(ParseError::invalid_value(
            "time_ms",
            format!("time column must increase, got step {}", dt),
        ));
    }

    for (i, pair) in rows.windows(2).enumerate() {
        let step = pair[1][0] - pair[0][0];
        if (step - dt).abs() > SPACING_TOLERANCE * dt {
            return Err(ParseError::invalid_value(
                "time_ms",
                format!(
                    "non-uniform sampling between samples {} and {}: step {} ms, expected {} ms",
                    i,
                    i + 1,
                    step,
                    dt
                ),
            ));
        }
    }

    let samples = rows.iter().map(|r| r[1] as f32).collect();
    Ok(Wavelet::new(samples, Milliseconds(dt), Milliseconds(t0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_COLUMN: &str = "\
# Marine source signature
# time_ms amplitude
-4.0  0.25
-2.0  -0.5
 0.0  1.0
 2.0  -0.5
 4.0  0.25
";

    #[test]
    fn test_parse_two_columns() {
        let wavelet = parse_wavelet(TWO_COLUMN, WaveletDefaults::default()).unwrap();
        assert_eq!(wavelet.len(), 5);
        assert_eq!(wavelet.sample_interval, Milliseconds(2.0));
        assert_eq!(wavelet.time_first_sample, Milliseconds(-4.0));
        assert_eq!(wavelet.zero_time_index(), 2);
        assert_eq!(wavelet.samples[2], 1.0);
    }

    #[test]
    fn test_parse_single_column_with_header() {
        let content = "# dt_ms=4 t0_ms=-8\n0.1\n0.5\n1.0\n0.5\n0.1\n";
        let wavelet = parse_wavelet(content, WaveletDefaults::default()).unwrap();
        assert_eq!(wavelet.sample_interval, Milliseconds(4.0));
        assert_eq!(wavelet.time_first_sample, Milliseconds(-8.0));
        assert_eq!(wavelet.zero_time_index(), 2);
    }

    #[test]
    fn test_single_column_uses_defaults() {
        let defaults = WaveletDefaults {
            sample_interval: Some(Milliseconds(2.0)),
            time_first_sample: Milliseconds::ZERO,
        };
        let wavelet = parse_wavelet("1.0\n0.5\n", defaults).unwrap();
        assert_eq!(wavelet.sample_interval, Milliseconds(2.0));
        assert_eq!(wavelet.samples, vec![1.0, 0.5]);

        assert!(matches!(
            parse_wavelet("1.0\n0.5\n", WaveletDefaults::default()),
            Err(ParseError::Missing { .. })
        ));
    }

    #[test]
    fn test_non_uniform_time_rejected() {
        let content = "0.0 1.0\n2.0 0.5\n5.0 0.2\n";
        assert!(matches!(
            parse_wavelet(content, WaveletDefaults::default()),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_inconsistent_columns_rejected() {
        let content = "0.0 1.0\n2.0\n";
        assert!(matches!(
            parse_wavelet(content, WaveletDefaults::default()),
            Err(ParseError::Syntax { line: 2, .. })
        ));
        assert!(parse_wavelet("1 2 3\n", WaveletDefaults::default()).is_err());
    }

    #[test]
    fn test_empty_wavelet_rejected() {
        assert!(matches!(
            parse_wavelet("# nothing here\n\n", WaveletDefaults::default()),
            Err(ParseError::InvalidFormat { .. })
        ));
    }
}
