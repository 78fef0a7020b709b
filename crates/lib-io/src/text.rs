//! Line grammar shared by the wavelet and gather formats.
//!
//! Both formats are whitespace-separated numeric columns. Lines starting with
//! `#` are comments; `key=value` tokens inside a comment are header fields.

use crate::error::ParseError;
use nom::{
    bytes::complete::take_while1,
    character::complete::{char, not_line_ending, space0},
    combinator::{all_consuming, eof, opt},
    multi::many1,
    number::complete::double,
    sequence::{preceded, separated_pair},
    IResult, Parser,
};

/// One classified input line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Line {
    Blank,
    Comment(Vec<(String, f64)>),
    Values(Vec<f64>),
}

/// Classify a line, `line_no` is 1-based and only used for errors.
pub(crate) fn classify(line: &str, line_no: usize) -> Result<Line, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Line::Blank);
    }
    if let Some(comment) = trimmed.strip_prefix('#') {
        return Ok(Line::Comment(header_fields(comment)));
    }

    let (_, values) = values_line(trimmed)
        .map_err(|_| ParseError::syntax(line_no, format!("expected numeric columns, got '{}'", trimmed)))?;

    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(ParseError::syntax(
            line_no,
            format!("column {} is not a finite number", pos + 1),
        ));
    }
    Ok(Line::Values(values))
}

/// Look up a header field by name.
pub(crate) fn field(fields: &[(String, f64)], name: &str) -> Option<f64> {
    fields.iter().rev().find(|(k, _)| k == name).map(|(_, v)| *v)
}

fn values_line(input: &str) -> IResult<&str, Vec<f64>> {
    let (input, values) = many1(preceded(space0, double)).parse(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(preceded(char('#'), not_line_ending)).parse(input)?;
    let (input, _) = eof(input)?;
    Ok((input, values))
}

fn header_fields(comment: &str) -> Vec<(String, f64)> {
    comment
        .split_whitespace()
        .filter_map(|token| all_consuming(key_value).parse(token).ok())
        .map(|(_, (key, value))| (key.to_string(), value))
        .collect()
}

fn key_value(input: &str) -> IResult<&str, (&str, f64)> {
    separated_pair(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        char('='),
        double,
    )
    .parse(input)
}
