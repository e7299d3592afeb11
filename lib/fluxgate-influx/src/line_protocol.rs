//! Line protocol encoding.

use std::fmt::Write as _;

use crate::{error::WriteError, FieldValue, Point};

/// Encodes a point as a single line, without a trailing newline, appending it to `out`.
///
/// Tags with an empty value are left out, as line protocol has no way to express them.
///
/// # Errors
///
/// If the point has no fields, or has a float field that is NaN or infinite, an error is returned and `out` is left
/// unchanged.
pub fn encode_point(point: &Point, out: &mut String) -> Result<(), WriteError> {
    if point.has_no_fields() {
        return Err(WriteError::EmptyFields {
            measurement: point.measurement().to_string(),
        });
    }

    if let Some((key, _)) = point
        .fields()
        .iter()
        .find(|(_, value)| matches!(value, FieldValue::Float(f) if !f.is_finite()))
    {
        return Err(WriteError::NonFiniteField {
            measurement: point.measurement().to_string(),
            field: key.clone(),
        });
    }

    escape_name_into(out, point.measurement(), &[',', ' ']);

    for (key, value) in point.tags().iter().filter(|(_, value)| !value.is_empty()) {
        out.push(',');
        escape_name_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_name_into(out, value, &[',', '=', ' ']);
    }

    let mut separator = ' ';
    for (key, value) in point.fields() {
        out.push(separator);
        separator = ',';

        escape_name_into(out, key, &[',', '=', ' ']);
        out.push('=');
        match value {
            // Writing to a `String` can't fail.
            FieldValue::Float(f) => {
                let _ = write!(out, "{}", f);
            }
            FieldValue::String(s) => {
                out.push('"');
                escape_into(out, s, &['"', '\\']);
                out.push('"');
            }
        }
    }

    if let Some(timestamp) = point.timestamp() {
        let _ = write!(out, " {}", timestamp);
    }

    Ok(())
}

/// Encodes a batch of points, one per line.
///
/// # Errors
///
/// If any point fails to encode, that error is returned.
pub fn encode_points(points: &[Point]) -> Result<String, WriteError> {
    let mut out = String::new();
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        encode_point(point, &mut out)?;
    }
    Ok(out)
}

/// Escapes a measurement, tag key, tag value or field key. Newlines would end the line, so they are written as `\n`.
fn escape_name_into(out: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        if c == '\n' {
            out.push_str("\\n");
        } else {
            if special.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
    }
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
