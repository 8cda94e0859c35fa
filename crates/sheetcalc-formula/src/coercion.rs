//! Type coercion rules
//!
//! All conversions between value kinds go through here. Inputs are expected
//! to be dereferenced scalars; a reference reaching these functions is
//! treated as `#VALUE!`.

use crate::value::Value;
use sheetcalc_core::ErrorCode;
use std::cmp::Ordering;

/// Coerce for arithmetic
///
/// Blank and missing arguments are 0, booleans are 1/0, and text must parse
/// as a number.
pub fn to_number(value: &Value) -> Result<f64, ErrorCode> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Blank | Value::MissingArg => Ok(0.0),
        Value::Text(s) => parse_number(s.as_str()).ok_or(ErrorCode::Value),
        Value::Error(e) => Err(*e),
        Value::CellRef(_) | Value::AreaRef(_) => Err(ErrorCode::Value),
    }
}

/// Coerce for concatenation
pub fn to_text(value: &Value) -> Result<String, ErrorCode> {
    match value {
        Value::Number(n) => Ok(format_number(*n)),
        Value::Text(s) => Ok(s.as_str().to_string()),
        Value::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Value::Blank | Value::MissingArg => Ok(String::new()),
        Value::Error(e) => Err(*e),
        Value::CellRef(_) | Value::AreaRef(_) => Err(ErrorCode::Value),
    }
}

/// Coerce for a logical test
///
/// Text must spell `TRUE` or `FALSE`.
pub fn to_bool(value: &Value) -> Result<bool, ErrorCode> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Blank | Value::MissingArg => Ok(false),
        Value::Text(s) => {
            let s = s.as_str().trim();
            if s.eq_ignore_ascii_case("TRUE") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("FALSE") {
                Ok(false)
            } else {
                Err(ErrorCode::Value)
            }
        }
        Value::Error(e) => Err(*e),
        Value::CellRef(_) | Value::AreaRef(_) => Err(ErrorCode::Value),
    }
}

/// Parse user-entered numeric text
///
/// Accepts surrounding whitespace, a sign, decimals and exponents. Rejects
/// the empty string and the `inf`/`nan` spellings `f64::from_str` allows.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a number the way a cell displays it in general format
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    // 15 significant digits, trailing zeros dropped
    let magnitude = n.abs().log10().floor() as i32;
    if (-5..15).contains(&magnitude) {
        let decimals = (14 - magnitude).max(0) as usize;
        let text = format!("{:.*}", decimals, n);
        if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            text
        }
    } else {
        let text = format!("{:.14E}", n);
        match text.split_once('E') {
            Some((mantissa, exp)) => {
                let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                let exp: i32 = exp.parse().unwrap_or(0);
                format!("{}E{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.abs())
            }
            None => text,
        }
    }
}

/// Relational ordering of two scalars
///
/// Blank acts as 0 against numbers, FALSE against booleans and the empty
/// string against text. Otherwise values of different kinds order as
/// numbers < text < booleans, and text compares case-insensitively.
/// Errors must be handled by the caller.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    match (blank_or(left), blank_or(right)) {
        (None, None) => Ordering::Equal,
        (None, Some(other)) => compare_blank(other),
        (Some(other), None) => compare_blank(other).reverse(),
        (Some(a), Some(b)) => match (a, b) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Boolean(_), _) => Ordering::Greater,
            (_, Value::Boolean(_)) => Ordering::Less,
            (Value::Text(a), Value::Text(b)) => compare_text(a.as_str(), b.as_str()),
            (Value::Text(_), _) => Ordering::Greater,
            (_, Value::Text(_)) => Ordering::Less,
            (Value::Number(a), Value::Number(b)) => compare_numbers(*a, *b),
            _ => Ordering::Equal,
        },
    }
}

fn blank_or(value: &Value) -> Option<&Value> {
    match value {
        Value::Blank | Value::MissingArg => None,
        other => Some(other),
    }
}

/// Blank on the left, `other` on the right
fn compare_blank(other: &Value) -> Ordering {
    match other {
        Value::Boolean(b) => false.cmp(b),
        Value::Number(n) => compare_numbers(0.0, *n),
        Value::Text(s) if s.is_empty() => Ordering::Equal,
        Value::Text(_) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Numbers equal to 15 significant digits compare equal
fn compare_numbers(a: f64, b: f64) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let scale = a.abs().max(b.abs());
    if (a - b).abs() <= scale * 1e-15 {
        return Ordering::Equal;
    }
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&Value::Blank), Ok(0.0));
        assert_eq!(to_number(&Value::MissingArg), Ok(0.0));
        assert_eq!(to_number(&Value::Boolean(true)), Ok(1.0));
        assert_eq!(to_number(&Value::text(" 2.5e1 ")), Ok(25.0));
        assert_eq!(to_number(&Value::text("abc")), Err(ErrorCode::Value));
        assert_eq!(to_number(&Value::text("")), Err(ErrorCode::Value));
        assert_eq!(to_number(&Value::text("inf")), Err(ErrorCode::Value));
        assert_eq!(to_number(&Value::Error(ErrorCode::Na)), Err(ErrorCode::Na));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&Value::Number(1.0)).unwrap(), "1");
        assert_eq!(to_text(&Value::Number(-0.5)).unwrap(), "-0.5");
        assert_eq!(to_text(&Value::Blank).unwrap(), "");
        assert_eq!(to_text(&Value::Boolean(false)).unwrap(), "FALSE");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(28.14), "28.14");
        assert_eq!(format_number(1e20), "1E+20");
        assert_eq!(format_number(1.5e-7), "1.5E-07");
    }

    #[test]
    fn test_compare_blank() {
        assert_eq!(compare(&Value::Blank, &Value::Number(0.0)), Ordering::Equal);
        assert_eq!(compare(&Value::Blank, &Value::Number(1.0)), Ordering::Less);
        assert_eq!(compare(&Value::Blank, &Value::text("")), Ordering::Equal);
        assert_eq!(compare(&Value::Blank, &Value::text("a")), Ordering::Less);
        assert_eq!(compare(&Value::Boolean(false), &Value::Blank), Ordering::Equal);
    }

    #[test]
    fn test_compare_across_kinds() {
        assert_eq!(compare(&Value::text("1"), &Value::Number(1.0)), Ordering::Greater);
        assert_eq!(compare(&Value::Boolean(true), &Value::Number(1.0)), Ordering::Greater);
        assert_eq!(compare(&Value::Boolean(false), &Value::text("z")), Ordering::Greater);
        assert_eq!(compare(&Value::text("ABC"), &Value::text("abc")), Ordering::Equal);
        assert_eq!(compare(&Value::Number(0.1 + 0.2), &Value::Number(0.3)), Ordering::Equal);
    }
}
