//! Scalar resolution: turns the text of a YAML scalar into a typed [`RawValue`].
//!
//! Plain scalars follow the YAML 1.2 core schema (null, bool, int, float, string),
//! optionally widened with YAML 1.1 booleans and legacy `00` octals.

use crate::options::Options;
use crate::raw::RawValue;

/// Parse a YAML 1.1 boolean from a &str (handles the "Norway problem").
///
/// Accepted TRUE literals (case-insensitive): "y", "yes", "true", "on"
/// Accepted FALSE literals (case-insensitive): "n", "no", "false", "off"
pub(crate) fn parse_yaml11_bool(s: &str) -> Option<bool> {
    let t = s.trim();
    if t.eq_ignore_ascii_case("true")
        || t.eq_ignore_ascii_case("yes")
        || t.eq_ignore_ascii_case("y")
        || t.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if t.eq_ignore_ascii_case("false")
        || t.eq_ignore_ascii_case("no")
        || t.eq_ignore_ascii_case("n")
        || t.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        None
    }
}

/// YAML 1.2 core schema booleans only.
pub(crate) fn parse_yaml12_bool(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub(crate) fn is_null(s: &str) -> bool {
    matches!(s.trim(), "" | "~" | "null" | "Null" | "NULL")
}

fn parse_digits_u128(digits: &str, radix: u32) -> Option<u128> {
    let mut val: u128 = 0;
    let mut saw = false;
    for c in digits.chars() {
        if c == '_' {
            continue;
        }
        let d = c.to_digit(radix)?;
        val = val.checked_mul(radix as u128)?;
        val = val.checked_add(d as u128)?;
        saw = true;
    }
    if saw { Some(val) } else { None }
}

/// Outcome of integer parsing: distinguishes "not an integer" from "an integer too large".
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum IntLiteral {
    Fits(i64),
    OutOfRange,
    NotAnInteger,
}

/// Parse a signed integer in decimal, `0x`, `0o`, `0b` (and `00` legacy octal) notation.
pub(crate) fn parse_int(s: &str, legacy_octal: bool) -> IntLiteral {
    let t = s.trim();
    let (neg, rest) = match t.strip_prefix('+') {
        Some(r) => (false, r),
        None => match t.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, t),
        },
    };

    // Detect base
    let (radix, digits) = if let Some(r) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16u32, r)
    } else if let Some(r) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        (8u32, r)
    } else if let Some(r) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        (2u32, r)
    } else if legacy_octal && rest.starts_with("00") {
        (8u32, &rest[2..])
    } else {
        (10u32, rest)
    };

    if digits.is_empty() || digits.starts_with('_') {
        return IntLiteral::NotAnInteger;
    }
    if !digits.chars().all(|c| c == '_' || c.is_digit(radix)) {
        return IntLiteral::NotAnInteger;
    }
    let Some(mag) = parse_digits_u128(digits, radix) else {
        return IntLiteral::OutOfRange;
    };
    let Ok(mag) = i128::try_from(mag) else {
        return IntLiteral::OutOfRange;
    };
    let value = if neg { -mag } else { mag };
    match i64::try_from(value) {
        Ok(v) => IntLiteral::Fits(v),
        Err(_) => IntLiteral::OutOfRange,
    }
}

/// Parse a YAML 1.2 float, including `.nan` and `±.inf`.
///
/// Only the core-schema float shape is accepted, so words such as `inf` or `nan`
/// (which `str::parse::<f64>` would take) stay strings.
pub(crate) fn parse_yaml12_f64(s: &str) -> Option<f64> {
    let t = s.trim();
    let lower = t.to_ascii_lowercase();
    match lower.as_str() {
        ".nan" | "+.nan" | "-.nan" => return Some(f64::NAN),
        ".inf" | "+.inf" => return Some(f64::INFINITY),
        "-.inf" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let body = t.strip_prefix(['+', '-']).unwrap_or(t);
    let starts_ok = body
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');
    let chars_ok = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | '_'));
    let has_digit = body.chars().any(|c| c.is_ascii_digit());
    if !(starts_ok && chars_ok && has_digit) {
        return None;
    }
    let cleaned: String = t.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok()
}

/// Resolve an untagged plain scalar.
pub(crate) fn resolve_plain(s: &str, options: &Options) -> RawValue {
    if is_null(s) {
        return RawValue::Null;
    }
    let boolean = if options.strict_booleans {
        parse_yaml12_bool(s)
    } else {
        parse_yaml11_bool(s)
    };
    if let Some(b) = boolean {
        return RawValue::Bool(b);
    }
    match parse_int(s, options.legacy_octal_numbers) {
        IntLiteral::Fits(v) => return RawValue::Int(v),
        IntLiteral::OutOfRange => {
            return RawValue::Unsupported {
                text: s.to_owned(),
                tag: None,
                reason: format!("integer {s} out of range"),
            };
        }
        IntLiteral::NotAnInteger => {}
    }
    if let Some(f) = parse_yaml12_f64(s) {
        return RawValue::Float(f);
    }
    RawValue::Str(s.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_core_schema_shapes() {
        let opts = Options::default();
        assert_eq!(resolve_plain("~", &opts), RawValue::Null);
        assert_eq!(resolve_plain("true", &opts), RawValue::Bool(true));
        assert_eq!(resolve_plain("off", &opts), RawValue::Bool(false));
        assert_eq!(resolve_plain("8080", &opts), RawValue::Int(8080));
        assert_eq!(resolve_plain("-0x1F", &opts), RawValue::Int(-31));
        assert_eq!(resolve_plain("0b101", &opts), RawValue::Int(5));
        assert_eq!(resolve_plain("1_000", &opts), RawValue::Int(1000));
        assert_eq!(resolve_plain("2.5", &opts), RawValue::Float(2.5));
        assert_eq!(resolve_plain("1e3", &opts), RawValue::Float(1000.0));
        assert_eq!(resolve_plain("-.inf", &opts), RawValue::Float(f64::NEG_INFINITY));
        assert_eq!(resolve_plain("inf", &opts), RawValue::Str("inf".into()));
        assert_eq!(resolve_plain("x", &opts), RawValue::Str("x".into()));
    }

    #[test]
    fn strict_booleans_keep_yaml11_words_as_strings() {
        let opts = Options {
            strict_booleans: true,
            ..Options::default()
        };
        assert_eq!(resolve_plain("yes", &opts), RawValue::Str("yes".into()));
        assert_eq!(resolve_plain("True", &opts), RawValue::Bool(true));
    }

    #[test]
    fn huge_integers_are_unsupported() {
        let opts = Options::default();
        assert!(matches!(
            resolve_plain("99999999999999999999", &opts),
            RawValue::Unsupported { .. }
        ));
        assert_eq!(parse_int("300000000000", false), IntLiteral::Fits(300_000_000_000));
    }

    #[test]
    fn legacy_octal_is_opt_in() {
        assert_eq!(parse_int("0017", false), IntLiteral::Fits(17));
        assert_eq!(parse_int("0017", true), IntLiteral::Fits(15));
    }
}
