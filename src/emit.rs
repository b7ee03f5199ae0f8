//! Block-style YAML output for [`YamlElement`] and [`RawValue`] trees.
//!
//! Strings are written plain when reading them back yields the same string, and
//! double-quoted otherwise. Floats always keep a decimal point or use the YAML
//! spellings `.nan`, `.inf` and `-.inf`, so they read back as floats. Nodes that are
//! never tagged as elements (nulls, tagged nodes, merge keys and unresolved scalars)
//! are written back in a form that reads as the same raw value.

use std::fmt::Write;

use indexmap::IndexMap;

use crate::element::YamlElement;
use crate::options::Options;
use crate::parse_scalars::resolve_plain;
use crate::raw::RawValue;
use crate::tags::TAG_MERGE;

const INDENT: usize = 2;
const CORE_PREFIX: &str = "tag:yaml.org,2002:";

/// Render an element as a YAML document.
///
/// ```rust
/// use yamlizer::{YamlElement, YamlMap, emit};
///
/// let mut map = YamlMap::new();
/// map.insert("port", 8080_i32);
/// map.insert("ratio", 1_f64);
/// map.insert("tags", vec![YamlElement::from("a"), YamlElement::from("yes")]);
/// assert_eq!(
///     emit::to_string(&YamlElement::Map(map)),
///     "port: 8080\nratio: 1.0\ntags:\n  - a\n  - \"yes\"\n"
/// );
/// ```
pub fn to_string(element: &YamlElement) -> String {
    raw_to_string(&element.to_raw())
}

/// Render a raw parser tree as a YAML document.
pub fn raw_to_string(value: &RawValue) -> String {
    let mut out = String::new();
    match value {
        RawValue::Map(map) if !map.is_empty() => write_map(&mut out, map, 0, false),
        RawValue::Seq(items) if !items.is_empty() => write_list(&mut out, items, 0, false),
        scalar => {
            write_inline(&mut out, scalar);
            out.push('\n');
        }
    }
    out
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat_n(' ', indent));
}

fn is_merge(key: &str, value: &RawValue) -> bool {
    key == "<<" && matches!(value, RawValue::Tagged { tag, .. } if tag == TAG_MERGE)
}

/// `continues_line` is set when the caller already wrote `- ` for the first entry.
fn write_map(out: &mut String, map: &IndexMap<String, RawValue>, indent: usize, continues_line: bool) {
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 || !continues_line {
            pad(out, indent);
        }
        match value {
            RawValue::Tagged { value: merged, .. } if is_merge(key, value) => {
                out.push_str("<<:");
                write_value(out, merged, indent);
            }
            _ => {
                write_key(out, key);
                out.push(':');
                write_value(out, value, indent);
            }
        }
    }
}

fn write_list(out: &mut String, items: &[RawValue], indent: usize, continues_line: bool) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 || !continues_line {
            pad(out, indent);
        }
        out.push_str("- ");
        match item {
            RawValue::Map(map) if !map.is_empty() => write_map(out, map, indent + INDENT, true),
            RawValue::Seq(inner) if !inner.is_empty() => write_list(out, inner, indent + INDENT, true),
            scalar => {
                write_inline(out, scalar);
                out.push('\n');
            }
        }
    }
}

/// Writes what follows `key:`.
fn write_value(out: &mut String, value: &RawValue, indent: usize) {
    match value {
        RawValue::Map(map) if !map.is_empty() => {
            out.push('\n');
            write_map(out, map, indent + INDENT, false);
        }
        RawValue::Seq(items) if !items.is_empty() => {
            out.push('\n');
            write_list(out, items, indent + INDENT, false);
        }
        scalar => {
            out.push(' ');
            write_inline(out, scalar);
            out.push('\n');
        }
    }
}

/// Scalars, empty collections and tagged nodes, on a single line.
fn write_inline(out: &mut String, value: &RawValue) {
    match value {
        RawValue::Null => out.push_str("null"),
        RawValue::Int(v) => {
            let _ = write!(out, "{v}");
        }
        RawValue::Float(v) => push_float_string(out, *v),
        RawValue::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        RawValue::Str(s) => push_string(out, s),
        RawValue::Unsupported { text, tag, .. } => match tag {
            Some(tag) => {
                push_tag(out, tag);
                out.push(' ');
                push_string(out, text);
            }
            // An unresolved plain scalar reads back as itself.
            None => out.push_str(text),
        },
        RawValue::Tagged { tag, value } => {
            push_tag(out, tag);
            out.push(' ');
            write_flow(out, value);
        }
        RawValue::Seq(_) | RawValue::Map(_) => write_flow(out, value),
    }
}

/// Flow style, for collections that must stay on the line of their tag.
fn write_flow(out: &mut String, value: &RawValue) {
    match value {
        RawValue::Seq(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_flow(out, item);
            }
            out.push(']');
        }
        RawValue::Map(map) => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if is_merge(key, value) {
                    out.push_str("<<");
                } else if is_plain_safe(key) && key != "<<" && is_flow_safe(key) {
                    out.push_str(key);
                } else {
                    push_quoted(out, key);
                }
                out.push_str(": ");
                match value {
                    RawValue::Tagged { value: merged, .. } if is_merge(key, value) => write_flow(out, merged),
                    _ => write_flow(out, value),
                }
            }
            out.push('}');
        }
        scalar => write_inline(out, scalar),
    }
}

fn push_string(out: &mut String, s: &str) {
    if is_plain_value_safe(s) {
        out.push_str(s);
    } else {
        push_quoted(out, s);
    }
}

/// Shorthand for core tags, local tags as written, everything else verbatim.
fn push_tag(out: &mut String, tag: &str) {
    if let Some(suffix) = tag.strip_prefix(CORE_PREFIX) {
        out.push_str("!!");
        out.push_str(suffix.trim_start_matches('!'));
    } else if tag.starts_with('!') {
        out.push_str(tag);
    } else {
        let _ = write!(out, "!<{tag}>");
    }
}

fn write_key(out: &mut String, key: &str) {
    if is_plain_safe(key) && key != "<<" && !key.ends_with(char::is_whitespace) {
        out.push_str(key);
    } else {
        push_quoted(out, key);
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Format as float string, make changes to be sure valid YAML float
/// (zmij may render `4e-6` and not `4.0e-6`).
fn push_float_string(target: &mut String, f: f64) {
    if f.is_nan() {
        target.push_str(".nan");
    } else if f.is_infinite() {
        target.push_str(if f.is_sign_positive() { ".inf" } else { "-.inf" });
    } else {
        let mut buf = zmij::Buffer::new();
        let s = buf.format_finite(f);
        if s.contains('.') {
            target.push_str(s);
        } else if let Some(exp_pos) = s.find(['e', 'E']) {
            // "4e-6" -> "4.0e-6"
            target.push_str(&s[..exp_pos]);
            target.push_str(".0");
            target.push_str(&s[exp_pos..]);
        } else {
            target.push_str(s);
            target.push_str(".0");
        }
    }
}

/// Returns true if `s` can be emitted as a plain key without quoting.
fn is_plain_safe(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s == "~"
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("true")
        || s.eq_ignore_ascii_case("false")
    {
        return false;
    }
    if starts_with_indicator(s) {
        return false;
    }
    if s.chars().any(|c| c.is_control()) {
        return false;
    }
    !(s.contains(':') || s.contains('#'))
}

/// Returns true if `s` can be emitted as a plain value and still read back as the
/// same string.
fn is_plain_value_safe(s: &str) -> bool {
    if s.is_empty() || starts_with_indicator(s) || s.ends_with(char::is_whitespace) {
        return false;
    }
    // Anything that would resolve to null, a boolean or a number must stay quoted.
    if !matches!(resolve_plain(s, &Options::default()), RawValue::Str(_)) {
        return false;
    }
    // Colon is fine, colon followed by space is not.
    if s.contains(": ") || s.ends_with(':') {
        return false;
    }
    !s.chars().any(|c| c.is_control() || matches!(c, '#' | ',' | '[' | ']' | '{' | '}'))
}

fn is_flow_safe(s: &str) -> bool {
    !s.chars().any(|c| matches!(c, ',' | '[' | ']' | '{' | '}'))
}

fn starts_with_indicator(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes[0].is_ascii_whitespace()
        || matches!(
            bytes[0],
            b'-' | b'?'
                | b':'
                | b'['
                | b']'
                | b'{'
                | b'}'
                | b'#'
                | b'&'
                | b'*'
                | b'!'
                | b'|'
                | b'>'
                | b'\''
                | b'"'
                | b'%'
                | b'@'
                | b'`'
                | b','
        )
}
