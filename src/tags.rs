//! Explicit YAML tags understood by the parser.
//!
//! saphyr-parser may spell the same core tag several ways depending on how the
//! document wrote it (`!!int`, a local `!int`, or the expanded canonical URI), so
//! every core tag is matched against all of its spellings.

use crate::options::Options;
use crate::parse_scalars::{IntLiteral, is_null, parse_int, parse_yaml11_bool, parse_yaml12_bool, parse_yaml12_f64};
use crate::raw::RawValue;

pub(crate) const TAG_STR: &[&str] = &["!!str", "!str", "tag:yaml.org,2002:str", "tag:yaml.org,2002:!str"];
pub(crate) const TAG_INT: &[&str] = &["!!int", "!int", "tag:yaml.org,2002:int", "tag:yaml.org,2002:!int"];
pub(crate) const TAG_FLOAT: &[&str] = &["!!float", "!float", "tag:yaml.org,2002:float", "tag:yaml.org,2002:!float"];
pub(crate) const TAG_BOOL: &[&str] = &["!!bool", "!bool", "tag:yaml.org,2002:bool", "tag:yaml.org,2002:!bool"];
pub(crate) const TAG_NULL: &[&str] = &["!!null", "!null", "tag:yaml.org,2002:null", "tag:yaml.org,2002:!null"];
pub(crate) const TAG_SEQ: &[&str] = &["!!seq", "!seq", "tag:yaml.org,2002:seq", "tag:yaml.org,2002:!seq"];
pub(crate) const TAG_MAP: &[&str] = &["!!map", "!map", "tag:yaml.org,2002:map", "tag:yaml.org,2002:!map"];

/// Tag attached to `<<` entries; merge keys are carried through but never interpreted.
pub(crate) const TAG_MERGE: &str = "tag:yaml.org,2002:merge";

/// Tags that keep a collection an ordinary sequence or mapping.
pub(crate) fn is_collection_tag(tag: Option<&str>, seq: bool) -> bool {
    match tag {
        None => true,
        Some(t) if seq => TAG_SEQ.contains(&t),
        Some(t) => TAG_MAP.contains(&t),
    }
}

/// Resolve a scalar carrying an explicit tag.
///
/// Core tags force the matching type; a value that does not parse as the forced
/// type is reported as unsupported. Every other tag (`!!timestamp`, `!!binary`,
/// `!!set`, application tags) is carried as [`RawValue::Tagged`].
pub(crate) fn resolve_tagged(tag: &str, value: &str, options: &Options) -> RawValue {
    let unsupported = || RawValue::Unsupported {
        text: value.to_owned(),
        tag: Some(tag.to_owned()),
        reason: format!("'{value}' is not a valid {tag}"),
    };
    if TAG_STR.contains(&tag) {
        RawValue::Str(value.to_owned())
    } else if TAG_INT.contains(&tag) {
        match parse_int(value, options.legacy_octal_numbers) {
            IntLiteral::Fits(v) => RawValue::Int(v),
            _ => unsupported(),
        }
    } else if TAG_FLOAT.contains(&tag) {
        match parse_int(value, options.legacy_octal_numbers) {
            IntLiteral::Fits(v) => RawValue::Float(v as f64),
            _ => parse_yaml12_f64(value).map(RawValue::Float).unwrap_or_else(unsupported),
        }
    } else if TAG_BOOL.contains(&tag) {
        let parsed = if options.strict_booleans {
            parse_yaml12_bool(value)
        } else {
            parse_yaml11_bool(value)
        };
        parsed.map(RawValue::Bool).unwrap_or_else(unsupported)
    } else if TAG_NULL.contains(&tag) {
        if is_null(value) { RawValue::Null } else { unsupported() }
    } else if TAG_SEQ.contains(&tag) || TAG_MAP.contains(&tag) {
        unsupported()
    } else {
        RawValue::Tagged {
            tag: tag.to_owned(),
            value: Box::new(RawValue::Str(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_tags_force_types() {
        let opts = Options::default();
        assert_eq!(resolve_tagged("!!str", "42", &opts), RawValue::Str("42".into()));
        assert_eq!(resolve_tagged("tag:yaml.org,2002:int", "42", &opts), RawValue::Int(42));
        assert_eq!(resolve_tagged("!!float", "3", &opts), RawValue::Float(3.0));
        assert_eq!(resolve_tagged("!!bool", "on", &opts), RawValue::Bool(true));
        assert_eq!(resolve_tagged("!!null", "~", &opts), RawValue::Null);
    }

    #[test]
    fn invalid_forced_values_are_unsupported() {
        let opts = Options::default();
        assert!(matches!(
            resolve_tagged("!!int", "abc", &opts),
            RawValue::Unsupported { .. }
        ));
    }

    #[test]
    fn other_tags_are_carried_uninterpreted() {
        let opts = Options::default();
        match resolve_tagged("tag:yaml.org,2002:timestamp", "2001-12-14", &opts) {
            RawValue::Tagged { tag, value } => {
                assert_eq!(tag, "tag:yaml.org,2002:timestamp");
                assert_eq!(*value, RawValue::Str("2001-12-14".into()));
            }
            other => panic!("expected tagged value, got {other:?}"),
        }
    }

    #[test]
    fn collection_tags() {
        assert!(is_collection_tag(None, true));
        assert!(is_collection_tag(Some("!!seq"), true));
        assert!(!is_collection_tag(Some("!!set"), false));
        assert!(is_collection_tag(Some("tag:yaml.org,2002:map"), false));
    }
}
