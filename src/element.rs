//! Tagged YAML values.

use std::fmt;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::element_type::{ElementKind, YamlElementType};
use crate::error::Error;
use crate::raw::RawValue;
use crate::yaml_map::YamlMap;

/// A YAML value whose payload always matches its [`YamlElementType`].
///
/// ```rust
/// use yamlizer::{YamlElement, YamlElementType, kind};
///
/// let e = YamlElement::from(8080_u16);
/// assert!(e.is(YamlElementType::Int));
/// assert_eq!(e.get(kind::Int), Some(&8080));
/// assert_eq!(e.get(kind::Str), None);
/// assert_eq!(e.to_string(), "[Type: INT, Value: 8080]");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum YamlElement {
    Int(i64),
    Double(f64),
    String(String),
    Bool(bool),
    List(Vec<YamlElement>),
    Map(YamlMap),
}

impl YamlElement {
    pub fn element_type(&self) -> YamlElementType {
        match self {
            YamlElement::Int(_) => YamlElementType::Int,
            YamlElement::Double(_) => YamlElementType::Double,
            YamlElement::String(_) => YamlElementType::String,
            YamlElement::Bool(_) => YamlElementType::Bool,
            YamlElement::List(_) => YamlElementType::List,
            YamlElement::Map(_) => YamlElementType::Map,
        }
    }

    /// True if this element carries the given type.
    pub fn is(&self, element_type: YamlElementType) -> bool {
        self.element_type() == element_type
    }

    /// The payload, if this element is of the kind's type.
    pub fn get<K: ElementKind>(&self, kind: K) -> Option<&K::Output> {
        kind.extract(self)
    }

    /// Payloads of a list whose items all carry the kind's type.
    ///
    /// Fails if this element is not a list, or with the index of the first item of
    /// another type.
    pub fn get_list_of<K: ElementKind>(&self, kind: K) -> Result<Vec<&K::Output>, Error> {
        let YamlElement::List(items) = self else {
            return Err(Error::mismatch(YamlElementType::List, self.element_type()));
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                kind.extract(item).ok_or_else(|| Error::ListElementMismatch {
                    index,
                    expected: kind.element_type(),
                    found: item.element_type(),
                })
            })
            .collect()
    }

    /// The untagged payload.
    pub fn to_raw(&self) -> RawValue {
        match self {
            YamlElement::Int(v) => RawValue::Int(*v),
            YamlElement::Double(v) => RawValue::Float(*v),
            YamlElement::String(v) => RawValue::Str(v.clone()),
            YamlElement::Bool(v) => RawValue::Bool(*v),
            YamlElement::List(items) => RawValue::Seq(items.iter().map(YamlElement::to_raw).collect()),
            YamlElement::Map(map) => RawValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_raw()))
                    .collect(),
            ),
        }
    }

    fn fmt_payload(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YamlElement::Int(v) => write!(f, "{v}"),
            YamlElement::Double(v) => write!(f, "{v}"),
            YamlElement::String(v) => f.write_str(v),
            YamlElement::Bool(v) => write!(f, "{v}"),
            YamlElement::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_payload(f)?;
                }
                f.write_str("]")
            }
            YamlElement::Map(map) => write!(f, "{map}"),
        }
    }
}

impl TryFrom<RawValue> for YamlElement {
    type Error = Error;

    /// Tag a raw parser value.
    ///
    /// Sequences are tagged item by item and fail as a whole if any item fails.
    /// Mappings become [`YamlMap`]s, which skip the entries they cannot tag.
    fn try_from(raw: RawValue) -> Result<Self, Error> {
        match raw {
            RawValue::Seq(items) => items
                .into_iter()
                .map(YamlElement::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(YamlElement::List),
            RawValue::Int(v) => Ok(YamlElement::Int(v)),
            RawValue::Float(v) => Ok(YamlElement::Double(v)),
            RawValue::Str(v) => Ok(YamlElement::String(v)),
            RawValue::Bool(v) => Ok(YamlElement::Bool(v)),
            RawValue::Map(entries) => Ok(YamlElement::Map(YamlMap::from_raw(entries))),
            other @ (RawValue::Null | RawValue::Tagged { .. } | RawValue::Unsupported { .. }) => {
                Err(Error::Unassignable {
                    found: other.describe(),
                })
            }
        }
    }
}

macro_rules! widen {
    ($variant:ident as $canonical:ty: $($t:ty),*) => {
        $(
            impl From<$t> for YamlElement {
                fn from(v: $t) -> Self {
                    YamlElement::$variant(<$canonical>::from(v))
                }
            }
        )*
    };
}

widen!(Int as i64: i8, i16, i32, i64, u8, u16, u32);
widen!(Double as f64: f32, f64);
widen!(Bool as bool: bool);
widen!(String as String: char, String, &str);
widen!(List as Vec<YamlElement>: Vec<YamlElement>);
widen!(Map as YamlMap: YamlMap);

impl fmt::Display for YamlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Type: {}, Value: ", self.element_type())?;
        self.fmt_payload(f)?;
        f.write_str("]")
    }
}

impl Serialize for YamlElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            YamlElement::Int(v) => serializer.serialize_i64(*v),
            YamlElement::Double(v) => serializer.serialize_f64(*v),
            YamlElement::String(v) => serializer.serialize_str(v),
            YamlElement::Bool(v) => serializer.serialize_bool(*v),
            YamlElement::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            YamlElement::Map(map) => map.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_type::kind;
    use indexmap::IndexMap;

    #[test]
    fn get_is_present_exactly_when_is_holds() {
        let samples = [
            YamlElement::from(1_i32),
            YamlElement::from(1.5_f32),
            YamlElement::from("s"),
            YamlElement::from(true),
            YamlElement::from(vec![YamlElement::from(1_u8)]),
            YamlElement::from(YamlMap::default()),
        ];
        for e in &samples {
            assert_eq!(e.get(kind::Int).is_some(), e.is(YamlElementType::Int));
            assert_eq!(e.get(kind::Double).is_some(), e.is(YamlElementType::Double));
            assert_eq!(e.get(kind::Str).is_some(), e.is(YamlElementType::String));
            assert_eq!(e.get(kind::Bool).is_some(), e.is(YamlElementType::Bool));
            assert_eq!(e.get(kind::List).is_some(), e.is(YamlElementType::List));
            assert_eq!(e.get(kind::Map).is_some(), e.is(YamlElementType::Map));
        }
    }

    #[test]
    fn widening_picks_canonical_types() {
        assert_eq!(YamlElement::from(-3_i8), YamlElement::Int(-3));
        assert_eq!(YamlElement::from(u32::MAX), YamlElement::Int(u32::MAX as i64));
        assert_eq!(YamlElement::from('z'), YamlElement::String("z".into()));
        assert_eq!(YamlElement::from(0.5_f32), YamlElement::Double(0.5));
    }

    #[test]
    fn nulls_and_tags_are_unassignable() {
        let err = YamlElement::try_from(RawValue::Null).unwrap_err();
        assert_eq!(err.kind(), "unassignable value");

        let tagged = RawValue::Tagged {
            tag: "tag:yaml.org,2002:timestamp".into(),
            value: Box::new(RawValue::Str("2001-12-14".into())),
        };
        assert!(YamlElement::try_from(tagged).is_err());
    }

    #[test]
    fn a_bad_item_fails_the_whole_list() {
        let raw = RawValue::Seq(vec![RawValue::Int(1), RawValue::Null]);
        assert!(YamlElement::try_from(raw).is_err());
    }

    #[test]
    fn nested_maps_skip_unassignable_entries() {
        let mut inner = IndexMap::new();
        inner.insert("ok".to_owned(), RawValue::Int(1));
        inner.insert("nothing".to_owned(), RawValue::Null);
        let e = YamlElement::try_from(RawValue::Map(inner)).unwrap();
        let map = e.get(kind::Map).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("ok"));
    }

    #[test]
    fn list_of_reports_the_offending_index() {
        let e = YamlElement::from(vec![
            YamlElement::from("a"),
            YamlElement::from("b"),
            YamlElement::from(3_i64),
        ]);
        match e.get_list_of(kind::Str) {
            Err(Error::ListElementMismatch {
                index,
                expected,
                found,
            }) => {
                assert_eq!(index, 2);
                assert_eq!(expected, YamlElementType::String);
                assert_eq!(found, YamlElementType::Int);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(YamlElement::from(1_i64).get_list_of(kind::Int).is_err());

        let ints = YamlElement::from(vec![YamlElement::from(1_i64), YamlElement::from(2_i64)]);
        assert_eq!(ints.get_list_of(kind::Int).unwrap(), [&1, &2]);
    }

    #[test]
    fn display_shows_type_and_value() {
        assert_eq!(YamlElement::from("x").to_string(), "[Type: STRING, Value: x]");
        let list = YamlElement::from(vec![YamlElement::from(1_i64), YamlElement::from(true)]);
        assert_eq!(list.to_string(), "[Type: LIST, Value: [1, true]]");
    }

    #[test]
    fn serializes_as_plain_json() {
        let list = YamlElement::from(vec![YamlElement::from(1_i64), YamlElement::from("a")]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"[1,"a"]"#);
    }

    #[test]
    fn to_raw_drops_tags() {
        let e = YamlElement::from(vec![YamlElement::from(2.5_f64)]);
        assert_eq!(e.to_raw(), RawValue::Seq(vec![RawValue::Float(2.5)]));
    }
}
