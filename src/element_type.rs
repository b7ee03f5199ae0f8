//! The closed set of element types and the typed selectors used to extract payloads.

use std::fmt;

use crate::element::YamlElement;

/// Type of a [`YamlElement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum YamlElementType {
    Int,
    Double,
    String,
    Bool,
    List,
    Map,
}

impl YamlElementType {
    /// All element types, in declaration order.
    pub const VALUES: [YamlElementType; 6] = [
        YamlElementType::Int,
        YamlElementType::Double,
        YamlElementType::String,
        YamlElementType::Bool,
        YamlElementType::List,
        YamlElementType::Map,
    ];

    /// Upper-case name, as shown in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            YamlElementType::Int => "INT",
            YamlElementType::Double => "DOUBLE",
            YamlElementType::String => "STRING",
            YamlElementType::Bool => "BOOL",
            YamlElementType::List => "LIST",
            YamlElementType::Map => "MAP",
        }
    }

    /// Rust type of the payload an element of this type carries.
    pub const fn payload_type(self) -> &'static str {
        match self {
            YamlElementType::Int => "i64",
            YamlElementType::Double => "f64",
            YamlElementType::String => "String",
            YamlElementType::Bool => "bool",
            YamlElementType::List => "Vec<YamlElement>",
            YamlElementType::Map => "YamlMap",
        }
    }
}

impl fmt::Display for YamlElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed selector for one [`YamlElementType`].
///
/// Selectors tie an element type to its payload type at compile time, so that
/// `element.get(kind::Int)` returns `Option<&i64>` and a mismatched pairing does
/// not compile.
pub trait ElementKind: Copy {
    type Output: ?Sized;

    fn element_type(self) -> YamlElementType;

    fn extract(self, element: &YamlElement) -> Option<&Self::Output>;
}

/// Selectors for every element type.
pub mod kind {
    use super::{ElementKind, YamlElementType};
    use crate::element::YamlElement;
    use crate::yaml_map::YamlMap;

    macro_rules! element_kind {
        ($name:ident, $variant:ident, $output:ty) => {
            #[doc = concat!("Selects [`YamlElement::", stringify!($variant), "`].")]
            #[derive(Clone, Copy, Debug, PartialEq, Eq)]
            pub struct $name;

            impl ElementKind for $name {
                type Output = $output;

                fn element_type(self) -> YamlElementType {
                    YamlElementType::$variant
                }

                fn extract(self, element: &YamlElement) -> Option<&$output> {
                    match element {
                        YamlElement::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        };
    }

    element_kind!(Int, Int, i64);
    element_kind!(Double, Double, f64);
    element_kind!(Str, String, str);
    element_kind!(Bool, Bool, bool);
    element_kind!(List, List, [YamlElement]);
    element_kind!(Map, Map, YamlMap);
}
