//! The deserialization dispatcher: maps a declared type to the rule that reads it.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::fmt;

use ahash::AHashMap;
use tracing::trace;

use crate::element::YamlElement;
use crate::element_type::{YamlElementType, kind};
use crate::error::Error;
use crate::options::Options;
use crate::parse_scalars::resolve_plain;
use crate::type_handler::{ClassId, Constructor, Produced, Shape, TypeHandler, YamlType, downcast};
use crate::yaml_map::YamlMap;

/// A registered rule, type-erased.
pub type Rule = Box<dyn Fn(&Yamlizer, &YamlElement, &TypeHandler) -> Result<Produced, Error>>;

/// Reads [`YamlElement`]s into values of declared types.
///
/// Rules are keyed by [`ClassId`]. Lookup tries the declared class first and then
/// each class on the handler's supertype ladder, in order, so an exact rule always
/// wins over a more general one and the result never depends on registration order.
/// Types without a rule still bind when they are arrays, enumerations or sections.
///
/// ```rust
/// use yamlizer::{TypeHandler, YamlElement, Yamlizer, kind};
///
/// let mut yamlizer = Yamlizer::new();
/// yamlizer.add_rule::<String, _>(|element, _: &TypeHandler| {
///     Ok(element.get(kind::Str).unwrap_or_default().to_uppercase())
/// });
/// let shout: String = yamlizer.deserialize(&YamlElement::from("hi")).unwrap();
/// assert_eq!(shout, "HI");
///
/// let ports: Vec<u16> = yamlizer
///     .deserialize(&YamlElement::from(vec![YamlElement::from(80_i64), YamlElement::from(443_i64)]))
///     .unwrap();
/// assert_eq!(ports, [80, 443]);
/// ```
pub struct Yamlizer {
    rules: AHashMap<ClassId, Rule>,
    scopes: RefCell<Vec<Scope>>,
}

/// Where the field being read comes from, for diagnostics of nested sections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Scope {
    /// The file (or other source) being loaded.
    pub(crate) origin: String,
    /// Dotted path of the field, from the document root.
    pub(crate) path: String,
}

impl Default for Yamlizer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Yamlizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.rules.keys().map(ClassId::name).collect();
        names.sort_unstable();
        f.debug_struct("Yamlizer").field("rules", &names).finish()
    }
}

impl Yamlizer {
    /// A dispatcher with the built-in rules registered.
    pub fn new() -> Self {
        let mut yamlizer = Self::empty();
        yamlizer.add_builtin_rules();
        yamlizer
    }

    /// A dispatcher without any rules.
    pub fn empty() -> Self {
        Self {
            rules: AHashMap::new(),
            scopes: RefCell::new(Vec::new()),
        }
    }

    /// Register a rule producing `T`, replacing any rule already registered for `T`.
    pub fn add_rule<T, F>(&mut self, rule: F) -> &mut Self
    where
        T: Any,
        F: Fn(&YamlElement, &TypeHandler) -> Result<T, Error> + 'static,
    {
        self.rules.insert(
            ClassId::of::<T>(),
            Box::new(move |_: &Yamlizer, element: &YamlElement, handler: &TypeHandler| {
                rule(element, handler).map(|v| Box::new(v) as Produced)
            }),
        );
        self
    }

    /// Register a type-erased rule for any class, including erased generic
    /// constructors and interfaces.
    ///
    /// The rule receives the dispatcher so it can read nested values.
    pub fn add_class_rule<F>(&mut self, class: ClassId, rule: F) -> &mut Self
    where
        F: Fn(&Yamlizer, &YamlElement, &TypeHandler) -> Result<Produced, Error> + 'static,
    {
        self.rules.insert(class, Box::new(rule));
        self
    }

    /// Unregister the rule for `class`; true if there was one.
    pub fn remove_rule(&mut self, class: ClassId) -> bool {
        self.rules.remove(&class).is_some()
    }

    /// True if a rule is registered for exactly `class`. Supertype rules are not consulted.
    pub fn has_rule(&self, class: ClassId) -> bool {
        self.rules.contains_key(&class)
    }

    /// Run `f` with `scope` as the innermost field being read.
    pub(crate) fn with_scope<R>(&self, scope: Scope, f: impl FnOnce() -> R) -> R {
        self.scopes.borrow_mut().push(scope);
        let result = f();
        self.scopes.borrow_mut().pop();
        result
    }

    /// The innermost field being read, if any.
    pub(crate) fn scope(&self) -> Option<Scope> {
        self.scopes.borrow().last().cloned()
    }

    /// Read `element` as a `T`.
    pub fn deserialize<T: YamlType>(&self, element: &YamlElement) -> Result<T, Error> {
        let handler = T::type_handler();
        downcast(self.deserialize_with(element, &handler)?)
    }

    /// Read `element` as the type described by `handler`.
    ///
    /// Order: a rule for the exact class, a rule for the first matching class on the
    /// supertype ladder, then the array, enumeration and section fallbacks.
    pub fn deserialize_with(&self, element: &YamlElement, handler: &TypeHandler) -> Result<Produced, Error> {
        if let Some(rule) = self.find_rule(handler) {
            return rule(self, element, handler);
        }
        match handler.shape() {
            Shape::Array { len } => self.read_array(element, handler, *len),
            Shape::Enumeration { name, from_name, .. } => {
                let value = require_str(element)?;
                from_name(value).ok_or_else(|| Error::UnknownVariant {
                    value: value.to_owned(),
                    enumeration: *name,
                })
            }
            Shape::Section { bind } => {
                let map = element
                    .get(kind::Map)
                    .ok_or_else(|| Error::mismatch(YamlElementType::Map, element.element_type()))?;
                bind(self, map)
            }
            Shape::Plain | Shape::Parameterized => Err(Error::NoRule {
                type_name: handler.type_name(),
            }),
        }
    }

    fn find_rule(&self, handler: &TypeHandler) -> Option<&Rule> {
        if let Some(rule) = self.rules.get(&handler.class()) {
            return Some(rule);
        }
        let found = handler
            .ladder()
            .iter()
            .find_map(|class| self.rules.get(class).map(|rule| (class, rule)));
        if let Some((class, _)) = found {
            trace!(declared = handler.type_name(), rule = class.name(), "using supertype rule");
        }
        found.map(|(_, rule)| rule)
    }

    fn read_array(&self, element: &YamlElement, handler: &TypeHandler, len: Option<usize>) -> Result<Produced, Error> {
        let items = element
            .get(kind::List)
            .ok_or_else(|| Error::mismatch(YamlElementType::List, element.element_type()))?;
        if let Some(expected) = len {
            if expected != items.len() {
                return Err(Error::LengthMismatch {
                    expected,
                    found: items.len(),
                });
            }
        }
        let component = handler.array_component().ok_or(Error::NoRule {
            type_name: handler.type_name(),
        })?;
        let values = items
            .iter()
            .map(|item| self.deserialize_with(item, component))
            .collect::<Result<Vec<_>, _>>()?;
        match handler.constructor() {
            Constructor::Sequence(assemble) => assemble(values),
            _ => component.default_sequence(values),
        }
    }

    fn add_builtin_rules(&mut self) {
        self.add_rule::<String, _>(|e, _| require_str(e).map(str::to_owned));
        self.add_rule::<i64, _>(|e, _| require_int(e));
        self.add_rule::<f64, _>(|e, _| require_number(e));
        self.add_rule::<bool, _>(|e, _| {
            e.get(kind::Bool)
                .copied()
                .ok_or_else(|| Error::mismatch(YamlElementType::Bool, e.element_type()))
        });
        self.add_rule::<i8, _>(narrow_int::<i8>);
        self.add_rule::<i16, _>(narrow_int::<i16>);
        self.add_rule::<i32, _>(narrow_int::<i32>);
        self.add_rule::<isize, _>(narrow_int::<isize>);
        self.add_rule::<u8, _>(narrow_int::<u8>);
        self.add_rule::<u16, _>(narrow_int::<u16>);
        self.add_rule::<u32, _>(narrow_int::<u32>);
        self.add_rule::<u64, _>(narrow_int::<u64>);
        self.add_rule::<usize, _>(narrow_int::<usize>);
        self.add_rule::<f32, _>(|e, _| {
            let value = require_number(e)?;
            if value.is_finite() && value.abs() > <f64 as From<f32>>::from(f32::MAX) {
                return Err(Error::Narrowing {
                    value: value.to_string(),
                    target: "f32",
                });
            }
            Ok(value as f32)
        });
        self.add_rule::<char, _>(|e, _| {
            require_str(e)?
                .chars()
                .next()
                .ok_or_else(|| Error::msg("an empty string cannot be read as a character"))
        });
        self.add_rule::<YamlElement, _>(|e, _| Ok(e.clone()));
        self.add_rule::<YamlMap, _>(|e, _| {
            e.get(kind::Map)
                .cloned()
                .ok_or_else(|| Error::mismatch(YamlElementType::Map, e.element_type()))
        });
        self.add_class_rule(ClassId::SEQUENCE, list_rule);
        self.add_class_rule(ClassId::MAPPING, map_rule);
    }
}

fn require_str(e: &YamlElement) -> Result<&str, Error> {
    e.get(kind::Str)
        .ok_or_else(|| Error::mismatch(YamlElementType::String, e.element_type()))
}

fn require_int(e: &YamlElement) -> Result<i64, Error> {
    e.get(kind::Int)
        .copied()
        .ok_or_else(|| Error::mismatch(YamlElementType::Int, e.element_type()))
}

/// A `DOUBLE`, or an `INT` widened to one.
fn require_number(e: &YamlElement) -> Result<f64, Error> {
    match e {
        YamlElement::Double(v) => Ok(*v),
        YamlElement::Int(v) => Ok(*v as f64),
        other => Err(Error::mismatch(YamlElementType::Double, other.element_type())),
    }
}

fn narrow_int<T: num_traits::NumCast>(e: &YamlElement, _: &TypeHandler) -> Result<T, Error> {
    let value = require_int(e)?;
    num_traits::cast::<i64, T>(value).ok_or_else(|| Error::Narrowing {
        value: value.to_string(),
        target: type_name::<T>(),
    })
}

/// Reads a `LIST` into the declared collection.
fn list_rule(yamlizer: &Yamlizer, e: &YamlElement, handler: &TypeHandler) -> Result<Produced, Error> {
    let items = e
        .get(kind::List)
        .ok_or_else(|| Error::mismatch(YamlElementType::List, e.element_type()))?;
    let item_handler = handler.parameter(0).ok_or(Error::NoRule {
        type_name: handler.type_name(),
    })?;
    let values = items
        .iter()
        .map(|item| yamlizer.deserialize_with(item, item_handler))
        .collect::<Result<Vec<_>, _>>()?;
    match handler.constructor() {
        Constructor::Sequence(build) => build(values),
        _ => item_handler.default_sequence(values),
    }
}

/// Reads a `MAP` into the declared map type.
///
/// Keys are read as `STRING` elements first. A key the declared type rejects as a
/// string is resolved the way a plain scalar would be (`1` as `INT`, `on` as `BOOL`)
/// and read again.
fn map_rule(yamlizer: &Yamlizer, e: &YamlElement, handler: &TypeHandler) -> Result<Produced, Error> {
    let map = e
        .get(kind::Map)
        .ok_or_else(|| Error::mismatch(YamlElementType::Map, e.element_type()))?;
    let (Some(key_handler), Some(value_handler)) = (handler.parameter(0), handler.parameter(1)) else {
        return Err(Error::NoRule {
            type_name: handler.type_name(),
        });
    };
    let Constructor::Entries(build) = handler.constructor() else {
        return Err(Error::NoRule {
            type_name: handler.type_name(),
        });
    };
    let entries = map
        .iter()
        .map(|(key, value)| {
            let key = read_key(yamlizer, key, key_handler)?;
            let value = yamlizer.deserialize_with(value, value_handler)?;
            Ok((key, value))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    build(entries)
}

fn read_key(yamlizer: &Yamlizer, key: &str, handler: &TypeHandler) -> Result<Produced, Error> {
    let err = match yamlizer.deserialize_with(&YamlElement::String(key.to_owned()), handler) {
        Ok(key) => return Ok(key),
        Err(err) => err,
    };
    match YamlElement::try_from(resolve_plain(key, &Options::default())) {
        Ok(element @ (YamlElement::Int(_) | YamlElement::Double(_) | YamlElement::Bool(_))) => {
            trace!(key, "reading key as {}", element.element_type());
            yamlizer.deserialize_with(&element, handler)
        }
        _ => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap, VecDeque};

    fn list<T: Into<YamlElement>>(items: impl IntoIterator<Item = T>) -> YamlElement {
        YamlElement::List(items.into_iter().map(Into::into).collect())
    }

    #[test]
    fn primitives() {
        let y = Yamlizer::new();
        assert_eq!(y.deserialize::<i32>(&YamlElement::from(8080_i64)).unwrap(), 8080);
        assert_eq!(y.deserialize::<String>(&YamlElement::from("x")).unwrap(), "x");
        assert!(y.deserialize::<bool>(&YamlElement::from(true)).unwrap());
        assert_eq!(y.deserialize::<f64>(&YamlElement::from(3_i64)).unwrap(), 3.0);
        assert_eq!(y.deserialize::<f32>(&YamlElement::from(0.5_f64)).unwrap(), 0.5);
        assert_eq!(y.deserialize::<char>(&YamlElement::from("yes")).unwrap(), 'y');
    }

    #[test]
    fn narrowing_fails_instead_of_wrapping() {
        let y = Yamlizer::new();
        let big = YamlElement::from(300_000_000_000_i64);
        let err = y.deserialize::<i16>(&big).unwrap_err();
        assert_eq!(err.kind(), "narrowing");
        assert!(y.deserialize::<u8>(&YamlElement::from(-1_i64)).is_err());
        assert!(y.deserialize::<f32>(&YamlElement::from(1e300_f64)).is_err());
        assert!(y.deserialize::<f32>(&YamlElement::Double(f64::INFINITY)).unwrap().is_infinite());
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let y = Yamlizer::new();
        let err = y.deserialize::<i32>(&YamlElement::from("8080")).unwrap_err();
        assert_eq!(err.to_string(), "expected INT, found STRING");
        assert!(y.deserialize::<char>(&YamlElement::from("")).is_err());
    }

    #[test]
    fn list_rule_preserves_size_and_order() {
        let y = Yamlizer::new();
        let e = list(["c", "a", "b"]);
        let v: Vec<String> = y.deserialize(&e).unwrap();
        assert_eq!(v, ["c", "a", "b"]);
        let d: VecDeque<String> = y.deserialize(&e).unwrap();
        assert_eq!(d.len(), 3);
        let s: BTreeSet<String> = y.deserialize(&e).unwrap();
        assert_eq!(s.into_iter().collect::<Vec<_>>(), ["a", "b", "c"]);

        let nested: Vec<Vec<i64>> = y
            .deserialize(&YamlElement::List(vec![list([1_i64, 2]), list([3_i64])]))
            .unwrap();
        assert_eq!(nested, [vec![1, 2], vec![3]]);
    }

    #[test]
    fn list_rule_fails_on_bad_items() {
        let y = Yamlizer::new();
        let e = YamlElement::List(vec![YamlElement::from(1_i64), YamlElement::from("two")]);
        assert!(y.deserialize::<Vec<i64>>(&e).is_err());
        assert!(y.deserialize::<Vec<i64>>(&YamlElement::from(1_i64)).is_err());
    }

    #[test]
    fn arrays_fall_back_without_a_rule() {
        let y = Yamlizer::new();
        let fixed: [u8; 3] = y.deserialize(&list([1_i64, 2, 3])).unwrap();
        assert_eq!(fixed, [1, 2, 3]);
        let err = y.deserialize::<[u8; 2]>(&list([1_i64, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 2, found: 3 }));
        let boxed: Box<[String]> = y.deserialize(&list(["a"])).unwrap();
        assert_eq!(&*boxed, ["a".to_owned()]);
    }

    #[test]
    fn maps_read_keys_as_strings() {
        let y = Yamlizer::new();
        let mut map = YamlMap::new();
        map.insert("a", 1_i64);
        map.insert("b", 2_i64);
        let read: HashMap<String, u8> = y.deserialize(&YamlElement::Map(map)).unwrap();
        assert_eq!(read.get("a"), Some(&1));
        assert_eq!(read.get("b"), Some(&2));
    }

    #[test]
    fn exact_rule_beats_supertype_rule() {
        let mut y = Yamlizer::new();
        y.add_class_rule(ClassId::erased::<Vec<()>>(), |_, _, _| {
            Ok(Box::new(vec![String::from("exact")]) as Produced)
        });
        let v: Vec<String> = y.deserialize(&list(["x", "y"])).unwrap();
        assert_eq!(v, ["exact"]);

        // VecDeque still goes through the general sequence rule.
        let d: VecDeque<String> = y.deserialize(&list(["x", "y"])).unwrap();
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn registration_order_does_not_matter() {
        let element = list(["q"]);
        let mut first = Yamlizer::empty();
        first.add_rule::<String, _>(|e, _| require_str(e).map(str::to_owned));
        first.add_class_rule(ClassId::SEQUENCE, list_rule);
        first.add_rule::<u8, _>(narrow_int::<u8>);

        let mut second = Yamlizer::empty();
        second.add_rule::<u8, _>(narrow_int::<u8>);
        second.add_class_rule(ClassId::SEQUENCE, list_rule);
        second.add_rule::<String, _>(|e, _| require_str(e).map(str::to_owned));

        let a: Vec<String> = first.deserialize(&element).unwrap();
        let b: Vec<String> = second.deserialize(&element).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn replacing_a_rule() {
        let mut y = Yamlizer::new();
        y.add_rule::<i32, _>(|_, _| Ok(42));
        assert_eq!(y.deserialize::<i32>(&YamlElement::from(1_i64)).unwrap(), 42);
        assert!(y.remove_rule(ClassId::of::<i32>()));
        assert!(!y.has_rule(ClassId::of::<i32>()));
        let err = y.deserialize::<i32>(&YamlElement::from(1_i64)).unwrap_err();
        assert!(matches!(err, Error::NoRule { type_name: "i32" }));
    }

    #[test]
    fn wrong_rule_output_is_a_downcast_error() {
        let mut y = Yamlizer::new();
        y.add_class_rule(ClassId::of::<i32>(), |_, _, _| Ok(Box::new("nope") as Produced));
        let err = y.deserialize::<i32>(&YamlElement::from(1_i64)).unwrap_err();
        assert_eq!(err.kind(), "downcast");
    }
}
