//! Structural descriptions of the types a configuration field may declare.
//!
//! A [`TypeHandler`] tells the [`crate::Yamlizer`] which rule class to look up, which
//! supertypes to fall back to, the descriptors of any type arguments, and how to
//! assemble a container, array, enumeration or nested section out of type-erased
//! values.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::config::{ConfigFields, bind_section};
use crate::element::YamlElement;
use crate::error::Error;
use crate::yaml_map::YamlMap;
use crate::yamlizer::Yamlizer;

/// A value produced by a rule, before it is downcast to the declared type.
pub type Produced = Box<dyn Any>;

/// Builds a container from values produced for its element type.
pub type FromSequence = fn(Vec<Produced>) -> Result<Produced, Error>;

/// Builds a map from produced `(key, value)` pairs.
pub type FromEntries = fn(Vec<(Produced, Produced)>) -> Result<Produced, Error>;

/// Looks an enumeration variant up by its exact name.
pub type FromName = fn(&str) -> Option<Produced>;

/// Binds a nested section from a mapping.
pub type BindSection = fn(&Yamlizer, &YamlMap) -> Result<Produced, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ClassKey {
    Concrete(TypeId),
    Erased(&'static str),
    Interface(&'static str),
}

/// Identity under which rules are registered and looked up.
///
/// Non-generic types are identified by their [`TypeId`]. Generic types are identified
/// by their erased constructor (`alloc::vec::Vec` for every `Vec<T>`), and capabilities
/// shared by many types (such as being a sequence) by an interface name.
#[derive(Clone, Copy)]
pub struct ClassId {
    key: ClassKey,
    name: &'static str,
}

impl ClassId {
    /// Any string-keyed map built through its from-entries constructor.
    pub const MAPPING: ClassId = ClassId::interface("mapping");
    /// Any collection built from a list.
    pub const SEQUENCE: ClassId = ClassId::interface("sequence");

    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            key: ClassKey::Concrete(TypeId::of::<T>()),
            name: type_name::<T>(),
        }
    }

    /// The generic constructor of `T`: its type name up to the first `<`.
    pub fn erased<T: ?Sized>() -> Self {
        let full = type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        Self {
            key: ClassKey::Erased(base),
            name: base,
        }
    }

    pub const fn interface(name: &'static str) -> Self {
        Self {
            key: ClassKey::Interface(name),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ClassId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ClassId {}

impl Hash for ClassId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// What the dispatcher falls back to when no rule matches.
#[derive(Clone, Debug)]
pub enum Shape {
    Plain,
    Parameterized,
    /// Fixed-size (`len` is `Some`) or growable native array.
    Array { len: Option<usize> },
    Enumeration {
        name: &'static str,
        variants: &'static [&'static str],
        from_name: FromName,
    },
    Section { bind: BindSection },
}

#[derive(Clone, Copy, Debug)]
pub enum Constructor {
    None,
    Sequence(FromSequence),
    Entries(FromEntries),
}

/// Descriptor of a declared target type.
#[derive(Clone, Debug)]
pub struct TypeHandler {
    class: ClassId,
    type_name: &'static str,
    parameters: Vec<TypeHandler>,
    array_component: Option<Box<TypeHandler>>,
    ladder: Vec<ClassId>,
    shape: Shape,
    constructor: Constructor,
    default_sequence: FromSequence,
}

impl TypeHandler {
    fn base<T: Any>(class: ClassId, shape: Shape) -> Self {
        Self {
            class,
            type_name: type_name::<T>(),
            parameters: Vec::new(),
            array_component: None,
            ladder: Vec::new(),
            shape,
            constructor: Constructor::None,
            default_sequence: collect_vec::<T>,
        }
    }

    /// A non-generic type, identified by its own class.
    pub fn plain<T: Any>() -> Self {
        Self::base::<T>(ClassId::of::<T>(), Shape::Plain)
    }

    /// A generic type, identified by its erased constructor.
    pub fn parameterized<T: Any>(parameters: Vec<TypeHandler>, constructor: Constructor) -> Self {
        Self {
            parameters,
            constructor,
            ..Self::base::<T>(ClassId::erased::<T>(), Shape::Parameterized)
        }
    }

    /// A native array of `component`, assembled by `assemble`.
    pub fn array<T: Any>(component: TypeHandler, len: Option<usize>, assemble: FromSequence) -> Self {
        Self {
            array_component: Some(Box::new(component)),
            constructor: Constructor::Sequence(assemble),
            ..Self::base::<T>(ClassId::of::<T>(), Shape::Array { len })
        }
    }

    /// An enumeration read from the exact name of one of its variants.
    pub fn enumeration<T: Any>(
        name: &'static str,
        variants: &'static [&'static str],
        from_name: FromName,
    ) -> Self {
        Self::base::<T>(
            ClassId::of::<T>(),
            Shape::Enumeration {
                name,
                variants,
                from_name,
            },
        )
    }

    /// A nested configuration section read from a mapping.
    pub fn section<T: ConfigFields + Default>() -> Self {
        Self::base::<T>(
            ClassId::of::<T>(),
            Shape::Section {
                bind: bind_section::<T>,
            },
        )
    }

    /// Add a supertype, scanned after the exact class during rule lookup.
    pub fn extends(mut self, class: ClassId) -> Self {
        self.ladder.push(class);
        self
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn parameters(&self) -> &[TypeHandler] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&TypeHandler> {
        self.parameters.get(index)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.shape, Shape::Array { .. })
    }

    pub fn array_component(&self) -> Option<&TypeHandler> {
        self.array_component.as_deref()
    }

    /// True for arrays whose component is itself a generic type.
    pub fn generic_array(&self) -> bool {
        self.array_component()
            .is_some_and(|c| !c.parameters.is_empty())
    }

    pub fn ladder(&self) -> &[ClassId] {
        &self.ladder
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn constructor(&self) -> Constructor {
        self.constructor
    }

    /// Build a `Vec` of this type from produced values.
    pub fn default_sequence(&self, items: Vec<Produced>) -> Result<Produced, Error> {
        (self.default_sequence)(items)
    }
}

/// Recover a concrete value from a [`Produced`] one.
pub fn downcast<T: Any>(value: Produced) -> Result<T, Error> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| Error::Downcast {
            expected: type_name::<T>(),
        })
}

fn downcast_all<T: Any>(items: Vec<Produced>) -> Result<Vec<T>, Error> {
    items.into_iter().map(downcast::<T>).collect()
}

fn collect_vec<T: Any>(items: Vec<Produced>) -> Result<Produced, Error> {
    Ok(Box::new(downcast_all::<T>(items)?))
}

/// A [`FromSequence`] for any collection of `U`.
pub fn from_sequence<C, U>(items: Vec<Produced>) -> Result<Produced, Error>
where
    C: FromIterator<U> + Any,
    U: Any,
{
    Ok(Box::new(downcast_all::<U>(items)?.into_iter().collect::<C>()))
}

/// A [`FromEntries`] for any map from `K` to `V`.
pub fn from_entries<M, K, V>(entries: Vec<(Produced, Produced)>) -> Result<Produced, Error>
where
    M: FromIterator<(K, V)> + Any,
    K: Any,
    V: Any,
{
    let map = entries
        .into_iter()
        .map(|(k, v)| Ok((downcast::<K>(k)?, downcast::<V>(v)?)))
        .collect::<Result<M, Error>>()?;
    Ok(Box::new(map))
}

fn fixed_array<U: Any, const N: usize>(items: Vec<Produced>) -> Result<Produced, Error> {
    let found = items.len();
    let array: [U; N] = downcast_all::<U>(items)?
        .try_into()
        .map_err(|_| Error::LengthMismatch { expected: N, found })?;
    Ok(Box::new(array))
}

fn boxed_slice<U: Any>(items: Vec<Produced>) -> Result<Produced, Error> {
    Ok(Box::new(downcast_all::<U>(items)?.into_boxed_slice()))
}

/// A type that can be declared as a configuration field.
///
/// `type_handler` describes how to read the type from YAML; `to_element` renders a
/// value back for [`crate::YamlConfig::values`] and [`crate::YamlConfig::save`].
pub trait YamlType: Any + Sized {
    fn type_handler() -> TypeHandler;

    fn to_element(&self) -> Result<YamlElement, Error>;
}

macro_rules! integer_types {
    ($($t:ty),*) => {
        $(
            impl YamlType for $t {
                fn type_handler() -> TypeHandler {
                    TypeHandler::plain::<$t>()
                }

                fn to_element(&self) -> Result<YamlElement, Error> {
                    i64::try_from(*self)
                        .map(YamlElement::Int)
                        .map_err(|_| Error::Narrowing {
                            value: self.to_string(),
                            target: "i64",
                        })
                }
            }
        )*
    };
}

integer_types!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl YamlType for f32 {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<f32>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(YamlElement::from(*self))
    }
}

impl YamlType for f64 {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<f64>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(YamlElement::Double(*self))
    }
}

impl YamlType for bool {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<bool>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(YamlElement::Bool(*self))
    }
}

impl YamlType for char {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<char>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(YamlElement::from(*self))
    }
}

impl YamlType for String {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<String>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(YamlElement::String(self.clone()))
    }
}

impl YamlType for YamlElement {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<YamlElement>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(self.clone())
    }
}

impl YamlType for YamlMap {
    fn type_handler() -> TypeHandler {
        TypeHandler::plain::<YamlMap>()
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        Ok(YamlElement::Map(self.clone()))
    }
}

fn list_element<'a, U: YamlType + 'a>(items: impl IntoIterator<Item = &'a U>) -> Result<YamlElement, Error> {
    items
        .into_iter()
        .map(U::to_element)
        .collect::<Result<Vec<_>, _>>()
        .map(YamlElement::List)
}

impl<U: YamlType> YamlType for Vec<U> {
    /// `Vec` has no constructor of its own: the sequence rule falls back to the
    /// element type's default sequence, which is exactly a `Vec<U>`.
    fn type_handler() -> TypeHandler {
        TypeHandler::parameterized::<Vec<U>>(vec![U::type_handler()], Constructor::None)
            .extends(ClassId::SEQUENCE)
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        list_element(self)
    }
}

macro_rules! sequence_types {
    ($($container:ident $(: $bound:path)?),*) => {
        $(
            impl<U: YamlType $(+ $bound)?> YamlType for $container<U> {
                fn type_handler() -> TypeHandler {
                    TypeHandler::parameterized::<$container<U>>(
                        vec![U::type_handler()],
                        Constructor::Sequence(from_sequence::<$container<U>, U>),
                    )
                    .extends(ClassId::SEQUENCE)
                }

                fn to_element(&self) -> Result<YamlElement, Error> {
                    list_element(self)
                }
            }
        )*
    };
}

sequence_types!(VecDeque, LinkedList, BTreeSet: Ord);

impl<U: YamlType + Eq + Hash> YamlType for HashSet<U> {
    fn type_handler() -> TypeHandler {
        TypeHandler::parameterized::<HashSet<U>>(
            vec![U::type_handler()],
            Constructor::Sequence(from_sequence::<HashSet<U>, U>),
        )
        .extends(ClassId::SEQUENCE)
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        list_element(self)
    }
}

impl<U: YamlType, const N: usize> YamlType for [U; N] {
    fn type_handler() -> TypeHandler {
        TypeHandler::array::<[U; N]>(U::type_handler(), Some(N), fixed_array::<U, N>)
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        list_element(self)
    }
}

impl<U: YamlType> YamlType for Box<[U]> {
    fn type_handler() -> TypeHandler {
        TypeHandler::array::<Box<[U]>>(U::type_handler(), None, boxed_slice::<U>)
    }

    fn to_element(&self) -> Result<YamlElement, Error> {
        list_element(self.iter())
    }
}

/// Text of a key element, for maps rendered back to YAML.
fn key_text(key: YamlElement) -> Result<String, Error> {
    match key {
        YamlElement::String(s) => Ok(s),
        YamlElement::Int(v) => Ok(v.to_string()),
        YamlElement::Double(v) => Ok(v.to_string()),
        YamlElement::Bool(v) => Ok(v.to_string()),
        YamlElement::List(_) | YamlElement::Map(_) => Err(Error::Unrepresentable {
            type_name: "collection used as a mapping key",
        }),
    }
}

fn map_element<'a, K, V>(entries: impl IntoIterator<Item = (&'a K, &'a V)>) -> Result<YamlElement, Error>
where
    K: YamlType + 'a,
    V: YamlType + 'a,
{
    entries
        .into_iter()
        .map(|(k, v)| Ok((key_text(k.to_element()?)?, v.to_element()?)))
        .collect::<Result<YamlMap, Error>>()
        .map(YamlElement::Map)
}

macro_rules! mapping_types {
    ($($map:ident: $($bound:path),+);*) => {
        $(
            impl<K: YamlType $(+ $bound)+, V: YamlType> YamlType for $map<K, V> {
                fn type_handler() -> TypeHandler {
                    TypeHandler::parameterized::<$map<K, V>>(
                        vec![K::type_handler(), V::type_handler()],
                        Constructor::Entries(from_entries::<$map<K, V>, K, V>),
                    )
                    .extends(ClassId::MAPPING)
                }

                fn to_element(&self) -> Result<YamlElement, Error> {
                    map_element(self)
                }
            }
        )*
    };
}

mapping_types!(HashMap: Eq, Hash; BTreeMap: Ord; IndexMap: Eq, Hash);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_types_share_an_erased_class() {
        assert_eq!(ClassId::erased::<Vec<i32>>(), ClassId::erased::<Vec<String>>());
        assert_ne!(ClassId::of::<Vec<i32>>(), ClassId::of::<Vec<String>>());
        assert_eq!(ClassId::erased::<Vec<i32>>().name(), "alloc::vec::Vec");
        assert_eq!(Vec::<u8>::type_handler().class(), ClassId::erased::<Vec<()>>());
    }

    #[test]
    fn parameters_are_described_recursively() {
        let handler = <HashMap<String, Vec<i16>>>::type_handler();
        assert_eq!(handler.parameters().len(), 2);
        assert_eq!(handler.parameter(0).map(TypeHandler::class), Some(ClassId::of::<String>()));
        let values = handler.parameter(1).unwrap();
        assert_eq!(values.parameter(0).map(TypeHandler::class), Some(ClassId::of::<i16>()));
        assert_eq!(handler.ladder(), [ClassId::MAPPING]);
    }

    #[test]
    fn arrays_describe_their_component() {
        let handler = <[Vec<u8>; 2]>::type_handler();
        assert!(handler.is_array());
        assert!(handler.generic_array());
        assert!(matches!(handler.shape(), Shape::Array { len: Some(2) }));

        let plain = <Box<[u8]>>::type_handler();
        assert!(plain.is_array());
        assert!(!plain.generic_array());
        assert!(!String::type_handler().is_array());
    }

    #[test]
    fn fixed_arrays_check_their_length() {
        let items: Vec<Produced> = vec![Box::new(1_u8), Box::new(2_u8)];
        let err = fixed_array::<u8, 3>(items).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 3, found: 2 }));
    }

    #[test]
    fn downcast_reports_expected_type() {
        let err = downcast::<String>(Box::new(5_i32)).unwrap_err();
        assert_eq!(err.to_string(), "deserializer did not produce a value of type alloc::string::String");
    }

    #[test]
    fn wide_integers_may_not_render() {
        assert!(u64::MAX.to_element().is_err());
        assert_eq!(7_u64.to_element().unwrap(), YamlElement::Int(7));
    }

    #[test]
    fn maps_render_with_text_keys() {
        let mut m = BTreeMap::new();
        m.insert(2_i32, "b".to_owned());
        m.insert(1_i32, "a".to_owned());
        let YamlElement::Map(map) = m.to_element().unwrap() else {
            panic!("not a map");
        };
        assert_eq!(map.keys().collect::<Vec<_>>(), ["1", "2"]);
    }
}
