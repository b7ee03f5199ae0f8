//! String-keyed mappings of tagged elements, and dotted-path access into them.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use smallvec::SmallVec;
use tracing::warn;

use crate::element::YamlElement;
use crate::element_type::{ElementKind, YamlElementType, kind};
use crate::error::Error;
use crate::options::Options;
use crate::parser::{parse_reader, parse_str};
use crate::raw::RawValue;

/// Ordered mapping from string keys to [`YamlElement`]s.
///
/// A `YamlMap` is also an element in its own right ([`YamlElement::Map`]), so nested
/// mappings are `YamlMap`s all the way down.
///
/// ```rust
/// use yamlizer::{Options, YamlMap, kind};
///
/// let map = YamlMap::parse("server:\n  port: 80\n", &Options::default()).unwrap();
/// let port = map.get_from_path("server.port").and_then(|e| e.get(kind::Int));
/// assert_eq!(port, Some(&80));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct YamlMap {
    entries: IndexMap<String, YamlElement>,
}

impl YamlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every entry of a raw mapping.
    ///
    /// Entries whose value cannot be tagged are logged and skipped; the rest of the
    /// map is kept.
    pub fn from_raw(raw: IndexMap<String, RawValue>) -> Self {
        let mut entries = IndexMap::with_capacity(raw.len());
        for (key, value) in raw {
            match YamlElement::try_from(value) {
                Ok(element) => {
                    entries.insert(key, element);
                }
                Err(err) => {
                    warn!(
                        key = %key,
                        "Unable to load {key}, as it doesn't represent a YAML primitive data type: {err}"
                    );
                }
            }
        }
        Self { entries }
    }

    /// Build a map from a whole parsed document.
    ///
    /// An empty document is an empty map. Returns `None` if the root is anything
    /// other than a mapping.
    pub fn from_document(root: RawValue) -> Option<Self> {
        match root {
            RawValue::Map(entries) => Some(Self::from_raw(entries)),
            RawValue::Null => Some(Self::default()),
            _ => None,
        }
    }

    /// Parse a YAML document whose root is a mapping.
    ///
    /// Any other root fails with [`Error::RootNotMap`]. `str::parse` does the same
    /// with default options.
    pub fn parse(input: &str, options: &Options) -> Result<Self, Error> {
        Self::from_document(parse_str(input, options)?).ok_or(Error::RootNotMap { path: None })
    }

    /// Read and parse a YAML document whose root is a mapping.
    pub fn from_reader<R: Read>(reader: R, options: &Options) -> Result<Self, Error> {
        Self::from_document(parse_reader(reader, options)?).ok_or(Error::RootNotMap { path: None })
    }

    pub fn get(&self, key: &str) -> Option<&YamlElement> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut YamlElement> {
        self.entries.get_mut(key)
    }

    /// Follow a sequence of keys through nested maps.
    ///
    /// Absent if the path is empty, if any key is missing, or if any element before the
    /// last is not a map.
    pub fn get_path(&self, path: &[&str]) -> Option<&YamlElement> {
        let (last, parents) = path.split_last()?;
        let mut map = self;
        for key in parents {
            map = map.get(key)?.get(kind::Map)?;
        }
        map.get(last)
    }

    /// Like [`YamlMap::get_path`], with the keys joined by `.`.
    ///
    /// Empty segments are ignored, so `"a..b"` and `".a.b"` both mean `a.b`.
    pub fn get_from_path(&self, path: &str) -> Option<&YamlElement> {
        self.get_path(&split_path(path))
    }

    /// Payloads of the list under `key`.
    ///
    /// `Ok(None)` if the key is absent; an error if the value is not a list or holds an
    /// item of another type.
    pub fn get_list_of<K: ElementKind>(
        &self,
        key: &str,
        kind: K,
    ) -> Result<Option<Vec<&K::Output>>, Error> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(element) => element.get_list_of(kind).map(Some),
        }
    }

    /// Insert an entry, returning the value it replaced. New keys go last.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<YamlElement>) -> Option<YamlElement> {
        self.entries.insert(key.into(), value.into())
    }

    /// Insert an entry under a dotted path, creating intermediate maps.
    ///
    /// An intermediate element that is not a map is replaced by a fresh map. Returns the
    /// replaced element, if any; an empty path inserts nothing.
    pub fn insert_path(&mut self, path: &str, value: impl Into<YamlElement>) -> Option<YamlElement> {
        let segments = split_path(path);
        let (last, parents) = segments.split_last()?;
        let mut map = self;
        for key in parents {
            let slot = map
                .entries
                .entry((*key).to_owned())
                .or_insert_with(|| YamlElement::Map(YamlMap::default()));
            if !slot.is(YamlElementType::Map) {
                *slot = YamlElement::Map(YamlMap::default());
            }
            let YamlElement::Map(child) = slot else {
                return None;
            };
            map = child;
        }
        map.insert(*last, value)
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<YamlElement> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &YamlElement> {
        self.entries.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, YamlElement> {
        self.entries.iter()
    }
}

impl FromStr for YamlMap {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Error> {
        Self::parse(input, &Options::default())
    }
}

/// Split a dotted path, dropping empty segments.
pub(crate) fn split_path(path: &str) -> SmallVec<[&str; 8]> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

impl FromIterator<(String, YamlElement)> for YamlMap {
    fn from_iter<I: IntoIterator<Item = (String, YamlElement)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for YamlMap {
    type Item = (String, YamlElement);
    type IntoIter = indexmap::map::IntoIter<String, YamlElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a YamlMap {
    type Item = (&'a String, &'a YamlElement);
    type IntoIter = indexmap::map::Iter<'a, String, YamlElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Extend<(String, YamlElement)> for YamlMap {
    fn extend<I: IntoIterator<Item = (String, YamlElement)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl fmt::Display for YamlMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for YamlMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
