//! Binding a configuration object to a YAML file.
//!
//! A configuration type lists its fields once, in [`ConfigFields::declare`]: each field
//! has a name, a getter and a setter, and is either bound (read by
//! [`YamlConfig::load`], optionally from a different key) or only tracked (shown by
//! [`YamlConfig::values`] and written by [`YamlConfig::save`]). The
//! [`crate::config_fields!`] macro writes the declaration for plain struct fields.
//!
//! ```rust
//! use yamlizer::{YamlConfig, config_fields};
//!
//! #[derive(Debug, Default)]
//! struct Server {
//!     port: i32,
//!     host: String,
//! }
//!
//! config_fields! {
//!     Server {
//!         bind port,
//!         bind host at "address.host",
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("server.yml");
//! std::fs::write(&path, "port: 80\naddress:\n  host: example.org\n").unwrap();
//!
//! let mut config = YamlConfig::new(&path, Server::default());
//! config.load().unwrap();
//! assert_eq!(config.port, 80);
//! assert_eq!(config.host, "example.org");
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{Dispatch, debug, info, warn};

use crate::element::YamlElement;
use crate::element_type::kind;
use crate::emit;
use crate::error::Error;
use crate::options::Options;
use crate::parser::parse_reader;
use crate::raw::{RawValue, insert_path};
use crate::type_handler::{Produced, TypeHandler, YamlType, downcast};
use crate::yaml_map::{YamlMap, split_path};
use crate::yamlizer::{Scope, Yamlizer};

/// Marks a field as bound from YAML.
///
/// `path` overrides the key the field is read from; `None` means the field name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigField {
    pub path: Option<&'static str>,
}

impl ConfigField {
    /// The key a field with this marker is read from.
    pub fn effective_key<'a>(&self, name: &'a str) -> &'a str {
        match self.path {
            Some(path) if !path.is_empty() => path,
            _ => name,
        }
    }
}

/// A configuration type whose fields can be bound from YAML.
pub trait ConfigFields: Any + Sized {
    fn declare(fields: &mut FieldSet<Self>);
}

type Reader<C> = Box<dyn Fn(&C) -> Result<YamlElement, Error>>;
type Writer<C> = Box<dyn Fn(&mut C, &Yamlizer, &YamlElement, &TypeHandler) -> Result<(), Error>>;

struct FieldBinding<C> {
    name: &'static str,
    marker: Option<ConfigField>,
    handler: TypeHandler,
    read: Reader<C>,
    write: Writer<C>,
}

/// The declared fields of a configuration type, in declaration order.
pub struct FieldSet<C> {
    fields: Vec<FieldBinding<C>>,
}

impl<C: ConfigFields> FieldSet<C> {
    /// Collect the declaration of `C`.
    pub fn of() -> Self {
        let mut fields = Self { fields: Vec::new() };
        C::declare(&mut fields);
        fields
    }
}

impl<C: 'static> FieldSet<C> {
    /// Bind a field to the key of the same name.
    pub fn bind<T, R, W>(&mut self, name: &'static str, read: R, write: W) -> &mut Self
    where
        T: YamlType,
        R: Fn(&C) -> &T + 'static,
        W: Fn(&mut C) -> &mut T + 'static,
    {
        self.push(name, Some(ConfigField::default()), read, write)
    }

    /// Bind a field to a dotted path instead of its name.
    pub fn bind_at<T, R, W>(&mut self, name: &'static str, path: &'static str, read: R, write: W) -> &mut Self
    where
        T: YamlType,
        R: Fn(&C) -> &T + 'static,
        W: Fn(&mut C) -> &mut T + 'static,
    {
        self.push(name, Some(ConfigField { path: Some(path) }), read, write)
    }

    /// Declare a field that is reported and saved but never loaded.
    pub fn track<T, R, W>(&mut self, name: &'static str, read: R, write: W) -> &mut Self
    where
        T: YamlType,
        R: Fn(&C) -> &T + 'static,
        W: Fn(&mut C) -> &mut T + 'static,
    {
        self.push(name, None, read, write)
    }

    fn push<T, R, W>(&mut self, name: &'static str, marker: Option<ConfigField>, read: R, write: W) -> &mut Self
    where
        T: YamlType,
        R: Fn(&C) -> &T + 'static,
        W: Fn(&mut C) -> &mut T + 'static,
    {
        self.fields.push(FieldBinding {
            name,
            marker,
            handler: T::type_handler(),
            read: Box::new(move |config: &C| read(config).to_element()),
            write: Box::new(
                move |config: &mut C, yamlizer: &Yamlizer, element: &YamlElement, handler: &TypeHandler| {
                    let value: T = downcast(yamlizer.deserialize_with(element, handler)?)?;
                    *write(config) = value;
                    Ok(())
                },
            ),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of all declared fields.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// The marker of a field, or `None` if the field is unknown or only tracked.
    pub fn marker(&self, name: &str) -> Option<ConfigField> {
        self.fields.iter().find(|f| f.name == name).and_then(|f| f.marker)
    }

    /// Bind every marked field present in `map`, returning how many were assigned.
    ///
    /// `prefix` is the dotted path of `map` within the document read from `origin`.
    /// Missing keys and fields that fail to read are logged and keep their current value.
    fn assign(&self, target: &mut C, yamlizer: &Yamlizer, map: &YamlMap, origin: &str, prefix: &str) -> usize {
        let mut assigned = 0;
        for field in &self.fields {
            let Some(marker) = field.marker else {
                continue;
            };
            let key = marker.effective_key(field.name);
            let path = join_path(prefix, key);
            let Some(element) = map.get_from_path(key) else {
                warn!(field = field.name, path = %path, "no value found at path '{path}' in {origin}");
                continue;
            };
            let scope = Scope {
                origin: origin.to_owned(),
                path: path.clone(),
            };
            match yamlizer.with_scope(scope, || (field.write)(target, yamlizer, element, &field.handler)) {
                Ok(()) => {
                    assigned += 1;
                    debug!(field = field.name, path = %path, "assigned {element}");
                }
                Err(err) => {
                    warn!(
                        field = field.name,
                        path = %path,
                        kind = err.kind(),
                        "unable to load field '{}' from {origin}: {err}",
                        field.name
                    );
                }
            }
        }
        assigned
    }

    /// Render every field whose value can be expressed as YAML.
    fn render(&self, source: &C) -> Vec<(&FieldBinding<C>, YamlElement)> {
        let mut rendered = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            match (field.read)(source) {
                Ok(element) => rendered.push((field, element)),
                Err(err) => warn!(field = field.name, kind = err.kind(), "skipping field '{}': {err}", field.name),
            }
        }
        rendered
    }
}

impl<C> fmt::Debug for FieldSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|field| (field.name, field.marker)))
            .finish()
    }
}

/// Binds a nested configuration section; used by [`TypeHandler::section`].
pub(crate) fn bind_section<T: ConfigFields + Default>(yamlizer: &Yamlizer, map: &YamlMap) -> Result<Produced, Error> {
    let mut value = T::default();
    let fields = FieldSet::<T>::of();
    match yamlizer.scope() {
        Some(Scope { origin, path }) => fields.assign(&mut value, yamlizer, map, &origin, &path),
        None => fields.assign(&mut value, yamlizer, map, &format!("section {}", type_name::<T>()), ""),
    };
    Ok(Box::new(value))
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Renders a nested configuration section as a map, keyed like [`YamlConfig::save`].
pub fn section_to_element<T: ConfigFields>(value: &T) -> Result<YamlElement, Error> {
    let fields = FieldSet::<T>::of();
    let mut map = YamlMap::new();
    for (field, element) in fields.render(value) {
        let key = field.marker.map_or(field.name, |m| m.effective_key(field.name));
        map.insert_path(key, element);
    }
    Ok(YamlElement::Map(map))
}

/// A configuration object bound to a YAML file.
///
/// The configuration value is reachable through `Deref`, so its fields read like the
/// binder's own.
pub struct YamlConfig<C: ConfigFields> {
    file_path: PathBuf,
    sub_path: String,
    logger: Option<Dispatch>,
    options: Options,
    resource_root: PathBuf,
    yamlizer: Yamlizer,
    fields: FieldSet<C>,
    inner: C,
}

impl<C: ConfigFields> YamlConfig<C> {
    /// Bind `value` to the file at `file_path`, with default options and the built-in rules.
    ///
    /// Nothing is read until [`YamlConfig::load`].
    pub fn new(file_path: impl Into<PathBuf>, value: C) -> Self {
        Self {
            file_path: file_path.into(),
            sub_path: String::new(),
            logger: None,
            options: Options::default(),
            resource_root: PathBuf::from("."),
            yamlizer: Yamlizer::new(),
            fields: FieldSet::of(),
            inner: value,
        }
    }

    /// The file read by `load` and written by `save`.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Point the binder at another file. Field values are left as they are.
    pub fn set_file_path(&mut self, file_path: impl Into<PathBuf>) -> &mut Self {
        self.file_path = file_path.into();
        self
    }

    /// Dotted path of the mapping the fields live in; empty for the document root.
    pub fn sub_path(&self) -> &str {
        &self.sub_path
    }

    /// Empty segments are ignored, so `"a..b."` is the same as `"a.b"`.
    pub fn set_sub_path(&mut self, sub_path: impl Into<String>) -> &mut Self {
        self.sub_path = sub_path.into();
        self
    }

    /// The dispatcher set with [`YamlConfig::set_logger`], if any.
    pub fn logger(&self) -> Option<&Dispatch> {
        self.logger.as_ref()
    }

    /// Route this binder's events to `logger` instead of the global subscriber.
    pub fn set_logger(&mut self, logger: Dispatch) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    /// Parser options used by `load` and `save`.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Takes effect on the next `load` or `save`.
    pub fn set_options(&mut self, options: Options) -> &mut Self {
        self.options = options;
        self
    }

    /// Defaults to the working directory.
    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    /// Directory that [`YamlConfig::copy_from_resource`] resolves names against.
    pub fn set_resource_root(&mut self, root: impl Into<PathBuf>) -> &mut Self {
        self.resource_root = root.into();
        self
    }

    /// The dispatcher used by [`YamlConfig::load`].
    pub fn yamlizer(&self) -> &Yamlizer {
        &self.yamlizer
    }

    /// The dispatcher used by [`YamlConfig::load`], for registering custom rules.
    pub fn yamlizer_mut(&mut self) -> &mut Yamlizer {
        &mut self.yamlizer
    }

    /// The fields `C` declares, in declaration order.
    pub fn fields(&self) -> &FieldSet<C> {
        &self.fields
    }

    /// The bound value. `YamlConfig` also derefs to it.
    pub fn get(&self) -> &C {
        &self.inner
    }

    /// Mutable access to the bound value; changes are written by the next `save`.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the binder, keeping the bound value.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn with_logger<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        match self.logger.clone() {
            Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || f(self)),
            None => f(self),
        }
    }

    /// Read the file and assign every bound field found in it.
    ///
    /// Fails only if the file is missing or unreadable, is not a YAML mapping, or the
    /// sub-path does not lead to a mapping. Fields that are missing or cannot be read
    /// are logged and keep their current values.
    pub fn load(&mut self) -> Result<(), Error> {
        self.with_logger(Self::load_inner)
    }

    fn load_inner(&mut self) -> Result<(), Error> {
        let file = File::open(&self.file_path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound {
                path: self.file_path.clone(),
            },
            _ => Error::from(err),
        })?;
        let root = parse_reader(BufReader::new(file), &self.options)?;
        let document = YamlMap::from_document(root).ok_or_else(|| Error::RootNotMap {
            path: Some(self.file_path.clone()),
        })?;

        let scope = if split_path(&self.sub_path).is_empty() {
            &document
        } else {
            document
                .get_from_path(&self.sub_path)
                .and_then(|e| e.get(kind::Map))
                .ok_or_else(|| Error::SubPathNotMap {
                    sub_path: self.sub_path.clone(),
                    path: self.file_path.clone(),
                })?
        };

        let origin = self.file_path.display().to_string();
        let prefix = split_path(&self.sub_path).join(".");
        let assigned = self.fields.assign(&mut self.inner, &self.yamlizer, scope, &origin, &prefix);
        info!(
            file = %origin,
            assigned,
            declared = self.fields.len(),
            "loaded configuration"
        );
        Ok(())
    }

    /// Current values of all declared fields, keyed by field name.
    ///
    /// Fields whose value cannot be rendered are logged and left out.
    pub fn values(&self) -> IndexMap<String, YamlElement> {
        self.fields
            .render(&self.inner)
            .into_iter()
            .map(|(field, element)| (field.name.to_owned(), element))
            .collect()
    }

    /// Write the declared fields to the file.
    ///
    /// Bound fields go to the key they are loaded from, tracked fields to their name,
    /// both under the sub-path. Keys of an existing file that no field writes are kept.
    pub fn save(&mut self) -> Result<(), Error> {
        self.with_logger(|config| config.save_inner())
    }

    fn save_inner(&self) -> Result<(), Error> {
        let mut document = if self.file_path.is_file() {
            let root = parse_reader(BufReader::new(File::open(&self.file_path)?), &self.options)?;
            match root {
                RawValue::Map(entries) => entries,
                RawValue::Null => IndexMap::new(),
                _ => {
                    return Err(Error::RootNotMap {
                        path: Some(self.file_path.clone()),
                    });
                }
            }
        } else {
            IndexMap::new()
        };

        let prefix = split_path(&self.sub_path).join(".");
        let rendered = self.fields.render(&self.inner);
        let written = rendered.len();
        for (field, element) in rendered {
            let key = field.marker.map_or(field.name, |m| m.effective_key(field.name));
            let full = join_path(&prefix, key);
            insert_path(&mut document, &split_path(&full), element.to_raw());
        }

        self.ensure_parent()?;
        fs::write(&self.file_path, emit::raw_to_string(&RawValue::Map(document)))?;
        info!(file = %self.file_path.display(), written, "saved configuration");
        Ok(())
    }

    /// True if the configuration file exists.
    pub fn file_exists(&self) -> bool {
        self.file_path.is_file()
    }

    fn ensure_parent(&self) -> Result<(), Error> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Create an empty configuration file, and its parent directories.
    pub fn create_file(&self) -> Result<(), Error> {
        self.ensure_parent()?;
        File::create(&self.file_path)?;
        debug!(file = %self.file_path.display(), "created file");
        Ok(())
    }

    /// Replace the file's contents with everything `source` yields.
    pub fn copy_file(&self, mut source: impl Read) -> Result<u64, Error> {
        self.ensure_parent()?;
        let mut file = File::create(&self.file_path)?;
        let copied = io::copy(&mut source, &mut file)?;
        debug!(file = %self.file_path.display(), bytes = copied, "copied into file");
        Ok(copied)
    }

    /// Replace the file's contents with the resource `name` under the resource root.
    pub fn copy_from_resource(&self, name: &str) -> Result<u64, Error> {
        let resource = self.resource_root.join(name);
        let source = File::open(&resource).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::ResourceNotFound {
                name: name.to_owned(),
            },
            _ => Error::from(err),
        })?;
        self.copy_file(BufReader::new(source))
    }

    /// Create the file unless it exists. Returns whether it was created.
    pub fn create_if_non_existent(&self) -> Result<bool, Error> {
        if self.file_exists() {
            return Ok(false);
        }
        self.create_file()?;
        Ok(true)
    }

    /// Fill the file from `source` unless it exists. Returns whether it was written.
    pub fn copy_if_non_existent(&self, source: impl Read) -> Result<bool, Error> {
        if self.file_exists() {
            return Ok(false);
        }
        self.copy_file(source)?;
        Ok(true)
    }

    /// Fill the file from the resource `name` unless it exists. Returns whether it was
    /// written.
    pub fn from_resource_if_non_existent(&self, name: &str) -> Result<bool, Error> {
        if self.file_exists() {
            return Ok(false);
        }
        self.copy_from_resource(name)?;
        Ok(true)
    }
}

impl<C: ConfigFields> Deref for YamlConfig<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: ConfigFields> DerefMut for YamlConfig<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: ConfigFields + fmt::Debug> fmt::Debug for YamlConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlConfig")
            .field("file_path", &self.file_path)
            .field("sub_path", &self.sub_path)
            .field("options", &self.options)
            .field("fields", &self.fields)
            .field("inner", &self.inner)
            .finish()
    }
}
