//! Bind YAML configuration files to typed Rust structs.
//!
//! A document is parsed into [`YamlElement`]s, each tagged with one of six
//! [`YamlElementType`]s. A [`Yamlizer`] reads elements into declared types through
//! rules registered per type, and a [`YamlConfig`] walks the fields a configuration
//! struct declares, reading each from its key and logging the ones it cannot read.
//!
//! ```rust
//! use yamlizer::{YamlConfig, config_fields, yaml_enum};
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq)]
//! enum Level {
//!     #[default]
//!     Info,
//!     Warn,
//! }
//!
//! yaml_enum! { Level { Info => "INFO", Warn => "WARN" } }
//!
//! #[derive(Debug, Default)]
//! struct App {
//!     port: u16,
//!     level: Level,
//!     tags: Vec<String>,
//! }
//!
//! config_fields! {
//!     App {
//!         bind port,
//!         bind level,
//!         bind tags,
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("app.yml");
//! std::fs::write(&path, "app:\n  port: 8080\n  level: WARN\n  tags: [a, b]\n").unwrap();
//!
//! let mut config = YamlConfig::new(&path, App::default());
//! config.set_sub_path("app");
//! config.load().unwrap();
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.level, Level::Warn);
//! assert_eq!(config.tags, ["a", "b"]);
//! ```

pub use budget::{Budget, BudgetBreach};
pub use config::{ConfigField, ConfigFields, FieldSet, YamlConfig};
pub use element::YamlElement;
pub use element_type::{ElementKind, YamlElementType, kind};
pub use error::{Error, Location};
pub use options::Options;
pub use parser::{parse_reader, parse_str};
pub use raw::RawValue;
pub use type_handler::{ClassId, TypeHandler, YamlType};
pub use yaml_map::YamlMap;
pub use yamlizer::Yamlizer;

pub mod budget;
pub mod config;
mod element;
mod element_type;
pub mod emit;
mod error;
mod macros;
pub mod options;
mod parse_scalars;
mod parser;
mod raw;
mod tags;
pub mod type_handler;
mod yaml_map;
mod yamlizer;
