//! Defines error and its location
use std::fmt;
use std::path::PathBuf;

use saphyr_parser::{ScanError, Span};

use crate::budget::BudgetBreach;
use crate::element_type::YamlElementType;

/// Row/column location within the source YAML document (1-indexed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    /// 1-indexed row number in the input stream.
    pub(crate) row: u32,
    /// 1-indexed column number in the input stream.
    pub(crate) column: u32,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    pub const UNKNOWN: Self = Self { row: 0, column: 0 };

    pub(crate) const fn new(row: usize, column: usize) -> Self {
        Self {
            row: row as u32,
            column: column as u32,
        }
    }

    /// 1-indexed line.
    pub fn line(&self) -> u64 {
        self.row as u64
    }

    /// 1-indexed column.
    pub fn column(&self) -> u64 {
        self.column as u64
    }
}

/// Convert a `saphyr_parser::Span` to a 1-indexed `Location`.
pub(crate) fn location_from_span(span: &Span) -> Location {
    let start = &span.start;
    Location::new(start.line(), start.col() + 1)
}

/// Everything that can go wrong while parsing, tagging, dispatching or binding.
///
/// Errors up to and including [`Error::Downcast`] are local to a single
/// configuration field: the binder logs them and keeps the field's default.
/// The file-level variants are returned from [`crate::YamlConfig::load`].
#[derive(Debug)]
pub enum Error {
    /// Free-form error with optional source location.
    Message { msg: String, location: Location },
    /// The YAML text could not be scanned or parsed.
    Parse { msg: String, location: Location },
    /// A parse budget limit was exceeded.
    Budget {
        breach: BudgetBreach,
        location: Location,
    },
    /// The parser delivered a value that none of the six element types can hold.
    Unassignable { found: String },
    /// An element of one type was used where another type was required.
    TypeMismatch {
        expected: YamlElementType,
        found: YamlElementType,
    },
    /// A list held an element of an unexpected type.
    ListElementMismatch {
        index: usize,
        expected: YamlElementType,
        found: YamlElementType,
    },
    /// A numeric value does not fit the declared width.
    Narrowing { value: String, target: &'static str },
    /// A string does not name any variant of the declared enumeration.
    UnknownVariant {
        value: String,
        enumeration: &'static str,
    },
    /// A fixed-size array was fed a list of a different length.
    LengthMismatch { expected: usize, found: usize },
    /// No rule, array, enumeration or section handling applies to the declared type.
    NoRule { type_name: &'static str },
    /// A rule produced a value of a different type than the one declared.
    Downcast { expected: &'static str },
    /// A value cannot be rendered back to a YAML element.
    Unrepresentable { type_name: &'static str },
    /// The configuration file does not exist.
    FileNotFound { path: PathBuf },
    /// The configured sub-path does not resolve to a mapping.
    SubPathNotMap { sub_path: String, path: PathBuf },
    /// The document root is not a mapping; `path` is unset for in-memory input.
    RootNotMap { path: Option<PathBuf> },
    /// The input holds more than one YAML document.
    MultipleDocuments { location: Location },
    /// A resource to copy from could not be found.
    ResourceNotFound { name: String },
    /// Unexpected I/O error.
    Io { cause: std::io::Error },
}

impl Error {
    /// Construct a `Message` error with no known location. Custom rules use this to
    /// report values they cannot read.
    pub fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    pub fn mismatch(expected: YamlElementType, found: YamlElementType) -> Self {
        Error::TypeMismatch { expected, found }
    }

    /// Attach/override a concrete location to this error and return it.
    ///
    /// Variants that do not carry a location are returned unchanged.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        match &mut self {
            Error::Message { location, .. }
            | Error::Parse { location, .. }
            | Error::Budget { location, .. }
            | Error::MultipleDocuments { location } => {
                *location = set_location;
            }
            _ => {}
        }
        self
    }

    /// If the error has a known location, return it.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Message { location, .. }
            | Error::Parse { location, .. }
            | Error::Budget { location, .. }
            | Error::MultipleDocuments { location } => {
                if location != &Location::UNKNOWN {
                    Some(*location)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Short name of the failure class, used in per-field warnings.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Message { .. } => "message",
            Error::Parse { .. } => "parse error",
            Error::Budget { .. } => "budget breach",
            Error::Unassignable { .. } => "unassignable value",
            Error::TypeMismatch { .. } => "type mismatch",
            Error::ListElementMismatch { .. } => "list element mismatch",
            Error::Narrowing { .. } => "narrowing",
            Error::UnknownVariant { .. } => "unknown variant",
            Error::LengthMismatch { .. } => "length mismatch",
            Error::NoRule { .. } => "no deserializer",
            Error::Downcast { .. } => "downcast",
            Error::Unrepresentable { .. } => "unrepresentable",
            Error::FileNotFound { .. } => "file not found",
            Error::SubPathNotMap { .. } => "sub-path not a map",
            Error::RootNotMap { .. } => "root not a map",
            Error::MultipleDocuments { .. } => "multiple documents",
            Error::ResourceNotFound { .. } => "resource not found",
            Error::Io { .. } => "io",
        }
    }

    /// Map a `saphyr_parser::ScanError` into our error type with location.
    pub(crate) fn from_scan_error(err: ScanError) -> Self {
        let mark = err.marker();
        Error::Parse {
            msg: err.info().to_owned(),
            location: Location::new(mark.line(), mark.col() + 1),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message { msg, location } => fmt_with_location(f, msg, location),
            Error::Parse { msg, location } => {
                fmt_with_location(f, &format!("invalid YAML: {msg}"), location)
            }
            Error::Budget { breach, location } => {
                fmt_with_location(f, &format!("YAML budget breached: {breach:?}"), location)
            }
            Error::Unassignable { found } => {
                write!(f, "{found} is not assignable to a YAML element type")
            }
            Error::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Error::ListElementMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "element of index {index} is {found}, expected all to be of type {expected}"
            ),
            Error::Narrowing { value, target } => {
                write!(f, "{value} does not fit into {target}")
            }
            Error::UnknownVariant { value, enumeration } => {
                write!(f, "'{value}' is not a valid value for {enumeration}")
            }
            Error::LengthMismatch { expected, found } => {
                write!(f, "expected a list of {expected} elements, found {found}")
            }
            Error::NoRule { type_name } => write!(
                f,
                "unable to infer deserialization for {type_name} and no deserializer was found for it"
            ),
            Error::Downcast { expected } => {
                write!(f, "deserializer did not produce a value of type {expected}")
            }
            Error::Unrepresentable { type_name } => {
                write!(f, "{type_name} cannot be represented as YAML")
            }
            Error::FileNotFound { path } => write!(f, "file not found: {}", path.display()),
            Error::SubPathNotMap { sub_path, path } => write!(
                f,
                "sub-path '{sub_path}' in {} does not lead to a mapping",
                path.display()
            ),
            Error::RootNotMap { path: Some(path) } => {
                write!(f, "root of {} is not a mapping", path.display())
            }
            Error::RootNotMap { path: None } => f.write_str("document root is not a mapping"),
            Error::MultipleDocuments { location } => fmt_with_location(
                f,
                "expected a single YAML document, found more",
                location,
            ),
            Error::ResourceNotFound { name } => write!(f, "resource not found: {name}"),
            Error::Io { cause } => write!(f, "IO error: {cause}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { cause } => Some(cause),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(cause: std::io::Error) -> Self {
        Error::Io { cause }
    }
}

/// Print a message optionally suffixed with "at line X, column Y".
fn fmt_with_location(f: &mut fmt::Formatter<'_>, msg: &str, location: &Location) -> fmt::Result {
    if location != &Location::UNKNOWN {
        write!(
            f,
            "{msg} at line {}, column {}",
            location.row, location.column
        )
    } else {
        write!(f, "{msg}")
    }
}

/// Convert a budget breach report into a user-facing error.
pub(crate) fn budget_error(breach: BudgetBreach) -> Error {
    Error::Budget {
        breach,
        location: Location::UNKNOWN,
    }
}
