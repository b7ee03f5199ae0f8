//! Public macros for declaring options, enumerations and configuration sections.

/// Construct [`crate::Options`] from `Default` and a list of field assignments.
///
/// Example:
///
/// ```rust
/// use yamlizer::options::DuplicateKeyPolicy;
///
/// let options = yamlizer::options! {
///     duplicate_keys: DuplicateKeyPolicy::Error,
///     strict_booleans: true,
/// };
/// ```
#[macro_export]
macro_rules! options {
    ( $( $field:ident : $value:expr ),* $(,)? ) => {{
        let mut opt = $crate::Options::default();
        $(
            #[allow(deprecated)]
            {
                opt.$field = $value;
            }
        )*
        opt
    }};
}

/// Make a fieldless enum readable from YAML by the exact name of a variant.
///
/// Names default to the variant identifiers; give them explicitly with `=>`.
///
/// ```rust
/// use yamlizer::{YamlElement, Yamlizer};
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Level {
///     Info,
///     Warn,
/// }
///
/// yamlizer::yaml_enum! {
///     Level {
///         Info => "INFO",
///         Warn => "WARN",
///     }
/// }
///
/// let yamlizer = Yamlizer::new();
/// assert_eq!(yamlizer.deserialize::<Level>(&YamlElement::from("WARN")).unwrap(), Level::Warn);
/// assert!(yamlizer.deserialize::<Level>(&YamlElement::from("warn")).is_err());
/// ```
#[macro_export]
macro_rules! yaml_enum {
    ( $name:ident { $( $variant:ident => $text:literal ),* $(,)? } ) => {
        $crate::yaml_enum! { @impl $name { $( $variant => $text ),* } }
    };
    ( $name:ident { $( $variant:ident ),* $(,)? } ) => {
        $crate::yaml_enum! { @impl $name { $( $variant => stringify!($variant) ),* } }
    };
    ( @impl $name:ident { $( $variant:ident => $text:expr ),* } ) => {
        impl $crate::YamlType for $name {
            fn type_handler() -> $crate::TypeHandler {
                fn from_name(text: &str) -> ::core::option::Option<$crate::type_handler::Produced> {
                    $(
                        if text == $text {
                            return ::core::option::Option::Some(
                                ::std::boxed::Box::new($name::$variant) as $crate::type_handler::Produced,
                            );
                        }
                    )*
                    ::core::option::Option::None
                }
                $crate::TypeHandler::enumeration::<$name>(stringify!($name), &[$( $text ),*], from_name)
            }

            fn to_element(&self) -> ::core::result::Result<$crate::YamlElement, $crate::Error> {
                let text: &'static str = match self {
                    $( $name::$variant => $text, )*
                };
                ::core::result::Result::Ok($crate::YamlElement::from(text))
            }
        }
    };
}

/// Declare the fields of a configuration struct.
///
/// Each entry is `bind field`, `bind field at "dotted.path"` or `track field`.
/// Tracked fields are reported and saved but never loaded. The struct must implement
/// `Default`; besides [`crate::ConfigFields`] the macro also implements
/// [`crate::YamlType`], so the struct can be nested as a section of another
/// configuration.
#[macro_export]
macro_rules! config_fields {
    ( $name:ident { $( $mode:ident $field:ident $( at $path:literal )? ),* $(,)? } ) => {
        impl $crate::ConfigFields for $name {
            fn declare(fields: &mut $crate::FieldSet<Self>) {
                $( $crate::__config_field!(fields, $mode, $field $(, $path)?); )*
            }
        }

        impl $crate::YamlType for $name {
            fn type_handler() -> $crate::TypeHandler {
                $crate::TypeHandler::section::<$name>()
            }

            fn to_element(&self) -> ::core::result::Result<$crate::YamlElement, $crate::Error> {
                $crate::config::section_to_element(self)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __config_field {
    ($fields:ident, bind, $field:ident) => {
        $fields.bind(stringify!($field), |c| &c.$field, |c| &mut c.$field)
    };
    ($fields:ident, bind, $field:ident, $path:literal) => {
        $fields.bind_at(stringify!($field), $path, |c| &c.$field, |c| &mut c.$field)
    };
    ($fields:ident, track, $field:ident) => {
        $fields.track(stringify!($field), |c| &c.$field, |c| &mut c.$field)
    };
}
