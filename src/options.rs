use crate::budget::Budget;
use serde::{Deserialize, Serialize};

/// Duplicate key handling policy for mappings.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKeyPolicy {
    /// Error out on encountering a duplicate key.
    Error,
    /// First key wins: later duplicate pairs are skipped.
    FirstWins,
    /// Last key wins: later duplicate pairs replace earlier ones.
    LastWins,
}

/// Parser configuration options.
///
/// Use this to configure the duplicate-key policy, scalar resolution and an
/// optional parse [`Budget`].
///
/// ```rust
/// use yamlizer::options::DuplicateKeyPolicy;
/// use yamlizer::{YamlElementType, YamlMap};
///
/// let options = yamlizer::options! {
///     duplicate_keys: DuplicateKeyPolicy::FirstWins,
///     strict_booleans: true,
/// };
///
/// let map = YamlMap::parse("a: 1\na: 2\nflag: yes\n", &options).unwrap();
/// assert_eq!(map.get("a").and_then(|e| e.get(yamlizer::kind::Int)), Some(&1));
/// assert!(map.get("flag").unwrap().is(YamlElementType::String));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Optional YAML budget enforced while parsing.
    pub budget: Option<Budget>,
    /// Policy for duplicate keys.
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Enable legacy octal parsing where values starting with `00` are treated as base-8.
    /// They are deprecated in YAML 1.2. Default: false.
    pub legacy_octal_numbers: bool,
    /// If true, interpret only the exact literals `true` and `false` as booleans.
    /// YAML 1.1 forms like `yes`/`no`/`on`/`off` stay strings.
    /// Default: false (accept YAML 1.1 boolean forms).
    pub strict_booleans: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            budget: Some(Budget::default()),
            duplicate_keys: DuplicateKeyPolicy::LastWins,
            legacy_octal_numbers: false,
            strict_booleans: false,
        }
    }
}
