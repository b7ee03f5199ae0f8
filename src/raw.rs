//! Parser-level values, before they are tagged as [`crate::YamlElement`]s.

use indexmap::IndexMap;

/// A value exactly as the YAML parser resolved it.
///
/// This is richer than [`crate::YamlElement`]: it can hold nulls, explicitly tagged
/// nodes the parser does not interpret, and scalars that could not be resolved.
/// Those three shapes are what makes a value unassignable when it is tagged.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<RawValue>),
    /// Mapping with scalar keys, in document order.
    Map(IndexMap<String, RawValue>),
    /// A node carrying a tag outside the core schema, such as `!!timestamp`,
    /// `!!binary`, `!!set`, or a merge key's `<<` value.
    Tagged { tag: String, value: Box<RawValue> },
    /// A scalar whose forced or implied type could not be resolved. The text and tag
    /// are kept as written, so the node can be emitted again unchanged.
    Unsupported {
        text: String,
        tag: Option<String>,
        reason: String,
    },
}

impl RawValue {
    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            RawValue::Null => "null".to_owned(),
            RawValue::Bool(_) => "boolean".to_owned(),
            RawValue::Int(_) => "integer".to_owned(),
            RawValue::Float(_) => "float".to_owned(),
            RawValue::Str(_) => "string".to_owned(),
            RawValue::Seq(_) => "sequence".to_owned(),
            RawValue::Map(_) => "mapping".to_owned(),
            RawValue::Tagged { tag, .. } => format!("value tagged {tag}"),
            RawValue::Unsupported { reason, .. } => format!("unsupported value ({reason})"),
        }
    }

    /// Number of nodes in this subtree, counting the node itself.
    pub(crate) fn node_count(&self) -> usize {
        match self {
            RawValue::Seq(items) => 1 + items.iter().map(RawValue::node_count).sum::<usize>(),
            RawValue::Map(entries) => {
                1 + entries
                    .values()
                    .map(|v| 1 + v.node_count())
                    .sum::<usize>()
            }
            RawValue::Tagged { value, .. } => 1 + value.node_count(),
            _ => 1,
        }
    }
}

/// Insert `value` under `path` (already split into keys), creating intermediate
/// mappings. An intermediate node that is not a mapping is replaced by one.
pub(crate) fn insert_path(entries: &mut IndexMap<String, RawValue>, path: &[&str], value: RawValue) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut map = entries;
    for key in parents {
        let slot = map
            .entry((*key).to_owned())
            .or_insert_with(|| RawValue::Map(IndexMap::new()));
        if !matches!(slot, RawValue::Map(_)) {
            *slot = RawValue::Map(IndexMap::new());
        }
        let RawValue::Map(child) = slot else {
            return;
        };
        map = child;
    }
    map.insert((*last).to_owned(), value);
}
