//! Turns the saphyr-parser event stream into a [`RawValue`] tree.
//!
//! - Stream and document markers are consumed here; only a single document is accepted.
//! - Anchors are remembered per document and aliases are expanded by cloning the
//!   anchored subtree. Every expansion is charged to the node budget.
//! - Mapping keys must be scalars. Entries with sequence or mapping keys are skipped
//!   with a warning.
//! - A plain `<<` key is kept as an ordinary entry whose value is tagged as a merge;
//!   merges are never applied.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use encoding_rs_io::DecodeReaderBytesBuilder;
use indexmap::IndexMap;
use indexmap::map::Entry;
use nohash_hasher::BuildNoHashHasher;
use saphyr_parser::{Event, Parser, ScalarStyle};
use tracing::{trace, warn};

use crate::budget::BudgetEnforcer;
use crate::error::{Error, Location, budget_error, location_from_span};
use crate::options::{DuplicateKeyPolicy, Options};
use crate::parse_scalars::resolve_plain;
use crate::raw::RawValue;
use crate::tags::{TAG_MERGE, is_collection_tag, resolve_tagged};

/// How a completed node may serve as a mapping key.
#[derive(Debug)]
enum KeyHint {
    /// Scalar text as written in the document.
    Text(String),
    /// The plain, untagged `<<`.
    Merge,
    /// A collection; cannot be a key.
    Complex,
}

#[derive(Debug)]
enum Frame {
    Seq {
        anchor: usize,
        tag: Option<String>,
        items: Vec<RawValue>,
    },
    Map {
        anchor: usize,
        tag: Option<String>,
        entries: IndexMap<String, RawValue>,
        pending: Option<KeyHint>,
    },
}

struct TreeBuilder<'o> {
    options: &'o Options,
    stack: Vec<Frame>,
    anchors: HashMap<usize, RawValue, BuildNoHashHasher<usize>>,
    root: Option<RawValue>,
    budget: Option<BudgetEnforcer>,
    documents: usize,
}

/// Parse a single YAML document from a string.
///
/// An empty input yields [`RawValue::Null`].
pub fn parse_str(input: &str, options: &Options) -> Result<RawValue, Error> {
    let mut builder = TreeBuilder {
        options,
        stack: Vec::new(),
        anchors: HashMap::with_hasher(BuildNoHashHasher::default()),
        root: None,
        budget: options.budget.clone().map(BudgetEnforcer::new),
        documents: 0,
    };

    let mut parser = Parser::new_from_str(input);
    while let Some(item) = parser.next() {
        let (raw, span) = item.map_err(Error::from_scan_error)?;
        let location = location_from_span(&span);

        if let Some(ref mut budget) = builder.budget {
            if let Err(breach) = budget.observe(&raw) {
                return Err(budget_error(breach).with_location(location));
            }
        }
        builder
            .handle(raw)
            .map_err(|err| err.with_location(location))?;
    }

    if !builder.stack.is_empty() {
        return Err(Error::msg("unexpected end of YAML input"));
    }
    Ok(builder.root.unwrap_or(RawValue::Null))
}

/// Parse a single YAML document from a byte reader.
///
/// The encoding is sniffed from the byte order mark (UTF-8 when absent) and decoded
/// before parsing.
pub fn parse_reader<R: Read>(reader: R, options: &Options) -> Result<RawValue, Error> {
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(None)
        .build(reader);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    parse_str(&text, options)
}

impl TreeBuilder<'_> {
    fn handle(&mut self, raw: Event<'_>) -> Result<(), Error> {
        match raw {
            Event::StreamStart | Event::StreamEnd | Event::DocumentEnd | Event::Nothing => Ok(()),

            Event::DocumentStart(_) => {
                self.documents += 1;
                if self.documents > 1 {
                    return Err(Error::MultipleDocuments {
                        location: Location::UNKNOWN,
                    });
                }
                self.anchors.clear();
                Ok(())
            }

            Event::Scalar(val, style, anchor_id, tag) => {
                let text = match val {
                    Cow::Borrowed(v) => v.to_string(),
                    Cow::Owned(v) => v,
                };
                let tag = tag.map(|t| t.to_string());
                let plain = matches!(style, ScalarStyle::Plain);

                let value = match tag.as_deref() {
                    Some(tag) => resolve_tagged(tag, &text, self.options),
                    None if plain => resolve_plain(&text, self.options),
                    None => RawValue::Str(text.clone()),
                };
                if anchor_id != 0 {
                    self.anchors.insert(anchor_id, value.clone());
                }
                let hint = if plain && tag.is_none() && text == "<<" {
                    KeyHint::Merge
                } else {
                    KeyHint::Text(text)
                };
                self.push_node(value, hint)
            }

            Event::SequenceStart(anchor_id, tag) => {
                self.stack.push(Frame::Seq {
                    anchor: anchor_id,
                    tag: tag.map(|t| t.to_string()),
                    items: Vec::new(),
                });
                Ok(())
            }

            Event::MappingStart(anchor_id, tag) => {
                self.stack.push(Frame::Map {
                    anchor: anchor_id,
                    tag: tag.map(|t| t.to_string()),
                    entries: IndexMap::new(),
                    pending: None,
                });
                Ok(())
            }

            Event::SequenceEnd | Event::MappingEnd => {
                let (anchor, tag, value) = match self.stack.pop() {
                    Some(Frame::Seq { anchor, tag, items }) => {
                        let seq = is_collection_tag(tag.as_deref(), true);
                        (anchor, tag.filter(|_| !seq), RawValue::Seq(items))
                    }
                    Some(Frame::Map {
                        anchor,
                        tag,
                        entries,
                        pending,
                    }) => {
                        if pending.is_some() {
                            return Err(Error::msg("mapping ended before the value of its last key"));
                        }
                        let map = is_collection_tag(tag.as_deref(), false);
                        (anchor, tag.filter(|_| !map), RawValue::Map(entries))
                    }
                    None => return Err(Error::msg("unbalanced end of collection")),
                };
                let value = match tag {
                    Some(tag) => RawValue::Tagged {
                        tag,
                        value: Box::new(value),
                    },
                    None => value,
                };
                if anchor != 0 {
                    self.anchors.insert(anchor, value.clone());
                }
                self.push_node(value, KeyHint::Complex)
            }

            Event::Alias(anchor_id) => {
                let value = self
                    .anchors
                    .get(&anchor_id)
                    .cloned()
                    .ok_or_else(|| Error::msg(format!("unknown anchor id {anchor_id}")))?;
                if let Some(ref mut budget) = self.budget {
                    budget
                        .observe_expansion(value.node_count())
                        .map_err(budget_error)?;
                }
                trace!(anchor_id, "expanded alias");
                let hint = scalar_key_text(&value).map_or(KeyHint::Complex, KeyHint::Text);
                self.push_node(value, hint)
            }
        }
    }

    /// Hand a completed node to the enclosing collection, or make it the document root.
    fn push_node(&mut self, value: RawValue, hint: KeyHint) -> Result<(), Error> {
        let policy = self.options.duplicate_keys;
        match self.stack.last_mut() {
            None => {
                self.root = Some(value);
                Ok(())
            }
            Some(Frame::Seq { items, .. }) => {
                items.push(value);
                Ok(())
            }
            Some(Frame::Map {
                entries, pending, ..
            }) => {
                let Some(key) = pending.take() else {
                    *pending = Some(hint);
                    return Ok(());
                };
                let (key, value) = match key {
                    KeyHint::Text(key) => (key, value),
                    KeyHint::Merge => (
                        "<<".to_owned(),
                        RawValue::Tagged {
                            tag: TAG_MERGE.to_owned(),
                            value: Box::new(value),
                        },
                    ),
                    KeyHint::Complex => {
                        warn!("skipping mapping entry with a non-scalar key");
                        return Ok(());
                    }
                };
                match entries.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                    Entry::Occupied(mut slot) => match policy {
                        DuplicateKeyPolicy::Error => {
                            return Err(Error::msg(format!("duplicate mapping key: {}", slot.key())));
                        }
                        DuplicateKeyPolicy::FirstWins => {}
                        DuplicateKeyPolicy::LastWins => {
                            slot.insert(value);
                        }
                    },
                }
                Ok(())
            }
        }
    }
}

/// Text used as a key when an alias stands in key position.
fn scalar_key_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => Some("null".to_owned()),
        RawValue::Bool(b) => Some(b.to_string()),
        RawValue::Int(i) => Some(i.to_string()),
        RawValue::Float(f) => Some(f.to_string()),
        RawValue::Str(s) => Some(s.clone()),
        _ => None,
    }
}
