//! Overpass-style JSON way collections.
//!
//! Only the tags of `"type": "way"` elements are exposed for editing.
//! Everything else (other element kinds, node lists, geometry, top-level
//! metadata) is carried through unchanged and in its original order.

use serde_json::{Map, Value};
use tagmod_eval::{Record, TagSet};

use crate::error::DocumentError;

const ELEMENTS: &str = "elements";
const TAGS: &str = "tags";

#[derive(Debug, Clone)]
enum Element {
    Way {
        /// Index into `JsonDocument::records`
        record: usize,
        /// The element as read; its `tags` entry is replaced on output
        fields: Map<String, Value>,
    },
    Other(Value),
}

/// A parsed JSON way collection whose ways can be edited as [`Record`]s.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    /// Top-level object; `elements` is kept as a placeholder for ordering
    root: Map<String, Value>,
    elements: Vec<Element>,
    records: Vec<Record>,
}

impl JsonDocument {
    pub fn from_json_str(s: &str) -> Result<Self, DocumentError> {
        Self::from_value(serde_json::from_str(s)?)
    }

    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(mut root) = value else {
            return Err(DocumentError::MissingElements);
        };
        let raw_elements = match root.get_mut(ELEMENTS).map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => return Err(DocumentError::MissingElements),
        };

        let mut elements = Vec::with_capacity(raw_elements.len());
        let mut records = Vec::new();
        for (index, item) in raw_elements.into_iter().enumerate() {
            match item {
                Value::Object(fields) if fields.get("type").and_then(Value::as_str) == Some("way") => {
                    records.push(read_way(index, &fields)?);
                    elements.push(Element::Way {
                        record: records.len() - 1,
                        fields,
                    });
                }
                other => elements.push(Element::Other(other)),
            }
        }

        Ok(JsonDocument {
            root,
            elements,
            records,
        })
    }

    /// Ways in document order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Total number of elements, ways included.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Rebuild the JSON document with the current record tags.
    pub fn to_value(&self) -> Value {
        let elements: Vec<Value> = self
            .elements
            .iter()
            .map(|el| match el {
                Element::Other(v) => v.clone(),
                Element::Way { record, fields } => {
                    let mut fields = fields.clone();
                    if let Some(rec) = self.records.get(*record) {
                        // A null or missing `tags` stays as it was unless tags were added.
                        let had_object = matches!(fields.get(TAGS), Some(Value::Object(_)));
                        if had_object || !rec.tags.is_empty() {
                            fields.insert(TAGS.to_owned(), Value::Object(tags_object(rec)));
                        }
                    }
                    Value::Object(fields)
                }
            })
            .collect();

        let mut root = self.root.clone();
        root.insert(ELEMENTS.to_owned(), Value::Array(elements));
        Value::Object(root)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }
}

fn read_way(index: usize, fields: &Map<String, Value>) -> Result<Record, DocumentError> {
    let id = fields
        .get("id")
        .and_then(Value::as_i64)
        .ok_or(DocumentError::MissingWayId { index })?;

    let tags = match fields.get(TAGS) {
        None | Some(Value::Null) => TagSet::new(),
        Some(Value::Object(map)) => {
            let mut tags = TagSet::new();
            for (key, value) in map {
                let Value::String(v) = value else {
                    return Err(DocumentError::NonStringTag {
                        way: id,
                        key: key.clone(),
                    });
                };
                tags.push(key.as_str(), v.as_str());
            }
            tags
        }
        Some(_) => return Err(DocumentError::InvalidTags { way: id }),
    };
    Ok(Record::new(id, tags))
}

/// Tags as a JSON object. A JSON object cannot hold duplicate keys, so the
/// last value for a repeated key wins.
fn tags_object(record: &Record) -> Map<String, Value> {
    let mut map = Map::new();
    for tag in &record.tags {
        let previous = map.insert(tag.key.clone(), Value::String(tag.value.clone()));
        if previous.is_some() {
            tracing::warn!(
                way = record.id,
                key = %tag.key,
                "duplicate tag key collapsed on write"
            );
        }
    }
    map
}
