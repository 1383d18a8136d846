//! Records, tag sets and evaluation errors.

use std::fmt;

use serde::Serialize;
use tagmod_core::CompareOp;

// ──────────────────────────────────────────────
// Tags
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered key/value pairs of one record.
///
/// Keys are normally unique but nothing enforces it: lookups read the first
/// matching tag and [`TagSet::remove_all`] drops every match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> Self {
        TagSet(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    /// Value of the first tag with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|t| t.key == key).map(|t| t.value.as_str())
    }

    pub fn count(&self, key: &str) -> usize {
        self.0.iter().filter(|t| t.key == key).count()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|t| t.key == key)
    }

    /// Overwrite the value of the first tag with `key`. Returns false if the
    /// key is absent.
    pub fn set_first(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.0.iter_mut().find(|t| t.key == key) {
            Some(tag) => {
                tag.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag::new(key, value));
    }

    /// Remove every tag with `key`, returning how many were dropped.
    pub fn remove_all(&mut self, key: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|t| t.key != key);
        before - self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TagSet(iter.into_iter().map(|(k, v)| Tag::new(k, v)).collect())
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A way: its OSM id and its tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: i64,
    pub tags: TagSet,
}

impl Record {
    pub fn new(id: i64, tags: TagSet) -> Self {
        Record { id, tags }
    }
}

// ──────────────────────────────────────────────
// Diagnostics and errors
// ──────────────────────────────────────────────

/// A recoverable, record-local problem met while applying a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub record_id: i64,
    pub rule_line: usize,
    pub message: String,
}

/// Fatal error evaluating a rule against one record.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An ordering operator met a value that is not a number.
    NonNumericComparison {
        key: String,
        op: CompareOp,
        tag_value: String,
        literal: String,
    },
    /// An AND/OR found fewer than two operands on the stack.
    MissingOperands { op: String },
    /// The condition did not reduce to exactly one boolean.
    UnbalancedCondition { remaining: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::NonNumericComparison {
                key,
                op,
                tag_value,
                literal,
            } => {
                write!(
                    f,
                    "non-numeric comparison for '{}': '{}' {} '{}'",
                    key, tag_value, op, literal
                )
            }
            EvalError::MissingOperands { op } => {
                write!(f, "insufficient operands for operator {}", op)
            }
            EvalError::UnbalancedCondition { remaining } => {
                write!(
                    f,
                    "invalid condition expression: {} values left on the stack",
                    remaining
                )
            }
        }
    }
}

impl std::error::Error for EvalError {}
