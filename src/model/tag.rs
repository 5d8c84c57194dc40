//! Descriptive tags attached to image records.

use serde::{Deserialize, Serialize};

/// Opaque tag identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub String);

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagId {
    fn from(s: &str) -> Self { TagId(s.to_owned()) }
}

impl From<String> for TagId {
    fn from(s: String) -> Self { TagId(s) }
}

/// A label attached to zero or more image records (many-to-many).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
}

impl Tag {
    pub fn new(id: impl Into<TagId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}
