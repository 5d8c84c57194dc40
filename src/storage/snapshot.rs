//! JSON snapshot backend.
//!
//! A snapshot is one JSON document holding the content graph and the media
//! repository. It is loaded into the memory backends, the command runs, and,
//! only if something was committed, the media part is written back.
//!
//! ```text
//! {
//!   "nodes":  [ { "id": 1, "workspace": "live", "properties": { "hero": { "type": "Image", ... } } } ],
//!   "images": [ { "identifier": "...", "width": 800, "height": 600, "resource": { ... } } ],
//!   "tags":   [ { "id": "...", "label": "Nature" } ]
//! }
//! ```
//!
//! Nodes are kept as raw JSON and decoded one at a time. A property of a type
//! the model does not know decodes to `Value::Other`; only a node whose
//! envelope (id, workspace, property object) is broken turns into
//! `NodeSlot::Corrupt`. Nodes are written back verbatim.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::Result;
use super::{MemoryContentGraph, MemoryMediaStore};

/// On-disk snapshot of a content graph plus its media repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<serde_json::Value>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Snapshot {
    /// Read a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let snapshot = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            images = snapshot.images.len(),
            tags = snapshot.tags.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the in-memory backends from this snapshot.
    pub fn to_backends(&self) -> (MemoryContentGraph, MemoryMediaStore) {
        let graph = MemoryContentGraph::new();
        for (index, raw) in self.nodes.iter().enumerate() {
            load_node(&graph, index, raw);
        }

        let store = MemoryMediaStore::new();
        for image in &self.images {
            store.insert_image(image.clone());
        }
        for tag in &self.tags {
            store.insert_tag(tag.clone());
        }

        (graph, store)
    }

    /// Replace the media part with the current contents of `store`.
    pub fn capture(&mut self, store: &MemoryMediaStore) {
        self.images = store.images();
        self.tags = store.tags();
    }

    /// Write the snapshot to `path` via a temporary sibling file and rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = temp_path(path);
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), images = self.images.len(), "snapshot saved");
        Ok(())
    }
}

/// Node envelope. Properties stay raw so each can be decoded on its own.
#[derive(Deserialize)]
struct RawNode {
    id: NodeId,
    workspace: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    node_type: String,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

fn load_node(graph: &MemoryContentGraph, index: usize, raw: &serde_json::Value) {
    let Some(id) = raw.get("id").and_then(serde_json::Value::as_u64).map(NodeId) else {
        tracing::warn!(entry = index, "snapshot node without numeric id skipped");
        return;
    };
    let workspace = raw
        .get("workspace")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("live");

    let envelope = match RawNode::deserialize(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            graph.insert_corrupt(id, workspace, e.to_string());
            return;
        }
    };

    let properties = envelope
        .properties
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect();
    graph.insert(ContentNode {
        id: envelope.id,
        workspace: envelope.workspace,
        path: envelope.path,
        node_type: envelope.node_type,
        properties,
    });
}

/// Decode one property value. A type this crate does not model becomes
/// `Value::Other`; lists and maps are decoded entry by entry so one odd
/// element does not hide the media references beside it.
fn decode_value(raw: &serde_json::Value) -> Value {
    if let Ok(value) = Value::deserialize(raw) {
        return value;
    }
    let type_name = raw.get("type").and_then(serde_json::Value::as_str).unwrap_or("unknown");
    match (type_name, raw.get("value")) {
        ("List", Some(serde_json::Value::Array(items))) => {
            Value::List(items.iter().map(decode_value).collect())
        }
        ("Map", Some(serde_json::Value::Object(entries))) => Value::Map(
            entries.iter().map(|(k, v)| (k.clone(), decode_value(v))).collect(),
        ),
        _ => {
            tracing::debug!(value_type = type_name, "opaque property value");
            Value::Other(type_name.to_string())
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
