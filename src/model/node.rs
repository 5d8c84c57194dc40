//! Node in the content graph.

use serde::{Deserialize, Serialize};
use super::{PropertyMap, Value};

/// Opaque node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A content node: one versioned entry of the content tree in one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: NodeId,
    /// Workspace the node lives in (`"live"`, `"user-admin"`, ...).
    pub workspace: String,
    /// Path in the content tree (e.g. `"/sites/acme/home"`).
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl ContentNode {
    pub fn new(id: NodeId, workspace: impl Into<String>) -> Self {
        Self {
            id,
            workspace: workspace.into(),
            path: String::new(),
            node_type: String::new(),
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One entry yielded by a content graph scan.
///
/// A provider that cannot materialise a node (undecodable properties,
/// half-written row) hands back `Corrupt` instead of failing the whole page.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSlot {
    Loaded(ContentNode),
    Corrupt {
        id: NodeId,
        workspace: String,
        reason: String,
    },
}

impl NodeSlot {
    pub fn id(&self) -> NodeId {
        match self {
            NodeSlot::Loaded(node) => node.id,
            NodeSlot::Corrupt { id, .. } => *id,
        }
    }

    pub fn workspace(&self) -> &str {
        match self {
            NodeSlot::Loaded(node) => &node.workspace,
            NodeSlot::Corrupt { workspace, .. } => workspace,
        }
    }
}

impl From<ContentNode> for NodeSlot {
    fn from(node: ContentNode) -> Self {
        NodeSlot::Loaded(node)
    }
}
