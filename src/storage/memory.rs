//! In-memory backends.
//!
//! This is the reference implementation of `ContentGraph`, `AssetStore` and
//! `TagStore`. It uses ordered maps protected by RwLock, so cursor paging is
//! a range scan.
//!
//! ## Semantics
//!
//! - **Staged writes**: removals are recorded on the `MemoryTx` and applied
//!   by `commit_tx()`. `rollback_tx()` drops them.
//! - **Single-writer only**: commit takes the write locks one collection at a
//!   time. Two concurrent commits against the same store are not coordinated.
//! - **Stale removals**: a staged record that has vanished by commit time is
//!   reported in `CommitReport::failed` instead of being counted as removed.
//!
//! Use these backends for:
//! - Testing the scanner, sweeper and tag reconciler
//! - Running the CLI against a JSON snapshot (see `snapshot`)

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use async_trait::async_trait;

use crate::model::*;
use crate::tx::{CommitReport, FailedRemoval, Removal, Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::{AssetStore, ContentGraph, Page, Persistence, TagStore, WorkspaceScope};

// ============================================================================
// MemoryContentGraph
// ============================================================================

/// In-memory content graph.
#[derive(Clone)]
pub struct MemoryContentGraph {
    inner: Arc<GraphInner>,
}

struct GraphInner {
    nodes: RwLock<BTreeMap<NodeId, NodeSlot>>,
    next_node_id: AtomicU64,
}

impl MemoryContentGraph {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GraphInner {
                nodes: RwLock::new(BTreeMap::new()),
                next_node_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a node with a fresh id in `workspace`.
    pub fn create_node(&self, workspace: &str, props: PropertyMap) -> NodeId {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        let mut node = ContentNode::new(id, workspace);
        node.properties = props;
        self.inner.nodes.write().insert(id, NodeSlot::Loaded(node));
        id
    }

    /// Insert (or replace) a node under its own id.
    pub fn insert(&self, node: ContentNode) {
        self.bump_next_id(node.id);
        self.inner.nodes.write().insert(node.id, NodeSlot::Loaded(node));
    }

    /// Record a node the provider could not decode.
    pub fn insert_corrupt(&self, id: NodeId, workspace: &str, reason: impl Into<String>) {
        self.bump_next_id(id);
        self.inner.nodes.write().insert(id, NodeSlot::Corrupt {
            id,
            workspace: workspace.to_string(),
            reason: reason.into(),
        });
    }

    pub fn get_node(&self, id: NodeId) -> Option<NodeSlot> {
        self.inner.nodes.read().get(&id).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    fn bump_next_id(&self, id: NodeId) {
        self.inner.next_node_id.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for MemoryContentGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGraph for MemoryContentGraph {
    async fn workspaces(&self) -> Result<Vec<String>> {
        let nodes = self.inner.nodes.read();
        let mut names: Vec<String> = nodes.values().map(|n| n.workspace().to_string()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn nodes_page(
        &self,
        scope: &WorkspaceScope,
        after: Option<NodeId>,
        limit: usize,
    ) -> Result<Page<NodeSlot, NodeId>> {
        let nodes = self.inner.nodes.read();
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };

        // One extra entry tells us whether another page exists.
        let mut items: Vec<NodeSlot> = nodes
            .range((lower, Bound::Unbounded))
            .map(|(_, slot)| slot)
            .filter(|slot| scope.includes(slot.workspace()))
            .take(limit.saturating_add(1))
            .cloned()
            .collect();

        let next = if items.len() > limit {
            items.truncate(limit);
            items.last().map(NodeSlot::id)
        } else {
            None
        };

        Ok(Page { items, next })
    }
}

// ============================================================================
// MemoryMediaStore
// ============================================================================

/// In-memory asset and tag repository.
#[derive(Clone)]
pub struct MemoryMediaStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    images: RwLock<BTreeMap<AssetId, ImageRecord>>,
    tags: RwLock<BTreeMap<TagId, Tag>>,
    next_tx_id: AtomicU64,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                images: RwLock::new(BTreeMap::new()),
                tags: RwLock::new(BTreeMap::new()),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }

    /// Insert (or replace) an image record.
    pub fn insert_image(&self, image: ImageRecord) {
        self.inner.images.write().insert(image.identifier.clone(), image);
    }

    /// Insert (or replace) a tag.
    pub fn insert_tag(&self, tag: Tag) {
        self.inner.tags.write().insert(tag.id.clone(), tag);
    }

    /// All image records, ordered by identifier.
    pub fn images(&self) -> Vec<ImageRecord> {
        self.inner.images.read().values().cloned().collect()
    }

    /// All tags, ordered by id.
    pub fn tags(&self) -> Vec<Tag> {
        self.inner.tags.read().values().cloned().collect()
    }

    pub fn image_count(&self) -> usize {
        self.inner.images.read().len()
    }

    pub fn contains_image(&self, id: &AssetId) -> bool {
        self.inner.images.read().contains_key(id)
    }

    fn apply(&self, removal: &Removal) -> std::result::Result<(), String> {
        match removal {
            Removal::Image(id) => match self.inner.images.write().remove(id) {
                Some(_) => Ok(()),
                None => Err(format!("image {id} no longer present")),
            },
            Removal::Tag(id) => {
                if self.inner.tags.write().remove(id).is_none() {
                    return Err(format!("tag {id} no longer present"));
                }
                // Detach from any record still carrying it.
                for image in self.inner.images.write().values_mut() {
                    image.tags.retain(|t| t != id);
                }
                Ok(())
            }
        }
    }
}

impl Default for MemoryMediaStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction: a list of staged removals.
#[derive(Debug)]
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    staged: Vec<Removal>,
}

impl MemoryTx {
    fn stage(&mut self, removal: Removal) -> Result<()> {
        if self.mode == TxMode::ReadOnly {
            return Err(Error::TxError(format!("cannot stage {removal} on read-only {}", self.id)));
        }
        if !self.staged.contains(&removal) {
            self.staged.push(removal);
        }
        Ok(())
    }
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
    fn staged(&self) -> &[Removal] { &self.staged }
}

// ============================================================================
// Persistence / AssetStore / TagStore impls
// ============================================================================

#[async_trait]
impl Persistence for MemoryMediaStore {
    type Tx = MemoryTx;

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(MemoryTx { id, mode, staged: Vec::new() })
    }

    async fn commit_tx(&self, tx: MemoryTx) -> Result<CommitReport> {
        let mut report = CommitReport::default();
        for removal in tx.staged {
            match self.apply(&removal) {
                Ok(()) => report.committed.push(removal),
                Err(reason) => report.failed.push(FailedRemoval { removal, reason }),
            }
        }
        Ok(report)
    }

    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl AssetStore for MemoryMediaStore {
    async fn images_page(
        &self,
        _tx: &MemoryTx,
        after: Option<&AssetId>,
        limit: usize,
    ) -> Result<Page<ImageRecord, AssetId>> {
        let images = self.inner.images.read();
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };

        let mut items: Vec<ImageRecord> = images
            .range::<AssetId, _>((lower, Bound::Unbounded))
            .take(limit.saturating_add(1))
            .map(|(_, img)| img.clone())
            .collect();

        let next = if items.len() > limit {
            items.truncate(limit);
            items.last().map(|img| img.identifier.clone())
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn find_image(&self, _tx: &MemoryTx, id: &AssetId) -> Result<Option<ImageRecord>> {
        Ok(self.inner.images.read().get(id).cloned())
    }

    async fn count_all(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.images.read().len() as u64)
    }

    async fn stage_removal(&self, tx: &mut MemoryTx, id: &AssetId) -> Result<()> {
        if !self.inner.images.read().contains_key(id) {
            return Err(Error::NotFound(format!("Image {id}")));
        }
        tx.stage(Removal::Image(id.clone()))
    }

    async fn count_by_tag(&self, _tx: &MemoryTx, tag: &TagId) -> Result<u64> {
        Ok(self.inner.images.read().values().filter(|img| img.has_tag(tag)).count() as u64)
    }
}

#[async_trait]
impl TagStore for MemoryMediaStore {
    async fn all_tags(&self, _tx: &MemoryTx) -> Result<Vec<Tag>> {
        Ok(self.tags())
    }

    async fn stage_tag_removal(&self, tx: &mut MemoryTx, id: &TagId) -> Result<()> {
        if !self.inner.tags.read().contains_key(id) {
            return Err(Error::NotFound(format!("Tag {id}")));
        }
        tx.stage(Removal::Tag(id.clone()))
    }
}

// ============================================================================
// Tests
// ============================================================================
