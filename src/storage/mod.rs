//! # Collaborator Contracts
//!
//! These traits are the only things the collector knows about the systems it
//! runs against: the content graph it reads and the asset/tag stores it
//! deletes from. Every enumeration is cursor-paged so a scan never has to
//! materialise a whole graph or repository.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryContentGraph` / `MemoryMediaStore` | `memory` | In-memory for testing/embedding |
//! | `Snapshot` | `snapshot` | JSON snapshot file loaded into the memory backends |

pub mod memory;
pub mod snapshot;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::tx::{CommitReport, Transaction, TxMode};
use crate::Result;

pub use memory::{MemoryContentGraph, MemoryMediaStore, MemoryTx};
pub use snapshot::Snapshot;

// ============================================================================
// Store Configuration
// ============================================================================

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// In-memory (no persistence)
    Memory,

    /// JSON snapshot file; written back after a successful commit
    Snapshot { path: PathBuf },
}

impl StoreConfig {
    /// Open the configured backend.
    pub fn open(&self) -> Result<OpenStore> {
        match self {
            StoreConfig::Memory => Ok(OpenStore {
                graph: MemoryContentGraph::new(),
                store: MemoryMediaStore::new(),
                snapshot: None,
            }),
            StoreConfig::Snapshot { path } => {
                let snapshot = Snapshot::load(path)?;
                let (graph, store) = snapshot.to_backends();
                Ok(OpenStore { graph, store, snapshot: Some((path.clone(), snapshot)) })
            }
        }
    }
}

/// Backends opened from a `StoreConfig`. Both handles share state with any
/// clone, so a `MediaManager` can own clones while this keeps the originals
/// for `persist`.
pub struct OpenStore {
    pub graph: MemoryContentGraph,
    pub store: MemoryMediaStore,
    snapshot: Option<(PathBuf, Snapshot)>,
}

impl OpenStore {
    /// Write the media store back to its snapshot. No-op for `Memory`.
    pub fn persist(&mut self) -> Result<()> {
        if let Some((path, snapshot)) = &mut self.snapshot {
            snapshot.capture(&self.store);
            snapshot.save(path)?;
        }
        Ok(())
    }

    pub fn is_persistent(&self) -> bool {
        self.snapshot.is_some()
    }
}

// ============================================================================
// Scan scope
// ============================================================================

/// Which workspaces a content scan covers.
///
/// An asset referenced only from a draft workspace is still live, so the
/// default is every workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceScope {
    #[default]
    All,
    Only(Vec<String>),
}

impl WorkspaceScope {
    pub fn includes(&self, workspace: &str) -> bool {
        match self {
            WorkspaceScope::All => true,
            WorkspaceScope::Only(names) => names.iter().any(|n| n == workspace),
        }
    }
}

// ============================================================================
// Paging
// ============================================================================

/// One page of a cursor-paged enumeration.
///
/// `next` is the cursor to pass back for the following page; `None` means
/// the enumeration is exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

// ============================================================================
// ContentGraph Trait
// ============================================================================

/// Read-only view of the content graph.
#[async_trait]
pub trait ContentGraph: Send + Sync + 'static {
    /// All workspace names known to the graph.
    async fn workspaces(&self) -> Result<Vec<String>>;

    /// Nodes in `scope` with an id greater than `after`, in ascending id
    /// order, at most `limit` entries.
    ///
    /// A node the provider cannot decode comes back as `NodeSlot::Corrupt`;
    /// an `Err` means the provider itself failed and the scan must stop.
    async fn nodes_page(
        &self,
        scope: &WorkspaceScope,
        after: Option<NodeId>,
        limit: usize,
    ) -> Result<Page<NodeSlot, NodeId>>;
}

// ============================================================================
// Persistence Trait
// ============================================================================

/// The commit boundary shared by the asset and tag stores.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    /// The transaction type for this store.
    type Tx: Transaction;

    /// Begin a new transaction.
    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    /// Apply every staged removal. Removals the store refuses are listed in
    /// `CommitReport::failed`; the rest are applied.
    async fn commit_tx(&self, tx: Self::Tx) -> Result<CommitReport>;

    /// Discard every staged removal.
    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;
}

// ============================================================================
// AssetStore Trait
// ============================================================================

/// Repository of stored image records.
#[async_trait]
pub trait AssetStore: Persistence {
    /// Images with an identifier greater than `after`, ascending, at most
    /// `limit` entries. Staged removals stay visible until commit.
    async fn images_page(
        &self,
        tx: &Self::Tx,
        after: Option<&AssetId>,
        limit: usize,
    ) -> Result<Page<ImageRecord, AssetId>>;

    /// Look up one image by identifier. Returns None if not found.
    async fn find_image(&self, tx: &Self::Tx, id: &AssetId) -> Result<Option<ImageRecord>>;

    /// Total number of image records.
    async fn count_all(&self, tx: &Self::Tx) -> Result<u64>;

    /// Stage an image (and its variants) for deletion.
    async fn stage_removal(&self, tx: &mut Self::Tx, id: &AssetId) -> Result<()>;

    /// Number of records currently carrying `tag`.
    async fn count_by_tag(&self, tx: &Self::Tx, tag: &TagId) -> Result<u64>;
}

// ============================================================================
// TagStore Trait
// ============================================================================

/// Repository of descriptive tags.
#[async_trait]
pub trait TagStore: Persistence {
    async fn all_tags(&self, tx: &Self::Tx) -> Result<Vec<Tag>>;

    /// Stage a tag for deletion.
    async fn stage_tag_removal(&self, tx: &mut Self::Tx, id: &TagId) -> Result<()>;
}
