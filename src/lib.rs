//! # media-gc — Garbage Collection for Content-Graph Media
//!
//! Mark-and-sweep for image assets referenced from a versioned,
//! multi-workspace content graph.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `ContentGraph`, `AssetStore` and `TagStore` are the whole
//!    contract with the outside world; everything is injected.
//! 2. **Closed value set**: media references arrive as `Value::Image` /
//!    `Value::ImageVariant`, never as types to probe at runtime.
//! 3. **One identity key**: the live set derives keys itself, so scan and
//!    sweep cannot disagree on what "the same image" means.
//! 4. **Mark before sweep**: the live set is complete before any deletion is
//!    staged, and all deletions commit once at the end.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use media_gc::{CancelToken, GcConfig, MediaManager};
//! use media_gc::storage::{MemoryContentGraph, MemoryMediaStore};
//!
//! # async fn example() -> media_gc::Result<()> {
//! let manager = MediaManager::new(
//!     MemoryContentGraph::new(),
//!     MemoryMediaStore::new(),
//!     GcConfig::default(),
//! );
//!
//! let outcome = manager.gc(true, &CancelToken::new()).await?;
//! println!(
//!     "{} resource(s) total, {} resource(s) removed.",
//!     outcome.sweep.total_before, outcome.sweep.removed
//! );
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod tx;
pub mod storage;
pub mod gc;
pub mod report;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    AssetId, ContentNode, IdentityPolicy, ImageRecord, ImageRef, ImageVariant, LiveSet,
    NodeId, NodeSlot, PropertyMap, Resource, ResourceIdentity, Tag, TagId, Value, VariantRef,
};

// ============================================================================
// Re-exports: Storage / Transactions / Collector
// ============================================================================

pub use storage::{AssetStore, ContentGraph, Persistence, StoreConfig, TagStore, WorkspaceScope};
pub use tx::{CommitReport, Removal, Transaction, TxMode};
pub use gc::{CancelToken, GcConfig, GcOutcome, ScanOutcome, SweepReport, TagReconciler};

// ============================================================================
// Top-level MediaManager handle
// ============================================================================

/// The primary entry point. Wraps a content graph and a media store and
/// runs the operator commands against them.
pub struct MediaManager<G, S>
where
    G: ContentGraph,
    S: AssetStore + TagStore,
{
    graph: G,
    store: S,
    config: GcConfig,
}

impl<G, S> MediaManager<G, S>
where
    G: ContentGraph,
    S: AssetStore + TagStore,
{
    pub fn new(graph: G, store: S, config: GcConfig) -> Self {
        Self { graph, store, config }
    }

    /// Delete every image record, referenced or not.
    pub async fn prune(&self, dry_run: bool, cancel: &CancelToken) -> Result<SweepReport> {
        self.config.validate()?;
        gc::Sweeper::new(&self.store, &self.config).prune(dry_run, cancel).await
    }

    /// Scan the content graph, then delete every unreachable image record.
    pub async fn gc(&self, dry_run: bool, cancel: &CancelToken) -> Result<GcOutcome> {
        gc::collect_garbage(&self.graph, &self.store, &self.config, dry_run, cancel).await
    }

    /// Delete every tag no image carries any more. Run after `gc`.
    pub async fn cleanup_tags(&self) -> Result<Vec<String>> {
        TagReconciler::new(&self.store, &self.store).reconcile().await
    }

    /// Look up one image record.
    pub async fn show(&self, id: &AssetId) -> Result<ImageRecord> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let found = self.store.find_image(&tx, id).await;
        self.store.rollback_tx(tx).await?;
        found?.ok_or_else(|| Error::NotFound(format!("Image {id}")))
    }

    /// Visit every image record in identifier order, one page at a time.
    pub async fn for_each_image<F>(&self, mut visit: F) -> Result<u64>
    where
        F: FnMut(&ImageRecord) -> Result<()>,
    {
        self.config.validate()?;
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let mut seen = 0;
        let mut cursor: Option<AssetId> = None;
        let result = loop {
            let page = match self.store.images_page(&tx, cursor.as_ref(), self.config.page_size).await {
                Ok(page) => page,
                Err(e) => break Err(e),
            };
            if let Err(e) = page.items.iter().try_for_each(&mut visit) {
                break Err(e);
            }
            seen += page.items.len() as u64;
            match page.next {
                Some(next) => cursor = Some(next),
                None => break Ok(seen),
            }
        };
        self.store.rollback_tx(tx).await?;
        result
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Access the underlying content graph (for advanced use).
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Access the underlying media store (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
