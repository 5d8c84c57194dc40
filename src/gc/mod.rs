//! # Mark and Sweep
//!
//! ```text
//! ContentGraph ──nodes_page──▶ Scanner ──LiveSet──▶ Sweeper ──stage/commit──▶ AssetStore
//!                                 │                                              │
//!                              resolver                         TagReconciler ◀──┘ (count_by_tag)
//! ```
//!
//! The live set is always complete before the first deletion decision; the
//! sweep stages every removal on one transaction and commits once at the
//! end, so a dry run or a cancellation leaves the store untouched.

pub mod resolver;
pub mod scanner;
pub mod sweeper;
pub mod tags;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::model::IdentityPolicy;
use crate::storage::{AssetStore, ContentGraph, WorkspaceScope};
use crate::{Error, Result};

pub use resolver::{resolve, resolve_nested};
pub use scanner::{ScanOutcome, Scanner};
pub use sweeper::{SweepReport, SweptAsset, Sweeper};
pub use tags::TagReconciler;

/// Default number of nodes / records fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

// ============================================================================
// Configuration
// ============================================================================

/// Settings for one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcConfig {
    /// Workspaces whose nodes keep images alive.
    pub scope: WorkspaceScope,
    /// Key used both to build the live set and to test stored records.
    pub identity: IdentityPolicy,
    /// Page size for node and record enumeration.
    pub page_size: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            scope: WorkspaceScope::All,
            identity: IdentityPolicy::Identifier,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl GcConfig {
    #[must_use]
    pub fn with_scope(mut self, scope: WorkspaceScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: IdentityPolicy) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page size must be at least 1".into()));
        }
        if let WorkspaceScope::Only(names) = &self.scope {
            if names.is_empty() {
                return Err(Error::Config("workspace scope names no workspace".into()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cooperative cancellation flag, checked between pages and between phases.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once `cancel()` has been called.
    pub fn check(&self, phase: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled(format!("interrupted during {phase}")))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Full collection
// ============================================================================

/// Result of a scan followed by a sweep.
#[derive(Debug, Clone)]
pub struct GcOutcome {
    pub scan: ScanOutcome,
    pub sweep: SweepReport,
}

/// Scan the whole graph, then sweep the asset store against the live set.
pub async fn collect_garbage<G, A>(
    graph: &G,
    store: &A,
    config: &GcConfig,
    dry_run: bool,
    cancel: &CancelToken,
) -> Result<GcOutcome>
where
    G: ContentGraph,
    A: AssetStore,
{
    config.validate()?;

    let scan = Scanner::new(graph, config).scan(cancel).await?;
    cancel.check("scan/sweep handover")?;
    let sweep = Sweeper::new(store, config).sweep(&scan.live, dry_run, cancel).await?;

    Ok(GcOutcome { scan, sweep })
}
