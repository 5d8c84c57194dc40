//! Asset repository sweeper: deletes every record absent from the live set.

use hashbrown::HashSet;
use serde::Serialize;

use crate::model::{AssetId, ImageRecord, LiveSet};
use crate::storage::AssetStore;
use crate::tx::{FailedRemoval, Transaction, TxMode};
use crate::Result;
use super::{CancelToken, GcConfig};

/// A record selected for deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweptAsset {
    pub identifier: AssetId,
    pub label: String,
    /// Original plus variants.
    pub byte_size: u64,
    pub variants: usize,
}

impl From<&ImageRecord> for SweptAsset {
    fn from(image: &ImageRecord) -> Self {
        Self {
            identifier: image.identifier.clone(),
            label: image.label.clone(),
            byte_size: image.total_byte_size(),
            variants: image.variants.len(),
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Records in the store when the sweep started.
    pub total_before: u64,
    /// Records actually removed, or that would be removed on a dry run.
    pub removed: u64,
    /// Every record selected for deletion, in identifier order.
    pub candidates: Vec<SweptAsset>,
    /// Staged removals the store refused at commit.
    pub failed: Vec<FailedRemoval>,
    pub dry_run: bool,
    /// Bytes freed by the removed records (originals plus variants).
    pub bytes_reclaimed: u64,
}

impl SweepReport {
    pub fn kept(&self) -> u64 {
        self.total_before.saturating_sub(self.removed)
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Tests every stored record against a live set and removes the rest.
pub struct Sweeper<'a, A: AssetStore> {
    store: &'a A,
    config: &'a GcConfig,
}

impl<'a, A: AssetStore> Sweeper<'a, A> {
    pub fn new(store: &'a A, config: &'a GcConfig) -> Self {
        Self { store, config }
    }

    /// Stage every record not in `live`, then commit once (or roll back on a
    /// dry run). Any error or cancellation before the commit rolls back.
    pub async fn sweep(&self, live: &LiveSet, dry_run: bool, cancel: &CancelToken) -> Result<SweepReport> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;

        let staged = self.stage_unreachable(&mut tx, live, cancel).await;
        let (total_before, candidates) = match staged {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(rollback) = self.store.rollback_tx(tx).await {
                    tracing::warn!(error = %rollback, "rollback after failed sweep also failed");
                }
                return Err(e);
            }
        };

        let mut report = SweepReport {
            total_before,
            dry_run,
            ..SweepReport::default()
        };

        if dry_run {
            self.store.rollback_tx(tx).await?;
            report.removed = candidates.len() as u64;
            report.bytes_reclaimed = candidates.iter().map(|c| c.byte_size).sum();
            report.candidates = candidates;
            tracing::info!(total = total_before, would_remove = report.removed, "dry run, nothing committed");
            return Ok(report);
        }

        tracing::debug!(tx = %tx.id(), staged = tx.staged().len(), "committing sweep");
        let commit = self.store.commit_tx(tx).await?;
        let committed: HashSet<AssetId> = commit.committed_images().cloned().collect();
        report.removed = committed.len() as u64;
        report.bytes_reclaimed = candidates
            .iter()
            .filter(|c| committed.contains(&c.identifier))
            .map(|c| c.byte_size)
            .sum();
        for failure in &commit.failed {
            tracing::warn!(removal = %failure.removal, reason = %failure.reason, "removal not committed");
        }
        report.failed = commit.failed;
        report.candidates = candidates;

        tracing::info!(
            total = report.total_before,
            removed = report.removed,
            failed = report.failed.len(),
            bytes = report.bytes_reclaimed,
            "sweep committed"
        );
        Ok(report)
    }

    /// Remove every record regardless of references.
    pub async fn prune(&self, dry_run: bool, cancel: &CancelToken) -> Result<SweepReport> {
        let nothing_live = LiveSet::new(self.config.identity);
        self.sweep(&nothing_live, dry_run, cancel).await
    }

    async fn stage_unreachable(
        &self,
        tx: &mut A::Tx,
        live: &LiveSet,
        cancel: &CancelToken,
    ) -> Result<(u64, Vec<SweptAsset>)> {
        let total_before = self.store.count_all(tx).await?;
        tracing::info!(total = total_before, live = live.len(), identity = %live.policy(), "sweeping asset store");

        let mut candidates = Vec::new();
        let mut cursor: Option<AssetId> = None;
        loop {
            cancel.check("sweep")?;
            let page = self
                .store
                .images_page(tx, cursor.as_ref(), self.config.page_size)
                .await?;

            for image in &page.items {
                if live.contains(image) {
                    continue;
                }
                tracing::debug!(image = %image.identifier, label = %image.label, "unreachable");
                self.store.stage_removal(tx, &image.identifier).await?;
                candidates.push(SweptAsset::from(image));
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        // Last chance to back out before anything becomes visible.
        cancel.check("sweep")?;
        Ok((total_before, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::storage::{MemoryMediaStore, MemoryTx, Page, Persistence};
    use crate::tx::{CommitReport, Removal};
    use crate::Error;
    use async_trait::async_trait;

    /// Another writer deletes `victim` between staging and commit.
    struct RacingStore {
        inner: MemoryMediaStore,
        victim: AssetId,
    }

    #[async_trait]
    impl Persistence for RacingStore {
        type Tx = MemoryTx;

        async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
            self.inner.begin_tx(mode).await
        }

        async fn commit_tx(&self, tx: MemoryTx) -> Result<CommitReport> {
            let mut other = self.inner.begin_tx(TxMode::ReadWrite).await?;
            self.inner.stage_removal(&mut other, &self.victim).await?;
            self.inner.commit_tx(other).await?;
            self.inner.commit_tx(tx).await
        }

        async fn rollback_tx(&self, tx: MemoryTx) -> Result<()> {
            self.inner.rollback_tx(tx).await
        }
    }

    #[async_trait]
    impl AssetStore for RacingStore {
        async fn images_page(
            &self,
            tx: &MemoryTx,
            after: Option<&AssetId>,
            limit: usize,
        ) -> Result<Page<ImageRecord, AssetId>> {
            self.inner.images_page(tx, after, limit).await
        }

        async fn find_image(&self, tx: &MemoryTx, id: &AssetId) -> Result<Option<ImageRecord>> {
            self.inner.find_image(tx, id).await
        }

        async fn count_all(&self, tx: &MemoryTx) -> Result<u64> {
            self.inner.count_all(tx).await
        }

        async fn stage_removal(&self, tx: &mut MemoryTx, id: &AssetId) -> Result<()> {
            self.inner.stage_removal(tx, id).await
        }

        async fn count_by_tag(&self, tx: &MemoryTx, tag: &TagId) -> Result<u64> {
            self.inner.count_by_tag(tx, tag).await
        }
    }

    fn store_with(ids: &[&str]) -> MemoryMediaStore {
        let store = MemoryMediaStore::new();
        for id in ids {
            store.insert_image(
                ImageRecord::new(*id, 10, 10, Resource::new(format!("{id}.jpg"), 2048, format!("sha-{id}")))
                    .with_variant(format!("{id}-small"), 5, 5, Resource::new("s.jpg", 1024, "x")),
            );
        }
        store
    }

    fn live_of(ids: &[&str]) -> LiveSet {
        let mut live = LiveSet::new(IdentityPolicy::Identifier);
        for id in ids {
            live.insert(&ImageRef::new(*id, format!("sha-{id}")));
        }
        live
    }

    #[tokio::test]
    async fn test_sweep_removes_only_unreachable() {
        let store = store_with(&["img-1", "img-3", "img-4"]);
        let config = GcConfig::default().with_page_size(1);
        let report = Sweeper::new(&store, &config)
            .sweep(&live_of(&["img-1", "img-3"]), false, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.total_before, 3);
        assert_eq!(report.removed, 1);
        assert_eq!(report.kept(), 2);
        assert_eq!(report.candidates[0].identifier, AssetId::from("img-4"));
        assert_eq!(report.bytes_reclaimed, 3072);
        assert!(!store.contains_image(&AssetId::from("img-4")));
        assert_eq!(store.image_count(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_removing() {
        let store = store_with(&["a", "b"]);
        let config = GcConfig::default();
        let report = Sweeper::new(&store, &config)
            .sweep(&live_of(&["a"]), true, &CancelToken::new())
            .await
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.removed, 1);
        assert_eq!(store.image_count(), 2);
    }

    #[tokio::test]
    async fn test_prune_ignores_nothing() {
        let store = store_with(&["a", "b", "c", "d", "e"]);
        let config = GcConfig::default();
        let report = Sweeper::new(&store, &config).prune(false, &CancelToken::new()).await.unwrap();
        assert_eq!(report.removed, 5);
        assert_eq!(store.image_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_sweep_leaves_store_untouched() {
        let store = store_with(&["a", "b"]);
        let config = GcConfig::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = Sweeper::new(&store, &config).sweep(&live_of(&[]), false, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
        assert_eq!(store.image_count(), 2);
    }

    #[tokio::test]
    async fn test_commit_failures_are_carried_and_not_counted() {
        let store = RacingStore { inner: store_with(&["a", "b", "c"]), victim: AssetId::from("b") };
        let config = GcConfig::default();
        let report = Sweeper::new(&store, &config)
            .sweep(&live_of(&["a"]), false, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.bytes_reclaimed, 3072);
        assert!(!report.is_complete());
        assert_eq!(report.failed[0].removal, Removal::Image(AssetId::from("b")));
        assert_eq!(store.inner.image_count(), 1);
    }
}
