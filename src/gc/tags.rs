//! Tag reconciler: deletes tags no surviving asset carries.
//!
//! Usage counts come from the asset store as it is *now*, so this must run
//! after a sweep has committed; run earlier, it keeps tags whose only users
//! are about to be swept.

use crate::model::{Tag, TagId};
use crate::storage::{AssetStore, TagStore};
use crate::tx::TxMode;
use crate::Result;

pub struct TagReconciler<'a, A: AssetStore, T: TagStore> {
    assets: &'a A,
    tags: &'a T,
}

impl<'a, A: AssetStore, T: TagStore> TagReconciler<'a, A, T> {
    pub fn new(assets: &'a A, tags: &'a T) -> Self {
        Self { assets, tags }
    }

    /// Delete every unused tag; returns the labels actually deleted.
    pub async fn reconcile(&self) -> Result<Vec<String>> {
        let read = self.assets.begin_tx(TxMode::ReadOnly).await?;
        let mut tx = self.tags.begin_tx(TxMode::ReadWrite).await?;

        let unused = match self.stage_unused(&read, &mut tx).await {
            Ok(unused) => unused,
            Err(e) => {
                if let Err(rollback) = self.tags.rollback_tx(tx).await {
                    tracing::warn!(error = %rollback, "rollback after failed tag cleanup also failed");
                }
                self.assets.rollback_tx(read).await?;
                return Err(e);
            }
        };
        self.assets.rollback_tx(read).await?;

        let commit = self.tags.commit_tx(tx).await?;
        for failure in &commit.failed {
            tracing::warn!(removal = %failure.removal, reason = %failure.reason, "tag removal not committed");
        }

        let removed: Vec<&TagId> = commit.committed_tags().collect();
        let labels: Vec<String> = unused
            .into_iter()
            .filter(|tag| removed.contains(&&tag.id))
            .map(|tag| tag.label)
            .collect();

        tracing::info!(removed = labels.len(), "tag cleanup committed");
        Ok(labels)
    }

    async fn stage_unused(&self, read: &A::Tx, tx: &mut T::Tx) -> Result<Vec<Tag>> {
        let mut unused = Vec::new();
        for tag in self.tags.all_tags(tx).await? {
            let uses = self.assets.count_by_tag(read, &tag.id).await?;
            if uses == 0 {
                tracing::debug!(tag = %tag.id, label = %tag.label, "unused tag");
                self.tags.stage_tag_removal(tx, &tag.id).await?;
                unused.push(tag);
            }
        }
        Ok(unused)
    }
}
