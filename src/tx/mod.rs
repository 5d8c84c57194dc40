//! Transaction management.
//!
//! Removals are staged on a transaction and only take effect when the
//! transaction is committed. Rolling back (or simply never committing, as a
//! dry run does) leaves the store untouched.

use serde::{Deserialize, Serialize};

use crate::model::{AssetId, TagId};

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Transaction trait that all stores must implement.
pub trait Transaction: Send + Sync {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;
    /// Removals staged so far, in staging order.
    fn staged(&self) -> &[Removal];
}

/// A deletion waiting for commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Removal {
    Image(AssetId),
    Tag(TagId),
}

impl std::fmt::Display for Removal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Removal::Image(id) => write!(f, "image {id}"),
            Removal::Tag(id) => write!(f, "tag {id}"),
        }
    }
}

/// A staged removal the store refused at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRemoval {
    pub removal: Removal,
    pub reason: String,
}

/// What a commit actually did.
///
/// A commit may apply only part of what was staged; callers must report
/// from `committed`, never from the staged list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub committed: Vec<Removal>,
    pub failed: Vec<FailedRemoval>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn committed_images(&self) -> impl Iterator<Item = &AssetId> {
        self.committed.iter().filter_map(|r| match r {
            Removal::Image(id) => Some(id),
            Removal::Tag(_) => None,
        })
    }

    pub fn committed_tags(&self) -> impl Iterator<Item = &TagId> {
        self.committed.iter().filter_map(|r| match r {
            Removal::Tag(id) => Some(id),
            Removal::Image(_) => None,
        })
    }
}
