//! Content graph scanner: builds the live set.

use crate::model::{LiveSet, NodeSlot};
use crate::storage::{ContentGraph, WorkspaceScope};
use crate::Result;
use super::{resolve_nested, CancelToken, GcConfig};

/// What one scan found.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub live: LiveSet,
    /// Nodes whose properties were inspected.
    pub nodes_scanned: u64,
    /// Nodes the provider could not decode.
    pub nodes_skipped: u64,
    /// Media references seen, duplicates included.
    pub references: u64,
    /// Scope entries naming a workspace the graph does not have.
    pub unknown_workspaces: Vec<String>,
}

/// Walks every node in scope and feeds each property to the resolver.
pub struct Scanner<'a, G: ContentGraph> {
    graph: &'a G,
    config: &'a GcConfig,
}

impl<'a, G: ContentGraph> Scanner<'a, G> {
    pub fn new(graph: &'a G, config: &'a GcConfig) -> Self {
        Self { graph, config }
    }

    /// Page through the graph and collect every reachable identity.
    ///
    /// Memory use is one page plus the live set. Corrupt nodes are logged and
    /// skipped; a provider error aborts the scan.
    pub async fn scan(&self, cancel: &CancelToken) -> Result<ScanOutcome> {
        let mut outcome = ScanOutcome {
            live: LiveSet::new(self.config.identity),
            nodes_scanned: 0,
            nodes_skipped: 0,
            references: 0,
            unknown_workspaces: Vec::new(),
        };
        let policy = outcome.live.policy();

        tracing::info!(scope = ?self.config.scope, identity = %policy, "scanning content graph");

        if let WorkspaceScope::Only(names) = &self.config.scope {
            let known = self.graph.workspaces().await?;
            outcome.unknown_workspaces = names.iter().filter(|n| !known.contains(n)).cloned().collect();
            for name in &outcome.unknown_workspaces {
                tracing::warn!(workspace = %name, "scope names a workspace the graph does not have");
            }
        }

        let mut cursor = None;
        loop {
            cancel.check("scan")?;
            let page = self
                .graph
                .nodes_page(&self.config.scope, cursor, self.config.page_size)
                .await?;

            for slot in page.items {
                match slot {
                    NodeSlot::Loaded(node) => {
                        outcome.nodes_scanned += 1;
                        for (name, value) in &node.properties {
                            for identity in resolve_nested(value, policy) {
                                outcome.references += 1;
                                if outcome.live.insert_identity(identity) {
                                    tracing::debug!(
                                        node = %node.id,
                                        property = %name,
                                        value_type = value.type_name(),
                                        "new live reference"
                                    );
                                }
                            }
                        }
                    }
                    NodeSlot::Corrupt { id, workspace, reason } => {
                        outcome.nodes_skipped += 1;
                        tracing::warn!(node = %id, workspace = %workspace, %reason, "skipping unreadable node");
                    }
                }
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::info!(
            nodes = outcome.nodes_scanned,
            skipped = outcome.nodes_skipped,
            references = outcome.references,
            live = outcome.live.len(),
            "scan complete"
        );
        Ok(outcome)
    }
}
