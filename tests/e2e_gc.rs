//! End-to-end tests for reachability-based collection.
//!
//! Each test builds a content graph and a media store in memory, runs the
//! operator commands through `MediaManager`, and checks both the reported
//! counts and what is left in the store.

use media_gc::report;
use media_gc::storage::{MemoryContentGraph, MemoryMediaStore};
use media_gc::{
    AssetId, CancelToken, ContentNode, Error, GcConfig, IdentityPolicy, ImageRecord, ImageRef,
    MediaManager, NodeId, Resource, Value, VariantRef, WorkspaceScope,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helpers
// ============================================================================

fn image(id: &str) -> ImageRecord {
    ImageRecord::new(id, 800, 600, Resource::new(format!("{id}.jpg"), 4096, format!("sha-{id}")))
        .with_label(id.to_uppercase())
}

fn reference(id: &str) -> ImageRef {
    ImageRef::new(id, format!("sha-{id}"))
}

fn store_with(ids: &[&str]) -> MemoryMediaStore {
    let store = MemoryMediaStore::new();
    for id in ids {
        store.insert_image(image(id));
    }
    store
}

fn manager(
    graph: MemoryContentGraph,
    store: MemoryMediaStore,
    config: GcConfig,
) -> MediaManager<MemoryContentGraph, MemoryMediaStore> {
    MediaManager::new(graph, store, config)
}

fn remaining(store: &MemoryMediaStore) -> Vec<String> {
    store.images().into_iter().map(|i| i.identifier.0).collect()
}

/// Node A holds Image#1, node B holds a variant of Image#3; the store holds #1, #3, #4.
fn reference_scenario() -> (MemoryContentGraph, MemoryMediaStore) {
    let graph = MemoryContentGraph::new();
    graph.insert(ContentNode::new(NodeId(1), "live").with_property("img", reference("img-1")));
    graph.insert(
        ContentNode::new(NodeId(2), "live")
            .with_property("variant", VariantRef::new("img-2", Some(reference("img-3")))),
    );
    (graph, store_with(&["img-1", "img-3", "img-4"]))
}

// ============================================================================
// 1. The reference scenario: only the unreferenced image goes
// ============================================================================

#[tokio::test]
async fn test_gc_removes_only_unreferenced_image() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store.clone(), GcConfig::default());

    let outcome = mgr.gc(false, &CancelToken::new()).await.unwrap();

    assert_eq!(outcome.scan.live.len(), 2);
    assert_eq!(outcome.sweep.total_before, 3);
    assert_eq!(outcome.sweep.removed, 1);
    assert_eq!(outcome.sweep.kept(), 2);
    assert_eq!(remaining(&store), vec!["img-1", "img-3"]);

    let mut out = Vec::new();
    report::write_gc_summary(&mut out, &outcome.sweep).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "3 resource(s) total, 1 resource(s) removed.\n");
}

// ============================================================================
// 2. Idempotence: a second run finds nothing
// ============================================================================

#[tokio::test]
async fn test_second_gc_removes_nothing() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store, GcConfig::default());

    let first = mgr.gc(false, &CancelToken::new()).await.unwrap();
    assert_eq!(first.sweep.removed, 1);

    let second = mgr.gc(false, &CancelToken::new()).await.unwrap();
    assert_eq!(second.sweep.total_before, 2);
    assert_eq!(second.sweep.removed, 0);
}

// ============================================================================
// 3. Dry run reports the same count and changes nothing
// ============================================================================

#[tokio::test]
async fn test_dry_run_matches_real_run_without_side_effects() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store.clone(), GcConfig::default());

    let dry = mgr.gc(true, &CancelToken::new()).await.unwrap();
    assert!(dry.sweep.dry_run);
    assert_eq!(store.image_count(), 3);

    let real = mgr.gc(false, &CancelToken::new()).await.unwrap();
    assert_eq!(dry.sweep.removed, real.sweep.removed);
    assert_eq!(dry.sweep.candidates, real.sweep.candidates);
    assert_eq!(store.image_count(), 2);
}

// ============================================================================
// 4. Prune ignores references entirely
// ============================================================================

#[tokio::test]
async fn test_prune_removes_everything() {
    let graph = MemoryContentGraph::new();
    for id in ["a", "b", "c"] {
        graph.create_node("live", [("img".to_string(), Value::from(reference(id)))].into());
    }
    let store = store_with(&["a", "b", "c", "d", "e"]);
    let mgr = manager(graph, store.clone(), GcConfig::default());

    let sweep = mgr.prune(false, &CancelToken::new()).await.unwrap();
    assert_eq!(sweep.removed, 5);
    assert_eq!(store.image_count(), 0);

    let mut out = Vec::new();
    report::write_prune_summary(&mut out, &sweep).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "5 record(s) purged.\n");
}

#[tokio::test]
async fn test_prune_dry_run_keeps_everything() {
    let store = store_with(&["a", "b"]);
    let mgr = manager(MemoryContentGraph::new(), store.clone(), GcConfig::default());

    let sweep = mgr.prune(true, &CancelToken::new()).await.unwrap();
    assert_eq!(sweep.removed, 2);
    assert_eq!(store.image_count(), 2);
}

// ============================================================================
// 5. Workspace scope
// ============================================================================

#[tokio::test]
async fn test_draft_reference_keeps_image_alive_by_default() {
    let graph = MemoryContentGraph::new();
    graph.insert(ContentNode::new(NodeId(1), "user-editor").with_property("hero", reference("draft")));
    let store = store_with(&["draft", "unused"]);

    let mgr = manager(graph.clone(), store.clone(), GcConfig::default());
    let outcome = mgr.gc(true, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome.sweep.removed, 1);
    assert_eq!(outcome.sweep.candidates[0].identifier, AssetId::from("unused"));

    let live_only = GcConfig::default().with_scope(WorkspaceScope::Only(vec!["live".into()]));
    let mgr = manager(graph, store, live_only);
    let outcome = mgr.gc(true, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome.sweep.removed, 2);
}

// ============================================================================
// 6. Identity policy
// ============================================================================

#[tokio::test]
async fn test_resource_hash_policy_keeps_byte_identical_twin() {
    let graph = MemoryContentGraph::new();
    graph.insert(ContentNode::new(NodeId(1), "live").with_property("hero", reference("orig")));

    let store = MemoryMediaStore::new();
    store.insert_image(image("orig"));
    store.insert_image(
        ImageRecord::new("twin", 800, 600, Resource::new("copy.jpg", 4096, "sha-orig")),
    );

    let by_id = manager(graph.clone(), store.clone(), GcConfig::default());
    let outcome = by_id.gc(true, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome.sweep.removed, 1);

    let by_hash = manager(
        graph,
        store.clone(),
        GcConfig::default().with_identity(IdentityPolicy::ResourceHash),
    );
    let outcome = by_hash.gc(false, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome.scan.live.policy(), IdentityPolicy::ResourceHash);
    assert_eq!(outcome.sweep.removed, 0);
    assert_eq!(store.image_count(), 2);
}

// ============================================================================
// 7. Awkward graph shapes never cost a live image
// ============================================================================

#[tokio::test]
async fn test_odd_nodes_do_not_abort_or_delete_live_images() {
    let graph = MemoryContentGraph::new();
    graph.insert(ContentNode::new(NodeId(1), "live"));
    graph.insert(
        ContentNode::new(NodeId(2), "live")
            .with_property("nothing", Value::Null)
            .with_property("title", "Hello")
            .with_property("dangling", VariantRef::new("var-x", None)),
    );
    graph.insert_corrupt(NodeId(3), "live", "property blob truncated");
    graph.insert(
        ContentNode::new(NodeId(4), "live").with_property(
            "gallery",
            Value::List(vec![
                Value::from(reference("g1")),
                Value::from(VariantRef::new("g2-crop", Some(reference("g2")))),
            ]),
        ),
    );
    let store = store_with(&["g1", "g2", "var-x", "orphan"]);
    let mgr = manager(graph, store.clone(), GcConfig::default().with_page_size(1));

    let outcome = mgr.gc(false, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome.scan.nodes_scanned, 3);
    assert_eq!(outcome.scan.nodes_skipped, 1);
    assert_eq!(remaining(&store), vec!["g1", "g2"]);
}

// ============================================================================
// 8. Cancellation leaves the store untouched
// ============================================================================

#[tokio::test]
async fn test_cancelled_gc_commits_nothing() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store.clone(), GcConfig::default());

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = mgr.gc(false, &cancel).await;
    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert_eq!(store.image_count(), 3);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_scanning() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store.clone(), GcConfig::default().with_page_size(0));
    assert!(matches!(mgr.gc(false, &CancelToken::new()).await, Err(Error::Config(_))));
    assert_eq!(store.image_count(), 3);
}

// ============================================================================
// 9. show / list
// ============================================================================

#[tokio::test]
async fn test_show_finds_image_or_reports_not_found() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store, GcConfig::default());

    let found = mgr.show(&AssetId::from("img-3")).await.unwrap();
    assert_eq!(found.label, "IMG-3");

    let missing = mgr.show(&AssetId::from("nope")).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_for_each_image_visits_every_page() {
    let store = store_with(&["a", "b", "c", "d", "e"]);
    let mgr = manager(MemoryContentGraph::new(), store, GcConfig::default().with_page_size(2));

    let mut seen = Vec::new();
    let count = mgr
        .for_each_image(|img| {
            seen.push(img.identifier.to_string());
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(count, 5);
    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn test_huge_page_size_walks_everything_in_one_page() {
    let (graph, store) = reference_scenario();
    let mgr = manager(graph, store.clone(), GcConfig::default().with_page_size(usize::MAX));

    let outcome = mgr.gc(false, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome.scan.nodes_scanned, 2);
    assert_eq!(outcome.sweep.removed, 1);
    assert_eq!(remaining(&store), vec!["img-1", "img-3"]);
}
