//! Property tests: over random graphs, a collection removes exactly the
//! records no node references, whatever the page size.

use std::collections::BTreeSet;

use media_gc::storage::{MemoryContentGraph, MemoryMediaStore};
use media_gc::{CancelToken, GcConfig, ImageRecord, ImageRef, MediaManager, PropertyMap, Resource, Value, VariantRef};
use proptest::prelude::*;

/// How one property refers (or does not refer) to image `n`.
#[derive(Debug, Clone)]
enum Prop {
    Image(usize),
    Variant(usize),
    DanglingVariant(usize),
    Listed(usize),
    Text,
    Null,
}

fn prop_strategy(images: usize) -> impl Strategy<Value = Prop> {
    // Indices may point past the store: references to records that do not exist.
    let idx = 0..images + 3;
    prop_oneof![
        idx.clone().prop_map(Prop::Image),
        idx.clone().prop_map(Prop::Variant),
        idx.clone().prop_map(Prop::DanglingVariant),
        idx.prop_map(Prop::Listed),
        Just(Prop::Text),
        Just(Prop::Null),
    ]
}

fn image_id(n: usize) -> String {
    format!("img-{n:03}")
}

fn reference(n: usize) -> ImageRef {
    ImageRef::new(image_id(n), format!("sha-{n}"))
}

impl Prop {
    fn to_value(&self) -> Value {
        match *self {
            Prop::Image(n) => reference(n).into(),
            Prop::Variant(n) => VariantRef::new(format!("var-{n}"), Some(reference(n))).into(),
            Prop::DanglingVariant(n) => VariantRef::new(image_id(n), None).into(),
            Prop::Listed(n) => Value::List(vec![Value::from("caption"), reference(n).into()]),
            Prop::Text => Value::from("no media here"),
            Prop::Null => Value::Null,
        }
    }

    fn keeps_alive(&self) -> Option<usize> {
        match *self {
            Prop::Image(n) | Prop::Variant(n) | Prop::Listed(n) => Some(n),
            Prop::DanglingVariant(_) | Prop::Text | Prop::Null => None,
        }
    }
}

fn scenario() -> impl Strategy<Value = (usize, Vec<Vec<Prop>>, usize)> {
    (1usize..20).prop_flat_map(|images| {
        (
            Just(images),
            prop::collection::vec(prop::collection::vec(prop_strategy(images), 0..4), 0..12),
            1usize..6,
        )
    })
}

proptest! {
    #[test]
    fn gc_removes_exactly_the_unreferenced((images, nodes, page_size) in scenario()) {
        let graph = MemoryContentGraph::new();
        let mut expected_live = BTreeSet::new();
        for props in &nodes {
            let mut map = PropertyMap::new();
            for (i, prop) in props.iter().enumerate() {
                map.insert(format!("p{i}"), prop.to_value());
                if let Some(n) = prop.keeps_alive() {
                    if n < images {
                        expected_live.insert(image_id(n));
                    }
                }
            }
            graph.create_node("live", map);
        }

        let store = MemoryMediaStore::new();
        for n in 0..images {
            store.insert_image(ImageRecord::new(
                image_id(n),
                10,
                10,
                Resource::new(format!("{n}.jpg"), 100, format!("sha-{n}")),
            ));
        }

        let mgr = MediaManager::new(graph, store.clone(), GcConfig::default().with_page_size(page_size));
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let dry = rt.block_on(mgr.gc(true, &CancelToken::new())).unwrap();
        prop_assert_eq!(store.image_count(), images);

        let real = rt.block_on(mgr.gc(false, &CancelToken::new())).unwrap();
        let survivors: BTreeSet<String> = store.images().into_iter().map(|i| i.identifier.0).collect();

        // Nothing referenced was removed, and everything unreferenced was.
        prop_assert_eq!(&survivors, &expected_live);
        prop_assert_eq!(real.sweep.total_before, images as u64);
        prop_assert_eq!(real.sweep.removed, (images - expected_live.len()) as u64);
        prop_assert_eq!(dry.sweep.removed, real.sweep.removed);

        let again = rt.block_on(mgr.gc(false, &CancelToken::new())).unwrap();
        prop_assert_eq!(again.sweep.removed, 0);
    }
}
