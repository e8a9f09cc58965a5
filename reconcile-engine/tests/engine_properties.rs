//! Batch-level properties of the manipulator.

use proptest::prelude::*;
use reconcile_engine::{Entity, EntityKey, EntitySchema, Manipulator, MemoryStore, OneOrMany};
use std::collections::BTreeSet;
use std::sync::Arc;

fn schema() -> EntitySchema {
    EntitySchema::builder("match")
        .mutable(["status"])
        .union_lists(["youtube_videos"])
        .build()
        .unwrap()
}

/// For each slot: (stored status if the entity exists, incoming status).
fn batch() -> impl Strategy<Value = Vec<(Option<u8>, Option<u8>)>> {
    prop::collection::vec((prop::option::of(0u8..3), prop::option::of(0u8..3)), 0..20)
}

fn status(n: u8) -> String {
    format!("s{n}")
}

proptest! {
    #[test]
    fn write_set_is_exactly_the_changed_set(slots in batch()) {
        let stored: Vec<Entity> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, (old, _))| old.map(|s| Entity::new(format!("m{i}"), "match").with("status", status(s))))
            .collect();
        let store = Arc::new(MemoryStore::with_entities(stored));
        let m = Manipulator::new(schema(), store.clone()).unwrap();

        let incoming: Vec<Entity> = slots
            .iter()
            .enumerate()
            .map(|(i, (_, new))| {
                let e = Entity::new(format!("m{i}"), "match");
                match new {
                    Some(s) => e.with("status", status(*s)),
                    None => e,
                }
            })
            .collect();

        let expected: Vec<EntityKey> = slots
            .iter()
            .enumerate()
            .filter(|(_, (old, new))| match (old, new) {
                (None, _) => true,
                (Some(o), Some(n)) => o != n,
                (Some(_), None) => false,
            })
            .map(|(i, _)| EntityKey::new(format!("m{i}")))
            .collect();

        let result = m.create_or_update(incoming).unwrap();
        prop_assert_eq!(result.len(), slots.len());
        prop_assert!(result.iter().all(|t| !t.is_dirty()));

        let stats = store.stats();
        if expected.is_empty() {
            prop_assert_eq!(stats.put_calls, 0);
        } else {
            prop_assert_eq!(stats.put_calls, 1);
            prop_assert_eq!(&stats.put_batches[0], &expected);
        }
        prop_assert_eq!(stats.get_calls, 1);
    }

    #[test]
    fn output_keeps_input_shape_and_order(keys in prop::collection::btree_set("[a-z]{1,6}", 1..10), single in any::<bool>()) {
        let m = Manipulator::new(schema(), MemoryStore::new()).unwrap();
        let entities: Vec<Entity> = keys.iter().map(|k| Entity::new(k.as_str(), "match")).collect();

        if single {
            let first = entities[0].key.clone();
            let result = m.find_or_spawn(entities.into_iter().next().unwrap()).unwrap();
            prop_assert!(matches!(result, OneOrMany::One(ref t) if t.entity.key == first));
        } else {
            let result = m.find_or_spawn(entities).unwrap();
            prop_assert!(matches!(result, OneOrMany::Many(_)));
            let out: Vec<String> = result.iter().map(|t| t.entity.key.to_string()).collect();
            let expected: Vec<String> = keys.into_iter().collect();
            prop_assert_eq!(out, expected);
        }
    }

    #[test]
    fn repeated_commit_is_a_fixed_point(videos in prop::collection::vec("[a-d]", 0..6)) {
        let store = Arc::new(MemoryStore::new());
        let m = Manipulator::new(schema(), store.clone()).unwrap();
        let entity = Entity::new("m1", "match")
            .with("status", "played")
            .with("youtube_videos", videos.clone());

        m.create_or_update(entity.clone()).unwrap();
        let before = store.get(&EntityKey::new("m1")).unwrap();
        let again = m.create_or_update(entity).unwrap().into_one().unwrap();

        prop_assert_eq!(store.stats().put_calls, 1);
        prop_assert!(again.updated_attrs().is_empty());
        prop_assert_eq!(store.get(&EntityKey::new("m1")).unwrap(), before);

        let stored: BTreeSet<String> = again
            .entity
            .get_list("youtube_videos")
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        prop_assert_eq!(stored, videos.into_iter().collect::<BTreeSet<_>>());
    }
}
