use pretty_assertions::assert_eq;
use reconcile_engine::{
    DuckDbEntityStore, Entity, EntityKey, EntitySchema, EntityStore, Manipulator, ReferenceIndex,
};
use serde_json::json;
use std::sync::Arc;

fn schema() -> EntitySchema {
    EntitySchema::builder("match")
        .mutable(["status", "winner"])
        .nullable(["winner"])
        .opaque("alliances_json", "alliances")
        .union_lists(["youtube_videos"])
        .references(["event"])
        .build()
        .unwrap()
}

fn read_back(store: &DuckDbEntityStore, key: &str) -> Entity {
    store
        .batch_get(&[EntityKey::new(key)])
        .unwrap()
        .pop()
        .flatten()
        .unwrap()
}

#[test]
fn create_then_merge_round_trip() {
    let store = Arc::new(DuckDbEntityStore::open_in_memory().unwrap());
    let index = Arc::new(ReferenceIndex::new());
    let m = Manipulator::new(schema(), store.clone())
        .unwrap()
        .with_invalidator(index.clone());

    m.create_or_update(vec![
        Entity::new("2024casj_qm1", "match")
            .with("status", "scheduled")
            .with("event", "2024casj")
            .with("youtube_videos", json!(["yt1"])),
        Entity::new("2024casj_qm2", "match").with("event", "2024casj"),
    ])
    .unwrap();
    assert_eq!(store.count().unwrap(), 2);

    let merged = m
        .create_or_update(
            Entity::new("2024casj_qm1", "match")
                .with("status", "played")
                .with("winner", "red")
                .with("alliances_json", r#"{"red": {"score": 120}}"#)
                .with("youtube_videos", json!(["yt2"])),
        )
        .unwrap()
        .into_one()
        .unwrap();
    assert!(!merged.is_new());

    let stored = read_back(&store, "2024casj_qm1");
    assert_eq!(stored.get_str("status"), Some("played"));
    assert_eq!(stored.get_str("winner"), Some("red"));
    assert_eq!(stored.get_str("event"), Some("2024casj"));
    assert_eq!(stored.get("youtube_videos"), &json!(["yt1", "yt2"]));
    assert_eq!(store.count().unwrap(), 2);

    assert_eq!(index.lookup("event", "2024casj").len(), 2);
}

#[test]
fn nullable_clear_persists() {
    let store = DuckDbEntityStore::open_in_memory().unwrap();
    store
        .batch_put(&[&Entity::new("m1", "match").with("winner", "red")])
        .unwrap();
    let m = Manipulator::new(schema(), store).unwrap();

    let merged = m
        .create_or_update(Entity::new("m1", "match").with("winner", json!(null)))
        .unwrap()
        .into_one()
        .unwrap();
    assert!(merged.entity.is_null("winner"));
    assert!(read_back(m.store(), "m1").is_null("winner"));
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.duckdb");

    {
        let store = DuckDbEntityStore::open(&path).unwrap();
        let m = Manipulator::new(schema(), store).unwrap();
        m.create_or_update(Entity::new("m1", "match").with("status", "scheduled"))
            .unwrap();
    }

    let store = DuckDbEntityStore::open(&path).unwrap();
    let m = Manipulator::new(schema(), store).unwrap();
    let resolved = m
        .find_or_spawn(Entity::new("m1", "match").with("status", "played"))
        .unwrap()
        .into_one()
        .unwrap();
    assert!(!resolved.is_new());
    assert_eq!(resolved.updated_attrs().len(), 1);
}
