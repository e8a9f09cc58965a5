use pretty_assertions::assert_eq;
use reconcile_model::{Entity, EntitySchema, MergeState, Tracked};
use serde_json::json;
use std::collections::BTreeSet;

fn schema() -> EntitySchema {
    EntitySchema::builder("award")
        .mutable(["name"])
        .union_lists(["recipients"])
        .references(["event", "recipients"])
        .build()
        .unwrap()
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn loaded_is_clean() {
    let t = Tracked::loaded(Entity::new("a1", "award"));
    assert_eq!(t.state, MergeState::default());
    assert!(!t.is_dirty());
    assert!(!t.is_new());
}

#[test]
fn created_is_new_and_dirty() {
    let t = Tracked::created(Entity::new("a1", "award"));
    assert!(t.is_dirty());
    assert!(t.is_new());
    assert!(t.updated_attrs().is_empty());
}

// ── Change recording ─────────────────────────────────────────────

#[test]
fn record_change_marks_dirty() {
    let mut t = Tracked::loaded(Entity::new("a1", "award"));
    t.record_change("name");
    assert!(t.is_dirty());
    assert_eq!(t.updated_attrs(), &set(&["name"]));
}

#[test]
fn mark_committed_only_clears_dirty() {
    let mut t = Tracked::created(Entity::new("a1", "award"));
    t.record_change("name");
    t.mark_committed();
    assert!(!t.is_dirty());
    assert!(t.is_new());
    assert_eq!(t.updated_attrs(), &set(&["name"]));
}

// ── Affected references ──────────────────────────────────────────

#[test]
fn observe_references_creates_every_bucket() {
    let schema = schema();
    let mut t = Tracked::loaded(Entity::new("a1", "award"));
    t.observe_own_references(&schema);
    assert_eq!(t.affected("event"), Some(&BTreeSet::new()));
    assert_eq!(t.affected("recipients"), Some(&BTreeSet::new()));
    assert_eq!(t.affected("name"), None);
}

#[test]
fn observe_references_accumulates() {
    let schema = schema();
    let mut t = Tracked::loaded(
        Entity::new("a1", "award")
            .with("event", "2024casj")
            .with("recipients", json!(["frc254"])),
    );
    t.observe_own_references(&schema);
    t.observe_references(
        &schema,
        &Entity::new("a1", "award")
            .with("event", "2024cave")
            .with("recipients", json!(["frc1678"])),
    );
    assert_eq!(t.affected("event"), Some(&set(&["2024casj", "2024cave"])));
    assert_eq!(t.affected("recipients"), Some(&set(&["frc1678", "frc254"])));
}

#[test]
fn into_entity_drops_state() {
    let t = Tracked::created(Entity::new("a1", "award").with("name", "Chairman's"));
    let entity = t.into_entity();
    assert_eq!(entity.get_str("name"), Some("Chairman's"));
}
