//! Default attribute-by-attribute merge policy.
//!
//! Given a caller-supplied (often partial) entity and the stored version,
//! replace the stored attributes the new value has data for and keep the
//! ones it does not. What counts as "has data" depends on the attribute's
//! category in the kind's [`EntitySchema`]:
//!
//! | category     | "no data"          | on data                          |
//! |--------------|--------------------|----------------------------------|
//! | mutable      | `null`             | overwrite if different           |
//! | nullable     | never              | overwrite if different           |
//! | opaque       | `null`             | overwrite if decoded differently |
//! | replace list | `[]` (auto-union)  | overwrite if different           |
//! | union list   | `[]`               | set union with stored values     |
//!
//! A mutable scalar whose new value is the literal string `"None"` is
//! cleared to `null`.

use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use tracing::trace;

use crate::entity::Entity;
use crate::error::ModelResult;
use crate::schema::EntitySchema;
use crate::tracked::Tracked;

/// New-value text that clears a mutable scalar.
pub const NONE_SENTINEL: &str = "None";

/// The default field merge for one entity kind.
///
/// Handed to [`KindHandler::update_merge`](crate::KindHandler::update_merge)
/// so kind-specific rules can run it around their own.
#[derive(Debug, Clone, Copy)]
pub struct FieldMerge<'a> {
    schema: &'a EntitySchema,
}

impl<'a> FieldMerge<'a> {
    pub fn new(schema: &'a EntitySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a EntitySchema {
        self.schema
    }

    /// Merges `new` into `existing`.
    ///
    /// The attributes changed by this call are added to
    /// `existing.state.updated_attrs`, so changes a handler recorded earlier
    /// in the same merge are kept; `dirty` is raised if any changed. On error
    /// `existing` is left exactly as it was.
    pub fn apply(&self, new: &Entity, existing: &mut Tracked, auto_union: bool) -> ModelResult<()> {
        let mut merged = existing.entity.clone();
        let mut changed = BTreeSet::new();

        self.merge_scalars(new, &mut merged, &mut changed);
        self.merge_opaque(new, &mut merged, &mut changed)?;
        self.merge_replace_lists(new, &mut merged, &mut changed, auto_union)?;
        if auto_union {
            self.merge_union_lists(new, &mut merged, &mut changed)?;
        }

        if !changed.is_empty() {
            trace!(key = %merged.key, attrs = ?changed, "field merge changed attributes");
            existing.state.dirty = true;
        }
        existing.entity = merged;
        existing.state.updated_attrs.extend(changed);
        Ok(())
    }

    fn merge_scalars(&self, new: &Entity, merged: &mut Entity, changed: &mut BTreeSet<String>) {
        for attr in &self.schema.mutable {
            let new_value = new.get(attr);
            if (!new_value.is_null() || self.schema.is_nullable(attr)) && new_value != merged.get(attr) {
                merged.set(attr, new_value.clone());
                changed.insert(attr.clone());
            }
            if new_value.as_str() == Some(NONE_SENTINEL) && !merged.is_null(attr) {
                merged.set(attr, Value::Null);
                changed.insert(attr.clone());
            }
        }
    }

    fn merge_opaque(
        &self,
        new: &Entity,
        merged: &mut Entity,
        changed: &mut BTreeSet<String>,
    ) -> ModelResult<()> {
        for field in &self.schema.opaque {
            let Some(new_decoded) = new.decoded(&field.attr)? else {
                continue;
            };
            let differs = match merged.decoded(&field.attr)? {
                None => true,
                Some(old_decoded) => !decoded_eq(&old_decoded, &new_decoded),
            };
            if differs {
                merged.set(&field.attr, new.get(&field.attr).clone());
                merged.clear_shadow(&field.shadow);
                changed.insert(field.attr.clone());
            }
        }
        Ok(())
    }

    fn merge_replace_lists(
        &self,
        new: &Entity,
        merged: &mut Entity,
        changed: &mut BTreeSet<String>,
        auto_union: bool,
    ) -> ModelResult<()> {
        let suppressed_unions: &[String] = if auto_union { &[] } else { &self.schema.union_lists };
        for attr in self.schema.replace_lists.iter().chain(suppressed_unions) {
            let new_list = new.get_list(attr)?;
            if new_list.is_empty() && auto_union {
                continue;
            }
            if new_list != merged.get_list(attr)? {
                merged.set(attr, Value::Array(new_list.to_vec()));
                changed.insert(attr.clone());
            }
        }
        Ok(())
    }

    fn merge_union_lists(
        &self,
        new: &Entity,
        merged: &mut Entity,
        changed: &mut BTreeSet<String>,
    ) -> ModelResult<()> {
        for attr in &self.schema.union_lists {
            let old_list = merged.get_list(attr)?;
            let new_list = new.get_list(attr)?;

            let mut seen = HashSet::new();
            let unioned: Vec<Value> = old_list
                .iter()
                .chain(new_list)
                .filter(|value| seen.insert(value.to_string()))
                .cloned()
                .collect();
            let old_distinct = old_list
                .iter()
                .map(Value::to_string)
                .collect::<HashSet<_>>()
                .len();

            if unioned.len() != old_distinct {
                merged.set(attr, Value::Array(unioned));
                changed.insert(attr.clone());
            }
        }
        Ok(())
    }
}

/// Equality of decoded opaque values.
///
/// Numbers compare by value, so `1`, `1.0` and `1e0` are equal. Everything
/// else compares structurally.
fn decoded_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_f64() || y.is_f64() {
                x.as_f64() == y.as_f64()
            } else {
                x == y
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| decoded_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| decoded_eq(x, y)))
        }
        _ => a == b,
    }
}
