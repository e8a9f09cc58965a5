use reconcile_types::EntityKey;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{ModelError, ModelResult};
use crate::schema::OpaqueField;

static NULL: Value = Value::Null;

/// A generic persisted record.
///
/// Attribute values live in `data` as JSON. An attribute that is missing
/// from `data` reads as `null`, so a caller-built partial entity only needs
/// the attributes it has an opinion about.
///
/// `shadows` hold lazily decoded forms of opaque attributes. They are never
/// serialized and do not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub key: EntityKey,
    pub entity_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(skip)]
    shadows: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no attributes set.
    pub fn new(key: impl Into<EntityKey>, entity_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entity_type: entity_type.into(),
            data: Map::new(),
            shadows: BTreeMap::new(),
        }
    }

    /// Creates an entity from an existing attribute map.
    pub fn with_data(
        key: impl Into<EntityKey>,
        entity_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            key: key.into(),
            entity_type: entity_type.into(),
            data,
            shadows: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with(mut self, attr: &str, value: impl Into<Value>) -> Self {
        self.set(attr, value);
        self
    }

    /// Returns an attribute's value; absent attributes read as `null`.
    pub fn get(&self, attr: &str) -> &Value {
        self.data.get(attr).unwrap_or(&NULL)
    }

    /// Sets an attribute's value.
    pub fn set(&mut self, attr: &str, value: impl Into<Value>) {
        self.data.insert(attr.to_string(), value.into());
    }

    /// True when the attribute is absent or explicitly `null`.
    pub fn is_null(&self, attr: &str) -> bool {
        self.get(attr).is_null()
    }

    /// Extract a string attribute.
    pub fn get_str(&self, attr: &str) -> Option<&str> {
        self.get(attr).as_str()
    }

    /// Extract a boolean attribute.
    pub fn get_bool(&self, attr: &str) -> Option<bool> {
        self.get(attr).as_bool()
    }

    /// Extract a numeric attribute.
    pub fn get_number(&self, attr: &str) -> Option<f64> {
        self.get(attr).as_f64()
    }

    /// Returns a list attribute as a slice. `null` reads as the empty list.
    pub fn get_list(&self, attr: &str) -> ModelResult<&[Value]> {
        match self.get(attr) {
            Value::Null => Ok(&[]),
            Value::Array(items) => Ok(items.as_slice()),
            other => Err(ModelError::NotAList {
                key: self.key.to_string(),
                attr: attr.to_string(),
                found: json_type_name(other).to_string(),
            }),
        }
    }

    /// Returns the cached shadow value, if one has been computed.
    pub fn shadow(&self, name: &str) -> Option<&Value> {
        self.shadows.get(name)
    }

    /// Drops a cached shadow value so it is recomputed on next access.
    pub fn clear_shadow(&mut self, name: &str) {
        self.shadows.remove(name);
    }

    /// Decodes an opaque attribute, caching the result in its shadow slot.
    ///
    /// Returns `Ok(None)` when the attribute is null.
    pub fn decode_opaque(&mut self, field: &OpaqueField) -> ModelResult<Option<&Value>> {
        if self.is_null(&field.attr) {
            return Ok(None);
        }
        if !self.shadows.contains_key(&field.shadow) {
            let decoded = self.decoded(&field.attr)?.unwrap_or(Value::Null);
            self.shadows.insert(field.shadow.clone(), decoded);
        }
        Ok(self.shadows.get(&field.shadow))
    }

    /// Decodes an opaque attribute without touching the shadow cache.
    pub(crate) fn decoded(&self, attr: &str) -> ModelResult<Option<Value>> {
        match self.get(attr) {
            Value::Null => Ok(None),
            Value::String(text) => serde_json::from_str(text).map(Some).map_err(|e| {
                ModelError::MalformedOpaqueAttribute {
                    key: self.key.to_string(),
                    attr: attr.to_string(),
                    reason: e.to_string(),
                }
            }),
            other => Err(ModelError::MalformedOpaqueAttribute {
                key: self.key.to_string(),
                attr: attr.to_string(),
                reason: format!("expected serialized text, found {}", json_type_name(other)),
            }),
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.entity_type == other.entity_type && self.data == other.data
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
