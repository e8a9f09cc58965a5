use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// Describes an entity kind's attributes by merge category.
///
/// Built once per kind (in code via [`EntitySchema::builder`] or loaded from
/// configuration) and validated with [`EntitySchema::validate`]. The merge
/// policy iterates these lists; it never inspects entity data to decide an
/// attribute's category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    /// Scalars overwritten when the new value is present.
    #[serde(default)]
    pub mutable: Vec<String>,
    /// Mutable scalars for which a null new value clears the existing one.
    #[serde(default)]
    pub nullable: Vec<String>,
    /// Serialized structured text compared by decoded value.
    #[serde(default)]
    pub opaque: Vec<OpaqueField>,
    /// Lists overwritten wholesale when the new list is non-empty.
    #[serde(default)]
    pub replace_lists: Vec<String>,
    /// Lists merged as sets when auto-union is on.
    #[serde(default)]
    pub union_lists: Vec<String>,
    /// Attributes whose values feed the reverse reference index.
    #[serde(default)]
    pub references: Vec<String>,
}

/// An opaque serialized attribute and its lazily decoded shadow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueField {
    pub attr: String,
    pub shadow: String,
}

impl OpaqueField {
    pub fn new(attr: impl Into<String>, shadow: impl Into<String>) -> Self {
        Self {
            attr: attr.into(),
            shadow: shadow.into(),
        }
    }

    /// Pairs `foo_json` with a `foo` shadow; any other name gets a `_` prefix.
    pub fn derived(attr: impl Into<String>) -> Self {
        let attr = attr.into();
        let shadow = match attr.strip_suffix("_json") {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => format!("_{attr}"),
        };
        Self { attr, shadow }
    }
}

/// The merge category an attribute belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPolicy {
    Mutable,
    Nullable,
    Opaque,
    ReplaceList,
    UnionList,
    Shadow,
}

impl fmt::Display for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldPolicy::Mutable => "mutable",
            FieldPolicy::Nullable => "nullable",
            FieldPolicy::Opaque => "opaque",
            FieldPolicy::ReplaceList => "replace-list",
            FieldPolicy::UnionList => "union-list",
            FieldPolicy::Shadow => "opaque shadow",
        };
        f.write_str(name)
    }
}

impl EntitySchema {
    /// Starts a builder for the given kind.
    pub fn builder(entity_type: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            schema: EntitySchema {
                entity_type: entity_type.into(),
                ..Default::default()
            },
        }
    }

    /// Checks that every attribute sits in exactly one merge category.
    ///
    /// Shadow names count as a category of their own so a shadow can never
    /// alias a persisted attribute.
    pub fn validate(&self) -> ModelResult<()> {
        let mut seen: BTreeMap<&str, FieldPolicy> = BTreeMap::new();
        let categories = self
            .mutable
            .iter()
            .map(|a| (a.as_str(), FieldPolicy::Mutable))
            .chain(self.opaque.iter().map(|f| (f.attr.as_str(), FieldPolicy::Opaque)))
            .chain(self.opaque.iter().map(|f| (f.shadow.as_str(), FieldPolicy::Shadow)))
            .chain(self.replace_lists.iter().map(|a| (a.as_str(), FieldPolicy::ReplaceList)))
            .chain(self.union_lists.iter().map(|a| (a.as_str(), FieldPolicy::UnionList)));

        for (attr, policy) in categories {
            if let Some(first) = seen.insert(attr, policy) {
                return Err(ModelError::AmbiguousAttributeCategory {
                    entity_type: self.entity_type.clone(),
                    attr: attr.to_string(),
                    first,
                    second: policy,
                });
            }
        }

        for attr in &self.nullable {
            if seen.get(attr.as_str()) != Some(&FieldPolicy::Mutable) {
                return Err(ModelError::NullableNotMutable {
                    entity_type: self.entity_type.clone(),
                    attr: attr.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns the merge category of an attribute, if it has one.
    ///
    /// Null-permitted scalars report [`FieldPolicy::Nullable`].
    pub fn policy_of(&self, attr: &str) -> Option<FieldPolicy> {
        if self.mutable.iter().any(|a| a == attr) {
            if self.is_nullable(attr) {
                return Some(FieldPolicy::Nullable);
            }
            return Some(FieldPolicy::Mutable);
        }
        if self.opaque.iter().any(|f| f.attr == attr) {
            return Some(FieldPolicy::Opaque);
        }
        if self.opaque.iter().any(|f| f.shadow == attr) {
            return Some(FieldPolicy::Shadow);
        }
        if self.replace_lists.iter().any(|a| a == attr) {
            return Some(FieldPolicy::ReplaceList);
        }
        if self.union_lists.iter().any(|a| a == attr) {
            return Some(FieldPolicy::UnionList);
        }
        None
    }

    pub fn is_nullable(&self, attr: &str) -> bool {
        self.nullable.iter().any(|a| a == attr)
    }

    /// Looks up an opaque attribute's descriptor.
    pub fn opaque_field(&self, attr: &str) -> Option<&OpaqueField> {
        self.opaque.iter().find(|f| f.attr == attr)
    }
}

/// Fluent construction of an [`EntitySchema`].
#[derive(Debug, Clone)]
pub struct EntitySchemaBuilder {
    schema: EntitySchema,
}

impl EntitySchemaBuilder {
    pub fn mutable<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.mutable.extend(attrs.into_iter().map(Into::into));
        self
    }

    /// Marks attributes as null-permitted. They must also be declared mutable.
    pub fn nullable<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.nullable.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn opaque(mut self, attr: impl Into<String>, shadow: impl Into<String>) -> Self {
        self.schema.opaque.push(OpaqueField::new(attr, shadow));
        self
    }

    pub fn replace_lists<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.replace_lists.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn union_lists<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.union_lists.extend(attrs.into_iter().map(Into::into));
        self
    }

    pub fn references<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.references.extend(attrs.into_iter().map(Into::into));
        self
    }

    /// Validates and returns the schema.
    pub fn build(self) -> ModelResult<EntitySchema> {
        self.schema.validate()?;
        Ok(self.schema)
    }
}
