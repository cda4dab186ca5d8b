//! # Key Schema Registry
//!
//! Declares which fields, in which order, form the composite key of each
//! record type, and which fields may be queried on their own.

use crate::error::{KeyIndexError, Result};
use crate::model::FieldType;
use crate::schema::SchemaCatalog;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A key field resolved against its type's schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyField {
    pub name: String,
    pub field_type: FieldType,
}

/// Ordered key fields of one record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyFieldSpec {
    pub type_name: String,
    pub fields: Vec<KeyField>,
}

impl KeyFieldSpec {
    /// Number of fields in the key
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Position of a field within the key
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }
}

/// Registry of key declarations and queryable fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyRegistry {
    specs: HashMap<String, KeyFieldSpec>,
    queryable: HashMap<String, BTreeSet<String>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the ordered key fields of `type_name`.
    ///
    /// Every name must exist on the type's schema and appear once. Returns the
    /// spec this declaration replaced, if any.
    pub fn declare_key<I, S>(
        &mut self,
        catalog: &SchemaCatalog,
        type_name: &str,
        field_names: I,
    ) -> Result<Option<KeyFieldSpec>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let schema = catalog.require(type_name)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for name in field_names {
            let name = name.as_ref();
            let def = schema.require_field(name)?;
            if !seen.insert(name.to_string()) {
                return Err(KeyIndexError::DuplicateKeyField {
                    type_name: type_name.to_string(),
                    field: name.to_string(),
                });
            }
            fields.push(KeyField {
                name: def.name.clone(),
                field_type: def.field_type,
            });
        }

        if fields.is_empty() {
            return Err(KeyIndexError::EmptyKey(type_name.to_string()));
        }

        let spec = KeyFieldSpec {
            type_name: type_name.to_string(),
            fields,
        };
        Ok(self.specs.insert(type_name.to_string(), spec))
    }

    /// Authorize single-field lookups on `field` of a declared type.
    /// Returns `true` if the field was not already queryable.
    pub fn mark_queryable(
        &mut self,
        catalog: &SchemaCatalog,
        type_name: &str,
        field: &str,
    ) -> Result<bool> {
        self.require(type_name)?;
        catalog.require(type_name)?.require_field(field)?;
        Ok(self
            .queryable
            .entry(type_name.to_string())
            .or_default()
            .insert(field.to_string()))
    }

    pub fn key_spec(&self, type_name: &str) -> Option<&KeyFieldSpec> {
        self.specs.get(type_name)
    }

    /// Like [`KeyRegistry::key_spec`], failing with `UnregisteredType`
    pub fn require(&self, type_name: &str) -> Result<&KeyFieldSpec> {
        self.key_spec(type_name)
            .ok_or_else(|| KeyIndexError::UnregisteredType(type_name.to_string()))
    }

    pub fn is_queryable(&self, type_name: &str, field: &str) -> bool {
        self.queryable
            .get(type_name)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Queryable fields of a type in name order
    pub fn queryable_fields(&self, type_name: &str) -> Vec<&str> {
        self.queryable
            .get(type_name)
            .map(|fields| fields.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Types with a declared key, in name order
    pub fn declared_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
