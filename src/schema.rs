//! # Schema Catalog
//!
//! Field layouts of the record types a store carries. The catalog is an
//! explicit value handed to the index (and to the in-memory store) by `Arc`.

use crate::error::{KeyIndexError, Result};
use crate::model::FieldType;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// One named, typed field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered field layout of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TypeSchemaRepr")]
pub struct TypeSchema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl TypeSchema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.add_field(name, field_type);
        self
    }

    /// Append a field. A field with the same name replaces the earlier one in place.
    pub fn add_field(&mut self, name: impl Into<String>, field_type: FieldType) {
        let def = FieldDef::new(name, field_type);
        match self.fields.iter_mut().find(|f| f.name == def.name) {
            Some(existing) => *existing = def,
            None => self.fields.push(def),
        }
    }

    /// Position of a field in record layout order
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }

    pub fn field(&self, field: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == field)
    }

    /// Like [`TypeSchema::field`], failing with `UnknownField`
    pub fn require_field(&self, field: &str) -> Result<&FieldDef> {
        self.field(field)
            .ok_or_else(|| KeyIndexError::unknown_field(&self.name, field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// All record type schemas known to one store lineage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CatalogRepr")]
pub struct SchemaCatalog {
    types: HashMap<String, TypeSchema>,
}

/// Serialized schema, checked for repeated field names on the way in
#[derive(Deserialize)]
struct TypeSchemaRepr {
    name: String,
    #[serde(default)]
    fields: Vec<FieldDef>,
}

impl TryFrom<TypeSchemaRepr> for TypeSchema {
    type Error = String;

    fn try_from(repr: TypeSchemaRepr) -> std::result::Result<Self, Self::Error> {
        let mut schema = TypeSchema::new(repr.name);
        for def in repr.fields {
            if schema.field(&def.name).is_some() {
                return Err(format!(
                    "field {} appears more than once on type {}",
                    def.name, schema.name
                ));
            }
            schema.add_field(def.name, def.field_type);
        }
        Ok(schema)
    }
}

/// Serialized catalog, whose map keys must match the schema names
#[derive(Deserialize)]
struct CatalogRepr {
    #[serde(default)]
    types: HashMap<String, TypeSchema>,
}

impl TryFrom<CatalogRepr> for SchemaCatalog {
    type Error = String;

    fn try_from(repr: CatalogRepr) -> std::result::Result<Self, Self::Error> {
        let mut catalog = SchemaCatalog::new();
        for (key, schema) in repr.types {
            if key != schema.name {
                return Err(format!(
                    "catalog entry {key} holds schema for type {}",
                    schema.name
                ));
            }
            catalog.add_type(schema);
        }
        Ok(catalog)
    }
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any schema of the same name
    pub fn add_type(&mut self, schema: TypeSchema) {
        self.types.insert(schema.name.clone(), schema);
    }

    /// Builder-style [`SchemaCatalog::add_type`]
    pub fn with_type(mut self, schema: TypeSchema) -> Self {
        self.add_type(schema);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeSchema> {
        self.types.get(type_name)
    }

    /// Like [`SchemaCatalog::get`], failing with `UnknownType`
    pub fn require(&self, type_name: &str) -> Result<&TypeSchema> {
        self.get(type_name)
            .ok_or_else(|| KeyIndexError::UnknownType(type_name.to_string()))
    }

    /// Type names in sorted order
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parse a catalog from its JSON form. Map keys must match schema names
    /// and field names must be unique per type.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
