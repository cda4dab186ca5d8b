//! # Store Module
//!
//! The record store boundary consumed by the key index, and an in-memory,
//! versioned implementation of it.
//!
//! `MemoryStore` is the writer: records are added and removed, then `commit`
//! cuts an immutable [`StoreVersion`] that remembers which ordinals it added
//! relative to the previous version. Versions share unchanged per-type data.

use crate::error::{KeyIndexError, Result};
use crate::model::{FieldValue, Ordinal};
use crate::schema::SchemaCatalog;
use hashbrown::HashMap;
use std::sync::Arc;

type Row = Vec<FieldValue>;
type Rows = Arc<Vec<Option<Row>>>;

/// Read access to one version of an ordinal-addressed record store
pub trait RecordStore {
    /// Monotonic version number of this view
    fn version(&self) -> u64;

    /// One past the highest ordinal ever assigned for the type (0 if unknown)
    fn ordinal_count(&self, type_name: &str) -> usize;

    /// Whether `ordinal` holds a live record in this version
    fn is_populated(&self, type_name: &str, ordinal: Ordinal) -> bool {
        ordinal.index() < self.ordinal_count(type_name)
    }

    /// Value of one field of one record
    fn field_value(&self, type_name: &str, ordinal: Ordinal, field: &str) -> Result<FieldValue>;

    /// Ordinals introduced by this version relative to the previous one
    fn added_ordinals(&self, type_name: &str) -> Vec<Ordinal>;

    /// Every live ordinal of the type, ascending
    fn populated_ordinals(&self, type_name: &str) -> Vec<Ordinal> {
        (0..self.ordinal_count(type_name) as u32)
            .map(Ordinal)
            .filter(|ordinal| self.is_populated(type_name, *ordinal))
            .collect()
    }
}

/// Mutable in-memory record store
#[derive(Debug, Clone)]
pub struct MemoryStore {
    catalog: Arc<SchemaCatalog>,
    rows: HashMap<String, Rows>,
    pending_added: HashMap<String, Vec<Ordinal>>,
    next_version: u64,
}

impl MemoryStore {
    /// Create an empty store for the types in `catalog`
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            catalog,
            rows: HashMap::new(),
            pending_added: HashMap::new(),
            next_version: 1,
        }
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    /// Add a record, returning its ordinal.
    ///
    /// Values are given in schema field order; `Null` is accepted anywhere.
    pub fn add_record(&mut self, type_name: &str, values: Vec<FieldValue>) -> Result<Ordinal> {
        let schema = self.catalog.require(type_name)?;
        if values.len() != schema.len() {
            return Err(KeyIndexError::RecordArity {
                type_name: type_name.to_string(),
                expected: schema.len(),
                actual: values.len(),
            });
        }
        for (def, value) in schema.fields.iter().zip(&values) {
            if !value.conforms_to(def.field_type) {
                return Err(KeyIndexError::FieldTypeMismatch {
                    type_name: type_name.to_string(),
                    field: def.name.clone(),
                    expected: def.field_type,
                });
            }
        }

        let rows = Arc::make_mut(self.rows.entry(type_name.to_string()).or_default());
        let ordinal = Ordinal(rows.len() as u32);
        rows.push(Some(values));
        self.pending_added
            .entry(type_name.to_string())
            .or_default()
            .push(ordinal);
        Ok(ordinal)
    }

    /// Remove a live record. Its ordinal is never reassigned.
    pub fn remove_record(&mut self, type_name: &str, ordinal: Ordinal) -> Result<()> {
        self.catalog.require(type_name)?;
        let rows = self
            .rows
            .get_mut(type_name)
            .ok_or_else(|| KeyIndexError::unknown_ordinal(type_name, ordinal))?;
        if !matches!(rows.get(ordinal.index()), Some(Some(_))) {
            return Err(KeyIndexError::unknown_ordinal(type_name, ordinal));
        }
        Arc::make_mut(rows)[ordinal.index()] = None;
        Ok(())
    }

    /// Cut an immutable version containing everything written so far.
    /// Additions since the previous commit become that version's delta.
    pub fn commit(&mut self) -> StoreVersion {
        let version = StoreVersion {
            version: self.next_version,
            catalog: Arc::clone(&self.catalog),
            rows: self.rows.clone(),
            added: std::mem::take(&mut self.pending_added),
        };
        self.next_version += 1;
        version
    }
}

/// Immutable view of a [`MemoryStore`] at one commit
#[derive(Debug, Clone)]
pub struct StoreVersion {
    version: u64,
    catalog: Arc<SchemaCatalog>,
    rows: HashMap<String, Rows>,
    added: HashMap<String, Vec<Ordinal>>,
}

impl StoreVersion {
    /// All field values of a live record, in schema order
    pub fn record(&self, type_name: &str, ordinal: Ordinal) -> Option<&[FieldValue]> {
        self.rows
            .get(type_name)?
            .get(ordinal.index())?
            .as_deref()
    }
}

impl RecordStore for StoreVersion {
    fn version(&self) -> u64 {
        self.version
    }

    fn ordinal_count(&self, type_name: &str) -> usize {
        self.rows.get(type_name).map_or(0, |rows| rows.len())
    }

    fn is_populated(&self, type_name: &str, ordinal: Ordinal) -> bool {
        self.record(type_name, ordinal).is_some()
    }

    fn field_value(&self, type_name: &str, ordinal: Ordinal, field: &str) -> Result<FieldValue> {
        let schema = self.catalog.require(type_name)?;
        let position = schema
            .position(field)
            .ok_or_else(|| KeyIndexError::unknown_field(type_name, field))?;
        let row = self
            .record(type_name, ordinal)
            .ok_or_else(|| KeyIndexError::unknown_ordinal(type_name, ordinal))?;
        Ok(row[position].clone())
    }

    fn added_ordinals(&self, type_name: &str) -> Vec<Ordinal> {
        self.added.get(type_name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldType;
    use crate::schema::TypeSchema;

    fn store() -> MemoryStore {
        let catalog = SchemaCatalog::new().with_type(
            TypeSchema::new("A")
                .with_field("id", FieldType::Float)
                .with_field("anotherField", FieldType::Long),
        );
        MemoryStore::new(Arc::new(catalog))
    }

    fn row(i: u32) -> Vec<FieldValue> {
        vec![FieldValue::Float(i as f32), FieldValue::Long(i as i64)]
    }

    #[test]
    fn test_add_and_read_back() {
        let mut store = store();
        let ordinal = store.add_record("A", row(7)).unwrap();
        assert_eq!(ordinal, Ordinal(0));

        let version = store.commit();
        assert_eq!(version.version(), 1);
        assert_eq!(version.ordinal_count("A"), 1);
        assert_eq!(
            version.field_value("A", ordinal, "anotherField").unwrap(),
            FieldValue::Long(7)
        );
        assert_eq!(version.ordinal_count("B"), 0);
    }

    #[test]
    fn test_add_record_validates_schema() {
        let mut store = store();
        assert!(matches!(
            store.add_record("A", vec![FieldValue::Float(1.0)]),
            Err(KeyIndexError::RecordArity { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            store.add_record("A", vec![FieldValue::Long(1), FieldValue::Long(1)]),
            Err(KeyIndexError::FieldTypeMismatch { .. })
        ));
        assert!(matches!(
            store.add_record("B", vec![]),
            Err(KeyIndexError::UnknownType(_))
        ));
        assert!(store
            .add_record("A", vec![FieldValue::Null, FieldValue::Long(1)])
            .is_ok());
    }

    #[test]
    fn test_commit_tracks_added_ordinals_per_version() {
        let mut store = store();
        for i in 0..3 {
            store.add_record("A", row(i)).unwrap();
        }
        let first = store.commit();
        for i in 3..5 {
            store.add_record("A", row(i)).unwrap();
        }
        let second = store.commit();

        assert_eq!(first.added_ordinals("A"), vec![Ordinal(0), Ordinal(1), Ordinal(2)]);
        assert_eq!(second.added_ordinals("A"), vec![Ordinal(3), Ordinal(4)]);
        assert_eq!(first.ordinal_count("A"), 3);
        assert_eq!(second.ordinal_count("A"), 5);
        assert!(store.commit().added_ordinals("A").is_empty());
    }

    #[test]
    fn test_remove_leaves_hole() {
        let mut store = store();
        for i in 0..3 {
            store.add_record("A", row(i)).unwrap();
        }
        let before = store.commit();
        store.remove_record("A", Ordinal(1)).unwrap();
        let after = store.commit();

        assert!(before.is_populated("A", Ordinal(1)));
        assert!(!after.is_populated("A", Ordinal(1)));
        assert_eq!(after.populated_ordinals("A"), vec![Ordinal(0), Ordinal(2)]);
        assert_eq!(
            after.field_value("A", Ordinal(1), "id"),
            Err(KeyIndexError::unknown_ordinal("A", Ordinal(1)))
        );
        assert!(store.remove_record("A", Ordinal(1)).is_err());
    }

    #[test]
    fn test_field_value_errors() {
        let mut store = store();
        store.add_record("A", row(0)).unwrap();
        let version = store.commit();
        assert_eq!(
            version.field_value("A", Ordinal(0), "nope"),
            Err(KeyIndexError::unknown_field("A", "nope"))
        );
        assert_eq!(
            version.field_value("A", Ordinal(5), "id"),
            Err(KeyIndexError::unknown_ordinal("A", Ordinal(5)))
        );
    }
}
