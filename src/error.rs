//! Error types for key declaration, index updates and lookups.
//!
//! Every variant is recoverable. The duplicate-key skip during an update is a
//! designed behavior and never surfaces here.

use crate::model::{FieldType, Ordinal};
use std::fmt;
use thiserror::Error;

/// Errors raised by the key index and its store boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeyIndexError {
    /// Type not present in the schema catalog
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Field not present on the type's schema
    #[error("unknown field {field} on type {type_name}")]
    UnknownField { type_name: String, field: String },

    /// Same field named twice in one key declaration
    #[error("field {field} appears more than once in the key for {type_name}")]
    DuplicateKeyField { type_name: String, field: String },

    /// Key declared without any field
    #[error("key for {0} must name at least one field")]
    EmptyKey(String),

    /// Update or lookup for a type with no declared key
    #[error("no key declared for type {0}")]
    UnregisteredType(String),

    /// Ordinal out of range or not populated in the current store version
    #[error("ordinal {ordinal} does not exist for type {type_name}")]
    UnknownOrdinal { type_name: String, ordinal: Ordinal },

    /// Table sizing the ordinal table cannot work with
    #[error("invalid index configuration: {0}")]
    InvalidConfig(String),

    /// Queryable field whose postings have not been built by an update yet
    #[error("field {field} on type {type_name} is not indexed until the next update")]
    FieldNotIndexed { type_name: String, field: String },

    /// Table growth would pass the configured maximum capacity
    #[error("ordinal table for {type_name} needs {required} slots, limit is {limit}")]
    CapacityExhausted {
        type_name: String,
        required: usize,
        limit: usize,
    },

    /// Single-field query on a field never marked queryable
    #[error("field {field} on type {type_name} is not queryable")]
    FieldNotQueryable { type_name: String, field: String },

    /// Composite key lookup with the wrong number of values
    #[error("key for {type_name} has {expected} fields, got {actual}")]
    KeyArity {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// Record insertion with the wrong number of values
    #[error("record for {type_name} has {expected} fields, got {actual}")]
    RecordArity {
        type_name: String,
        expected: usize,
        actual: usize,
    },

    /// Value does not match the declared field type
    #[error("field {field} on type {type_name} expects {expected}")]
    FieldTypeMismatch {
        type_name: String,
        field: String,
        expected: FieldType,
    },

    /// Display token cannot be parsed as the field type
    #[error("cannot parse {token:?} as {field_type}")]
    InvalidToken { token: String, field_type: FieldType },

    /// Some types failed during a multi-type update; the others were committed
    #[error("update failed for {} type(s): {}", .0.len(), TypeFailures(.0))]
    PartialUpdate(Vec<(String, KeyIndexError)>),
}

impl KeyIndexError {
    pub(crate) fn unknown_field(type_name: &str, field: &str) -> Self {
        KeyIndexError::UnknownField {
            type_name: type_name.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn unknown_ordinal(type_name: &str, ordinal: Ordinal) -> Self {
        KeyIndexError::UnknownOrdinal {
            type_name: type_name.to_string(),
            ordinal,
        }
    }
}

struct TypeFailures<'a>(&'a [(String, KeyIndexError)]);

impl fmt::Display for TypeFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (type_name, error)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{type_name}: {error}")?;
        }
        Ok(())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, KeyIndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_message_lists_types() {
        let err = KeyIndexError::PartialUpdate(vec![
            ("A".to_string(), KeyIndexError::UnknownType("A".to_string())),
            (
                "B".to_string(),
                KeyIndexError::unknown_ordinal("B", Ordinal(3)),
            ),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("update failed for 2 type(s)"));
        assert!(message.contains("A: unknown type: A"));
        assert!(message.contains("B: ordinal #3 does not exist for type B"));
    }
}
