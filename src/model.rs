//! # Data Model
//!
//! Core value types shared by the store boundary, the registry and the index:
//! record ordinals, primitive field types and the closed set of field values a
//! key may be built from.

use crate::error::{KeyIndexError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-local identifier for one record of a type within one store version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ordinal(pub u32);

impl Ordinal {
    /// Ordinal as a slot position
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for Ordinal {
    fn from(value: u32) -> Self {
        Ordinal(value)
    }
}

/// Primitive field types a key field may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Long,
    Float,
    Double,
    Boolean,
    String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int => "INT",
            FieldType::Long => "LONG",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Boolean => "BOOLEAN",
            FieldType::String => "STRING",
        };
        f.write_str(name)
    }
}

/// A typed field value read from a record.
///
/// `Null` stands for an unset field and is accepted for every field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Null,
}

impl FieldValue {
    /// The type carried by this value, `None` for `Null`
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            FieldValue::Int(_) => Some(FieldType::Int),
            FieldValue::Long(_) => Some(FieldType::Long),
            FieldValue::Float(_) => Some(FieldType::Float),
            FieldValue::Double(_) => Some(FieldType::Double),
            FieldValue::Boolean(_) => Some(FieldType::Boolean),
            FieldValue::String(_) => Some(FieldType::String),
            FieldValue::Null => None,
        }
    }

    /// Whether this value may be stored in a field of `field_type`
    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        self.field_type().is_none_or(|carried| carried == field_type)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Parse a display token back into a value of `field_type`.
    ///
    /// The token `null` parses to `Null` for every type except `String`, where
    /// it is ordinary text.
    pub fn parse(field_type: FieldType, token: &str) -> Result<Self> {
        if token == "null" && field_type != FieldType::String {
            return Ok(FieldValue::Null);
        }

        let invalid = || KeyIndexError::InvalidToken {
            token: token.to_string(),
            field_type,
        };

        let value = match field_type {
            FieldType::Int => FieldValue::Int(token.parse().map_err(|_| invalid())?),
            FieldType::Long => FieldValue::Long(token.parse().map_err(|_| invalid())?),
            FieldType::Float => FieldValue::Float(token.parse().map_err(|_| invalid())?),
            FieldType::Double => FieldValue::Double(token.parse().map_err(|_| invalid())?),
            FieldType::Boolean => FieldValue::Boolean(token.parse().map_err(|_| invalid())?),
            FieldType::String => FieldValue::String(token.to_string()),
        };
        Ok(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::hash::format_field(self))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Long(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
