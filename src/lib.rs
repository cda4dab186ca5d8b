//! # History Key Index
//!
//! A growable composite-key index over a versioned, ordinal-addressed record
//! store.
//!
//! Each record type declares an ordered list of key fields. The index hashes
//! those fields for every live record and keeps, per type, a table from key
//! hash to the first ordinal that carried the key. Tables are rebuilt from a
//! full scan or extended from a version's added ordinals, growing by
//! rehashing as they fill.
//!
//! ```
//! use std::sync::Arc;
//! use history_keyindex::{
//!     FieldType, KeyIndex, MemoryStore, Ordinal, SchemaCatalog, TypeSchema, UpdateMode,
//! };
//!
//! let catalog = Arc::new(SchemaCatalog::new().with_type(
//!     TypeSchema::new("A")
//!         .with_field("id", FieldType::Float)
//!         .with_field("anotherField", FieldType::Long),
//! ));
//!
//! let mut store = MemoryStore::new(Arc::clone(&catalog));
//! store.add_record("A", vec![2500.0f32.into(), 2500i64.into()]).unwrap();
//! let version = store.commit();
//!
//! let mut index = KeyIndex::new(catalog);
//! index.declare_key("A", ["id", "anotherField"]).unwrap();
//! index.update(&version, UpdateMode::FullRebuild).unwrap();
//!
//! assert_eq!(index.display_key(&version, "A", Ordinal(0)).unwrap(), "2500.0:2500");
//! assert_eq!(index.lookup_display_key("A", "2500.0:2500").unwrap(), Some(Ordinal(0)));
//! ```

pub mod config;
pub mod error;
pub mod hash;
pub mod index;
pub mod model;
pub mod registry;
pub mod schema;
pub mod store;
pub mod table;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigOverrides, IndexConfig};
pub use error::{KeyIndexError, Result};
pub use index::{KeyIndex, TypeState, TypeUpdate, UpdateMode, UpdateSummary};
pub use model::{FieldType, FieldValue, Ordinal};
pub use registry::{KeyField, KeyFieldSpec, KeyRegistry};
pub use schema::{FieldDef, SchemaCatalog, TypeSchema};
pub use store::{MemoryStore, RecordStore, StoreVersion};
pub use table::OrdinalTable;
