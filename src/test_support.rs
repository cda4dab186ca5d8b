//! Dataset helpers shared by integration tests and benches.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use history_keyindex::{FieldType, FieldValue, MemoryStore, SchemaCatalog, TypeSchema};

/// Type whose key is `(id: FLOAT, anotherField: LONG)`
pub const KEYED_TYPE: &str = "A";

/// Catalog holding [`KEYED_TYPE`] plus a string-keyed `Tag` type
pub fn default_catalog() -> Arc<SchemaCatalog> {
    Arc::new(
        SchemaCatalog::new()
            .with_type(
                TypeSchema::new(KEYED_TYPE)
                    .with_field("id", FieldType::Float)
                    .with_field("anotherField", FieldType::Long),
            )
            .with_type(
                TypeSchema::new("Tag")
                    .with_field("name", FieldType::String)
                    .with_field("weight", FieldType::Double)
                    .with_field("enabled", FieldType::Boolean),
            ),
    )
}

/// Record of [`KEYED_TYPE`] whose key fields both carry `k`
pub fn keyed_record(k: u32) -> Vec<FieldValue> {
    vec![FieldValue::Float(k as f32), FieldValue::Long(k as i64)]
}

/// Add `keyed_record(k)` for every `k` in `ks`, in order
pub fn add_keyed<I>(store: &mut MemoryStore, ks: I)
where
    I: IntoIterator<Item = u32>,
{
    for k in ks {
        // Catalog and record shape are fixed above.
        store
            .add_record(KEYED_TYPE, keyed_record(k))
            .expect("keyed record matches schema");
    }
}

/// Key values `0..count` in a seeded random order
pub fn shuffled_keys(count: u32, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<u32> = (0..count).collect();
    keys.shuffle(&mut rng);
    keys
}

/// `count` keys drawn from `0..distinct`, so most repeat
pub fn repeating_keys(count: usize, distinct: u32, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.random_range(0..distinct)).collect()
}

/// Tag record with a seeded weight
pub fn tag_record(name: &str, rng: &mut StdRng) -> Vec<FieldValue> {
    vec![
        FieldValue::from(name),
        FieldValue::Double(rng.random_range(0.0..1.0)),
        FieldValue::Boolean(rng.random_bool(0.5)),
    ]
}
