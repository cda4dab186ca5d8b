#[path = "../../src/test_support.rs"]
#[allow(dead_code)]
mod test_support;

pub use test_support::*;

use history_keyindex::{KeyIndex, Ordinal, RecordStore, SchemaCatalog};
use std::sync::Arc;

/// Index over the default catalog with `A` keyed on `(id, anotherField)`
#[allow(dead_code)]
pub fn keyed_index(catalog: &Arc<SchemaCatalog>) -> anyhow::Result<KeyIndex> {
    let mut index = KeyIndex::new(Arc::clone(catalog));
    index.declare_key(KEYED_TYPE, ["id", "anotherField"])?;
    Ok(index)
}

/// Assert every live ordinal of `A` resolves to itself and displays as `k.0:k`
#[allow(dead_code)]
pub fn assert_self_bound(
    index: &KeyIndex,
    store: &dyn RecordStore,
    count: u32,
) -> anyhow::Result<()> {
    for k in 0..count {
        let ordinal = Ordinal(k);
        assert_eq!(
            index.lookup_key_ordinal(store, KEYED_TYPE, ordinal)?,
            Some(ordinal),
            "ordinal {k} should be bound to itself"
        );
        assert_eq!(
            index.display_key(store, KEYED_TYPE, ordinal)?,
            format!("{}:{}", format_float(k as f32), k)
        );
    }
    Ok(())
}

/// Whole floats render with a trailing `.0`
#[allow(dead_code)]
pub fn format_float(value: f32) -> String {
    format!("{value:?}")
}
