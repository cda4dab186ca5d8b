mod support;

use anyhow::Result;
use history_keyindex::{
    ConfigOverrides, FieldValue, IndexConfig, KeyIndex, KeyIndexError, MemoryStore, Ordinal,
    TypeState, UpdateMode,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::sync::Arc;
use support::{
    add_keyed, default_catalog, keyed_index, repeating_keys, shuffled_keys, tag_record,
    KEYED_TYPE,
};

#[test]
fn shuffled_keys_bind_to_their_own_ordinals() -> Result<()> {
    let catalog = default_catalog();
    let mut index = keyed_index(&catalog)?;
    let keys = shuffled_keys(3000, 7);

    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, keys.iter().copied());
    let version = store.commit();
    index.update(&version, UpdateMode::FullRebuild)?;

    for (ordinal, k) in keys.iter().enumerate() {
        let display = format!("{}:{}", support::format_float(*k as f32), k);
        assert_eq!(
            index.lookup_display_key(KEYED_TYPE, &display)?,
            Some(Ordinal(ordinal as u32))
        );
        assert_eq!(index.display_key(&version, KEYED_TYPE, Ordinal(ordinal as u32))?, display);
    }
    Ok(())
}

#[test]
fn repeated_keys_resolve_to_lowest_ordinal() -> Result<()> {
    let catalog = default_catalog();
    let mut index = keyed_index(&catalog)?;
    let keys = repeating_keys(2000, 50, 11);

    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, keys.iter().copied());
    let version = store.commit();
    let summary = index.update(&version, UpdateMode::FullRebuild)?;

    let distinct: std::collections::HashSet<u32> = keys.iter().copied().collect();
    let update = summary.get(KEYED_TYPE).expect("A was updated");
    assert_eq!(update.inserted, distinct.len());
    assert_eq!(update.duplicates, keys.len() - distinct.len());

    for (ordinal, k) in keys.iter().enumerate() {
        let first = keys.iter().position(|other| other == k).expect("present") as u32;
        assert_eq!(
            index.lookup_key_ordinal(&version, KEYED_TYPE, Ordinal(ordinal as u32))?,
            Some(Ordinal(first))
        );
    }
    Ok(())
}

#[test]
fn incremental_update_preserves_existing_bindings() -> Result<()> {
    let catalog = default_catalog();
    let mut index = keyed_index(&catalog)?;

    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, [10, 20, 30]);
    let first = store.commit();
    index.update(&first, UpdateMode::FullRebuild)?;

    // Repeats key 20 and adds key 40.
    add_keyed(&mut store, [20, 40]);
    let second = store.commit();
    let summary = index.update(&second, UpdateMode::Incremental)?;
    let update = summary.get(KEYED_TYPE).expect("A was updated");
    assert_eq!(update.scanned, 2);
    assert_eq!(update.inserted, 1);
    assert_eq!(update.duplicates, 1);

    assert_eq!(
        index.lookup_key_ordinal(&second, KEYED_TYPE, Ordinal(3))?,
        Some(Ordinal(1))
    );
    assert_eq!(
        index.lookup_key_ordinal(&second, KEYED_TYPE, Ordinal(4))?,
        Some(Ordinal(4))
    );
    assert_eq!(index.indexed_version(KEYED_TYPE), Some(2));
    Ok(())
}

#[test]
fn removed_records_stay_bound_until_full_rebuild() -> Result<()> {
    let catalog = default_catalog();
    let mut index = keyed_index(&catalog)?;

    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, [1, 2, 3]);
    let first = store.commit();
    index.update(&first, UpdateMode::FullRebuild)?;

    store.remove_record(KEYED_TYPE, Ordinal(1))?;
    let second = store.commit();
    index.update(&second, UpdateMode::Incremental)?;
    assert_eq!(index.lookup_display_key(KEYED_TYPE, "2.0:2")?, Some(Ordinal(1)));
    assert!(matches!(
        index.display_key(&second, KEYED_TYPE, Ordinal(1)),
        Err(KeyIndexError::UnknownOrdinal { .. })
    ));

    index.update(&second, UpdateMode::FullRebuild)?;
    assert_eq!(index.lookup_display_key(KEYED_TYPE, "2.0:2")?, None);
    assert_eq!(index.lookup_display_key(KEYED_TYPE, "3.0:3")?, Some(Ordinal(2)));
    Ok(())
}

#[test]
fn null_and_string_key_fields() -> Result<()> {
    let catalog = default_catalog();
    let mut index = KeyIndex::new(catalog.clone());
    index.declare_key("Tag", ["name", "enabled"])?;

    let mut store = MemoryStore::new(catalog.clone());
    store.add_record(
        "Tag",
        vec!["a:b".into(), FieldValue::Double(0.5), FieldValue::Null],
    )?;
    store.add_record(
        "Tag",
        vec!["a".into(), FieldValue::Double(0.5), true.into()],
    )?;
    let version = store.commit();
    index.update(&version, UpdateMode::FullRebuild)?;

    assert_eq!(index.display_key(&version, "Tag", Ordinal(0))?, "a:b:null");
    assert_eq!(
        index.lookup_key("Tag", &["a:b".into(), FieldValue::Null])?,
        Some(Ordinal(0))
    );
    assert_eq!(index.lookup_display_key("Tag", "a:true")?, Some(Ordinal(1)));

    // The last field absorbs extra delimiters, so a delimiter inside an
    // earlier string field does not round-trip through the display form.
    assert!(matches!(
        index.lookup_display_key("Tag", "a:b:null"),
        Err(KeyIndexError::InvalidToken { .. })
    ));
    Ok(())
}

#[test]
fn update_reports_failed_types_and_commits_the_rest() -> Result<()> {
    let catalog = default_catalog();
    let config = IndexConfig {
        initial_capacity: 8,
        max_capacity: Some(16),
        ..IndexConfig::default()
    };
    let mut index = KeyIndex::with_config(catalog.clone(), config)?;
    index.declare_key(KEYED_TYPE, ["id", "anotherField"])?;
    index.declare_key("Tag", ["name"])?;

    let mut rng = StdRng::seed_from_u64(3);
    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, 0..100);
    store.add_record("Tag", tag_record("red", &mut rng))?;
    let version = store.commit();

    let err = index
        .update(&version, UpdateMode::FullRebuild)
        .expect_err("A cannot fit in 16 slots");
    let failures = match err {
        KeyIndexError::PartialUpdate(failures) => failures,
        other => panic!("expected a partial update, got {other}"),
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, KEYED_TYPE);

    assert_eq!(index.state(KEYED_TYPE), Some(TypeState::Uninitialized));
    assert_eq!(index.state("Tag"), Some(TypeState::Built));
    assert_eq!(index.lookup_display_key("Tag", "red")?, Some(Ordinal(0)));
    Ok(())
}

#[test]
fn readers_share_the_index_across_threads() -> Result<()> {
    let catalog = default_catalog();
    let mut index = keyed_index(&catalog)?;
    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, 0..2000);
    let version = store.commit();
    index.update(&version, UpdateMode::FullRebuild)?;

    let index = Arc::new(index);
    std::thread::scope(|scope| {
        for shard in 0..4u32 {
            let index = Arc::clone(&index);
            let version = &version;
            scope.spawn(move || {
                for k in (shard..2000).step_by(4) {
                    let ordinal = Ordinal(k);
                    assert_eq!(
                        index.lookup_key_ordinal(version, KEYED_TYPE, ordinal).unwrap(),
                        Some(ordinal)
                    );
                }
            });
        }
    });
    Ok(())
}

#[test]
fn config_file_sizes_tables() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "initial_capacity = 100")?;
    writeln!(file, "load_factor = 0.5")?;

    let config = IndexConfig::load(Some(file.path()), ConfigOverrides::default())?;
    assert_eq!(config.initial_capacity, 100);

    let catalog = default_catalog();
    let mut index = KeyIndex::with_config(catalog.clone(), config)?;
    index.declare_key(KEYED_TYPE, ["id", "anotherField"])?;
    assert_eq!(index.table_snapshot(KEYED_TYPE).expect("A").capacity(), 128);

    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, 0..65);
    let version = store.commit();
    index.update(&version, UpdateMode::FullRebuild)?;
    assert_eq!(index.table_snapshot(KEYED_TYPE).expect("A").capacity(), 256);
    Ok(())
}

#[test]
fn incremental_update_covers_skipped_versions() -> Result<()> {
    let catalog = default_catalog();
    let mut index = keyed_index(&catalog)?;

    let mut store = MemoryStore::new(catalog.clone());
    add_keyed(&mut store, 0..10);
    let first = store.commit();
    index.update(&first, UpdateMode::FullRebuild)?;

    // Never handed to the index.
    add_keyed(&mut store, 10..20);
    store.commit();

    add_keyed(&mut store, 20..30);
    let third = store.commit();
    let summary = index.update(&third, UpdateMode::Incremental)?;
    assert_eq!(summary.get(KEYED_TYPE).expect("A was updated").scanned, 20);
    assert_eq!(index.indexed_version(KEYED_TYPE), Some(3));

    support::assert_self_bound(&index, &third, 30)?;
    assert_eq!(
        index.lookup_key_ordinal(&third, KEYED_TYPE, Ordinal(15))?,
        Some(Ordinal(15))
    );
    Ok(())
}

#[test]
fn unusable_load_factor_is_rejected_up_front() -> Result<()> {
    let config = IndexConfig {
        load_factor: 0.0,
        ..IndexConfig::default()
    };
    assert!(matches!(
        KeyIndex::with_config(default_catalog(), config.clone()),
        Err(KeyIndexError::InvalidConfig(_))
    ));
    assert!(matches!(
        history_keyindex::OrdinalTable::new("A", &config),
        Err(KeyIndexError::InvalidConfig(_))
    ));
    Ok(())
}
