//! # Key Index
//!
//! Resolves records of a versioned store to their composite keys and back.
//!
//! One [`OrdinalTable`] is kept per declared type. A full rebuild scans every
//! live ordinal in ascending order into a fresh table; an incremental update
//! scans only the ordinals the store reports as added and extends the existing
//! table. Both insert-if-absent, so the lowest ordinal seen for a key keeps it.
//!
//! Incremental updates never evict. A record removed from the store stays
//! resolvable through its old binding until the next full rebuild.

use crate::config::IndexConfig;
use crate::error::{KeyIndexError, Result};
use crate::hash::{self, composite_hash, format_field, split_key};
use crate::model::{FieldValue, Ordinal};
use crate::registry::{KeyFieldSpec, KeyRegistry};
use crate::schema::SchemaCatalog;
use crate::store::RecordStore;
use crate::table::OrdinalTable;
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// How an update treats the existing tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    /// Discard the table and scan every live ordinal
    FullRebuild,
    /// Keep the table and scan only newly added ordinals
    Incremental,
}

/// Lifecycle of one type's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeState {
    /// Declared but not yet updated
    Uninitialized,
    /// At least one update has completed
    Built,
}

/// Outcome of updating one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeUpdate {
    pub type_name: String,
    /// Mode actually applied; incremental on an unbuilt type runs as a full rebuild
    pub mode: UpdateMode,
    /// Ordinals read from the store
    pub scanned: usize,
    /// New bindings added to the table
    pub inserted: usize,
    /// Scanned ordinals whose key was already bound
    pub duplicates: usize,
    /// Table entries after the update
    pub entries: usize,
    /// Table capacity after the update
    pub capacity: usize,
    /// Rehashes performed by this update
    pub rehashes: u32,
}

/// Outcome of updating every declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub version: u64,
    pub types: Vec<TypeUpdate>,
}

impl UpdateSummary {
    pub fn get(&self, type_name: &str) -> Option<&TypeUpdate> {
        self.types.iter().find(|t| t.type_name == type_name)
    }
}

/// Canonical field token -> bound ordinals, ascending
#[derive(Debug, Clone, Default)]
struct FieldPostings {
    postings: HashMap<String, Vec<Ordinal>>,
}

impl FieldPostings {
    fn add(&mut self, token: String, ordinal: Ordinal) {
        let ordinals = self.postings.entry(token).or_default();
        if let Err(at) = ordinals.binary_search(&ordinal) {
            ordinals.insert(at, ordinal);
        }
    }

    fn get(&self, token: &str) -> &[Ordinal] {
        self.postings.get(token).map(Vec::as_slice).unwrap_or(&[])
    }
}

type FieldIndexes = HashMap<String, FieldPostings>;

#[derive(Debug, Clone)]
struct TypeIndex {
    table: Arc<OrdinalTable>,
    fields: Arc<FieldIndexes>,
    state: TypeState,
    indexed_version: Option<u64>,
    /// Ordinals below this were seen by an earlier update
    scanned_count: usize,
}

impl TypeIndex {
    fn new(type_name: &str, config: &IndexConfig) -> Result<Self> {
        Ok(Self {
            table: Arc::new(OrdinalTable::new(type_name, config)?),
            fields: Arc::new(FieldIndexes::new()),
            state: TypeState::Uninitialized,
            indexed_version: None,
            scanned_count: 0,
        })
    }
}

/// Work computed from the store before any table is touched
struct StagedUpdate {
    mode: UpdateMode,
    scanned: usize,
    scanned_count: usize,
    bindings: Vec<(u64, Ordinal)>,
    field_postings: Vec<(String, Vec<(String, Ordinal)>)>,
}

/// Composite-key index over successive versions of a record store
#[derive(Debug)]
pub struct KeyIndex {
    catalog: Arc<SchemaCatalog>,
    registry: KeyRegistry,
    config: IndexConfig,
    types: HashMap<String, TypeIndex>,
}

impl KeyIndex {
    /// Create an index over the types in `catalog` with default sizing
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self {
            catalog,
            registry: KeyRegistry::new(),
            config: IndexConfig::default(),
            types: HashMap::new(),
        }
    }

    /// Create an index with explicit table sizing.
    ///
    /// Fails with `InvalidConfig` when `config` does not validate.
    pub fn with_config(catalog: Arc<SchemaCatalog>, config: IndexConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| KeyIndexError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            config,
            ..Self::new(catalog)
        })
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Declare the ordered key fields of a type.
    ///
    /// Re-declaring discards the type's table and field indexes, since their
    /// hashes were computed under the old field list.
    pub fn declare_key<I, S>(&mut self, type_name: &str, field_names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fresh = TypeIndex::new(type_name, &self.config)?;
        let replaced = self
            .registry
            .declare_key(&self.catalog, type_name, field_names)?;

        if let Some(previous) = self.types.insert(type_name.to_string(), fresh) {
            if previous.state == TypeState::Built {
                warn!(
                    type_name,
                    entries = previous.table.len(),
                    "key re-declared, discarding built table"
                );
            }
        }
        debug!(type_name, replaced = replaced.is_some(), "declared key");
        Ok(())
    }

    /// Allow single-field queries on `field`. Its postings are built by the
    /// next update; until then `query_field` fails with `FieldNotIndexed`.
    pub fn mark_queryable(&mut self, type_name: &str, field: &str) -> Result<()> {
        self.registry
            .mark_queryable(&self.catalog, type_name, field)?;
        Ok(())
    }

    pub fn state(&self, type_name: &str) -> Option<TypeState> {
        self.types.get(type_name).map(|t| t.state)
    }

    /// Store version the type was last updated from
    pub fn indexed_version(&self, type_name: &str) -> Option<u64> {
        self.types.get(type_name).and_then(|t| t.indexed_version)
    }

    /// Shared handle to the type's current table. Later updates replace the
    /// table rather than mutating a snapshot that is still held.
    pub fn table_snapshot(&self, type_name: &str) -> Option<Arc<OrdinalTable>> {
        self.types.get(type_name).map(|t| Arc::clone(&t.table))
    }

    /// Update every declared type from `store`.
    ///
    /// Types are updated independently. If any fail, the others stay
    /// committed and the failures are returned as `PartialUpdate`.
    #[instrument(skip(self, store), fields(version = store.version()))]
    pub fn update(&mut self, store: &dyn RecordStore, mode: UpdateMode) -> Result<UpdateSummary> {
        let type_names: Vec<String> = self
            .registry
            .declared_types()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut types = Vec::with_capacity(type_names.len());
        let mut failures = Vec::new();
        for type_name in type_names {
            match self.update_type(store, &type_name, mode) {
                Ok(update) => types.push(update),
                Err(error) => {
                    warn!(type_name = %type_name, %error, "type update failed, keeping previous table");
                    failures.push((type_name, error));
                }
            }
        }

        if failures.is_empty() {
            Ok(UpdateSummary {
                version: store.version(),
                types,
            })
        } else {
            Err(KeyIndexError::PartialUpdate(failures))
        }
    }

    /// Update one declared type from `store`. On error the type's previous
    /// table is left in place.
    pub fn update_type(
        &mut self,
        store: &dyn RecordStore,
        type_name: &str,
        mode: UpdateMode,
    ) -> Result<TypeUpdate> {
        let spec = self.registry.require(type_name)?;
        let current = self
            .types
            .get(type_name)
            .ok_or_else(|| KeyIndexError::UnregisteredType(type_name.to_string()))?;

        let staged = self.stage(store, spec, current, mode)?;
        let staged_count = staged.scanned_count;

        let entry = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| KeyIndexError::UnregisteredType(type_name.to_string()))?;
        let update = apply(entry, staged, type_name, &self.config)?;
        entry.state = TypeState::Built;
        entry.indexed_version = Some(store.version());
        entry.scanned_count = staged_count;

        debug!(
            type_name,
            mode = ?update.mode,
            scanned = update.scanned,
            inserted = update.inserted,
            duplicates = update.duplicates,
            capacity = update.capacity,
            "updated key index"
        );
        Ok(update)
    }

    /// Read and hash everything an update needs, without mutating anything
    fn stage(
        &self,
        store: &dyn RecordStore,
        spec: &KeyFieldSpec,
        current: &TypeIndex,
        mode: UpdateMode,
    ) -> Result<StagedUpdate> {
        let type_name = spec.type_name.as_str();
        let mode = match (mode, current.state) {
            (UpdateMode::Incremental, TypeState::Uninitialized) => UpdateMode::FullRebuild,
            (mode, _) => mode,
        };

        let ordinal_count = store.ordinal_count(type_name);
        let candidates = match mode {
            UpdateMode::FullRebuild => store.populated_ordinals(type_name),
            UpdateMode::Incremental => {
                if let Some(indexed) = current.indexed_version {
                    if store.version() > indexed + 1 {
                        debug!(
                            type_name,
                            indexed,
                            version = store.version(),
                            "skipped versions, scanning every unseen ordinal"
                        );
                    }
                }

                // Ordinals added by versions this index never saw sit above
                // the scanned mark even when they are missing from this delta.
                let mut added = store.added_ordinals(type_name);
                added.extend(
                    (current.scanned_count..ordinal_count)
                        .filter_map(|i| u32::try_from(i).ok())
                        .map(Ordinal),
                );
                added.sort_unstable();
                added.dedup();
                added.retain(|ordinal| store.is_populated(type_name, *ordinal));
                added
            }
        };

        let mut seen = HashSet::with_capacity(candidates.len());
        let mut bindings = Vec::new();
        for &ordinal in &candidates {
            let values = read_key(store, spec, ordinal)?;
            let hash = composite_hash(&values);
            let bound = mode == UpdateMode::Incremental && current.table.contains(hash);
            if !bound && seen.insert(hash) {
                bindings.push((hash, ordinal));
            }
        }

        let mut field_postings = Vec::new();
        for field in self.registry.queryable_fields(type_name) {
            let mut ordinals: Vec<Ordinal> = bindings.iter().map(|(_, ordinal)| *ordinal).collect();
            if mode == UpdateMode::Incremental && !current.fields.contains_key(field) {
                ordinals.extend(
                    current
                        .table
                        .ordinals()
                        .into_iter()
                        .filter(|ordinal| store.is_populated(type_name, *ordinal)),
                );
            }

            let mut postings = Vec::with_capacity(ordinals.len());
            for ordinal in ordinals {
                let value = store.field_value(type_name, ordinal, field)?;
                postings.push((format_field(&value), ordinal));
            }
            field_postings.push((field.to_string(), postings));
        }

        Ok(StagedUpdate {
            mode,
            scanned: candidates.len(),
            scanned_count: match mode {
                UpdateMode::FullRebuild => ordinal_count,
                UpdateMode::Incremental => current.scanned_count.max(ordinal_count),
            },
            bindings,
            field_postings,
        })
    }

    /// Bound ordinal for the key of the record at `ordinal`.
    ///
    /// The key is recomputed from the store. This is the record itself unless
    /// an earlier ordinal already carried the same key. `None` when the key
    /// has not been indexed.
    pub fn lookup_key_ordinal(
        &self,
        store: &dyn RecordStore,
        type_name: &str,
        ordinal: Ordinal,
    ) -> Result<Option<Ordinal>> {
        let spec = self.registry.require(type_name)?;
        let values = read_key(store, spec, ordinal)?;
        Ok(self.lookup_hash(type_name, composite_hash(&values)))
    }

    /// Display string of the key of the record at `ordinal`
    pub fn display_key(
        &self,
        store: &dyn RecordStore,
        type_name: &str,
        ordinal: Ordinal,
    ) -> Result<String> {
        let spec = self.registry.require(type_name)?;
        let values = read_key(store, spec, ordinal)?;
        Ok(hash::display_key(&values))
    }

    /// Bound ordinal for a composite key given in declaration order
    pub fn lookup_key(&self, type_name: &str, values: &[FieldValue]) -> Result<Option<Ordinal>> {
        let spec = self.registry.require(type_name)?;
        if values.len() != spec.arity() {
            return Err(KeyIndexError::KeyArity {
                type_name: type_name.to_string(),
                expected: spec.arity(),
                actual: values.len(),
            });
        }
        for (field, value) in spec.fields.iter().zip(values) {
            if !value.conforms_to(field.field_type) {
                return Err(KeyIndexError::FieldTypeMismatch {
                    type_name: type_name.to_string(),
                    field: field.name.clone(),
                    expected: field.field_type,
                });
            }
        }
        Ok(self.lookup_hash(type_name, composite_hash(values)))
    }

    /// Bound ordinal for a key in its display form (`2500.0:2500`)
    pub fn lookup_display_key(&self, type_name: &str, display: &str) -> Result<Option<Ordinal>> {
        let spec = self.registry.require(type_name)?;
        let tokens = split_key(display, spec.arity());
        if tokens.len() != spec.arity() {
            return Err(KeyIndexError::KeyArity {
                type_name: type_name.to_string(),
                expected: spec.arity(),
                actual: tokens.len(),
            });
        }
        let values = spec
            .fields
            .iter()
            .zip(tokens)
            .map(|(field, token)| FieldValue::parse(field.field_type, token))
            .collect::<Result<Vec<_>>>()?;
        self.lookup_key(type_name, &values)
    }

    /// Bound ordinals whose value for a queryable field matches `token`.
    ///
    /// Fails with `FieldNotIndexed` for a field marked since the type's last
    /// update, so an empty result always means no match.
    pub fn query_field(&self, type_name: &str, field: &str, token: &str) -> Result<Vec<Ordinal>> {
        self.registry.require(type_name)?;
        if !self.registry.is_queryable(type_name, field) {
            return Err(KeyIndexError::FieldNotQueryable {
                type_name: type_name.to_string(),
                field: field.to_string(),
            });
        }
        let def = self.catalog.require(type_name)?.require_field(field)?;
        let canonical = format_field(&FieldValue::parse(def.field_type, token)?);

        let postings = self
            .types
            .get(type_name)
            .and_then(|t| t.fields.get(field))
            .ok_or_else(|| KeyIndexError::FieldNotIndexed {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })?;
        Ok(postings.get(&canonical).to_vec())
    }

    fn lookup_hash(&self, type_name: &str, hash: u64) -> Option<Ordinal> {
        self.types
            .get(type_name)
            .and_then(|t| t.table.lookup_ordinal(hash))
    }
}

/// Key field values of one live record, in declaration order
fn read_key(store: &dyn RecordStore, spec: &KeyFieldSpec, ordinal: Ordinal) -> Result<Vec<FieldValue>> {
    let type_name = spec.type_name.as_str();
    if !store.is_populated(type_name, ordinal) {
        return Err(KeyIndexError::unknown_ordinal(type_name, ordinal));
    }
    spec.field_names()
        .map(|field| store.field_value(type_name, ordinal, field))
        .collect()
}

/// Commit staged work to one type. Fails only before the live table changes.
fn apply(
    entry: &mut TypeIndex,
    staged: StagedUpdate,
    type_name: &str,
    config: &IndexConfig,
) -> Result<TypeUpdate> {
    let StagedUpdate {
        mode,
        scanned,
        bindings,
        field_postings,
        ..
    } = staged;

    let rehashes_before;
    match mode {
        UpdateMode::FullRebuild => {
            let mut table = OrdinalTable::new(type_name, config)?;
            rehashes_before = 0;
            table.reserve(bindings.len())?;
            for &(hash, ordinal) in &bindings {
                table.insert_if_absent(hash, ordinal)?;
            }

            let mut fields = FieldIndexes::new();
            for (field, postings) in field_postings {
                let index = fields.entry(field).or_default();
                for (token, ordinal) in postings {
                    index.add(token, ordinal);
                }
            }

            entry.table = Arc::new(table);
            entry.fields = Arc::new(fields);
        }
        UpdateMode::Incremental => {
            rehashes_before = entry.table.rehash_count();
            entry.table.check_room(bindings.len())?;
            let table = Arc::make_mut(&mut entry.table);
            table.reserve(bindings.len())?;
            for &(hash, ordinal) in &bindings {
                table.insert_if_absent(hash, ordinal)?;
            }

            let fields = Arc::make_mut(&mut entry.fields);
            for (field, postings) in field_postings {
                let index = fields.entry(field).or_default();
                for (token, ordinal) in postings {
                    index.add(token, ordinal);
                }
            }
        }
    }

    Ok(TypeUpdate {
        type_name: type_name.to_string(),
        mode,
        scanned,
        inserted: bindings.len(),
        duplicates: scanned - bindings.len(),
        entries: entry.table.len(),
        capacity: entry.table.capacity(),
        rehashes: entry.table.rehash_count() - rehashes_before,
    })
}
