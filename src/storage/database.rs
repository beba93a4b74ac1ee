//! Process-wide in-memory collections backing every unit of work

use crate::core::error::{CommitError, OutpostResult, StorageError};
use crate::storage::unit_of_work::{
    CommitSummary, EntityStore, PendingMutation, RequestCancellation,
};
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use uuid::Uuid;

/// One entity type's committed snapshots, in insertion order
pub(crate) type Collection = IndexMap<Uuid, Arc<Value>>;

type SharedCollection = Arc<RwLock<Collection>>;

/// Shared in-memory database and factory for [`EntityStore`]s
///
/// Holds one collection per entity type, each behind its own `RwLock`. Reads
/// take a short read lock to snapshot; commits take the write locks of every
/// touched collection, so at most one commit writes a given type at a time.
/// Every commit that applies mutations advances the generation.
/// Cloning is cheap and shares the same collections.
#[derive(Clone, Default)]
pub struct Database {
    collections: Arc<RwLock<HashMap<&'static str, SharedCollection>>>,
    generation: Arc<AtomicU64>,
}

impl Database {
    /// Create a new empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new unit of work against this database
    pub fn begin(&self) -> EntityStore {
        EntityStore::new(self.clone())
    }

    /// Number of committed entities of the given type
    pub fn count(&self, entity_type: &'static str) -> OutpostResult<usize> {
        match self.existing(entity_type)? {
            Some(collection) => Ok(collection
                .read()
                .map_err(|_| StorageError::poisoned(entity_type))?
                .len()),
            None => Ok(0),
        }
    }

    /// Number of commits that have applied mutations
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Names of all collections that have been touched
    pub fn entity_types(&self) -> OutpostResult<Vec<&'static str>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StorageError::poisoned("<catalog>"))?;
        let mut names: Vec<&'static str> = collections.keys().copied().collect();
        names.sort_unstable();
        Ok(names)
    }

    pub(crate) fn snapshot(&self, entity_type: &'static str) -> OutpostResult<Vec<Arc<Value>>> {
        match self.existing(entity_type)? {
            Some(collection) => Ok(collection
                .read()
                .map_err(|_| StorageError::poisoned(entity_type))?
                .values()
                .cloned()
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    pub(crate) fn fetch(
        &self,
        entity_type: &'static str,
        id: &Uuid,
    ) -> OutpostResult<Option<Arc<Value>>> {
        match self.existing(entity_type)? {
            Some(collection) => Ok(collection
                .read()
                .map_err(|_| StorageError::poisoned(entity_type))?
                .get(id)
                .cloned()),
            None => Ok(None),
        }
    }

    pub(crate) fn contains(&self, entity_type: &'static str, id: &Uuid) -> OutpostResult<bool> {
        Ok(self.fetch(entity_type, id)?.is_some())
    }

    /// Apply a unit of work atomically
    ///
    /// Locks every touched collection in name order, re-checks each
    /// mutation's precondition in staging order, and only then applies them.
    /// On any failure no collection is modified.
    pub(crate) fn apply(
        &self,
        mutations: &[PendingMutation],
        cancellation: &RequestCancellation,
    ) -> OutpostResult<CommitSummary> {
        let mut summary = CommitSummary::empty();
        if mutations.is_empty() {
            return Ok(summary);
        }

        // BTreeMap gives a global lock order across concurrent commits.
        let mut handles: BTreeMap<&'static str, SharedCollection> = BTreeMap::new();
        for mutation in mutations {
            let entity_type = mutation.entity_type();
            if !handles.contains_key(entity_type) {
                handles.insert(entity_type, self.collection(entity_type)?);
            }
        }

        let mut guards: HashMap<&'static str, RwLockWriteGuard<'_, Collection>> =
            HashMap::with_capacity(handles.len());
        for (entity_type, handle) in &handles {
            let guard = handle
                .write()
                .map_err(|_| StorageError::poisoned(entity_type))?;
            guards.insert(*entity_type, guard);
        }

        if cancellation.is_cancelled() {
            return Err(CommitError::Cancelled {
                pending: mutations.len(),
            }
            .into());
        }

        // Existence of ids as seen by the mutations staged so far.
        let mut overlay: HashMap<(&'static str, Uuid), bool> = HashMap::new();
        for mutation in mutations {
            let key = (mutation.entity_type(), mutation.id());
            let exists = match overlay.get(&key) {
                Some(exists) => *exists,
                None => guards
                    .get(key.0)
                    .is_some_and(|collection| collection.contains_key(&key.1)),
            };

            match mutation {
                PendingMutation::Add { .. } if exists => {
                    return Err(CommitError::DuplicateIdentifier {
                        entity_type: key.0.to_string(),
                        id: key.1,
                    }
                    .into());
                }
                PendingMutation::Update { .. } | PendingMutation::Remove { .. } if !exists => {
                    return Err(CommitError::StaleIdentifier {
                        entity_type: key.0.to_string(),
                        id: key.1,
                        operation: mutation.operation().to_string(),
                    }
                    .into());
                }
                _ => {}
            }

            overlay.insert(key, !matches!(mutation, PendingMutation::Remove { .. }));
        }

        if cancellation.is_cancelled() {
            return Err(CommitError::Cancelled {
                pending: mutations.len(),
            }
            .into());
        }

        for mutation in mutations {
            let Some(collection) = guards.get_mut(mutation.entity_type()) else {
                continue;
            };
            match mutation {
                PendingMutation::Add { id, snapshot, .. } => {
                    collection.insert(*id, Arc::clone(snapshot));
                    summary.added += 1;
                }
                PendingMutation::Update { id, snapshot, .. } => {
                    // IndexMap::insert keeps the position of an existing key
                    collection.insert(*id, Arc::clone(snapshot));
                    summary.updated += 1;
                }
                PendingMutation::Remove { id, .. } => {
                    collection.shift_remove(id);
                    summary.removed += 1;
                }
            }
        }

        // Advanced while the write locks are held.
        self.generation.fetch_add(1, Ordering::AcqRel);

        summary.committed_at = Utc::now();
        Ok(summary)
    }

    fn existing(&self, entity_type: &'static str) -> OutpostResult<Option<SharedCollection>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StorageError::poisoned("<catalog>"))?;
        Ok(collections.get(entity_type).cloned())
    }

    fn collection(&self, entity_type: &'static str) -> OutpostResult<SharedCollection> {
        if let Some(collection) = self.existing(entity_type)? {
            return Ok(collection);
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StorageError::poisoned("<catalog>"))?;
        Ok(collections.entry(entity_type).or_default().clone())
    }
}
