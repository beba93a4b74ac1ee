//! Request-scoped unit of work over the shared [`Database`]

use crate::core::entity::Entity;
use crate::core::error::{EntityError, OutpostResult};
use crate::core::relation::{Relation, RelationSource, SourceVersion, next_source_id};
use crate::storage::database::Database;
use crate::storage::repository::StoreRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Cancellation signal shared between a request and its unit of work
#[derive(Clone, Debug, Default)]
pub struct RequestCancellation {
    cancelled: Arc<AtomicBool>,
}

impl RequestCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation; any commit that has not yet applied will abort
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A staged change, applied only on commit
#[derive(Debug, Clone)]
pub(crate) enum PendingMutation {
    Add {
        entity_type: &'static str,
        id: Uuid,
        snapshot: Arc<Value>,
    },
    Update {
        entity_type: &'static str,
        id: Uuid,
        snapshot: Arc<Value>,
    },
    Remove {
        entity_type: &'static str,
        id: Uuid,
    },
}

impl PendingMutation {
    pub(crate) fn entity_type(&self) -> &'static str {
        match self {
            PendingMutation::Add { entity_type, .. }
            | PendingMutation::Update { entity_type, .. }
            | PendingMutation::Remove { entity_type, .. } => entity_type,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        match self {
            PendingMutation::Add { id, .. }
            | PendingMutation::Update { id, .. }
            | PendingMutation::Remove { id, .. } => *id,
        }
    }

    pub(crate) fn operation(&self) -> &'static str {
        match self {
            PendingMutation::Add { .. } => "add",
            PendingMutation::Update { .. } => "update",
            PendingMutation::Remove { .. } => "remove",
        }
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub committed_at: DateTime<Utc>,
}

impl CommitSummary {
    pub(crate) fn empty() -> Self {
        Self {
            added: 0,
            updated: 0,
            removed: 0,
            committed_at: Utc::now(),
        }
    }

    /// Total number of applied mutations
    pub fn total(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

/// Relation targets fetched at one database generation
#[derive(Default)]
struct ResolvedCache {
    generation: u64,
    targets: HashMap<(&'static str, Uuid), Arc<Value>>,
}

/// Per-request unit of work
///
/// Tracks pending mutations for every entity type and caches relation
/// targets it has materialized. Cached targets, and relation memos made
/// through this store, stay valid until any commit changes the database. A store belongs to one request: it is `Send`
/// but not `Sync`, and uses no locks of its own. Only [`EntityStore::commit`]
/// touches the shared collections for writing.
///
/// # Example
///
/// ```rust,ignore
/// let store = database.begin();
/// let agents = store.repository::<Agent>();
/// let agent = agents.add(Agent::new("ws-01".into()))?;
/// store.commit()?;
/// assert_eq!(agents.get_by_id(&agent.id.unwrap())?, agent);
/// ```
pub struct EntityStore {
    source: u64,
    database: Database,
    pending: RefCell<Vec<PendingMutation>>,
    resolved: RefCell<ResolvedCache>,
    cancellation: RequestCancellation,
}

impl EntityStore {
    /// Create a unit of work against `database`
    pub fn new(database: Database) -> Self {
        Self {
            source: next_source_id(),
            database,
            pending: RefCell::new(Vec::new()),
            resolved: RefCell::new(ResolvedCache::default()),
            cancellation: RequestCancellation::new(),
        }
    }

    /// Bind the request's cancellation signal
    pub fn with_cancellation(mut self, cancellation: RequestCancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Typed repository for `T` over this unit of work
    pub fn repository<T: Entity>(&self) -> StoreRepository<'_, T> {
        StoreRepository::new(self)
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Number of staged mutations
    pub fn pending_changes(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Drop every staged mutation without applying it
    pub fn discard_changes(&self) {
        let discarded = self.pending.take().len();
        if discarded > 0 {
            tracing::debug!(discarded, "Discarded pending mutations");
        }
    }

    /// Apply all pending mutations atomically
    ///
    /// On success the pending set is cleared and cached relation targets for
    /// the touched identifiers are invalidated. On failure nothing is applied
    /// and the pending set is discarded; the caller may retry with fresh data.
    pub fn commit(&self) -> OutpostResult<CommitSummary> {
        let mutations = self.pending.take();

        match self.database.apply(&mutations, &self.cancellation) {
            Ok(summary) => {
                let mut resolved = self.resolved.borrow_mut();
                for mutation in &mutations {
                    resolved
                        .targets
                        .remove(&(mutation.entity_type(), mutation.id()));
                }
                tracing::debug!(
                    added = summary.added,
                    updated = summary.updated,
                    removed = summary.removed,
                    "Unit of work committed"
                );
                Ok(summary)
            }
            Err(err) => {
                tracing::warn!(
                    pending = mutations.len(),
                    error = %err,
                    "Unit of work aborted"
                );
                Err(err)
            }
        }
    }

    /// Materialize a relation's target, memoizing it in the relation
    ///
    /// A memo made by another store, or before a commit that changed the
    /// database, is ignored and the target is fetched again.
    pub fn resolve<T: Entity>(&self, relation: &Relation<T>) -> OutpostResult<Arc<T>> {
        relation.load(self)
    }

    pub(crate) fn stage(&self, mutation: PendingMutation) {
        self.pending.borrow_mut().push(mutation);
    }

    /// Whether `id` exists once this unit's staged mutations are taken into account
    pub(crate) fn exists(&self, entity_type: &'static str, id: &Uuid) -> OutpostResult<bool> {
        let staged = self
            .pending
            .borrow()
            .iter()
            .rev()
            .find(|m| m.entity_type() == entity_type && m.id() == *id)
            .map(|m| !matches!(m, PendingMutation::Remove { .. }));

        match staged {
            Some(exists) => Ok(exists),
            None => self.database.contains(entity_type, id),
        }
    }
}

impl RelationSource for EntityStore {
    fn fetch<T: Entity>(&self, id: &Uuid) -> OutpostResult<T> {
        let key = (T::resource_name_singular(), *id);
        let generation = self.database.generation();

        let cached = {
            let mut resolved = self.resolved.borrow_mut();
            if resolved.generation != generation {
                resolved.targets.clear();
                resolved.generation = generation;
            }
            resolved.targets.get(&key).cloned()
        };
        let snapshot = match cached {
            Some(snapshot) => snapshot,
            None => {
                let snapshot = self
                    .database
                    .fetch(key.0, id)?
                    .ok_or_else(|| EntityError::not_found(key.0, *id))?;
                tracing::debug!(entity_type = key.0, id = %id, "Resolved relation");
                self.resolved
                    .borrow_mut()
                    .targets
                    .insert(key, Arc::clone(&snapshot));
                snapshot
            }
        };

        T::deserialize(snapshot.as_ref()).map_err(|e| EntityError::serialization(key.0, e).into())
    }

    fn version(&self) -> SourceVersion {
        SourceVersion::new(self.source, self.database.generation())
    }
}
