//! Lazily resolved references between entities
//!
//! A [`Relation<T>`] starts out holding only the target's identifier. The
//! first call to [`Relation::load`] fetches the target from a
//! [`RelationSource`] (an `EntityStore` or a deserialized `EntityGraph`) and
//! memoizes it together with the source's [`SourceVersion`]. Later loads from
//! the same source at the same version return the memo without fetching; any
//! other source, or the same source after it changed, fetches again.
//!
//! Relations always serialize as a back-reference token (`{"$ref": "<id>"}`),
//! never by inlining the target, so entity graphs with cycles stay finite.

use crate::core::entity::Entity;
use crate::core::error::{EntityError, OutpostResult};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Key used for back-reference tokens
pub const REF_KEY: &str = "$ref";

/// Reference to an entity instance by type and identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EntityReference {
    /// The unique ID of the entity
    pub id: Uuid,

    /// The singular type name of the entity (e.g., "agent", "task")
    pub entity_type: String,
}

impl EntityReference {
    /// Create a new entity reference
    pub fn new(id: Uuid, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate an identifier for a new relation source instance
pub fn next_source_id() -> u64 {
    NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Which source instance, at which state, a memoized target came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceVersion {
    pub source: u64,
    pub generation: u64,
}

impl SourceVersion {
    /// Version of targets attached by hand; no source ever reports it
    pub const DETACHED: SourceVersion = SourceVersion {
        source: 0,
        generation: 0,
    };

    pub fn new(source: u64, generation: u64) -> Self {
        Self { source, generation }
    }
}

/// Anything relations can be materialized from
pub trait RelationSource {
    /// Fetch the entity of type `T` with the given id.
    ///
    /// Returns `EntityError::NotFound` when the target does not exist.
    fn fetch<T: Entity>(&self, id: &Uuid) -> OutpostResult<T>;

    /// Current version of this source
    ///
    /// Must change whenever a previously fetched target may have changed.
    fn version(&self) -> SourceVersion;
}

struct Memo<T> {
    version: SourceVersion,
    target: Arc<T>,
}

/// A lazily resolved reference to an entity of type `T`
pub struct Relation<T> {
    id: Uuid,
    memo: Mutex<Option<Memo<T>>>,
    _target: PhantomData<fn() -> T>,
}

impl<T> Relation<T> {
    /// Create an unresolved relation pointing at `id`
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            memo: Mutex::new(None),
            _target: PhantomData,
        }
    }

    /// Identifier of the target entity
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether a target is memoized, from any source
    pub fn is_resolved(&self) -> bool {
        self.memo().is_some()
    }

    /// Whether the memo is current for `source`, so `load` would not fetch
    pub fn is_resolved_in<S: RelationSource>(&self, source: &S) -> bool {
        let version = source.version();
        self.memo().as_ref().is_some_and(|memo| memo.version == version)
    }

    /// The memoized target, if any
    pub fn get(&self) -> Option<Arc<T>> {
        self.memo().as_ref().map(|memo| Arc::clone(&memo.target))
    }

    /// Drop the memoized target so the next `load` fetches again
    pub fn reset(&self) {
        self.memo().take();
    }

    fn memo(&self) -> MutexGuard<'_, Option<Memo<T>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Entity> Relation<T> {
    /// Create an unresolved relation to an entity that already has an id
    pub fn to(entity: &T) -> OutpostResult<Self> {
        let id = entity.id().ok_or_else(|| EntityError::MissingIdentifier {
            entity_type: T::resource_name_singular().to_string(),
        })?;
        Ok(Self::new(id))
    }

    /// Create a relation holding `entity` in memory
    ///
    /// The held target is not tied to any source: the first `load` still
    /// fetches.
    pub fn resolved(entity: T) -> OutpostResult<Self> {
        let relation = Self::to(&entity)?;
        *relation.memo() = Some(Memo {
            version: SourceVersion::DETACHED,
            target: Arc::new(entity),
        });
        Ok(relation)
    }

    /// Typed reference to the target
    pub fn reference(&self) -> EntityReference {
        EntityReference::new(self.id, T::resource_name_singular())
    }

    /// Resolve the target, fetching it from `source` unless the memo is
    /// current for that source
    ///
    /// A failed fetch clears the memo.
    pub fn load<S: RelationSource>(&self, source: &S) -> OutpostResult<Arc<T>> {
        let version = source.version();
        if let Some(memo) = self.memo().as_ref().filter(|memo| memo.version == version) {
            return Ok(Arc::clone(&memo.target));
        }

        match source.fetch::<T>(&self.id) {
            Ok(entity) => {
                let target = Arc::new(entity);
                *self.memo() = Some(Memo {
                    version,
                    target: Arc::clone(&target),
                });
                Ok(target)
            }
            Err(err) => {
                self.memo().take();
                Err(err)
            }
        }
    }
}

impl<T> Clone for Relation<T> {
    fn clone(&self) -> Self {
        let memo = self.memo().as_ref().map(|memo| Memo {
            version: memo.version,
            target: Arc::clone(&memo.target),
        });
        Self {
            id: self.id,
            memo: Mutex::new(memo),
            _target: PhantomData,
        }
    }
}

// Two relations are equal when they point at the same target, resolved or not.
impl<T> PartialEq for Relation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Relation<T> {}

impl<T> fmt::Debug for Relation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("id", &self.id)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T> Serialize for Relation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(REF_KEY, &self.id)?;
        map.end()
    }
}

impl<'de, T> Deserialize<'de> for Relation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Reference {
                #[serde(rename = "$ref")]
                id: Uuid,
            },
            Bare(Uuid),
        }

        let id = match Repr::deserialize(deserializer)? {
            Repr::Reference { id } | Repr::Bare(id) => id,
        };
        Ok(Relation::new(id))
    }
}
