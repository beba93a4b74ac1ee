//! Repository trait for uniform CRUD over entity types

use crate::core::entity::Entity;
use crate::core::error::{EntityError, OutpostResult};
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Generic CRUD interface over a single entity type
///
/// Implementations carry no entity-specific logic. Mutating operations only
/// stage changes; nothing is durable until the owning unit of work commits.
pub trait Repository<T: Entity> {
    /// All committed entities of type `T`, in insertion order
    ///
    /// Each call takes a fresh snapshot, so the result can be restarted by
    /// calling again. Entities are deserialized as the iterator advances.
    fn get_all(&self) -> OutpostResult<EntityIter<T>>;

    /// Get a committed entity by ID
    ///
    /// Fails with `EntityError::NotFound` if no such entity exists.
    fn get_by_id(&self, id: &Uuid) -> OutpostResult<T>;

    /// Stage an add, assigning an identifier if the entity has none
    ///
    /// Returns the entity as it will appear after commit.
    fn add(&self, entity: T) -> OutpostResult<T>;

    /// Stage a replacement of an existing entity
    ///
    /// Fails with `EntityError::NotFound` if the identifier does not exist.
    fn update(&self, entity: T) -> OutpostResult<()>;

    /// Stage the removal of an entity
    ///
    /// Fails with `EntityError::NotFound` if the identifier does not exist.
    /// Relations pointing at the removed entity are left alone and report
    /// `NotFound` when they are next resolved.
    fn remove(&self, id: &Uuid) -> OutpostResult<()>;
}

/// Lazy iterator over a snapshot of entity JSON values
pub struct EntityIter<T> {
    snapshots: std::vec::IntoIter<Arc<Value>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntityIter<T> {
    pub(crate) fn new(snapshots: Vec<Arc<Value>>) -> Self {
        Self {
            snapshots: snapshots.into_iter(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Iterator for EntityIter<T> {
    type Item = OutpostResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let snapshot = self.snapshots.next()?;
        Some(
            T::deserialize(snapshot.as_ref())
                .map_err(|e| EntityError::serialization(T::resource_name_singular(), e).into()),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.snapshots.size_hint()
    }
}

impl<T: Entity> ExactSizeIterator for EntityIter<T> {}
