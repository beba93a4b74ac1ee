//! [`Repository`] implementation over an [`EntityStore`]

use crate::core::entity::Entity;
use crate::core::error::{EntityError, OutpostResult};
use crate::core::repository::{EntityIter, Repository};
use crate::storage::unit_of_work::{EntityStore, PendingMutation};
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Typed repository bound to one unit of work
///
/// Obtained from [`EntityStore::repository`]. Several repositories, of the
/// same or different types, can borrow the same store at once.
pub struct StoreRepository<'s, T> {
    store: &'s EntityStore,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T: Entity> StoreRepository<'s, T> {
    pub(crate) fn new(store: &'s EntityStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// The unit of work this repository stages into
    pub fn store(&self) -> &'s EntityStore {
        self.store
    }

    fn entity_type() -> &'static str {
        T::resource_name_singular()
    }

    fn snapshot(entity: &T) -> OutpostResult<Arc<Value>> {
        serde_json::to_value(entity)
            .map(Arc::new)
            .map_err(|e| EntityError::serialization(Self::entity_type(), e).into())
    }

    fn require_id(entity: &T) -> OutpostResult<Uuid> {
        entity.id().ok_or_else(|| {
            EntityError::MissingIdentifier {
                entity_type: Self::entity_type().to_string(),
            }
            .into()
        })
    }
}

impl<T: Entity> Repository<T> for StoreRepository<'_, T> {
    fn get_all(&self) -> OutpostResult<EntityIter<T>> {
        let snapshots = self.store.database().snapshot(Self::entity_type())?;
        Ok(EntityIter::new(snapshots))
    }

    fn get_by_id(&self, id: &Uuid) -> OutpostResult<T> {
        let snapshot = self
            .store
            .database()
            .fetch(Self::entity_type(), id)?
            .ok_or_else(|| EntityError::not_found(Self::entity_type(), *id))?;

        T::deserialize(snapshot.as_ref())
            .map_err(|e| EntityError::serialization(Self::entity_type(), e).into())
    }

    fn add(&self, mut entity: T) -> OutpostResult<T> {
        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                entity.set_id(id);
                id
            }
        };

        if self.store.exists(Self::entity_type(), &id)? {
            return Err(EntityError::AlreadyExists {
                entity_type: Self::entity_type().to_string(),
                id,
            }
            .into());
        }

        self.store.stage(PendingMutation::Add {
            entity_type: Self::entity_type(),
            id,
            snapshot: Self::snapshot(&entity)?,
        });
        tracing::debug!(entity_type = Self::entity_type(), id = %id, "Staged add");

        Ok(entity)
    }

    fn update(&self, entity: T) -> OutpostResult<()> {
        let id = Self::require_id(&entity)?;
        if !self.store.exists(Self::entity_type(), &id)? {
            return Err(EntityError::not_found(Self::entity_type(), id).into());
        }

        self.store.stage(PendingMutation::Update {
            entity_type: Self::entity_type(),
            id,
            snapshot: Self::snapshot(&entity)?,
        });
        tracing::debug!(entity_type = Self::entity_type(), id = %id, "Staged update");

        Ok(())
    }

    fn remove(&self, id: &Uuid) -> OutpostResult<()> {
        if !self.store.exists(Self::entity_type(), id)? {
            return Err(EntityError::not_found(Self::entity_type(), *id).into());
        }

        self.store.stage(PendingMutation::Remove {
            entity_type: Self::entity_type(),
            id: *id,
        });
        tracing::debug!(entity_type = Self::entity_type(), id = %id, "Staged remove");

        Ok(())
    }
}
