//! Entity trait defining the core abstraction for all persisted record types

use crate::core::relation::EntityReference;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Base trait for all entities in the system.
///
/// An entity is any persisted record with a unique identifier. The identifier
/// is optional until the entity is first added to a store, at which point the
/// repository assigns one if the caller did not; it never changes afterwards.
///
/// Entities are stored as JSON snapshots, hence the serde bounds.
/// Most entity types are declared with [`impl_entity!`](crate::impl_entity).
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The plural resource name (e.g., "agents", "tasks")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "agent", "task"), also the collection key
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier, if one has been assigned
    fn id(&self) -> Option<Uuid>;

    /// Assign the identifier
    fn set_id(&mut self, id: Uuid);

    /// Typed reference to this entity, if it has an identifier
    fn reference(&self) -> Option<EntityReference> {
        self.id()
            .map(|id| EntityReference::new(id, Self::resource_name_singular()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct TestEntity {
        id: Option<Uuid>,
        label: String,
    }

    impl Entity for TestEntity {
        fn resource_name() -> &'static str {
            "test_entities"
        }

        fn resource_name_singular() -> &'static str {
            "test_entity"
        }

        fn id(&self) -> Option<Uuid> {
            self.id
        }

        fn set_id(&mut self, id: Uuid) {
            self.id = Some(id);
        }
    }

    #[test]
    fn test_entity_metadata() {
        assert_eq!(TestEntity::resource_name(), "test_entities");
        assert_eq!(TestEntity::resource_name_singular(), "test_entity");
    }

    #[test]
    fn test_reference_requires_identifier() {
        let mut entity = TestEntity {
            id: None,
            label: "beacon".to_string(),
        };
        assert!(entity.reference().is_none());

        let id = Uuid::new_v4();
        entity.set_id(id);
        let reference = entity.reference().unwrap();
        assert_eq!(reference.id, id);
        assert_eq!(reference.entity_type, "test_entity");
    }
}
