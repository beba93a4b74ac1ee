//! Macros for reducing boilerplate when defining entities

/// Declare an entity struct with an optional `id` and the [`Entity`] impl
///
/// The generated struct derives `Debug`, `Clone`, `PartialEq`, `Serialize`
/// and `Deserialize`, so every field type must too. Relations to other
/// entities are declared as [`Relation<T>`] fields.
///
/// [`Entity`]: crate::core::entity::Entity
/// [`Relation<T>`]: crate::core::relation::Relation
///
/// # Example
///
/// ```rust,ignore
/// use outpost::prelude::*;
///
/// impl_entity!(Agent, "agent", "agents", {
///     hostname: String,
///     platform: String,
/// });
///
/// impl_entity!(Task, "task", "tasks", {
///     command: String,
///     agent: Relation<Agent>,
/// });
///
/// let agent = Agent::new("ws-01".to_string(), "linux".to_string());
/// assert!(agent.id.is_none());
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident,
        $singular:expr,
        $plural:expr,
        {
            $( $(#[$field_meta:meta])* $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Unique identifier, assigned on first add
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub id: Option<::uuid::Uuid>,
            $( $(#[$field_meta])* pub $field : $field_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> Option<::uuid::Uuid> {
                self.id
            }

            fn set_id(&mut self, id: ::uuid::Uuid) {
                self.id = Some(id);
            }
        }

        impl $type {
            /// Create a new instance without an identifier
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: $field_type ),*) -> Self {
                Self {
                    id: None,
                    $( $field ),*
                }
            }

            /// Set an explicit identifier before the first add
            pub fn with_id(mut self, id: ::uuid::Uuid) -> Self {
                self.id = Some(id);
                self
            }
        }
    };
}
