//! Server host holding the process-wide state
//!
//! The host is transport-agnostic: it hands out a fresh unit of work per
//! request, looks up repositories by entity type name, and answers CORS
//! questions for a policy name. The hosting layer owns routing.

use crate::config::Environment;
use crate::core::error::{EntityError, OutpostResult};
use crate::cors::{CorsDecision, CorsPolicyResolver, PolicyName};
use crate::server::entity_registry::{EntityDescriptor, EntityRegistry};
use crate::storage::{Database, EntityStore, RequestCancellation};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Host context containing all framework state
///
/// Cheap to clone; clones share the database and the CORS configuration.
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerBuilder::new()
///     .with_config(AppConfig::from_yaml_file("outpost.yaml")?)
///     .register_entity::<Agent>()
///     .build_host()?;
///
/// let store = host.begin_request();
/// let agents: Vec<Agent> = store.repository::<Agent>().get_all()?.collect::<Result<_, _>>()?;
/// ```
#[derive(Clone)]
pub struct ServerHost {
    /// Backing collections shared by every request
    pub database: Database,

    /// Entity registry for lookup by name
    pub entity_registry: Arc<EntityRegistry>,

    /// Live CORS policy resolver
    pub cors: Arc<CorsPolicyResolver>,
}

impl ServerHost {
    /// Assemble the host from already validated components
    pub fn from_builder_components(
        database: Database,
        entity_registry: EntityRegistry,
        cors: CorsPolicyResolver,
    ) -> Self {
        Self {
            database,
            entity_registry: Arc::new(entity_registry),
            cors: Arc::new(cors),
        }
    }

    pub fn environment(&self) -> Environment {
        self.cors.environment()
    }

    /// A fresh unit of work for one request
    pub fn begin_request(&self) -> EntityStore {
        self.database.begin()
    }

    /// A fresh unit of work that observes the request's cancellation
    pub fn begin_cancellable_request(&self, cancellation: RequestCancellation) -> EntityStore {
        self.database.begin().with_cancellation(cancellation)
    }

    /// Repository operations for an entity type, by singular or plural name
    ///
    /// An unknown name is reported as a missing resource.
    pub fn repository(&self, name: &str) -> OutpostResult<Arc<dyn EntityDescriptor>> {
        self.entity_registry.get(name).ok_or_else(|| {
            EntityError::UnknownType {
                entity_type: name.to_string(),
            }
            .into()
        })
    }

    /// Get entity types registered in the host
    pub fn entity_types(&self) -> Vec<&'static str> {
        self.entity_registry.entity_types()
    }

    /// Check if host has any entity type to serve
    pub fn is_ready(&self) -> bool {
        !self.entity_registry.is_empty()
    }

    /// CORS decision for an endpoint class under the current configuration
    pub fn cors_decision(&self, policy: PolicyName) -> OutpostResult<CorsDecision> {
        self.cors.resolve(policy)
    }

    /// CORS layer for an endpoint class
    pub fn cors_layer(&self, policy: PolicyName) -> OutpostResult<CorsLayer> {
        self.cors.layer(policy)
    }
}
