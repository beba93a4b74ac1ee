//! ServerBuilder, the composition root of the process

use super::entity_registry::EntityRegistry;
use super::host::ServerHost;
use crate::config::{AppConfig, Environment};
use crate::core::entity::Entity;
use crate::core::error::OutpostResult;
use crate::cors::CorsPolicyResolver;
use crate::storage::Database;

/// Builder wiring configuration, storage and entity types into a [`ServerHost`]
///
/// # Example
///
/// ```ignore
/// let host = ServerBuilder::new()
///     .with_config(AppConfig::from_yaml_file("outpost.yaml")?)
///     .register_entity::<Agent>()
///     .register_entity::<Task>()
///     .build_host()?;
/// ```
pub struct ServerBuilder {
    database: Option<Database>,
    config: AppConfig,
    environment: Option<Environment>,
    entity_registry: EntityRegistry,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            database: None,
            config: AppConfig::default(),
            environment: None,
            entity_registry: EntityRegistry::new(),
        }
    }

    /// Share an existing database instead of creating an empty one
    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Force the environment, bypassing `OUTPOST_ENV` and the configuration file
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Register an entity type for lookup by name
    pub fn register_entity<T: Entity>(mut self) -> Self {
        self.entity_registry.register::<T>();
        self
    }

    /// Build the transport-agnostic host
    ///
    /// Fails when the environment name is unknown, a configured origin is
    /// invalid, or production has no allowed origins. The process must not
    /// start in any of these cases.
    pub fn build_host(self) -> OutpostResult<ServerHost> {
        let environment = match self.environment {
            Some(environment) => environment,
            None => self.config.resolve_environment()?,
        };

        let cors = CorsPolicyResolver::new(environment, self.config.cors)?;
        let database = self.database.unwrap_or_default();

        tracing::info!(
            environment = %environment,
            entity_types = ?self.entity_registry.entity_types(),
            policies = cors.registry().len(),
            "Server host built"
        );

        Ok(ServerHost::from_builder_components(
            database,
            self.entity_registry,
            cors,
        ))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
