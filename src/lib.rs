//! # Outpost Core
//!
//! Data-access and cross-origin access-control core of a small
//! command-and-control API server.
//!
//! ## Features
//!
//! - **Generic repositories**: uniform add/get/update/remove over any entity type
//! - **Unit of work**: per-request [`EntityStore`](storage::EntityStore) with atomic commit
//! - **Lazy relations**: [`Relation<T>`](core::relation::Relation) resolved on first access
//! - **Reference-preserving graphs**: shared and cyclic references serialized once
//! - **Environment-aware CORS**: three named policies resolved per environment
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use outpost::prelude::*;
//!
//! impl_entity!(Agent, "agent", "agents", {
//!     hostname: String,
//! });
//!
//! impl_entity!(Task, "task", "tasks", {
//!     command: String,
//!     agent: Relation<Agent>,
//! });
//!
//! let host = ServerBuilder::new()
//!     .with_config(AppConfig::from_yaml_file("outpost.yaml")?)
//!     .register_entity::<Agent>()
//!     .register_entity::<Task>()
//!     .build_host()?;
//!
//! let store = host.begin_request();
//! let agent = store.repository::<Agent>().add(Agent::new("ws-01".to_string()))?;
//! store
//!     .repository::<Task>()
//!     .add(Task::new("whoami".to_string(), Relation::to(&agent)?))?;
//! store.commit()?;
//!
//! let decision = host.cors_decision(PolicyName::MinimalRead)?;
//! ```

pub mod config;
pub mod core;
pub mod cors;
pub mod entities;
pub mod logging;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        entity::Entity,
        error::{
            CommitError, ConfigError, EntityError, ErrorResponse, OutpostError, OutpostResult,
            StorageError,
        },
        graph::EntityGraph,
        relation::{EntityReference, Relation, RelationSource, SourceVersion},
        repository::{EntityIter, Repository},
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Storage ===
    pub use crate::storage::{
        CommitSummary, Database, EntityStore, RequestCancellation, StoreRepository,
    };

    // === Config ===
    pub use crate::config::{AppConfig, CorsConfig, Environment};

    // === CORS ===
    pub use crate::cors::{CorsDecision, CorsPolicy, CorsPolicyResolver, PolicyName, PolicyRegistry};

    // === Logging ===
    pub use crate::logging::{LogConfig, LogFormat, init_logging};

    // === Server ===
    pub use crate::server::{EntityDescriptor, EntityRegistry, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
