//! Core module containing the entity abstraction, relations and errors

pub mod entity;
pub mod error;
pub mod graph;
pub mod relation;
pub mod repository;

pub use entity::Entity;
pub use error::{OutpostError, OutpostResult};
pub use graph::EntityGraph;
pub use relation::{EntityReference, Relation, RelationSource, SourceVersion};
pub use repository::{EntityIter, Repository};
