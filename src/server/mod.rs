//! Server composition: the builder, the host it produces, and name-based
//! repository lookup for the hosting layer

pub mod builder;
pub mod entity_registry;
pub mod host;

pub use builder::ServerBuilder;
pub use entity_registry::{EntityDescriptor, EntityRegistry, TypedDescriptor};
pub use host::ServerHost;
