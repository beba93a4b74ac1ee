//! Environment-aware cross-origin policies
//!
//! Three named policies are registered at startup. Each combines a fixed set
//! of headers and methods with the shared origin rule in [`origin`]; the
//! [`CorsPolicyResolver`] turns a policy name into a [`CorsDecision`] or a
//! `tower_http` layer for the router.

pub mod origin;
pub mod policy;
pub mod resolver;

pub use origin::{environment_origins, normalize_origin, origins_match};
pub use policy::{CorsPolicy, DEFAULT_ALLOWED_HEADERS, PolicyName, PolicyRegistry};
pub use resolver::{CorsDecision, CorsPolicyResolver};
