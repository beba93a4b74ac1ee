//! In-memory storage: the shared database and request-scoped units of work

pub mod database;
pub mod repository;
pub mod unit_of_work;

pub use database::Database;
pub use repository::StoreRepository;
pub use unit_of_work::{CommitSummary, EntityStore, RequestCancellation};
