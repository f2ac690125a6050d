//! Service layer.
//!
//! Orchestration between the HTTP boundary, the local store, the pool
//! manager and the adapters.

pub mod database;
pub mod format;
pub mod query;
pub mod startup;

pub use database::DatabaseService;
pub use query::QueryService;
