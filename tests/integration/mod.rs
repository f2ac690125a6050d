//! Integration tests for db-scout.

pub mod connection_test;
pub mod metadata_test;
pub mod nl_query_test;
pub mod query_test;
