//! db-scout - a read-only SQL exploration service with an HTTP API.
//!
//! This library exposes the core modules for use in integration tests.

pub mod adapter;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod pool;
pub mod service;
pub mod store;
pub mod validator;
