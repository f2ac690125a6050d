//! SQL validation and sanitization.
//!
//! Parses untrusted SQL, rejects anything that is not a single SELECT, rejects
//! embedded dangerous keywords, and appends a bounding LIMIT when absent. All
//! SQL reaching an adapter passes through here, including LLM-generated SQL.

mod parser;

pub use parser::{extract_table_names, is_select_statement, SqlValidator};

use crate::error::Result;

/// Default bound applied when a SELECT carries no LIMIT clause.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Validates and sanitizes a SQL string with the given row bound.
///
/// Convenience wrapper over [`SqlValidator`]; see that type for the full
/// contract.
pub fn validate_and_sanitize(sql: &str, max_rows: usize) -> Result<String> {
    SqlValidator::new(max_rows).validate_and_sanitize(sql)
}
