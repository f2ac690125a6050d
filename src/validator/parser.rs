//! SQL parsing and sanitization logic.
//!
//! Uses sqlparser-rs with the PostgreSQL dialect to parse candidate SQL,
//! enforce the SELECT-only policy and inject the bounding LIMIT.

use std::collections::BTreeSet;

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{Result, ScoutError};

/// Keywords rejected even inside an otherwise-valid SELECT.
///
/// The statement already parsed as a query at this point; the scan guards
/// against keyword leakage through subqueries, CTE bodies and comments that
/// the parser tolerates.
const DENIED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
    "MERGE", "BULK",
];

/// Validator enforcing the SELECT-only, bounded-result policy.
#[derive(Debug, Clone)]
pub struct SqlValidator {
    max_rows: usize,
}

impl SqlValidator {
    /// Creates a validator that injects `LIMIT max_rows` into unbounded SELECTs.
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// Validates a SQL string and returns the sanitized form.
    ///
    /// Fails with a validation error for empty input or a disallowed statement,
    /// and with a syntax error for unparseable SQL. A user-specified LIMIT is
    /// never overridden; a trailing semicolon survives LIMIT insertion.
    pub fn validate_and_sanitize(&self, sql: &str) -> Result<String> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(ScoutError::validation("Query must not be empty")
                .with_user_message("Provide a SELECT statement to execute"));
        }

        let statements = parse(trimmed).map_err(|e| {
            ScoutError::syntax(format!("SQL parse error: {e}"))
                .with_user_message("The SQL could not be parsed")
                .with_context(trimmed.to_string())
        })?;

        if statements.len() != 1 {
            return Err(ScoutError::validation(format!(
                "Expected a single statement, found {}",
                statements.len()
            ))
            .with_context(trimmed.to_string()));
        }

        let query = match &statements[0] {
            Statement::Query(query) => query,
            other => {
                return Err(ScoutError::validation(format!(
                    "{} statements are not allowed; only SELECT is supported",
                    statement_kind(other)
                ))
                .with_user_message("Only read-only SELECT queries can be executed")
                .with_context(trimmed.to_string()));
            }
        };

        // Defense in depth: scan the normalized text even though the root
        // parsed as a query.
        let upper = trimmed.to_uppercase();
        for keyword in DENIED_KEYWORDS {
            if contains_word(&upper, keyword) {
                return Err(ScoutError::validation(format!(
                    "Disallowed keyword '{keyword}' in query"
                ))
                .with_user_message("Only read-only SELECT queries can be executed")
                .with_context(trimmed.to_string()));
            }
        }

        if query.limit.is_some() || query.fetch.is_some() {
            return Ok(trimmed.to_string());
        }

        Ok(append_limit(trimmed, self.max_rows))
    }
}

/// Returns true if the input parses to exactly one SELECT statement.
///
/// Never fails: parse errors yield `false`.
pub fn is_select_statement(sql: &str) -> bool {
    match parse(sql.trim()) {
        Ok(statements) => {
            statements.len() == 1 && matches!(statements[0], Statement::Query(_))
        }
        Err(_) => false,
    }
}

/// Extracts the set of table names referenced by a query.
///
/// Never fails: parse errors yield the empty set. CTE aliases are excluded so
/// only real relations remain.
pub fn extract_table_names(sql: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut cte_aliases = BTreeSet::new();

    if let Ok(statements) = parse(sql.trim()) {
        for statement in &statements {
            if let Statement::Query(query) = statement {
                collect_query_tables(query, &mut names, &mut cte_aliases);
            }
        }
    }

    for alias in cte_aliases {
        names.remove(&alias);
    }
    names
}

fn parse(sql: &str) -> std::result::Result<Vec<Statement>, sqlparser::parser::ParserError> {
    Parser::parse_sql(&PostgreSqlDialect {}, sql)
}

/// Appends `LIMIT n`, keeping a trailing semicolon in place.
fn append_limit(sql: &str, max_rows: usize) -> String {
    if let Some(body) = sql.strip_suffix(';') {
        format!("{} LIMIT {};", body.trim_end(), max_rows)
    } else {
        format!("{sql} LIMIT {max_rows}")
    }
}

/// Word-boundary search treating `[A-Za-z0-9_]` as word characters.
fn contains_word(haystack: &str, word: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(word) {
        let begin = start + pos;
        let end = begin + word.len();
        let before_ok = begin == 0 || !is_word_byte(bytes[begin - 1]);
        let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
    }
    false
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Names the statement kind for error messages.
fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Query(_) => "SELECT",
        Statement::Insert(_) => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete(_) => "DELETE",
        Statement::Drop { .. } => "DROP",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::Merge { .. } => "MERGE",
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => "ALTER",
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateProcedure { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => "CREATE",
        Statement::Grant { .. } => "GRANT",
        Statement::Revoke { .. } => "REVOKE",
        Statement::Explain { .. } => "EXPLAIN",
        _ => "This kind of",
    }
}

/// Collects table names from a query, recursing into CTEs and subqueries.
fn collect_query_tables(
    query: &Query,
    names: &mut BTreeSet<String>,
    cte_aliases: &mut BTreeSet<String>,
) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            cte_aliases.insert(cte.alias.name.value.clone());
            collect_query_tables(&cte.query, names, cte_aliases);
        }
    }
    collect_set_expr_tables(&query.body, names, cte_aliases);
}

fn collect_set_expr_tables(
    set_expr: &SetExpr,
    names: &mut BTreeSet<String>,
    cte_aliases: &mut BTreeSet<String>,
) {
    match set_expr {
        SetExpr::Select(select) => {
            for table_with_joins in &select.from {
                collect_table_with_joins(table_with_joins, names, cte_aliases);
            }
        }
        SetExpr::Query(query) => collect_query_tables(query, names, cte_aliases),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr_tables(left, names, cte_aliases);
            collect_set_expr_tables(right, names, cte_aliases);
        }
        _ => {}
    }
}

fn collect_table_with_joins(
    twj: &TableWithJoins,
    names: &mut BTreeSet<String>,
    cte_aliases: &mut BTreeSet<String>,
) {
    collect_table_factor(&twj.relation, names, cte_aliases);
    for join in &twj.joins {
        collect_table_factor(&join.relation, names, cte_aliases);
    }
}

fn collect_table_factor(
    factor: &TableFactor,
    names: &mut BTreeSet<String>,
    cte_aliases: &mut BTreeSet<String>,
) {
    match factor {
        TableFactor::Table { name, .. } => {
            if let Some(last) = name.0.last() {
                names.insert(last.value.clone());
            }
        }
        TableFactor::Derived { subquery, .. } => {
            collect_query_tables(subquery, names, cte_aliases)
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => collect_table_with_joins(table_with_joins, names, cte_aliases),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use pretty_assertions::assert_eq;

    fn validate(sql: &str) -> Result<String> {
        SqlValidator::new(1000).validate_and_sanitize(sql)
    }

    // LIMIT injection

    #[test]
    fn test_limit_appended_to_plain_select() {
        assert_eq!(
            validate("SELECT id, name FROM users").unwrap(),
            "SELECT id, name FROM users LIMIT 1000"
        );
    }

    #[test]
    fn test_limit_appended_before_trailing_semicolon() {
        assert_eq!(
            validate("SELECT * FROM users;").unwrap(),
            "SELECT * FROM users LIMIT 1000;"
        );
    }

    #[test]
    fn test_existing_limit_preserved() {
        assert_eq!(
            validate("SELECT * FROM users LIMIT 42").unwrap(),
            "SELECT * FROM users LIMIT 42"
        );
    }

    #[test]
    fn test_existing_limit_not_duplicated() {
        let out = validate("SELECT * FROM users LIMIT 42").unwrap();
        assert_eq!(out.to_uppercase().matches("LIMIT").count(), 1);
    }

    #[test]
    fn test_fetch_first_counts_as_bound() {
        let out = validate("SELECT * FROM users FETCH FIRST 10 ROWS ONLY").unwrap();
        assert!(!out.to_uppercase().contains("LIMIT"));
    }

    #[test]
    fn test_limit_in_subquery_still_bounds_outer_query() {
        let out = validate("SELECT * FROM (SELECT * FROM users LIMIT 5) t").unwrap();
        assert!(out.ends_with("LIMIT 1000"));
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(
            validate("   SELECT 1  \n").unwrap(),
            "SELECT 1 LIMIT 1000"
        );
    }

    // Statement rejection

    #[test]
    fn test_empty_rejected() {
        let err = validate("").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
        assert!(err.message.contains("empty"));
    }

    #[test]
    fn test_whitespace_only_rejected() {
        assert!(validate("  \t\n  ").is_err());
    }

    #[test]
    fn test_unparseable_is_syntax_error() {
        let err = validate("THIS IS NOT SQL").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Syntax);
        assert_eq!(err.context.as_deref(), Some("THIS IS NOT SQL"));
    }

    #[test]
    fn test_mutating_statements_rejected() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "UPDATE t SET a = 1",
            "DELETE FROM t",
            "DROP TABLE t",
            "CREATE TABLE t (id INT)",
            "ALTER TABLE t ADD COLUMN c INT",
            "TRUNCATE TABLE t",
        ] {
            let err = validate(sql).unwrap_err();
            assert_eq!(err.category, ErrorCategory::Validation, "SQL: {sql}");
        }
    }

    #[test]
    fn test_rejection_names_statement_kind() {
        let err = validate("DROP TABLE t").unwrap_err();
        assert!(err.message.contains("DROP"), "message: {}", err.message);
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = validate("SELECT 1; SELECT 2").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
    }

    #[test]
    fn test_mutating_cte_rejected() {
        // The parser refuses DML in a CTE body outright; rejected either way.
        assert!(validate("WITH d AS (DELETE FROM users RETURNING *) SELECT * FROM d").is_err());
    }

    #[test]
    fn test_keyword_in_comment_rejected_by_scan() {
        // Parses as a plain SELECT; only the text scan sees the comment.
        let err = validate("SELECT * FROM users /* DELETE */").unwrap_err();
        assert_eq!(err.category, ErrorCategory::Validation);
        assert!(err.message.contains("DELETE"));
    }

    #[test]
    fn test_case_insensitive_detection() {
        assert!(validate("select 1").is_ok());
        assert!(validate("SeLeCt 1").is_ok());
        assert!(validate("dRoP tAbLe t").is_err());
    }

    #[test]
    fn test_reserved_word_as_quoted_identifier_parses() {
        let out = validate("SELECT * FROM \"order\"").unwrap();
        assert_eq!(out, "SELECT * FROM \"order\" LIMIT 1000");
    }

    // Word-boundary scanning

    #[test]
    fn test_keyword_inside_identifier_not_matched() {
        // "updates" and "update_log" contain UPDATE but are harmless names.
        assert!(validate("SELECT * FROM updates").is_ok());
        assert!(validate("SELECT * FROM update_log").is_ok());
        assert!(validate("SELECT created_at FROM t").is_ok());
    }

    #[test]
    fn test_contains_word_boundaries() {
        assert!(contains_word("DROP TABLE", "DROP"));
        assert!(contains_word("A;DROP B", "DROP"));
        assert!(!contains_word("BACKDROP", "DROP"));
        assert!(!contains_word("DROPLET", "DROP"));
        assert!(!contains_word("DROP_ZONE", "DROP"));
    }

    // is_select_statement

    #[test]
    fn test_is_select_statement() {
        assert!(is_select_statement("SELECT 1"));
        assert!(is_select_statement("WITH a AS (SELECT 1) SELECT * FROM a"));
        assert!(!is_select_statement("DELETE FROM t"));
        assert!(!is_select_statement("not sql"));
        assert!(!is_select_statement(""));
    }

    // extract_table_names

    #[test]
    fn test_extract_simple() {
        let names = extract_table_names("SELECT * FROM users");
        assert_eq!(names, BTreeSet::from(["users".to_string()]));
    }

    #[test]
    fn test_extract_joins_and_subqueries() {
        let names = extract_table_names(
            "SELECT u.name FROM users u JOIN orders o ON u.id = o.user_id \
             WHERE u.id IN (SELECT user_id FROM payments)",
        );
        assert!(names.contains("users"));
        assert!(names.contains("orders"));
    }

    #[test]
    fn test_extract_derived_table() {
        let names = extract_table_names("SELECT * FROM (SELECT * FROM payments) p");
        assert_eq!(names, BTreeSet::from(["payments".to_string()]));
    }

    #[test]
    fn test_extract_excludes_cte_aliases() {
        let names =
            extract_table_names("WITH recent AS (SELECT * FROM events) SELECT * FROM recent");
        assert_eq!(names, BTreeSet::from(["events".to_string()]));
    }

    #[test]
    fn test_extract_union() {
        let names = extract_table_names("SELECT id FROM a UNION SELECT id FROM b");
        assert_eq!(names, BTreeSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_extract_never_fails() {
        assert!(extract_table_names("complete garbage !!!").is_empty());
        assert!(extract_table_names("").is_empty());
    }
}
