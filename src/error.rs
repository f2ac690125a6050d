//! Error types for db-scout.
//!
//! Every error carries a domain category, a severity, a technical message and a
//! separate user-facing message. Driver errors are categorized by SQLSTATE first;
//! keyword matching against the error text is the fallback for drivers that do
//! not report a code.

use thiserror::Error;

/// Domain category for an error, independent of its originating exception type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Host unreachable, connection refused, broken pipe.
    Network,
    /// Bad credentials, failed password authentication.
    Authentication,
    /// Unsupported scheme, missing database, unknown object.
    Configuration,
    /// Disallowed statement, invalid input.
    Validation,
    /// Unparseable SQL.
    Syntax,
    /// Operation denied by the target database.
    Permission,
    /// Statement or wall-clock timeout.
    Timeout,
    /// Pool or server resource exhaustion.
    Resource,
    /// LLM provider failures.
    Llm,
    /// Unexpected states, bugs.
    Internal,
}

impl ErrorCategory {
    /// Returns the display label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "Network error",
            Self::Authentication => "Authentication error",
            Self::Configuration => "Configuration error",
            Self::Validation => "Validation error",
            Self::Syntax => "Syntax error",
            Self::Permission => "Permission error",
            Self::Timeout => "Timeout error",
            Self::Resource => "Resource error",
            Self::Llm => "LLM error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns the derived machine-readable code (`{CATEGORY}_ERROR`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Syntax => "SYNTAX_ERROR",
            Self::Permission => "PERMISSION_ERROR",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Resource => "RESOURCE_ERROR",
            Self::Llm => "LLM_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Returns the default HTTP status for this category.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation | Self::Syntax | Self::Configuration => 400,
            Self::Authentication => 401,
            Self::Permission => 403,
            Self::Timeout => 408,
            Self::Network | Self::Resource => 503,
            Self::Llm => 502,
            Self::Internal => 500,
        }
    }
}

/// Error severity, used for logging and triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Main error type for db-scout operations.
#[derive(Error, Debug)]
#[error("{}: {message}", category.label())]
pub struct ScoutError {
    /// Domain category.
    pub category: ErrorCategory,
    /// Severity for logging/triage.
    pub severity: Severity,
    /// Technical message (driver text, parser diagnostic).
    pub message: String,
    /// Message safe to surface to end users.
    pub user_message: String,
    /// Actionable suggestions, if any.
    pub suggestions: Vec<String>,
    /// Free-form context, e.g. the offending SQL.
    pub context: Option<String>,
    /// Override for the HTTP status when the category default is wrong
    /// (e.g. a missing stored connection is 404, not 400).
    pub status_override: Option<u16>,
}

impl ScoutError {
    fn new(category: ErrorCategory, severity: Severity, msg: impl Into<String>) -> Self {
        let message = msg.into();
        Self {
            category,
            severity,
            user_message: message.clone(),
            message,
            suggestions: Vec::new(),
            context: None,
            status_override: None,
        }
    }

    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, Severity::High, msg)
    }

    /// Creates an authentication error.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Authentication, Severity::High, msg)
    }

    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, Severity::Medium, msg)
    }

    /// Creates a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, Severity::Low, msg)
    }

    /// Creates a syntax error.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Syntax, Severity::Low, msg)
    }

    /// Creates a permission error.
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Permission, Severity::Medium, msg)
    }

    /// Creates a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, Severity::Medium, msg)
    }

    /// Creates a resource error.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Resource, Severity::High, msg)
    }

    /// Creates an LLM error.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Llm, Severity::Medium, msg)
    }

    /// Creates an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, Severity::Medium, msg)
    }

    /// Creates a not-found error (configuration category, 404 on the wire).
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Configuration, Severity::Low, msg).with_status(404)
    }

    /// Creates a conflict error (validation category, 409 on the wire).
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, Severity::Low, msg).with_status(409)
    }

    /// Sets a user-facing message distinct from the technical one.
    pub fn with_user_message(mut self, msg: impl Into<String>) -> Self {
        self.user_message = msg.into();
        self
    }

    /// Adds an actionable suggestion.
    pub fn with_suggestion(mut self, s: impl Into<String>) -> Self {
        self.suggestions.push(s.into());
        self
    }

    /// Attaches free-form context, e.g. the offending SQL.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Overrides the HTTP status derived from the category.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_override = Some(status);
        self
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        self.category.code()
    }

    /// Returns the HTTP status this error maps to.
    pub fn http_status(&self) -> u16 {
        self.status_override
            .unwrap_or_else(|| self.category.http_status())
    }
}

impl From<sqlx::Error> for ScoutError {
    fn from(err: sqlx::Error) -> Self {
        categorize_driver_error(&err)
    }
}

/// Categorizes a sqlx error into a [`ScoutError`].
///
/// SQLSTATE classes are the primary mechanism; the error text is only consulted
/// when the driver reports no code (e.g. connect-phase I/O failures).
pub fn categorize_driver_error(err: &sqlx::Error) -> ScoutError {
    if matches!(err, sqlx::Error::PoolTimedOut) {
        return ScoutError::resource("Connection pool exhausted")
            .with_suggestion("Retry once in-flight queries complete");
    }

    if let Some(db_err) = err.as_database_error() {
        let message = db_err.message().to_string();
        if let Some(code) = db_err.code() {
            return categorize_sqlstate(code.as_ref(), message);
        }
        return categorize_driver_text(&message);
    }

    categorize_driver_text(&err.to_string())
}

/// Maps a SQLSTATE (or MySQL-reported SQLSTATE) to an error category.
fn categorize_sqlstate(code: &str, message: String) -> ScoutError {
    let class = &code[..code.len().min(2)];
    match (class, code) {
        // 08xxx: connection exceptions
        ("08", _) => ScoutError::network(message)
            .with_user_message("Could not reach the database server")
            .with_suggestion("Check that the host and port are correct and the server is running"),
        // 28xxx: invalid authorization
        ("28", _) => ScoutError::authentication(message)
            .with_user_message("Database authentication failed")
            .with_suggestion("Check the username and password in the connection URL"),
        // insufficient_privilege
        (_, "42501") => ScoutError::permission(message)
            .with_user_message("The database user lacks permission for this operation"),
        // syntax_error
        (_, "42601") => ScoutError::syntax(message),
        // undefined table/column, unknown database
        (_, "42P01") | (_, "42S02") | (_, "42703") | (_, "3D000") | (_, "42000") => {
            ScoutError::configuration(message)
                .with_user_message("A referenced database object does not exist")
        }
        // query_canceled covers statement_timeout expiry
        (_, "57014") => {
            ScoutError::timeout(message).with_user_message("The query exceeded the execution timeout")
        }
        // 53xxx: insufficient resources
        ("53", _) => {
            ScoutError::resource(message).with_user_message("The database server is out of resources")
        }
        // remaining 42xxx are syntax/access-rule violations
        ("42", _) => ScoutError::syntax(message),
        _ => ScoutError::internal(message),
    }
}

/// Fallback categorization scanning the driver's error text.
///
/// Locale- and driver-version-fragile by nature; only used when no SQLSTATE is
/// available.
fn categorize_driver_text(text: &str) -> ScoutError {
    let lower = text.to_lowercase();

    if lower.contains("connection refused")
        || lower.contains("could not connect")
        || lower.contains("connection reset")
        || lower.contains("broken pipe")
        || lower.contains("network unreachable")
    {
        ScoutError::network(text)
            .with_user_message("Could not reach the database server")
            .with_suggestion("Check that the host and port are correct and the server is running")
    } else if lower.contains("password authentication failed")
        || lower.contains("authentication failed")
        || lower.contains("access denied")
    {
        ScoutError::authentication(text)
            .with_user_message("Database authentication failed")
            .with_suggestion("Check the username and password in the connection URL")
    } else if lower.contains("permission denied") {
        ScoutError::permission(text)
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ScoutError::timeout(text)
    } else if lower.contains("does not exist") || lower.contains("unknown database") {
        ScoutError::configuration(text)
            .with_user_message("A referenced database object does not exist")
    } else {
        ScoutError::internal(text)
    }
}

/// Result type alias using ScoutError.
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoutError::network("connection refused by localhost:5432");
        assert_eq!(
            err.to_string(),
            "Network error: connection refused by localhost:5432"
        );
        assert_eq!(err.code(), "NETWORK_ERROR");
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(ErrorCategory::Validation.code(), "VALIDATION_ERROR");
        assert_eq!(ErrorCategory::Syntax.code(), "SYNTAX_ERROR");
        assert_eq!(ErrorCategory::Llm.code(), "LLM_ERROR");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ScoutError::validation("x").http_status(), 400);
        assert_eq!(ScoutError::permission("x").http_status(), 403);
        assert_eq!(ScoutError::timeout("x").http_status(), 408);
        assert_eq!(ScoutError::network("x").http_status(), 503);
        assert_eq!(ScoutError::llm("x").http_status(), 502);
        assert_eq!(ScoutError::internal("x").http_status(), 500);
    }

    #[test]
    fn test_status_override() {
        let err = ScoutError::not_found("connection 'proj' not found");
        assert_eq!(err.category, ErrorCategory::Configuration);
        assert_eq!(err.http_status(), 404);

        let err = ScoutError::conflict("connection 'proj' already exists");
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn test_builder_fields() {
        let err = ScoutError::syntax("unexpected token at position 12")
            .with_user_message("The SQL could not be parsed")
            .with_suggestion("Check the statement near position 12")
            .with_context("SELEC 1");

        assert_eq!(err.user_message, "The SQL could not be parsed");
        assert_eq!(err.suggestions.len(), 1);
        assert_eq!(err.context.as_deref(), Some("SELEC 1"));
    }

    #[test]
    fn test_sqlstate_authentication() {
        let err = categorize_sqlstate("28P01", "password authentication failed".into());
        assert_eq!(err.category, ErrorCategory::Authentication);
    }

    #[test]
    fn test_sqlstate_undefined_table() {
        let err = categorize_sqlstate("42P01", "relation \"users\" does not exist".into());
        assert_eq!(err.category, ErrorCategory::Configuration);
    }

    #[test]
    fn test_sqlstate_permission() {
        let err = categorize_sqlstate("42501", "permission denied for table users".into());
        assert_eq!(err.category, ErrorCategory::Permission);
    }

    #[test]
    fn test_sqlstate_timeout() {
        let err =
            categorize_sqlstate("57014", "canceling statement due to statement timeout".into());
        assert_eq!(err.category, ErrorCategory::Timeout);
    }

    #[test]
    fn test_text_fallback_network() {
        let err = categorize_driver_text("error: Connection refused (os error 111)");
        assert_eq!(err.category, ErrorCategory::Network);
    }

    #[test]
    fn test_text_fallback_access_denied() {
        let err = categorize_driver_text("Access denied for user 'root'@'localhost'");
        assert_eq!(err.category, ErrorCategory::Authentication);
    }

    #[test]
    fn test_text_fallback_unknown() {
        let err = categorize_driver_text("something inexplicable happened");
        assert_eq!(err.category, ErrorCategory::Internal);
        assert_eq!(err.severity, Severity::Medium);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScoutError>();
    }
}
