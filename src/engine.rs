//! Database engine detection.
//!
//! Classifies a connection URL's scheme into the closed set of supported
//! engines. Detection is a pure, total function: malformed input maps to
//! [`EngineType::Unknown`], never an error.

use serde::{Deserialize, Serialize};

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Postgres,
    MySql,
    Unknown,
}

impl EngineType {
    /// Returns the engine as a string for persistence and pool keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the default port for this engine.
    ///
    /// `Unknown` has no meaningful port; 0 is returned so callers cannot
    /// accidentally reach a real service with it.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::MySql => 3306,
            Self::Unknown => 0,
        }
    }

    /// Returns the canonical URL scheme for this engine.
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::Unknown => "",
        }
    }

    /// Returns the default schema objects are looked up in when none is given.
    ///
    /// MySQL has no schema concept separate from the database, so `None` is
    /// returned and the adapter falls back to the current database.
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            Self::Postgres => Some("public"),
            Self::MySql | Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for EngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detects the engine type from a connection URL.
///
/// Matching is by scheme prefix against a fixed table, including `+driver`
/// variants (`postgresql+asyncpg`, `mysql+aiomysql`, ...). Never fails.
pub fn detect(url: &str) -> EngineType {
    let scheme = match url.split_once("://") {
        Some((scheme, _)) => scheme.to_ascii_lowercase(),
        None => return EngineType::Unknown,
    };
    // Strip a +driver suffix before matching.
    let base = scheme.split('+').next().unwrap_or("");

    match base {
        "postgresql" | "postgres" => EngineType::Postgres,
        "mysql" => EngineType::MySql,
        _ => EngineType::Unknown,
    }
}

/// Canonicalizes the scheme spelling of a connection URL.
///
/// `postgres://` and `postgresql+asyncpg://` both become `postgresql://`;
/// credentials, host, port and path are left untouched. Unknown schemes pass
/// through unchanged.
pub fn normalize(url: &str) -> String {
    let engine = detect(url);
    if engine == EngineType::Unknown {
        return url.to_string();
    }
    match url.split_once("://") {
        Some((_, rest)) => format!("{}://{}", engine.url_scheme(), rest),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_postgres_variants() {
        assert_eq!(detect("postgresql://u:p@h:5432/db"), EngineType::Postgres);
        assert_eq!(detect("postgres://h/db"), EngineType::Postgres);
        assert_eq!(detect("postgresql+asyncpg://h/db"), EngineType::Postgres);
        assert_eq!(detect("POSTGRES://h/db"), EngineType::Postgres);
    }

    #[test]
    fn test_detect_mysql_variants() {
        assert_eq!(detect("mysql://u:p@h:3306/db"), EngineType::MySql);
        assert_eq!(detect("mysql+aiomysql://h/db"), EngineType::MySql);
        assert_eq!(detect("MySQL://h/db"), EngineType::MySql);
    }

    #[test]
    fn test_detect_unknown_never_panics() {
        assert_eq!(detect(""), EngineType::Unknown);
        assert_eq!(detect("sqlite:///x.db"), EngineType::Unknown);
        assert_eq!(detect("mongodb://h/db"), EngineType::Unknown);
        assert_eq!(detect("not a url at all"), EngineType::Unknown);
        assert_eq!(detect("://"), EngineType::Unknown);
        assert_eq!(detect("\u{fffd}\u{0}garbage"), EngineType::Unknown);
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(EngineType::Postgres.default_port(), 5432);
        assert_eq!(EngineType::MySql.default_port(), 3306);
        assert_eq!(EngineType::Unknown.default_port(), 0);
    }

    #[test]
    fn test_normalize_scheme_only() {
        assert_eq!(
            normalize("postgres://u:p@localhost:5432/db"),
            "postgresql://u:p@localhost:5432/db"
        );
        assert_eq!(
            normalize("postgresql+asyncpg://u:p@localhost/db"),
            "postgresql://u:p@localhost/db"
        );
        assert_eq!(normalize("mysql+pymysql://h/db"), "mysql://h/db");
    }

    #[test]
    fn test_normalize_unknown_passthrough() {
        assert_eq!(normalize("oracle://h/db"), "oracle://h/db");
        assert_eq!(normalize("garbage"), "garbage");
    }

    #[test]
    fn test_default_schema() {
        assert_eq!(EngineType::Postgres.default_schema(), Some("public"));
        assert_eq!(EngineType::MySql.default_schema(), None);
    }
}
