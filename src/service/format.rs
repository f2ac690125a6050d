//! Result formatting at the wire boundary.
//!
//! snake_case is the internal convention; column names are converted to
//! camelCase just before a result leaves the service layer.

use crate::adapter::QueryOutput;

/// Converts a snake_case identifier to camelCase (`word1_word2` -> `word1Word2`).
///
/// Identifiers already free of underscores pass through unchanged; repeated
/// or trailing underscores are collapsed.
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            // A leading underscore would otherwise capitalize the first word.
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Renames every result column to camelCase. Row data is positional and is
/// left untouched.
pub fn camel_case_columns(mut output: QueryOutput) -> QueryOutput {
    for column in &mut output.columns {
        column.name = to_camel_case(&column.name);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ColumnInfo, Value};

    #[test]
    fn test_basic_conversion() {
        assert_eq!(to_camel_case("row_count"), "rowCount");
        assert_eq!(to_camel_case("execution_time_ms"), "executionTimeMs");
        assert_eq!(to_camel_case("is_primary_key"), "isPrimaryKey");
    }

    #[test]
    fn test_no_underscores_unchanged() {
        assert_eq!(to_camel_case("name"), "name");
        assert_eq!(to_camel_case("camelAlready"), "camelAlready");
    }

    #[test]
    fn test_edge_shapes() {
        assert_eq!(to_camel_case(""), "");
        assert_eq!(to_camel_case("_leading"), "leading");
        assert_eq!(to_camel_case("trailing_"), "trailing");
        assert_eq!(to_camel_case("a__b"), "aB");
    }

    #[test]
    fn test_camel_case_columns_preserves_rows() {
        let output = QueryOutput::with_data(
            vec![
                ColumnInfo::new("user_id", "int8"),
                ColumnInfo::new("created_at", "timestamptz"),
            ],
            vec![vec![Value::Int(1), Value::String("2024-01-01".into())]],
        );

        let formatted = camel_case_columns(output);
        assert_eq!(formatted.columns[0].name, "userId");
        assert_eq!(formatted.columns[1].name, "createdAt");
        assert_eq!(formatted.rows[0][0], Value::Int(1));
    }
}
