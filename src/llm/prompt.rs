//! Prompt construction for NL-to-SQL.
//!
//! The schema context is built from cached metadata rows, never by querying
//! the target database at prompt time.

use crate::llm::Message;
use crate::store::MetadataRow;
use std::fmt::Write;

const SYSTEM_PROMPT: &str = "\
You are a SQL assistant for a read-only database exploration tool.

Rules:
- Answer with exactly one SQL statement inside a ```sql fenced block.
- Only SELECT statements are allowed. Never write INSERT, UPDATE, DELETE, \
DDL, or any statement that modifies data.
- Only reference tables and columns listed in the schema below.
- Prefer explicit column lists over SELECT * when the question names fields.
- If the question cannot be answered with the given schema, say so in plain \
text and do not emit SQL.";

/// Renders the cached metadata snapshot as a compact schema description.
pub fn build_schema_context(metadata: &[MetadataRow]) -> String {
    if metadata.is_empty() {
        return "(no schema metadata available)".to_string();
    }

    let mut out = String::new();
    for row in metadata {
        let qualified = match &row.schema_name {
            Some(schema) => format!("{}.{}", schema, row.object_name),
            None => row.object_name.clone(),
        };
        let _ = writeln!(out, "{} {}:", row.object_type, qualified);

        for col in &row.columns {
            let mut line = format!("  {} {}", col.name, col.data_type);
            if col.is_primary_key {
                line.push_str(" PRIMARY KEY");
            }
            if !col.is_nullable {
                line.push_str(" NOT NULL");
            }
            let _ = writeln!(out, "{line}");
        }
    }
    out
}

/// Builds the message list for one NL-to-SQL request.
pub fn build_messages(question: &str, schema_context: &str) -> Vec<Message> {
    vec![
        Message::system(format!("{SYSTEM_PROMPT}\n\nSchema:\n{schema_context}")),
        Message::user(question),
    ]
}
