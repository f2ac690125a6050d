//! Extracting SQL from LLM responses.
//!
//! Models are instructed to answer with a fenced ```sql block, but responses
//! drift: bare fences, prose around the block, or raw SQL with no fence at
//! all. Extraction is tolerant; whatever comes out is still validated before
//! execution.

use crate::validator::is_select_statement;

/// Extracts the candidate SQL string from an LLM response.
///
/// Preference order: a ```sql fenced block, any fenced block containing a
/// SELECT, then the whole response if it parses as a SELECT. Returns `None`
/// when no candidate is found.
pub fn extract_sql(response: &str) -> Option<String> {
    if let Some(block) = fenced_block(response, "```sql") {
        let block = block.trim();
        if !block.is_empty() {
            return Some(block.to_string());
        }
    }

    if let Some(block) = fenced_block(response, "```") {
        let block = block.trim();
        if is_select_statement(block) {
            return Some(block.to_string());
        }
    }

    let trimmed = response.trim();
    if is_select_statement(trimmed) {
        return Some(trimmed.to_string());
    }

    None
}

/// Returns the content between `opening` and the next closing fence.
fn fenced_block<'a>(text: &'a str, opening: &str) -> Option<&'a str> {
    let start = find_ascii_ci(text, opening)? + opening.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

/// ASCII-case-insensitive substring search over the raw bytes.
///
/// Fence tags are pure ASCII, so a byte-level scan is safe: offsets are
/// positions in the original string and a match start is always a char
/// boundary. Lowercasing the haystack instead would shift byte offsets for
/// inputs with multi-byte case mappings.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
