//! Identifier derivation for types and relations.

use super::ModelError;

/// Strips a display name down to `[A-Za-z][A-Za-z0-9_]*`, truncated to `max_len`.
///
/// # Errors
///
/// Returns [`ModelError::InvalidName`] if nothing usable remains.
pub fn sanitize_identifier(name: &str, max_len: usize) -> Result<String, ModelError> {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .skip_while(|c| !c.is_ascii_alphabetic())
        .take(max_len)
        .collect();
    if cleaned.is_empty() {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(cleaned)
}

/// Returns `base`, or `base` with the smallest numeric suffix from 1 that
/// `is_taken` rejects, keeping the result within `max_len`.
pub fn unique_name(base: &str, max_len: usize, is_taken: impl Fn(&str) -> bool) -> String {
    let base: String = base.chars().take(max_len).collect();
    if !is_taken(&base) {
        return base;
    }
    let mut index: usize = 1;
    loop {
        let suffix = index.to_string();
        let keep = max_len.saturating_sub(suffix.len());
        let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
        if !is_taken(&candidate) {
            return candidate;
        }
        index += 1;
    }
}
