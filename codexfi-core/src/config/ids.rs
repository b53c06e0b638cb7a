//! Filter-interpolation guard.
//!
//! The vector store has no parameterized queries; every value spliced into
//! a filter string passes through `validate_id` first. This is the single
//! defense against filter injection.

use crate::errors::{CodexfiError, CodexfiResult};

/// Validate a value against the allowlist `[A-Za-z0-9_:.-]+` and return it
/// with any `'` escaped as `''`.
///
/// Rejection is a programmer error; callers must sanitize their inputs
/// before reaching the storage layer.
pub fn validate_id(value: &str, field: &str) -> CodexfiResult<String> {
    if value.is_empty() || !value.chars().all(is_allowed) {
        return Err(CodexfiError::InvalidId {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    // Quotes are escaped even though the allowlist rejects them today.
    Ok(value.replace('\'', "''"))
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')
}
