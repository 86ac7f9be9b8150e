//! Error handling utilities for repositories

use dreamx_core::error::DomainError;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// `LIKE` pattern matching values that start with `prefix`
pub fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `LIKE` pattern matching values that contain `needle`
pub fn like_contains(needle: &str) -> String {
    format!("%{}", like_prefix(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_patterns_escape_wildcards() {
        assert_eq!(like_prefix("ab"), "ab%");
        assert_eq!(like_prefix("a_b%"), "a\\_b\\%%");
        assert_eq!(like_contains("x"), "%x%");
    }
}
