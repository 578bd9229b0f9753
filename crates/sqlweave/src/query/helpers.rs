//! Identifier validation.
//!
//! Quoting already neutralizes hostile identifiers; validation rejects them
//! early so a typo or injected name fails at the call site instead of at
//! the database.

use crate::{Result, SqlWeaveError};
use unicode_normalization::UnicodeNormalization;

/// Longest identifier part accepted (PostgreSQL's limit, the strictest).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Statement keywords that are never valid as bare identifiers.
const RESERVED: &[&str] = &[
    "select", "insert", "update", "delete", "drop", "create", "alter", "truncate", "grant",
    "revoke", "exec", "execute", "union", "declare", "from", "where", "join", "and", "or",
    "not", "null", "true", "false",
];

/// Validates a SQL identifier (table/column name).
///
/// Supports both simple identifiers and schema-qualified names (e.g., "public.users").
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid("Identifier cannot be empty".to_string()));
    }

    if name.contains('.') {
        let parts: Vec<&str> = name.split('.').collect();

        // Only allow schema.table format (two parts)
        if parts.len() != 2 {
            return Err(invalid(format!(
                "Invalid schema-qualified identifier '{}': must be in format 'schema.table'",
                name
            )));
        }

        for part in parts {
            validate_identifier_part(part)?;
        }

        return Ok(());
    }

    validate_identifier_part(name)
}

/// Validates a single part of an identifier (no dots allowed).
pub fn validate_identifier_part(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid("Identifier part cannot be empty".to_string()));
    }

    // Normalize to NFKC to prevent Unicode confusables
    let name = name.nfkc().collect::<String>();

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(format!(
            "Identifier '{}' exceeds maximum length of {}",
            name, MAX_IDENTIFIER_LEN
        )));
    }

    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| invalid(format!("Identifier '{}' is empty or invalid", name)))?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(invalid(format!(
            "Identifier '{}' must start with a letter or underscore",
            name
        )));
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(invalid(format!(
            "Identifier '{}' contains invalid character '{}'",
            name, ch
        )));
    }

    let name_lower = name.to_lowercase();
    if name_lower == "information_schema" || name_lower.starts_with("pg_") {
        return Err(invalid(format!(
            "Access to system catalog '{}' is not allowed",
            name
        )));
    }

    if RESERVED.contains(&name_lower.as_str()) {
        return Err(invalid(format!(
            "Identifier '{}' is a reserved SQL keyword",
            name
        )));
    }

    Ok(())
}

fn invalid(message: String) -> SqlWeaveError {
    SqlWeaveError::InvalidArgument(message)
}
