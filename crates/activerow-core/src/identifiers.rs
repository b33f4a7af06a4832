//! SQL identifier validation and quoting.
//!
//! Identifier positions (table and column names) cannot be parameterized, so
//! they are the one place where untrusted input could still reach SQL text.
//! The entity builder therefore refuses any name that is not a plain
//! identifier, and everything that lands in a statement goes through
//! [`quote_ident`].

use crate::error::{Error, Result};

/// Maximum accepted identifier length; matches the common backend limit.
pub const MAX_IDENT_LEN: usize = 63;

/// Whether a string is a plain SQL identifier: starts with a letter or
/// underscore, continues with letters, digits, or underscores, and fits the
/// length limit.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_IDENT_LEN {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate an identifier, returning it unchanged on success.
pub fn sanitize_identifier(name: &str) -> Result<&str> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(Error::validation(
            name,
            "SQL identifier",
            "identifiers must match [A-Za-z_][A-Za-z0-9_]* and fit 63 characters",
        ))
    }
}

/// Quote an identifier for use in SQL text, doubling any embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
