//! Error taxonomy.
//!
//! Failures are grouped by what the caller can do about them:
//!
//! - [`ValidationError`] — a field value failed its kind's predicate; local to
//!   the write that caused it, never retried.
//! - [`ConnectionError`] — the gateway could not be reached or is no longer
//!   usable; fatal at construction.
//! - [`QueryError`] — a statement failed at the backend; carries the SQL.
//! - [`NotFoundError`] — a get/delete target does not exist; a distinct kind,
//!   never conflated with a generic database error.
//! - [`IntegrityError`] — the mapping layer detected schema/state corruption
//!   (row-arity mismatch, missing id after insert); always fatal.
//!
//! Every variant carries enough context (entity name, id when known, operation
//! detail) to diagnose a failure without re-running at higher verbosity.

use std::fmt;

/// Convenience result alias for fallible core operations.
pub type Result<T> = std::result::Result<T, Error>;

type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What stage of the gateway lifecycle a connection failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Could not establish the connection.
    Connect,
    /// The gateway was closed and can no longer execute statements.
    Closed,
    /// The backend went away mid-session.
    Disconnected,
}

impl ConnectionErrorKind {
    const fn as_str(self) -> &'static str {
        match self {
            ConnectionErrorKind::Connect => "connect",
            ConnectionErrorKind::Closed => "closed",
            ConnectionErrorKind::Disconnected => "disconnected",
        }
    }
}

/// Gateway-level failure.
#[derive(Debug)]
pub struct ConnectionError {
    /// Lifecycle stage of the failure.
    pub kind: ConnectionErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Underlying driver error, when one exists.
    pub source: Option<Source>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection error ({}): {}", self.kind.as_str(), self.message)
    }
}

/// A field value rejected by its declared kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field (or identifier position) that rejected the value.
    pub field: String,
    /// What the field's kind expects.
    pub expected: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value for field '{}' (expected {}): {}",
            self.field, self.expected, self.reason
        )
    }
}

/// Statement-level failure reported by the backend.
#[derive(Debug)]
pub struct QueryError {
    /// Human-readable description.
    pub message: String,
    /// The statement that failed, when known.
    pub sql: Option<String>,
    /// Underlying driver error, when one exists.
    pub source: Option<Source>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "query error: {} (sql: {})", self.message, sql),
            None => write!(f, "query error: {}", self.message),
        }
    }
}

/// A get/delete target that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundError {
    /// Entity (table) the lookup ran against.
    pub entity: String,
    /// The id that did not resolve to a row.
    pub id: i64,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with id = {} does not exist", self.entity, self.id)
    }
}

/// Schema/state corruption detected by the mapping layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityError {
    /// Entity (table) the operation ran against.
    pub entity: String,
    /// What went wrong.
    pub detail: String,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "integrity error on {}: {}", self.entity, self.detail)
    }
}

/// Top-level error type for the workspace.
#[derive(Debug)]
pub enum Error {
    /// A field value failed its kind's predicate.
    Validation(ValidationError),
    /// The gateway could not be reached or is unusable.
    Connection(ConnectionError),
    /// A statement failed at the backend.
    Query(QueryError),
    /// A get/delete target does not exist.
    NotFound(NotFoundError),
    /// The mapping layer detected corruption.
    Integrity(IntegrityError),
}

impl Error {
    /// Build a [`ValidationError`].
    pub fn validation(
        field: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Validation(ValidationError {
            field: field.into(),
            expected: expected.into(),
            reason: reason.into(),
        })
    }

    /// Build a [`ConnectionError`] with no source.
    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Build a [`QueryError`] with no SQL context.
    pub fn query(message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            message: message.into(),
            sql: None,
            source: None,
        })
    }

    /// Build a [`QueryError`] carrying the offending statement.
    pub fn query_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Error::Query(QueryError {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        })
    }

    /// Build a [`NotFoundError`].
    pub fn not_found(entity: impl Into<String>, id: i64) -> Self {
        Error::NotFound(NotFoundError {
            entity: entity.into(),
            id,
        })
    }

    /// Build an [`IntegrityError`].
    pub fn integrity(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::Integrity(IntegrityError {
            entity: entity.into(),
            detail: detail.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(e) => e.fmt(f),
            Error::Connection(e) => e.fmt(f),
            Error::Query(e) => e.fmt(f),
            Error::NotFound(e) => e.fmt(f),
            Error::Integrity(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e.source.as_deref().map(|s| s as _),
            Error::Query(e) => e.source.as_deref().map(|s| s as _),
            Error::Validation(_) | Error::NotFound(_) | Error::Integrity(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let e = Error::not_found("person", 7);
        assert_eq!(e.to_string(), "person with id = 7 does not exist");
    }

    #[test]
    fn test_validation_display_carries_context() {
        let e = Error::validation("name", "VARCHAR(30)", "wrong type or too long");
        let msg = e.to_string();
        assert!(msg.contains("name"));
        assert!(msg.contains("VARCHAR(30)"));
        assert!(msg.contains("wrong type or too long"));
    }

    #[test]
    fn test_query_display_includes_sql() {
        let e = Error::query_sql("no such table", "SELECT 1");
        assert!(e.to_string().contains("SELECT 1"));
    }

    #[test]
    fn test_kinds_are_distinct() {
        assert!(matches!(Error::not_found("t", 1), Error::NotFound(_)));
        assert!(matches!(Error::query("x"), Error::Query(_)));
        assert!(matches!(
            Error::integrity("t", "arity"),
            Error::Integrity(_)
        ));
    }
}
