//! Field descriptors.
//!
//! A [`FieldDef`] declares one typed column: a name bound at declaration time
//! by the entity builder, a [`FieldKind`] that validates candidate values
//! before they are stored, and an optional pattern constraint for textual
//! kinds. Descriptors never hold data; values live on the owning
//! [`crate::entity::Record`], keyed by the descriptor's name.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::validate::matches_pattern;
use crate::value::Value;

/// The typed kinds a declared column can have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Bounded text, rendered as `VARCHAR(max_len)`.
    ShortText {
        /// Maximum accepted length in characters.
        max_len: usize,
    },
    /// Unbounded text, rendered as `TEXT`.
    LongText,
    /// Integral value, rendered as `INT`.
    Integer,
}

impl FieldKind {
    /// The canonical column-type token for this kind.
    ///
    /// This mapping is pure: `ShortText(n)` → `VARCHAR(n)`, `LongText` →
    /// `TEXT`, `Integer` → `INT`.
    #[must_use]
    pub fn sql_type(&self) -> String {
        match self {
            FieldKind::ShortText { max_len } => format!("VARCHAR({max_len})"),
            FieldKind::LongText => "TEXT".to_string(),
            FieldKind::Integer => "INT".to_string(),
        }
    }

    /// Whether this kind stores text.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, FieldKind::ShortText { .. } | FieldKind::LongText)
    }

    /// Validate a candidate value against this kind.
    ///
    /// Columns are NOT NULL, so `Value::Null` is rejected by every kind.
    /// Booleans are not integers here, even though some backends blur the
    /// two.
    pub fn validate(&self, field: &str, value: &Value) -> Result<()> {
        match self {
            FieldKind::ShortText { max_len } => match value {
                Value::Text(s) if s.chars().count() <= *max_len => Ok(()),
                Value::Text(_) | Value::Null | Value::Bool(_) | Value::BigInt(_)
                | Value::Double(_) => Err(Error::validation(
                    field,
                    self.sql_type(),
                    "wrong type or too long",
                )),
            },
            FieldKind::LongText => match value {
                Value::Text(_) => Ok(()),
                _ => Err(Error::validation(
                    field,
                    self.sql_type(),
                    format!("expected text, got {}", value.type_name()),
                )),
            },
            FieldKind::Integer => match value {
                Value::BigInt(_) => Ok(()),
                _ => Err(Error::validation(
                    field,
                    self.sql_type(),
                    format!("expected an integer, got {}", value.type_name()),
                )),
            },
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql_type())
    }
}

/// One declared column: name, kind, optional pattern constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name, bound by the entity builder.
    pub name: String,
    /// Typed kind of the column.
    pub kind: FieldKind,
    /// Optional regex constraint, applied to textual kinds after the kind
    /// check.
    pub pattern: Option<String>,
}

impl FieldDef {
    /// Create a field definition without a pattern constraint.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            pattern: None,
        }
    }

    /// Attach a pattern constraint.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Validate a candidate value against the kind and any pattern.
    pub fn validate(&self, value: &Value) -> Result<()> {
        self.kind.validate(&self.name, value)?;
        if let (Some(pattern), Some(text)) = (&self.pattern, value.as_str()) {
            if !matches_pattern(text, pattern) {
                return Err(Error::validation(
                    &self.name,
                    self.kind.sql_type(),
                    format!("value does not match pattern {pattern}"),
                ));
            }
        }
        Ok(())
    }
}
