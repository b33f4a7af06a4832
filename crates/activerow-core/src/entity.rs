//! Entity definitions and records.
//!
//! An [`EntityDef`] is one declared table: a name plus an ordered list of
//! field descriptors. Field iteration order equals declaration order, and
//! that order drives column order in every generated statement as well as
//! positional row decoding — the two must never drift apart, which is why the
//! definition is immutable after [`EntityBuilder::build`] and shared by
//! `Arc`.
//!
//! A [`Record`] is one live row: a reference to its definition, positional
//! values, and an optional id that only the persistence layer assigns.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field::{FieldDef, FieldKind};
use crate::identifiers::is_valid_identifier;
use crate::validate::compile_pattern;
use crate::value::Value;

/// Name of the implicit surrogate primary key column.
///
/// It is always the first positional element of any row and may not be
/// declared as an ordinary field.
pub const ID_COLUMN: &str = "id";

/// A declared entity type: table name plus ordered field descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    table: String,
    fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Start building an entity definition for the given table.
    pub fn builder(table: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// The table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ordered field descriptors.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of declared fields (the surrogate id is not counted).
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Look up a field descriptor by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in declaration order.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Declared column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Builder for [`EntityDef`].
///
/// Declaration mistakes (bad identifiers, duplicate names, reserved names,
/// broken patterns) surface here as [`Error::Validation`], at type-definition
/// time rather than on first use.
#[derive(Debug)]
pub struct EntityBuilder {
    table: String,
    fields: Vec<FieldDef>,
}

impl EntityBuilder {
    /// Declare a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef::new(name, kind));
        self
    }

    /// Declare a field with a regex pattern constraint.
    #[must_use]
    pub fn field_with_pattern(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        pattern: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDef::new(name, kind).with_pattern(pattern));
        self
    }

    /// Finish the definition.
    pub fn build(self) -> Result<Arc<EntityDef>> {
        if !is_valid_identifier(&self.table) {
            return Err(Error::validation(
                &self.table,
                "table name",
                "table names must be plain SQL identifiers",
            ));
        }
        if self.fields.is_empty() {
            return Err(Error::validation(
                &self.table,
                "entity definition",
                "an entity needs at least one field",
            ));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if !is_valid_identifier(&field.name) {
                return Err(Error::validation(
                    &field.name,
                    "field name",
                    "field names must be plain SQL identifiers",
                ));
            }
            if field.name == ID_COLUMN {
                return Err(Error::validation(
                    &field.name,
                    "field name",
                    "'id' is reserved for the surrogate primary key",
                ));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(Error::validation(
                    &field.name,
                    "field name",
                    "duplicate field name",
                ));
            }
            if let Some(pattern) = &field.pattern {
                if !field.kind.is_textual() {
                    return Err(Error::validation(
                        &field.name,
                        "pattern constraint",
                        "patterns apply to textual kinds only",
                    ));
                }
                if let Err(e) = compile_pattern(pattern) {
                    return Err(Error::validation(
                        &field.name,
                        "pattern constraint",
                        format!("pattern does not compile: {e}"),
                    ));
                }
            }
        }
        Ok(Arc::new(EntityDef {
            table: self.table,
            fields: self.fields,
        }))
    }
}

/// One live row of an entity: positional values plus an optional id.
///
/// The id is absent until the record has been saved or hydrated from a row,
/// and is reassigned only by the persistence layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    def: Arc<EntityDef>,
    values: Vec<Option<Value>>,
    id: Option<i64>,
}

impl Record {
    /// Create an empty record: every field unset, no id.
    #[must_use]
    pub fn new(def: &Arc<EntityDef>) -> Self {
        Self {
            def: Arc::clone(def),
            values: vec![None; def.field_count()],
            id: None,
        }
    }

    /// The entity definition this record belongs to.
    #[must_use]
    pub fn def(&self) -> &Arc<EntityDef> {
        &self.def
    }

    /// The assigned id, if this record has been persisted or hydrated.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Assign the surrogate id.
    ///
    /// Intended for the persistence layer (save and hydration); ordinary
    /// application code never assigns ids.
    pub fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// Set a field value after validating it against the field's kind.
    ///
    /// Unknown field names and rejected values are [`Error::Validation`];
    /// nothing is stored on failure.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let Some(index) = self.def.field_index(field) else {
            return Err(Error::validation(
                field,
                format!("a field of {}", self.def.table()),
                "no such field is declared",
            ));
        };
        let value = value.into();
        self.def.fields()[index].validate(&value)?;
        self.values[index] = Some(value);
        Ok(())
    }

    /// Get a field value, if set.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        let index = self.def.field_index(field)?;
        self.values[index].as_ref()
    }

    /// Positional values in declaration order (`None` = not yet set).
    #[must_use]
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// Name of the first unset field, if any.
    #[must_use]
    pub fn unset_field(&self) -> Option<&str> {
        self.values
            .iter()
            .position(Option::is_none)
            .map(|i| self.def.fields()[i].name.as_str())
    }

    /// Whether every declared field has a value.
    #[must_use]
    pub fn is_fully_set(&self) -> bool {
        self.unset_field().is_none()
    }
}
