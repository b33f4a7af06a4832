//! Row-to-record hydration.
//!
//! Hydration is the inverse of the statement builders: given a row shaped
//! `(id, v1, v2, ...)` and an entity definition, zip the values back onto the
//! declared fields positionally. The row must match exactly — arity drift or
//! a value a field's kind would reject means the table and the declaration
//! disagree, which is corruption, not something to paper over.

use std::sync::Arc;

use activerow_core::{EntityDef, Error, Record, Result, Row};

/// Materialize a record from an ordered row.
///
/// The first element is always the id; the rest map onto declared fields in
/// declaration order. Any mismatch — wrong arity, non-integer id, a value
/// failing its field's validation — is a fatal [`Error::Integrity`].
pub fn hydrate(def: &Arc<EntityDef>, row: &Row) -> Result<Record> {
    let expected = 1 + def.field_count();
    if row.len() != expected {
        return Err(Error::integrity(
            def.table(),
            format!(
                "row arity mismatch: expected {expected} values, got {}",
                row.len()
            ),
        ));
    }

    let id = row
        .get(0)
        .and_then(activerow_core::Value::as_i64)
        .ok_or_else(|| {
            Error::integrity(def.table(), "row is missing an integer id in position 0")
        })?;

    let mut record = Record::new(def);
    for (field, value) in def.fields().iter().zip(&row.values()[1..]) {
        record.set(&field.name, value.clone()).map_err(|e| {
            Error::integrity(
                def.table(),
                format!("stored value for field '{}' is invalid: {e}", field.name),
            )
        })?;
    }
    record.assign_id(id);
    Ok(record)
}
