//! Statement builders for CRUD operations.
//!
//! Each builder produces `(String, Vec<Value>)`: the SQL text with numbered
//! placeholders, and the values in placeholder order. Column order is always
//! the entity's declaration order, which is also what [`crate::hydrate`]
//! assumes on the way back.

use activerow_core::{EntityDef, Error, ID_COLUMN, Record, Result, Value, quote_ident};

/// Render `$1, $2, ...` starting at `from` (1-based), `count` entries.
fn placeholders(from: usize, count: usize) -> Vec<String> {
    (from..from + count).map(|i| format!("${i}")).collect()
}

/// Quoted column list in declaration order.
fn column_list(def: &EntityDef) -> Vec<String> {
    def.fields().iter().map(|f| quote_ident(&f.name)).collect()
}

/// Collect a record's values in declaration order, failing on the first
/// unset field.
///
/// A partially-set record must never reach the database: with NOT NULL
/// columns a partial insert is a corruption waiting to be committed.
fn collect_values(record: &Record) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(record.values().len());
    for (field, value) in record.def().fields().iter().zip(record.values()) {
        match value {
            Some(v) => values.push(v.clone()),
            None => {
                return Err(Error::integrity(
                    record.def().table(),
                    format!(
                        "field '{}' has no value; set every field before writing",
                        field.name
                    ),
                ));
            }
        }
    }
    Ok(values)
}

/// INSERT builder.
///
/// Shape: `INSERT INTO "t" ("c1", ...) VALUES ($1, ...) RETURNING id`.
/// The driver consumes the RETURNING clause and hands back the assigned id.
#[derive(Debug)]
pub struct InsertStatement<'a> {
    record: &'a Record,
}

impl<'a> InsertStatement<'a> {
    /// Create an INSERT builder for the given record.
    #[must_use]
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// Build the SQL and parameters.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        let def = self.record.def();
        let values = collect_values(self.record)?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quote_ident(def.table()),
            column_list(def).join(", "),
            placeholders(1, values.len()).join(", "),
            ID_COLUMN
        );
        tracing::trace!(table = def.table(), sql = %sql, "Built INSERT");
        Ok((sql, values))
    }
}

/// UPDATE builder.
///
/// Shape: `UPDATE "t" SET ("c1", ...) = ($1, ...) WHERE id = $n`. The id is
/// the last parameter.
#[derive(Debug)]
pub struct UpdateStatement<'a> {
    record: &'a Record,
}

impl<'a> UpdateStatement<'a> {
    /// Create an UPDATE builder for the given record.
    #[must_use]
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// Build the SQL and parameters.
    ///
    /// Fails with an integrity error when the record was never persisted.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        let def = self.record.def();
        let Some(id) = self.record.id() else {
            return Err(Error::integrity(
                def.table(),
                "record has no id; it was never persisted",
            ));
        };
        let mut values = collect_values(self.record)?;
        let sql = format!(
            "UPDATE {} SET ({}) = ({}) WHERE {} = ${}",
            quote_ident(def.table()),
            column_list(def).join(", "),
            placeholders(1, values.len()).join(", "),
            ID_COLUMN,
            values.len() + 1
        );
        values.push(Value::BigInt(id));
        tracing::trace!(table = def.table(), id, sql = %sql, "Built UPDATE");
        Ok((sql, values))
    }
}

/// DELETE builder.
///
/// Shape: `DELETE FROM "t" WHERE id = $1`.
#[derive(Debug)]
pub struct DeleteStatement<'a> {
    def: &'a EntityDef,
    id: i64,
}

impl<'a> DeleteStatement<'a> {
    /// Create a DELETE builder for one row of an entity.
    #[must_use]
    pub fn new(def: &'a EntityDef, id: i64) -> Self {
        Self { def, id }
    }

    /// Build the SQL and parameters.
    #[must_use]
    pub fn build(&self) -> (String, Vec<Value>) {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_ident(self.def.table()),
            ID_COLUMN
        );
        tracing::trace!(table = self.def.table(), id = self.id, sql = %sql, "Built DELETE");
        (sql, vec![Value::BigInt(self.id)])
    }
}

/// SELECT builder.
///
/// The column list is explicit — `id` first, then declared columns in
/// declaration order — so positional decoding never depends on what the
/// backend thinks `*` means.
#[derive(Debug)]
pub struct SelectStatement<'a> {
    def: &'a EntityDef,
}

impl<'a> SelectStatement<'a> {
    /// Create a SELECT builder for an entity.
    #[must_use]
    pub fn new(def: &'a EntityDef) -> Self {
        Self { def }
    }

    fn select_list(&self) -> String {
        let mut cols = vec![ID_COLUMN.to_string()];
        cols.extend(column_list(self.def));
        cols.join(", ")
    }

    /// Build a lookup of one row by id.
    #[must_use]
    pub fn by_id(&self, id: i64) -> (String, Vec<Value>) {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.select_list(),
            quote_ident(self.def.table()),
            ID_COLUMN
        );
        tracing::trace!(table = self.def.table(), id, sql = %sql, "Built SELECT by id");
        (sql, vec![Value::BigInt(id)])
    }

    /// Build a scan of every row, ordered by id for deterministic output.
    #[must_use]
    pub fn all(&self) -> (String, Vec<Value>) {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            self.select_list(),
            quote_ident(self.def.table()),
            ID_COLUMN
        );
        tracing::trace!(table = self.def.table(), sql = %sql, "Built SELECT all");
        (sql, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activerow_core::FieldKind;
    use std::sync::Arc;

    fn person() -> Arc<EntityDef> {
        EntityDef::builder("person")
            .field("name", FieldKind::ShortText { max_len: 30 })
            .field("bio", FieldKind::LongText)
            .field("age", FieldKind::Integer)
            .build()
            .unwrap()
    }

    fn ada(def: &Arc<EntityDef>) -> Record {
        let mut rec = Record::new(def);
        rec.set("name", "Ada").unwrap();
        rec.set("bio", "wrote the first program").unwrap();
        rec.set("age", 30_i64).unwrap();
        rec
    }

    #[test]
    fn test_insert_shape() {
        let def = person();
        let rec = ada(&def);
        let (sql, params) = InsertStatement::new(&rec).build().unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"person\" (\"name\", \"bio\", \"age\") \
             VALUES ($1, $2, $3) RETURNING id"
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], Value::Text("Ada".to_string()));
        assert_eq!(params[2], Value::BigInt(30));
    }

    #[test]
    fn test_insert_rejects_partial_record() {
        let def = person();
        let mut rec = Record::new(&def);
        rec.set("name", "Ada").unwrap();
        let err = InsertStatement::new(&rec).build().unwrap_err();
        assert!(matches!(err, Error::Integrity(e) if e.detail.contains("bio")));
    }

    #[test]
    fn test_update_shape_and_id_position() {
        let def = person();
        let mut rec = ada(&def);
        rec.assign_id(7);
        let (sql, params) = UpdateStatement::new(&rec).build().unwrap();
        assert_eq!(
            sql,
            "UPDATE \"person\" SET (\"name\", \"bio\", \"age\") = ($1, $2, $3) \
             WHERE id = $4"
        );
        assert_eq!(params.last(), Some(&Value::BigInt(7)));
    }

    #[test]
    fn test_update_requires_id() {
        let def = person();
        let rec = ada(&def);
        assert!(matches!(
            UpdateStatement::new(&rec).build(),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_delete_shape() {
        let def = person();
        let (sql, params) = DeleteStatement::new(&def, 3).build();
        assert_eq!(sql, "DELETE FROM \"person\" WHERE id = $1");
        assert_eq!(params, vec![Value::BigInt(3)]);
    }

    #[test]
    fn test_select_by_id_shape() {
        let def = person();
        let (sql, params) = SelectStatement::new(&def).by_id(3);
        assert_eq!(
            sql,
            "SELECT id, \"name\", \"bio\", \"age\" FROM \"person\" WHERE id = $1"
        );
        assert_eq!(params, vec![Value::BigInt(3)]);
    }

    #[test]
    fn test_select_all_is_ordered() {
        let def = person();
        let (sql, params) = SelectStatement::new(&def).all();
        assert_eq!(
            sql,
            "SELECT id, \"name\", \"bio\", \"age\" FROM \"person\" ORDER BY id"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_hostile_values_stay_out_of_sql_text() {
        let def = person();
        let mut rec = Record::new(&def);
        rec.set("name", "Robert'); DROP--").unwrap();
        rec.set("bio", "'; DELETE FROM \"person\"; --").unwrap();
        rec.set("age", 1_i64).unwrap();
        let (sql, params) = InsertStatement::new(&rec).build().unwrap();
        assert!(!sql.contains("DROP"));
        assert!(!sql.contains("DELETE"));
        assert_eq!(params[0], Value::Text("Robert'); DROP--".to_string()));
    }
}
