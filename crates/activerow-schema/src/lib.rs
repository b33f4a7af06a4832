//! DDL generation for entity definitions.
//!
//! The schema renderer turns an [`EntityDef`] into column definitions and a
//! `CREATE TABLE IF NOT EXISTS` statement. Rendering is pure and idempotent:
//! the repository issues it on every construction, and re-issuing against an
//! existing compatible table is harmless.
//!
//! There is no schema reconciliation. If a table already exists with columns
//! that differ from the declaration, behavior is undefined — this layer will
//! neither detect nor repair the drift.

use activerow_core::{EntityDef, ID_COLUMN, quote_ident};

/// Column type of the surrogate primary key.
const ID_COLUMN_DEF: &str = "BIGSERIAL NOT NULL PRIMARY KEY";

/// Render the ordered column definitions for an entity, excluding the
/// surrogate id.
///
/// Each entry has the shape `"name" TYPE NOT NULL`. Only declared fields
/// appear; internal state (the connection handle, the definition itself)
/// cannot leak in because it is never part of the field list.
#[must_use]
pub fn render_column_defs(def: &EntityDef) -> Vec<String> {
    def.fields()
        .iter()
        .map(|f| format!("{} {} NOT NULL", quote_ident(&f.name), f.kind.sql_type()))
        .collect()
}

/// Render the idempotent create-table statement for an entity.
#[must_use]
pub fn render_create_table(def: &EntityDef) -> String {
    let columns = render_column_defs(def).join(", ");
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({} {}, {})",
        quote_ident(def.table()),
        quote_ident(ID_COLUMN),
        ID_COLUMN_DEF,
        columns
    );
    tracing::debug!(table = def.table(), sql = %sql, "Generated DDL");
    sql
}

/// Collects create-table statements for a set of entities.
///
/// # Example
///
/// ```ignore
/// let stmts = SchemaBuilder::new().create_table(&person).build();
/// for stmt in stmts {
///     conn.execute(&cx, &stmt, &[]).await;
/// }
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    statements: Vec<String>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create-table statement for an entity.
    #[must_use]
    pub fn create_table(mut self, def: &EntityDef) -> Self {
        self.statements.push(render_create_table(def));
        self
    }

    /// Finish, returning the queued statements in order.
    #[must_use]
    pub fn build(self) -> Vec<String> {
        self.statements
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

    #[test]
    fn test_column_defs_follow_declaration_order() {
        let defs = render_column_defs(&person());
        assert_eq!(
            defs,
            vec![
                "\"name\" VARCHAR(30) NOT NULL",
                "\"bio\" TEXT NOT NULL",
                "\"age\" INT NOT NULL",
            ]
        );
    }

    #[test]
    fn test_create_table_statement() {
        assert_eq!(
            render_create_table(&person()),
            "CREATE TABLE IF NOT EXISTS \"person\" (\"id\" BIGSERIAL NOT NULL PRIMARY KEY, \
             \"name\" VARCHAR(30) NOT NULL, \"bio\" TEXT NOT NULL, \"age\" INT NOT NULL)"
        );
    }

    #[test]
    fn test_id_is_never_an_ordinary_column() {
        let defs = render_column_defs(&person());
        assert!(defs.iter().all(|d| !d.starts_with("\"id\"")));
    }

    #[test]
    fn test_rendering_is_pure() {
        let def = person();
        assert_eq!(render_create_table(&def), render_create_table(&def));
    }

    #[test]
    fn test_schema_builder_collects_statements() {
        let other = EntityDef::builder("note")
            .field("body", FieldKind::LongText)
            .build()
            .unwrap();
        let stmts = SchemaBuilder::new()
            .create_table(&person())
            .create_table(&other)
            .build();
        assert_eq!(stmts.len(), 2);
        assert!(stmts[1].contains("\"note\""));
    }
}
