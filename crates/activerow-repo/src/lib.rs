//! Per-entity record manager.
//!
//! A [`Repository`] binds one entity definition to one connection and issues
//! every per-record operation through the statement builders: save, update,
//! delete, get, all. Construction ensures the backing table exists (the DDL
//! is idempotent, so constructing repeatedly is safe).
//!
//! # Consistency model
//!
//! Outside an explicit transaction, one statement is one committed unit —
//! there is no multi-statement atomicity, and flows like delete-then-verify
//! are racy under concurrent access to the same table. [`Repository::transaction`]
//! hands out the connection's transactional handle for callers who need a
//! multi-step scope.
//!
//! Every operation logs intent at entry and outcome at exit through
//! `tracing`; the log stream is a side channel and never affects control
//! flow.

use std::sync::Arc;

use asupersync::{Cx, Outcome};

use activerow_core::{Connection, EntityDef, Error, Record};
use activerow_query::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement, hydrate};
use activerow_schema::render_create_table;

/// Gateway performing CRUD for one entity type against one connection.
#[derive(Debug)]
pub struct Repository<'c, C: Connection> {
    conn: &'c C,
    def: Arc<EntityDef>,
}

impl<'c, C: Connection> Repository<'c, C> {
    /// Bind an entity definition to a connection, ensuring the backing table
    /// exists first.
    #[tracing::instrument(level = "debug", skip(cx, conn, def), fields(table = def.table()))]
    pub async fn open(cx: &Cx, conn: &'c C, def: Arc<EntityDef>) -> Outcome<Self, Error> {
        tracing::info!(table = def.table(), "Ensuring backing table exists");
        let ddl = render_create_table(&def);
        match conn.execute(cx, &ddl, &[]).await {
            Outcome::Ok(_) => Outcome::Ok(Self { conn, def }),
            Outcome::Err(e) => {
                tracing::error!(table = def.table(), error = %e, "Create table failed");
                Outcome::Err(e)
            }
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// The entity definition this repository manages.
    #[must_use]
    pub fn entity(&self) -> &Arc<EntityDef> {
        &self.def
    }

    /// Convenience: an empty record of this repository's entity.
    #[must_use]
    pub fn record(&self) -> Record {
        Record::new(&self.def)
    }

    /// Insert a fresh record and write the database-assigned id onto it.
    ///
    /// A record that already carries an id is rejected: re-inserting it would
    /// duplicate the row. Use [`Repository::update`] instead.
    #[tracing::instrument(level = "debug", skip(self, cx, record), fields(table = self.def.table()))]
    pub async fn save(&self, cx: &Cx, record: &mut Record) -> Outcome<(), Error> {
        let table = self.def.table();
        tracing::info!(table, "Saving new record");

        if let Some(id) = record.id() {
            let err = Error::integrity(
                table,
                format!("record already persisted with id = {id}; use update instead"),
            );
            tracing::error!(table, id, error = %err, "Save refused");
            return Outcome::Err(err);
        }

        let (sql, params) = match InsertStatement::new(record).build() {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(table, error = %e, "Save failed before reaching the database");
                return Outcome::Err(e);
            }
        };

        let id = match self.conn.insert(cx, &sql, &params).await {
            Outcome::Ok(id) => id,
            Outcome::Err(e) => {
                tracing::error!(table, error = %e, "Save failed");
                return Outcome::Err(e);
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        record.assign_id(id);
        tracing::info!(table, id, "Record saved");
        Outcome::Ok(())
    }

    /// Write a persisted record's current values back to its row.
    #[tracing::instrument(level = "debug", skip(self, cx, record), fields(table = self.def.table()))]
    pub async fn update(&self, cx: &Cx, record: &Record) -> Outcome<(), Error> {
        let table = self.def.table();
        tracing::info!(table, id = record.id(), "Updating record");

        let Some(id) = record.id() else {
            let err = Error::integrity(table, "record has no id; it was never persisted");
            tracing::error!(table, error = %err, "Update refused");
            return Outcome::Err(err);
        };
        let (sql, params) = match UpdateStatement::new(record).build() {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(table, error = %e, "Update failed before reaching the database");
                return Outcome::Err(e);
            }
        };

        let affected = match self.conn.execute(cx, &sql, &params).await {
            Outcome::Ok(n) => n,
            Outcome::Err(e) => {
                tracing::error!(table, id, error = %e, "Update failed");
                return Outcome::Err(e);
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        if affected == 0 {
            let err = Error::not_found(table, id);
            tracing::error!(table, id, "Update hit no row");
            return Outcome::Err(err);
        }

        tracing::info!(table, id, "Record updated");
        Outcome::Ok(())
    }

    /// Delete a persisted record's row, returning the snapshot read just
    /// before deletion.
    ///
    /// An id that no longer resolves to a row is [`Error::NotFound`], not a
    /// silent success.
    #[tracing::instrument(level = "debug", skip(self, cx, record), fields(table = self.def.table()))]
    pub async fn delete(&self, cx: &Cx, record: &Record) -> Outcome<Record, Error> {
        let table = self.def.table();
        tracing::info!(table, id = record.id(), "Deleting record");

        let Some(id) = record.id() else {
            let err = Error::integrity(table, "record has no id; it was never persisted");
            tracing::error!(table, error = %err, "Delete refused");
            return Outcome::Err(err);
        };

        // Verify the row still exists; its snapshot is the return value.
        let snapshot = match self.get(cx, id).await {
            Outcome::Ok(rec) => rec,
            Outcome::Err(e) => {
                tracing::error!(table, id, error = %e, "Delete target missing");
                return Outcome::Err(e);
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let (sql, params) = DeleteStatement::new(&self.def, id).build();
        match self.conn.execute(cx, &sql, &params).await {
            Outcome::Ok(_) => {
                tracing::info!(table, id, "Record deleted");
                Outcome::Ok(snapshot)
            }
            Outcome::Err(e) => {
                tracing::error!(table, id, error = %e, "Delete failed");
                Outcome::Err(e)
            }
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Fetch one record by id. An absent row is [`Error::NotFound`].
    #[tracing::instrument(level = "debug", skip(self, cx), fields(table = self.def.table()))]
    pub async fn get(&self, cx: &Cx, id: i64) -> Outcome<Record, Error> {
        let table = self.def.table();
        tracing::info!(table, id, "Fetching record");

        let (sql, params) = SelectStatement::new(&self.def).by_id(id);
        let row = match self.conn.query_one(cx, &sql, &params).await {
            Outcome::Ok(row) => row,
            Outcome::Err(e) => {
                tracing::error!(table, id, error = %e, "Fetch failed");
                return Outcome::Err(e);
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let Some(row) = row else {
            let err = Error::not_found(table, id);
            tracing::error!(table, id, "Record not found");
            return Outcome::Err(err);
        };

        match hydrate(&self.def, &row) {
            Ok(rec) => {
                tracing::info!(table, id, "Record fetched");
                Outcome::Ok(rec)
            }
            Err(e) => {
                tracing::error!(table, id, error = %e, "Row failed to hydrate");
                Outcome::Err(e)
            }
        }
    }

    /// Fetch every record of this entity, ordered by id.
    ///
    /// An empty table yields an empty vector — an empty table is a normal
    /// state, not a failure.
    #[tracing::instrument(level = "debug", skip(self, cx), fields(table = self.def.table()))]
    pub async fn all(&self, cx: &Cx) -> Outcome<Vec<Record>, Error> {
        let table = self.def.table();
        tracing::info!(table, "Fetching all records");

        let (sql, params) = SelectStatement::new(&self.def).all();
        let rows = match self.conn.query(cx, &sql, &params).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => {
                tracing::error!(table, error = %e, "Fetch-all failed");
                return Outcome::Err(e);
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match hydrate(&self.def, row) {
                Ok(rec) => records.push(rec),
                Err(e) => {
                    tracing::error!(table, error = %e, "Row failed to hydrate");
                    return Outcome::Err(e);
                }
            }
        }

        tracing::info!(table, count = records.len(), "Records fetched");
        Outcome::Ok(records)
    }

    /// Open a transaction on the underlying connection.
    ///
    /// Statements issued through the handle become durable on commit and are
    /// discarded on rollback (or on drop without commit).
    pub async fn transaction(&self, cx: &Cx) -> Outcome<C::Tx<'c>, Error> {
        self.conn.begin(cx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activerow_core::{FieldKind, Value};
    use activerow_memory::MemoryConnection;
    use asupersync::runtime::RuntimeBuilder;

    fn person() -> Arc<EntityDef> {
        EntityDef::builder("person")
            .field("name", FieldKind::ShortText { max_len: 30 })
            .field("bio", FieldKind::LongText)
            .field("age", FieldKind::Integer)
            .build()
            .unwrap()
    }

    fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> Result<T, String> {
        match outcome {
            Outcome::Ok(v) => Ok(v),
            Outcome::Err(e) => Err(format!("unexpected error: {e}")),
            Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
            Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let def = person();
            unwrap_outcome(Repository::open(&cx, &conn, Arc::clone(&def)).await).unwrap();
            unwrap_outcome(Repository::open(&cx, &conn, def).await).unwrap();
        });
    }

    #[test]
    fn test_save_assigns_monotonic_ids() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

            let mut first = repo.record();
            first.set("name", "Ada").unwrap();
            first.set("bio", "b1").unwrap();
            first.set("age", 30_i64).unwrap();
            unwrap_outcome(repo.save(&cx, &mut first).await).unwrap();

            let mut second = repo.record();
            second.set("name", "Grace").unwrap();
            second.set("bio", "b2").unwrap();
            second.set("age", 45_i64).unwrap();
            unwrap_outcome(repo.save(&cx, &mut second).await).unwrap();

            assert_eq!(first.id(), Some(1));
            assert_eq!(second.id(), Some(2));
        });
    }

    #[test]
    fn test_save_refuses_persisted_record() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

            let mut rec = repo.record();
            rec.set("name", "Ada").unwrap();
            rec.set("bio", "b").unwrap();
            rec.set("age", 30_i64).unwrap();
            unwrap_outcome(repo.save(&cx, &mut rec).await).unwrap();

            assert!(matches!(
                repo.save(&cx, &mut rec).await,
                Outcome::Err(Error::Integrity(_))
            ));
        });
    }

    #[test]
    fn test_update_without_save_is_integrity_error() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

            let mut rec = repo.record();
            rec.set("name", "Ada").unwrap();
            rec.set("bio", "b").unwrap();
            rec.set("age", 30_i64).unwrap();

            assert!(matches!(
                repo.update(&cx, &rec).await,
                Outcome::Err(Error::Integrity(_))
            ));
        });
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();
            assert!(matches!(
                repo.get(&cx, 99).await,
                Outcome::Err(Error::NotFound(e)) if e.id == 99
            ));
        });
    }

    #[test]
    fn test_all_on_empty_table_is_empty_vec() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();
            let all = unwrap_outcome(repo.all(&cx).await).unwrap();
            assert!(all.is_empty());
        });
    }

    #[test]
    fn test_delete_returns_snapshot() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let repo = unwrap_outcome(Repository::open(&cx, &conn, person()).await).unwrap();

            let mut rec = repo.record();
            rec.set("name", "Ada").unwrap();
            rec.set("bio", "b").unwrap();
            rec.set("age", 30_i64).unwrap();
            unwrap_outcome(repo.save(&cx, &mut rec).await).unwrap();

            let snapshot = unwrap_outcome(repo.delete(&cx, &rec).await).unwrap();
            assert_eq!(snapshot.get("name"), Some(&Value::Text("Ada".to_string())));
            assert!(matches!(
                repo.delete(&cx, &rec).await,
                Outcome::Err(Error::NotFound(_))
            ));
        });
    }
}
