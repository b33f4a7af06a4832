//! In-memory connection gateway.
//!
//! [`MemoryConnection`] implements the [`Connection`] contract over a small
//! statement engine that understands exactly the SQL this workspace emits.
//! It exists so repositories can be exercised end-to-end — table creation,
//! CRUD, transactions, close semantics — without a network or an embedded C
//! library, and it doubles as the substitutability proof for the gateway
//! trait: nothing above the trait can tell it apart from a real driver.
//!
//! Statements auto-commit unless a transaction is open, matching the
//! one-statement-one-unit baseline of the repository layer. State lives
//! behind a process-local mutex; the critical sections are pure computation
//! and never held across an await.

// Allow `impl Future` return types in trait methods - intentional for async trait compat
#![allow(clippy::manual_async_fn)]

mod engine;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use asupersync::{Cx, Outcome};

use activerow_core::{
    ConnectOptions, Connection, ConnectionErrorKind, Error, Row, TransactionOps, Value,
};

use crate::engine::Engine;

fn lock_engine(engine: &Arc<Mutex<Engine>>) -> Result<MutexGuard<'_, Engine>, Error> {
    engine.lock().map_err(|_| {
        Error::connection(
            ConnectionErrorKind::Disconnected,
            "gateway state poisoned by a panicked writer",
        )
    })
}

/// A shared, cloneable in-memory gateway.
///
/// Clones share one engine, the way clones of a pooled connection handle
/// share one socket. Closing any clone closes the gateway for all of them.
pub struct MemoryConnection {
    engine: Arc<Mutex<Engine>>,
}

impl MemoryConnection {
    /// Open a gateway with default options.
    #[must_use]
    pub fn open() -> Self {
        Self::open_with(&ConnectOptions::default())
    }

    /// Open a gateway from connection options.
    ///
    /// Only the database name is meaningful here (it labels diagnostics);
    /// host, port, and credentials belong to network drivers. The options are
    /// consumed once — there is no reconfiguration after construction.
    #[must_use]
    pub fn open_with(options: &ConnectOptions) -> Self {
        tracing::info!(database = %options.database, "Opening in-memory gateway");
        Self {
            engine: Arc::new(Mutex::new(Engine::new(options.database.clone()))),
        }
    }

    /// Whether the gateway has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock_engine(&self.engine).map(|g| g.is_closed()).unwrap_or(true)
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<engine::ExecResult, Error> {
        let mut guard = lock_engine(&self.engine)?;
        guard.execute_sql(sql, params)
    }
}

impl Clone for MemoryConnection {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let database = lock_engine(&self.engine)
            .map(|g| g.database().to_string())
            .unwrap_or_else(|_| "<poisoned>".to_string());
        f.debug_struct("MemoryConnection")
            .field("database", &database)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection for MemoryConnection {
    type Tx<'conn>
        = MemoryTransaction<'conn>
    where
        Self: 'conn;

    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let conn = self.clone();
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match conn.run(&sql, &params) {
                Ok(res) => Outcome::Ok(res.rows),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let conn = self.clone();
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match conn.run(&sql, &params) {
                Ok(res) => Outcome::Ok(res.rows.into_iter().next()),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let conn = self.clone();
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match conn.run(&sql, &params) {
                Ok(res) => Outcome::Ok(res.affected),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn insert(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<i64, Error>> + Send {
        let conn = self.clone();
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            match conn.run(&sql, &params) {
                Ok(res) => match res.inserted_id {
                    Some(id) => Outcome::Ok(id),
                    None => Outcome::Err(Error::query_sql(
                        "INSERT did not return an id; add RETURNING id",
                        sql,
                    )),
                },
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn begin(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send {
        let engine = Arc::clone(&self.engine);
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let mut guard = match lock_engine(&engine) {
                Ok(g) => g,
                Err(e) => return Outcome::Err(e),
            };
            if let Err(e) = guard.execute_sql("BEGIN", &[]) {
                return Outcome::Err(e);
            }
            drop(guard);
            Outcome::Ok(MemoryTransaction {
                engine,
                finished: false,
                _marker: PhantomData,
            })
        }
    }

    fn ping(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        let conn = self.clone();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let guard = match lock_engine(&conn.engine) {
                Ok(g) => g,
                Err(e) => return Outcome::Err(e),
            };
            if guard.is_closed() {
                Outcome::Err(Error::connection(
                    ConnectionErrorKind::Closed,
                    format!("gateway to '{}' is closed", guard.database()),
                ))
            } else {
                Outcome::Ok(())
            }
        }
    }

    fn close(self, _cx: &Cx) -> impl Future<Output = activerow_core::Result<()>> + Send {
        async move {
            let mut guard = lock_engine(&self.engine)?;
            guard.close();
            Ok(())
        }
    }
}

/// An open transaction on a [`MemoryConnection`].
///
/// Statements issued through the handle apply to live state; `commit` keeps
/// them and `rollback` restores the pre-transaction snapshot. A handle
/// dropped without either rolls back, so a failed scope cannot leak
/// half-applied writes.
pub struct MemoryTransaction<'conn> {
    engine: Arc<Mutex<Engine>>,
    finished: bool,
    _marker: PhantomData<&'conn ()>,
}

impl<'conn> Drop for MemoryTransaction<'conn> {
    fn drop(&mut self) {
        if !self.finished {
            if let Ok(mut guard) = lock_engine(&self.engine) {
                guard.rollback_if_open();
            }
        }
    }
}

impl<'conn> TransactionOps for MemoryTransaction<'conn> {
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send {
        let engine = Arc::clone(&self.engine);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let mut guard = match lock_engine(&engine) {
                Ok(g) => g,
                Err(e) => return Outcome::Err(e),
            };
            match guard.execute_sql(&sql, &params) {
                Ok(res) => Outcome::Ok(res.rows),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send {
        let engine = Arc::clone(&self.engine);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let mut guard = match lock_engine(&engine) {
                Ok(g) => g,
                Err(e) => return Outcome::Err(e),
            };
            match guard.execute_sql(&sql, &params) {
                Ok(res) => Outcome::Ok(res.rows.into_iter().next()),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        let engine = Arc::clone(&self.engine);
        let sql = sql.to_string();
        let params = params.to_vec();
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let mut guard = match lock_engine(&engine) {
                Ok(g) => g,
                Err(e) => return Outcome::Err(e),
            };
            match guard.execute_sql(&sql, &params) {
                Ok(res) => Outcome::Ok(res.affected),
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn commit(mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let result = {
                let mut guard = match lock_engine(&self.engine) {
                    Ok(g) => g,
                    Err(e) => return Outcome::Err(e),
                };
                guard.commit()
            };
            match result {
                Ok(()) => {
                    self.finished = true;
                    Outcome::Ok(())
                }
                Err(e) => Outcome::Err(e),
            }
        }
    }

    fn rollback(mut self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send {
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            let result = {
                let mut guard = match lock_engine(&self.engine) {
                    Ok(g) => g,
                    Err(e) => return Outcome::Err(e),
                };
                guard.rollback()
            };
            match result {
                Ok(()) => {
                    self.finished = true;
                    Outcome::Ok(())
                }
                Err(e) => Outcome::Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asupersync::runtime::RuntimeBuilder;

    fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> Result<T, String> {
        match outcome {
            Outcome::Ok(v) => Ok(v),
            Outcome::Err(e) => Err(format!("unexpected error: {e}")),
            Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
            Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
        }
    }

    const CREATE: &str = "CREATE TABLE IF NOT EXISTS \"person\" (\"id\" BIGSERIAL NOT NULL \
                          PRIMARY KEY, \"name\" VARCHAR(30) NOT NULL, \"age\" INT NOT NULL)";
    const INSERT: &str =
        "INSERT INTO \"person\" (\"name\", \"age\") VALUES ($1, $2) RETURNING id";
    const SELECT_ALL: &str = "SELECT id, \"name\", \"age\" FROM \"person\" ORDER BY id";

    #[test]
    fn test_insert_returns_assigned_id() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            unwrap_outcome(conn.execute(&cx, CREATE, &[]).await).unwrap();
            let id = unwrap_outcome(
                conn.insert(&cx, INSERT, &[Value::from("Ada"), Value::BigInt(30)])
                    .await,
            )
            .unwrap();
            assert_eq!(id, 1);
        });
    }

    #[test]
    fn test_insert_without_returning_id_errors() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            unwrap_outcome(conn.execute(&cx, CREATE, &[]).await).unwrap();
            let outcome = conn.insert(&cx, SELECT_ALL, &[]).await;
            assert!(matches!(outcome, Outcome::Err(Error::Query(_))));
        });
    }

    #[test]
    fn test_clones_share_state() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let other = conn.clone();
            unwrap_outcome(conn.execute(&cx, CREATE, &[]).await).unwrap();
            unwrap_outcome(
                other
                    .insert(&cx, INSERT, &[Value::from("Ada"), Value::BigInt(30)])
                    .await,
            )
            .unwrap();
            let rows = unwrap_outcome(conn.query(&cx, SELECT_ALL, &[]).await).unwrap();
            assert_eq!(rows.len(), 1);
        });
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_statements() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            let handle = conn.clone();
            unwrap_outcome(conn.execute(&cx, CREATE, &[]).await).unwrap();

            handle.clone().close(&cx).await.unwrap();
            handle.close(&cx).await.unwrap();

            assert!(conn.is_closed());
            assert!(matches!(
                conn.query(&cx, SELECT_ALL, &[]).await,
                Outcome::Err(Error::Connection(_))
            ));
            assert!(matches!(
                conn.ping(&cx).await,
                Outcome::Err(Error::Connection(_))
            ));
        });
    }

    #[test]
    fn test_transaction_commit_and_rollback() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            unwrap_outcome(conn.execute(&cx, CREATE, &[]).await).unwrap();

            let tx = unwrap_outcome(conn.begin(&cx).await).unwrap();
            unwrap_outcome(
                tx.execute(&cx, INSERT, &[Value::from("Ada"), Value::BigInt(30)])
                    .await,
            )
            .unwrap();
            unwrap_outcome(tx.commit(&cx).await).unwrap();

            let tx = unwrap_outcome(conn.begin(&cx).await).unwrap();
            unwrap_outcome(
                tx.execute(&cx, INSERT, &[Value::from("Grace"), Value::BigInt(45)])
                    .await,
            )
            .unwrap();
            unwrap_outcome(tx.rollback(&cx).await).unwrap();

            let rows = unwrap_outcome(conn.query(&cx, SELECT_ALL, &[]).await).unwrap();
            assert_eq!(rows.len(), 1);
        });
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let rt = RuntimeBuilder::current_thread().build().expect("runtime");
        let cx = Cx::for_testing();
        rt.block_on(async {
            let conn = MemoryConnection::open();
            unwrap_outcome(conn.execute(&cx, CREATE, &[]).await).unwrap();

            {
                let tx = unwrap_outcome(conn.begin(&cx).await).unwrap();
                unwrap_outcome(
                    tx.execute(&cx, INSERT, &[Value::from("Ada"), Value::BigInt(30)])
                        .await,
                )
                .unwrap();
                // dropped here without commit
            }

            let rows = unwrap_outcome(conn.query(&cx, SELECT_ALL, &[]).await).unwrap();
            assert!(rows.is_empty());
        });
    }
}
