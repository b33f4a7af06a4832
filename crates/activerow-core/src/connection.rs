//! The connection gateway contract.
//!
//! A [`Connection`] owns exactly one live database connection and exposes the
//! capability set the rest of the workspace relies on: execute-and-fetch,
//! insert-returning-id, and an explicit transaction handle. Each call outside
//! a transaction is its own committed unit. Any driver satisfying this trait
//! is substitutable — the repository layer never sees past it.

// Allow `impl Future` return types in trait methods - intentional for async trait compat
#![allow(clippy::manual_async_fn)]

use std::future::Future;

use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;

/// Connection parameters, consumed once at gateway construction.
///
/// There is no dynamic reconfiguration: a gateway is built from one set of
/// options and keeps them for its lifetime. Drivers interpret the subset they
/// need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// User name.
    pub user: String,
    /// Password, when the backend wants one.
    pub password: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            database: "activerow".to_string(),
            user: "activerow".to_string(),
            password: None,
        }
    }
}

/// Operations available on an open transaction.
///
/// `commit` and `rollback` consume the handle; statements issued through the
/// handle become durable only on commit.
pub trait TransactionOps: Send {
    /// Run a statement and return all result rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a statement expected to produce at most one row.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Run a statement without a result set; returns rows affected.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Make the transaction's effects durable.
    fn commit(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Discard the transaction's effects.
    fn rollback(self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;
}

/// The gateway contract: one live connection, statement execution, explicit
/// per-statement commit, and scoped transactions.
pub trait Connection: Send + Sync {
    /// Transaction handle tied to this connection's lifetime.
    type Tx<'conn>: TransactionOps
    where
        Self: 'conn;

    /// Run a statement and return all result rows. Committed immediately.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a statement expected to produce at most one row.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Run a statement without a result set; returns rows affected.
    /// Committed immediately.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Run an INSERT carrying `RETURNING id` and hand back the assigned id.
    ///
    /// A result with no row or a non-integer id is an error, never a silent
    /// zero.
    fn insert(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<i64, Error>> + Send;

    /// Open a transaction.
    fn begin(&self, cx: &Cx) -> impl Future<Output = Outcome<Self::Tx<'_>, Error>> + Send;

    /// Check the connection is alive.
    fn ping(&self, cx: &Cx) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Close the connection. Safe to call regardless of connection state;
    /// closing an already-closed gateway is a no-op.
    fn close(self, cx: &Cx) -> impl Future<Output = crate::Result<()>> + Send;
}
