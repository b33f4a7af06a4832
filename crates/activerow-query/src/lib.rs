//! Parameterized statement generation and row hydration.
//!
//! This crate is the two-way bridge between live [`Record`] state and the
//! SQL a [`Connection`](activerow_core::Connection) executes:
//!
//! - **Encode**: the statement builders turn a record into `(sql, params)`
//!   pairs. Values always travel as numbered placeholders (`$1`, `$2`, ...)
//!   with a separate parameter list — they are never interpolated into the
//!   statement text, so a value cannot change the shape of a statement.
//!   Identifier positions use the quoted names vetted by the entity builder.
//! - **Decode**: [`hydrate`] zips an ordered row back onto a definition's
//!   declaration order, with a strict arity check.
//!
//! [`Record`]: activerow_core::Record

pub mod hydrate;
pub mod statement;

pub use hydrate::hydrate;
pub use statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};
