//! Core types and traits for Activerow.
//!
//! `activerow-core` is the foundation layer for the workspace. It defines the
//! contracts that every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Connection`] and [`TransactionOps`] are the traits
//!   implemented by database drivers; any driver satisfying them is
//!   substitutable.
//! - **Data model**: [`Value`], [`Row`], [`FieldKind`], [`EntityDef`], and
//!   [`Record`] represent declared columns, live record state, and query
//!   inputs/outputs shared across the schema, query, and repository crates.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync
//!   so every async database operation is cancel-correct.
//!
//! # Who Uses This Crate
//!
//! - `activerow-schema` renders [`EntityDef`] metadata into DDL.
//! - `activerow-query` consumes [`Record`] state to build parameterized SQL
//!   and hydrates rows back into records.
//! - `activerow-repo` depends on [`Connection`], [`Row`], and [`Value`] for
//!   its CRUD flows.
//! - Driver crates (`activerow-memory`) implement [`Connection`] and operate
//!   on [`Row`]/[`Value`].
//!
//! Most applications should use the `activerow` facade; reach for
//! `activerow-core` directly when writing drivers.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connection;
pub mod entity;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod row;
pub mod validate;
pub mod value;

pub use connection::{ConnectOptions, Connection, TransactionOps};
pub use entity::{EntityBuilder, EntityDef, ID_COLUMN, Record};
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, IntegrityError, NotFoundError, QueryError, Result,
    ValidationError,
};
pub use field::{FieldDef, FieldKind};
pub use identifiers::{is_valid_identifier, quote_ident, sanitize_identifier};
pub use row::{ColumnInfo, Row};
pub use validate::{compile_pattern, matches_pattern};
pub use value::Value;
