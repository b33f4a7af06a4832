//! Activerow: a minimal active-record mapping layer.
//!
//! Declare an entity once, bind it to a connection, and work with records:
//!
//! ```ignore
//! use activerow::prelude::*;
//!
//! let person = EntityDef::builder("person")
//!     .field("name", FieldKind::ShortText { max_len: 30 })
//!     .field("bio", FieldKind::LongText)
//!     .field("age", FieldKind::Integer)
//!     .build()?;
//!
//! let repo = Repository::open(&cx, &conn, person).await?;
//!
//! let mut ada = repo.record();
//! ada.set("name", "Ada")?;
//! ada.set("bio", "wrote the first program")?;
//! ada.set("age", 30_i64)?;
//! repo.save(&cx, &mut ada).await?;        // ada now has an id
//!
//! let again = repo.get(&cx, ada.id().unwrap()).await?;
//! ```
//!
//! The facade re-exports the layered crates: `activerow-core` (types,
//! errors, the `Connection` contract), `activerow-schema` (DDL),
//! `activerow-query` (parameterized statements + hydration), and
//! `activerow-repo` (the per-entity repository). Drivers live in their own
//! crates and plug in through [`Connection`].

pub use activerow_core::{
    ColumnInfo, ConnectOptions, Connection, ConnectionError, ConnectionErrorKind, EntityBuilder,
    EntityDef, Error, FieldDef, FieldKind, ID_COLUMN, IntegrityError, NotFoundError, QueryError,
    Record, Result, Row, TransactionOps, ValidationError, Value, quote_ident,
};
pub use activerow_query::{
    DeleteStatement, InsertStatement, SelectStatement, UpdateStatement, hydrate,
};
pub use activerow_repo::Repository;
pub use activerow_schema::{SchemaBuilder, render_column_defs, render_create_table};

/// Structured-concurrency primitives re-exported for callers.
pub use asupersync::{Cx, Outcome};

/// Everything a typical caller needs in one import.
pub mod prelude {
    pub use crate::{
        ConnectOptions, Connection, Cx, EntityDef, Error, FieldKind, Outcome, Record, Repository,
        Result, Row, TransactionOps, Value,
    };
}
