//! Raise/lower schema migrations for MySQL.
//!
//! `sluice-migrate` manages the evolution of a relational schema: table
//! structures are declared in a friendly DSL, compiled into MySQL DDL, and
//! applied or reverted against a live database while a persisted log table
//! tracks what has run. A live schema can also be reverse-engineered back
//! into DSL source text.
//!
//! # Architecture
//!
//! - **DSL** ([`schema`], [`operations`]) - declarative table and column
//!   definitions; no I/O.
//! - **Compiler** ([`dialect`]) - turns declared operations into MySQL DDL.
//! - **Sequencer** ([`sequence`]) - the generic ordered-async-step mechanism
//!   every database operation rides on.
//! - **Migrations** ([`migration`], [`registry`], [`context`]) - identified
//!   up/down pairs, the declaration registry, and log reconciliation.
//! - **Introspector** ([`introspect`]) - regenerates DSL source from the
//!   catalog.
//! - **Connection** ([`driver`], [`connection`]) - the driver seam and the
//!   reconnecting single-connection supervisor.
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_migrate::prelude::*;
//!
//! let db = Database::new(DbConfig::default(), Box::new(my_driver));
//! let ctx = MigrationContext::new(db);
//!
//! ctx.declare(
//!     "20100816093042_create_users",
//!     |m| {
//!         m.create_table("tblUsers", |t| {
//!             t.primary_key("id");
//!             t.string("name");
//!             t.timestamps();
//!         });
//!     },
//!     |m| {
//!         m.drop_table("tblUsers");
//!     },
//! )?;
//!
//! ctx.raise_all().await?;
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod introspect;
pub mod migration;
pub mod operations;
pub mod registry;
pub mod schema;
pub mod sequence;
pub mod value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::DbConfig;
    pub use crate::connection::{ConnectionState, Database};
    pub use crate::context::MigrationContext;
    pub use crate::dialect::{DdlStep, Dialect, MysqlDialect};
    pub use crate::driver::{Driver, DriverError, QueryOutcome, Row};
    pub use crate::error::{MigrateError, Result};
    pub use crate::introspect::Introspector;
    pub use crate::migration::{DbSequence, Migration, MigrationId, SeqValue};
    pub use crate::operations::{AlterTableDefinition, SchemaEditor, TableOperation};
    pub use crate::registry::{MigrationLog, MigrationRegistry, LOG_TABLE};
    pub use crate::schema::{
        ColumnDescriptor, ColumnNames, ColumnOptions, ColumnType, TableDefinition,
    };
    pub use crate::sequence::{Control, Sequence, SequenceError};
    pub use crate::value::{parse_literal, SqlValue};
}
