//! Dialect-specific DDL generation.
//!
//! The [`Dialect`] trait seams statement generation away from the rest of
//! the engine. MySQL is the only shipped target.

mod mysql;

pub use mysql::MysqlDialect;

use crate::driver::Row;
use crate::error::Result;
use crate::operations::TableOperation;
use crate::schema::{ColumnDescriptor, ColumnType};

/// One compiled unit of DDL work.
///
/// Most operations compile to plain statements. Renaming a column cannot:
/// the target dialect has no rename-column primitive, so the live definition
/// must be looked up at execution time and reissued under the new name,
/// an asynchronous step, not a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStep {
    /// A complete statement, ready to execute.
    Statement(String),
    /// Look up the live definition of `old` in `table`, then reissue it
    /// under `new`.
    RenameColumn {
        /// Table holding the column.
        table: String,
        /// Current column name.
        old: String,
        /// New column name.
        new: String,
    },
}

/// Generates DDL text for one database dialect.
pub trait Dialect: Send + Sync {
    /// The dialect name.
    fn name(&self) -> &'static str;

    /// The SQL type keyword for a friendly type.
    fn type_sql(&self, column_type: ColumnType) -> &'static str;

    /// Quotes an identifier.
    fn quote(&self, ident: &str) -> String {
        format!("`{ident}`")
    }

    /// Assembles one column definition clause: name, type, raw fragment,
    /// nullability, default, and for the primary key the trailing key
    /// constraint.
    fn column_sql(&self, column: &ColumnDescriptor) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote(&column.name),
            self.type_sql(column.column_type)
        );

        if let Some(additional) = &column.additional {
            sql.push(' ');
            sql.push_str(additional);
        }

        if !column.allow_null {
            sql.push_str(" NOT NULL");
        }

        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.serialize());
        }

        if column.column_type == ColumnType::PrimaryKey {
            sql.push_str(&format!(", PRIMARY KEY ({})", self.quote(&column.name)));
        }

        sql
    }

    /// Compiles one table operation into its DDL steps.
    fn compile(&self, operation: &TableOperation) -> Result<Vec<DdlStep>>;

    /// The statement listing live column definitions of a table.
    fn show_columns_sql(&self, table: &str) -> String;

    /// Rebuilds a rename statement from a live column definition row.
    fn change_column_sql(&self, table: &str, old: &str, new: &str, live: &Row) -> Result<String>;
}
