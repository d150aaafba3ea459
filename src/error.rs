//! Error types for the migration system.

use crate::driver::DriverError;
use crate::sequence::SequenceError;

/// Errors that can occur while declaring, compiling or running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A table declares more than one primary-key column.
    #[error("table `{0}` declares more than one primary key column")]
    MultiplePrimaryKeys(String),

    /// A table was declared or introspected with no columns at all.
    #[error("no columns found for table `{0}`")]
    NoColumns(String),

    /// A live column lookup came back empty.
    #[error("column `{column}` not found in table `{table}`")]
    UnknownColumn {
        /// Table that was inspected.
        table: String,
        /// Column that was expected.
        column: String,
    },

    /// The catalog reported a native type with no friendly equivalent.
    #[error("unsupported SQL type `{0}`")]
    UnsupportedType(String),

    /// A migration identifier does not follow `YYYYMMDDHHMMSS_name`.
    #[error("invalid migration identifier `{0}`")]
    InvalidIdentifier(String),

    /// A migration was declared out of identifier order.
    #[error("migration `{migration}` declared out of order after `{latest}`")]
    OutOfOrder {
        /// The offending identifier.
        migration: String,
        /// The latest identifier already registered.
        latest: String,
    },

    /// A literal could not be parsed back into a typed value.
    #[error("cannot parse `{literal}` as a {ty} literal")]
    Literal {
        /// Friendly type the literal was expected to be.
        ty: &'static str,
        /// The raw literal text.
        literal: String,
    },

    /// A catalog metadata row is missing a field the core consumes.
    #[error("catalog metadata missing `{0}`")]
    Catalog(&'static str),

    /// The database rejected a statement.
    #[error("database error {errno}: {message}")]
    Driver {
        /// Server error number.
        errno: u32,
        /// Server error message.
        message: String,
    },

    /// The connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// Configuration could not be deserialized.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A fault in the action sequencing machinery.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

impl From<DriverError> for MigrateError {
    fn from(err: DriverError) -> Self {
        Self::Driver {
            errno: err.errno,
            message: err.message,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
