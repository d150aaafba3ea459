//! The database driver seam.
//!
//! The wire-level driver (socket handling, authentication, result decoding)
//! lives outside this crate. The core consumes it through the [`Driver`]
//! trait: a way to connect, a way to run one statement, and a way to close.
//! Results come back in the text-protocol model (every field is either NULL
//! or a string), which is all the DDL and catalog paths need.

use std::collections::BTreeMap;

use async_trait::async_trait;

/// MySQL client errno for "server has gone away".
pub const ERR_SERVER_GONE: u32 = 2006;
/// MySQL client errno for "lost connection during query".
pub const ERR_SERVER_LOST: u32 = 2013;

/// An error reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{errno}: {message}")]
pub struct DriverError {
    /// Server or client error number.
    pub errno: u32,
    /// Error message.
    pub message: String,
}

impl DriverError {
    /// Creates a driver error.
    #[must_use]
    pub fn new(errno: u32, message: impl Into<String>) -> Self {
        Self {
            errno,
            message: message.into(),
        }
    }

    /// Whether this error means the connection itself was lost, as opposed
    /// to the statement being rejected.
    #[must_use]
    pub fn is_connection_loss(&self) -> bool {
        matches!(self.errno, ERR_SERVER_GONE | ERR_SERVER_LOST)
    }
}

/// One result row, keyed by column name. Fields are nullable text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: BTreeMap<String, Option<String>>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field to a text value, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), Some(value.into()));
        self
    }

    /// Sets a field to NULL, builder style.
    #[must_use]
    pub fn with_null(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), None);
        self
    }

    /// Returns the field's text value; `None` if absent or NULL.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Option::as_deref)
    }

    /// Whether the field is present but NULL.
    #[must_use]
    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(None))
    }
}

/// The result of one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// A result set, in server order.
    Rows(Vec<Row>),
    /// A data- or schema-changing statement summary.
    Done {
        /// Rows affected by the statement.
        affected_rows: u64,
        /// Last insert id, zero if none.
        insert_id: u64,
    },
}

impl QueryOutcome {
    /// The rows of a result set; empty for a summary outcome.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Done { .. } => Vec::new(),
        }
    }
}

/// The capability contract the core requires of a database driver.
#[async_trait]
pub trait Driver: Send {
    /// Establishes the connection.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Executes one statement on the established connection.
    async fn query(&mut self, sql: &str) -> Result<QueryOutcome, DriverError>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), DriverError>;
}
