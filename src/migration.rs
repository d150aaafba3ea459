//! Migrations: identified pairs of forward and reverse DDL sequences.
//!
//! A migration is compiled once at declaration time: its `up`/`down`
//! callbacks run immediately, and the collected operations become two lists
//! of [`DdlStep`]s. Raising or lowering builds a fresh single-use
//! [`Sequence`] that drains the statements one at a time over the shared
//! connection, with the log bookkeeping statement appended so the log row
//! commits in the same transaction as the schema change.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::connection::Database;
use crate::dialect::{DdlStep, Dialect};
use crate::driver::QueryOutcome;
use crate::error::{MigrateError, Result};
use crate::operations::SchemaEditor;
use crate::registry::MigrationLog;
use crate::sequence::{Control, Sequence};

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// A migration identifier: a UTC timestamp plus a short name, e.g.
/// `20100816093042_create_users`. Lexical order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId {
    raw: String,
}

impl MigrationId {
    /// Parses an identifier of the form `YYYYMMDDHHMMSS_name`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || MigrateError::InvalidIdentifier(raw.to_string());

        let (stamp, name) = raw.split_once('_').ok_or_else(invalid)?;
        if stamp.len() != 14 || name.is_empty() {
            return Err(invalid());
        }
        NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).map_err(|_| invalid())?;

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    /// Builds an identifier from a point in time and a short name.
    pub fn from_parts(at: DateTime<Utc>, name: &str) -> Result<Self> {
        Self::parse(&format!("{}_{}", at.format(STAMP_FORMAT), name))
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The value passed between database sequence steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SeqValue {
    /// No value.
    #[default]
    Unit,
    /// The outcome of a statement.
    Query(QueryOutcome),
    /// Generated source text.
    Text(String),
}

/// A database-facing action sequence.
pub type DbSequence = Sequence<SeqValue, MigrateError>;

/// A declared migration: an identifier and its compiled up/down steps.
pub struct Migration {
    id: MigrationId,
    dialect: Arc<dyn Dialect>,
    up: Vec<DdlStep>,
    down: Vec<DdlStep>,
}

impl Migration {
    /// Compiles the up/down editors into a migration and appends the log
    /// bookkeeping steps: the up sequence inserts the log row, the down
    /// sequence deletes it.
    pub(crate) fn compile(
        dialect: Arc<dyn Dialect>,
        id: MigrationId,
        up: SchemaEditor,
        down: SchemaEditor,
    ) -> Result<Self> {
        let mut up_steps = compile_editor(dialect.as_ref(), up)?;
        up_steps.push(DdlStep::Statement(MigrationLog::insert_sql(&id)));

        let mut down_steps = compile_editor(dialect.as_ref(), down)?;
        down_steps.push(DdlStep::Statement(MigrationLog::delete_sql(&id)));

        Ok(Self {
            id,
            dialect,
            up: up_steps,
            down: down_steps,
        })
    }

    /// The migration identifier.
    #[must_use]
    pub fn id(&self) -> &MigrationId {
        &self.id
    }

    /// The compiled forward steps, log bookkeeping included.
    #[must_use]
    pub fn up_steps(&self) -> &[DdlStep] {
        &self.up
    }

    /// The compiled reverse steps, log bookkeeping included.
    #[must_use]
    pub fn down_steps(&self) -> &[DdlStep] {
        &self.down
    }

    /// Builds the sequence applying this migration.
    #[must_use]
    pub fn raise(&self, db: &Database) -> DbSequence {
        info!(migration = %self.id, "raising");
        transaction_wrapped(db, Arc::clone(&self.dialect), self.up.clone())
    }

    /// Builds the sequence reverting this migration.
    #[must_use]
    pub fn lower(&self, db: &Database) -> DbSequence {
        info!(migration = %self.id, "lowering");
        transaction_wrapped(db, Arc::clone(&self.dialect), self.down.clone())
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("id", &self.id)
            .field("up", &self.up)
            .field("down", &self.down)
            .finish()
    }
}

fn compile_editor(dialect: &dyn Dialect, editor: SchemaEditor) -> Result<Vec<DdlStep>> {
    let mut steps = Vec::new();
    for operation in editor.into_operations() {
        steps.extend(dialect.compile(&operation)?);
    }
    Ok(steps)
}

/// Wraps a statement list in a transaction: `START TRANSACTION`, the drained
/// statements, `COMMIT`, with an error handler that rolls back and then
/// re-raises the original failure.
fn transaction_wrapped(
    db: &Database,
    dialect: Arc<dyn Dialect>,
    steps: Vec<DdlStep>,
) -> DbSequence {
    let begin_db = db.clone();
    let commit_db = db.clone();
    let rollback_db = db.clone();

    Sequence::new()
        .then(move |_| {
            let db = begin_db.clone();
            async move {
                db.query("START TRANSACTION;").await?;
                Ok(Control::Advance(SeqValue::Unit))
            }
        })
        .nest(statement_sequence(db, dialect, steps))
        .then(move |_| {
            let db = commit_db.clone();
            async move {
                db.query("COMMIT;").await?;
                Ok(Control::Advance(SeqValue::Unit))
            }
        })
        .on_error(move |err| {
            let db = rollback_db.clone();
            async move {
                if let Err(rollback_err) = db.query("ROLLBACK;").await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        })
}

/// Builds the sequence draining a queue of DDL steps, one statement per
/// pass: the first step executes the front of the queue, the second decides
/// whether to loop back or finish.
pub(crate) fn statement_sequence(
    db: &Database,
    dialect: Arc<dyn Dialect>,
    steps: Vec<DdlStep>,
) -> DbSequence {
    let queue = Arc::new(Mutex::new(VecDeque::from(steps)));
    let exec_queue = Arc::clone(&queue);
    let exec_db = db.clone();

    Sequence::new()
        .then(move |_| {
            let db = exec_db.clone();
            let dialect = Arc::clone(&dialect);
            let queue = Arc::clone(&exec_queue);
            async move {
                let step = queue.lock().pop_front();
                match step {
                    Some(DdlStep::Statement(sql)) => {
                        db.query(&sql).await?;
                        Ok(Control::Advance(SeqValue::Unit))
                    }
                    Some(DdlStep::RenameColumn { table, old, new }) => {
                        Ok(Control::Nested(rename_sequence(&db, dialect, table, old, new)))
                    }
                    None => Ok(Control::Finish(SeqValue::Unit)),
                }
            }
        })
        .then(move |_| {
            let queue = Arc::clone(&queue);
            async move {
                if queue.lock().is_empty() {
                    Ok(Control::Finish(SeqValue::Unit))
                } else {
                    Ok(Control::Repeat(SeqValue::Unit))
                }
            }
        })
}

/// The two-step rename action: look up the live column definition, then
/// reissue it under the new name.
fn rename_sequence(
    db: &Database,
    dialect: Arc<dyn Dialect>,
    table: String,
    old: String,
    new: String,
) -> DbSequence {
    let lookup_db = db.clone();
    let change_db = db.clone();
    let lookup_dialect = Arc::clone(&dialect);
    let lookup_table = table.clone();

    Sequence::new()
        .then(move |_| {
            let db = lookup_db.clone();
            let sql = lookup_dialect.show_columns_sql(&lookup_table);
            async move {
                let outcome = db.query(&sql).await?;
                Ok(Control::Advance(SeqValue::Query(outcome)))
            }
        })
        .then(move |value| {
            let db = change_db.clone();
            let dialect = Arc::clone(&dialect);
            let table = table.clone();
            let old = old.clone();
            let new = new.clone();
            async move {
                let rows = match value {
                    SeqValue::Query(outcome) => outcome.into_rows(),
                    _ => Vec::new(),
                };
                let live = rows
                    .iter()
                    .find(|row| row.get("Field") == Some(old.as_str()))
                    .ok_or_else(|| MigrateError::UnknownColumn {
                        table: table.clone(),
                        column: old.clone(),
                    })?;

                let sql = dialect.change_column_sql(&table, &old, &new, live)?;
                db.query(&sql).await?;
                Ok(Control::Advance(SeqValue::Unit))
            }
        })
}
