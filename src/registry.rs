//! The migration registry and the persisted log.
//!
//! The registry is the in-memory, append-only list of every declared
//! migration, in declaration order. The log is the `tblSchemaMigrations`
//! table; a row's existence is the single source of truth for "applied";
//! migrations themselves carry no applied/pending state.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::connection::Database;
use crate::error::{MigrateError, Result};
use crate::migration::{DbSequence, Migration, MigrationId, SeqValue};
use crate::sequence::{Control, Sequence};
use crate::value::SqlValue;

/// Name of the persisted log table. Excluded from introspection output.
pub const LOG_TABLE: &str = "tblSchemaMigrations";

/// Statement creating the log table if absent.
pub const CREATE_LOG_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS `tblSchemaMigrations` ( `filename` VARCHAR(255) NOT NULL ) ENGINE=INNODB;";

const SELECT_LOG_SQL: &str = "SELECT * FROM `tblSchemaMigrations`;";

/// The ordered list of declared migrations.
///
/// Declaration order must equal identifier order; registration enforces it,
/// which also makes duplicate declarations an error.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Mutex<Vec<Arc<Migration>>>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a migration, enforcing identifier order.
    pub fn register(&self, migration: Arc<Migration>) -> Result<()> {
        let mut migrations = self.migrations.lock();
        if let Some(latest) = migrations.last() {
            if migration.id() <= latest.id() {
                return Err(MigrateError::OutOfOrder {
                    migration: migration.id().to_string(),
                    latest: latest.id().to_string(),
                });
            }
        }
        debug!(migration = %migration.id(), "registered");
        migrations.push(migration);
        Ok(())
    }

    /// All registered migrations, in declaration order.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Migration>> {
        self.migrations.lock().clone()
    }

    /// Number of registered migrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.lock().len()
    }

    /// Whether no migrations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.lock().is_empty()
    }
}

/// Access to the persisted log table.
#[derive(Debug)]
pub struct MigrationLog {
    db: Database,
}

impl MigrationLog {
    /// Creates a log handle over the shared connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The statement recording an identifier as applied.
    #[must_use]
    pub fn insert_sql(id: &MigrationId) -> String {
        format!(
            "INSERT INTO `{LOG_TABLE}` SET `filename` = {};",
            SqlValue::from(id.as_str()).serialize()
        )
    }

    /// The statement removing an identifier's log row.
    #[must_use]
    pub fn delete_sql(id: &MigrationId) -> String {
        format!(
            "DELETE FROM `{LOG_TABLE}` WHERE `filename` = {};",
            SqlValue::from(id.as_str()).serialize()
        )
    }

    /// Idempotently creates the log table.
    pub async fn ensure_table(&self) -> Result<()> {
        self.db.query(CREATE_LOG_TABLE_SQL).await?;
        Ok(())
    }

    /// Ensures the log table exists, then returns the set of logged
    /// identifiers.
    pub async fn fetch(&self) -> Result<HashSet<String>> {
        let ensure_db = self.db.clone();
        let select_db = self.db.clone();

        let seq: DbSequence = Sequence::new()
            .then(move |_| {
                let db = ensure_db.clone();
                async move {
                    db.query(CREATE_LOG_TABLE_SQL).await?;
                    Ok(Control::Advance(SeqValue::Unit))
                }
            })
            .then(move |_| {
                let db = select_db.clone();
                async move {
                    let outcome = db.query(SELECT_LOG_SQL).await?;
                    Ok(Control::Advance(SeqValue::Query(outcome)))
                }
            });

        match seq.run().await? {
            SeqValue::Query(outcome) => Ok(outcome
                .into_rows()
                .iter()
                .filter_map(|row| row.get("filename"))
                .map(ToString::to_string)
                .collect()),
            _ => Ok(HashSet::new()),
        }
    }
}
