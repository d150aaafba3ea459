//! The migration context: the explicit registry-plus-connection object
//! threaded through declarations and reconciliation operations, so multiple
//! isolated instances can coexist (one per test, for example) without hidden
//! shared state.

use std::sync::Arc;

use tracing::info;

use crate::connection::Database;
use crate::dialect::{Dialect, MysqlDialect};
use crate::error::Result;
use crate::migration::{DbSequence, Migration, MigrationId};
use crate::operations::SchemaEditor;
use crate::registry::{MigrationLog, MigrationRegistry};
use crate::sequence::Sequence;

/// Holds the shared connection, the dialect and the migration registry.
pub struct MigrationContext {
    db: Database,
    dialect: Arc<dyn Dialect>,
    registry: MigrationRegistry,
    log: MigrationLog,
}

impl MigrationContext {
    /// Creates a context over the shared connection, targeting MySQL.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            log: MigrationLog::new(db.clone()),
            dialect: Arc::new(MysqlDialect::new()),
            registry: MigrationRegistry::new(),
            db,
        }
    }

    /// The shared connection.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The registry of declared migrations.
    #[must_use]
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// The persisted log.
    #[must_use]
    pub fn log(&self) -> &MigrationLog {
        &self.log
    }

    /// Declares a migration: runs both definer callbacks, compiles their
    /// operations, and registers the result. The identifier would normally
    /// come from the migration file's name.
    pub fn declare<U, D>(&self, id: &str, up: U, down: D) -> Result<Arc<Migration>>
    where
        U: FnOnce(&mut SchemaEditor),
        D: FnOnce(&mut SchemaEditor),
    {
        let id = MigrationId::parse(id)?;

        let mut up_editor = SchemaEditor::new();
        up(&mut up_editor);
        let mut down_editor = SchemaEditor::new();
        down(&mut down_editor);

        let migration = Arc::new(Migration::compile(
            Arc::clone(&self.dialect),
            id,
            up_editor,
            down_editor,
        )?);
        self.registry.register(Arc::clone(&migration))?;
        Ok(migration)
    }

    /// The registered migrations whose identifier is logged, in registry
    /// order.
    pub async fn raised(&self) -> Result<Vec<Arc<Migration>>> {
        let logged = self.log.fetch().await?;
        Ok(self
            .registry
            .all()
            .into_iter()
            .filter(|m| logged.contains(m.id().as_str()))
            .collect())
    }

    /// The registered migrations not yet logged, in registry order.
    pub async fn pending(&self) -> Result<Vec<Arc<Migration>>> {
        let logged = self.log.fetch().await?;
        Ok(self
            .registry
            .all()
            .into_iter()
            .filter(|m| !logged.contains(m.id().as_str()))
            .collect())
    }

    /// Raises the first pending migration. Returns its identifier, or
    /// `None` when nothing is pending.
    pub async fn raise_next(&self) -> Result<Option<MigrationId>> {
        let Some(migration) = self.pending().await?.into_iter().next() else {
            info!("no pending migrations");
            return Ok(None);
        };
        migration.raise(&self.db).run().await?;
        Ok(Some(migration.id().clone()))
    }

    /// Lowers the most recently applied migration. Returns its identifier,
    /// or `None` when nothing is raised.
    pub async fn lower_next(&self) -> Result<Option<MigrationId>> {
        let Some(migration) = self.raised().await?.into_iter().next_back() else {
            info!("no raised migrations");
            return Ok(None);
        };
        migration.lower(&self.db).run().await?;
        Ok(Some(migration.id().clone()))
    }

    /// Raises every pending migration in registry order. The batch is one
    /// sequence of nested per-migration sequences, so ordering holds and the
    /// first failure stops the batch.
    pub async fn raise_all(&self) -> Result<Vec<MigrationId>> {
        let pending = self.pending().await?;
        info!(count = pending.len(), "raising all pending migrations");

        let mut batch: DbSequence = Sequence::new();
        for migration in &pending {
            batch = batch.nest(migration.raise(&self.db));
        }
        batch.run().await?;

        Ok(pending.iter().map(|m| m.id().clone()).collect())
    }

    /// Lowers every raised migration in reverse chronological order.
    pub async fn lower_all(&self) -> Result<Vec<MigrationId>> {
        let mut raised = self.raised().await?;
        raised.reverse();
        info!(count = raised.len(), "lowering all raised migrations");

        let mut batch: DbSequence = Sequence::new();
        for migration in &raised {
            batch = batch.nest(migration.lower(&self.db));
        }
        batch.run().await?;

        Ok(raised.iter().map(|m| m.id().clone()).collect())
    }
}
