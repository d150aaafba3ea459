//! Shared test fixtures: a fake driver that simulates the log table and the
//! catalog, recording every statement it executes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use sluice_migrate::prelude::*;

/// Inspection handle into a [`FakeDriver`].
#[derive(Debug, Default)]
pub struct FakeState {
    /// Every statement, in execution order.
    pub executed: Vec<String>,
    /// Simulated log table contents, in insertion order.
    pub log: Vec<String>,
    /// `SHOW COLUMNS` responses, by table name.
    pub live_columns: HashMap<String, Vec<Row>>,
    /// `INFORMATION_SCHEMA.COLUMNS` rows for the whole schema.
    pub catalog: Vec<Row>,
    /// When set, any statement containing this substring fails.
    pub fail_on: Option<String>,
}

/// A driver that answers log and catalog queries from in-memory state and
/// acknowledges everything else.
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub fn new() -> (Self, Arc<Mutex<FakeState>>) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

#[async_trait::async_trait]
impl Driver for FakeDriver {
    async fn connect(&mut self) -> std::result::Result<(), DriverError> {
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> std::result::Result<QueryOutcome, DriverError> {
        let mut state = self.state.lock();
        state.executed.push(sql.to_string());

        if let Some(pattern) = state.fail_on.clone() {
            if sql.contains(&pattern) {
                return Err(DriverError::new(1064, format!("forced failure on `{pattern}`")));
            }
        }

        if sql.starts_with("SELECT * FROM `tblSchemaMigrations`") {
            let rows = state
                .log
                .iter()
                .map(|filename| Row::new().with("filename", filename.clone()))
                .collect();
            return Ok(QueryOutcome::Rows(rows));
        }

        if let Some(rest) = sql.strip_prefix("INSERT INTO `tblSchemaMigrations` SET `filename` = '")
        {
            let filename = rest.trim_end_matches("';");
            state.log.push(filename.to_string());
            return Ok(QueryOutcome::Done {
                affected_rows: 1,
                insert_id: 0,
            });
        }

        if let Some(rest) =
            sql.strip_prefix("DELETE FROM `tblSchemaMigrations` WHERE `filename` = '")
        {
            let filename = rest.trim_end_matches("';").to_string();
            let before = state.log.len();
            state.log.retain(|f| *f != filename);
            return Ok(QueryOutcome::Done {
                affected_rows: (before - state.log.len()) as u64,
                insert_id: 0,
            });
        }

        if let Some(rest) = sql.strip_prefix("SHOW COLUMNS FROM `") {
            let table = rest.trim_end_matches("`;");
            let rows = state.live_columns.get(table).cloned().unwrap_or_default();
            return Ok(QueryOutcome::Rows(rows));
        }

        if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
            return Ok(QueryOutcome::Rows(state.catalog.clone()));
        }

        Ok(QueryOutcome::Done {
            affected_rows: 0,
            insert_id: 0,
        })
    }

    async fn close(&mut self) -> std::result::Result<(), DriverError> {
        Ok(())
    }
}

/// A context over a fresh fake driver.
pub fn test_context() -> (MigrationContext, Arc<Mutex<FakeState>>) {
    let (driver, state) = FakeDriver::new();
    let db = Database::new(DbConfig::default(), Box::new(driver));
    (MigrationContext::new(db), state)
}
