//! The connection supervisor.
//!
//! One logical connection is shared process-wide. [`Database`] owns the raw
//! [`Driver`] and layers the lifecycle on top: callers never talk to the
//! driver directly, they call [`Database::query`], which first makes sure the
//! connection is usable: proceeding immediately when connected, otherwise
//! triggering (or awaiting an in-flight) connect and suspending until the
//! connected notification fires.
//!
//! On an unexpected connection loss while the desired state was connected, a
//! reconnect attempt is scheduled after a fixed delay; there is no backoff
//! growth and no retry cap. All statements execute strictly sequentially:
//! the driver sits behind an async mutex and everything funnels through the
//! single action-sequence pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::driver::{Driver, QueryOutcome};
use crate::error::{MigrateError, Result};

/// Lifecycle states of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection, none in progress.
    Closed,
    /// A connect attempt is in flight.
    Connecting,
    /// The connection is usable.
    Connected,
    /// A deliberate close is in progress.
    Closing,
}

struct Inner {
    driver: Mutex<Box<dyn Driver>>,
    state: watch::Sender<ConnectionState>,
    config: DbConfig,
}

/// Handle to the single logical database connection. Cloning the handle
/// shares the connection; it never opens another one.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Wraps a raw driver with lifecycle supervision.
    #[must_use]
    pub fn new(config: DbConfig, driver: Box<dyn Driver>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            inner: Arc::new(Inner {
                driver: Mutex::new(driver),
                state,
                config,
            }),
        }
    }

    /// The connection configuration.
    #[must_use]
    pub fn config(&self) -> &DbConfig {
        &self.inner.config
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Establishes the connection. Returns immediately when already
    /// connected or when an attempt is in flight.
    pub async fn connect(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Connecting => return Ok(()),
            ConnectionState::Closed | ConnectionState::Closing => {}
        }

        self.inner.state.send_replace(ConnectionState::Connecting);
        debug!(
            host = %self.inner.config.host,
            database = %self.inner.config.database,
            "connecting"
        );

        let attempt = {
            let mut driver = self.inner.driver.lock().await;
            driver.connect().await
        };

        match attempt {
            Ok(()) => {
                self.inner.state.send_replace(ConnectionState::Connected);
                info!(database = %self.inner.config.database, "connected");
                Ok(())
            }
            Err(err) => {
                self.inner.state.send_replace(ConnectionState::Closed);
                Err(MigrateError::Connection(err.to_string()))
            }
        }
    }

    /// Deliberately closes the connection. No reconnect is scheduled.
    pub async fn close(&self) {
        info!("closing connection");
        self.inner.state.send_replace(ConnectionState::Closing);
        let mut driver = self.inner.driver.lock().await;
        if let Err(err) = driver.close().await {
            warn!(error = %err, "error while closing connection");
        }
        self.inner.state.send_replace(ConnectionState::Closed);
    }

    /// Executes one statement, connecting or waiting for a connect first.
    pub async fn query(&self, sql: &str) -> Result<QueryOutcome> {
        self.ensure_connected().await?;
        debug!(sql, "executing");

        let result = {
            let mut driver = self.inner.driver.lock().await;
            driver.query(sql).await
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_connection_loss() => {
                let state = self.state();
                if matches!(
                    state,
                    ConnectionState::Connected | ConnectionState::Connecting
                ) {
                    warn!(?state, errno = err.errno, "connection lost, scheduling reconnect");
                    self.inner.state.send_replace(ConnectionState::Closed);
                    self.schedule_reconnect();
                }
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_connected(&self) -> Result<()> {
        loop {
            match self.state() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    let mut rx = self.inner.state.subscribe();
                    if *rx.borrow_and_update() == ConnectionState::Connected {
                        return Ok(());
                    }
                    if rx.changed().await.is_err() {
                        return Err(MigrateError::Connection(
                            "connection supervisor went away".to_string(),
                        ));
                    }
                }
                ConnectionState::Closed | ConnectionState::Closing => {
                    self.connect().await?;
                }
            }
        }
    }

    fn schedule_reconnect(&self) {
        let db = self.clone();
        let delay = Duration::from_millis(self.inner.config.reconnect_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = db.connect().await {
                warn!(error = %err, "reconnect attempt failed");
                db.schedule_reconnect();
            }
        });
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("state", &self.state())
            .field("database", &self.inner.config.database)
            .finish()
    }
}
