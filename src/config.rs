//! Connection configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for the single logical database connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Schema name. Also the schema introspection targets.
    pub database: String,
    /// Fixed delay before a reconnect attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            username: "root".to_string(),
            password: String::new(),
            database: "test".to_string(),
            reconnect_delay_ms: 1000,
        }
    }
}

impl DbConfig {
    /// Parses a configuration from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
