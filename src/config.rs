//! Database credentials for the import sink
//!
//! Loads credentials from a JSON file (DataBaseConfig.json by default).
//! Environment variables take precedence over file values.

use std::env;
use std::fs;
use std::path::Path;

use mysql_async::{Opts, OptsBuilder};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Default credentials file name, next to the binary.
pub const DEFAULT_CONFIG_FILE: &str = "DataBaseConfig.json";

/// Fixed name of the digest member inside each backup archive.
pub const DIGEST_FILE: &str = "DigestBotStackLog.json";

/// Destination credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfig {
    /// Load credentials from a JSON file, then apply env overrides
    /// (MYSQL_HOST, MYSQL_USER, MYSQL_PASSWORD, MYSQL_DATABASE).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config: DbConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var("MYSQL_HOST") {
            self.host = host;
        }
        if let Ok(user) = env::var("MYSQL_USER") {
            self.user = user;
        }
        if let Ok(password) = env::var("MYSQL_PASSWORD") {
            self.password = password;
        }
        if let Ok(database) = env::var("MYSQL_DATABASE") {
            self.database = database;
        }
    }

    /// Connection options for the sink.
    pub fn opts(&self) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
            .into()
    }
}
