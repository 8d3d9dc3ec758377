//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::DEFAULT_DATABASE_NAME;
use crate::{LogisticsError, LogisticsResult};
use std::str::FromStr;

/// Which [`DocumentStore`](crate::store::DocumentStore) implementation to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    MongoDb,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = LogisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "memory" => Ok(Self::Memory),
            other => Err(LogisticsError::InvalidConfig(format!(
                "unknown store backend '{other}' (expected 'mongodb' or 'memory')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    store_backend: StoreBackend,
    mongodb_uri: Option<String>,
    database_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `LogisticsError::InvalidConfig` if the database name is empty or the MongoDB
    /// backend is selected without a URI.
    pub fn new(
        store_backend: StoreBackend,
        mongodb_uri: Option<String>,
        database_name: String,
    ) -> LogisticsResult<Self> {
        if database_name.trim().is_empty() {
            return Err(LogisticsError::InvalidConfig(
                "database name cannot be empty".into(),
            ));
        }

        let mongodb_uri = mongodb_uri
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if store_backend == StoreBackend::MongoDb && mongodb_uri.is_none() {
            return Err(LogisticsError::InvalidConfig(
                "MONGODB_URI is required for the mongodb store".into(),
            ));
        }

        Ok(Self {
            store_backend,
            mongodb_uri,
            database_name,
        })
    }

    /// Configuration for the in-memory backend, used by tests and local development.
    pub fn in_memory() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            mongodb_uri: None,
            database_name: DEFAULT_DATABASE_NAME.into(),
        }
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend
    }

    pub fn mongodb_uri(&self) -> Option<&str> {
        self.mongodb_uri.as_deref()
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

/// Parse the store backend from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`StoreBackend::MongoDb`].
pub fn store_backend_from_env_value(value: Option<String>) -> LogisticsResult<StoreBackend> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<StoreBackend>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Parse the database name from an optional string value, falling back to
/// [`DEFAULT_DATABASE_NAME`].
pub fn database_name_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string())
}
