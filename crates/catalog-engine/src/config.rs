use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};

///
/// EngineConfig
///
/// The engine's entire environment surface (Environment): a database
/// URL, optional credentials, and an optional time zone. Nothing else is
/// read from the process environment — no globals, no ambient config
/// registry.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    pub database_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub time_zone: Option<String>,
}

const DATABASE_URL_VAR: &str = "CATALOG_DATABASE_URL";
const USERNAME_VAR: &str = "CATALOG_DB_USERNAME";
const PASSWORD_VAR: &str = "CATALOG_DB_PASSWORD";
const TIME_ZONE_VAR: &str = "CATALOG_TIME_ZONE";

impl EngineConfig {
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            username: None,
            password: None,
            time_zone: None,
        }
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Load from `CATALOG_DATABASE_URL`, `CATALOG_DB_USERNAME`,
    /// `CATALOG_DB_PASSWORD`, `CATALOG_TIME_ZONE`. Only the database URL is
    /// required.
    pub fn from_env() -> CatalogResult<Self> {
        let database_url = std::env::var(DATABASE_URL_VAR).map_err(|_| {
            CatalogError::Config(format!("missing required environment variable {DATABASE_URL_VAR}"))
        })?;
        Ok(Self {
            database_url,
            username: std::env::var(USERNAME_VAR).ok(),
            password: std::env::var(PASSWORD_VAR).ok(),
            time_zone: std::env::var(TIME_ZONE_VAR).ok(),
        })
    }

    /// An in-memory SQLite configuration, for tests and examples.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_has_no_credentials() {
        let config = EngineConfig::in_memory();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert!(config.username.is_none());
        assert!(config.password.is_none());
    }

    #[test]
    fn from_env_requires_database_url() {
        // SAFETY: test-only, single-threaded env mutation scoped to this test.
        unsafe {
            std::env::remove_var(DATABASE_URL_VAR);
        }
        let err = EngineConfig::from_env().unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }
}
