//! Database credential loading.
//!
//! The credential file is a YAML document keyed by privilege tier:
//!
//! ```yaml
//! read:
//!   host: localhost
//!   port: 5432
//!   user: smidgen_read
//!   password: secret
//!   database: smidgen
//! write: { ... }
//! delete: { ... }
//! admin: { ... }
//! pool:
//!   max_connections: 4
//!   acquire_timeout_secs: 5
//!   schema: smidgen
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use sqlx::postgres::PgConnectOptions;

use crate::{sql, DbError, Privilege};

/// Connection parameters for one privilege tier.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(alias = "url")]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

impl Credentials {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// Pool sizing shared by every tier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Schema holding the logistics tables.
    pub schema: String,
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 4,
            acquire_timeout_secs: 5,
            schema: "smidgen".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub admin: Credentials,
    pub read: Credentials,
    pub write: Credentials,
    pub delete: Credentials,
    #[serde(default)]
    pub pool: PoolSettings,
}

impl DatabaseConfig {
    /// Load credentials from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse credentials from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, DbError> {
        let config: DatabaseConfig = serde_yaml::from_str(yaml)
            .map_err(|e| DbError::Config(format!("invalid credential document: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DbError> {
        for tier in Privilege::ALL {
            let creds = self.credentials(tier);
            for (field, value) in [
                ("host", &creds.host),
                ("user", &creds.user),
                ("database", &creds.database),
            ] {
                if value.trim().is_empty() {
                    return Err(DbError::Config(format!("{tier}.{field} must not be empty")));
                }
            }
            if creds.port == 0 {
                return Err(DbError::Config(format!("{tier}.port must be greater than 0")));
            }
        }
        if self.pool.max_connections == 0 {
            return Err(DbError::Config("pool.max_connections must be at least 1".into()));
        }
        if !sql::is_plain_identifier(&self.pool.schema) {
            return Err(DbError::Config(format!(
                "pool.schema '{}' is not a plain SQL identifier",
                self.pool.schema
            )));
        }
        Ok(())
    }

    pub fn credentials(&self, tier: Privilege) -> &Credentials {
        match tier {
            Privilege::Read => &self.read,
            Privilege::Write => &self.write,
            Privilege::Delete => &self.delete,
            Privilege::Admin => &self.admin,
        }
    }
}

fn default_port() -> u16 {
    5432
}

/// Ports appear both as numbers and as quoted strings in existing files.
pub fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
