//! Server configuration: named environments read from YAML.
//!
//! ```yaml
//! Development:
//!   host: 127.0.0.1
//!   port: 8080
//!   debug: true
//!   root_path: /smidgen/v1
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Environment {
    pub host: String,
    #[serde(deserialize_with = "db::config::deserialize_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub root_path: String,
}

impl Environment {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(flatten)]
    pub environments: BTreeMap<String, Environment>,
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read server config {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("invalid server config {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.environments.keys().map(String::as_str).collect();
            anyhow!("environment '{name}' not found (known: {})", known.join(", "))
        })
    }
}
