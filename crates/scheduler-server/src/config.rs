//! Process configuration: a TOML file (path from `SCHEDULER_CONFIG`, default
//! `scheduler.toml`) with individual fields overridable by `SCHEDULER_*`
//! environment variables, the same layering `bpmn-lite`'s config crate used.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_broker_url")]
    pub broker_url: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    #[serde(default)]
    pub worker_config: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            broker_url: default_broker_url(),
            bind_addr: default_bind_addr(),
            storage_root: default_storage_root(),
            worker_config: HashMap::new(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://scheduler.db?mode=rwc".to_string()
}

fn default_broker_url() -> String {
    "amqp://127.0.0.1:5672/%2f".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_storage_root() -> String {
    "./storage".to_string()
}

impl Settings {
    /// Loads `SCHEDULER_CONFIG` (default `scheduler.toml`) if it exists,
    /// then applies `SCHEDULER_DATABASE_URL`, `SCHEDULER_BROKER_URL`,
    /// `SCHEDULER_BIND_ADDR`, and `SCHEDULER_STORAGE_ROOT` on top.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("SCHEDULER_CONFIG").unwrap_or_else(|_| "scheduler.toml".to_string());
        let mut settings = Self::from_file(&config_path)?;

        if let Ok(value) = std::env::var("SCHEDULER_DATABASE_URL") {
            settings.database_url = value;
        }
        if let Ok(value) = std::env::var("SCHEDULER_BROKER_URL") {
            settings.broker_url = value;
        }
        if let Ok(value) = std::env::var("SCHEDULER_BIND_ADDR") {
            settings.bind_addr = value;
        }
        if let Ok(value) = std::env::var("SCHEDULER_STORAGE_ROOT") {
            settings.storage_root = value;
        }
        Ok(settings)
    }

    fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::from_file("/nonexistent/scheduler.toml").unwrap();
        assert_eq!(settings.bind_addr, default_bind_addr());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduler.toml");
        std::fs::write(&path, "bind_addr = \"0.0.0.0:9000\"\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:9000");
        assert_eq!(settings.broker_url, default_broker_url());
    }
}
