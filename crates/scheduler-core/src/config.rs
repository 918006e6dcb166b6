//! The piece of system configuration that gets handed to workers over
//! `get_system_config`, as opposed to the scheduler server's own process
//! configuration (which lives in `scheduler-server`).

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub storage: serde_json::Value,
    pub worker_config: HashMap<String, serde_json::Value>,
}

impl SystemConfig {
    pub fn worker_config_for(&self, worker_type: &str) -> serde_json::Value {
        self.worker_config
            .get(worker_type)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_worker_type_gets_null_rather_than_an_error() {
        let config = SystemConfig::default();
        assert_eq!(config.worker_config_for("fetch"), serde_json::Value::Null);
    }

    #[test]
    fn known_worker_type_gets_its_own_slice() {
        let mut worker_config = HashMap::new();
        worker_config.insert("fetch".to_string(), serde_json::json!({ "timeout_secs": 30 }));
        let config = SystemConfig {
            storage: serde_json::Value::Null,
            worker_config,
        };
        assert_eq!(config.worker_config_for("fetch"), serde_json::json!({ "timeout_secs": 30 }));
        assert_eq!(config.worker_config_for("render"), serde_json::Value::Null);
    }
}
