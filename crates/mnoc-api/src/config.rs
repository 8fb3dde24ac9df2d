use std::collections::HashMap;
use std::env;

use mnoc_core::config::{ConfigError, QueueConfig};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub queue: QueueConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("MNOC_API_BIND_ADDR")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "127.0.0.1:8090".to_string());
        if !bind_addr.contains(':') {
            return Err(ConfigError::Invalid(
                "MNOC_API_BIND_ADDR must be host:port".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            queue: QueueConfig::from_lookup(&lookup)?,
        })
    }
}
