//! Logging setup for the AAIM runtime.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

pub mod logging;

pub use logging::init_logging;

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log filter used when `RUST_LOG` is not set (e.g., "info,aaim_core=debug")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON lines instead of pretty output
    #[serde(default)]
    pub enable_json_logging: bool,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_service_name() -> String {
    "aaim".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            enable_json_logging: false,
            environment: default_environment(),
        }
    }
}

impl MonitoringConfig {
    /// Load the configuration from `AAIM_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration from an arbitrary variable source, starting
    /// with the defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(service_name) = lookup("AAIM_SERVICE_NAME") {
            config.service_name = service_name;
        }

        if let Some(log_filter) = lookup("AAIM_LOG_FILTER") {
            config.log_filter = log_filter;
        }

        if let Some(json) = lookup("AAIM_LOG_JSON") {
            match json.to_lowercase().as_str() {
                "true" | "1" => config.enable_json_logging = true,
                "false" | "0" => config.enable_json_logging = false,
                _ => warn!("Invalid AAIM_LOG_JSON value: {}", json),
            }
        }

        if let Some(environment) = lookup("AAIM_ENVIRONMENT") {
            config.environment = environment;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "aaim");
        assert_eq!(config.log_filter, "info");
        assert!(!config.enable_json_logging);
        assert_eq!(config.environment, "dev");
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("AAIM_SERVICE_NAME", "kiosk"),
            ("AAIM_LOG_FILTER", "warn,aaim_core=trace"),
            ("AAIM_LOG_JSON", "TRUE"),
            ("AAIM_ENVIRONMENT", "prod"),
        ]
        .into_iter()
        .collect();

        let config = MonitoringConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            config,
            MonitoringConfig {
                service_name: "kiosk".to_string(),
                log_filter: "warn,aaim_core=trace".to_string(),
                enable_json_logging: true,
                environment: "prod".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_flag_keeps_default() {
        let config = MonitoringConfig::from_lookup(|key| {
            (key == "AAIM_LOG_JSON").then(|| "sometimes".to_string())
        });
        assert!(!config.enable_json_logging);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: MonitoringConfig =
            serde_json::from_str(r#"{ "enable_json_logging": true }"#).unwrap();
        assert!(config.enable_json_logging);
        assert_eq!(config.service_name, "aaim");
        assert_eq!(config.environment, "dev");
    }
}
