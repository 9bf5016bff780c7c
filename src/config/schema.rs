//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::load_balancer::backend::ServiceClass;

/// Root configuration for the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Client-facing listener configuration.
    pub listener: ListenerConfig,

    /// Backend server definitions.
    pub backends: Vec<BackendConfig>,

    /// Forwarding session settings.
    pub session: SessionConfig,

    /// Startup and shutdown settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier. Lower ids win cost ties.
    pub id: u32,

    /// Backend address (e.g., "192.168.0.101:80").
    pub address: String,

    /// Service class used to look up cost weights.
    pub class: ServiceClass,
}

/// Forwarding session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Size of the single bounded read used for client requests and
    /// backend responses. Longer responses are truncated to this size.
    pub buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { buffer_size: 1024 }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long to wait for in-flight sessions on shutdown before aborting them.
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable output for development.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: DispatcherConfig = toml::from_str(
            r#"
            [[backends]]
            id = 0
            address = "127.0.0.1:9000"
            class = "video"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.session.buffer_size, 1024);
        assert_eq!(config.lifecycle.drain_timeout_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert_eq!(config.backends.len(), 1);
        assert_eq!(config.backends[0].class, ServiceClass::Video);
    }

    #[test]
    fn test_full_config_parses() {
        let config: DispatcherConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "10.0.0.1:80"

            [session]
            buffer_size = 512

            [observability]
            log_level = "debug"
            log_format = "json"

            [[backends]]
            id = 0
            address = "192.168.0.101:80"
            class = "VIDEO"

            [[backends]]
            id = 2
            address = "192.168.0.103:80"
            class = "Music"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "10.0.0.1:80");
        assert_eq!(config.session.buffer_size, 512);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.backends[1].id, 2);
        assert_eq!(config.backends[1].class, ServiceClass::Music);
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let result: Result<DispatcherConfig, _> = toml::from_str(
            r#"
            [[backends]]
            id = 0
            address = "127.0.0.1:9000"
            class = "podcast"
            "#,
        );
        assert!(result.is_err());
    }
}
