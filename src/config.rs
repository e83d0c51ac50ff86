//! Telemetry configuration.
//!
//! Supports:
//! - Embedding as a section of a host server's config file (serde)
//! - Environment variable override for the collector endpoint
//! - Disabled-by-default defaults for quick start

use serde::{Deserialize, Serialize};

/// Environment variable naming the OTLP collector endpoint.
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Default OTLP/gRPC collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4317";

/// Configuration for one telemetry context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether to export anything at all.
    pub enabled: bool,

    /// Reported as the `service.name` resource attribute.
    pub service_name: String,

    /// Reported as the `service.version` resource attribute.
    pub service_version: String,

    /// OTLP/gRPC collector endpoint, passed through to the exporter
    /// factories unvalidated.
    pub endpoint: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "kiln-server".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Enabled configuration targeting `endpoint`.
    pub fn with_endpoint(service_name: &str, service_version: &str, endpoint: &str) -> Self {
        Self {
            enabled: true,
            service_name: service_name.to_string(),
            service_version: service_version.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Build from the environment.
    ///
    /// Export is enabled when `OTEL_EXPORTER_OTLP_ENDPOINT` is set and
    /// non-empty; otherwise the configuration stays disabled.
    pub fn from_env(service_name: &str, service_version: &str) -> Self {
        match std::env::var(OTLP_ENDPOINT_ENV) {
            Ok(endpoint) if !endpoint.is_empty() => {
                Self::with_endpoint(service_name, service_version, &endpoint)
            }
            _ => Self {
                service_name: service_name.to_string(),
                service_version: service_version.to_string(),
                ..Self::default()
            },
        }
    }
}
