//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::edge::event::{CustomOrigin, OriginProtocol};

/// Root configuration for the image gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Resize policy applied to every invocation.
    pub resize: ResizeConfig,

    /// External raster tool.
    pub transformer: TransformerConfig,

    /// Scratch storage location.
    pub scratch: ScratchConfig,

    /// Default origin used for viewer-mode requests.
    pub origin: Option<OriginConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent invocations (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-invocation timeout in seconds, enforced by the host layer.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Resize policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Ceiling for both width and height; also the default when absent.
    pub max_dimension: u32,

    /// Output quality handed to the raster tool (1-100).
    pub quality: u8,

    /// Unsharp-mask amount. `None` skips the sharpening pass.
    pub sharpen: Option<String>,

    /// Reject non-numeric dimensions with a 400 instead of clamping them.
    pub reject_invalid_dimensions: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2000,
            quality: 80,
            sharpen: None,
            reject_invalid_dimensions: true,
        }
    }
}

/// External raster tool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// ImageMagick-compatible executable, resolved through `PATH`.
    pub program: PathBuf,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("convert"),
        }
    }
}

/// Scratch storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScratchConfig {
    /// Parent directory for per-invocation scratch dirs (default: OS temp dir).
    pub dir: Option<PathBuf>,
}

impl ScratchConfig {
    /// Directory that per-invocation scratch space is created under.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Default origin for viewer-mode requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// `http` or `https`.
    pub protocol: OriginProtocol,

    /// Origin host, optionally with a port.
    pub domain_name: String,

    /// Base path prepended verbatim to the request URI.
    #[serde(default)]
    pub path: String,
}

impl From<&OriginConfig> for CustomOrigin {
    fn from(origin: &OriginConfig) -> Self {
        CustomOrigin {
            protocol: origin.protocol,
            domain_name: origin.domain_name.clone(),
            path: origin.path.clone(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
