//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for an app.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// App-level settings read by every request context.
    pub app: AppSection,

    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Named middleware to register, in order.
    pub middleware: MiddlewareConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// App-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSection {
    /// Environment name, overridable with `STRATA_ENV`.
    pub env: String,

    /// Trust proxy headers (`X-Forwarded-Host`, the IP header).
    pub proxy: bool,

    /// Header carrying the forwarded client address chain.
    pub proxy_ip_header: String,

    /// Keep at most this many forwarded addresses (0 = unlimited).
    pub max_ips_count: usize,

    /// Number of hostname labels that are not subdomains.
    pub subdomain_offset: usize,

    /// Signing keys made available to handlers.
    pub keys: Vec<String>,

    /// Expose the current request through a task-local scope.
    pub request_scope: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            proxy: false,
            proxy_ip_header: "X-Forwarded-For".to_string(),
            max_ips_count: 0,
            subdomain_offset: 2,
            keys: Vec::new(),
            request_scope: false,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Per-request timeout enforced by the serving layer.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Middleware stack configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Registry names, outermost first.
    pub stack: Vec<String>,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            stack: ["error-handler", "logger", "response-time", "echo"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub log_filter: String,

    /// Pretty output for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "strata=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
