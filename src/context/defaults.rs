//! App-level defaults shared by every request context.

use crate::config::AppSection;
use crate::observability::ErrorReporter;

/// Read-only settings that contexts fall back to.
///
/// Built once per app and shared behind an `Arc`; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AppDefaults {
    pub env: String,
    pub proxy: bool,
    pub proxy_ip_header: String,
    pub max_ips_count: usize,
    pub subdomain_offset: usize,
    pub keys: Vec<String>,
    /// Reporter used by the dispatcher and by error-handling middleware.
    pub reporter: ErrorReporter,
}

impl Default for AppDefaults {
    fn default() -> Self {
        Self::from(&AppSection::default())
    }
}

impl From<&AppSection> for AppDefaults {
    fn from(app: &AppSection) -> Self {
        Self {
            env: app.env.clone(),
            proxy: app.proxy,
            proxy_ip_header: app.proxy_ip_header.clone(),
            max_ips_count: app.max_ips_count,
            subdomain_offset: app.subdomain_offset,
            keys: app.keys.clone(),
            reporter: ErrorReporter::default(),
        }
    }
}
