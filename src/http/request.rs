//! Inbound request facade.
//!
//! # Responsibilities
//! - Snapshot the request head (method, URI, version, headers, peer address)
//! - Preserve the original URL independent of later rewrites
//! - Derive client-facing values (host, forwarded IP chain, subdomains, query)
//!
//! # Design Decisions
//! - Immutable once built and shared via `Arc` between the context and the request scope
//! - Forwarded headers are only trusted when the app runs behind a proxy

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, Method, Uri, Version};

/// Header used to correlate a request across services.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Immutable view of the inbound request head.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
    original_url: String,
}

impl Request {
    /// Build the facade from request parts.
    pub fn new(
        method: Method,
        uri: Uri,
        version: Version,
        headers: HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let original_url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.to_string());
        Self {
            method,
            uri,
            version,
            headers,
            remote_addr,
            original_url,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The request target as received, before any handler rewrote the URL.
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// Path component of the request target.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string without the leading `?`.
    pub fn querystring(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// Decoded query pairs in order of appearance.
    pub fn query(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.querystring().as_bytes())
            .into_owned()
            .collect()
    }

    /// Header value as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether this request travelled over HTTP/2 or newer.
    pub fn is_http2_or_newer(&self) -> bool {
        matches!(self.version, Version::HTTP_2 | Version::HTTP_3)
    }

    /// Host (with port) the client addressed.
    ///
    /// `X-Forwarded-Host` is honoured only when `proxy` is true.
    pub fn host(&self, proxy: bool) -> Option<&str> {
        let forwarded = if proxy {
            self.header("x-forwarded-host")
                .and_then(|h| h.split(',').next())
                .map(str::trim)
                .filter(|h| !h.is_empty())
        } else {
            None
        };
        forwarded
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .or_else(|| self.headers.get(header::HOST).and_then(|v| v.to_str().ok()))
    }

    /// Host without the port.
    pub fn hostname(&self, proxy: bool) -> Option<&str> {
        let host = self.host(proxy)?;
        if host.starts_with('[') {
            // IPv6 literal
            return host.find(']').map(|end| &host[..=end]);
        }
        Some(host.split(':').next().unwrap_or(host))
    }

    /// Client addresses from the proxy header, closest client first.
    ///
    /// Empty unless `proxy` is true. `max_ips` keeps only the most recent hops
    /// when non-zero.
    pub fn ips(&self, proxy: bool, ip_header: &str, max_ips: usize) -> Vec<String> {
        if !proxy {
            return Vec::new();
        }
        let mut ips: Vec<String> = self
            .header(ip_header)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if max_ips > 0 && ips.len() > max_ips {
            ips = ips.split_off(ips.len() - max_ips);
        }
        ips
    }

    /// Remote client address: first forwarded hop when trusted, else the peer.
    pub fn ip(&self, proxy: bool, ip_header: &str, max_ips: usize) -> Option<String> {
        self.ips(proxy, ip_header, max_ips)
            .into_iter()
            .next()
            .or_else(|| self.remote_addr.map(|a| a.ip().to_string()))
    }

    /// Subdomains of the hostname, most specific last, skipping `offset` labels.
    pub fn subdomains(&self, proxy: bool, offset: usize) -> Vec<String> {
        let Some(hostname) = self.hostname(proxy) else {
            return Vec::new();
        };
        if hostname.parse::<IpAddr>().is_ok() || hostname.starts_with('[') {
            return Vec::new();
        }
        let labels: Vec<&str> = hostname.split('.').collect();
        if labels.len() <= offset {
            return Vec::new();
        }
        labels[..labels.len() - offset]
            .iter()
            .rev()
            .map(|s| s.to_string())
            .collect()
    }

    /// Correlation ID assigned by the serving layer, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }
}
