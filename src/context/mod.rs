//! Per-request context subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request + outbound sink
//!     → factory.rs (create_context: snapshot head, fresh state)
//!     → Context (owned by one pipeline run)
//!         ├─ Arc<Request>      shared, immutable request facade
//!         ├─ Response          mutable status/headers/body
//!         ├─ Outbound          single-shot sink, written by the finalizer
//!         └─ Arc<AppDefaults>  read-through fallback for app settings
//!     → scope.rs (optional task-local view of the request)
//! ```
//!
//! # Design Decisions
//! - One context per request; never reused or shared across requests
//! - `state` is a fresh typed map per request for handler-to-handler data
//! - App settings are read through `AppDefaults` rather than copied per request

pub mod defaults;
pub mod factory;
pub mod scope;

pub use defaults::AppDefaults;
pub use factory::create_context;

use std::sync::Arc;

use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version};

use crate::error::{Error, HttpError};
use crate::http::{Body, Outbound, Request, Response, WireResponse};

/// Request-scoped state handed to every handler.
#[derive(Debug)]
pub struct Context {
    request: Arc<Request>,
    request_body: Option<axum::body::Body>,
    url: String,
    response: Response,
    outbound: Outbound,
    defaults: Arc<AppDefaults>,
    /// Handler-to-handler data for this request only.
    pub state: Extensions,
    /// `Some(false)` means a handler wrote the response itself; the finalizer skips.
    pub respond: Option<bool>,
}

impl Context {
    pub(crate) fn new(
        request: Arc<Request>,
        request_body: axum::body::Body,
        outbound: Outbound,
        defaults: Arc<AppDefaults>,
    ) -> Self {
        Self {
            url: request.original_url().to_string(),
            request,
            request_body: Some(request_body),
            response: Response::default(),
            outbound,
            defaults,
            state: Extensions::new(),
            respond: None,
        }
    }

    // Request

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn version(&self) -> Version {
        self.request.version()
    }

    /// Current URL; handlers may rewrite it, `original_url` keeps the received one.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn original_url(&self) -> &str {
        self.request.original_url()
    }

    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or("")
    }

    pub fn querystring(&self) -> &str {
        self.url.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    pub fn query(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.querystring().as_bytes())
            .into_owned()
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn host(&self) -> Option<&str> {
        self.request.host(self.defaults.proxy)
    }

    pub fn hostname(&self) -> Option<&str> {
        self.request.hostname(self.defaults.proxy)
    }

    pub fn ip(&self) -> Option<String> {
        self.request.ip(
            self.defaults.proxy,
            &self.defaults.proxy_ip_header,
            self.defaults.max_ips_count,
        )
    }

    pub fn ips(&self) -> Vec<String> {
        self.request.ips(
            self.defaults.proxy,
            &self.defaults.proxy_ip_header,
            self.defaults.max_ips_count,
        )
    }

    pub fn subdomains(&self) -> Vec<String> {
        self.request
            .subdomains(self.defaults.proxy, self.defaults.subdomain_offset)
    }

    /// Take the request body stream. Returns `None` once taken.
    pub fn take_request_body(&mut self) -> Option<axum::body::Body> {
        self.request_body.take()
    }

    // App

    pub fn env(&self) -> &str {
        &self.defaults.env
    }

    pub fn defaults(&self) -> &AppDefaults {
        &self.defaults
    }

    // Response

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn status(&self) -> u16 {
        self.response.status()
    }

    pub fn set_status(&mut self, status: u16) {
        self.response.set_status(status);
    }

    pub fn message(&self) -> Option<&str> {
        self.response.message()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.response.set_message(message);
    }

    pub fn body(&self) -> &Body {
        self.response.body()
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.response.set_body(body);
    }

    pub fn take_body(&mut self) -> Body {
        self.response.take_body()
    }

    pub fn length(&self) -> Option<u64> {
        self.response.length()
    }

    pub fn set_length(&mut self, len: u64) {
        self.response.set_length(len);
    }

    pub fn content_type(&self) -> Option<&str> {
        self.response.content_type()
    }

    pub fn set_type(&mut self, kind: &str) {
        self.response.set_type(kind);
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.set_header(name, value);
    }

    /// See [`Response::on_send`].
    pub fn on_send<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Response) + Send + 'static,
    {
        self.response.on_send(hook);
    }

    pub fn remove_header(&mut self, name: HeaderName) {
        self.response.remove_header(name);
    }

    pub fn has_header(&self, name: HeaderName) -> bool {
        self.response.has_header(name)
    }

    /// Whether the connection can still receive a response.
    pub fn writable(&self) -> bool {
        self.outbound.is_writable()
    }

    pub fn headers_sent(&self) -> bool {
        self.outbound.headers_sent()
    }

    /// Write a response directly, bypassing the finalizer.
    ///
    /// Sets `respond` to false so the finalizer leaves the connection alone.
    pub fn send_raw(&mut self, response: WireResponse) -> crate::Result<()> {
        self.respond = Some(false);
        self.outbound.send(response)
    }

    pub(crate) fn outbound_mut(&mut self) -> &mut Outbound {
        &mut self.outbound
    }

    /// Build an HTTP failure for the handler to return.
    ///
    /// ```ignore
    /// return Err(ctx.throw(StatusCode::UNAUTHORIZED, "login required"));
    /// ```
    pub fn throw(&self, status: StatusCode, message: impl Into<String>) -> Error {
        Error::Http(HttpError::new(status, message))
    }
}
