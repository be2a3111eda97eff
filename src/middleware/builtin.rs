//! Built-in middleware, available by name through the [`Registry`](super::Registry).
//!
//! | name            | type            |
//! |-----------------|-----------------|
//! | `logger`        | [`Logger`]       |
//! | `response-time` | [`ResponseTime`] |
//! | `request-id`    | [`RequestIdMiddleware`] |
//! | `error-handler` | [`ErrorHandler`] |
//! | `echo`          | [`Echo`]         |

use std::time::Instant;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::http::{respond, X_REQUEST_ID};
use crate::middleware::{BoxFuture, Middleware, Next};

const X_RESPONSE_TIME: &str = "x-response-time";

/// Correlation ID stored in `ctx.state` by [`RequestIdMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Logs each request on the way in and its outcome on the way out.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logger;

impl Middleware for Logger {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.method().clone();
            let url = ctx.original_url().to_string();
            let request_id = ctx
                .state
                .get::<RequestId>()
                .map(|id| id.0.clone())
                .or_else(|| ctx.request().request_id().map(str::to_owned))
                .unwrap_or_default();

            tracing::info!(request_id = %request_id, method = %method, url = %url, "<-- request");
            let result = next.run(ctx).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(
                    request_id = %request_id,
                    method = %method,
                    url = %url,
                    status = ctx.status(),
                    elapsed = ?elapsed,
                    "--> response"
                ),
                Err(e) => tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    url = %url,
                    error = %e,
                    elapsed = ?elapsed,
                    "xxx failed"
                ),
            }
            result
        })
    }

    fn name(&self) -> &str {
        "logger"
    }
}

/// Adds `X-Response-Time` with the milliseconds spent before the response was written.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseTime;

impl Middleware for ResponseTime {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let start = Instant::now();
            ctx.on_send(move |res| {
                let ms = start.elapsed().as_secs_f64() * 1000.0;
                if let Ok(value) = HeaderValue::from_str(&format!("{ms:.3}ms")) {
                    res.set_header(HeaderName::from_static(X_RESPONSE_TIME), value);
                }
            });
            next.run(ctx).await
        })
    }

    fn name(&self) -> &str {
        "response-time"
    }
}

/// Reuses the inbound `x-request-id` or generates a UUID v4, then exposes it
/// in `ctx.state` and on the response.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdMiddleware;

impl Middleware for RequestIdMiddleware {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let id = ctx
                .header(X_REQUEST_ID)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            if let Ok(value) = HeaderValue::from_str(&id) {
                ctx.set_header(HeaderName::from_static(X_REQUEST_ID), value);
            }
            ctx.state.insert(RequestId(id));
            next.run(ctx).await
        })
    }

    fn name(&self) -> &str {
        "request-id"
    }
}

/// Turns downstream failures into an error response, then reports them.
///
/// Exposed `HttpError`s show their message; everything else shows the
/// canonical reason of its status. Headers set by the failed downstream run
/// are dropped, except `x-request-id`. Send hooks still run. Failures after
/// the response was written are passed upstream untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorHandler;

impl Middleware for ErrorHandler {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let err = match next.run(ctx).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if ctx.headers_sent() || !ctx.writable() {
                tracing::debug!(error = %err, "Response already written, passing failure on");
                return Err(err);
            }

            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let message = match &err {
                Error::Http(e) if e.expose() => e.message().to_string(),
                _ => status.canonical_reason().unwrap_or("Error").to_string(),
            };

            let headers = ctx.response_mut().headers_mut();
            let request_id = headers.remove(X_REQUEST_ID);
            headers.clear();
            if let Some(id) = request_id {
                headers.insert(HeaderName::from_static(X_REQUEST_ID), id);
            }
            ctx.set_status(status.as_u16());
            ctx.set_message(message.clone());
            ctx.set_body(message);
            ctx.set_type("text");
            respond(ctx)?;

            if let Err(type_error) = ctx.defaults().reporter.report(&err) {
                tracing::error!(error = %type_error, "Error handler caught a non-error failure");
                return Err(err);
            }
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "error-handler"
    }
}

/// Responds with a JSON description of the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl Middleware for Echo {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let query: Map<String, Value> = ctx
                .query()
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            let headers: Map<String, Value> = ctx
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    let v = v.to_str().ok()?;
                    Some((k.as_str().to_string(), Value::String(v.to_string())))
                })
                .collect();

            let body = json!({
                "method": ctx.method().as_str(),
                "url": ctx.url(),
                "original_url": ctx.original_url(),
                "path": ctx.path(),
                "query": query,
                "headers": headers,
                "ip": ctx.ip(),
                "request_id": ctx.state.get::<RequestId>().map(|id| id.0.clone()),
            });
            ctx.set_body(body);
            next.run(ctx).await
        })
    }

    fn name(&self) -> &str {
        "echo"
    }
}
