//! Response finalization.
//!
//! Runs once per request as the pipeline's terminal step and performs exactly
//! one write to the outbound sink, or none at all.
//!
//! # Decision Order
//! ```text
//! respond == false or not writable      → no write
//! status not an assigned code           → clear body, 500 without payload
//! 204 / 205 / 304                       → clear body, no payload
//! HEAD                                  → known length header, no payload
//! Body::Empty + explicit null           → strip type/length, length 0
//! Body::Empty                           → status text body
//! Body::Bytes / Body::Text              → verbatim
//! Body::Stream                          → piped
//! Body::Json                            → encoded, type + length set
//! ```

use axum::http::{header, Method, StatusCode};

use crate::context::Context;
use crate::error::Result;
use crate::http::body::Body;
use crate::http::response::{is_assigned_status, is_empty_status, WireResponse};
use crate::middleware::{BoxFuture, Endpoint};

/// Write the context's final response state to the connection.
pub fn respond(ctx: &mut Context) -> Result<()> {
    if ctx.respond == Some(false) || !ctx.writable() {
        tracing::trace!(respond = ?ctx.respond, "Skipping finalization");
        return Ok(());
    }

    let status = ctx.status();
    if !is_assigned_status(status) {
        tracing::warn!(status, "Malformed response status, ending without payload");
        ctx.response_mut().body = Body::Empty;
        return end(ctx, StatusCode::INTERNAL_SERVER_ERROR, Body::Empty);
    }
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if is_empty_status(status) {
        ctx.response_mut().body = Body::Empty;
        ctx.remove_header(header::CONTENT_TYPE);
        ctx.remove_header(header::CONTENT_LENGTH);
        return end(ctx, code, Body::Empty);
    }

    if *ctx.method() == Method::HEAD {
        if !ctx.headers_sent() && !ctx.has_header(header::CONTENT_LENGTH) {
            if let Some(len) = ctx.response().body().known_length() {
                ctx.set_length(len);
            }
        }
        return end(ctx, code, Body::Empty);
    }

    match ctx.take_body() {
        Body::Empty => {
            if ctx.response().is_explicit_null_body() {
                ctx.remove_header(header::CONTENT_TYPE);
                ctx.remove_header(header::CONTENT_LENGTH);
                ctx.set_length(0);
                return end(ctx, code, Body::Empty);
            }

            let text = if ctx.request().is_http2_or_newer() {
                status.to_string()
            } else {
                ctx.message()
                    .map(str::to_owned)
                    .unwrap_or_else(|| status.to_string())
            };
            if !ctx.headers_sent() {
                ctx.set_type("text");
                ctx.set_length(text.len() as u64);
            }
            end(ctx, code, Body::Text(text))
        }
        body @ (Body::Bytes(_) | Body::Text(_)) => end(ctx, code, body),
        body @ Body::Stream(_) => {
            // Length is unknown; let the transport pick chunked/data frames.
            ctx.remove_header(header::CONTENT_LENGTH);
            end(ctx, code, body)
        }
        Body::Json(value) => {
            let encoded = serde_json::to_string(&value)?;
            if !ctx.headers_sent() {
                ctx.set_type("json");
                ctx.set_length(encoded.len() as u64);
            }
            end(ctx, code, Body::Text(encoded))
        }
    }
}

/// The single terminating write.
fn end(ctx: &mut Context, status: StatusCode, body: Body) -> Result<()> {
    ctx.response_mut().run_send_hooks();
    let mut response = WireResponse::new(body.into_wire()?);
    *response.status_mut() = status;
    *response.headers_mut() = ctx.response().headers().clone();
    ctx.outbound_mut().send(response)
}

/// Pipeline terminal that runs the finalizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Finalize;

impl Endpoint for Finalize {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { respond(ctx) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::{Request as HttpRequest, Version};
    use bytes::Bytes;
    use tokio::sync::oneshot;

    use crate::context::{create_context, AppDefaults};
    use crate::http::Outbound;

    fn context(method: Method, version: Version) -> (Context, oneshot::Receiver<WireResponse>) {
        let (outbound, rx) = Outbound::channel();
        let req = HttpRequest::builder()
            .method(method)
            .version(version)
            .uri("/")
            .body(axum::body::Body::empty())
            .unwrap();
        (create_context(&Arc::new(AppDefaults::default()), req, outbound), rx)
    }

    async fn body_of(res: WireResponse) -> Bytes {
        axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap()
    }

    fn header_of<'a>(res: &'a WireResponse, name: header::HeaderName) -> Option<&'a str> {
        res.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_absent_body_renders_status() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(header_of(&res, header::CONTENT_TYPE), Some("text/plain; charset=utf-8"));
        assert_eq!(header_of(&res, header::CONTENT_LENGTH), Some("3"));
        assert_eq!(body_of(res).await, Bytes::from("404"));
    }

    #[tokio::test]
    async fn test_absent_body_prefers_message_on_http1() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_status(403);
        ctx.set_message("Members only");
        respond(&mut ctx).unwrap();
        assert_eq!(body_of(rx.await.unwrap()).await, Bytes::from("Members only"));
    }

    #[tokio::test]
    async fn test_absent_body_ignores_message_on_http2() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_2);
        ctx.set_status(403);
        ctx.set_message("Members only");
        respond(&mut ctx).unwrap();
        assert_eq!(body_of(rx.await.unwrap()).await, Bytes::from("403"));
    }

    #[tokio::test]
    async fn test_explicit_null_body() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_type("json");
        ctx.set_body(Body::Empty);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(header_of(&res, header::CONTENT_LENGTH), Some("0"));
        assert!(header_of(&res, header::CONTENT_TYPE).is_none());
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_content_status_ends_without_payload() {
        let (mut ctx, rx) = context(Method::DELETE, Version::HTTP_11);
        ctx.set_status(204);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(header_of(&res, header::CONTENT_TYPE).is_none());
        assert!(header_of(&res, header::CONTENT_LENGTH).is_none());
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_modified_drops_assigned_body() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_status(304);
        // A body assigned after the status is still never written.
        ctx.set_body("stale");
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
        assert!(header_of(&res, header::CONTENT_LENGTH).is_none());
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_text_body_verbatim() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_body("hello");
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_of(res).await, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_bytes_body_verbatim() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_body(vec![0u8, 159, 146, 150]);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(header_of(&res, header::CONTENT_TYPE), Some("application/octet-stream"));
        assert_eq!(body_of(res).await.as_ref(), &[0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_json_body() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_body(serde_json::json!({"a": 1}));
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(header_of(&res, header::CONTENT_TYPE), Some("application/json; charset=utf-8"));
        assert_eq!(header_of(&res, header::CONTENT_LENGTH), Some("7"));
        assert_eq!(body_of(res).await, Bytes::from(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_stream_body_is_piped() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        let chunks = futures_util::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from("chunk-1,")),
            Ok(Bytes::from("chunk-2")),
        ]);
        ctx.set_body(Body::stream(chunks));
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert!(header_of(&res, header::CONTENT_LENGTH).is_none());
        assert_eq!(body_of(res).await, Bytes::from("chunk-1,chunk-2"));
    }

    #[tokio::test]
    async fn test_head_sets_known_length_without_payload() {
        let (mut ctx, rx) = context(Method::HEAD, Version::HTTP_11);
        ctx.set_body("hello");
        ctx.remove_header(header::CONTENT_LENGTH);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(header_of(&res, header::CONTENT_LENGTH), Some("5"));
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_head_with_absent_body() {
        let (mut ctx, rx) = context(Method::HEAD, Version::HTTP_11);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(header_of(&res, header::CONTENT_LENGTH).is_none());
        assert!(body_of(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_status_ends_without_payload() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_body("should not be sent");
        ctx.set_status(599);
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_of(res).await.is_empty());
        assert!(ctx.body().is_empty());
    }

    #[tokio::test]
    async fn test_respond_false_skips_write() {
        let (mut ctx, mut rx) = context(Method::GET, Version::HTTP_11);
        ctx.respond = Some(false);
        ctx.set_body("ignored");
        respond(&mut ctx).unwrap();

        assert!(!ctx.headers_sent());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_not_writable_skips_write() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        drop(rx);
        ctx.set_body("nobody listening");
        respond(&mut ctx).unwrap();
        assert!(!ctx.headers_sent());
    }

    #[tokio::test]
    async fn test_send_hooks_touch_headers_before_write() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_body("timed");
        ctx.on_send(|res| {
            res.set_header(
                header::HeaderName::from_static("x-response-time"),
                header::HeaderValue::from_static("1ms"),
            )
        });
        respond(&mut ctx).unwrap();

        let res = rx.await.unwrap();
        let name = header::HeaderName::from_static("x-response-time");
        assert_eq!(header_of(&res, name), Some("1ms"));
    }

    #[tokio::test]
    async fn test_second_finalization_is_a_no_op() {
        let (mut ctx, rx) = context(Method::GET, Version::HTTP_11);
        ctx.set_body("once");
        respond(&mut ctx).unwrap();
        // The sink is spent, so the connection is no longer writable.
        respond(&mut ctx).unwrap();
        assert_eq!(body_of(rx.await.unwrap()).await, Bytes::from("once"));
    }
}
