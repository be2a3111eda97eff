//! Context construction.
//!
//! Pure object construction: no I/O happens here.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ConnectInfo;

use crate::context::{AppDefaults, Context};
use crate::http::{Outbound, Request};

/// Build the context for one inbound request.
///
/// The request head is snapshotted into a shared facade, the body stream is
/// kept for handlers to take, and `state` starts empty.
pub fn create_context(
    defaults: &Arc<AppDefaults>,
    request: axum::http::Request<axum::body::Body>,
    outbound: Outbound,
) -> Context {
    let (parts, body) = request.into_parts();
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let request = Request::new(
        parts.method,
        parts.uri,
        parts.version,
        parts.headers,
        remote_addr,
    );

    Context::new(Arc::new(request), body, outbound, Arc::clone(defaults))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Visited(u32);

    fn request() -> axum::http::Request<axum::body::Body> {
        axum::http::Request::builder()
            .uri("/a?b=c")
            .body(axum::body::Body::empty())
            .unwrap()
    }

    #[test]
    fn test_state_is_fresh_per_context() {
        let defaults = Arc::new(AppDefaults::default());

        let mut first = create_context(&defaults, request(), Outbound::detached());
        first.state.insert(Visited(1));

        let second = create_context(&defaults, request(), Outbound::detached());
        assert!(second.state.get::<Visited>().is_none());
        assert_eq!(first.state.get::<Visited>(), Some(&Visited(1)));
    }

    #[test]
    fn test_defaults_are_shared_not_copied() {
        let defaults = Arc::new(AppDefaults::default());
        let _a = create_context(&defaults, request(), Outbound::detached());
        let _b = create_context(&defaults, request(), Outbound::detached());
        assert_eq!(Arc::strong_count(&defaults), 3);
    }

    #[test]
    fn test_connect_info_becomes_remote_addr() {
        let mut req = request();
        let addr: SocketAddr = "192.168.1.20:40000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        let ctx = create_context(&Arc::new(AppDefaults::default()), req, Outbound::detached());
        assert_eq!(ctx.request().remote_addr(), Some(addr));
        assert_eq!(ctx.ip().as_deref(), Some("192.168.1.20"));
        assert_eq!(ctx.original_url(), "/a?b=c");
        assert_eq!(ctx.status(), 404);
    }
}
