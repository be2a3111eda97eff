//! Tower service and axum router around the dispatcher.
//!
//! # Responsibilities
//! - Build a context per request and spawn its dispatch on a tokio task
//! - Hand the finalizer's response back to the connection
//! - Answer with an empty 500 when a pipeline ends without writing
//! - Mount the service behind the tower-http layers

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tower::Service;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::dispatch::dispatch;
use crate::config::ListenerConfig;
use crate::context::{create_context, AppDefaults};
use crate::http::{Outbound, WireResponse};
use crate::middleware::{BoxFuture, Pipeline};

struct Shared {
    pipeline: Pipeline,
    defaults: Arc<AppDefaults>,
    request_scope: bool,
}

/// The app's request callback as a tower `Service`.
///
/// Cheap to clone; every clone dispatches through the same composed pipeline.
#[derive(Clone)]
pub struct AppService {
    shared: Arc<Shared>,
}

impl AppService {
    pub(crate) fn new(pipeline: Pipeline, defaults: Arc<AppDefaults>, request_scope: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                pipeline,
                defaults,
                request_scope,
            }),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.shared.pipeline
    }
}

impl std::fmt::Debug for AppService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppService")
            .field("pipeline", &self.shared.pipeline)
            .field("request_scope", &self.shared.request_scope)
            .finish()
    }
}

impl Service<axum::http::Request<axum::body::Body>> for AppService {
    type Response = WireResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<WireResponse, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: axum::http::Request<axum::body::Body>) -> Self::Future {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            let (outbound, rx) = Outbound::channel();
            let ctx = create_context(&shared.defaults, request, outbound);

            // The pipeline runs to completion even if the client goes away.
            tokio::spawn(async move {
                if let Err(e) = dispatch(ctx, &shared.pipeline, shared.request_scope).await {
                    tracing::error!(error = %e, "Unhandled failure escaped the dispatcher");
                }
            });

            match rx.await {
                Ok(response) => Ok(response),
                Err(_) => {
                    tracing::debug!("Pipeline ended without a response");
                    Ok(fallback())
                }
            }
        })
    }
}

/// Empty 500 for connections nothing answered.
fn fallback() -> WireResponse {
    let mut response = WireResponse::new(axum::body::Body::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Mount `service` behind the serving layers configured by `listener`.
#[allow(deprecated)]
pub fn build_router(service: AppService, listener: &ListenerConfig) -> Router {
    Router::new()
        .fallback_service(service)
        .layer(RequestBodyLimitLayer::new(listener.body_limit_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(listener.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
