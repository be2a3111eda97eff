//! Request dispatch.
//!
//! # Responsibilities
//! - Reset the status to 404 before any handler runs
//! - Run the pipeline with the finalizer as its terminal
//! - Catch every failure at this one boundary and hand it to the reporter
//! - Optionally run inside the task-local request scope

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;

use crate::context::{scope, Context};
use crate::error::NotAnError;
use crate::http::Finalize;
use crate::middleware::Pipeline;
use crate::observability::metrics;

/// Run one request through `pipeline`.
///
/// Failures never escape except as `NotAnError`, which the reporter raises
/// for failures that carry no error semantics.
pub async fn handle_request(ctx: &mut Context, pipeline: &Pipeline) -> Result<(), NotAnError> {
    let start = Instant::now();
    ctx.response_mut().reset_status(StatusCode::NOT_FOUND);

    tracing::debug!(
        method = %ctx.method(),
        url = %ctx.original_url(),
        middleware = pipeline.len(),
        "Dispatching request"
    );
    let outcome = pipeline.run(ctx, Some(&Finalize)).await;

    // Nothing written means the serving layer answers with its 500 fallback.
    let status = if ctx.headers_sent() {
        ctx.status()
    } else {
        StatusCode::INTERNAL_SERVER_ERROR.as_u16()
    };
    metrics::record_request(ctx.method().as_str(), status, start);

    match outcome {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!(error = %err, headers_sent = ctx.headers_sent(), "Pipeline failed");
            metrics::record_handler_error(err.kind());
            ctx.defaults().reporter.report(&err)
        }
    }
}

/// [`handle_request`], inside the request scope when `request_scope` is set.
pub async fn dispatch(
    mut ctx: Context,
    pipeline: &Pipeline,
    request_scope: bool,
) -> Result<(), NotAnError> {
    if request_scope {
        let request = Arc::clone(ctx.request());
        scope::scope(request, handle_request(&mut ctx, pipeline)).await
    } else {
        handle_request(&mut ctx, pipeline).await
    }
}
