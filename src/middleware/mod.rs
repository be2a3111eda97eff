//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! App::use_* (ordered registration)
//!     → compose.rs (Pipeline: immutable, shared by all requests)
//!     → per request: Dispatch frame with its own cursor
//!         handler[0] before → next.run → handler[1] … → terminal (finalizer)
//!         handler[0] after  ← ………………………………………………………… ←
//! ```
//!
//! # Design Decisions
//! - Handlers borrow the context mutably for the duration of their call
//! - `Next` is `Copy`; a second `run` resolves to `NextCalledMultipleTimes`
//! - Panics inside handlers become errors on the same path as returned errors

pub mod builtin;
pub mod compose;
pub mod registry;

pub use compose::{Next, Pipeline};
pub use registry::Registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;

/// Boxed future returned by middleware.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pipeline stage.
///
/// Code before `next.run(ctx).await` runs on the way in, code after it runs on
/// the way out, once everything downstream has completed or failed.
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name()).finish()
    }
}

/// The step that runs once the last middleware delegates.
pub trait Endpoint: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>>;
}

/// Shared handle to a registered middleware.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// Middleware built from a closure. See [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
    name: &'static str,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

/// Adapt a closure into middleware.
///
/// ```ignore
/// app.use_middleware(from_fn(|ctx, next| Box::pin(async move {
///     let start = Instant::now();
///     next.run(ctx).await?;
///     tracing::info!(elapsed = ?start.elapsed(), "done");
///     Ok(())
/// })));
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    FnMiddleware { f, name: "fn" }
}

impl<F> FnMiddleware<F> {
    /// Give the closure a name for logs.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        (self.f)(ctx, next)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Endpoint built from a closure.
pub struct FnEndpoint<F>(F);

/// Adapt a closure into a pipeline terminal.
pub fn endpoint_fn<F>(f: F) -> FnEndpoint<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    FnEndpoint(f)
}

impl<F> Endpoint for FnEndpoint<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>> {
        (self.0)(ctx)
    }
}
