//! Onion composition of middleware.
//!
//! # Dispatch
//! ```text
//! dispatch(i):
//!     i <= cursor          → Err(NextCalledMultipleTimes)
//!     cursor = i
//!     i <  len             → stack[i].call(ctx, Next(i + 1))
//!     i == len, terminal   → terminal.call(ctx)
//!     otherwise            → Ok(())
//! ```
//!
//! # Design Decisions
//! - The composed `Pipeline` is immutable and shared across requests
//! - The cursor lives in a per-run `Dispatch` frame, never on the `Pipeline`
//! - Panics while building or polling a handler future become `Err` values

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use futures_util::future::{self, FutureExt};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::middleware::{BoxFuture, Endpoint, SharedMiddleware};

/// An ordered, immutable middleware stack.
#[derive(Clone, Default)]
pub struct Pipeline {
    stack: Arc<[SharedMiddleware]>,
}

impl Pipeline {
    /// Compose handlers into one pipeline. Order of iteration is execution order.
    pub fn compose<I>(stack: I) -> Self
    where
        I: IntoIterator<Item = SharedMiddleware>,
    {
        Self {
            stack: stack.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Names of the composed handlers, in order.
    pub fn names(&self) -> Vec<&str> {
        self.stack.iter().map(|m| m.name()).collect()
    }

    /// Run the pipeline once against `ctx`.
    ///
    /// `terminal` runs when the last handler delegates. Every call gets a fresh
    /// cursor, so one pipeline serves any number of requests.
    pub async fn run(&self, ctx: &mut Context, terminal: Option<&dyn Endpoint>) -> Result<()> {
        let frame = Dispatch {
            stack: &self.stack,
            terminal,
            cursor: AtomicIsize::new(-1),
        };
        frame.dispatch(0, ctx).await
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stack", &self.names())
            .finish()
    }
}

/// Per-run dispatch state.
struct Dispatch<'a> {
    stack: &'a [SharedMiddleware],
    terminal: Option<&'a dyn Endpoint>,
    /// Highest index reached so far.
    cursor: AtomicIsize,
}

impl<'a> Dispatch<'a> {
    fn dispatch<'b>(&'b self, index: usize, ctx: &'b mut Context) -> BoxFuture<'b, Result<()>> {
        let position = index as isize;
        if position <= self.cursor.load(Ordering::SeqCst) {
            tracing::debug!(index, "Continuation invoked more than once");
            return Box::pin(future::ready(Err(Error::NextCalledMultipleTimes)));
        }
        self.cursor.store(position, Ordering::SeqCst);

        let next = Next {
            frame: self,
            index: index + 1,
        };

        let called = match self.stack.get(index) {
            Some(middleware) => {
                tracing::trace!(index, middleware = middleware.name(), "Entering middleware");
                catch_unwind(AssertUnwindSafe(move || {
                    let ctx = ctx;
                    middleware.call(ctx, next)
                }))
            }
            None => match self.terminal {
                Some(terminal) if index == self.stack.len() => {
                    catch_unwind(AssertUnwindSafe(move || {
                        let ctx = ctx;
                        terminal.call(ctx)
                    }))
                }
                _ => return Box::pin(future::ready(Ok(()))),
            },
        };

        match called {
            Ok(fut) => Box::pin(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => Err(Error::from_panic(payload)),
                }
            }),
            Err(payload) => Box::pin(future::ready(Err(Error::from_panic(payload)))),
        }
    }
}

/// Continuation handed to a middleware: runs the rest of the pipeline.
///
/// May be invoked at most once; later invocations resolve to
/// [`Error::NextCalledMultipleTimes`] without running anything.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    frame: &'a Dispatch<'a>,
    index: usize,
}

impl<'a> Next<'a> {
    /// Run everything downstream of the current middleware.
    pub fn run<'b>(&self, ctx: &'b mut Context) -> BoxFuture<'b, Result<()>>
    where
        'a: 'b,
    {
        self.frame.dispatch(self.index, ctx)
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish()
    }
}
