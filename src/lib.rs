//! Onion-model HTTP middleware core.

pub mod application;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;

pub use application::App;
pub use config::AppConfig;
pub use context::Context;
pub use error::{Error, HttpError, Result};
pub use http::Body;
pub use lifecycle::Shutdown;
pub use middleware::{from_fn, Middleware, Next};
