//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! serving layer (axum::serve + tower-http layers)
//!     → request.rs (immutable request facade)
//!     → [middleware pipeline mutates response state] (middleware/)
//!     → response.rs (status, headers, body, Outbound sink)
//!     → body.rs (tagged body representations)
//!     → respond.rs (single terminating write)
//!     → Send to client
//! ```

pub mod body;
pub mod request;
pub mod respond;
pub mod response;

pub use body::{Body, BodyStream};
pub use request::{Request, X_REQUEST_ID};
pub use respond::{respond, Finalize};
pub use response::{Outbound, Response, SendHook, WireResponse};
