//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → subscribers wake → axum::serve stops accepting → in-flight requests drain
//! ```
//!
//! # Design Decisions
//! - One broadcast coordinator per process; servers and background tasks subscribe
//! - Triggering twice is harmless

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
