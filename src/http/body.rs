//! Response body representations.
//!
//! # Variants
//! - `Empty`: no body assigned (or explicitly cleared)
//! - `Bytes`: raw buffer, written verbatim
//! - `Text`: UTF-8 text, written verbatim
//! - `Stream`: chunked byte stream, piped without buffering
//! - `Json`: structured value, encoded once at finalization
//!
//! # Design Decisions
//! - One variant per representation so the finalizer dispatches exhaustively
//! - Every stream source is erased into a single `BodyStream` type

use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::{BoxError, Result};

/// Type-erased stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, BoxError>> + Send>>;

/// The body a handler assigns to the response.
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    Text(String),
    Stream(BodyStream),
    Json(serde_json::Value),
}

impl Body {
    /// Build a body from any chunk stream.
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Body::Stream(Box::pin(stream.map_err(Into::into)))
    }

    /// Build a streaming body from a pull-based reader (files, pipes, blobs).
    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Body::stream(ReaderStream::new(reader))
    }

    /// Build a streaming body from another HTTP body, e.g. the request body.
    pub fn pipe(body: axum::body::Body) -> Self {
        Body::stream(body.into_data_stream())
    }

    /// Serialize a value into a structured body.
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(Body::Json(serde_json::to_value(value)?))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Byte length when it is known without consuming the body.
    pub fn known_length(&self) -> Option<u64> {
        match self {
            Body::Empty => None,
            Body::Bytes(b) => Some(b.len() as u64),
            Body::Text(s) => Some(s.len() as u64),
            Body::Stream(_) => None,
            Body::Json(v) => serde_json::to_vec(v).ok().map(|v| v.len() as u64),
        }
    }

    /// Convert into the wire body type, encoding structured values.
    pub(crate) fn into_wire(self) -> Result<axum::body::Body> {
        Ok(match self {
            Body::Empty => axum::body::Body::empty(),
            Body::Bytes(b) => axum::body::Body::from(b),
            Body::Text(s) => axum::body::Body::from(s),
            Body::Stream(s) => axum::body::Body::from_stream(s),
            Body::Json(v) => axum::body::Body::from(serde_json::to_string(&v)?),
        })
    }

    /// Drain the body into memory. Intended for tests and small payloads.
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(b) => Ok(b),
            Body::Text(s) => Ok(Bytes::from(s)),
            Body::Json(v) => Ok(Bytes::from(serde_json::to_vec(&v)?)),
            Body::Stream(mut s) => {
                let mut buf = Vec::new();
                while let Some(chunk) = s.next().await {
                    buf.extend_from_slice(&chunk.map_err(crate::error::Error::Handler)?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
            Body::Json(v) => f.debug_tuple("Json").field(v).finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Body {
    fn from(b: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(b))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_owned())
    }
}

impl From<serde_json::Value> for Body {
    fn from(v: serde_json::Value) -> Self {
        Body::Json(v)
    }
}

impl<T: Into<Body>> From<Option<T>> for Body {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Body::Empty)
    }
}
