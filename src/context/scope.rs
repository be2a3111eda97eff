//! Opt-in request-scoped lookup of the current request.
//!
//! Handlers always receive their `Context` explicitly. When the app enables
//! `request_scope`, the dispatcher additionally runs each pipeline inside a
//! task-local scope so code deep in the call graph can read the current
//! request without threading it through every signature.
//!
//! Only the immutable request facade is exposed. Response fields, `state`
//! and everything else on `Context` are out of reach from here; the mutable
//! context stays exclusively owned by the pipeline.

use std::future::Future;
use std::sync::Arc;

use crate::http::Request;

tokio::task_local! {
    static CURRENT_REQUEST: Arc<Request>;
}

/// Run `fut` with `request` installed as the current request.
pub async fn scope<F>(request: Arc<Request>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_REQUEST.scope(request, fut).await
}

/// The request being handled by the current task, if a scope is active.
pub fn current() -> Option<Arc<Request>> {
    CURRENT_REQUEST.try_with(Arc::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, Version};

    fn request(path: &str) -> Arc<Request> {
        Arc::new(Request::new(
            Method::GET,
            path.parse().unwrap(),
            Version::HTTP_11,
            HeaderMap::new(),
            None,
        ))
    }

    #[tokio::test]
    async fn test_no_scope_outside_request() {
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_scope_is_visible_across_awaits() {
        let path = scope(request("/inside"), async {
            tokio::task::yield_now().await;
            current().map(|r| r.path().to_string())
        })
        .await;
        assert_eq!(path.as_deref(), Some("/inside"));
        assert!(current().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let mut handles = Vec::new();
        for i in 0..8 {
            handles.push(tokio::spawn(scope(request(&format!("/r/{i}")), async move {
                tokio::time::sleep(std::time::Duration::from_millis(5 * (8 - i))).await;
                (i, current().map(|r| r.path().to_string()))
            })));
        }
        for handle in handles {
            let (i, path) = handle.await.unwrap();
            assert_eq!(path, Some(format!("/r/{i}")));
        }
    }
}
