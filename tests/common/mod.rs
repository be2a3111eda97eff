//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use strata::lifecycle::Shutdown;
use strata::observability::ReportSink;
use strata::{App, Error};

/// A running app on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server task.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server failed");
    }
}

/// Serve `app` on 127.0.0.1 with an OS-assigned port.
pub async fn spawn_app(app: App) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move { app.serve(listener, server_shutdown).await });
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Non-pooled client so every request opens a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Report sink that keeps every emitted trace.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl ReportSink for RecordingSink {
    fn emit(&self, _error: &Error, trace: &str) {
        self.reports.lock().unwrap().push(trace.to_string());
    }
}

/// Poll `check` until it holds or a second passes.
///
/// Reporting runs on the request's task and may finish after the response.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
