// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a scripted command runner, local HTTP file servers and
//! a mock Kubernetes API service.

use crate::error::Result;
use crate::tools::{Captured, CommandRunner};
use axum::extract::State;
use axum::Router;
use futures::stream::{self, StreamExt};
use http::{Request, Response, StatusCode};
use kube::client::Body;
use kube::Client;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::net::TcpListener;
use tower::Service;

/// A shell script that echoes its arguments
pub const SCRIPT_BODY: &str = "#!/bin/sh\necho \"$@\"\n";

/// Write an executable script to `path`, creating parent directories
pub fn install_script(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A local HTTP server, with the number of requests it has answered
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn serve(app: Router<Arc<AtomicUsize>>) -> TestServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = app.with_state(hits.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer { addr, hits }
}

/// Answer every request with the same status and body
pub async fn serve_http(status: u16, body: &'static str) -> TestServer {
    let status = StatusCode::from_u16(status).unwrap();
    let app = Router::new().fallback(move |State(hits): State<Arc<AtomicUsize>>| async move {
        hits.fetch_add(1, Ordering::SeqCst);
        (status, body)
    });
    serve(app).await
}

/// Answer every request with `200 OK`, send `first_chunk` and then never finish the body
pub async fn serve_stalled(first_chunk: &'static str) -> TestServer {
    let app = Router::new().fallback(move |State(hits): State<Arc<AtomicUsize>>| async move {
        hits.fetch_add(1, Ordering::SeqCst);
        let chunks = stream::iter([Ok::<_, std::io::Error>(first_chunk)]).chain(stream::pending());
        (StatusCode::OK, axum::body::Body::from_stream(chunks))
    });
    serve(app).await
}

type Handler = Box<dyn Fn(&[String]) -> Result<Captured> + Send + Sync>;

/// A [`CommandRunner`] that records every invocation and answers from a handler
pub struct FakeRunner {
    handler: Handler,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&[String]) -> Result<Captured> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runner for which every command succeeds with empty output
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(Captured::default()))
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, args: &[String]) -> Result<Captured> {
        self.calls.lock().unwrap().push(args.to_vec());
        (self.handler)(args)
    }
}

impl CommandRunner for FakeRunner {
    fn name(&self) -> &str {
        "fake"
    }

    async fn execute(&self, args: &[String]) -> Result<()> {
        tokio::task::yield_now().await;
        self.call(args).map(|_| ())
    }

    async fn capture(&self, args: &[String]) -> Result<Captured> {
        tokio::task::yield_now().await;
        self.call(args)
    }
}

/// Captured output with the given stdout
pub fn stdout(s: &str) -> Captured {
    Captured {
        stdout: s.to_string(),
        stderr: String::new(),
    }
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone, Default)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(("GET".to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let response = self.find_response(req.method().as_str(), req.uri().path());

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| {
                (
                    404,
                    r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#
                        .to_string(),
                )
            });
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock namespace list JSON response
pub fn namespace_list_json(names: &[&str]) -> String {
    let items: Vec<_> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": { "name": name, "uid": format!("uid-{}", name) }
            })
        })
        .collect();
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "NamespaceList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}
