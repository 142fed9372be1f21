// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use tower::ServiceExt;

use hk_core::error::Result;
use hk_core::models::{CommandTemplate, PortAssignments, Timeouts};
use hk_core::services::launcher::DeployLauncher;
use hk_core::services::reclaim::{PortReclaimer, ReclaimOutcome};
use hk_core::services::storage::LocalProjectStore;
use hk_server::api::{self, AppState};

pub const BOUNDARY: &str = "hk-test-boundary";

/// Reclaimer that reports an empty port without touching the system.
pub struct QuietReclaimer;

#[async_trait]
impl PortReclaimer for QuietReclaimer {
    async fn reclaim(&self, _port: u16) -> Result<ReclaimOutcome> {
        Ok(ReclaimOutcome::NoOccupant)
    }
}

/// Router wired to a `sleep 30` launcher and a store rooted in a temp dir.
pub struct TestApp {
    pub router: Router,
    pub launcher: Arc<DeployLauncher>,
    pub root: tempfile::TempDir,
    pub logs: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let assignments = PortAssignments::from_pairs(vec![
            ("alice@example.com", 8001),
            ("carol@example.com", 8003),
        ])
        .unwrap();
        let timeouts = Timeouts {
            reclaim_ms: 500,
            spawn_ms: 2_000,
            stop_ms: 2_000,
            startup_grace_ms: 0,
        };
        let launcher = Arc::new(
            DeployLauncher::new(
                assignments,
                CommandTemplate::new("sleep", &["30"]),
                timeouts,
                Arc::new(QuietReclaimer),
            )
            .with_log_dir(logs.path()),
        );
        let store = Arc::new(LocalProjectStore::new(root.path()));
        let state = AppState::new(launcher.clone(), store, 1024 * 1024);
        Self {
            router: api::router(state),
            launcher,
            root,
            logs,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create `<root>/<relative>` and return the workspace-relative path.
    pub fn mkdir(&self, relative: &str) -> String {
        std::fs::create_dir_all(self.root.path().join(relative)).unwrap();
        relative.to_string()
    }
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn raw_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// One multipart part: field name, optional file name, contents.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = String::new();
    for (name, file_name, contents) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match file_name {
            Some(file_name) => {
                body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                ));
                body.push_str("Content-Type: application/octet-stream\r\n\r\n");
            }
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(contents);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
