#![allow(dead_code)]

use axum::extract::{Path, RawQuery, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use mcp_api_client::config::Settings;
use mcp_api_client::mcp::server::McpServer;
use mcp_api_client::services::logger::{LogLevel, Logger};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// How long `/delay` stalls before answering.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(2);

/// In-process HTTP server the tools are pointed at.
pub struct Upstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl Upstream {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(hits.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, hits, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A URL on a port nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}

pub fn quiet_logger() -> Logger {
    Logger::with_level("test", LogLevel::Error)
}

pub fn test_settings() -> Settings {
    Settings {
        log_level: LogLevel::Error,
        default_timeout_secs: 5.0,
    }
}

pub fn test_server() -> McpServer {
    McpServer::new(test_settings()).expect("server wiring is complete")
}

fn router(hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/json", get(json_object))
        .route("/text", get(plain_text))
        .route("/created", any(created))
        .route("/empty", any(empty))
        .route("/bad-json", get(bad_json))
        .route("/delay", get(delay))
        .route("/sleep/{ms}", get(sleep_ms))
        .route("/status/{code}", any(status))
        .route("/multi-header", get(multi_header))
        .route("/echo", any(echo))
        .layer(middleware::from_fn_with_state(hits, count_hits))
}

async fn count_hits(State(hits): State<Arc<AtomicUsize>>, request: Request, next: Next) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

async fn json_object() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], r#"{"a":1}"#)
}

async fn plain_text() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain")], "hello")
}

async fn created() -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({"id": 7})))
}

async fn empty() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn bad_json() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], "{not json")
}

async fn delay() -> impl IntoResponse {
    tokio::time::sleep(SLOW_RESPONSE).await;
    "late"
}

async fn sleep_ms(Path(ms): Path<u64>) -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "slept": ms }))
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "code": code })))
}

async fn multi_header() -> impl IntoResponse {
    (
        AppendHeaders([("x-multi", "a"), ("x-multi", "b")]),
        "ok",
    )
}

async fn echo(method: Method, RawQuery(query): RawQuery, headers: HeaderMap, body: String) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "content_type": header("content-type"),
        "x_test": header("x-test"),
        "user_agent": header("user-agent"),
        "body": body,
    }))
}
