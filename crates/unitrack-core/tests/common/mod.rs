//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use tokio::runtime::Runtime;
use unitrack_core::backend::LoggerBackend;
use unitrack_core::error::Result;
use unitrack_core::Metrics;

/// One request received by [`StubServer`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

type Responder = fn(&str) -> (u16, String);

#[derive(Clone)]
struct StubState {
    respond: Responder,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// Loopback axum server standing in for the hosted metrics service.
///
/// It runs on its own runtime so the blocking client under test can call it
/// from a plain `#[test]`.
pub struct StubServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<Recorded>>>,
    _runtime: Runtime,
}

/// Answers every run creation with `{"id": "run-1"}` and everything else with `{}`.
pub fn ok_responder(path: &str) -> (u16, String) {
    if path == "/api/v1/runs" {
        (200, r#"{"id":"run-1"}"#.to_string())
    } else {
        (200, "{}".to_string())
    }
}

impl StubServer {
    pub fn start(respond: Responder) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            respond,
            requests: requests.clone(),
        };
        let app = Router::new().fallback(record).with_state(state);

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        runtime.spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url,
            requests,
            _runtime: runtime,
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.path.clone())
            .collect()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let path = uri.path().to_string();
    let (status, response) = (state.respond)(&path);
    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path,
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], response)
}

/// Backend that remembers the steps it was asked to log.
pub struct RecordingBackend {
    pub steps: Arc<Mutex<Vec<u64>>>,
}

impl RecordingBackend {
    pub fn new() -> (Self, Arc<Mutex<Vec<u64>>>) {
        let steps = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                steps: steps.clone(),
            },
            steps,
        )
    }
}

impl LoggerBackend for RecordingBackend {
    fn log(&mut self, _data: &Metrics, step: u64) -> Result<()> {
        self.steps.lock().unwrap().push(step);
        Ok(())
    }
}

/// `Write` sink whose contents the test can read back.
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
