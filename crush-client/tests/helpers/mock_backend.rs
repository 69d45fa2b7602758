//! In-process mock of the Crush backend and object store
//!
//! Serves every endpoint from one axum fallback handler on an ephemeral
//! port, records each request, and answers according to a mutable
//! [`MockConfig`]. The object store lives under `/object/` on the same
//! server so upload slots can point back at it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

/// One request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Canned responses
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub auth_status: u16,
    pub auth_body: Value,
    pub auth_delay: Option<Duration>,
    pub profile_status: u16,
    pub profile_body: Value,
    pub profile_delay: Option<Duration>,
    pub info_put_status: u16,
    pub answers_put_status: u16,
    pub error_body: Value,
    pub slot_status: u16,
    /// `None` hands out a slot under `/object/` on this server
    pub slot_body: Option<Value>,
    pub slot_delay: Option<Duration>,
    pub object_put_status: u16,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            auth_status: 200,
            auth_body: json!({"email": "ada@yale.edu", "active": true}),
            auth_delay: None,
            profile_status: 200,
            profile_body: json!({
                "email": "ada@yale.edu",
                "is_active": true,
                "name": "Ada",
                "residential_college": "Silliman",
                "graduating_year": 2026,
                "notif_pref": true,
                "interests": ["Art", "Music"],
                "answers": [5, 1, 4]
            }),
            profile_delay: None,
            info_put_status: 200,
            answers_put_status: 200,
            error_body: json!({}),
            slot_status: 200,
            slot_body: None,
            slot_delay: None,
            object_put_status: 200,
        }
    }
}

struct MockState {
    addr: SocketAddr,
    config: Mutex<MockConfig>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Running mock server; stops when the test runtime shuts down
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::start_with(MockConfig::default()).await
    }

    pub async fn start_with(config: MockConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(MockState {
            addr,
            config: Mutex::new(config),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.state.addr)
    }

    pub fn configure(&self, f: impl FnOnce(&mut MockConfig)) {
        f(&mut self.state.config.lock().unwrap());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Requests whose path starts with `prefix`
    pub fn requests_to(&self, method: Method, prefix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .collect()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let path = uri.path().to_string();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(String::from),
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body: body.to_vec(),
    });

    let config = state.config.lock().unwrap().clone();

    if path == "/v1/auth" && method == Method::POST {
        if let Some(delay) = config.auth_delay {
            tokio::time::sleep(delay).await;
        }
        return reply(config.auth_status, config.auth_body);
    }
    if path.starts_with("/v1/user/info/") {
        if method == Method::GET {
            if let Some(delay) = config.profile_delay {
                tokio::time::sleep(delay).await;
            }
            return reply(config.profile_status, config.profile_body);
        }
        if method == Method::PUT {
            return reply(config.info_put_status, config.error_body);
        }
    }
    if path.starts_with("/v1/user/answers/") && method == Method::PUT {
        return reply(config.answers_put_status, config.error_body);
    }
    if path.starts_with("/v1/user/picture/") && method == Method::GET {
        if let Some(delay) = config.slot_delay {
            tokio::time::sleep(delay).await;
        }
        let body = config.slot_body.unwrap_or_else(|| {
            json!({
                "url": format!(
                    "http://{}/object/pictures/ada.jpg?X-Amz-Signature=abc123&X-Amz-Expires=300",
                    state.addr
                )
            })
        });
        return reply(config.slot_status, body);
    }
    if path.starts_with("/object/") && method == Method::PUT {
        return StatusCode::from_u16(config.object_put_status)
            .unwrap()
            .into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

fn reply(status: u16, body: Value) -> Response {
    (StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
}
