//! Mock Vertex AI and Cloud Storage backend for integration tests
//!
//! Serves the model `:predict` / `:generateContent` endpoints and the storage
//! upload and ACL endpoints from one listener, with scripted provider
//! behavior and counters for every call.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Base64 of the PNG signature; decodes cleanly
pub const IMAGE_DATA: &str = "iVBORw0KGgo=";

/// Text the mock attaches to generateContent images
pub const CAPTION: &str = "Here is your image.";

/// How the model endpoints answer
#[derive(Debug, Clone)]
pub enum ProviderBehavior {
    /// Every call returns images
    Images,
    /// Every call returns text and no image (a refusal for predict models)
    Text(String),
    /// Every call fails with the given status
    FailAll(u16),
    /// The first call returns an image, every later call fails with 503
    SucceedOnce,
    /// The first `n` calls fail with 503, then images
    FailFirst(u32),
    /// Every call sleeps before returning images
    Hang(Duration),
}

/// Request seen by a model endpoint
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub location: String,
    /// `{model}:{method}`
    pub target: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Running mock backend
pub struct MockGoogle {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    behavior: ProviderBehavior,
    fail_uploads: bool,
    provider_count: AtomicU32,
    provider_calls: Mutex<Vec<ProviderCall>>,
    uploads: Mutex<Vec<Value>>,
    acls: Mutex<Vec<String>>,
}

impl MockGoogle {
    /// Start a mock whose model endpoints follow `behavior`
    pub async fn start(behavior: ProviderBehavior) -> anyhow::Result<Self> {
        Self::start_inner(behavior, false).await
    }

    /// Start a mock that returns images but rejects every upload
    pub async fn start_with_failing_storage() -> anyhow::Result<Self> {
        Self::start_inner(ProviderBehavior::Images, true).await
    }

    async fn start_inner(behavior: ProviderBehavior, fail_uploads: bool) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            behavior,
            fail_uploads,
            provider_count: AtomicU32::new(0),
            provider_calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            acls: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(
                "/v1/projects/{project}/locations/{location}/publishers/google/models/{target}",
                routing::post(handle_model),
            )
            .route("/upload/storage/v1/b/{bucket}/o", routing::post(handle_upload))
            .route("/storage/v1/b/{bucket}/o/{object}/acl", routing::post(handle_acl))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Vertex API root, including the version segment
    pub fn provider_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Storage API host
    pub fn storage_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of model endpoint calls received
    pub fn provider_count(&self) -> u32 {
        self.state.provider_count.load(Ordering::SeqCst)
    }

    /// Every model endpoint call, in arrival order
    pub fn provider_calls(&self) -> Vec<ProviderCall> {
        self.state.provider_calls.lock().unwrap().clone()
    }

    /// Object resources of successful uploads
    pub fn uploads(&self) -> Vec<Value> {
        self.state.uploads.lock().unwrap().clone()
    }

    /// Object names made public
    pub fn public_objects(&self) -> Vec<String> {
        self.state.acls.lock().unwrap().clone()
    }
}

impl Drop for MockGoogle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_model(
    State(state): State<Arc<MockState>>,
    Path((_project, location, target)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let call_index = state.provider_count.fetch_add(1, Ordering::SeqCst);
    let predict = target.ends_with(":predict");
    let sample_count = body["parameters"]["sampleCount"].as_u64().unwrap_or(1);
    let include_rai_reason = body["parameters"]["includeRaiReason"] == true;

    state.provider_calls.lock().unwrap().push(ProviderCall {
        location,
        target,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body,
    });

    match &state.behavior {
        ProviderBehavior::Images => images(predict, sample_count),
        ProviderBehavior::Text(text) => text_only(predict, include_rai_reason, text),
        ProviderBehavior::FailAll(status) => failure(*status),
        ProviderBehavior::SucceedOnce if call_index == 0 => images(predict, sample_count),
        ProviderBehavior::SucceedOnce => failure(503),
        ProviderBehavior::FailFirst(n) if call_index < *n => failure(503),
        ProviderBehavior::FailFirst(_) => images(predict, sample_count),
        ProviderBehavior::Hang(delay) => {
            tokio::time::sleep(*delay).await;
            images(predict, sample_count)
        }
    }
}

fn images(predict: bool, sample_count: u64) -> Response {
    if predict {
        let predictions: Vec<_> = (0..sample_count)
            .map(|_| json!({ "bytesBase64Encoded": IMAGE_DATA, "mimeType": "image/png" }))
            .collect();
        Json(json!({ "predictions": predictions })).into_response()
    } else {
        Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": CAPTION },
                    { "inlineData": { "mimeType": "image/png", "data": IMAGE_DATA } }
                ]},
                "finishReason": "STOP"
            }]
        }))
        .into_response()
    }
}

/// Imagen omits the filter reason unless the request opted in
fn text_only(predict: bool, include_rai_reason: bool, text: &str) -> Response {
    if predict && include_rai_reason {
        Json(json!({ "predictions": [{ "raiFilteredReason": text }] })).into_response()
    } else if predict {
        Json(json!({})).into_response()
    } else {
        Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
        }))
        .into_response()
    }
}

fn failure(status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": "The service is currently unavailable." } })),
    )
        .into_response()
}

/// Pull the JSON object resource out of a `multipart/related` body
fn object_resource(body: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(body);
    let start = text.find("\r\n\r\n")? + 4;
    let end = start + text[start..].find("\r\n--")?;
    serde_json::from_str(&text[start..end]).ok()
}

async fn handle_upload(State(state): State<Arc<MockState>>, body: Bytes) -> Response {
    if state.fail_uploads {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": 403, "message": "bucket is read-only" } })),
        )
            .into_response();
    }

    match object_resource(&body) {
        Some(resource) => {
            state.uploads.lock().unwrap().push(resource.clone());
            Json(resource).into_response()
        }
        None => (StatusCode::BAD_REQUEST, "malformed multipart body").into_response(),
    }
}

async fn handle_acl(
    State(state): State<Arc<MockState>>,
    Path((_bucket, object)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if body["entity"] != "allUsers" || body["role"] != "READER" {
        return (StatusCode::BAD_REQUEST, "unexpected ACL entry").into_response();
    }
    state.acls.lock().unwrap().push(object);
    Json(json!({ "entity": "allUsers", "role": "READER" })).into_response()
}
