#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;

use passgate_chat::api::{ApiReply, ApiRequest, ApiTransport, ChatApi, EndpointResolver, HttpTransport};
use passgate_chat::credential::{Credential, SessionContext};
use passgate_chat::ClientError;

pub const PASSWORD: &str = "open-sesame";
pub const CONVERSATION_ID: &str = "conv_test";

pub fn context_with(credential: Option<&str>) -> SessionContext {
    let context = SessionContext::in_memory();
    if let Some(raw) = credential {
        context.set(Credential::parse(raw).expect("test credential must not be blank"));
    }
    context
}

// ── Scripted transport ────────────────────────────────────────────────────────

/// In-memory [`ApiTransport`] that replays queued replies and records every
/// request. A gated transport parks each request until [`release`] is called.
///
/// [`release`]: ScriptedTransport::release
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ApiReply, ClientError>>>,
    requests: Mutex<Vec<ApiRequest>>,
    gated: bool,
    entered: Notify,
    released: Notify,
}

impl ScriptedTransport {
    fn build(gated: bool) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gated,
            entered: Notify::new(),
            released: Notify::new(),
        })
    }

    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    pub fn gated() -> Arc<Self> {
        Self::build(true)
    }

    pub fn reply(&self, status: u16, body: Value) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(ApiReply::new(status, body)));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(ClientError::transport(message)));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Resolves once a gated request is parked inside the transport.
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiReply, ClientError> {
        self.requests.lock().unwrap().push(request);
        if self.gated {
            self.entered.notify_one();
            self.released.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("no scripted reply left")))
    }
}

pub fn scripted_api(transport: &Arc<ScriptedTransport>) -> ChatApi {
    ChatApi::new(
        EndpointResolver::default().with_base_url("http://api.test/api"),
        transport.clone(),
    )
}

// ── Fake conversation API over HTTP ───────────────────────────────────────────

#[derive(Clone)]
struct FakeState {
    password: String,
    hits: Arc<AtomicUsize>,
}

impl FakeState {
    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let candidate = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);
        if candidate == Some(self.password.as_str()) {
            Ok(())
        } else {
            Err((StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response())
        }
    }
}

/// A running fake of the conversation API, served on an ephemeral port.
pub struct FakeApi {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeApi {
    pub async fn spawn() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = FakeState {
            password: PASSWORD.to_string(),
            hits: hits.clone(),
        };

        let app = Router::new()
            .route("/api/session", post(create_session))
            .route("/api/session/{id}", get(get_conversation))
            .route("/api/session/{id}/message", post(create_message))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake api");
        let addr = listener.local_addr().expect("fake api address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake api crashed");
        });

        Self {
            base_url: format!("http://{addr}/api/"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn api(&self) -> ChatApi {
        ChatApi::new(
            EndpointResolver::default().with_base_url(self.base_url.clone()),
            Arc::new(HttpTransport::new()),
        )
    }
}

async fn create_session(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "conversation_id": CONVERSATION_ID,
            "messages": [{ "id": "greeting", "role": "assistant", "content": "hi" }],
        })),
    )
        .into_response()
}

async fn get_conversation(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    if id != CONVERSATION_ID {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Conversation not found" })),
        )
            .into_response();
    }
    Json(json!({
        "conversation_id": id,
        "messages": [
            { "id": "m1", "role": "assistant", "content": "hi", "created_at": 1_700_000_000 },
            { "id": "m2", "role": "user", "content": "hello there", "created_at": 1_700_000_005 },
        ],
    }))
    .into_response()
}

async fn create_message(
    State(state): State<FakeState>,
    Path(_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = state.authorize(&headers) {
        return denied;
    }
    let payload: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match message {
        "" => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message is required" })),
        )
            .into_response(),
        "explode" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "upstream failed" })),
        )
            .into_response(),
        "lines" => Json(json!({ "response": ["first", "second"] })).into_response(),
        other => Json(json!({ "response": format!("echo: {other}") })).into_response(),
    }
}
