use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::credential::Credential;
use crate::errors::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound call to the conversation API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub credential: Credential,
    pub body: Option<Value>,
}

/// Status plus leniently parsed JSON body. A body that is not JSON is `{}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Non-empty `error` string supplied by the server, if any.
    pub fn error_text(&self) -> Option<String> {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Parses a response body, degrading to an empty object on anything unparsable.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_slice(bytes).unwrap_or_else(|e| {
        debug!("Response body is not JSON ({e}); treating it as empty");
        Value::Object(Map::new())
    })
}

/// Seam between the session flows and the network.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Performs the request. Only network-level failures are errors; every
    /// HTTP status, 4xx and 5xx included, comes back as an [`ApiReply`].
    async fn execute(&self, request: ApiRequest) -> Result<ApiReply, ClientError>;
}

/// [`ApiTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiReply, ClientError> {
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/json"),
        };
        let builder = builder.bearer_auth(request.credential.expose());
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let resp = builder.send().await.map_err(|e| {
            error!("Request to {} failed: {e}", request.url);
            ClientError::transport(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(|e| {
            error!("Failed to read response body from {}: {e}", request.url);
            ClientError::transport(e.to_string())
        })?;

        debug!("{:?} {} -> {status}", request.method, request.url);
        Ok(ApiReply::new(status, parse_body(&bytes)))
    }
}
