use std::sync::Arc;

use tracing::info;

use crate::api::endpoint::EndpointResolver;
use crate::api::transport::{ApiReply, ApiRequest, ApiTransport, Method};
use crate::credential::Credential;
use crate::errors::ClientError;
use crate::models::SendMessageRequest;

/// The three calls of the conversation API. Each returns the raw reply;
/// interpreting statuses is left to the flows.
#[derive(Clone)]
pub struct ChatApi {
    resolver: EndpointResolver,
    transport: Arc<dyn ApiTransport>,
}

impl ChatApi {
    pub fn new(resolver: EndpointResolver, transport: Arc<dyn ApiTransport>) -> Self {
        Self { resolver, transport }
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// POST `session`: creates a new conversation.
    pub async fn create_session(&self, credential: &Credential) -> Result<ApiReply, ClientError> {
        let url = self.resolver.resolve("session");
        info!("Creating conversation via {url}");
        self.transport
            .execute(ApiRequest {
                method: Method::Post,
                url,
                credential: credential.clone(),
                body: None,
            })
            .await
    }

    /// GET `session/{id}`: message history for a conversation.
    pub async fn fetch_history(
        &self,
        conversation_id: &str,
        credential: &Credential,
    ) -> Result<ApiReply, ClientError> {
        let url = self.resolver.resolve(&format!("session/{conversation_id}"));
        self.transport
            .execute(ApiRequest {
                method: Method::Get,
                url,
                credential: credential.clone(),
                body: None,
            })
            .await
    }

    /// POST `session/{id}/message`: sends one user message.
    pub async fn post_message(
        &self,
        conversation_id: &str,
        credential: &Credential,
        text: &str,
    ) -> Result<ApiReply, ClientError> {
        let url = self
            .resolver
            .resolve(&format!("session/{conversation_id}/message"));
        let body = serde_json::to_value(SendMessageRequest { message: text.to_string() })
            .map_err(|e| ClientError::transport(format!("Serialize error: {e}")))?;
        self.transport
            .execute(ApiRequest {
                method: Method::Post,
                url,
                credential: credential.clone(),
                body: Some(body),
            })
            .await
    }
}
