use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::ChatApi;
use crate::credential::{Credential, SessionContext};
use crate::errors::ClientError;
use crate::models::SessionIdField;

pub const CREDENTIAL_REQUIRED: &str = "Enter the access password to start a session.";
pub const INCORRECT_CREDENTIAL: &str = "Incorrect password. Please try again.";
pub const MISSING_CONVERSATION_ID: &str = "Conversation ID missing from server response.";
pub const SESSION_STARTING: &str = "A session is already being prepared.";

/// Start-screen flow: trade an access code for a fresh conversation.
///
/// Clones share one in-flight flag, so only a single start can be outstanding.
#[derive(Clone)]
pub struct SessionBootstrap {
    api: ChatApi,
    context: SessionContext,
    starting: Arc<AtomicBool>,
}

/// Lowers the in-flight flag however `start_session` exits.
struct StartingGuard<'a>(&'a AtomicBool);

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionBootstrap {
    pub fn new(api: ChatApi, context: SessionContext) -> Self {
        Self {
            api,
            context,
            starting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a session request is outstanding; the submit control stays disabled.
    pub fn is_starting(&self) -> bool {
        self.starting.load(Ordering::Acquire)
    }

    /// Value to pre-fill the credential prompt with.
    pub fn stored_credential(&self) -> Option<String> {
        self.context.current().map(|c| c.expose().to_string())
    }

    /// Creates a conversation and returns its identifier.
    ///
    /// The trimmed credential is persisted before the request goes out and
    /// cleared again if the server answers 401. A submission made while
    /// another start is outstanding is rejected without touching anything.
    pub async fn start_session(&self, raw_credential: &str) -> Result<String, ClientError> {
        if self.starting.swap(true, Ordering::AcqRel) {
            debug!("Session start refused: another start is in flight");
            return Err(ClientError::validation(SESSION_STARTING));
        }
        let _starting = StartingGuard(&self.starting);

        let credential = Credential::parse(raw_credential)
            .ok_or_else(|| ClientError::validation(CREDENTIAL_REQUIRED))?;

        self.context.set(credential.clone());

        let reply = self.api.create_session(&credential).await?;

        if reply.is_unauthorized() {
            warn!("Session start rejected: credential not accepted");
            self.context.clear();
            return Err(ClientError::auth(
                reply.error_text().unwrap_or_else(|| INCORRECT_CREDENTIAL.to_string()),
            ));
        }

        if !reply.is_success() {
            error!("Session start failed with status {}", reply.status);
            let message = reply.error_text().unwrap_or_else(|| {
                format!("Unable to start a session (status {}).", reply.status)
            });
            return Err(ClientError::remote(reply.status, message));
        }

        match SessionIdField::decode(&reply.body).into_id() {
            Some(conversation_id) => {
                info!("Started conversation {conversation_id}");
                Ok(conversation_id)
            }
            None => {
                error!("Session start succeeded but no conversation id was returned");
                Err(ClientError::protocol(MISSING_CONVERSATION_ID))
            }
        }
    }
}
