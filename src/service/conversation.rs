use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::api::ChatApi;
use crate::credential::{Credential, SessionContext};
use crate::errors::ClientError;
use crate::models::{decode_history, now_millis, Message, MessageRole, ReplyPayload};

pub const LOADING_STATUS: &str = "Loading previous messages...";
pub const ONLINE_STATUS: &str = "Assistant is online. Share whenever you're ready.";
pub const DRAFTING_STATUS: &str = "Assistant is drafting a reply...";

pub const VIEW_CREDENTIAL_PROMPT: &str = "Enter the access code to view this chat.";
pub const CONTINUE_CREDENTIAL_PROMPT: &str = "Enter the access code to continue.";
pub const CREDENTIAL_REQUIRED: &str = "Access code required.";
pub const ACCESS_DENIED: &str = "Access denied. Check the code.";

pub const MISSING_CONVERSATION: &str = "Conversation ID missing.";
pub const CONVERSATION_NOT_FOUND: &str = "Conversation not found.";
pub const SEND_FAILURE_REPLY: &str =
    "Sorry, I ran into an issue. Please start a new session and try again.";

const UNAVAILABLE_HINT: &str = "Conversation unavailable.";
const LOCKED_HINT: &str = "Unlock the chat to continue.";
const RETRY_HINT: &str = "Message not sent. You can try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    Uninitialized,
    /// No credential is available; nothing was sent.
    NeedsCredential,
    LoadingHistory,
    Ready,
    Sending,
    Unauthorized,
    Failed,
}

impl ConversationPhase {
    /// While busy, new loads and sends are refused rather than queued.
    pub fn is_busy(self) -> bool {
        matches!(self, ConversationPhase::LoadingHistory | ConversationPhase::Sending)
    }
}

/// Everything the chat screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub phase: ConversationPhase,
    pub messages: Vec<Message>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub credential_prompt: Option<String>,
}

impl ConversationSnapshot {
    fn fresh(conversation_id: String) -> Self {
        Self {
            conversation_id,
            phase: ConversationPhase::Uninitialized,
            messages: Vec::new(),
            status: None,
            error: None,
            credential_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
    Loaded(Vec<Message>),
    NeedsCredential,
    /// A load or send was already in flight.
    Busy,
    /// The view changed while the request was out; its result was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The assistant's reply, already appended to the view.
    Replied(Message),
    /// Blank input; nothing happened.
    Ignored,
    Busy,
    NeedsCredential,
    Stale,
}

struct ViewState {
    /// Bumped whenever the view is torn down or rebound. Requests compare it
    /// before applying their results.
    generation: u64,
    view: ConversationSnapshot,
}

impl ViewState {
    fn reset(&mut self, conversation_id: String) {
        self.generation += 1;
        self.view = ConversationSnapshot::fresh(conversation_id);
    }

    /// Appends an assistant message whose timestamp never precedes the last one.
    fn append_assistant(&mut self, content: String) -> Message {
        let mut message = Message::new(MessageRole::Assistant, content);
        if let Some(last) = self.view.messages.last() {
            message.timestamp = message.timestamp.max(last.timestamp);
        }
        self.view.messages.push(message.clone());
        message
    }

    fn fail_send(&mut self, err: &ClientError) {
        self.append_assistant(SEND_FAILURE_REPLY.to_string());
        self.view.phase = ConversationPhase::Failed;
        self.view.status = None;
        self.view.error = Some(err.to_string());
    }
}

/// Client state for one conversation view: history loading, optimistic
/// sends, and recovery from 401s.
///
/// All mutating operations take `&self`; at most one of them is in flight at a
/// time, the others return `Busy`. Sends are also refused until the first
/// history load has started. The state lock is never held across a request.
pub struct ConversationClient {
    api: ChatApi,
    context: SessionContext,
    state: Mutex<ViewState>,
}

impl ConversationClient {
    pub fn new(api: ChatApi, context: SessionContext, conversation_id: impl Into<String>) -> Self {
        Self {
            api,
            context,
            state: Mutex::new(ViewState {
                generation: 0,
                view: ConversationSnapshot::fresh(conversation_id.into()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.lock().view.clone()
    }

    pub fn phase(&self) -> ConversationPhase {
        self.lock().view.phase
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().view.messages.clone()
    }

    pub fn conversation_id(&self) -> String {
        self.lock().view.conversation_id.clone()
    }

    /// Why the composer is disabled, or `None` when a message may be sent.
    pub fn disabled_reason(&self) -> Option<&'static str> {
        let state = self.lock();
        if state.view.conversation_id.is_empty() {
            return Some(UNAVAILABLE_HINT);
        }
        if !self.context.is_authenticated() {
            return Some(LOCKED_HINT);
        }
        match state.view.phase {
            ConversationPhase::Uninitialized | ConversationPhase::LoadingHistory => {
                Some(LOADING_STATUS)
            }
            ConversationPhase::Sending => Some(DRAFTING_STATUS),
            _ if state.view.error.is_some() => Some(RETRY_HINT),
            _ => None,
        }
    }

    /// Rebinds the view to another conversation, discarding in-flight results.
    pub fn switch_conversation(&self, conversation_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        info!("Switching view to conversation {conversation_id}");
        self.lock().reset(conversation_id);
    }

    /// Tears the view down. Requests still in flight will not touch it.
    pub fn close(&self) {
        let mut state = self.lock();
        let conversation_id = state.view.conversation_id.clone();
        state.reset(conversation_id);
    }

    /// Loads the conversation's history with the current credential.
    pub async fn load_history(&self) -> Result<HistoryOutcome, ClientError> {
        self.load_with(None).await
    }

    /// Loads history, first storing `replacement` as the credential if given.
    /// The busy check and the credential swap happen under one lock, so a
    /// refused load leaves the stored credential untouched.
    async fn load_with(
        &self,
        replacement: Option<Credential>,
    ) -> Result<HistoryOutcome, ClientError> {
        let (generation, conversation_id, credential) = {
            let mut state = self.lock();
            if state.view.phase.is_busy() {
                debug!("History load refused: request already in flight");
                return Ok(HistoryOutcome::Busy);
            }
            if state.view.conversation_id.is_empty() {
                state.view.phase = ConversationPhase::Failed;
                state.view.status = None;
                state.view.error = Some(MISSING_CONVERSATION.to_string());
                return Err(ClientError::validation(MISSING_CONVERSATION));
            }
            if let Some(credential) = replacement {
                self.context.set(credential);
            }
            let Some(credential) = self.context.current() else {
                state.view.phase = ConversationPhase::NeedsCredential;
                state.view.status = None;
                state.view.credential_prompt = Some(VIEW_CREDENTIAL_PROMPT.to_string());
                return Ok(HistoryOutcome::NeedsCredential);
            };

            state.view.phase = ConversationPhase::LoadingHistory;
            state.view.status = Some(LOADING_STATUS.to_string());
            state.view.error = None;
            state.view.credential_prompt = None;
            (state.generation, state.view.conversation_id.clone(), credential)
        };

        let result = self.api.fetch_history(&conversation_id, &credential).await;

        // The credential is shared beyond this view, so a 401 invalidates it
        // even when the view itself has moved on.
        if matches!(&result, Ok(reply) if reply.is_unauthorized()) {
            self.context.clear();
        }

        let mut state = self.lock();
        if state.generation != generation {
            debug!("Discarding history for {conversation_id}: view changed");
            return Ok(HistoryOutcome::Stale);
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to load conversation {conversation_id}: {e}");
                state.view.phase = ConversationPhase::Failed;
                state.view.status = None;
                state.view.error = Some(e.to_string());
                state.view.messages.clear();
                return Err(e);
            }
        };

        if reply.is_unauthorized() {
            warn!("History load for {conversation_id} rejected: credential not accepted");
            state.view.phase = ConversationPhase::Unauthorized;
            state.view.messages.clear();
            state.view.status = None;
            state.view.error = None;
            state.view.credential_prompt = Some(ACCESS_DENIED.to_string());
            return Err(ClientError::auth(ACCESS_DENIED));
        }

        if !reply.is_success() {
            let message = reply.error_text().unwrap_or_else(|| match reply.status {
                404 => CONVERSATION_NOT_FOUND.to_string(),
                status => format!("Unable to load conversation (status {status})."),
            });
            error!("Failed to load conversation {conversation_id}: {message}");
            state.view.phase = ConversationPhase::Failed;
            state.view.status = None;
            state.view.error = Some(message.clone());
            state.view.messages.clear();
            return Err(ClientError::remote(reply.status, message));
        }

        let messages = decode_history(&reply.body, now_millis());
        info!("Loaded {} messages for conversation {conversation_id}", messages.len());
        state.view.messages = messages.clone();
        state.view.phase = ConversationPhase::Ready;
        state.view.status = Some(ONLINE_STATUS.to_string());
        Ok(HistoryOutcome::Loaded(messages))
    }

    /// Sends `text` and appends the assistant's reply.
    ///
    /// The user message is echoed into the view before the request goes out.
    /// It is rolled back only on 401; any other failure keeps it and appends a
    /// synthetic assistant message explaining the failure.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, ClientError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (generation, conversation_id, credential, echo_id) = {
            let mut state = self.lock();
            if state.view.conversation_id.is_empty() {
                return Err(ClientError::validation(MISSING_CONVERSATION));
            }
            if state.view.phase.is_busy() {
                debug!("Send refused: request already in flight");
                return Ok(SendOutcome::Busy);
            }
            if state.view.phase == ConversationPhase::Uninitialized {
                debug!("Send refused: history has not been loaded yet");
                return Ok(SendOutcome::Busy);
            }
            let Some(credential) = self.context.current() else {
                state.view.phase = ConversationPhase::NeedsCredential;
                state.view.credential_prompt = Some(CONTINUE_CREDENTIAL_PROMPT.to_string());
                state.view.error = Some(CREDENTIAL_REQUIRED.to_string());
                return Ok(SendOutcome::NeedsCredential);
            };

            let echo = Message::user(trimmed);
            let echo_id = echo.id.clone();
            state.view.messages.push(echo);
            state.view.phase = ConversationPhase::Sending;
            state.view.status = Some(DRAFTING_STATUS.to_string());
            state.view.error = None;
            state.view.credential_prompt = None;
            (state.generation, state.view.conversation_id.clone(), credential, echo_id)
        };

        let result = self
            .api
            .post_message(&conversation_id, &credential, trimmed)
            .await;

        if matches!(&result, Ok(reply) if reply.is_unauthorized()) {
            self.context.clear();
        }

        let mut state = self.lock();
        if state.generation != generation {
            debug!("Discarding reply for {conversation_id}: view changed");
            return Ok(SendOutcome::Stale);
        }

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!("Message to {conversation_id} failed: {e}");
                state.fail_send(&e);
                return Err(e);
            }
        };

        if reply.is_unauthorized() {
            warn!("Message to {conversation_id} rejected: credential not accepted");
            state.view.messages.retain(|m| m.id != echo_id);
            state.view.phase = ConversationPhase::Unauthorized;
            state.view.status = None;
            state.view.error = Some(ACCESS_DENIED.to_string());
            state.view.credential_prompt = Some(ACCESS_DENIED.to_string());
            return Err(ClientError::auth(ACCESS_DENIED));
        }

        if !reply.is_success() {
            let message = reply
                .error_text()
                .unwrap_or_else(|| format!("Message failed with status {}", reply.status));
            error!("Message to {conversation_id} failed: {message}");
            let err = ClientError::remote(reply.status, message);
            state.fail_send(&err);
            return Err(err);
        }

        let content = ReplyPayload::decode(&reply.body).into_text();
        let answer = state.append_assistant(content);
        state.view.phase = ConversationPhase::Ready;
        state.view.status = None;
        Ok(SendOutcome::Replied(answer))
    }

    /// Re-enters the access code from the chat screen, then reloads history.
    pub async fn unlock(&self, raw_credential: &str) -> Result<HistoryOutcome, ClientError> {
        let Some(credential) = Credential::parse(raw_credential) else {
            self.lock().view.credential_prompt = Some(CONTINUE_CREDENTIAL_PROMPT.to_string());
            return Err(ClientError::validation(CONTINUE_CREDENTIAL_PROMPT));
        };

        self.load_with(Some(credential)).await
    }

    /// Drops the stored access code and empties the view.
    pub fn forget_credential(&self) {
        self.context.clear();
        let mut state = self.lock();
        let conversation_id = state.view.conversation_id.clone();
        state.reset(conversation_id);
        state.view.phase = ConversationPhase::NeedsCredential;
    }
}
