use thiserror::Error;

/// Every failure the session flows surface to the front-end.
/// All variants carry a human-readable message meant for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    // ── Local input problems (no request was made) ───────────────────────────
    #[error("{message}")]
    Validation { message: String },

    // ── 401 from any endpoint ────────────────────────────────────────────────
    #[error("{message}")]
    Auth { message: String },

    // ── Successful response missing required fields ──────────────────────────
    #[error("{message}")]
    Protocol { message: String },

    // ── Non-2xx with a server-supplied or status-derived message ─────────────
    #[error("{message}")]
    Remote { status: u16, message: String },

    // ── Network failure or unreadable body ───────────────────────────────────
    #[error("Network error: {message}")]
    Transport { message: String },
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation { message: message.into() }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        ClientError::Auth { message: message.into() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol { message: message.into() }
    }

    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ClientError::Remote { status, message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ClientError::Transport { message: message.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ClientError::Protocol { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ClientError::Remote { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    /// HTTP status behind the error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            ClientError::Auth { .. } => Some(401),
            _ => None,
        }
    }
}

/// Failure of the durable credential backend. Never escapes
/// [`crate::credential::CredentialStore`]; the store logs it and keeps going
/// in memory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Credential storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Credential storage unavailable: {0}")]
    Unavailable(String),
}
